//! Renumber locals densely from zero in order of first usage.

use std::collections::{HashMap, HashSet};
use std::rc::Rc;

use crate::decompiler::ir::expr::Expr;
use crate::decompiler::ir::function::Function;
use crate::decompiler::ir::tree::TreeNode;
use crate::decompiler::ir::tree_table::InstructionTree;

use super::DecompileStrategy;

/// Rewrites every `Local` id so that the ids in use form `{0, …, k-1}`,
/// assigned in first-occurrence order over a fixed traversal: trees in
/// table order, instructions in pre-order, expressions in pre-order.
/// Repeated ids map identically and unused ids vanish.
pub struct LocalRenumberStrategy;

impl DecompileStrategy for LocalRenumberStrategy {
    fn name(&self) -> &'static str {
        "local-renumber"
    }

    fn run(&self, function: &mut Function) {
        let table = &mut function.table;

        let mut order: Vec<u32> = Vec::new();
        let mut seen: HashSet<u32> = HashSet::new();
        for tree in table.iter() {
            let root = Rc::clone(tree.root());
            for instr in root.descendants() {
                for expr in instr.expressions() {
                    for node in std::iter::once(Rc::clone(&expr)).chain(expr.descendants()) {
                        if let Some(id) = node.local_id() {
                            if seen.insert(id) {
                                order.push(id);
                            }
                        }
                    }
                }
            }
        }

        let remap: HashMap<u32, u32> = order
            .iter()
            .enumerate()
            .map(|(new_id, old_id)| (*old_id, new_id as u32))
            .collect();

        for address in table.addresses() {
            let tree = match table.get(address) {
                Some(tree) => tree,
                None => continue,
            };
            let new_root = tree
                .root()
                .map_expressions(&mut |expr| remap_expr(expr, &remap));
            if !Rc::ptr_eq(tree.root(), &new_root) {
                table.insert(InstructionTree::from_root(address, new_root));
            }
        }
    }
}

fn remap_expr(expr: &Rc<Expr>, remap: &HashMap<u32, u32>) -> Rc<Expr> {
    if let Expr::Local(local) = &**expr {
        return match remap.get(&local.id) {
            Some(new_id) if *new_id != local.id => Rc::new(Expr::Local(local.with_id(*new_id))),
            _ => Rc::clone(expr),
        };
    }

    let children = expr.children();
    let mut node = Rc::clone(expr);
    for (i, child) in children.iter().enumerate() {
        node = node.replace_child(i, remap_expr(child, remap));
    }
    node
}
