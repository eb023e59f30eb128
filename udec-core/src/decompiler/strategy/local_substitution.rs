//! Forward, per-tree, control-sensitive copy propagation.

use std::collections::HashSet;
use std::rc::Rc;

use crate::decompiler::ir::expr::Expr;
use crate::decompiler::ir::function::Function;
use crate::decompiler::ir::instr::Instr;
use crate::decompiler::ir::tree::TreeNode;
use crate::decompiler::ir::tree_table::InstructionTree;

use super::DecompileStrategy;

/// Walks each tree depth-first carrying `local id -> last assigned
/// expression` bindings. Each assignment first has cached locals in its
/// value (and, for address-of destinations, its destination) substituted,
/// then records itself in the cache. Entering a `While`/`DoWhile` body
/// purges every local written anywhere inside that body: a value cached
/// before a loop cannot be assumed stable inside it.
///
/// Substitution is purely structural; writes through an address-of
/// destination do not invalidate unrelated cached locals.
pub struct LocalSubstitutionStrategy;

#[derive(Clone)]
struct CachedLocal {
    id: u32,
    value: Rc<Expr>,
}

impl DecompileStrategy for LocalSubstitutionStrategy {
    fn name(&self) -> &'static str {
        "local-substitution"
    }

    fn run(&self, function: &mut Function) {
        let table = &mut function.table;

        for address in table.addresses() {
            let tree = match table.get(address) {
                Some(tree) => tree,
                None => continue,
            };
            let new_root = process(tree.root(), &[]);
            if !Rc::ptr_eq(tree.root(), &new_root) {
                table.insert(InstructionTree::from_root(address, new_root));
            }
        }
    }
}

fn process(node: &Rc<Instr>, in_cache: &[CachedLocal]) -> Rc<Instr> {
    let mut cache: Vec<CachedLocal> = in_cache.to_vec();

    if matches!(&**node, Instr::While { .. } | Instr::DoWhile { .. }) {
        let written = written_locals(node);
        cache.retain(|cached| !written.contains(&cached.id));
    }

    let children = node.children();
    let mut new_node = Rc::clone(node);
    for (i, child) in children.iter().enumerate() {
        if let Instr::Assignment { destination, value } = &**child {
            let new_destination = if matches!(&**destination, Expr::AddressOf(_)) {
                substitute(destination, &cache)
            } else {
                Rc::clone(destination)
            };
            let new_value = substitute(value, &cache);

            if !Rc::ptr_eq(destination, &new_destination) || !Rc::ptr_eq(value, &new_value) {
                new_node = new_node.replace_child(
                    i,
                    Rc::new(Instr::Assignment {
                        destination: Rc::clone(&new_destination),
                        value: Rc::clone(&new_value),
                    }),
                );
            }

            // Record the (already substituted) assignment; latest binding wins
            if let Some(id) = new_destination.local_id() {
                cache.retain(|cached| cached.id != id);
                cache.push(CachedLocal {
                    id,
                    value: new_value,
                });
            }
        } else if !child.children().is_empty() {
            new_node = new_node.replace_child(i, process(child, &cache));
        }
    }

    new_node
}

/// Ids of every local assigned anywhere inside `node`.
fn written_locals(node: &Rc<Instr>) -> HashSet<u32> {
    let mut written = HashSet::new();
    for instr in std::iter::once(Rc::clone(node)).chain(node.descendants()) {
        if let Instr::Assignment { destination, .. } = &*instr {
            if let Some(id) = destination.local_id() {
                written.insert(id);
            }
        }
    }
    written
}

fn substitute(expr: &Rc<Expr>, cache: &[CachedLocal]) -> Rc<Expr> {
    if let Some(id) = expr.local_id() {
        return match cache.iter().find(|cached| cached.id == id) {
            Some(cached) => Rc::clone(&cached.value),
            None => Rc::clone(expr),
        };
    }

    let children = expr.children();
    let mut node = Rc::clone(expr);
    for (i, child) in children.iter().enumerate() {
        node = node.replace_child(i, substitute(child, cache));
    }
    node
}
