//! Splices trees referenced exactly once into their single referrer.

use std::collections::HashMap;
use std::rc::Rc;

use crate::decompiler::ir::function::Function;
use crate::decompiler::ir::instr::Instr;
use crate::decompiler::ir::tree::TreeNode;
use crate::decompiler::ir::tree_table::InstructionTree;

use super::DecompileStrategy;

/// Replaces each `Goto`/`TreeRef` whose target tree is referenced from
/// exactly one site with the target's body, then drops the inlined tree
/// from the table. The entry tree is never inlined, no matter how many
/// references it has. Chains of single-referenced trees collapse because
/// inlining runs to a fixpoint within each surviving tree.
pub struct TreeInlinerStrategy;

impl DecompileStrategy for TreeInlinerStrategy {
    fn name(&self) -> &'static str {
        "tree-inliner"
    }

    fn run(&self, function: &mut Function) {
        let table = &mut function.table;

        let mut reference_counts: HashMap<u64, usize> = HashMap::new();
        for tree in table.iter() {
            let root = Rc::clone(tree.root());
            for instr in std::iter::once(Rc::clone(&root)).chain(root.descendants()) {
                if let Instr::Goto { target } | Instr::TreeRef { target } = &*instr {
                    *reference_counts.entry(*target).or_insert(0) += 1;
                }
            }
        }

        let candidates: Vec<u64> = reference_counts
            .iter()
            .filter(|(address, count)| {
                **count == 1 && Some(**address) != table.entry_address()
            })
            .map(|(address, _)| *address)
            .collect();

        let mut candidate_bodies: HashMap<u64, Vec<Rc<Instr>>> = HashMap::new();
        for &address in &candidates {
            if let Some(tree) = table.get(address) {
                candidate_bodies.insert(address, tree.instructions().to_vec());
            }
        }

        for address in table.addresses() {
            if candidate_bodies.contains_key(&address) {
                continue;
            }
            let tree = match table.get(address) {
                Some(tree) => tree,
                None => continue,
            };
            let mut root = Rc::clone(tree.root());
            // Inlined bodies may themselves reference further candidates
            loop {
                let next = inline_into(&root, &candidate_bodies);
                if Rc::ptr_eq(&root, &next) {
                    break;
                }
                root = next;
            }
            if !Rc::ptr_eq(tree.root(), &root) {
                table.insert(InstructionTree::from_root(address, root));
            }
        }

        for &address in candidate_bodies.keys() {
            table.remove(address);
        }
    }
}

fn inline_into(node: &Rc<Instr>, bodies: &HashMap<u64, Vec<Rc<Instr>>>) -> Rc<Instr> {
    let children = node.children();
    let mut new_node = Rc::clone(node);
    for (i, child) in children.iter().enumerate() {
        let replacement = match &**child {
            Instr::Goto { target } | Instr::TreeRef { target } => match bodies.get(target) {
                Some(body) => Instr::block(body.clone()),
                None => continue,
            },
            _ => {
                let processed = inline_into(child, bodies);
                if Rc::ptr_eq(child, &processed) {
                    continue;
                }
                processed
            }
        };
        new_node = new_node.replace_child(i, replacement);
    }
    new_node
}
