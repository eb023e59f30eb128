//! Turn trees that jump back to themselves into `while (1)` loops.

use std::rc::Rc;

use crate::decompiler::ir::expr::Expr;
use crate::decompiler::ir::function::Function;
use crate::decompiler::ir::instr::Instr;
use crate::decompiler::ir::tree_table::InstructionTree;

use super::DecompileStrategy;

/// Detects a tree whose final instruction is a `Goto` back to its own start
/// address and rewrites it to `While(true)` around the remaining
/// instructions (possibly none).
pub struct LoopFinderStrategy;

impl DecompileStrategy for LoopFinderStrategy {
    fn name(&self) -> &'static str {
        "loop-finder"
    }

    fn run(&self, function: &mut Function) {
        let table = &mut function.table;

        for address in table.addresses() {
            let tree = match table.get(address) {
                Some(tree) => tree,
                None => continue,
            };

            let instructions = tree.instructions();
            let target = match instructions.last().map(|last| &**last) {
                Some(Instr::Goto { target }) => *target,
                _ => continue,
            };
            if target != address {
                continue;
            }

            // Self loop: everything before the back edge is the body
            let body = instructions[..instructions.len() - 1].to_vec();
            let while_loop = Rc::new(Instr::While {
                condition: Expr::literal(1, 1),
                body: Instr::block(body),
            });
            table.insert(InstructionTree::new(address, vec![while_loop]));
        }
    }
}
