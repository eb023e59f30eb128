//! Move loop-ending exit conditions out of expressionless loops.

use std::rc::Rc;

use crate::decompiler::ir::expr::Expr;
use crate::decompiler::ir::function::Function;
use crate::decompiler::ir::instr::Instr;
use crate::decompiler::ir::tree::TreeNode;
use crate::decompiler::ir::tree_table::InstructionTree;

use super::DecompileStrategy;

/// Matches a `While` with a tautological condition whose body ends in a
/// single-arm, else-less `If`, and rewrites it to
/// `DoWhile(!condition)` over the rest of the body, followed by the `If`'s
/// former body as a sibling statement outside the loop: loop until the exit
/// condition, then fall into the exit code.
///
/// A trailing `If` with multiple arms or an else is an ambiguous exit shape
/// and is left alone.
pub struct LoopBreakerStrategy;

impl DecompileStrategy for LoopBreakerStrategy {
    fn name(&self) -> &'static str {
        "loop-breaker"
    }

    fn run(&self, function: &mut Function) {
        let table = &mut function.table;

        for address in table.addresses() {
            let tree = match table.get(address) {
                Some(tree) => tree,
                None => continue,
            };
            let new_root = process(tree.root());
            if !Rc::ptr_eq(tree.root(), &new_root) {
                table.insert(InstructionTree::from_root(address, new_root));
            }
        }
    }
}

fn process(node: &Rc<Instr>) -> Rc<Instr> {
    let (condition, body) = match &**node {
        Instr::While { condition, body } => (condition, body),
        _ => {
            let children = node.children();
            let mut new_node = Rc::clone(node);
            for (i, child) in children.iter().enumerate() {
                new_node = new_node.replace_child(i, process(child));
            }
            return new_node;
        }
    };

    if !condition.is_tautology() {
        return Rc::clone(node);
    }

    let body_instrs = match &**body {
        Instr::Block(instrs) => instrs,
        _ => return Rc::clone(node),
    };
    let (arms, else_body) = match body_instrs.last().map(|last| &**last) {
        Some(Instr::If { arms, else_body }) => (arms, else_body),
        _ => return Rc::clone(node),
    };
    if arms.len() != 1 || else_body.is_some() {
        return Rc::clone(node);
    }

    let arm = &arms[0];
    let remaining = body_instrs[..body_instrs.len() - 1].to_vec();
    Instr::block(vec![
        Rc::new(Instr::DoWhile {
            condition: Rc::new(Expr::BooleanNot(Rc::clone(&arm.condition))),
            body: Instr::block(remaining),
        }),
        Rc::clone(&arm.body),
    ])
}
