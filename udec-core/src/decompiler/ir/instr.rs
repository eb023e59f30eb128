//! Instruction and statement model.
//!
//! A closed set of control and data statements built on the persistent tree
//! node. The low-level `Jump`/`ConditionalJump` forms exist only before
//! control-flow reconstruction; everything else is a high-level statement.
//!
//! `Assignment` is a leaf in the control tree even though it carries two
//! expression operands: tree restructuring only ever concerns control shape,
//! so expression-content edits must never look like control-shape edits.
//! Inter-tree control transfer goes through `Goto`/`TreeRef` placeholders
//! that carry a target address resolved through the tree table, never a
//! direct node link.

use smallvec::{smallvec, SmallVec};
use std::rc::Rc;

use super::expr::Expr;
use super::tree::{Children, TreeNode};

/// One `(condition, body)` arm of an `If`.
#[derive(Debug, Clone, PartialEq)]
pub struct IfArm {
    pub condition: Rc<Expr>,
    pub body: Rc<Instr>,
}

/// Instruction tree node.
#[derive(Debug, Clone, PartialEq)]
pub enum Instr {
    /// Low-level unconditional jump; only present before reconstruction.
    Jump { target: u64 },
    /// Low-level conditional jump; only present before reconstruction.
    ConditionalJump { condition: Rc<Expr>, target: u64 },
    /// `destination = value`. The destination must be a writable location.
    Assignment {
        destination: Rc<Expr>,
        value: Rc<Expr>,
    },
    Block(Vec<Rc<Instr>>),
    /// Arms are evaluated in order; the first holding condition runs its
    /// body, otherwise the else body if present.
    If {
        arms: Vec<IfArm>,
        else_body: Option<Rc<Instr>>,
    },
    While {
        condition: Rc<Expr>,
        body: Rc<Instr>,
    },
    DoWhile {
        condition: Rc<Expr>,
        body: Rc<Instr>,
    },
    /// Unconditional transfer to the tree keyed at `target`.
    Goto { target: u64 },
    Return,
    /// Placeholder for the tree keyed at `target`, resolved through the
    /// table. Used as `If` arm bodies raised from conditional jumps.
    TreeRef { target: u64 },
}

impl Instr {
    /// Build an assignment, enforcing the writable-destination invariant.
    pub fn assignment(destination: Rc<Expr>, value: Rc<Expr>) -> Rc<Instr> {
        assert!(
            destination.is_writable_location(),
            "assignment destination must be a writable location"
        );
        Rc::new(Instr::Assignment { destination, value })
    }

    pub fn block(children: Vec<Rc<Instr>>) -> Rc<Instr> {
        Rc::new(Instr::Block(children))
    }

    /// Single-arm `if` with no else.
    pub fn single_if(condition: Rc<Expr>, body: Rc<Instr>) -> Rc<Instr> {
        Rc::new(Instr::If {
            arms: vec![IfArm { condition, body }],
            else_body: None,
        })
    }

    pub fn goto(target: u64) -> Rc<Instr> {
        Rc::new(Instr::Goto { target })
    }

    /// The expression operands attached to this statement.
    ///
    /// These are not tree children; they are what strategies traverse when
    /// rewriting expression content.
    pub fn expressions(&self) -> SmallVec<[Rc<Expr>; 2]> {
        match self {
            Instr::Assignment { destination, value } => {
                smallvec![Rc::clone(destination), Rc::clone(value)]
            }
            Instr::If { arms, .. } => arms.iter().map(|arm| Rc::clone(&arm.condition)).collect(),
            Instr::While { condition, .. } | Instr::DoWhile { condition, .. } => {
                smallvec![Rc::clone(condition)]
            }
            Instr::ConditionalJump { condition, .. } => smallvec![Rc::clone(condition)],
            _ => SmallVec::new(),
        }
    }

    /// Rewrite every expression operand in this subtree with `f`, sharing
    /// every untouched node.
    pub fn map_expressions(
        self: &Rc<Instr>,
        f: &mut impl FnMut(&Rc<Expr>) -> Rc<Expr>,
    ) -> Rc<Instr> {
        match &**self {
            Instr::Assignment { destination, value } => {
                let new_destination = f(destination);
                let new_value = f(value);
                if Rc::ptr_eq(destination, &new_destination) && Rc::ptr_eq(value, &new_value) {
                    Rc::clone(self)
                } else {
                    Rc::new(Instr::Assignment {
                        destination: new_destination,
                        value: new_value,
                    })
                }
            }
            Instr::ConditionalJump { condition, target } => {
                let new_condition = f(condition);
                if Rc::ptr_eq(condition, &new_condition) {
                    Rc::clone(self)
                } else {
                    Rc::new(Instr::ConditionalJump {
                        condition: new_condition,
                        target: *target,
                    })
                }
            }
            Instr::If { arms, else_body } => {
                let mut changed = false;
                let new_arms: Vec<IfArm> = arms
                    .iter()
                    .map(|arm| {
                        let condition = f(&arm.condition);
                        let body = arm.body.map_expressions(f);
                        if !Rc::ptr_eq(&condition, &arm.condition)
                            || !Rc::ptr_eq(&body, &arm.body)
                        {
                            changed = true;
                        }
                        IfArm { condition, body }
                    })
                    .collect();
                let new_else = else_body.as_ref().map(|body| body.map_expressions(f));
                if let (Some(old), Some(new)) = (else_body, &new_else) {
                    if !Rc::ptr_eq(old, new) {
                        changed = true;
                    }
                }
                if changed {
                    Rc::new(Instr::If {
                        arms: new_arms,
                        else_body: new_else,
                    })
                } else {
                    Rc::clone(self)
                }
            }
            Instr::While { condition, body } => {
                let new_condition = f(condition);
                let new_body = body.map_expressions(f);
                if Rc::ptr_eq(condition, &new_condition) && Rc::ptr_eq(body, &new_body) {
                    Rc::clone(self)
                } else {
                    Rc::new(Instr::While {
                        condition: new_condition,
                        body: new_body,
                    })
                }
            }
            Instr::DoWhile { condition, body } => {
                let new_condition = f(condition);
                let new_body = body.map_expressions(f);
                if Rc::ptr_eq(condition, &new_condition) && Rc::ptr_eq(body, &new_body) {
                    Rc::clone(self)
                } else {
                    Rc::new(Instr::DoWhile {
                        condition: new_condition,
                        body: new_body,
                    })
                }
            }
            Instr::Block(children) => {
                let mut node = Rc::clone(self);
                for (i, child) in children.iter().enumerate() {
                    node = node.replace_child(i, child.map_expressions(f));
                }
                node
            }
            Instr::Jump { .. } | Instr::Goto { .. } | Instr::Return | Instr::TreeRef { .. } => {
                Rc::clone(self)
            }
        }
    }

    /// Flatten nested blocks, sharing untouched subtrees.
    pub fn clean(self: &Rc<Instr>) -> Rc<Instr> {
        if let Instr::Block(children) = &**self {
            if children.iter().any(|c| matches!(&**c, Instr::Block(_))) {
                let mut new_children = Vec::with_capacity(children.len());
                for child in children {
                    let clean_child = child.clean();
                    match &*clean_child {
                        Instr::Block(grandchildren) => {
                            new_children.extend(grandchildren.iter().cloned())
                        }
                        _ => new_children.push(clean_child),
                    }
                }
                return Rc::new(Instr::Block(new_children));
            }
        }

        let children = self.children();
        let mut node = Rc::clone(self);
        for (i, child) in children.iter().enumerate() {
            let clean_child = child.clean();
            if !Rc::ptr_eq(child, &clean_child) {
                node = node.replace_child(i, clean_child);
            }
        }
        node
    }
}

impl TreeNode for Instr {
    fn children(&self) -> Children<Instr> {
        match self {
            Instr::Block(children) => children.iter().map(Rc::clone).collect(),
            Instr::If { arms, else_body } => {
                let mut children: Children<Instr> =
                    arms.iter().map(|arm| Rc::clone(&arm.body)).collect();
                if let Some(body) = else_body {
                    children.push(Rc::clone(body));
                }
                children
            }
            Instr::While { body, .. } | Instr::DoWhile { body, .. } => {
                smallvec![Rc::clone(body)]
            }
            Instr::Jump { .. }
            | Instr::ConditionalJump { .. }
            | Instr::Assignment { .. }
            | Instr::Goto { .. }
            | Instr::Return
            | Instr::TreeRef { .. } => SmallVec::new(),
        }
    }

    fn rebuild_from_children(self: &Rc<Instr>, children: Children<Instr>) -> Rc<Instr> {
        match &**self {
            Instr::Block(_) => Rc::new(Instr::Block(children.into_vec())),
            Instr::If { arms, else_body } => {
                debug_assert_eq!(
                    children.len(),
                    arms.len() + usize::from(else_body.is_some())
                );
                let new_arms: Vec<IfArm> = arms
                    .iter()
                    .zip(children.iter())
                    .map(|(arm, body)| IfArm {
                        condition: Rc::clone(&arm.condition),
                        body: Rc::clone(body),
                    })
                    .collect();
                let new_else = if else_body.is_some() {
                    children.last().map(Rc::clone)
                } else {
                    None
                };
                Rc::new(Instr::If {
                    arms: new_arms,
                    else_body: new_else,
                })
            }
            Instr::While { condition, .. } => {
                debug_assert_eq!(children.len(), 1);
                let mut children = children;
                Rc::new(Instr::While {
                    condition: Rc::clone(condition),
                    body: children.remove(0),
                })
            }
            Instr::DoWhile { condition, .. } => {
                debug_assert_eq!(children.len(), 1);
                let mut children = children;
                Rc::new(Instr::DoWhile {
                    condition: Rc::clone(condition),
                    body: children.remove(0),
                })
            }
            Instr::Jump { .. }
            | Instr::ConditionalJump { .. }
            | Instr::Assignment { .. }
            | Instr::Goto { .. }
            | Instr::Return
            | Instr::TreeRef { .. } => {
                debug_assert!(children.is_empty());
                Rc::clone(self)
            }
        }
    }
}
