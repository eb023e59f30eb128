//! Expression model.
//!
//! A closed set of expression variants built on the persistent tree node.
//! Literals carry a raw 64-bit payload plus a bit width; `value_unsigned`
//! masks the payload to the width and `value_signed` sign-extends from the
//! width's top bit. `Local` and `AddressOf` are the only writable locations,
//! the shapes an assignment may target.

use smallvec::{smallvec, SmallVec};
use std::fmt;
use std::rc::Rc;

use super::tree::{Children, TreeNode};

/// Binary operator tags.
///
/// All binary variants have two children, left then right.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BinaryOp {
    Add,
    Subtract,
    BitwiseAnd,
    BitwiseOr,
    ShiftLeftLogical,
    ShiftRightLogical,
    ShiftRightArithmetic,
    RotateRight,
    Equal,
    NotEqual,
    GreaterThan,
}

impl BinaryOp {
    pub fn symbol(self) -> &'static str {
        match self {
            BinaryOp::Add => "+",
            BinaryOp::Subtract => "-",
            BinaryOp::BitwiseAnd => "&",
            BinaryOp::BitwiseOr => "|",
            BinaryOp::ShiftLeftLogical => "<<",
            BinaryOp::ShiftRightLogical => ">>",
            BinaryOp::ShiftRightArithmetic => ">>",
            BinaryOp::RotateRight => ">>>",
            BinaryOp::Equal => "==",
            BinaryOp::NotEqual => "!=",
            BinaryOp::GreaterThan => ">",
        }
    }
}

/// A local storage slot: register, flag bit or recovered stack variable.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Local {
    pub id: u32,
    /// Recovered name, if any; display falls back to `local<id>`.
    pub name: Option<String>,
    /// Name the slot had in the source architecture, e.g. `eax` or `zf`.
    pub original_name: Option<String>,
    pub bit_offset: u16,
    pub bit_width: u8,
}

impl Local {
    pub fn new(id: u32, original_name: impl Into<String>, bit_offset: u16, bit_width: u8) -> Self {
        Local {
            id,
            name: None,
            original_name: Some(original_name.into()),
            bit_offset,
            bit_width,
        }
    }

    pub fn with_id(&self, id: u32) -> Self {
        let mut local = self.clone();
        local.id = id;
        local
    }
}

/// Expression tree node.
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    /// Integer literal with a raw payload and a bit width.
    Literal { value: i64, width: u8 },
    Local(Local),
    /// Memory dereference of the child address.
    AddressOf(Rc<Expr>),
    BooleanNot(Rc<Expr>),
    Binary {
        op: BinaryOp,
        left: Rc<Expr>,
        right: Rc<Expr>,
    },
}

/// Bit widths a literal or local may carry.
pub const VALID_WIDTHS: [u8; 5] = [1, 8, 16, 32, 64];

impl Expr {
    /// Build a literal, enforcing the width invariant.
    pub fn literal(value: i64, width: u8) -> Rc<Expr> {
        assert!(
            VALID_WIDTHS.contains(&width),
            "literal width must be 1, 8, 16, 32 or 64, got {}",
            width
        );
        Rc::new(Expr::Literal { value, width })
    }

    pub fn local(local: Local) -> Rc<Expr> {
        Rc::new(Expr::Local(local))
    }

    pub fn binary(op: BinaryOp, left: Rc<Expr>, right: Rc<Expr>) -> Rc<Expr> {
        Rc::new(Expr::Binary { op, left, right })
    }

    /// The literal payload masked to its bit width, if this is a literal.
    pub fn value_unsigned(&self) -> Option<u64> {
        match *self {
            Expr::Literal { value, width } => {
                let mask = if width >= 64 {
                    u64::MAX
                } else {
                    (1u64 << width) - 1
                };
                Some(value as u64 & mask)
            }
            _ => None,
        }
    }

    /// The literal payload sign-extended from its width's top bit.
    pub fn value_signed(&self) -> Option<i64> {
        match *self {
            Expr::Literal { value, width } => {
                if width >= 64 {
                    return Some(value);
                }
                let masked = value & ((1i64 << width) - 1);
                if masked & (1i64 << (width - 1)) != 0 {
                    Some(masked | !((1i64 << width) - 1))
                } else {
                    Some(masked)
                }
            }
            _ => None,
        }
    }

    /// True for the shapes an assignment may write to.
    pub fn is_writable_location(&self) -> bool {
        matches!(self, Expr::Local(_) | Expr::AddressOf(_))
    }

    /// True iff this is a literal with a nonzero unsigned value.
    ///
    /// Deliberately narrow: expressions that are structurally always true
    /// but not literal are not recognized.
    pub fn is_tautology(&self) -> bool {
        match self.value_unsigned() {
            Some(value) => value != 0,
            None => false,
        }
    }

    pub fn local_id(&self) -> Option<u32> {
        match self {
            Expr::Local(local) => Some(local.id),
            _ => None,
        }
    }
}

impl TreeNode for Expr {
    fn children(&self) -> Children<Expr> {
        match self {
            Expr::Literal { .. } | Expr::Local(_) => SmallVec::new(),
            Expr::AddressOf(child) | Expr::BooleanNot(child) => smallvec![Rc::clone(child)],
            Expr::Binary { left, right, .. } => smallvec![Rc::clone(left), Rc::clone(right)],
        }
    }

    fn rebuild_from_children(self: &Rc<Expr>, children: Children<Expr>) -> Rc<Expr> {
        match &**self {
            Expr::Literal { .. } | Expr::Local(_) => {
                debug_assert!(children.is_empty());
                Rc::clone(self)
            }
            Expr::AddressOf(_) => {
                debug_assert_eq!(children.len(), 1);
                let mut children = children;
                Rc::new(Expr::AddressOf(children.remove(0)))
            }
            Expr::BooleanNot(_) => {
                debug_assert_eq!(children.len(), 1);
                let mut children = children;
                Rc::new(Expr::BooleanNot(children.remove(0)))
            }
            Expr::Binary { op, .. } => {
                debug_assert_eq!(children.len(), 2);
                let mut children = children;
                let left = children.remove(0);
                let right = children.remove(0);
                Rc::new(Expr::Binary {
                    op: *op,
                    left,
                    right,
                })
            }
        }
    }
}

impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Expr::Literal { value, .. } => write!(f, "{}", value),
            Expr::Local(local) => match &local.name {
                Some(name) => write!(f, "{}", name),
                None => write!(f, "local{}", local.id),
            },
            Expr::AddressOf(child) => write!(f, "[{}]", child),
            Expr::BooleanNot(child) => write!(f, "!{}", child),
            Expr::Binary { op, left, right } => {
                write!(f, "({} {} {})", left, op.symbol(), right)
            }
        }
    }
}
