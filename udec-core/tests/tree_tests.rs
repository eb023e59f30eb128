//! Unit tests for the persistent tree and expression model

use std::rc::Rc;

use udec_core::decompiler::ir::expr::{BinaryOp, Expr, Local};
use udec_core::decompiler::ir::instr::Instr;
use udec_core::decompiler::ir::tree::TreeNode;

fn local(id: u32) -> Rc<Expr> {
    Expr::local(Local::new(id, format!("r{}", id), 0, 32))
}

#[test]
fn test_replace_child_with_same_node_returns_same_instance() {
    let a = Instr::assignment(local(0), Expr::literal(1, 32));
    let b = Rc::new(Instr::Return);
    let block = Instr::block(vec![Rc::clone(&a), Rc::clone(&b)]);

    let replaced = block.replace_child(0, Rc::clone(&a));
    assert!(
        Rc::ptr_eq(&block, &replaced),
        "replacing a child with itself must hand back the same instance"
    );
}

#[test]
fn test_replace_child_shares_untouched_siblings() {
    let a = Instr::assignment(local(0), Expr::literal(1, 32));
    let b = Rc::new(Instr::Return);
    let block = Instr::block(vec![Rc::clone(&a), Rc::clone(&b)]);

    let c = Instr::assignment(local(1), Expr::literal(2, 32));
    let replaced = block.replace_child(0, Rc::clone(&c));

    assert!(!Rc::ptr_eq(&block, &replaced));
    let children = replaced.children();
    assert!(Rc::ptr_eq(&children[0], &c), "new child at index 0");
    assert!(Rc::ptr_eq(&children[1], &b), "untouched sibling is shared");
}

#[test]
fn test_descendants_is_preorder_and_excludes_self() {
    let inner = Instr::block(vec![Rc::new(Instr::Return)]);
    let a = Instr::assignment(local(0), Expr::literal(1, 32));
    let root = Instr::block(vec![Rc::clone(&a), Rc::clone(&inner)]);

    let visited: Vec<Rc<Instr>> = root.descendants().collect();
    assert_eq!(visited.len(), 3);
    assert!(Rc::ptr_eq(&visited[0], &a));
    assert!(Rc::ptr_eq(&visited[1], &inner));
    assert!(matches!(&*visited[2], Instr::Return));
}

#[test]
fn test_descendants_of_leaf_is_empty() {
    let leaf = Rc::new(Instr::Return);
    assert_eq!(leaf.descendants().count(), 0);
}

#[test]
fn test_literal_value_unsigned_masks_to_width() {
    assert_eq!(Expr::literal(0x1FF, 8).value_unsigned(), Some(0xFF));
    assert_eq!(Expr::literal(-1, 64).value_unsigned(), Some(u64::MAX));
    assert_eq!(Expr::literal(3, 1).value_unsigned(), Some(1));
}

#[test]
fn test_literal_value_signed_sign_extends() {
    assert_eq!(Expr::literal(0x80, 8).value_signed(), Some(-128));
    assert_eq!(Expr::literal(0x7F, 8).value_signed(), Some(127));
    assert_eq!(Expr::literal(-1, 64).value_signed(), Some(-1));
}

#[test]
#[should_panic(expected = "literal width")]
fn test_literal_rejects_invalid_width() {
    let _ = Expr::literal(0, 7);
}

#[test]
fn test_tautology_is_nonzero_literal_only() {
    assert!(Expr::literal(1, 1).is_tautology());
    assert!(Expr::literal(-1, 32).is_tautology());
    assert!(!Expr::literal(0, 32).is_tautology());
    assert!(!local(0).is_tautology());
    // Structurally always true, but not a literal
    let cmp = Expr::binary(BinaryOp::Equal, local(0), local(0));
    assert!(!cmp.is_tautology());
}

#[test]
fn test_writable_locations() {
    assert!(local(0).is_writable_location());
    assert!(Rc::new(Expr::AddressOf(local(0))).is_writable_location());
    assert!(!Expr::literal(0, 32).is_writable_location());
    let sum = Expr::binary(BinaryOp::Add, local(0), local(1));
    assert!(!sum.is_writable_location());
}

#[test]
#[should_panic(expected = "writable location")]
fn test_assignment_rejects_unwritable_destination() {
    let _ = Instr::assignment(Expr::literal(0, 32), local(0));
}

#[test]
fn test_expression_display() {
    let sum = Expr::binary(BinaryOp::Add, local(0), Expr::literal(5, 32));
    assert_eq!(sum.to_string(), "(local0 + 5)");

    let not = Rc::new(Expr::BooleanNot(Expr::binary(
        BinaryOp::NotEqual,
        local(2),
        Expr::literal(0, 1),
    )));
    assert_eq!(not.to_string(), "!(local2 != 0)");

    let deref = Rc::new(Expr::AddressOf(local(1)));
    assert_eq!(deref.to_string(), "[local1]");

    let mut named = Local::new(3, "ecx", 0, 32);
    named.name = Some("counter".to_string());
    assert_eq!(Expr::local(named).to_string(), "counter");
}

#[test]
fn test_expr_replace_child_rebuilds_binary() {
    let sum = Expr::binary(BinaryOp::Add, local(0), local(1));
    let replaced = sum.replace_child(1, Expr::literal(9, 32));
    assert_eq!(replaced.to_string(), "(local0 + 9)");
    // Left operand is shared
    assert!(Rc::ptr_eq(&sum.children()[0], &replaced.children()[0]));
}
