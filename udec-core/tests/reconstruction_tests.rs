//! Unit tests for control-flow reconstruction

use std::rc::Rc;

use udec_core::decompiler::error::DecompilerError;
use udec_core::decompiler::ir::expr::{BinaryOp, Expr, Local};
use udec_core::decompiler::ir::instr::Instr;
use udec_core::decompiler::ir::tree_table::{AddressedInstruction, InstructionTreeTable};

fn local(id: u32) -> Rc<Expr> {
    Expr::local(Local::new(id, format!("r{}", id), 0, 32))
}

fn assign(id: u32, value: i64) -> Rc<Instr> {
    Instr::assignment(local(id), Expr::literal(value, 32))
}

fn at(address: u64, instr: Rc<Instr>) -> AddressedInstruction {
    AddressedInstruction::at(address, instr)
}

#[test]
fn test_empty_stream_yields_empty_table() {
    let table = InstructionTreeTable::from_instruction_stream(&[]).unwrap();
    assert!(table.is_empty());
    assert_eq!(table.entry_address(), None);
}

#[test]
fn test_unaddressed_first_instruction_is_rejected() {
    let stream = vec![AddressedInstruction::unaddressed(assign(0, 1))];
    let result = InstructionTreeTable::from_instruction_stream(&stream);
    assert!(matches!(result, Err(DecompilerError::MissingAddress)));
}

#[test]
fn test_straight_line_stream_yields_single_tree() {
    let stream = vec![
        at(0x10, assign(0, 1)),
        AddressedInstruction::unaddressed(assign(1, 2)),
        at(0x14, Rc::new(Instr::Return)),
    ];
    let table = InstructionTreeTable::from_instruction_stream(&stream).unwrap();

    assert_eq!(table.len(), 1);
    assert_eq!(table.entry_address(), Some(0x10));
    let tree = table.get(0x10).expect("entry tree");
    assert_eq!(tree.instructions().len(), 3);
    assert!(matches!(&*tree.instructions()[2], Instr::Return));
}

#[test]
fn test_jump_becomes_goto_and_ends_tree() {
    let stream = vec![
        at(0x10, assign(0, 1)),
        at(0x12, Rc::new(Instr::Jump { target: 0x10 })),
    ];
    let table = InstructionTreeTable::from_instruction_stream(&stream).unwrap();

    assert_eq!(table.len(), 1);
    let tree = table.get(0x10).expect("entry tree");
    assert_eq!(tree.instructions().len(), 2);
    assert!(matches!(
        &*tree.instructions()[1],
        Instr::Goto { target: 0x10 }
    ));
}

#[test]
fn test_conditional_jump_becomes_single_arm_if_and_falls_through() {
    let condition = Expr::binary(BinaryOp::NotEqual, local(2), Expr::literal(0, 1));
    let stream = vec![
        at(0x10, assign(0, 1)),
        at(
            0x12,
            Rc::new(Instr::ConditionalJump {
                condition,
                target: 0x18,
            }),
        ),
        at(0x14, assign(1, 2)),
        at(0x18, Rc::new(Instr::Return)),
    ];
    let table = InstructionTreeTable::from_instruction_stream(&stream).unwrap();

    assert_eq!(table.len(), 2);
    assert_eq!(table.entry_address(), Some(0x10));

    let entry = table.get(0x10).expect("entry tree");
    // assign, if, assign, synthesized fallthrough goto
    assert_eq!(entry.instructions().len(), 4);
    match &*entry.instructions()[1] {
        Instr::If { arms, else_body } => {
            assert_eq!(arms.len(), 1);
            assert!(else_body.is_none());
            assert!(matches!(&*arms[0].body, Instr::TreeRef { target: 0x18 }));
        }
        other => panic!("expected single-arm if, got {:?}", other),
    }
    assert!(matches!(
        &*entry.instructions()[3],
        Instr::Goto { target: 0x18 }
    ));

    let exit = table.get(0x18).expect("split tree at jump destination");
    assert_eq!(exit.instructions().len(), 1);
    assert!(matches!(&*exit.instructions()[0], Instr::Return));
}

#[test]
fn test_jump_destination_mid_stream_splits_tree() {
    // The destination of the backward jump starts its own tree even though
    // execution from above runs straight into it
    let stream = vec![
        at(0x10, assign(0, 1)),
        at(0x12, assign(1, 2)),
        at(0x14, Rc::new(Instr::Jump { target: 0x12 })),
    ];
    let table = InstructionTreeTable::from_instruction_stream(&stream).unwrap();

    assert_eq!(table.len(), 2);
    let first = table.get(0x10).expect("entry tree");
    assert_eq!(first.instructions().len(), 2);
    assert!(matches!(
        &*first.instructions()[1],
        Instr::Goto { target: 0x12 }
    ));

    let second = table.get(0x12).expect("split tree");
    assert_eq!(second.instructions().len(), 2);
    assert!(matches!(
        &*second.instructions()[1],
        Instr::Goto { target: 0x12 }
    ));
}

#[test]
fn test_dangling_jump_target_is_fatal() {
    let stream = vec![
        at(0x10, assign(0, 1)),
        at(0x12, Rc::new(Instr::Jump { target: 0x99 })),
    ];
    let result = InstructionTreeTable::from_instruction_stream(&stream);
    assert!(matches!(
        result,
        Err(DecompilerError::DanglingTreeReference { address: 0x99 })
    ));
}

#[test]
fn test_truncated_stream_seals_trailing_tree() {
    let stream = vec![at(0x10, assign(0, 1)), at(0x12, assign(1, 2))];
    let table = InstructionTreeTable::from_instruction_stream(&stream).unwrap();

    assert_eq!(table.len(), 1);
    let tree = table.get(0x10).expect("trailing tree");
    assert_eq!(tree.instructions().len(), 2);
}

/// Lower a reconstructed table back into a flat stream: gotos become jumps,
/// raised single-arm ifs over tree references become conditional jumps, and
/// only the first instruction of each tree keeps an address.
fn lower(table: &InstructionTreeTable) -> Vec<AddressedInstruction> {
    let mut stream = Vec::new();
    for address in table.addresses() {
        let tree = table.get(address).unwrap();
        for (i, instr) in tree.instructions().iter().enumerate() {
            let lowered = match &**instr {
                Instr::Goto { target } => Rc::new(Instr::Jump { target: *target }),
                Instr::If { arms, else_body } if arms.len() == 1 && else_body.is_none() => {
                    match &*arms[0].body {
                        Instr::TreeRef { target } => Rc::new(Instr::ConditionalJump {
                            condition: Rc::clone(&arms[0].condition),
                            target: *target,
                        }),
                        _ => Rc::clone(instr),
                    }
                }
                _ => Rc::clone(instr),
            };
            if i == 0 {
                stream.push(AddressedInstruction::at(address, lowered));
            } else {
                stream.push(AddressedInstruction::unaddressed(lowered));
            }
        }
    }
    stream
}

#[test]
fn test_reconstruction_is_idempotent_over_lowering() {
    let condition = Expr::binary(BinaryOp::NotEqual, local(2), Expr::literal(0, 1));
    let stream = vec![
        at(0x10, assign(0, 1)),
        at(
            0x12,
            Rc::new(Instr::ConditionalJump {
                condition,
                target: 0x18,
            }),
        ),
        at(0x14, assign(1, 2)),
        at(0x18, Rc::new(Instr::Return)),
    ];
    let first = InstructionTreeTable::from_instruction_stream(&stream).unwrap();
    let second = InstructionTreeTable::from_instruction_stream(&lower(&first)).unwrap();

    assert_eq!(first.entry_address(), second.entry_address());
    assert_eq!(first.addresses(), second.addresses());
    for address in first.addresses() {
        assert_eq!(
            first.get(address).unwrap(),
            second.get(address).unwrap(),
            "tree at {:#x} survives a lower/reconstruct round unchanged",
            address
        );
    }
}

#[test]
fn test_return_ends_tree_and_unreachable_tail_forms_another() {
    let stream = vec![
        at(0x10, Rc::new(Instr::Return)),
        at(0x11, assign(0, 1)),
    ];
    let table = InstructionTreeTable::from_instruction_stream(&stream).unwrap();

    assert_eq!(table.len(), 2);
    assert!(table.get(0x10).is_some());
    assert!(table.get(0x11).is_some());
}
