//! Unit tests for C source emission

use std::rc::Rc;

use udec_core::decompiler::codegen::{CLanguageWriter, LanguageWriter};
use udec_core::decompiler::ir::expr::{BinaryOp, Expr, Local};
use udec_core::decompiler::ir::function::Function;
use udec_core::decompiler::ir::instr::Instr;
use udec_core::decompiler::ir::tree_table::{AddressedInstruction, InstructionTreeTable};
use udec_core::decompiler::strategy::run_default_pipeline;

fn local(id: u32) -> Rc<Expr> {
    Expr::local(Local::new(id, format!("r{}", id), 0, 32))
}

fn function_from_stream(name: &str, stream: Vec<AddressedInstruction>) -> Function {
    let table = InstructionTreeTable::from_instruction_stream(&stream).unwrap();
    Function::new(name, table)
}

#[test]
fn test_emits_labels_and_omits_fallthrough_goto() {
    let function = function_from_stream(
        "sub_000010",
        vec![
            AddressedInstruction::at(0x10, Instr::assignment(local(0), Expr::literal(1, 32))),
            AddressedInstruction::at(0x12, Rc::new(Instr::Jump { target: 0x16 })),
            AddressedInstruction::at(0x14, Instr::assignment(local(1), Expr::literal(2, 32))),
            AddressedInstruction::at(0x16, Rc::new(Instr::Return)),
        ],
    );

    let source = CLanguageWriter.write(&function);

    assert!(source.starts_with("void sub_000010()\n{\n"));
    assert!(source.ends_with("}\n"));
    // Labels sit at column zero
    assert!(source.contains("\nloc_000014:\n"));
    assert!(source.contains("\nloc_000016:\n"));
    // The entry tree's goto skips over 0x14, so it must be emitted
    assert!(source.contains("    goto loc_000016;\n"));
    // The 0x14 tree falls through into the 0x16 label directly below it,
    // so its trailing goto is dropped
    assert_eq!(source.matches("goto loc_000016;").count(), 1);
    assert!(source.contains("    local0 = 1;\n"));
    assert!(source.contains("    return;\n"));
}

#[test]
fn test_emits_if_with_braced_body() {
    let condition = Expr::binary(BinaryOp::NotEqual, local(0), Expr::literal(0, 1));
    let function = function_from_stream(
        "sub_000010",
        vec![
            AddressedInstruction::at(
                0x10,
                Rc::new(Instr::ConditionalJump {
                    condition,
                    target: 0x14,
                }),
            ),
            AddressedInstruction::at(0x12, Instr::assignment(local(1), Expr::literal(1, 32))),
            AddressedInstruction::at(0x14, Rc::new(Instr::Return)),
        ],
    );

    let source = CLanguageWriter.write(&function);

    assert!(source.contains("    if ((local0 != 0))\n    {\n        goto loc_000014;\n    }\n"));
}

#[test]
fn test_emits_empty_while_collapsed() {
    let mut function = function_from_stream(
        "sub_000010",
        vec![AddressedInstruction::at(
            0x10,
            Rc::new(Instr::Jump { target: 0x10 }),
        )],
    );
    run_default_pipeline(&mut function);

    let source = CLanguageWriter.write(&function);
    assert!(source.contains("    while (1) { }\n"));
}

#[test]
fn test_full_pipeline_produces_do_while_without_gotos() {
    // store; decrement with flag update; conditional exit; back edge; exit
    let exit_condition = Expr::binary(BinaryOp::NotEqual, local(10), Expr::literal(0, 1));
    let mut function = function_from_stream(
        "sub_000010",
        vec![
            AddressedInstruction::at(
                0x10,
                Instr::assignment(Rc::new(Expr::AddressOf(local(0))), Expr::literal(0, 8)),
            ),
            AddressedInstruction::at(
                0x12,
                Instr::assignment(
                    local(1),
                    Expr::binary(BinaryOp::Subtract, local(1), Expr::literal(1, 32)),
                ),
            ),
            AddressedInstruction::unaddressed(Instr::assignment(
                local(10),
                Expr::binary(BinaryOp::Equal, local(1), Expr::literal(0, 32)),
            )),
            AddressedInstruction::at(
                0x14,
                Rc::new(Instr::ConditionalJump {
                    condition: exit_condition,
                    target: 0x18,
                }),
            ),
            AddressedInstruction::at(0x16, Rc::new(Instr::Jump { target: 0x10 })),
            AddressedInstruction::at(0x18, Rc::new(Instr::Return)),
        ],
    );

    run_default_pipeline(&mut function);
    assert_eq!(
        function.table.len(),
        1,
        "loop and exit collapse into the entry tree"
    );

    let source = CLanguageWriter.write(&function);
    assert!(source.contains("    do\n    {\n"));
    assert!(source.contains("    } while (!(local2 != 0));\n"));
    assert!(source.contains("        [local0] = 0;\n"));
    assert!(source.contains("    return;\n"));
    assert!(!source.contains("goto"), "structured output has no gotos");
    assert!(!source.contains("loc_"), "single tree needs no labels");
}
