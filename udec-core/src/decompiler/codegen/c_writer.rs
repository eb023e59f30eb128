//! C-style source rendering.
//!
//! Emits the entry tree first, then the remaining trees in ascending address
//! order, each under a `loc_XXXXXX` label. A tree whose trailing `goto`
//! targets the tree emitted directly below it drops the goto and falls
//! through the label instead.

use crate::decompiler::ir::function::Function;
use crate::decompiler::ir::instr::Instr;
use crate::decompiler::ir::tree_table::InstructionTree;

use super::writer::CodeWriter;
use super::LanguageWriter;

pub struct CLanguageWriter;

impl LanguageWriter for CLanguageWriter {
    fn write(&self, function: &Function) -> String {
        let mut writer = CodeWriter::new();
        writer.append_fmt(format_args!("void {}()", function.name));
        open_brace(&mut writer);

        // Entry tree first, remaining trees in ascending address order
        let entry_address = function.table.entry_address();
        let mut trees: Vec<&InstructionTree> = Vec::with_capacity(function.table.len());
        if let Some(entry) = function.table.entry_tree() {
            trees.push(entry);
        }
        trees.extend(
            function
                .table
                .iter()
                .filter(|tree| Some(tree.address()) != entry_address),
        );

        for (i, tree) in trees.iter().enumerate() {
            let next = trees.get(i + 1).copied();
            write_tree(&mut writer, tree, next, i == 0);
        }

        close_brace(&mut writer);
        writer.into_string()
    }
}

fn write_tree(
    writer: &mut CodeWriter,
    tree: &InstructionTree,
    next: Option<&InstructionTree>,
    omit_label: bool,
) {
    if !omit_label {
        // Labels sit one level left of the statements under them
        writer.end_indent();
        writer.append_fmt(format_args!("loc_{:06X}:", tree.address()));
        writer.begin_indent();
    }

    let instructions = tree.instructions();
    for (i, instr) in instructions.iter().enumerate() {
        if i == instructions.len() - 1 {
            if let (Instr::Goto { target }, Some(next_tree)) = (&**instr, next) {
                // Fallthrough to the tree emitted directly below
                if *target == next_tree.address() {
                    continue;
                }
            }
        }
        write_node(writer, instr);
    }

    if next.is_some() {
        writer.append_blank();
    }
}

fn write_node(writer: &mut CodeWriter, instr: &Instr) {
    match instr {
        Instr::Assignment { destination, value } => {
            writer.append_fmt(format_args!("{} = {};", destination, value));
        }
        Instr::Block(children) => {
            for child in children {
                write_node(writer, child);
            }
        }
        Instr::If { arms, else_body } => {
            for (i, arm) in arms.iter().enumerate() {
                let keyword = if i == 0 { "if" } else { "else if" };
                writer.append_fmt(format_args!("{} ({})", keyword, arm.condition));
                open_brace(writer);
                write_node(writer, &arm.body);
                close_brace(writer);
            }
            if let Some(body) = else_body {
                writer.append_line("else");
                open_brace(writer);
                write_node(writer, body);
                close_brace(writer);
            }
        }
        Instr::While { condition, body } => {
            if is_empty_body(body) {
                writer.append_fmt(format_args!("while ({}) {{ }}", condition));
            } else {
                writer.append_fmt(format_args!("while ({})", condition));
                open_brace(writer);
                write_node(writer, body);
                close_brace(writer);
            }
        }
        Instr::DoWhile { condition, body } => {
            writer.append_line("do");
            open_brace(writer);
            write_node(writer, body);
            writer.end_indent();
            writer.append_fmt(format_args!("}} while ({});", condition));
        }
        Instr::Goto { target } | Instr::TreeRef { target } => {
            writer.append_fmt(format_args!("goto loc_{:06X};", target));
        }
        Instr::Return => writer.append_line("return;"),
        // Low-level forms only survive when strategies are skipped
        Instr::Jump { target } => {
            writer.append_fmt(format_args!("goto loc_{:06X};", target));
        }
        Instr::ConditionalJump { condition, target } => {
            writer.append_fmt(format_args!("if ({})", condition));
            open_brace(writer);
            writer.append_fmt(format_args!("goto loc_{:06X};", target));
            close_brace(writer);
        }
    }
}

fn is_empty_body(body: &Instr) -> bool {
    match body {
        Instr::Block(children) => children.is_empty(),
        _ => false,
    }
}

fn open_brace(writer: &mut CodeWriter) {
    writer.append_line("{");
    writer.begin_indent();
}

fn close_brace(writer: &mut CodeWriter) {
    writer.end_indent();
    writer.append_line("}");
}
