//! ARM machine code reader.
//!
//! Decodes big-endian 32-bit words from the data-processing and single
//! load/store groups; branch, block-transfer and interrupt words terminate
//! linear decoding. Condition bits are not modeled, every decoded word is
//! treated as executing unconditionally.

use std::path::Path;
use std::rc::Rc;

use crate::decompiler::error::Result;
use crate::decompiler::ir::expr::{BinaryOp, Expr, Local};
use crate::decompiler::ir::instr::Instr;
use crate::decompiler::ir::tree_table::AddressedInstruction;

use super::{file_offset, map_segments, read_u32_be, virtual_address, MachineCodeReader, Segment};

/// Raw ARM images map identically: virtual address equals file offset.
const RAW_IMAGE_BASE: u64 = 0;

/// ARM reader covering the data-processing subset `and`, `add`, `orr` and
/// `mov` (immediate-with-rotation and shifted-register operands) plus
/// single-register loads and stores with immediate offsets, pre/post
/// indexing and writeback.
pub struct ArmReader {
    data: Vec<u8>,
    segments: Vec<Segment>,
}

impl ArmReader {
    pub fn from_file(path: &Path) -> Result<Self> {
        let data = std::fs::read(path)?;
        Self::from_bytes(data)
    }

    pub fn from_bytes(data: Vec<u8>) -> Result<Self> {
        let segments = map_segments(&data, RAW_IMAGE_BASE)?;
        Ok(ArmReader { data, segments })
    }

    fn decode_unit(&self, pos: &mut usize) -> Option<Vec<Rc<Instr>>> {
        let word = read_u32_be(&self.data, pos)?;

        // Bits 27:26 select the instruction group
        match (word >> 26) & 0x3 {
            0b00 => decode_data_processing(word),
            0b01 => decode_load_store(word),
            _ => None,
        }
    }
}

impl MachineCodeReader for ArmReader {
    fn architecture(&self) -> &'static str {
        "arm"
    }

    fn read(&self, start_virtual_address: u64) -> Result<Vec<AddressedInstruction>> {
        let mut pos = file_offset(&self.segments, start_virtual_address)?;
        let mut stream = Vec::new();

        loop {
            let unit_address = virtual_address(&self.segments, pos);
            let unit = match self.decode_unit(&mut pos) {
                Some(unit) => unit,
                None => break,
            };

            let ends_function = unit
                .first()
                .is_some_and(|instr| matches!(&**instr, Instr::Return));

            let mut instrs = unit.into_iter();
            if let Some(first) = instrs.next() {
                stream.push(AddressedInstruction::at(unit_address, first));
            }
            for companion in instrs {
                stream.push(AddressedInstruction::unaddressed(companion));
            }

            if ends_function {
                break;
            }
        }

        log::debug!(
            "decoded {} instructions from {:#x}",
            stream.len(),
            start_virtual_address
        );
        Ok(stream)
    }
}

fn decode_data_processing(word: u32) -> Option<Vec<Rc<Instr>>> {
    let opcode = (word >> 21) & 0x0F;
    let operand1 = Expr::local(register((word >> 16) & 0x0F, 32));
    let destination = Expr::local(register((word >> 12) & 0x0F, 32));
    let operand2 = decode_operand2(word);

    let operation = match opcode {
        0x0 => Expr::binary(BinaryOp::BitwiseAnd, operand1, operand2),
        0x4 => Expr::binary(BinaryOp::Add, operand1, operand2),
        0xC => Expr::binary(BinaryOp::BitwiseOr, operand1, operand2),
        0xD => operand2,
        _ => return None,
    };

    Some(vec![Instr::assignment(destination, operation)])
}

/// The shifter operand: an 8-bit immediate rotated right by twice the
/// rotate field, or a register shifted by an immediate or register amount.
fn decode_operand2(word: u32) -> Rc<Expr> {
    let is_immediate = word & (1 << 25) != 0;
    if is_immediate {
        let rotate = ((word >> 8) & 0x0F) * 2;
        let imm = word & 0xFF;
        return Expr::literal(i64::from(imm.rotate_right(rotate) as i32), 32);
    }

    let rm = Expr::local(register(word & 0x07, 32));
    let amount_is_register = (word >> 3) & 1 == 1;
    let amount = if amount_is_register {
        Expr::local(register((word >> 8) & 0x07, 8))
    } else {
        Expr::literal(i64::from((word >> 7) & 0x1F), 32)
    };

    let op = match (word >> 5) & 0x3 {
        0 => BinaryOp::ShiftLeftLogical,
        1 => BinaryOp::ShiftRightLogical,
        2 => BinaryOp::ShiftRightArithmetic,
        _ => BinaryOp::RotateRight,
    };
    Expr::binary(op, rm, amount)
}

fn decode_load_store(word: u32) -> Option<Vec<Rc<Instr>>> {
    let pre_index = word & (1 << 24) != 0;
    let add_offset = word & (1 << 23) != 0;
    let byte_access = word & (1 << 22) != 0;
    let writeback = word & (1 << 21) != 0;
    let is_load = word & (1 << 20) != 0;
    let offset = i64::from(word & 0xFFF);

    let size = if byte_access { 8 } else { 32 };
    let address_register = Expr::local(register((word >> 15) & 0x7, size));
    let value_register = Expr::local(register((word >> 12) & 0x7, size));

    let offset_expression = if offset == 0 {
        Rc::clone(&address_register)
    } else if add_offset {
        Expr::binary(
            BinaryOp::Add,
            Rc::clone(&address_register),
            Expr::literal(offset, 32),
        )
    } else {
        Expr::binary(
            BinaryOp::Subtract,
            Rc::clone(&address_register),
            Expr::literal(offset, 32),
        )
    };

    let mut unit = Vec::with_capacity(2);
    if pre_index {
        // Writeback folds the offset into the address register first
        let address_expression = if writeback && offset != 0 {
            unit.push(Instr::assignment(
                Rc::clone(&address_register),
                Rc::clone(&offset_expression),
            ));
            Rc::clone(&address_register)
        } else {
            offset_expression
        };
        let (destination, value) = if is_load {
            (value_register, Rc::new(Expr::AddressOf(address_expression)))
        } else {
            (Rc::new(Expr::AddressOf(address_expression)), value_register)
        };
        unit.push(Instr::assignment(destination, value));
    } else {
        // Post-index accesses through the unmodified base
        let access = Rc::new(Expr::AddressOf(Rc::clone(&address_register)));
        let (destination, value) = if is_load {
            (Rc::clone(&value_register), access)
        } else {
            (access, Rc::clone(&value_register))
        };
        unit.push(Instr::assignment(destination, value));
        if writeback {
            unit.push(Instr::assignment(address_register, offset_expression));
        }
    }
    Some(unit)
}

/// `R0`..`R12` plus the conventional names for the stack pointer, link
/// register and program counter.
fn register(id: u32, size: u8) -> Local {
    let name = match id {
        13 => "SP".to_string(),
        14 => "LR".to_string(),
        15 => "PC".to_string(),
        other => format!("R{}", other),
    };
    Local::new(id, name, 0, size)
}
