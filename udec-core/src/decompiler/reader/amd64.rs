//! x86-64 machine code reader.

use std::path::Path;
use std::rc::Rc;

use crate::decompiler::error::Result;
use crate::decompiler::ir::expr::{BinaryOp, Expr, Local};
use crate::decompiler::ir::instr::Instr;
use crate::decompiler::ir::tree_table::AddressedInstruction;

use super::{file_offset, map_segments, read_u8, virtual_address, MachineCodeReader, Segment};

/// Flat base address for raw images with no recognizable container format.
const RAW_IMAGE_BASE: u64 = 0x40_0000;

/// x86-64 reader covering the small integer/branch subset the pipeline
/// understands: `dec r`, `jnz rel8`, `add r, imm8`, `mov r, imm`,
/// `mov byte [r], imm8` and `ret`, with the `0x66` operand-size prefix.
pub struct Amd64Reader {
    data: Vec<u8>,
    segments: Vec<Segment>,
}

/// Flag register slots live above the eight general-purpose ids.
enum RegisterFlag {
    Carry,
    Overflow,
    Zero,
}

impl Amd64Reader {
    pub fn from_file(path: &Path) -> Result<Self> {
        let data = std::fs::read(path)?;
        Self::from_bytes(data)
    }

    /// Build a reader over an in-memory image, parsing load segments from
    /// the container format when one is present.
    pub fn from_bytes(data: Vec<u8>) -> Result<Self> {
        let segments = map_segments(&data, RAW_IMAGE_BASE)?;
        Ok(Amd64Reader { data, segments })
    }

    /// Decode one unit at `pos`, advancing the cursor. `None` means the
    /// bytes at `pos` are not part of the supported subset (or the image
    /// ended), which terminates linear decoding.
    fn decode_unit(&self, pos: &mut usize) -> Option<Vec<Rc<Instr>>> {
        let mut byte0 = read_u8(&self.data, pos)?;

        let mut prefix = 0u8;
        if byte0 == 0x66 {
            prefix = byte0;
            byte0 = read_u8(&self.data, pos)?;
        }

        match byte0 {
            0x48..=0x4F => {
                let size = if prefix == 0x66 { 16 } else { 32 };
                Some(decode_dec_reg(byte0 & 7, size))
            }
            0x75 => {
                let offset = i64::from(read_u8(&self.data, pos)? as i8);
                let after = virtual_address(&self.segments, *pos);
                let condition = Expr::binary(
                    BinaryOp::NotEqual,
                    Expr::local(register_flag(RegisterFlag::Zero)),
                    Expr::literal(0, 1),
                );
                let target = after.wrapping_add_signed(offset);
                Some(vec![Rc::new(Instr::ConditionalJump { condition, target })])
            }
            0x83 => {
                let mod_reg_rm = read_u8(&self.data, pos)?;
                let imm = i64::from(read_u8(&self.data, pos)?);
                let reg = Expr::local(register(mod_reg_rm & 7, 32));
                Some(vec![Instr::assignment(
                    Rc::clone(&reg),
                    Expr::binary(BinaryOp::Add, reg, Expr::literal(imm, 8)),
                )])
            }
            0xB8..=0xBF => {
                let size = if prefix == 0x66 { 16 } else { 32 };
                let imm = read_immediate(&self.data, pos, size)?;
                let reg = Expr::local(register(byte0 & 7, size));
                Some(vec![Instr::assignment(reg, Expr::literal(imm, size))])
            }
            0xC3 => Some(vec![Rc::new(Instr::Return)]),
            0xC6 => {
                let mod_reg_rm = read_u8(&self.data, pos)?;
                let imm = i64::from(read_u8(&self.data, pos)?);
                let reg = Expr::local(register(mod_reg_rm & 7, 32));
                Some(vec![Instr::assignment(
                    Rc::new(Expr::AddressOf(reg)),
                    Expr::literal(imm, 8),
                )])
            }
            _ => None,
        }
    }
}

impl MachineCodeReader for Amd64Reader {
    fn architecture(&self) -> &'static str {
        "x86-64"
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

/// `dec r` updates the register and the zero flag.
fn decode_dec_reg(reg_id: u8, size: u8) -> Vec<Rc<Instr>> {
    let reg = Expr::local(register(reg_id, size));
    vec![
        Instr::assignment(
            Rc::clone(&reg),
            Expr::binary(BinaryOp::Subtract, Rc::clone(&reg), Expr::literal(1, size)),
        ),
        Instr::assignment(
            Expr::local(register_flag(RegisterFlag::Zero)),
            Expr::binary(BinaryOp::Equal, reg, Expr::literal(0, size)),
        ),
    ]
}

/// General-purpose register slot. The high byte registers (`ah`..`bh`)
/// share an id with their low counterparts at bit offset 8.
fn register(id: u8, size: u8) -> Local {
    let name = register_name(id, size);
    let mut id = u32::from(id);
    let mut offset = 0u16;
    if size == 8 && id >= 4 {
        id -= 4;
        offset = 8;
    }
    Local::new(id, name, offset, size)
}

fn register_flag(flag: RegisterFlag) -> Local {
    let (index, name) = match flag {
        RegisterFlag::Carry => (0, "cf"),
        RegisterFlag::Overflow => (1, "of"),
        RegisterFlag::Zero => (2, "zf"),
    };
    Local::new(8 + index, name, 0, 1)
}

fn register_name(id: u8, size: u8) -> String {
    const NAMES_8: [&str; 8] = ["al", "cl", "dl", "bl", "ah", "ch", "dh", "bh"];
    const NAMES_16: [&str; 8] = ["ax", "cx", "dx", "bx", "sp", "bp", "si", "di"];

    let id = usize::from(id & 7);
    match size {
        8 => NAMES_8[id].to_string(),
        16 => NAMES_16[id].to_string(),
        32 => format!("e{}", NAMES_16[id]),
        64 => format!("r{}", NAMES_16[id]),
        _ => unreachable!("invalid register size {}", size),
    }
}

fn read_immediate(data: &[u8], pos: &mut usize, size: u8) -> Option<i64> {
    match size {
        8 => Some(i64::from(read_u8(data, pos)?)),
        16 => {
            let bytes = data.get(*pos..*pos + 2)?;
            *pos += 2;
            Some(i64::from(i16::from_le_bytes([bytes[0], bytes[1]])))
        }
        32 => {
            let bytes = data.get(*pos..*pos + 4)?;
            *pos += 4;
            Some(i64::from(i32::from_le_bytes([
                bytes[0], bytes[1], bytes[2], bytes[3],
            ])))
        }
        _ => None,
    }
}
