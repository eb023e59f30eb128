//! Machine code readers.
//!
//! A reader owns a loaded binary image and produces the flat decoded
//! instruction stream that control-flow reconstruction consumes. Decoding is
//! linear: it starts at the requested virtual address and walks forward one
//! unit at a time, stopping at the first return or the first byte sequence
//! it does not understand. A single machine instruction may decode to
//! several statements (the instruction itself plus flag or index-register
//! updates); only the first statement of a unit carries an address.
//!
//! # Address mapping
//! Virtual addresses are mapped to file offsets through the binary's load
//! segments, parsed with `goblin` for ELF and PE images. Raw images fall
//! back to a flat mapping at a per-architecture base address.

mod amd64;
mod arm;

pub use amd64::Amd64Reader;
pub use arm::ArmReader;

use goblin::Object;

use crate::decompiler::error::{DecompilerError, Result};
use crate::decompiler::ir::tree_table::AddressedInstruction;

/// Decodes machine code into the flat instruction stream.
pub trait MachineCodeReader {
    /// Human-readable architecture name, used in logs and errors.
    fn architecture(&self) -> &'static str;

    /// Decode linearly from `start_virtual_address` until a return or the
    /// first undecodable unit.
    fn read(&self, start_virtual_address: u64) -> Result<Vec<AddressedInstruction>>;
}

/// One mapped region of the binary image.
#[derive(Debug, Clone, Copy)]
struct Segment {
    virtual_address: u64,
    file_offset: u64,
    size: u64,
}

fn file_offset(segments: &[Segment], virtual_address: u64) -> Result<usize> {
    for segment in segments {
        if virtual_address >= segment.virtual_address
            && virtual_address < segment.virtual_address + segment.size
        {
            let offset = segment.file_offset + (virtual_address - segment.virtual_address);
            return Ok(offset as usize);
        }
    }
    Err(DecompilerError::UnmappedAddress {
        address: virtual_address,
    })
}

fn virtual_address(segments: &[Segment], file_offset: usize) -> u64 {
    let file_offset = file_offset as u64;
    for segment in segments {
        if file_offset >= segment.file_offset && file_offset < segment.file_offset + segment.size {
            return segment.virtual_address + (file_offset - segment.file_offset);
        }
    }
    file_offset
}

/// Parse load segments from the container format. Raw images map flat at
/// `raw_base`.
fn map_segments(data: &[u8], raw_base: u64) -> Result<Vec<Segment>> {
    match Object::parse(data) {
        Ok(Object::Elf(elf)) => {
            let segments = elf
                .program_headers
                .iter()
                .filter(|header| header.p_type == goblin::elf::program_header::PT_LOAD)
                .map(|header| Segment {
                    virtual_address: header.p_vaddr,
                    file_offset: header.p_offset,
                    size: header.p_filesz,
                })
                .collect();
            Ok(segments)
        }
        Ok(Object::PE(pe)) => {
            let image_base = pe.image_base as u64;
            let segments = pe
                .sections
                .iter()
                .map(|section| Segment {
                    virtual_address: image_base + u64::from(section.virtual_address),
                    file_offset: u64::from(section.pointer_to_raw_data),
                    size: u64::from(section.size_of_raw_data),
                })
                .collect();
            Ok(segments)
        }
        Ok(_) | Err(_) => Ok(vec![Segment {
            virtual_address: raw_base,
            file_offset: 0,
            size: data.len() as u64,
        }]),
    }
}

fn read_u8(data: &[u8], pos: &mut usize) -> Option<u8> {
    let byte = *data.get(*pos)?;
    *pos += 1;
    Some(byte)
}

fn read_u32_be(data: &[u8], pos: &mut usize) -> Option<u32> {
    let bytes = data.get(*pos..*pos + 4)?;
    *pos += 4;
    Some(u32::from_be_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]))
}
