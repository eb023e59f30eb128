//! The unit passed through the decompile pipeline.

use super::tree_table::InstructionTreeTable;

/// A decompiled routine: a name plus its instruction tree table.
///
/// Created once per routine from the reconstructed table; strategies mutate
/// it by replacing whole tree entries, and it is immutable once handed to
/// emission.
#[derive(Debug, Clone)]
pub struct Function {
    pub name: String,
    pub table: InstructionTreeTable,
}

impl Function {
    pub fn new(name: impl Into<String>, table: InstructionTreeTable) -> Self {
        Function {
            name: name.into(),
            table,
        }
    }
}
