//! Decompiler error types.
//!
//! All fatal failures in the core are construction-time invariant
//! violations or reader failures; strategy passes never produce errors,
//! they skip rewrites whose target shape does not match.

use thiserror::Error;

/// Decompiler error types.
#[derive(Error, Debug)]
pub enum DecompilerError {
    /// A `TreeRef` targets an address that is not a key in the tree table.
    ///
    /// Raised after control-flow reconstruction; the table must be complete
    /// before any strategy runs.
    #[error("dangling tree reference: no instruction tree at {address:#x}")]
    DanglingTreeReference { address: u64 },

    /// The requested virtual address is not mapped by any section of the
    /// input binary.
    #[error("virtual address {address:#x} is not mapped by the input binary")]
    UnmappedAddress { address: u64 },

    /// An instruction tree would begin at an unaddressed instruction.
    ///
    /// The reader contract requires every decoded unit to begin with an
    /// addressed instruction.
    #[error("instruction tree begins at an unaddressed instruction")]
    MissingAddress,

    /// The input binary could not be parsed.
    #[error("binary parse error: {0}")]
    Binary(String),

    /// Architecture with no machine-code reader.
    #[error("unknown or unsupported architecture: {0}")]
    UnsupportedArchitecture(String),

    /// Underlying IO failure while reading the input binary.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<goblin::error::Error> for DecompilerError {
    #[cold] // Error paths are cold
    fn from(err: goblin::error::Error) -> Self {
        DecompilerError::Binary(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, DecompilerError>;
