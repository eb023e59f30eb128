//! Source emission.

mod c_writer;
mod writer;

pub use c_writer::CLanguageWriter;
pub use writer::CodeWriter;

use crate::decompiler::ir::function::Function;

/// Renders a decompiled function as source text in some target language.
pub trait LanguageWriter {
    fn write(&self, function: &Function) -> String;
}
