//! Core library for the UDEC decompiler.
//!
//! The decompilation model lives in [`decompiler`]: a persistent
//! intermediate representation for expressions and instructions, the
//! control-flow reconstruction that raises a flat decoded instruction
//! stream into a table of instruction trees, and the strategy pipeline
//! that folds that table into structured control flow before emission.

pub mod decompiler;
