//! Intermediate representation for decompiled code.
//!
//! Expressions and instructions are immutable `Rc`-shared trees built on the
//! persistent node abstraction in [`tree`]. Control flow is held in an
//! address-keyed [`tree_table::InstructionTreeTable`] of instruction trees,
//! wrapped in a [`function::Function`] for the strategy pipeline.

pub mod expr;
pub mod function;
pub mod instr;
pub mod tree;
pub mod tree_table;
