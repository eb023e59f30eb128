pub mod codegen;
pub mod error;
pub mod ir;
pub mod pipeline;
pub mod reader;
pub mod strategy;
