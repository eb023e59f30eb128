//! End-to-end decompilation pipeline.
//!
//! Decode, reconstruct, restructure, emit. Each stage logs at info level so
//! a `-v` run reads as a narrative of the pipeline.

use serde::Serialize;

use crate::decompiler::codegen::{CLanguageWriter, LanguageWriter};
use crate::decompiler::error::Result;
use crate::decompiler::ir::function::Function;
use crate::decompiler::ir::tree_table::InstructionTreeTable;
use crate::decompiler::reader::MachineCodeReader;
use crate::decompiler::strategy::run_default_pipeline;

/// Counters captured as the pipeline runs, for `--stats` output.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct PipelineStats {
    pub decoded_instructions: usize,
    pub trees_after_reconstruction: usize,
    pub trees_after_strategies: usize,
}

/// Result of decompiling one function.
pub struct DecompileOutput {
    pub function: Function,
    pub source: String,
    pub stats: PipelineStats,
}

pub struct DecompilePipeline;

impl DecompilePipeline {
    /// Decompile the function at `address`. With `run_strategies` off the
    /// output is the raw reconstruction, one labeled tree per basic unit.
    pub fn decompile(
        reader: &dyn MachineCodeReader,
        address: u64,
        run_strategies: bool,
    ) -> Result<DecompileOutput> {
        log::info!(
            "Step 1: Decoding {} machine code at {:#x}",
            reader.architecture(),
            address
        );
        let stream = reader.read(address)?;
        let decoded_instructions = stream.len();

        log::info!("Step 2: Reconstructing control flow");
        let table = InstructionTreeTable::from_instruction_stream(&stream)?;
        let trees_after_reconstruction = table.len();

        let mut function = Function::new(format!("sub_{:06X}", address), table);

        if run_strategies {
            log::info!("Step 3: Running restructuring strategies");
            run_default_pipeline(&mut function);
        } else {
            log::info!("Step 3: Skipping restructuring strategies");
        }
        let trees_after_strategies = function.table.len();

        log::info!("Step 4: Emitting C source");
        let source = CLanguageWriter.write(&function);

        Ok(DecompileOutput {
            function,
            source,
            stats: PipelineStats {
                decoded_instructions,
                trees_after_reconstruction,
                trees_after_strategies,
            },
        })
    }
}
