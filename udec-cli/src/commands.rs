// CLI command handlers
use anyhow::{Context, Result};
use std::path::Path;

use udec_core::decompiler::error::DecompilerError;
use udec_core::decompiler::pipeline::DecompilePipeline;
use udec_core::decompiler::reader::{Amd64Reader, ArmReader, MachineCodeReader};

pub fn decompile_binary(
    input: &Path,
    address: u64,
    arch: &str,
    raw: bool,
    stats: bool,
) -> Result<String> {
    log::info!("Reading binary: {}", input.display());

    let reader: Box<dyn MachineCodeReader> = match arch {
        "x86" | "x86-64" | "amd64" => Box::new(
            Amd64Reader::from_file(input)
                .with_context(|| format!("Failed to load binary: {}", input.display()))?,
        ),
        "arm" => Box::new(
            ArmReader::from_file(input)
                .with_context(|| format!("Failed to load binary: {}", input.display()))?,
        ),
        other => {
            return Err(DecompilerError::UnsupportedArchitecture(other.to_string()).into());
        }
    };

    let output = DecompilePipeline::decompile(reader.as_ref(), address, !raw)
        .with_context(|| format!("Failed to decompile function at {:#x}", address))?;

    if stats {
        // Stats go to stderr so stdout stays clean pseudo-source
        eprintln!("{}", serde_json::to_string_pretty(&output.stats)?);
    }

    Ok(output.source)
}
