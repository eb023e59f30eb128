// CLI application
use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use std::path::PathBuf;

mod commands;

#[derive(Parser)]
#[command(name = "udec")]
#[command(about = "Universal decompiler")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(clap::Subcommand)]
enum Commands {
    /// Decompile one function from a binary to C-style pseudo-source
    Decompile {
        /// Path to the input binary (ELF, PE or raw image)
        #[arg(short, long)]
        input: PathBuf,

        /// Virtual address of the function entry point, e.g. 0x401000
        #[arg(short, long, value_parser = parse_hex_address)]
        address: u64,

        /// Target architecture of the input binary
        #[arg(long, default_value = "x86")]
        arch: String,

        /// Emit the raw reconstruction, skipping restructuring strategies
        #[arg(long)]
        raw: bool,

        /// Print pipeline statistics as JSON to stderr
        #[arg(long)]
        stats: bool,
    },
}

fn main() -> anyhow::Result<()> {
    env_logger::init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Decompile {
            input,
            address,
            arch,
            raw,
            stats,
        } => {
            let pb = create_progress_bar("Decompiling...");
            let source = commands::decompile_binary(&input, address, &arch, raw, stats)?;
            pb.finish_with_message("Decompilation complete");
            println!("{}", source);
        }
    }

    Ok(())
}

/// Accepts bare hex digits or a `0x` prefix.
fn parse_hex_address(value: &str) -> Result<u64, String> {
    let digits = value
        .strip_prefix("0x")
        .or_else(|| value.strip_prefix("0X"))
        .unwrap_or(value);
    u64::from_str_radix(digits, 16).map_err(|err| format!("invalid address '{}': {}", value, err))
}

fn create_progress_bar(message: &str) -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    pb.set_style(
        ProgressStyle::default_spinner()
            .template("{spinner:.green} {msg}")
            .unwrap()
            .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"]),
    );
    pb.set_message(message.to_string());
    pb
}
