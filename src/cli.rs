//! Command-line interface for the fuser driver.

use clap::{Parser, Subcommand};
use fuser::samples::Sample;

#[derive(Parser)]
#[command(name = "fuser")]
#[command(about = "Inspect sample fusion graphs", long_about = None)]
pub struct Cli {
    /// Log filter used when `RUST_LOG` is unset (e.g. `debug`, `fuser_ir=trace`)
    #[arg(long, global = true, default_value = "warn")]
    pub log: String,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Print a sample fusion
    Show {
        #[arg(value_enum)]
        sample: Sample,

        /// Print a deep copy instead of the original
        #[arg(long)]
        clone: bool,
    },
    /// Report per-value facts of a sample fusion
    Analyze {
        #[arg(value_enum)]
        sample: Sample,
    },
    /// Fold arithmetic identities in a sample fusion
    Simplify {
        #[arg(value_enum)]
        sample: Sample,
    },
}
