//! fuser CLI entry point.

mod cli;

use clap::Parser;
use cli::{Cli, Command};
use fuser::report;
use fuser_ir::print_fusion;
use tracing_subscriber::EnvFilter;

fn main() {
    let cli = Cli::parse();
    init_tracing(&cli.log);

    match cli.command {
        Command::Show { sample, clone } => {
            let fusion = sample.build();
            if clone {
                let (copy, map) = fusion.copy();
                tracing::info!(cloned = map.len(), "printing copy of {sample:?}");
                print!("{}", print_fusion(&copy));
            } else {
                print!("{}", print_fusion(&fusion));
            }
        }
        Command::Analyze { sample } => {
            let mut fusion = sample.build();
            println!("{}", report::analyze(&mut fusion));
        }
        Command::Simplify { sample } => {
            let mut fusion = sample.build();
            println!("{}", report::simplify(&mut fusion));
        }
    }
}

fn init_tracing(default_filter: &str) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}
