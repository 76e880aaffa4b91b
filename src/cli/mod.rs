// ============================================================
// Layer 1 - CLI / Presentation Layer
// ============================================================
// This is the entry point for all user interaction.
// It uses the `clap` crate to parse command line arguments.
// All benchmark logic is delegated to Layer 2 (application).
//
// Three commands are supported:
//   1. `classical` - TF-IDF + four classical classifiers
//   2. `neural`    - RNN, LSTM and transformer classifiers
//   3. `compare`   - both, on one identical split
//
// Every command prints a results table and writes
// <output-dir>/<command>_report.json.
//
// Reference: Rust Book §7 (Modules), §12 (CLI programs)

pub mod commands;

use anyhow::Result;
use clap::Parser;
use commands::{ClassicalArgs, Commands, CompareArgs, NeuralArgs};
use std::path::Path;

use crate::domain::report::RunReport;
use crate::infra::report::{print_report, write_report};

#[derive(Parser, Debug)]
#[command(
    name = "phish-bench",
    version,
    about = "Compare classical and neural phishing / spam email classifiers on one dataset."
)]
pub struct Cli {
    /// The benchmark to run
    #[command(subcommand)]
    pub command: Commands,
}

impl Cli {
    /// Match on the subcommand and dispatch to the correct use case.
    pub fn run(self) -> Result<()> {
        match self.command {
            Commands::Classical(args) => run_classical(args),
            Commands::Neural(args)    => run_neural(args),
            Commands::Compare(args)   => run_compare(args),
        }
    }
}

fn run_classical(args: ClassicalArgs) -> Result<()> {
    use crate::application::classical_use_case::{ClassicalConfig, ClassicalUseCase};

    let config: ClassicalConfig = args.into();
    tracing::info!("Classical benchmark on {}", config.data.dataset);

    let output_dir = config.data.output_dir.clone();
    let report = ClassicalUseCase::new(config).execute()?;
    finish(&report, &output_dir, "classical")
}

fn run_neural(args: NeuralArgs) -> Result<()> {
    use crate::application::neural_use_case::{NeuralConfig, NeuralUseCase};

    let config: NeuralConfig = args.into();
    tracing::info!("Neural benchmark on {}", config.data.dataset);

    let output_dir = config.data.output_dir.clone();
    let report = NeuralUseCase::new(config).execute()?;
    finish(&report, &output_dir, "neural")
}

fn run_compare(args: CompareArgs) -> Result<()> {
    use crate::application::{
        classical_use_case::ClassicalConfig, compare_use_case::CompareUseCase, neural_use_case::NeuralConfig,
    };

    let (classical, neural): (ClassicalConfig, NeuralConfig) = args.into();
    tracing::info!("Comparing classical and neural models on {}", classical.data.dataset);

    let output_dir = classical.data.output_dir.clone();
    let report = CompareUseCase::new(classical, neural)?.execute()?;
    finish(&report, &output_dir, "compare")
}

fn finish(report: &RunReport, output_dir: &str, command: &str) -> Result<()> {
    print_report(report);
    let path = write_report(report, Path::new(output_dir), command)?;
    println!("\nReport saved to {}", path.display());
    Ok(())
}
