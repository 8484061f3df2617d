use clap::{Parser, Subcommand};
use framecalc::analysis::Analysis;
use framecalc::progress::LogSink;
use log::error;
use std::path::PathBuf;
use std::process::ExitCode;

/// framecalc: 3D frame finite-element solver
#[derive(Parser)]
#[command(name = "framecalc")]
#[command(about = "3D frame finite-element solver: sparse assembly, direct/iterative solve, per-member diagrams")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Solve a model file and report displacements, reactions, and member diagrams
    Solve {
        /// Input model file (.json, .yaml, or .yml)
        input: PathBuf,

        /// Write the full result as JSON to this file instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Force the iterative (conjugate gradient) solver regardless of problem size
        #[arg(long)]
        iterative: bool,
    },

    /// Validate a model file's topology without solving it
    Validate {
        input: PathBuf,
    },
}

fn main() -> ExitCode {
    env_logger::init();
    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Solve { input, output, iterative } => run_solve(input, output, iterative),
        Commands::Validate { input } => run_validate(input),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{}", e);
            ExitCode::FAILURE
        }
    }
}

fn run_solve(input: PathBuf, output: Option<PathBuf>, iterative: bool) -> framecalc::error::Result<()> {
    let mut analysis = Analysis::from_path(&input)?;
    if iterative {
        analysis = analysis.with_iterative_solver();
    }

    let mut sink = LogSink::default();
    let result = analysis.run_with_sink(&mut sink)?;

    let json = serde_json::to_string_pretty(&result)?;
    match output {
        Some(path) => std::fs::write(path, json)?,
        None => println!("{}", json),
    }
    Ok(())
}

fn run_validate(input: PathBuf) -> framecalc::error::Result<()> {
    let analysis = Analysis::from_path(&input)?;
    println!(
        "model ok: {} nodes, {} members, {} loads",
        analysis.model().nodes.len(),
        analysis.model().members.len(),
        analysis.model().loads.len()
    );
    Ok(())
}
