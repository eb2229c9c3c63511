use std::process::ExitCode;

use clap::{Parser, Subcommand};
use commands::{
    plan::{self, PlanCmdArgs},
    run::{self, RunArgs},
};
use tracing::error;
use tracing_subscriber::EnvFilter;

mod commands;

#[derive(Parser, Debug)]
#[command(name = "bsh", about = "Benchmark sweep harness")]
struct Cli {
    /// Log per-run details.
    #[arg(long, short, global = true)]
    verbose: bool,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run the benchmark once per configuration point and write the master dataset.
    Run(RunArgs),
    /// List the configuration points without running anything.
    Plan(PlanCmdArgs),
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose);
    let result = match cli.command {
        Command::Run(args) => run::run(&args),
        Command::Plan(args) => plan::run(&args),
    };
    match result {
        Ok(code) => code,
        Err(err) => {
            error!("{err}");
            ExitCode::FAILURE
        }
    }
}

fn init_logging(verbose: bool) {
    let default = if verbose {
        "bsh_exp=debug,bsh=debug"
    } else {
        "bsh_exp=info,bsh=info"
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}
