use std::error::Error;
use std::io;
use std::process::ExitCode;

use bsh_core::ConfigurationPoint;
use bsh_exp::to_canonical_json_bytes;
use clap::{Args, ValueEnum};
use serde::Serialize;

use super::PlanArgs;

#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
pub enum Format {
    Csv,
    Json,
}

#[derive(Args, Debug)]
pub struct PlanCmdArgs {
    #[command(flatten)]
    pub plan: PlanArgs,
    #[arg(long, value_enum, default_value_t = Format::Csv)]
    pub format: Format,
}

#[derive(Debug, Serialize)]
struct Enumeration {
    count: usize,
    points: Vec<ConfigurationPoint>,
}

/// Prints the configuration points a `run` would attempt, in attempt order.
pub fn run(args: &PlanCmdArgs) -> Result<ExitCode, Box<dyn Error>> {
    let plan = args.plan.resolve()?;
    plan.validate()?;
    match args.format {
        Format::Csv => {
            let mut writer = csv::Writer::from_writer(io::stdout().lock());
            if plan.space.is_empty() {
                writer.write_record(["depth", "batch_size", "thread_count", "total_ops"])?;
            }
            for point in plan.space.points() {
                writer.serialize(point)?;
            }
            writer.flush()?;
        }
        Format::Json => {
            let enumeration = Enumeration {
                count: plan.space.len(),
                points: plan.space.points().collect(),
            };
            let bytes = to_canonical_json_bytes(&enumeration)?;
            println!("{}", String::from_utf8(bytes)?);
        }
    }
    Ok(ExitCode::SUCCESS)
}
