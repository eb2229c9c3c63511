pub mod plan;
pub mod run;

use std::error::Error;
use std::path::PathBuf;

use bsh_exp::SweepPlan;
use clap::Args;

/// Plan file plus per-dimension overrides shared by every subcommand.
#[derive(Args, Debug, Default)]
pub struct PlanArgs {
    /// YAML sweep plan. Omitted fields fall back to the built-in sweep.
    #[arg(long)]
    pub plan: Option<PathBuf>,
    /// Comma separated tree depths.
    #[arg(long, value_delimiter = ',')]
    pub depths: Option<Vec<u64>>,
    /// Comma separated batch sizes.
    #[arg(long, value_delimiter = ',')]
    pub batch_sizes: Option<Vec<u64>>,
    /// Comma separated thread counts.
    #[arg(long, value_delimiter = ',')]
    pub thread_counts: Option<Vec<u64>>,
    /// Comma separated total operation counts.
    #[arg(long, value_delimiter = ',')]
    pub total_ops: Option<Vec<u64>>,
}

impl PlanArgs {
    /// Loads the plan file (or the default plan) and applies dimension overrides.
    pub fn resolve(&self) -> Result<SweepPlan, Box<dyn Error>> {
        let mut plan = match &self.plan {
            Some(path) => SweepPlan::load(path)?,
            None => SweepPlan::default(),
        };
        if let Some(depths) = &self.depths {
            plan.space.depths = depths.clone();
        }
        if let Some(batch_sizes) = &self.batch_sizes {
            plan.space.batch_sizes = batch_sizes.clone();
        }
        if let Some(thread_counts) = &self.thread_counts {
            plan.space.thread_counts = thread_counts.clone();
        }
        if let Some(total_ops) = &self.total_ops {
            plan.space.total_ops = total_ops.clone();
        }
        Ok(plan)
    }
}
