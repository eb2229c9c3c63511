use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use bsh_core::errors::BshError;
use bsh_core::ConfigurationPoint;
use serde::{Deserialize, Serialize};

use crate::collect::CollectionFailure;
use crate::dataset::DatasetOutcome;
use crate::serde::to_canonical_json_bytes;

/// Per-attempt summary.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunRecord {
    pub index: usize,
    pub point: ConfigurationPoint,
    pub collected: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub failure: Option<CollectionFailure>,
    pub exit_code: Option<i32>,
    pub elapsed_ms: u64,
}

/// Aggregate sweep report persisted next to the master dataset.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SweepReport {
    pub plan_hash: String,
    pub attempted: usize,
    pub collected: usize,
    pub runs: Vec<RunRecord>,
    pub dataset: DatasetOutcome,
}

impl SweepReport {
    /// True when the sweep finished without a single usable result.
    pub fn no_results(&self) -> bool {
        matches!(self.dataset, DatasetOutcome::NoResults)
    }

    /// Number of failed runs per failure kind.
    pub fn failure_counts(&self) -> BTreeMap<&'static str, usize> {
        let mut counts = BTreeMap::new();
        for failure in self.runs.iter().filter_map(|run| run.failure.as_ref()) {
            *counts.entry(failure.kind()).or_insert(0) += 1;
        }
        counts
    }

    /// Writes the report as canonical JSON.
    pub fn persist(&self, path: &Path) -> Result<(), BshError> {
        let bytes = to_canonical_json_bytes(self)?;
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|err| BshError::io("report-dir", parent, &err))?;
        }
        fs::write(path, bytes).map_err(|err| BshError::io("report-write", path, &err))
    }
}
