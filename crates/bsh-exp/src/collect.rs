use std::fs::{self, File};
use std::io;
use std::path::Path;

use bsh_core::errors::BshError;
use bsh_core::RunResult;
use csv::ReaderBuilder;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

/// Why a run contributed no row to the master dataset.
///
/// These never abort a sweep.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Error)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum CollectionFailure {
    #[error("result artifact was not produced")]
    MissingArtifact,
    #[error("result artifact has no data rows")]
    EmptyArtifact,
    #[error("result artifact could not be parsed: {detail}")]
    MalformedArtifact { detail: String },
    #[error("benchmark process exceeded its time budget")]
    TimeoutFailure,
    #[error("benchmark process exited with {code:?}")]
    NonZeroExit { code: Option<i32> },
    #[error("result fields differ from the first collected result")]
    SchemaMismatch,
}

impl CollectionFailure {
    /// Stable label used in logs and the sweep report.
    pub fn kind(&self) -> &'static str {
        match self {
            CollectionFailure::MissingArtifact => "missing_artifact",
            CollectionFailure::EmptyArtifact => "empty_artifact",
            CollectionFailure::MalformedArtifact { .. } => "malformed_artifact",
            CollectionFailure::TimeoutFailure => "timeout_failure",
            CollectionFailure::NonZeroExit { .. } => "non_zero_exit",
            CollectionFailure::SchemaMismatch => "schema_mismatch",
        }
    }
}

/// Reads the first data row of the artifact at `path`.
///
/// Rows after the first are ignored.
pub fn collect_artifact(path: &Path) -> Result<RunResult, CollectionFailure> {
    let file = match File::open(path) {
        Ok(file) => file,
        Err(err) if err.kind() == io::ErrorKind::NotFound => {
            return Err(CollectionFailure::MissingArtifact)
        }
        Err(err) => {
            return Err(CollectionFailure::MalformedArtifact {
                detail: err.to_string(),
            })
        }
    };
    let mut reader = ReaderBuilder::new().has_headers(true).from_reader(file);
    let headers = reader
        .headers()
        .map_err(|err| malformed(&err))?
        .clone();
    if headers.is_empty() {
        return Err(CollectionFailure::EmptyArtifact);
    }

    let mut records = reader.records();
    let first = match records.next() {
        None => return Err(CollectionFailure::EmptyArtifact),
        Some(Err(err)) => return Err(malformed(&err)),
        Some(Ok(record)) => record,
    };
    let extra = records.count();
    if extra > 0 {
        debug!(path = %path.display(), extra, "ignoring additional artifact rows");
    }

    Ok(headers.iter().zip(first.iter()).collect())
}

/// Removes an artifact left behind by an earlier run.
///
/// Without this a run that never writes its artifact would be credited with
/// the previous run's numbers whenever the path is shared.
pub fn clear_artifact(path: &Path) -> Result<(), BshError> {
    match fs::remove_file(path) {
        Ok(()) => {
            debug!(path = %path.display(), "removed stale artifact");
            Ok(())
        }
        Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(()),
        Err(err) => Err(BshError::io("artifact-clear", path, &err)),
    }
}

fn malformed(err: &csv::Error) -> CollectionFailure {
    CollectionFailure::MalformedArtifact {
        detail: err.to_string(),
    }
}
