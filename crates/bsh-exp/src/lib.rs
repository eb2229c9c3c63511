//! Benchmark sweep orchestration: enumerate the configuration space, invoke
//! the benchmarked program once per point, collect its result artifact and
//! accumulate the master dataset.

mod collect;
mod dataset;
mod hash;
mod invoke;
mod plan;
mod report;
mod serde;
mod space;
mod sweep;

pub use collect::{clear_artifact, collect_artifact, CollectionFailure};
pub use dataset::{Accumulator, Admission, DatasetOutcome, Journal, JournalEntry};
pub use hash::stable_hash_string;
pub use invoke::{
    Invocation, InvocationOutcome, ProcessRunner, Runner, ARTIFACT_PATH_ENV, RUN_INDEX_ENV,
};
pub use plan::{ArtifactChannel, ExitPolicy, SchemaPolicy, SweepPlan};
pub use report::{RunRecord, SweepReport};
pub use space::{Points, SweepSpace};
pub use sweep::run_sweep;

pub use self::serde::{from_json_slice, from_yaml_str, to_canonical_json_bytes, to_yaml_string};
