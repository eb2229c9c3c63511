use std::fmt;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// One parameter combination handed to the benchmarked program.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ConfigurationPoint {
    /// Tree depth.
    pub depth: u64,
    /// Number of operations per batch.
    pub batch_size: u64,
    /// Worker threads used by the benchmarked program.
    pub thread_count: u64,
    /// Total operations in the generated workload.
    pub total_ops: u64,
}

impl ConfigurationPoint {
    /// Creates a point from its four coordinates.
    pub const fn new(depth: u64, batch_size: u64, thread_count: u64, total_ops: u64) -> Self {
        Self {
            depth,
            batch_size,
            thread_count,
            total_ops,
        }
    }

    /// Renders the stdin payload: four newline-terminated decimal lines in
    /// the order depth, batch size, thread count, total operations.
    pub fn stdin_payload(&self) -> String {
        format!(
            "{}\n{}\n{}\n{}\n",
            self.depth, self.batch_size, self.thread_count, self.total_ops
        )
    }
}

impl fmt::Display for ConfigurationPoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "depth={}, batch={}, threads={}, ops={}",
            self.depth, self.batch_size, self.thread_count, self.total_ops
        )
    }
}

/// Metrics record parsed from the first data row of a result artifact.
///
/// Field order follows the artifact header. The harness never interprets the
/// values.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RunResult {
    fields: IndexMap<String, String>,
}

impl RunResult {
    /// Looks up a field value by name.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.fields.get(name).map(String::as_str)
    }

    /// Field names in header order.
    pub fn field_names(&self) -> impl Iterator<Item = &str> {
        self.fields.keys().map(String::as_str)
    }

    /// Number of fields.
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    /// Whether the record carries no fields.
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Whether both records carry the same field names, ignoring order.
    pub fn same_fields(&self, other: &RunResult) -> bool {
        self.len() == other.len() && self.field_names().all(|name| other.fields.contains_key(name))
    }
}

impl<K, V> FromIterator<(K, V)> for RunResult
where
    K: Into<String>,
    V: Into<String>,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            fields: iter
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }
}
