//! Structured error types shared across bsh crates.

use std::collections::BTreeMap;
use std::fmt::{self, Display};

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Structured payload attached to every [`BshError`] variant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorInfo {
    /// Stable machine readable error code.
    pub code: String,
    /// Human readable diagnostic message.
    pub message: String,
    /// Contextual key value pairs (paths, run indices, etc.).
    #[serde(default)]
    pub context: BTreeMap<String, String>,
    /// Optional hint that may help the caller resolve the issue.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hint: Option<String>,
}

impl ErrorInfo {
    /// Creates a new error payload with the provided code and message.
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
            context: BTreeMap::new(),
            hint: None,
        }
    }

    /// Adds a context entry to the payload.
    pub fn with_context(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.context.insert(key.into(), value.into());
        self
    }

    /// Sets a human readable hint for remediation.
    pub fn with_hint(mut self, hint: impl Into<String>) -> Self {
        self.hint = Some(hint.into());
        self
    }
}

/// Canonical error type for the harness.
///
/// Only conditions that abort a sweep are errors. Per-run collection problems
/// are reported as values, see `CollectionFailure` in `bsh-exp`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Error)]
#[serde(tag = "family", content = "detail")]
pub enum BshError {
    /// Invalid sweep plan or command line configuration.
    #[error("config error: {0}")]
    Config(ErrorInfo),
    /// The benchmarked program could not be started.
    #[error("launch error: {0}")]
    Launch(ErrorInfo),
    /// Filesystem failures outside the per-run artifact read.
    #[error("io error: {0}")]
    Io(ErrorInfo),
    /// Master dataset or journal persistence failures.
    #[error("dataset error: {0}")]
    Dataset(ErrorInfo),
    /// Serialization and schema errors.
    #[error("serde error: {0}")]
    Serde(ErrorInfo),
}

impl Display for ErrorInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} (code: {})", self.message, self.code)?;
        if !self.context.is_empty() {
            write!(f, " | context: [")?;
            for (idx, (key, value)) in self.context.iter().enumerate() {
                if idx > 0 {
                    write!(f, ", ")?;
                }
                write!(f, "{key}={value}")?;
            }
            write!(f, "]")?;
        }
        if let Some(hint) = &self.hint {
            write!(f, " | hint: {hint}")?;
        }
        Ok(())
    }
}

impl BshError {
    /// Returns a reference to the payload describing the error.
    pub fn info(&self) -> &ErrorInfo {
        match self {
            BshError::Config(info)
            | BshError::Launch(info)
            | BshError::Io(info)
            | BshError::Dataset(info)
            | BshError::Serde(info) => info,
        }
    }

    /// Whether the error was raised while starting the benchmarked program.
    pub fn is_launch(&self) -> bool {
        matches!(self, BshError::Launch(_))
    }

    /// Wraps an [`std::io::Error`] raised while touching `path`.
    pub fn io(code: &str, path: &std::path::Path, err: &std::io::Error) -> Self {
        BshError::Io(
            ErrorInfo::new(code, err.to_string())
                .with_context("path", path.display().to_string()),
        )
    }
}
