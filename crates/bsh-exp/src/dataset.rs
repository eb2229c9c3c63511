use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use bsh_core::errors::{BshError, ErrorInfo};
use bsh_core::{ConfigurationPoint, RunResult};
use csv::WriterBuilder;
use serde::{Deserialize, Serialize};
use tempfile::NamedTempFile;
use tracing::{debug, info};

use crate::collect::CollectionFailure;
use crate::plan::SchemaPolicy;

/// Result of offering a collected row to the [`Accumulator`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Admission {
    Accepted,
    Rejected(CollectionFailure),
}

/// What happened when the master dataset was finalized.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum DatasetOutcome {
    /// The dataset was written with `rows` rows.
    Written {
        path: PathBuf,
        rows: usize,
        columns: Vec<String>,
    },
    /// Nothing was collected, so no file was written.
    NoResults,
}

/// One line of the incremental journal.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JournalEntry {
    pub run: usize,
    pub point: ConfigurationPoint,
    pub result: RunResult,
}

/// Append-only JSON-lines file receiving each accepted row as soon as it is
/// accepted, so a harness crash does not lose everything collected so far.
#[derive(Debug)]
pub struct Journal {
    path: PathBuf,
    writer: BufWriter<File>,
}

impl Journal {
    /// Creates (or truncates) the journal at `path`.
    pub fn create(path: impl Into<PathBuf>) -> Result<Self, BshError> {
        let path = path.into();
        ensure_parent(&path)?;
        let file = File::create(&path).map_err(|err| {
            BshError::Dataset(
                ErrorInfo::new("journal-open", "failed to create result journal")
                    .with_context("path", path.display().to_string())
                    .with_hint(err.to_string()),
            )
        })?;
        Ok(Self {
            path,
            writer: BufWriter::new(file),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn append(&mut self, entry: &JournalEntry) -> Result<(), BshError> {
        serde_json::to_writer(&mut self.writer, entry).map_err(|err| {
            BshError::Dataset(ErrorInfo::new("journal-encode", err.to_string()))
        })?;
        self.writer
            .write_all(b"\n")
            .and_then(|()| self.writer.flush())
            .map_err(|err| BshError::io("journal-write", &self.path, &err))
    }

    /// Deletes the journal once its rows are safely in the master dataset.
    pub fn remove(self) -> Result<(), BshError> {
        let Journal { path, writer } = self;
        drop(writer);
        fs::remove_file(&path).map_err(|err| BshError::io("journal-remove", &path, &err))
    }

    /// Reads every entry of a journal file.
    pub fn read(path: &Path) -> Result<Vec<JournalEntry>, BshError> {
        let text = fs::read_to_string(path).map_err(|err| BshError::io("journal-read", path, &err))?;
        text.lines()
            .filter(|line| !line.trim().is_empty())
            .map(|line| {
                serde_json::from_str(line).map_err(|err| {
                    BshError::Dataset(
                        ErrorInfo::new("journal-decode", err.to_string())
                            .with_context("path", path.display().to_string()),
                    )
                })
            })
            .collect()
    }
}

/// In-memory ordered accumulator for the master dataset.
#[derive(Debug)]
pub struct Accumulator {
    policy: SchemaPolicy,
    columns: Vec<String>,
    rows: Vec<RunResult>,
    journal: Option<Journal>,
}

impl Accumulator {
    pub fn new(policy: SchemaPolicy) -> Self {
        Self {
            policy,
            columns: Vec::new(),
            rows: Vec::new(),
            journal: None,
        }
    }

    pub fn with_journal(mut self, journal: Journal) -> Self {
        self.journal = Some(journal);
        self
    }

    /// Offers the result of attempt `run` to the dataset.
    ///
    /// The first accepted row fixes the leading columns. Under
    /// [`SchemaPolicy::Strict`] any later row with a different field set is
    /// rejected; under [`SchemaPolicy::Union`] new fields are appended as
    /// columns.
    pub fn accept(
        &mut self,
        run: usize,
        point: ConfigurationPoint,
        result: RunResult,
    ) -> Result<Admission, BshError> {
        if let Some(first) = self.rows.first() {
            match self.policy {
                SchemaPolicy::Strict if !first.same_fields(&result) => {
                    return Ok(Admission::Rejected(CollectionFailure::SchemaMismatch));
                }
                SchemaPolicy::Strict => {}
                SchemaPolicy::Union => {
                    for name in result.field_names() {
                        if !self.columns.iter().any(|column| column == name) {
                            debug!(run, column = name, "extending dataset schema");
                            self.columns.push(name.to_string());
                        }
                    }
                }
            }
        } else {
            self.columns = result.field_names().map(str::to_string).collect();
        }

        if let Some(journal) = self.journal.as_mut() {
            journal.append(&JournalEntry {
                run,
                point,
                result: result.clone(),
            })?;
        }
        self.rows.push(result);
        Ok(Admission::Accepted)
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    /// Writes the master dataset to `output`, or reports that there was
    /// nothing to write.
    ///
    /// The file is written to a temporary sibling first and renamed into
    /// place, so readers never observe a partial dataset.
    pub fn finalize(self, output: &Path, missing_marker: &str) -> Result<DatasetOutcome, BshError> {
        let Accumulator {
            columns,
            rows,
            journal,
            ..
        } = self;

        if rows.is_empty() {
            if let Some(journal) = journal {
                journal.remove()?;
            }
            return Ok(DatasetOutcome::NoResults);
        }

        let dir = ensure_parent(output)?;
        let tmp = NamedTempFile::new_in(&dir).map_err(|err| BshError::io("dataset-temp", &dir, &err))?;
        {
            let mut writer = WriterBuilder::new().from_writer(BufWriter::new(tmp.as_file()));
            writer
                .write_record(&columns)
                .map_err(|err| wrap_csv("dataset-write-header", err))?;
            for row in &rows {
                let record = columns
                    .iter()
                    .map(|column| row.get(column).unwrap_or(missing_marker));
                writer
                    .write_record(record)
                    .map_err(|err| wrap_csv("dataset-write-row", err))?;
            }
            writer
                .flush()
                .map_err(|err| wrap_csv("dataset-flush", err.into()))?;
        }
        tmp.persist(output).map_err(|err| {
            BshError::Dataset(
                ErrorInfo::new("dataset-persist", "failed to move dataset into place")
                    .with_context("path", output.display().to_string())
                    .with_hint(err.error.to_string()),
            )
        })?;
        info!(path = %output.display(), rows = rows.len(), "master dataset written");

        if let Some(journal) = journal {
            journal.remove()?;
        }
        Ok(DatasetOutcome::Written {
            path: output.to_path_buf(),
            rows: rows.len(),
            columns,
        })
    }
}

fn ensure_parent(path: &Path) -> Result<PathBuf, BshError> {
    let parent = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    };
    fs::create_dir_all(&parent).map_err(|err| BshError::io("dataset-dir", &parent, &err))?;
    Ok(parent)
}

fn wrap_csv(code: &str, err: csv::Error) -> BshError {
    BshError::Dataset(ErrorInfo::new(code, err.to_string()))
}
