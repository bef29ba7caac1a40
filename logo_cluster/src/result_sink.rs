// THEORY:
// A result sink receives the finished partition once clustering is done. The
// JSON file sink writes it in the same shape the original batch tool produced:
// an array of groups, each an array of domain names, indented by four spaces.

use crate::core_modules::clusterer::Partition;
use crate::error::Result;
use serde::Serialize;
use std::io::Write;
use std::path::{Path, PathBuf};

/// Default output file of the batch.
pub const DEFAULT_RESULT_FILE: &str = "groups_logo.json";

/// Persists a finished partition.
pub trait ResultSink {
    fn persist(&self, partition: &Partition) -> Result<()>;
}

/// Writes the partition as a JSON array of arrays of domain names, indented
/// with four spaces.
pub struct JsonFileSink {
    path: PathBuf,
}

impl JsonFileSink {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Default for JsonFileSink {
    fn default() -> Self {
        Self::new(DEFAULT_RESULT_FILE)
    }
}

impl ResultSink for JsonFileSink {
    fn persist(&self, partition: &Partition) -> Result<()> {
        let mut out = std::io::BufWriter::new(std::fs::File::create(&self.path)?);
        write_json(&mut out, partition)?;
        out.flush()?;
        Ok(())
    }
}

/// Serializes `partition` into `writer`.
pub fn write_json<W: Write>(writer: W, partition: &Partition) -> Result<()> {
    let formatter = serde_json::ser::PrettyFormatter::with_indent(b"    ");
    let mut serializer = serde_json::Serializer::with_formatter(writer, formatter);
    partition.serialize(&mut serializer)?;
    Ok(())
}
