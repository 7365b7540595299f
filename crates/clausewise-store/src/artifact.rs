//! The run's durable output: one JSON object per line.
//!
//! Lines use `", "` between members and `": "` after keys, and keep
//! non-ASCII text unescaped, e.g.
//! `{"clause_number": "1", "clause_text": "Indemnité", ...}`.

use std::io;
use std::path::{Path, PathBuf};

use clausewise_core::Record;
use serde::Serialize;
use serde_json::ser::Formatter;
use tokio::fs::{self, OpenOptions};
use tokio::io::AsyncWriteExt;
use tracing::info;

use crate::StoreError;

struct SpacedFormatter;

impl Formatter for SpacedFormatter {
    fn begin_array_value<W: ?Sized + io::Write>(
        &mut self,
        writer: &mut W,
        first: bool,
    ) -> io::Result<()> {
        if first {
            Ok(())
        } else {
            writer.write_all(b", ")
        }
    }

    fn begin_object_key<W: ?Sized + io::Write>(
        &mut self,
        writer: &mut W,
        first: bool,
    ) -> io::Result<()> {
        if first {
            Ok(())
        } else {
            writer.write_all(b", ")
        }
    }

    fn begin_object_value<W: ?Sized + io::Write>(&mut self, writer: &mut W) -> io::Result<()> {
        writer.write_all(b": ")
    }
}

/// Serialize one value as an artifact line (without the trailing newline).
pub fn to_json_line<T: Serialize + ?Sized>(value: &T) -> Result<String, StoreError> {
    let mut buf = Vec::new();
    let mut ser = serde_json::Serializer::with_formatter(&mut buf, SpacedFormatter);
    value.serialize(&mut ser)?;
    String::from_utf8(buf).map_err(|e| StoreError::Other(format!("non-UTF8 JSON output: {e}")))
}

/// Append-only newline-delimited JSON file.
///
/// The orchestrator is the only writer.
#[derive(Debug)]
pub struct OutputArtifact {
    path: PathBuf,
}

impl OutputArtifact {
    /// Create the artifact, truncating any previous run's content.
    pub async fn create(path: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let artifact = Self { path: path.into() };
        if let Some(parent) = artifact.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).await?;
        }
        artifact.truncate().await?;
        Ok(artifact)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub async fn truncate(&self) -> Result<(), StoreError> {
        fs::File::create(&self.path).await?;
        Ok(())
    }

    /// Append one line per value. Returns the number of lines written.
    pub async fn append<T: Serialize>(&self, values: &[T]) -> Result<usize, StoreError> {
        let mut buf = String::new();
        for value in values {
            buf.push_str(&to_json_line(value)?);
            buf.push('\n');
        }

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .await?;
        file.write_all(buf.as_bytes()).await?;
        file.flush().await?;
        Ok(values.len())
    }

    /// Append clause and error records.
    pub async fn write_records(&self, records: &[Record]) -> Result<usize, StoreError> {
        let written = self.append(records).await?;
        info!(path = %self.path.display(), lines = written, "wrote output artifact");
        Ok(written)
    }
}
