//! Code to write truth tables.
//!
//! Outputs are first written to `<output>.partial` and only renamed to their
//! final path once they are complete, so a file at the final path is never
//! half-written.

pub mod parquet;
pub mod sqlite;

pub use sqlite::TableWriter;

use std::{
    ffi::OsString,
    path::{Path, PathBuf},
};

use log::{debug, warn};
use thiserror::Error;

use crate::Row;

/// Where chunks of transformed rows go.
pub trait RowSink {
    /// Write and commit a chunk of rows.
    fn write_chunk(&mut self, rows: &[Row]) -> Result<(), WriteError>;

    /// Complete the output, returning its final path if anything was written
    /// to disk.
    fn finish(self: Box<Self>) -> Result<Option<PathBuf>, WriteError>;
}

/// Counts rows and throws them away; used for dry runs.
#[derive(Debug, Default)]
pub struct DiscardSink {
    pub rows: u64,
}

impl RowSink for DiscardSink {
    fn write_chunk(&mut self, rows: &[Row]) -> Result<(), WriteError> {
        self.rows += rows.len() as u64;
        Ok(())
    }

    fn finish(self: Box<Self>) -> Result<Option<PathBuf>, WriteError> {
        debug!("Dry run: discarded {} rows", self.rows);
        Ok(None)
    }
}

impl RowSink for Vec<Row> {
    fn write_chunk(&mut self, rows: &[Row]) -> Result<(), WriteError> {
        self.extend_from_slice(rows);
        Ok(())
    }

    fn finish(self: Box<Self>) -> Result<Option<PathBuf>, WriteError> {
        Ok(None)
    }
}

/// An output file that is written under a temporary name.
#[derive(Debug)]
pub struct PartialOutput {
    final_path: PathBuf,
    partial_path: PathBuf,
}

impl PartialOutput {
    pub fn new<P: AsRef<Path>>(path: P) -> Result<PartialOutput, WriteError> {
        let final_path = path.as_ref().to_path_buf();
        if final_path.exists() {
            return Err(WriteError::OutputExists(final_path));
        }
        if let Some(parent) = final_path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                return Err(WriteError::NoOutputDir(parent.to_path_buf()));
            }
        }

        let partial_path = {
            let mut s = OsString::from(final_path.as_os_str());
            s.push(".partial");
            PathBuf::from(s)
        };
        if partial_path.exists() {
            warn!(
                "Removing '{}' left over from an incomplete run",
                partial_path.display()
            );
            std::fs::remove_file(&partial_path)?;
        }

        Ok(PartialOutput {
            final_path,
            partial_path,
        })
    }

    /// The path to write to while the output is incomplete.
    pub fn path(&self) -> &Path {
        &self.partial_path
    }

    pub fn final_path(&self) -> &Path {
        &self.final_path
    }

    /// Move the completed file to its final path.
    pub fn finish(self) -> Result<PathBuf, WriteError> {
        debug!(
            "Renaming '{}' to '{}'",
            self.partial_path.display(),
            self.final_path.display()
        );
        std::fs::rename(&self.partial_path, &self.final_path)?;
        Ok(self.final_path)
    }
}

#[derive(Error, Debug)]
pub enum WriteError {
    #[error("Refusing to overwrite existing output '{0}'")]
    OutputExists(PathBuf),

    #[error("Output directory '{0}' does not exist")]
    NoOutputDir(PathBuf),

    #[error("Tried to write a row with {got} values to a table with {expected} columns")]
    RowWidth { expected: usize, got: usize },

    #[error(transparent)]
    Sqlite(#[from] rusqlite::Error),

    #[error(transparent)]
    Parquet(#[from] ::parquet::errors::ParquetError),

    #[error(transparent)]
    IO(#[from] std::io::Error),
}
