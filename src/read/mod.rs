//! Code to read truth tables: SQLite tables in chunks, Parquet files one row
//! group at a time.

pub mod parquet;
pub mod sqlite;

pub use self::parquet::RowGroupReader;
pub use sqlite::{AlignedPair, ChunkedReader};

use std::path::PathBuf;

use thiserror::Error;
use vec1::Vec1;

use crate::Row;

/// Anything that hands out ordered chunks of rows. An empty fetch (`None`)
/// means the source is exhausted.
pub trait ChunkSource {
    fn fetch_chunk(&mut self) -> Result<Option<Vec1<Row>>, ReadError>;
}

#[derive(Error, Debug)]
pub enum ReadError {
    #[error("Input file '{0}' does not exist")]
    NoSuchFile(PathBuf),

    #[error("Table '{table}' was not found in '{file}'")]
    NoSuchTable { table: String, file: PathBuf },

    #[error("Column '{column}' was not found in '{file}'")]
    NoSuchColumn { column: String, file: PathBuf },

    #[error("Cannot make a file URI for '{0}'")]
    BadUri(PathBuf),

    #[error("Chunk {chunk} is misaligned: the first table gave {left} rows, the second {right}")]
    Misaligned {
        chunk: usize,
        left: usize,
        right: usize,
    },

    #[error("Row {row} of chunk {chunk} is misaligned: key '{left}' vs '{right}'")]
    KeyMismatch {
        chunk: usize,
        row: usize,
        left: String,
        right: String,
    },

    #[error("Column '{column}' of '{file}' cannot be read as floats: {reason}")]
    NotFloat {
        column: String,
        file: PathBuf,
        reason: String,
    },

    #[error(transparent)]
    Sqlite(#[from] rusqlite::Error),

    #[error(transparent)]
    Parquet(#[from] ::parquet::errors::ParquetError),

    #[error(transparent)]
    Arrow(#[from] arrow::error::ArrowError),

    #[error(transparent)]
    IO(#[from] std::io::Error),
}
