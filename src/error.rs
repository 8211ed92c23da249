//! Error type for all truth_reorg-related errors. This is the only error enum
//! the binary has to know about.

use thiserror::Error;

use crate::{
    chunked::TransformError,
    columns::ColumnError,
    config::ConfigError,
    jobs::add_avrv::ParquetJobError,
    read::ReadError,
    region::RegionError,
    write::WriteError,
};

#[derive(Error, Debug)]
pub enum TruthReorgError {
    #[error("{0}")]
    Config(#[from] ConfigError),

    #[error("{0}")]
    Region(#[from] RegionError),

    #[error("{0}")]
    Read(#[from] ReadError),

    #[error("{0}")]
    Write(#[from] WriteError),

    #[error("{0}")]
    Transform(#[from] TransformError),

    #[error("{0}")]
    Column(#[from] ColumnError),

    #[error("{0}")]
    Parquet(#[from] ParquetJobError),
}
