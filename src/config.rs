//! Configuration shared by every conversion.

use std::{
    num::NonZeroUsize,
    path::{Path, PathBuf},
};

use thiserror::Error;

/// The environment variable naming the scratch directory that default paths
/// are built from.
pub const SCRATCH_ENV: &str = "SCRATCH";

/// Where star truth files live, relative to the scratch directory.
pub const STAR_SUBDIR: &str = "desc/truth/star";

/// Where supernova truth files live, relative to the scratch directory.
pub const SN_SUBDIR: &str = "desc/truth/sn";

/// Where augmented galaxy summaries are written, relative to the scratch
/// directory.
pub const GALTRUTH_SUBDIR: &str = "desc/truth/galtruth";

/// What a chunked conversion reads, where it writes, and how.
#[derive(Debug, Clone)]
pub struct TransformConfig {
    /// The main input file.
    pub input: PathBuf,

    /// The file to create. It must not already exist.
    pub output: PathBuf,

    /// The main input table.
    pub table: String,

    /// The number of rows fetched, transformed and committed together.
    pub chunk_size: NonZeroUsize,

    /// Stop after this many chunks. Used to test a conversion on the start of
    /// a big input.
    pub max_chunks: Option<NonZeroUsize>,

    /// Go through the motions without creating any files.
    pub dry_run: bool,
}

/// The scratch directory from the environment.
pub fn scratch_dir() -> Result<PathBuf, ConfigError> {
    match std::env::var_os(SCRATCH_ENV) {
        Some(s) if !s.is_empty() => Ok(PathBuf::from(s)),
        _ => Err(ConfigError::NoScratch),
    }
}

/// `path` if it was given, otherwise `file` inside `subdir` of the scratch
/// directory.
pub fn path_or_default(
    path: Option<PathBuf>,
    subdir: &str,
    file: &str,
) -> Result<PathBuf, ConfigError> {
    match path {
        Some(p) => Ok(p),
        None => Ok(scratch_dir()
            .map_err(|_| ConfigError::NoPath {
                file: Path::new(subdir).join(file),
            })?
            .join(subdir)
            .join(file)),
    }
}

/// `path` if it was given, otherwise `subdir` of the scratch directory.
pub fn dir_or_default(path: Option<PathBuf>, subdir: &str) -> Result<PathBuf, ConfigError> {
    match path {
        Some(p) => Ok(p),
        None => Ok(scratch_dir()
            .map_err(|_| ConfigError::NoPath {
                file: PathBuf::from(subdir),
            })?
            .join(subdir)),
    }
}

pub fn chunk_size(size: usize) -> Result<NonZeroUsize, ConfigError> {
    NonZeroUsize::new(size).ok_or(ConfigError::ZeroChunkSize)
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("The {SCRATCH_ENV} environment variable isn't set")]
    NoScratch,

    #[error("No path was given for '{file}', and ${SCRATCH_ENV} isn't set to find a default")]
    NoPath { file: PathBuf },

    #[error("The chunk size must be at least 1")]
    ZeroChunkSize,

    #[error("No E(B-V) model was given; use --ebv-map or --ebv")]
    NoEbvModel,

    #[error("An explicit region needs all of --ra-mid, --ne-ra, --ne-dec and --s-dec")]
    IncompleteRegion,

    #[error("'{0}' is not a directory")]
    NotADirectory(PathBuf),
}
