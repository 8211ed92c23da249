//! Batch reorganisation of DC2 truth catalogs.
//!
//! Each conversion reads SQLite tables (or Parquet files) in chunks, derives a
//! few columns (extinction, integer ids, per-band maxima, region membership)
//! and writes a new table or file.

pub mod chunked;
pub mod cli;
pub mod columns;
pub mod config;
mod error;
pub mod healpix;
pub mod jobs;
pub mod read;
pub mod region;
pub mod schema;
pub mod write;

pub use error::TruthReorgError;

/// One row of a SQLite table, with dynamically typed values.
pub type Row = Vec<rusqlite::types::Value>;

/// The LSST bands, in the order they appear in every per-band column set.
pub const BANDS: [&str; 6] = ["u", "g", "r", "i", "z", "y"];
