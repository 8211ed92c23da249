//! Append extinction columns to healpix-sharded Parquet summaries.
//!
//! Each input `truth_summary_hp<N>.parquet` is copied to a file of the same
//! name in the output directory with two float32 columns, `av` and `rv`,
//! appended. Row groups are processed one at a time and map one to one.

use std::{
    path::{Path, PathBuf},
    sync::Arc,
};

use arrow::{
    array::{ArrayRef, Float32Array},
    datatypes::{DataType, Field, FieldRef, Schema, SchemaRef},
    record_batch::RecordBatch,
};
use indicatif::ProgressBar;
use lazy_static::lazy_static;
use log::{debug, info, warn};
use regex::Regex;
use thiserror::Error;

use crate::{
    chunked::rows_progress_bar,
    columns::Extinction,
    config::ConfigError,
    healpix::summary_filename,
    read::{parquet::column_as_f64, ReadError, RowGroupReader},
    write::{parquet::ParquetWriter, WriteError},
    TruthReorgError,
};

lazy_static! {
    static ref SUMMARY_FILE_RE: Regex = Regex::new(r"^truth_summary_hp\d+\.parquet$").unwrap();
}

/// The pixel processed when none are asked for.
pub const DEFAULT_PIXELS: [u32; 1] = [9556];

pub const AV_COLUMN: &str = "av";
pub const RV_COLUMN: &str = "rv";

#[derive(Debug, Clone)]
pub struct AddAvRvParams {
    pub input_dir: PathBuf,
    pub output_dir: PathBuf,
    pub ra_column: String,
    pub dec_column: String,

    /// The healpix pixels to process. Empty means every summary file in
    /// `input_dir`.
    pub pixels: Vec<u32>,

    /// Read and compute, but create no files.
    pub dry_run: bool,
}

/// What was done.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AddAvRvStats {
    pub files: usize,
    pub row_groups: usize,
    pub rows: usize,
}

/// Does `name` look like a healpix-sharded summary file?
pub fn is_summary_file(name: &str) -> bool {
    SUMMARY_FILE_RE.is_match(name)
}

/// The summary files in `dir`, sorted by name.
pub fn find_summary_files(dir: &Path) -> Result<Vec<String>, ParquetJobError> {
    let mut names = vec![];
    for entry in std::fs::read_dir(dir)? {
        let entry = entry?;
        if let Some(name) = entry.file_name().to_str() {
            if is_summary_file(name) {
                names.push(name.to_string());
            }
        }
    }
    names.sort();
    Ok(names)
}

/// The input schema with `av` and `rv` appended.
fn augmented_schema(schema: &Schema, file: &Path) -> Result<SchemaRef, ParquetJobError> {
    for column in [AV_COLUMN, RV_COLUMN] {
        if schema.column_with_name(column).is_some() {
            return Err(ParquetJobError::ColumnExists {
                column,
                file: file.to_path_buf(),
            });
        }
    }
    let mut fields: Vec<FieldRef> = schema.fields().iter().cloned().collect();
    fields.push(Arc::new(Field::new(AV_COLUMN, DataType::Float32, false)));
    fields.push(Arc::new(Field::new(RV_COLUMN, DataType::Float32, false)));
    Ok(Arc::new(Schema::new_with_metadata(
        fields,
        schema.metadata().clone(),
    )))
}

/// Add `av` and `rv` to one batch.
fn augment_batch(
    batch: &RecordBatch,
    schema: SchemaRef,
    params: &AddAvRvParams,
    extinction: &Extinction,
    file: &Path,
) -> Result<RecordBatch, ParquetJobError> {
    let ra = column_as_f64(batch, &params.ra_column, file)?;
    let dec = column_as_f64(batch, &params.dec_column, file)?;
    let (av, rv) = extinction.estimate_many(&ra, &dec);
    let mut columns: Vec<ArrayRef> = batch.columns().to_vec();
    columns.push(Arc::new(Float32Array::from_iter_values(
        av.into_iter().map(|v| v as f32),
    )));
    columns.push(Arc::new(Float32Array::from_iter_values(
        rv.into_iter().map(|v| v as f32),
    )));
    Ok(RecordBatch::try_new(schema, columns)?)
}

/// Augment `input` and (unless this is a dry run) write the result to
/// `output`.
pub fn process_file(
    input: &Path,
    output: &Path,
    params: &AddAvRvParams,
    extinction: &Extinction,
    progress_bar: Option<&ProgressBar>,
) -> Result<AddAvRvStats, ParquetJobError> {
    let reader = RowGroupReader::new(input)?;
    let schema = augmented_schema(&reader.schema(), input)?;
    let mut writer = if params.dry_run {
        None
    } else {
        Some(ParquetWriter::create(output, schema.clone())?)
    };

    let mut stats = AddAvRvStats {
        files: 1,
        ..Default::default()
    };
    for i_row_group in 0..reader.num_row_groups() {
        let batch = reader.read_row_group(i_row_group)?;
        let augmented = augment_batch(&batch, schema.clone(), params, extinction, input)?;
        if let Some(writer) = writer.as_mut() {
            writer.write(&augmented)?;
        }
        stats.row_groups += 1;
        stats.rows += augmented.num_rows();
        if let Some(progress_bar) = progress_bar {
            progress_bar.inc(augmented.num_rows() as u64);
        }
        debug!(
            "Row group {i_row_group} of {}: {} rows",
            input.display(),
            augmented.num_rows()
        );
    }

    match writer {
        Some(writer) => {
            let path = writer.finish()?;
            info!("Wrote {}", path.display());
        }
        None => info!("Dry run; not writing {}", output.display()),
    }
    Ok(stats)
}

/// Process the requested pixels, or every summary file in the input directory
/// when no pixels are given.
pub fn add_avrv(
    params: &AddAvRvParams,
    extinction: &Extinction,
    progress_bars: bool,
) -> Result<AddAvRvStats, TruthReorgError> {
    if !params.input_dir.is_dir() {
        return Err(ConfigError::NotADirectory(params.input_dir.clone()).into());
    }
    if !params.dry_run && !params.output_dir.is_dir() {
        return Err(ConfigError::NotADirectory(params.output_dir.clone()).into());
    }

    let files = if params.pixels.is_empty() {
        info!(
            "Processing all suitable files in {}",
            params.input_dir.display()
        );
        let files = find_summary_files(&params.input_dir)?;
        for f in &files {
            debug!("Found match: {f}");
        }
        if files.is_empty() {
            warn!("No summary files found in {}", params.input_dir.display());
        }
        files
    } else {
        params.pixels.iter().map(|&p| summary_filename(p)).collect()
    };

    let mut total = AddAvRvStats::default();
    for file in files {
        info!("Starting {file}");
        let input = params.input_dir.join(&file);
        let output = params.output_dir.join(&file);
        let num_rows = RowGroupReader::new(&input)?.num_rows();
        let bar = rows_progress_bar(num_rows as u64, "Adding av, rv", progress_bars);
        let stats = process_file(&input, &output, params, extinction, Some(&bar))?;
        bar.abandon_with_message("Finished");
        info!("Finished {file}");

        total.files += stats.files;
        total.row_groups += stats.row_groups;
        total.rows += stats.rows;
    }
    info!(
        "Processed {} rows in {} row groups of {} files",
        total.rows, total.row_groups, total.files
    );
    Ok(total)
}

#[derive(Error, Debug)]
pub enum ParquetJobError {
    #[error("'{file}' already has a column named '{column}'")]
    ColumnExists { column: &'static str, file: PathBuf },

    #[error(transparent)]
    Read(#[from] ReadError),

    #[error(transparent)]
    Write(#[from] WriteError),

    #[error(transparent)]
    Arrow(#[from] arrow::error::ArrowError),

    #[error(transparent)]
    IO(#[from] std::io::Error),
}
