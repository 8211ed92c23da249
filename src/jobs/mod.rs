//! The conversions, one module per job.
//!
//! Every SQLite job follows the same plan: open the inputs read only, prepare
//! the read query (so that bad table or column names fail before anything is
//! created), create the output, then hand a [`ChunkedReader`] and a
//! [`RowSink`] to [`run_chunked`].

pub mod add_avrv;
pub mod complete_sn;
pub mod star_summary;
pub mod trim_region;
pub mod trim_sn;
pub mod variability;
#[cfg(test)]
mod tests;

use indicatif::ProgressBar;
use log::info;

use crate::{
    chunked::{rows_progress_bar, run_chunked, ChunkStats},
    config::TransformConfig,
    read::ChunkSource,
    schema::{assemble_create_table, Column},
    write::{DiscardSink, RowSink, TableWriter},
    Row, TruthReorgError,
};

/// Where a job's output rows go: a new SQLite table, or nowhere on a dry run.
fn open_sink(
    config: &TransformConfig,
    table: &str,
    create_sql: &str,
    num_columns: usize,
) -> Result<Box<dyn RowSink>, TruthReorgError> {
    if config.dry_run {
        info!(
            "Dry run; not creating {} (table '{table}')",
            config.output.display()
        );
        return Ok(Box::new(DiscardSink::default()));
    }
    info!("Writing table '{table}' to {}", config.output.display());
    Ok(Box::new(TableWriter::create_with_sql(
        &config.output,
        table,
        create_sql,
        num_columns,
    )?))
}

/// As [`open_sink`] for a table laid out as `columns`.
fn open_table_sink(
    config: &TransformConfig,
    table: &str,
    columns: &[Column],
) -> Result<Box<dyn RowSink>, TruthReorgError> {
    open_sink(
        config,
        table,
        &assemble_create_table(table, columns),
        columns.len(),
    )
}

/// Drive `source` through `transform` into `sink`, then complete the output.
fn run_to_sink<R, F>(
    config: &TransformConfig,
    source: &mut R,
    mut sink: Box<dyn RowSink>,
    progress_bar: Option<&ProgressBar>,
    transform: F,
) -> Result<ChunkStats, TruthReorgError>
where
    R: ChunkSource + ?Sized,
    F: FnMut(vec1::Vec1<Row>) -> Result<Vec<Row>, TruthReorgError>,
{
    let stats = run_chunked(
        source,
        sink.as_mut(),
        config.max_chunks,
        progress_bar,
        transform,
    )?;
    if let Some(path) = sink.finish()? {
        info!("Finished writing {}", path.display());
    }
    Ok(stats)
}

/// A progress bar over `num_rows` input rows. When `max_chunks` is set the
/// bar is capped at the number of rows those chunks can hold.
fn progress_bar(
    config: &TransformConfig,
    num_rows: u64,
    message: &'static str,
    draw: bool,
) -> ProgressBar {
    let len = match config.max_chunks {
        Some(max_chunks) => {
            num_rows.min(max_chunks.get() as u64 * config.chunk_size.get() as u64)
        }
        None => num_rows,
    };
    rows_progress_bar(len, message, draw)
}
