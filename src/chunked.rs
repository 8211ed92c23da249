//! The chunked read-transform-write loop that every SQLite conversion runs.

use std::num::NonZeroUsize;

use indicatif::{ProgressBar, ProgressDrawTarget, ProgressStyle};
use log::{debug, info};
use thiserror::Error;
use vec1::Vec1;

use crate::{read::ChunkSource, write::RowSink, Row, TruthReorgError};

/// What a chunked run did.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ChunkStats {
    pub chunks: usize,
    pub rows_read: u64,
    pub rows_written: u64,
}

impl ChunkStats {
    /// Rows that were read but not written.
    pub fn rows_filtered(&self) -> u64 {
        self.rows_read - self.rows_written
    }
}

/// Fetch chunks from `source` until it is exhausted (or `max_chunks` chunks
/// have been done), pass each through `transform` and write the result to
/// `sink`.
///
/// `transform` must keep the order of its input rows and must not produce more
/// rows than it was given; it may drop rows.
pub fn run_chunked<R, S, F>(
    source: &mut R,
    sink: &mut S,
    max_chunks: Option<NonZeroUsize>,
    progress_bar: Option<&ProgressBar>,
    mut transform: F,
) -> Result<ChunkStats, TruthReorgError>
where
    R: ChunkSource + ?Sized,
    S: RowSink + ?Sized,
    F: FnMut(Vec1<Row>) -> Result<Vec<Row>, TruthReorgError>,
{
    let mut stats = ChunkStats::default();

    loop {
        if let Some(max_chunks) = max_chunks {
            if stats.chunks >= max_chunks.get() {
                info!("Stopping after {} chunks", stats.chunks);
                break;
            }
        }

        let chunk = match source.fetch_chunk()? {
            Some(chunk) => chunk,
            None => break,
        };
        let num_read = chunk.len();
        let rows = transform(chunk)?;
        if rows.len() > num_read {
            return Err(TransformError::TooManyRows {
                chunk: stats.chunks,
                read: num_read,
                written: rows.len(),
            }
            .into());
        }
        if !rows.is_empty() {
            sink.write_chunk(&rows)?;
        }

        stats.chunks += 1;
        stats.rows_read += num_read as u64;
        stats.rows_written += rows.len() as u64;
        if let Some(progress_bar) = progress_bar {
            progress_bar.inc(num_read as u64);
        }
        if stats.chunks % 10 == 0 {
            debug!("Completed chunk {}", stats.chunks);
        }
    }

    if let Some(progress_bar) = progress_bar {
        progress_bar.abandon_with_message("Finished");
    }
    info!(
        "Read {} rows in {} chunks, wrote {}, filtered {}",
        stats.rows_read,
        stats.chunks,
        stats.rows_written,
        stats.rows_filtered()
    );
    Ok(stats)
}

/// A row progress bar. `len` may be an upper bound.
pub fn rows_progress_bar(len: u64, message: &'static str, draw: bool) -> ProgressBar {
    let bar = ProgressBar::with_draw_target(
        Some(len),
        if draw {
            ProgressDrawTarget::stdout()
        } else {
            ProgressDrawTarget::hidden()
        },
    );
    if let Ok(style) = ProgressStyle::default_bar()
        .template("{msg:17}: [{wide_bar:.blue}] {pos}/{len} rows ({elapsed_precise}<{eta_precise})")
    {
        bar.set_style(style.progress_chars("=> "));
    }
    bar.set_message(message);
    bar.tick();
    bar
}

#[derive(Error, Debug)]
pub enum TransformError {
    #[error("The transform of chunk {chunk} turned {read} rows into {written}; rows may only be dropped")]
    TooManyRows {
        chunk: usize,
        read: usize,
        written: usize,
    },
}
