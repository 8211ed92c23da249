//! The star summary: positions and fluxes from the old summary, light-curve
//! statistics reduced to one variability flag, integer ids and extinction.

use std::path::PathBuf;

use log::info;
use ndarray::prelude::*;
use rusqlite::types::Value;

use super::{open_table_sink, progress_bar, run_to_sink};
use crate::{
    chunked::ChunkStats,
    columns::{above_threshold, max_per_row, value_as_f64, value_as_i64, Extinction},
    config::TransformConfig,
    read::{
        sqlite::{count_rows, open_read_only, prepare},
        AlignedPair, ChunkedReader,
    },
    schema::{assemble_select, Column, SqlType},
    Row, TruthReorgError, BANDS,
};

pub const DEFAULT_CHUNK_SIZE: usize = 50000;
pub const DEFAULT_TABLE: &str = "truth_summary";
pub const DEFAULT_INPUT: &str = "star_truth_summary_trimmed.db";
pub const DEFAULT_LC_STATS: &str = "star_lc_stats_trimmed.db";
pub const DEFAULT_LC_STATS_TABLE: &str = "stellar_variability_stats";
pub const DEFAULT_OUTPUT: &str = "truth_star_summary.db";

pub const OUTPUT_TABLE: &str = "truth_star_summary";

pub const COLUMNS: [Column; 14] = [
    Column::new("id", SqlType::BigInt),
    Column::new("ra", SqlType::Double),
    Column::new("dec", SqlType::Double),
    Column::new("flux_u", SqlType::Float),
    Column::new("flux_g", SqlType::Float),
    Column::new("flux_r", SqlType::Float),
    Column::new("flux_i", SqlType::Float),
    Column::new("flux_z", SqlType::Float),
    Column::new("flux_y", SqlType::Float),
    Column::new("model", SqlType::Text),
    Column::new("max_stdev_delta_mag", SqlType::Float),
    Column::new("above_threshold", SqlType::Int),
    Column::new("av", SqlType::Float),
    Column::new("rv", SqlType::Float),
];

// Layout of a joined input row: the summary's id, ra, dec and six fluxes,
// then the statistics' id, model and six standard deviations.
const I_ID: usize = 0;
const I_RA: usize = 1;
const I_DEC: usize = 2;
const I_FLUX: usize = 3;
const NUM_SUMMARY: usize = I_FLUX + BANDS.len();
const I_MODEL: usize = NUM_SUMMARY + 1;
const I_STDEV: usize = I_MODEL + 1;

#[derive(Debug, Clone)]
pub struct StarSummaryParams {
    /// The old star summary.
    pub config: TransformConfig,

    /// The file holding light-curve statistics, listed in the same order as
    /// the summary.
    pub lc_stats: PathBuf,
    pub lc_stats_table: String,
}

fn summary_columns() -> Vec<String> {
    ["id", "ra", "dec"]
        .into_iter()
        .map(String::from)
        .chain(BANDS.iter().map(|b| format!("flux_{b}")))
        .collect()
}

fn lc_stats_columns() -> Vec<String> {
    ["id", "model"]
        .into_iter()
        .map(String::from)
        .chain(BANDS.iter().map(|b| format!("stdev_{b}")))
        .collect()
}

/// Turn one chunk of joined summary and statistics rows into output rows.
fn summarise_chunk(rows: Vec<Row>, extinction: &Extinction) -> Result<Vec<Row>, TruthReorgError> {
    let mut stdevs = Array2::<f64>::zeros((rows.len(), BANDS.len()));
    let mut ra = Vec::with_capacity(rows.len());
    let mut dec = Vec::with_capacity(rows.len());
    for (row, mut stdev_row) in rows.iter().zip(stdevs.outer_iter_mut()) {
        ra.push(value_as_f64(&row[I_RA], "ra")?);
        dec.push(value_as_f64(&row[I_DEC], "dec")?);
        for (i_band, s) in stdev_row.iter_mut().enumerate() {
            *s = value_as_f64(&row[I_STDEV + i_band], "stdev")?;
        }
    }
    let max_stdevs = max_per_row(stdevs.view());
    let (av, rv) = extinction.estimate_many(&ra, &dec);

    let mut out = Vec::with_capacity(rows.len());
    for (((mut row, max_stdev), av), rv) in rows
        .into_iter()
        .zip(max_stdevs.iter().copied())
        .zip(av)
        .zip(rv)
    {
        let id = value_as_i64(&row[I_ID], "id")?;
        let model = std::mem::replace(&mut row[I_MODEL], Value::Null);
        row.truncate(NUM_SUMMARY);
        row[I_ID] = Value::Integer(id);
        row.extend([
            model,
            Value::Real(max_stdev),
            Value::Integer(above_threshold(max_stdev)),
            Value::Real(av),
            Value::Real(rv),
        ]);
        out.push(row);
    }
    Ok(out)
}

pub fn star_summary(
    params: &StarSummaryParams,
    extinction: &Extinction,
    progress_bars: bool,
) -> Result<ChunkStats, TruthReorgError> {
    let config = &params.config;
    info!(
        "Making star summary from {} and {}",
        config.input.display(),
        params.lc_stats.display()
    );

    let summary_conn = open_read_only(&config.input)?;
    let lc_conn = open_read_only(&params.lc_stats)?;
    let num_rows = count_rows(&summary_conn, &config.table)?;
    let mut summary_stmt = prepare(
        &summary_conn,
        &assemble_select(&config.table, &summary_columns()),
    )?;
    let mut lc_stmt = prepare(
        &lc_conn,
        &assemble_select(&params.lc_stats_table, &lc_stats_columns()),
    )?;
    let mut pair = AlignedPair::new(
        ChunkedReader::new(&mut summary_stmt, config.chunk_size)?,
        ChunkedReader::new(&mut lc_stmt, config.chunk_size)?,
        Some((I_ID, 0)),
    );

    let sink = open_table_sink(config, OUTPUT_TABLE, &COLUMNS)?;
    let bar = progress_bar(config, num_rows, "Star summary", progress_bars);
    run_to_sink(config, &mut pair, sink, Some(&bar), |chunk| {
        summarise_chunk(chunk.into_vec(), extinction)
    })
}
