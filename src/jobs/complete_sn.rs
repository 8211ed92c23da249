//! Second half of the supernova summary: add integer ids, extinction and the
//! largest observed flux change in each band.

use std::path::PathBuf;

use log::{info, trace};
use rusqlite::{params, types::Value, Statement};

use super::{open_table_sink, progress_bar, run_to_sink};
use crate::{
    chunked::ChunkStats,
    columns::{try_make_sn_int_id, value_as_f64, value_as_i64, Extinction},
    config::TransformConfig,
    read::{
        sqlite::{count_rows, open_read_only, prepare},
        ChunkedReader, ReadError,
    },
    schema::{assemble_select, column_names, Column, SqlType},
    Row, TruthReorgError, BANDS,
};

pub const DEFAULT_CHUNK_SIZE: usize = 20000;
pub const DEFAULT_INPUT: &str = "initial_table.db";
pub const DEFAULT_VARIABILITY: &str = "sum_variable-31mar.db";
pub const DEFAULT_VARIABILITY_TABLE: &str = "sn_variability_truth";
pub const DEFAULT_OUTPUT: &str = "truth_sn_summary.db";

pub const INPUT_TABLE: &str = super::trim_sn::OUTPUT_TABLE;
pub const OUTPUT_TABLE: &str = "truth_sn_summary";

/// Appended to the columns of the input table.
pub const ADDED_COLUMNS: [Column; 9] = [
    Column::new("id_int", SqlType::BigInt),
    Column::new("av", SqlType::Float),
    Column::new("rv", SqlType::Float),
    Column::new("max_delta_flux_u", SqlType::Float),
    Column::new("max_delta_flux_g", SqlType::Float),
    Column::new("max_delta_flux_r", SqlType::Float),
    Column::new("max_delta_flux_i", SqlType::Float),
    Column::new("max_delta_flux_z", SqlType::Float),
    Column::new("max_delta_flux_y", SqlType::Float),
];

const I_ID: usize = 0;
const I_HOST: usize = 1;
const I_RA: usize = 2;
const I_DEC: usize = 3;

#[derive(Debug, Clone)]
pub struct CompleteSnParams {
    /// The trimmed summary.
    pub config: TransformConfig,

    /// The file holding the supernova light curves.
    pub variability: PathBuf,
    pub variability_table: String,
}

/// Every output column, input columns first.
pub fn output_columns() -> Vec<Column> {
    super::trim_sn::COLUMNS
        .iter()
        .chain(ADDED_COLUMNS.iter())
        .copied()
        .collect()
}

/// The largest `delta_flux` in each band for one supernova, in [`BANDS`]
/// order. Bands without observations are NULL.
fn max_delta_fluxes(stmt: &mut Statement, id: &Value) -> Result<[Value; 6], ReadError> {
    let mut maxima: [Value; 6] = std::array::from_fn(|_| Value::Null);
    let mut rows = stmt.query(params![id])?;
    while let Some(row) = rows.next()? {
        let band: Option<String> = row.get(0)?;
        match band.as_deref().and_then(|band| BANDS.iter().position(|b| *b == band)) {
            Some(i) => maxima[i] = row.get(1)?,
            None => trace!("Ignoring band {band:?} for {id:?}"),
        }
    }
    Ok(maxima)
}

pub fn complete_sn_summary(
    params: &CompleteSnParams,
    extinction: &Extinction,
    progress_bars: bool,
) -> Result<ChunkStats, TruthReorgError> {
    let config = &params.config;
    info!(
        "Completing supernova summary {} with light curves from {}",
        config.input.display(),
        params.variability.display()
    );

    let conn = open_read_only(&config.input)?;
    let var_conn = open_read_only(&params.variability)?;
    let num_rows = count_rows(&conn, &config.table)?;
    let in_columns = column_names(&super::trim_sn::COLUMNS);
    let mut stmt = prepare(&conn, &assemble_select(&config.table, &in_columns))?;
    let mut var_stmt = prepare(
        &var_conn,
        &format!(
            "SELECT bandpass, max(delta_flux) FROM {} WHERE id = ?1 GROUP BY bandpass",
            params.variability_table
        ),
    )?;
    let mut reader = ChunkedReader::new(&mut stmt, config.chunk_size)?;

    let sink = open_table_sink(config, OUTPUT_TABLE, &output_columns())?;
    let bar = progress_bar(config, num_rows, "Completing SNe", progress_bars);
    run_to_sink(config, &mut reader, sink, Some(&bar), |chunk| {
        let mut ra = Vec::with_capacity(chunk.len());
        let mut dec = Vec::with_capacity(chunk.len());
        for row in chunk.iter() {
            ra.push(value_as_f64(&row[I_RA], "ra")?);
            dec.push(value_as_f64(&row[I_DEC], "dec")?);
        }
        let (av, rv) = extinction.estimate_many(&ra, &dec);

        let mut out: Vec<Row> = Vec::with_capacity(chunk.len());
        for ((mut row, av), rv) in chunk.into_iter().zip(av).zip(rv) {
            let host = value_as_i64(&row[I_HOST], "host_galaxy")?;
            let id_int = try_make_sn_int_id(host)?;
            let maxima = max_delta_fluxes(&mut var_stmt, &row[I_ID])?;
            row.extend([Value::Integer(id_int), Value::Real(av), Value::Real(rv)]);
            row.extend(maxima);
            out.push(row);
        }
        Ok(out)
    })
}
