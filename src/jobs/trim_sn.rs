//! First half of the supernova summary: drop supernovae outside the footprint
//! or from the deep drilling run, drop unneeded columns and add the SALT2
//! parameters.

use std::path::PathBuf;

use log::info;

use super::{open_table_sink, progress_bar, run_to_sink};
use crate::{
    chunked::ChunkStats,
    columns::{value_as_f64, value_as_str},
    config::TransformConfig,
    read::{
        sqlite::{attach_read_only, count_rows, open_read_only, prepare, table_columns},
        ChunkedReader,
    },
    region::SkyFilter,
    schema::{Column, SqlType},
    TruthReorgError,
};

pub const DEFAULT_CHUNK_SIZE: usize = 30000;
pub const DEFAULT_TABLE: &str = "truth_summary";
pub const DEFAULT_INPUT: &str = "sum_variable-31mar.db";
pub const DEFAULT_PARAMS: &str = "sne_cosmoDC2_v1.1.4_MS_DDF.db";
pub const DEFAULT_PARAMS_TABLE: &str = "sne_params";
pub const DEFAULT_OUTPUT: &str = "initial_table.db";

pub const OUTPUT_TABLE: &str = "initial_summary";

/// Supernovae with ids starting with these belong to the deep drilling run.
pub const EXCLUDED_ID_PREFIXES: [&str; 2] = ["mDDF", "hl_mddf"];

pub const COLUMNS: [Column; 10] = [
    Column::new("id", SqlType::Text),
    Column::new("host_galaxy", SqlType::BigInt),
    Column::new("ra", SqlType::Double),
    Column::new("dec", SqlType::Double),
    Column::new("redshift", SqlType::Double),
    Column::new("c", SqlType::Double),
    Column::new("mB", SqlType::Double),
    Column::new("t0", SqlType::Double),
    Column::new("x0", SqlType::Double),
    Column::new("x1", SqlType::Double),
];

const I_ID: usize = 0;
const I_RA: usize = 2;
const I_DEC: usize = 3;

#[derive(Debug, Clone)]
pub struct TrimSnParams {
    /// The old supernova summary and its table.
    pub config: TransformConfig,

    /// The file holding the SALT2 parameters.
    pub sn_params: PathBuf,
    pub params_table: String,
}

/// The rows of the summary and parameter tables are matched by rowid; both
/// tables list the supernovae in the same order.
fn select_sql(summary: &str, params: &str) -> String {
    format!(
        "SELECT {summary}.id, {summary}.host_galaxy, {summary}.ra, {summary}.dec, \
         {summary}.redshift, c_in AS c, mB, t0_in AS t0, x0_in AS x0, x1_in AS x1 \
         FROM {summary} JOIN params.{params} ON {summary}.rowid = params.{params}.rowid \
         ORDER BY {summary}.rowid"
    )
}

/// Should a supernova with this id be kept?
pub fn is_kept_id(id: &str) -> bool {
    !EXCLUDED_ID_PREFIXES
        .iter()
        .any(|prefix| id.starts_with(prefix))
}

pub fn trim_sn_summary(
    params: &TrimSnParams,
    region: &dyn SkyFilter,
    progress_bars: bool,
) -> Result<ChunkStats, TruthReorgError> {
    let config = &params.config;
    info!(
        "Trimming supernova summary {} with parameters from {}",
        config.input.display(),
        params.sn_params.display()
    );

    let conn = open_read_only(&config.input)?;
    // Fails early if the summary table is missing.
    table_columns(&conn, &config.table)?;
    attach_read_only(&conn, &params.sn_params, "params")?;
    let num_rows = count_rows(&conn, &config.table)?;
    let mut stmt = prepare(&conn, &select_sql(&config.table, &params.params_table))?;
    let mut reader = ChunkedReader::new(&mut stmt, config.chunk_size)?;

    let sink = open_table_sink(config, OUTPUT_TABLE, &COLUMNS)?;
    let bar = progress_bar(config, num_rows, "Trimming SNe", progress_bars);
    run_to_sink(config, &mut reader, sink, Some(&bar), |chunk| {
        let mut kept = Vec::with_capacity(chunk.len());
        for row in chunk {
            let ra = value_as_f64(&row[I_RA], "ra")?;
            let dec = value_as_f64(&row[I_DEC], "dec")?;
            if region.point_in_region(ra, dec) && is_kept_id(value_as_str(&row[I_ID], "id")?) {
                kept.push(row);
            }
        }
        Ok(kept)
    })
}
