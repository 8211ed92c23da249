//! Copy a table, keeping only the rows inside a sky region.

use log::info;

use super::{open_sink, progress_bar, run_to_sink};
use crate::{
    chunked::ChunkStats,
    columns::value_as_f64,
    config::TransformConfig,
    read::{
        sqlite::{column_index, count_rows, open_read_only, prepare, table_columns, table_create_sql},
        ChunkedReader,
    },
    region::SkyFilter,
    schema::assemble_select,
    TruthReorgError,
};

pub const DEFAULT_CHUNK_SIZE: usize = 50000;
pub const DEFAULT_TABLE: &str = "truth_star_summary";
pub const DEFAULT_INPUT: &str = "truth_star_summary_big.db";
pub const DEFAULT_OUTPUT: &str = "truth_star_summary_trimmed.db";

#[derive(Debug, Clone)]
pub struct TrimRegionParams {
    pub config: TransformConfig,
    pub ra_column: String,
    pub dec_column: String,
}

/// Write the rows of `params.config.table` whose position is inside `region`
/// to a table of the same name and layout in a new file. Rows keep their
/// order and values.
pub fn trim_region(
    params: &TrimRegionParams,
    region: &dyn SkyFilter,
    progress_bars: bool,
) -> Result<ChunkStats, TruthReorgError> {
    let config = &params.config;
    let table = config.table.as_str();
    info!(
        "Trimming table '{table}' of {} to region",
        config.input.display()
    );

    let conn = open_read_only(&config.input)?;
    let create_sql = table_create_sql(&conn, table)?;
    let columns = table_columns(&conn, table)?;
    let i_ra = column_index(&conn, &columns, &params.ra_column)?;
    let i_dec = column_index(&conn, &columns, &params.dec_column)?;
    let num_rows = count_rows(&conn, table)?;
    let mut stmt = prepare(&conn, &assemble_select(table, &columns))?;
    let mut reader = ChunkedReader::new(&mut stmt, config.chunk_size)?;

    let sink = open_sink(config, table, &create_sql, columns.len())?;
    let bar = progress_bar(config, num_rows, "Trimming", progress_bars);
    run_to_sink(config, &mut reader, sink, Some(&bar), |chunk| {
        let mut kept = Vec::with_capacity(chunk.len());
        for row in chunk {
            let ra = value_as_f64(&row[i_ra], &params.ra_column)?;
            let dec = value_as_f64(&row[i_dec], &params.dec_column)?;
            if region.point_in_region(ra, dec) {
                kept.push(row);
            }
        }
        Ok(kept)
    })
}
