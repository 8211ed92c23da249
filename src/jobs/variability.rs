//! Light-curve tables restricted to the objects in a new summary.

use std::{fmt::Display, path::PathBuf};

use log::info;

use super::{open_table_sink, progress_bar, run_to_sink};
use crate::{
    chunked::ChunkStats,
    config::TransformConfig,
    read::{
        sqlite::{attach_read_only, count_rows, open_read_only, prepare, table_columns},
        ChunkedReader,
    },
    schema::{Column, SqlType},
    TruthReorgError,
};

pub const DEFAULT_CHUNK_SIZE: usize = 50000;

/// Which kind of object's light curves to restrict.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Kind {
    /// Star ids are text in the light curves and integers in the summary;
    /// the output uses the integer.
    Star,

    /// Supernova ids are text in both tables; the output keeps the text id
    /// and adds the summary's integer id.
    Sn,
}

impl Display for Kind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}",
            match self {
                Kind::Star => "star",
                Kind::Sn => "supernova",
            }
        )
    }
}

pub const STAR_COLUMNS: [Column; 5] = [
    Column::new("id", SqlType::BigInt),
    Column::new("obsHistID", SqlType::BigInt),
    Column::new("MJD", SqlType::Double),
    Column::new("bandpass", SqlType::Text),
    Column::new("delta_flux", SqlType::Float),
];

pub const SN_COLUMNS: [Column; 6] = [
    Column::new("id", SqlType::Text),
    Column::new("obsHistID", SqlType::BigInt),
    Column::new("MJD", SqlType::Double),
    Column::new("bandpass", SqlType::Text),
    Column::new("delta_flux", SqlType::Float),
    Column::new("id_int", SqlType::BigInt),
];

impl Kind {
    pub fn columns(self) -> &'static [Column] {
        match self {
            Kind::Star => &STAR_COLUMNS,
            Kind::Sn => &SN_COLUMNS,
        }
    }

    pub fn output_table(self) -> &'static str {
        match self {
            Kind::Star => "truth_star_variability",
            Kind::Sn => "truth_sn_variability",
        }
    }

    pub fn default_summary_table(self) -> &'static str {
        match self {
            Kind::Star => "truth_star_summary",
            Kind::Sn => "truth_sn_summary",
        }
    }

    pub fn default_variability_table(self) -> &'static str {
        match self {
            Kind::Star => "stellar_variability_truth",
            Kind::Sn => "sn_variability_truth",
        }
    }

    pub fn default_summary_file(self) -> &'static str {
        match self {
            Kind::Star => "truth_star_summary_v1-0-0.db",
            Kind::Sn => "truth_sn_summary_v1-0-0.db",
        }
    }

    pub fn default_variability_file(self) -> &'static str {
        match self {
            Kind::Star => "star_variability_truth_indexed.db",
            Kind::Sn => "sum_variable-31mar.db",
        }
    }

    pub fn default_output_file(self) -> &'static str {
        match self {
            Kind::Star => "truth_star_variability.db",
            Kind::Sn => "truth_sn_variability.db",
        }
    }

    /// The join of the summary table with the attached light curves.
    fn select_sql(self, summary: &str, var: &str) -> String {
        match self {
            Kind::Star => format!(
                "SELECT {summary}.id, obsHistID, MJD, bandpass, delta_flux \
                 FROM {summary} INNER JOIN var.{var} \
                 ON {summary}.id = CAST(var.{var}.id AS INT)"
            ),
            Kind::Sn => format!(
                "SELECT var.{var}.id, obsHistID, MJD, bandpass, delta_flux, id_int \
                 FROM {summary} INNER JOIN var.{var} \
                 ON {summary}.id = var.{var}.id"
            ),
        }
    }
}

#[derive(Debug, Clone)]
pub struct VariabilityParams {
    pub kind: Kind,

    /// The new summary and its table.
    pub config: TransformConfig,

    /// The file holding the light curves.
    pub variability: PathBuf,
    pub variability_table: String,
}

/// Copy the light-curve rows of every object in the summary to a new table.
/// Rows of objects missing from the summary are dropped by the join, so the
/// rows read are exactly the rows written.
pub fn restrict_variability(
    params: &VariabilityParams,
    progress_bars: bool,
) -> Result<ChunkStats, TruthReorgError> {
    let config = &params.config;
    let kind = params.kind;
    info!(
        "Restricting {kind} light curves in {} to the objects in {}",
        params.variability.display(),
        config.input.display()
    );

    let conn = open_read_only(&config.input)?;
    table_columns(&conn, &config.table)?;
    attach_read_only(&conn, &params.variability, "var")?;
    // The join is at most as long as the light-curve table.
    let num_rows = count_rows(&conn, &format!("var.{}", params.variability_table))?;
    let mut stmt = prepare(
        &conn,
        &kind.select_sql(&config.table, &params.variability_table),
    )?;
    let mut reader = ChunkedReader::new(&mut stmt, config.chunk_size)?;

    let sink = open_table_sink(config, kind.output_table(), kind.columns())?;
    let bar = progress_bar(config, num_rows, "Light curves", progress_bars);
    let stats = run_to_sink(config, &mut reader, sink, Some(&bar), |chunk| {
        Ok(chunk.into_vec())
    })?;
    info!(
        "{} of {num_rows} light-curve rows belong to objects in the summary",
        stats.rows_written
    );
    Ok(stats)
}
