//! Derived columns: extinction, integer ids, per-band maxima, and helpers to
//! pull typed values out of rows.

pub mod extinction;
pub mod ids;
#[cfg(test)]
mod tests;

pub use extinction::{ConstantEbv, EbvModel, Extinction, HealpixEbvMap, DEFAULT_RV};
pub use ids::{make_sn_int_id, try_make_sn_int_id, MAX_STAR_ID, SN_OBJECT_TYPE};

use ndarray::prelude::*;
use rusqlite::types::Value;
use thiserror::Error;

/// Stars whose largest per-band standard deviation of delta magnitude
/// exceeds this are flagged as variable.
pub const DMAG_THRESHOLD: f64 = 0.001;

/// The maximum of each row of a (rows × bands) matrix.
pub fn max_per_row(values: ArrayView2<f64>) -> Array1<f64> {
    values.fold_axis(Axis(1), f64::NEG_INFINITY, |&acc, &v| acc.max(v))
}

/// 1 if `max_stdev` is above [`DMAG_THRESHOLD`], otherwise 0.
pub fn above_threshold(max_stdev: f64) -> i64 {
    i64::from(max_stdev > DMAG_THRESHOLD)
}

/// Read a value as a float. Integers are widened.
pub fn value_as_f64(value: &Value, column: &str) -> Result<f64, ColumnError> {
    match value {
        Value::Real(f) => Ok(*f),
        Value::Integer(i) => Ok(*i as f64),
        Value::Null => Err(ColumnError::Null(column.to_string())),
        other => Err(ColumnError::WrongType {
            column: column.to_string(),
            expected: "a number",
            found: format!("{other:?}"),
        }),
    }
}

/// Read a value as an integer. Text holding an integer (as ids sometimes are)
/// is parsed.
pub fn value_as_i64(value: &Value, column: &str) -> Result<i64, ColumnError> {
    match value {
        Value::Integer(i) => Ok(*i),
        Value::Text(t) => t.trim().parse().map_err(|_| ColumnError::WrongType {
            column: column.to_string(),
            expected: "an integer",
            found: format!("{t:?}"),
        }),
        Value::Null => Err(ColumnError::Null(column.to_string())),
        other => Err(ColumnError::WrongType {
            column: column.to_string(),
            expected: "an integer",
            found: format!("{other:?}"),
        }),
    }
}

pub fn value_as_str<'a>(value: &'a Value, column: &str) -> Result<&'a str, ColumnError> {
    match value {
        Value::Text(t) => Ok(t),
        Value::Null => Err(ColumnError::Null(column.to_string())),
        other => Err(ColumnError::WrongType {
            column: column.to_string(),
            expected: "text",
            found: format!("{other:?}"),
        }),
    }
}

#[derive(Error, Debug)]
pub enum ColumnError {
    #[error("Column '{0}' has a NULL value where one is required")]
    Null(String),

    #[error("Column '{column}' should hold {expected}, but has {found}")]
    WrongType {
        column: String,
        expected: &'static str,
        found: String,
    },

    #[error("Host id {0} is negative; host ids start at 0")]
    NegativeHost(i64),

    #[error("Host id {0} is too large to turn into an integer object id")]
    HostOverflow(i64),

    #[error("Host id {host} would become id {id}, which collides with the ids given to hosts below 100000")]
    IdCollision { host: i64, id: i64 },

    #[error("An E(B-V) map needs 12 * nside^2 values with nside a power of 2, but {0} were supplied")]
    BadMapSize(usize),

    #[error("Cannot read E(B-V) map: {0}")]
    Map(#[from] crate::read::ReadError),
}
