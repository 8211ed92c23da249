//! Table layouts and the SQL statements generated from them.
//!
//! Nothing here is escaped or validated; table and column names come from
//! this crate or from the command line.

use std::fmt::Display;

use itertools::Itertools;

/// The SQL types used by truth tables.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SqlType {
    BigInt,
    Int,
    Double,
    Float,
    Text,
}

impl Display for SqlType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}",
            match self {
                SqlType::BigInt => "BIGINT",
                SqlType::Int => "INT",
                SqlType::Double => "DOUBLE",
                SqlType::Float => "FLOAT",
                SqlType::Text => "TEXT",
            }
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Column {
    pub name: &'static str,
    pub sql_type: SqlType,
}

impl Column {
    pub const fn new(name: &'static str, sql_type: SqlType) -> Column {
        Column { name, sql_type }
    }
}

/// Names of `columns`, in order.
pub fn column_names(columns: &[Column]) -> Vec<&'static str> {
    columns.iter().map(|c| c.name).collect()
}

/// `CREATE TABLE table(name TYPE,...)` for the supplied columns.
pub fn assemble_create_table(table: &str, columns: &[Column]) -> String {
    let col_specs = columns
        .iter()
        .map(|c| format!("{} {}", c.name, c.sql_type))
        .join(",");
    format!("CREATE TABLE {table}({col_specs})")
}

/// `INSERT INTO table VALUES (?,...)` with one placeholder per column.
pub fn assemble_insert(table: &str, num_columns: usize) -> String {
    let placeholders = std::iter::repeat("?").take(num_columns).join(",");
    format!("INSERT INTO {table} VALUES ({placeholders})")
}

/// `SELECT a,b,c FROM table`.
pub fn assemble_select<S: AsRef<str>>(table: &str, columns: &[S]) -> String {
    let columns = columns.iter().map(|c| c.as_ref()).join(",");
    format!("SELECT {columns} FROM {table}")
}
