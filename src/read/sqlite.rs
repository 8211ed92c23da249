use std::{num::NonZeroUsize, path::Path};

use log::{debug, trace};
use rusqlite::{types::Value, Connection, OpenFlags, OptionalExtension, Rows, Statement};
use url::Url;
use vec1::Vec1;

use super::{ChunkSource, ReadError};
use crate::Row;

/// Open a SQLite file read only.
pub fn open_read_only<P: AsRef<Path>>(path: P) -> Result<Connection, ReadError> {
    let path = path.as_ref();
    debug!("Opening {} read only", path.display());
    if !path.exists() {
        return Err(ReadError::NoSuchFile(path.to_path_buf()));
    }
    let conn = Connection::open_with_flags(
        path,
        OpenFlags::SQLITE_OPEN_READ_ONLY
            | OpenFlags::SQLITE_OPEN_URI
            | OpenFlags::SQLITE_OPEN_NO_MUTEX,
    )?;
    Ok(conn)
}

/// Attach another SQLite file (read only) to `conn` under `alias`.
pub fn attach_read_only<P: AsRef<Path>>(
    conn: &Connection,
    path: P,
    alias: &str,
) -> Result<(), ReadError> {
    let path = path.as_ref();
    if !path.exists() {
        return Err(ReadError::NoSuchFile(path.to_path_buf()));
    }
    // SQLite decodes the URI, so characters such as '%', '?' and '#' in the
    // path must be escaped.
    let path = path.canonicalize()?;
    let mut uri =
        Url::from_file_path(&path).map_err(|()| ReadError::BadUri(path.clone()))?;
    uri.set_query(Some("mode=ro"));
    debug!("Attaching {uri} as '{alias}'");
    conn.execute(&format!("ATTACH DATABASE ?1 AS {alias}"), [uri.as_str()])?;
    Ok(())
}

/// The `CREATE TABLE` statement that made `table`.
pub fn table_create_sql(conn: &Connection, table: &str) -> Result<String, ReadError> {
    conn.query_row(
        "SELECT sql FROM sqlite_master WHERE type = 'table' AND name = ?1",
        [table],
        |row| row.get(0),
    )
    .optional()?
    .ok_or_else(|| ReadError::NoSuchTable {
        table: table.to_string(),
        file: main_file(conn),
    })
}

/// The column names of `table`, in declaration order.
pub fn table_columns(conn: &Connection, table: &str) -> Result<Vec<String>, ReadError> {
    let mut stmt = conn.prepare("SELECT name FROM pragma_table_info(?1)")?;
    let columns = stmt
        .query_map([table], |row| row.get(0))?
        .collect::<Result<Vec<String>, _>>()?;
    if columns.is_empty() {
        return Err(ReadError::NoSuchTable {
            table: table.to_string(),
            file: main_file(conn),
        });
    }
    trace!("Columns of {table}: {columns:?}");
    Ok(columns)
}

/// The index of `column` within `columns`. Like SQLite, names are matched
/// ignoring ASCII case.
pub fn column_index(
    conn: &Connection,
    columns: &[String],
    column: &str,
) -> Result<usize, ReadError> {
    columns
        .iter()
        .position(|c| c.eq_ignore_ascii_case(column))
        .ok_or_else(|| ReadError::NoSuchColumn {
            column: column.to_string(),
            file: main_file(conn),
        })
}

/// Prepare a read query. Unknown tables or columns are caught here, before
/// any output exists.
pub fn prepare<'conn>(conn: &'conn Connection, sql: &str) -> Result<Statement<'conn>, ReadError> {
    debug!("{sql}");
    Ok(conn.prepare(sql)?)
}

pub fn count_rows(conn: &Connection, table: &str) -> Result<u64, ReadError> {
    let count: i64 = conn.query_row(&format!("SELECT count(*) FROM {table}"), [], |row| {
        row.get(0)
    })?;
    Ok(count.max(0) as u64)
}

fn main_file(conn: &Connection) -> std::path::PathBuf {
    conn.path().unwrap_or(":memory:").into()
}

/// A cursor over the results of a query that hands out up to `chunk_size` rows
/// at a time.
pub struct ChunkedReader<'stmt> {
    rows: Rows<'stmt>,
    num_columns: usize,
    chunk_size: NonZeroUsize,
}

impl<'stmt> ChunkedReader<'stmt> {
    pub fn new(
        stmt: &'stmt mut Statement<'_>,
        chunk_size: NonZeroUsize,
    ) -> Result<ChunkedReader<'stmt>, ReadError> {
        let num_columns = stmt.column_count();
        let rows = stmt.query([])?;
        Ok(ChunkedReader {
            rows,
            num_columns,
            chunk_size,
        })
    }
}

impl ChunkSource for ChunkedReader<'_> {
    fn fetch_chunk(&mut self) -> Result<Option<Vec1<Row>>, ReadError> {
        let mut chunk = Vec::with_capacity(self.chunk_size.get());
        while chunk.len() < self.chunk_size.get() {
            let row = match self.rows.next()? {
                Some(row) => row,
                None => break,
            };
            let values = (0..self.num_columns)
                .map(|i| row.get::<_, Value>(i))
                .collect::<Result<Row, _>>()?;
            chunk.push(values);
        }
        Ok(Vec1::try_from_vec(chunk).ok())
    }
}

/// Two chunk sources that are read in lockstep and correlated by position.
///
/// Each chunk of the pair is the row-wise concatenation of a chunk from
/// `left` and one from `right`. The chunks must have the same length, and the
/// key columns (if given) must agree row by row.
pub struct AlignedPair<L, R> {
    left: L,
    right: R,

    /// Indices of the key column in the left and right rows.
    keys: Option<(usize, usize)>,

    i_chunk: usize,
}

impl<L: ChunkSource, R: ChunkSource> AlignedPair<L, R> {
    pub fn new(left: L, right: R, keys: Option<(usize, usize)>) -> AlignedPair<L, R> {
        AlignedPair {
            left,
            right,
            keys,
            i_chunk: 0,
        }
    }
}

impl<L: ChunkSource, R: ChunkSource> ChunkSource for AlignedPair<L, R> {
    fn fetch_chunk(&mut self) -> Result<Option<Vec1<Row>>, ReadError> {
        let i_chunk = self.i_chunk;
        self.i_chunk += 1;
        let left = self.left.fetch_chunk()?;
        let right = self.right.fetch_chunk()?;
        let (left, right) = match (left, right) {
            (None, None) => return Ok(None),
            (Some(l), None) => {
                return Err(ReadError::Misaligned {
                    chunk: i_chunk,
                    left: l.len(),
                    right: 0,
                })
            }
            (None, Some(r)) => {
                return Err(ReadError::Misaligned {
                    chunk: i_chunk,
                    left: 0,
                    right: r.len(),
                })
            }
            (Some(l), Some(r)) => (l, r),
        };
        if left.len() != right.len() {
            return Err(ReadError::Misaligned {
                chunk: i_chunk,
                left: left.len(),
                right: right.len(),
            });
        }

        if let Some((i_left, i_right)) = self.keys {
            for (row, (l, r)) in left.iter().zip(right.iter()).enumerate() {
                let (l, r) = (&l[i_left], &r[i_right]);
                if !keys_match(l, r) {
                    return Err(ReadError::KeyMismatch {
                        chunk: i_chunk,
                        row,
                        left: format!("{l:?}"),
                        right: format!("{r:?}"),
                    });
                }
            }
        }

        let joined = left
            .into_iter()
            .zip(right)
            .map(|(mut l, r)| {
                l.extend(r);
                l
            })
            .collect();
        Ok(Vec1::try_from_vec(joined).ok())
    }
}

/// Ids are stored as text in some tables and integers in others.
fn keys_match(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Integer(i), Value::Text(t)) | (Value::Text(t), Value::Integer(i)) => {
            t.trim().parse::<i64>().map(|t| t == *i).unwrap_or(false)
        }
        _ => a == b,
    }
}
