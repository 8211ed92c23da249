use std::path::{Path, PathBuf};

use log::debug;
use rusqlite::{params_from_iter, Connection};

use super::{PartialOutput, RowSink, WriteError};
use crate::{
    schema::{assemble_create_table, assemble_insert, Column},
    Row,
};

/// A new SQLite file holding a single table. Each chunk is inserted and
/// committed in its own transaction.
pub struct TableWriter {
    conn: Connection,
    output: PartialOutput,
    insert: String,
    num_columns: usize,
    rows_written: u64,
}

impl TableWriter {
    /// Create `path` with a table laid out as `columns`.
    pub fn create<P: AsRef<Path>>(
        path: P,
        table: &str,
        columns: &[Column],
    ) -> Result<TableWriter, WriteError> {
        TableWriter::create_with_sql(
            path,
            table,
            &assemble_create_table(table, columns),
            columns.len(),
        )
    }

    /// Create `path` with a table made by an existing `CREATE TABLE`
    /// statement.
    pub fn create_with_sql<P: AsRef<Path>>(
        path: P,
        table: &str,
        create_sql: &str,
        num_columns: usize,
    ) -> Result<TableWriter, WriteError> {
        let output = PartialOutput::new(path)?;
        debug!("Creating {}", output.path().display());
        let conn = Connection::open(output.path())?;
        debug!("{create_sql}");
        conn.execute(create_sql, [])?;

        Ok(TableWriter {
            conn,
            output,
            insert: assemble_insert(table, num_columns),
            num_columns,
            rows_written: 0,
        })
    }

    pub fn rows_written(&self) -> u64 {
        self.rows_written
    }
}

impl RowSink for TableWriter {
    fn write_chunk(&mut self, rows: &[Row]) -> Result<(), WriteError> {
        let tx = self.conn.transaction()?;
        {
            let mut stmt = tx.prepare_cached(&self.insert)?;
            for row in rows {
                if row.len() != self.num_columns {
                    return Err(WriteError::RowWidth {
                        expected: self.num_columns,
                        got: row.len(),
                    });
                }
                stmt.execute(params_from_iter(row.iter()))?;
            }
        }
        tx.commit()?;
        self.rows_written += rows.len() as u64;
        Ok(())
    }

    fn finish(self: Box<Self>) -> Result<Option<PathBuf>, WriteError> {
        let TableWriter {
            conn,
            output,
            rows_written,
            ..
        } = *self;
        conn.close().map_err(|(_, e)| e)?;
        let path = output.finish()?;
        debug!("Wrote {rows_written} rows to {}", path.display());
        Ok(Some(path))
    }
}
