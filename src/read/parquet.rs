use std::{
    fs::File,
    path::{Path, PathBuf},
};

use arrow::{
    array::{Array, Float64Array},
    compute::{cast, concat_batches},
    datatypes::{DataType, SchemaRef},
    record_batch::RecordBatch,
};
use log::{debug, trace};
use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;

use super::ReadError;

/// Reads a Parquet file one row group at a time.
pub struct RowGroupReader {
    /// The path to the Parquet file on disk.
    pub path: PathBuf,

    schema: SchemaRef,

    /// The number of rows in each row group.
    row_group_sizes: Vec<usize>,
}

impl RowGroupReader {
    pub fn new<P: AsRef<Path>>(path: P) -> Result<RowGroupReader, ReadError> {
        let path = path.as_ref();
        debug!("Using Parquet file: {}", path.display());
        if !path.exists() {
            return Err(ReadError::NoSuchFile(path.to_path_buf()));
        }
        let builder = ParquetRecordBatchReaderBuilder::try_new(File::open(path)?)?;
        let schema = builder.schema().clone();
        let row_group_sizes = builder
            .metadata()
            .row_groups()
            .iter()
            .map(|rg| rg.num_rows().max(0) as usize)
            .collect::<Vec<_>>();
        trace!("Row group sizes: {row_group_sizes:?}");

        Ok(RowGroupReader {
            path: path.to_path_buf(),
            schema,
            row_group_sizes,
        })
    }

    pub fn schema(&self) -> SchemaRef {
        self.schema.clone()
    }

    pub fn num_row_groups(&self) -> usize {
        self.row_group_sizes.len()
    }

    pub fn num_rows(&self) -> usize {
        self.row_group_sizes.iter().sum()
    }

    /// Read all columns of one row group into a single batch.
    pub fn read_row_group(&self, i_row_group: usize) -> Result<RecordBatch, ReadError> {
        let batch_size = self
            .row_group_sizes
            .get(i_row_group)
            .copied()
            .unwrap_or(0)
            .max(1);
        let reader = ParquetRecordBatchReaderBuilder::try_new(File::open(&self.path)?)?
            .with_row_groups(vec![i_row_group])
            .with_batch_size(batch_size)
            .build()?;
        let batches = reader.collect::<Result<Vec<_>, _>>()?;
        let batch = concat_batches(&self.schema, &batches)?;
        Ok(batch)
    }
}

/// Pull a numeric column out of a batch as `f64`s. Nulls become NaN.
pub fn column_as_f64(
    batch: &RecordBatch,
    column: &str,
    file: &Path,
) -> Result<Vec<f64>, ReadError> {
    let array = batch
        .column_by_name(column)
        .ok_or_else(|| ReadError::NoSuchColumn {
            column: column.to_string(),
            file: file.to_path_buf(),
        })?;
    let not_float = |reason: String| ReadError::NotFloat {
        column: column.to_string(),
        file: file.to_path_buf(),
        reason,
    };
    let array = cast(array, &DataType::Float64).map_err(|e| not_float(e.to_string()))?;
    let array = array
        .as_any()
        .downcast_ref::<Float64Array>()
        .ok_or_else(|| not_float(format!("cast gave {}", array.data_type())))?;
    Ok(array.iter().map(|v| v.unwrap_or(f64::NAN)).collect())
}
