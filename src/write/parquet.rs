use std::{
    fs::File,
    path::{Path, PathBuf},
};

use arrow::{datatypes::SchemaRef, record_batch::RecordBatch};
use log::debug;
use parquet::{arrow::ArrowWriter, basic::Compression, file::properties::WriterProperties};

use super::{PartialOutput, WriteError};

/// A new Parquet file, written one row group per batch.
pub struct ParquetWriter {
    writer: ArrowWriter<File>,
    output: PartialOutput,
}

impl ParquetWriter {
    pub fn create<P: AsRef<Path>>(path: P, schema: SchemaRef) -> Result<ParquetWriter, WriteError> {
        let output = PartialOutput::new(path)?;
        debug!("Creating {}", output.path().display());
        let file = File::create(output.path())?;
        let props = WriterProperties::builder()
            .set_compression(Compression::SNAPPY)
            .build();
        let writer = ArrowWriter::try_new(file, schema, Some(props))?;
        Ok(ParquetWriter { writer, output })
    }

    pub fn write(&mut self, batch: &RecordBatch) -> Result<(), WriteError> {
        self.writer.write(batch)?;
        // One input row group, one output row group.
        self.writer.flush()?;
        Ok(())
    }

    pub fn finish(self) -> Result<PathBuf, WriteError> {
        self.writer.close()?;
        self.output.finish()
    }
}
