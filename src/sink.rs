// src/sink.rs
//
// Persistence seam. The relational loader lives outside this crate; what it
// needs is a table name, a batch of rows and a count back.

use anyhow::{Context, Result};
use arrow::record_batch::RecordBatch;
use parquet::arrow::ArrowWriter;
use parquet::basic::Compression;
use parquet::file::properties::WriterProperties;
use parquet::file::reader::{FileReader, SerializedFileReader};
use std::{
    collections::BTreeMap,
    fs::{self, File},
    io::BufWriter,
    path::{Path, PathBuf},
};
use tracing::{debug, info};

/// Bulk writer for one normalized table at a time.
pub trait TableSink {
    /// Persist `batch` into table `schema` on behalf of source `label`.
    /// Writing the same source again replaces its rows. Returns rows written.
    fn write(&mut self, schema: &str, label: &str, batch: &RecordBatch) -> Result<usize>;
}

/// Writes `<out_dir>/<schema>/<label>.parquet`, Snappy-compressed.
pub struct ParquetSink {
    out_dir: PathBuf,
    row_group_size: usize,
}

impl ParquetSink {
    pub fn new(out_dir: impl Into<PathBuf>, row_group_size: usize) -> Self {
        Self {
            out_dir: out_dir.into(),
            row_group_size: row_group_size.max(1),
        }
    }

    pub fn table_path(&self, schema: &str, label: &str) -> PathBuf {
        self.out_dir.join(schema).join(format!("{}.parquet", label))
    }
}

impl TableSink for ParquetSink {
    fn write(&mut self, schema: &str, label: &str, batch: &RecordBatch) -> Result<usize> {
        let final_path = self.table_path(schema, label);
        let dir = final_path
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_else(|| self.out_dir.clone());
        fs::create_dir_all(&dir).with_context(|| format!("could not create `{}`", dir.display()))?;

        let tmp = final_path.with_extension("parquet.tmp");
        let file = File::create(&tmp)
            .with_context(|| format!("creating temporary Parquet file {:?}", &tmp))?;
        let props = WriterProperties::builder()
            .set_compression(Compression::SNAPPY)
            .set_max_row_group_size(self.row_group_size)
            .build();
        let mut writer = ArrowWriter::try_new(BufWriter::new(file), batch.schema(), Some(props))
            .context("initializing Parquet writer")?;
        writer
            .write(batch)
            .with_context(|| format!("writing {} rows to {:?}", batch.num_rows(), &tmp))?;
        writer.close().context("closing Parquet writer")?;
        fs::rename(&tmp, &final_path)
            .with_context(|| format!("renaming {:?} → {:?}", &tmp, &final_path))?;

        info!(
            table = schema,
            label,
            rows = batch.num_rows(),
            path = %final_path.display(),
            "table written"
        );
        Ok(batch.num_rows())
    }
}

/// Keeps batches in memory. Used for dry runs.
#[derive(Default)]
pub struct MemorySink {
    pub tables: BTreeMap<(String, String), RecordBatch>,
}

impl TableSink for MemorySink {
    fn write(&mut self, schema: &str, label: &str, batch: &RecordBatch) -> Result<usize> {
        debug!(table = schema, label, rows = batch.num_rows(), "kept in memory");
        self.tables
            .insert((schema.to_string(), label.to_string()), batch.clone());
        Ok(batch.num_rows())
    }
}

/// Row count from the Parquet footer, without reading any data pages.
pub fn parquet_row_count(path: &Path) -> Result<usize> {
    let file = File::open(path).with_context(|| format!("Failed to open Parquet '{}'", path.display()))?;
    let reader = SerializedFileReader::new(file)
        .with_context(|| format!("Failed to read Parquet '{}'", path.display()))?;
    Ok(reader.metadata().file_metadata().num_rows() as usize)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::ThemeCode;
    use crate::table::TableRow;
    use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;
    use tempfile::tempdir;

    fn themes(n: usize) -> Vec<ThemeCode> {
        (0..n)
            .map(|i| ThemeCode {
                theme_code: format!("{:03}", i % 7),
                theme_name: "테마".into(),
                stock_code: Some(format!("{:06}", i)),
                active: true,
            })
            .collect()
    }

    #[test]
    fn writes_row_groups_and_overwrites() -> Result<()> {
        let tmp = tempdir()?;
        let mut sink = ParquetSink::new(tmp.path(), 4);
        let batch = ThemeCode::to_batch(&themes(10))?;

        assert_eq!(sink.write("theme_code", "THEME", &batch)?, 10);
        let path = sink.table_path("theme_code", "THEME");
        assert_eq!(parquet_row_count(&path)?, 10);

        let reader = SerializedFileReader::new(File::open(&path)?)?;
        assert_eq!(reader.metadata().num_row_groups(), 3);
        assert!(!path.with_extension("parquet.tmp").exists());

        // second run replaces instead of appending
        let smaller = ThemeCode::to_batch(&themes(3))?;
        sink.write("theme_code", "THEME", &smaller)?;
        assert_eq!(parquet_row_count(&path)?, 3);
        Ok(())
    }

    #[test]
    fn round_trips_schema() -> Result<()> {
        let tmp = tempdir()?;
        let mut sink = ParquetSink::new(tmp.path(), 1000);
        let batch = ThemeCode::to_batch(&themes(2))?;
        sink.write("theme_code", "THEME", &batch)?;

        let file = File::open(sink.table_path("theme_code", "THEME"))?;
        let mut reader = ParquetRecordBatchReaderBuilder::try_new(file)?.build()?;
        let read = reader.next().transpose()?.expect("one batch");
        assert_eq!(read.schema().fields().len(), ThemeCode::schema().fields().len());
        assert_eq!(read.num_rows(), 2);
        Ok(())
    }

    #[test]
    fn memory_sink_keeps_batches() -> Result<()> {
        let mut sink = MemorySink::default();
        let batch = ThemeCode::to_batch(&themes(5))?;
        assert_eq!(sink.write("theme_code", "THEME", &batch)?, 5);
        assert_eq!(
            sink.tables[&("theme_code".to_string(), "THEME".to_string())].num_rows(),
            5
        );
        Ok(())
    }
}
