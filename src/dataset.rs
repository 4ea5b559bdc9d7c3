//! PartitionWriter: Hive-style partitioned Parquet output.
//!
//! Batches are grouped by the tuple of their partition-column values and
//! each group is appended as one Parquet file under
//! `root/<col>=<value>/...`. Append semantics are explicit rather than
//! delegated to a dataset library: on first touch of a partition
//! directory the writer re-scans it for existing `part-NNNNN` files and
//! continues the numbering, so repeated invocations against the same root
//! compose additively and diff ingestion accumulates history. Existing
//! files are never truncated or overwritten.
//!
//! The Arrow schema is built from the registry schema table with every
//! column as a nullable-or-not Utf8 field (dates serialize as ISO
//! strings). Pinning the file schema this way keeps chunked writes and
//! repeated runs from ever mixing inferred schema variants in one
//! partition tree. Partition columns are retained inside the files, so
//! concatenating every file of the tree reproduces the written records
//! without path reconstruction.
//!
//! Concurrent writers against one root are a caller contract (serialize
//! them externally); a single writer instance is cheap to reuse across
//! batches because partition indices are cached after the first scan.

use std::collections::HashMap;
use std::fs::{self, File};
use std::io;
use std::path::{Path, PathBuf};

use arrow::datatypes::FieldRef;
use arrow::record_batch::RecordBatch;
use log::debug;
use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;
use parquet::arrow::arrow_writer::ArrowWriter;
use parquet::file::properties::WriterProperties;
use serde_arrow::schema::SchemaLike;
use serde_arrow::{from_record_batch, to_record_batch};

use crate::assemble::BatchSink;
use crate::errors::{RegistryError, Result};
use crate::schema::{self, Column, CorporateRecord};

/// Directory segment used for an absent partition value.
pub const HIVE_NULL_SEGMENT: &str = "__HIVE_DEFAULT_PARTITION__";

/// Appends record batches to a partitioned Parquet dataset.
pub struct PartitionWriter {
    root: PathBuf,
    columns: Vec<&'static Column>,
    next_index: HashMap<PathBuf, u64>,
}

impl PartitionWriter {
    /// Create a writer rooted at `root`, partitioning by `partition_cols`
    /// in the given order.
    ///
    /// An empty column list writes unpartitioned files directly under
    /// `root`. Nothing is created on disk until the first batch.
    ///
    /// # Errors
    /// `UnknownPartitionColumn` if a name is not part of the registry
    /// schema.
    pub fn new(root: impl Into<PathBuf>, partition_cols: &[&str]) -> Result<Self> {
        let columns = partition_cols
            .iter()
            .map(|name| {
                schema::column(name).ok_or_else(|| RegistryError::UnknownPartitionColumn {
                    column: (*name).to_string(),
                })
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(Self {
            root: root.into(),
            columns,
            next_index: HashMap::new(),
        })
    }

    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Append one batch, grouped by partition key.
    ///
    /// Groups are written in first-seen order; rows within a group keep
    /// their input order. Each group becomes one new file.
    ///
    /// # Errors
    /// `PartitionWrite` on any filesystem or encoder failure; the error is
    /// fatal for the invocation, and files written before it stay valid.
    pub fn write_batch(&mut self, batch: &[CorporateRecord]) -> Result<()> {
        let mut order: Vec<PathBuf> = Vec::new();
        let mut groups: HashMap<PathBuf, Vec<&CorporateRecord>> = HashMap::new();
        for record in batch {
            let dir = self.partition_dir(record);
            let group = groups.entry(dir.clone()).or_default();
            if group.is_empty() {
                order.push(dir);
            }
            group.push(record);
        }
        for dir in order {
            let rows = groups.remove(&dir).unwrap_or_default();
            self.write_group(&dir, &rows)?;
        }
        Ok(())
    }

    fn partition_dir(&self, record: &CorporateRecord) -> PathBuf {
        let mut dir = self.root.clone();
        for column in &self.columns {
            let segment = match record.value_of(column) {
                Some(value) => format!("{}={}", column.name, hive_encode(&value)),
                None => format!("{}={HIVE_NULL_SEGMENT}", column.name),
            };
            dir.push(segment);
        }
        dir
    }

    fn write_group(&mut self, dir: &Path, rows: &[&CorporateRecord]) -> Result<()> {
        fs::create_dir_all(dir).map_err(|source| RegistryError::PartitionWrite {
            path: dir.to_path_buf(),
            source,
        })?;
        let index = self.next_file_index(dir)?;
        let path = dir.join(format!("part-{index:05}.parquet"));
        write_parquet_file(&path, rows)?;
        self.next_index.insert(dir.to_path_buf(), index + 1);
        debug!("wrote {} rows to {}", rows.len(), path.display());
        Ok(())
    }

    /// Next free `part-NNNNN` index, scanning the directory on first touch.
    fn next_file_index(&mut self, dir: &Path) -> Result<u64> {
        if let Some(&index) = self.next_index.get(dir) {
            return Ok(index);
        }
        let entries = fs::read_dir(dir).map_err(|source| RegistryError::PartitionWrite {
            path: dir.to_path_buf(),
            source,
        })?;
        let mut next = 0u64;
        for entry in entries {
            let entry = entry.map_err(|source| RegistryError::PartitionWrite {
                path: dir.to_path_buf(),
                source,
            })?;
            let name = entry.file_name();
            let name = name.to_string_lossy();
            if let Some(stem) = name.strip_prefix("part-").and_then(|s| s.strip_suffix(".parquet"))
                && let Ok(index) = stem.parse::<u64>()
            {
                next = next.max(index + 1);
            }
        }
        Ok(next)
    }
}

impl BatchSink for PartitionWriter {
    fn write_batch(&mut self, batch: &[CorporateRecord]) -> Result<()> {
        PartitionWriter::write_batch(self, batch)
    }
}

/// Percent-encode a partition value into a path-safe Hive segment.
fn hive_encode(value: &str) -> String {
    use std::fmt::Write as _;
    let mut out = String::with_capacity(value.len());
    for &byte in value.as_bytes() {
        if byte.is_ascii_alphanumeric() || matches!(byte, b'.' | b'-' | b'_') {
            out.push(byte as char);
        } else {
            let _ = write!(out, "%{byte:02X}");
        }
    }
    out
}

/// Arrow fields for the registry schema: one Utf8 field per column,
/// nullability from the schema table.
fn arrow_fields() -> io::Result<Vec<FieldRef>> {
    let defs: Vec<serde_json::Value> = schema::SCHEMA
        .iter()
        .map(|column| {
            serde_json::json!({
                "name": column.name,
                "data_type": "Utf8",
                "nullable": column.nullable,
            })
        })
        .collect();
    Vec::<FieldRef>::from_value(&defs).map_err(io::Error::other)
}

fn write_parquet_file(path: &Path, rows: &[&CorporateRecord]) -> Result<()> {
    let write_err = |source: io::Error| RegistryError::PartitionWrite {
        path: path.to_path_buf(),
        source,
    };

    let fields = arrow_fields().map_err(write_err)?;
    let batch: RecordBatch = to_record_batch(&fields, &rows)
        .map_err(|err| write_err(io::Error::other(err)))?;

    let file = File::create(path).map_err(write_err)?;
    let props = WriterProperties::builder().build();
    let mut writer = ArrowWriter::try_new(file, batch.schema(), Some(props))
        .map_err(|err| write_err(io::Error::other(err)))?;
    writer
        .write(&batch)
        .map_err(|err| write_err(io::Error::other(err)))?;
    writer
        .close()
        .map_err(|err| write_err(io::Error::other(err)))?;
    Ok(())
}

/// Read every Parquet file under `root` back into typed records.
///
/// Files are visited in lexicographic path order, so rows come back
/// grouped by partition directory and, within a partition, in write
/// order. Intended for validation and modest read-back; a query engine is
/// out of scope.
///
/// # Errors
/// Propagates filesystem errors; decode failures surface as
/// [`io::ErrorKind::Other`].
pub fn read_dataset(root: impl AsRef<Path>) -> io::Result<Vec<CorporateRecord>> {
    let mut files = Vec::new();
    collect_parquet_files(root.as_ref(), &mut files)?;
    files.sort();

    let mut records = Vec::new();
    for path in files {
        let file = File::open(&path)?;
        let reader = ParquetRecordBatchReaderBuilder::try_new(file)
            .map_err(io::Error::other)?
            .build()
            .map_err(io::Error::other)?;
        for batch in reader {
            let batch = batch.map_err(io::Error::other)?;
            let mut rows: Vec<CorporateRecord> =
                from_record_batch(&batch).map_err(io::Error::other)?;
            records.append(&mut rows);
        }
    }
    Ok(records)
}

fn collect_parquet_files(dir: &Path, out: &mut Vec<PathBuf>) -> io::Result<()> {
    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        let path = entry.path();
        if path.is_dir() {
            collect_parquet_files(&path, out)?;
        } else if path.extension().is_some_and(|ext| ext == "parquet") {
            out.push(path);
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hive_segments_stay_path_safe() {
        assert_eq!(hive_encode("2026-02-20"), "2026-02-20");
        assert_eq!(hive_encode("a/b=c"), "a%2Fb%3Dc");
        assert_eq!(hive_encode("島根"), "%E5%B3%B6%E6%A0%B9");
    }

    #[test]
    fn unknown_partition_column_is_rejected_up_front() {
        let err = PartitionWriter::new("/tmp/never-created", &["favorite_color"])
            .err()
            .expect("must fail");
        assert!(matches!(
            err,
            RegistryError::UnknownPartitionColumn { ref column } if column == "favorite_color"
        ));
    }
}
