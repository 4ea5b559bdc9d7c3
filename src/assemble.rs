//! TableAssembler: the pipeline's buffering stage.
//!
//! Two consumption modes over the typed record stream: eager collection
//! into one [`TableResult`] (the only point where a whole dataset sits in
//! memory), or fixed-size batching into a [`BatchSink`] such as the
//! partition writer. Row order is preserved in both; batch boundaries
//! carry no meaning and a partition may span any number of batches.

use log::debug;

use crate::errors::Result;
use crate::schema::{CorporateRecord, TableResult};

/// Default rows per batch in chunked mode.
///
/// Large enough to amortize per-file write overhead, small enough that a
/// buffered batch of full-width rows stays in the tens of megabytes.
pub const DEFAULT_BATCH_ROWS: usize = 100_000;

/// Consumer of record batches in chunked mode.
pub trait BatchSink {
    /// Accept one batch of records, in input order.
    ///
    /// # Errors
    /// Implementation-defined; a sink error aborts the drain.
    fn write_batch(&mut self, batch: &[CorporateRecord]) -> Result<()>;
}

/// Eagerly collect a record stream into an in-memory table.
///
/// Unsuitable for the nationwide full snapshot at default settings; prefer
/// [`drain_batches`] with a partition writer for that workload.
///
/// # Errors
/// The first stream error aborts collection and is returned as-is.
pub fn collect_table<I>(records: I) -> Result<TableResult>
where
    I: Iterator<Item = Result<CorporateRecord>>,
{
    let mut rows = Vec::new();
    for record in records {
        rows.push(record?);
    }
    debug!("collected {} rows into memory", rows.len());
    Ok(TableResult::new(rows))
}

/// Drain a record stream into `sink` in batches of `batch_rows`.
///
/// Full batches are forwarded as they fill; the final partial batch is
/// flushed at end of stream. Returns the number of rows forwarded.
///
/// # Errors
/// The first stream or sink error aborts the drain. Rows already handed to
/// the sink stay written; additive sinks make re-running the same fetch
/// the recovery path.
pub fn drain_batches<I>(records: I, batch_rows: usize, sink: &mut dyn BatchSink) -> Result<u64>
where
    I: Iterator<Item = Result<CorporateRecord>>,
{
    let batch_rows = batch_rows.max(1);
    let mut buffer: Vec<CorporateRecord> = Vec::with_capacity(batch_rows.min(4096));
    let mut total: u64 = 0;
    for record in records {
        buffer.push(record?);
        if buffer.len() == batch_rows {
            sink.write_batch(&buffer)?;
            total += buffer.len() as u64;
            buffer.clear();
        }
    }
    if !buffer.is_empty() {
        sink.write_batch(&buffer)?;
        total += buffer.len() as u64;
    }
    debug!("drained {total} rows in batches of {batch_rows}");
    Ok(total)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::sample_record;

    struct Collecting {
        batches: Vec<usize>,
    }

    impl BatchSink for Collecting {
        fn write_batch(&mut self, batch: &[CorporateRecord]) -> Result<()> {
            self.batches.push(batch.len());
            Ok(())
        }
    }

    #[test]
    fn partial_final_batch_is_flushed() {
        let records = (0..7).map(|i| Ok(sample_record(&format!("100000000000{i}"), "20260220")));
        let mut sink = Collecting { batches: vec![] };
        let total = drain_batches(records, 3, &mut sink).unwrap();
        assert_eq!(total, 7);
        assert_eq!(sink.batches, vec![3, 3, 1]);
    }

    #[test]
    fn stream_error_aborts_collection() {
        let records = vec![
            Ok(sample_record("1000000000001", "20260220")),
            Err(crate::errors::RegistryError::MalformedRecord {
                resource: "t".into(),
                line: 2,
                detail: "boom".into(),
            }),
        ];
        assert!(collect_table(records.into_iter()).is_err());
    }
}
