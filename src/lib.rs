//! # corpreg
//!
//! A **streaming client** for Japan's Corporate Number registry, published
//! by the National Tax Agency's Corporate Number Publication Site.
//! corpreg fetches full snapshots (nationwide or per prefecture) and daily
//! differential updates, decodes them on the fly, and converts them into
//! either an in-memory table or a partitioned Parquet dataset.
//!
//! ## Key Features
//!
//! - **Streaming end to end** - the ZIP archive is decompressed and
//!   decoded incrementally off the HTTP stream; nothing but the in-memory
//!   table mode ever materializes the dataset
//! - **Typed records** - a fixed, versioned 30-column schema mapped to
//!   [`CorporateRecord`]; identifiers stay fixed-width strings, date
//!   columns become calendar dates, empty fields become real nulls
//! - **Partitioned Parquet output** - Hive-style `col=value` directories
//!   with additive append semantics across runs, so repeated diff
//!   ingestion accumulates history
//! - **Legacy encoding done right** - incremental Shift_JIS decoding with
//!   byte-exact error reporting, no lossy replacement characters
//! - **Swappable transport** - the HTTP layer is a one-method trait;
//!   tests run the whole pipeline against canned bytes
//! - **Typed errors** - every failure carries the resource, line, offset,
//!   or path needed to diagnose it without re-running
//!
//! ## Quick Start
//!
//! ```ignore
//! use corpreg::{DatasetOptions, RegistryClient, RegistryRequest};
//!
//! # fn main() -> corpreg::Result<()> {
//! let client = RegistryClient::new();
//!
//! // Small prefecture, straight into memory.
//! let table = client.fetch(&RegistryRequest::Prefecture("Shimane".into()))?;
//! println!("{} corporations", table.len());
//!
//! // Latest daily diff, appended to a partitioned dataset.
//! let root = client.fetch_to_dataset(
//!     &RegistryRequest::Diff { date: None },
//!     &DatasetOptions::new()
//!         .with_root("/data/corpreg")
//!         .with_partition_cols(["update_date"]),
//! )?;
//! println!("dataset at {}", root.display());
//! # Ok(())
//! # }
//! ```
//!
//! ## Pipeline
//!
//! A fetch runs four pull-based stages, each a lazy iterator driven by its
//! consumer:
//!
//! 1. [`locator`] resolves the request to concrete archive URLs
//!    (statically for snapshots; the latest diff is discovered from the
//!    site's listing page)
//! 2. [`stream`] opens the archive and yields decoded text lines
//! 3. [`parser`] maps lines to typed [`CorporateRecord`]s against the
//!    [`schema`] table
//! 4. [`assemble`] either collects a [`TableResult`] or batches records
//!    into the [`dataset`] partition writer
//!
//! There is no internal parallelism and no internal retry: concurrency
//! across independent fetches and retry/backoff policy both belong to the
//! caller. Dropping a stream at any stage releases the connection.
//!
//! ## Logging
//!
//! corpreg logs through the [`log`] facade (resolution, stream opens,
//! batch flushes, partition writes). Wiring up a logger implementation is
//! the caller's concern.

pub mod assemble;
pub mod client;
pub mod dataset;
pub mod errors;
pub mod locator;
pub mod parser;
pub mod schema;
pub mod stream;
pub mod testing;
pub mod transport;

pub use assemble::{collect_table, drain_batches, BatchSink, DEFAULT_BATCH_ROWS};
pub use client::{DatasetOptions, RegistryClient, RegistryClientBuilder};
pub use dataset::{read_dataset, PartitionWriter};
pub use errors::{RegistryError, Result};
pub use locator::{
    ContainerFormat, Locator, RegistryRequest, RemoteResource, TextEncoding, DEFAULT_BASE_URL,
};
pub use parser::{parse, RecordStream};
pub use schema::{Column, ColumnKind, CorporateRecord, TableResult, SCHEMA};
pub use stream::{open, LineStream, RawLine};
pub use transport::{HttpTransport, Transport};
