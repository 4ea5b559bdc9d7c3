//! The fetch façade: one call from request to table or dataset.
//!
//! [`RegistryClient`] wires the pipeline stages together — Locator →
//! StreamDecoder → RecordParser → TableAssembler → output — and drives
//! them pull-based, one resource at a time. A request that spans several
//! archives (diff ingestion) opens connections sequentially: the next
//! archive is only fetched once the previous one is drained.
//!
//! Each fetch is a bounded one-shot operation; the client keeps no state
//! between calls. Callers wanting concurrency run independent fetches on
//! their own threads, and callers wanting retries wrap the fetch call —
//! the client itself never retries, so cancellation stays cooperative.

use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};

use log::info;

use crate::assemble::{self, DEFAULT_BATCH_ROWS};
use crate::dataset::PartitionWriter;
use crate::errors::Result;
use crate::locator::{Locator, RegistryRequest, RemoteResource, TextEncoding};
use crate::parser::{self, RecordStream};
use crate::schema::{CorporateRecord, TableResult};
use crate::stream::{self, LineStream};
use crate::transport::{HttpTransport, Transport};

/// Options for partitioned dataset output.
#[derive(Debug, Default, Clone)]
pub struct DatasetOptions {
    /// Dataset root directory. Defaults to a fresh directory under the
    /// system temp dir.
    pub root: Option<PathBuf>,
    /// Partition columns, outermost first. Empty writes unpartitioned
    /// files directly under the root.
    pub partition_cols: Vec<String>,
}

impl DatasetOptions {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.root = Some(root.into());
        self
    }

    #[must_use]
    pub fn with_partition_cols<I, S>(mut self, cols: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.partition_cols = cols.into_iter().map(Into::into).collect();
        self
    }
}

/// Client for the Corporate Number Publication Site.
pub struct RegistryClient {
    locator: Locator,
    transport: Box<dyn Transport>,
    batch_rows: usize,
}

impl Default for RegistryClient {
    fn default() -> Self {
        Self::new()
    }
}

impl RegistryClient {
    /// Client with the default HTTP transport and site URL.
    #[must_use]
    pub fn new() -> Self {
        Self::builder().build()
    }

    #[must_use]
    pub fn builder() -> RegistryClientBuilder {
        RegistryClientBuilder::default()
    }

    /// Fetch a request into an in-memory table.
    ///
    /// The entire result is buffered; for the nationwide full snapshot
    /// prefer [`RegistryClient::fetch_to_dataset`].
    ///
    /// # Errors
    /// Any [`crate::errors::RegistryError`] from resolution, transport,
    /// decoding, or parsing.
    pub fn fetch(&self, request: &RegistryRequest) -> Result<TableResult> {
        let resources = self.locator.resolve(request, self.transport.as_ref())?;
        let records = PipelineStream::new(resources, self.transport.as_ref());
        let table = assemble::collect_table(records)?;
        info!("fetched {} rows into memory", table.len());
        Ok(table)
    }

    /// Fetch a request into a partitioned Parquet dataset and return its
    /// root directory.
    ///
    /// Writes compose additively with earlier runs against the same root;
    /// a failed run leaves a valid partial dataset, and re-running the
    /// same fetch is the recovery path.
    ///
    /// # Errors
    /// Any [`crate::errors::RegistryError`] from resolution, transport,
    /// decoding, parsing, or partition writing.
    pub fn fetch_to_dataset(
        &self,
        request: &RegistryRequest,
        options: &DatasetOptions,
    ) -> Result<PathBuf> {
        let resources = self.locator.resolve(request, self.transport.as_ref())?;
        let root = options
            .root
            .clone()
            .unwrap_or_else(default_dataset_root);
        let partition_cols: Vec<&str> =
            options.partition_cols.iter().map(String::as_str).collect();
        let mut writer = PartitionWriter::new(&root, &partition_cols)?;
        // The root is part of the return contract even for an empty fetch.
        std::fs::create_dir_all(&root).map_err(|source| {
            crate::errors::RegistryError::PartitionWrite {
                path: root.clone(),
                source,
            }
        })?;
        let records = PipelineStream::new(resources, self.transport.as_ref());
        let total = assemble::drain_batches(records, self.batch_rows, &mut writer)?;
        info!("wrote {total} records under {}", root.display());
        Ok(root)
    }
}

/// Builder for [`RegistryClient`].
pub struct RegistryClientBuilder {
    base_url: Option<String>,
    encoding: Option<TextEncoding>,
    transport: Option<Box<dyn Transport>>,
    batch_rows: usize,
}

impl Default for RegistryClientBuilder {
    fn default() -> Self {
        Self {
            base_url: None,
            encoding: None,
            transport: None,
            batch_rows: DEFAULT_BATCH_ROWS,
        }
    }
}

impl RegistryClientBuilder {
    /// Override the publication site's download root (mirrors, tests).
    #[must_use]
    pub fn base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = Some(url.into());
        self
    }

    /// Fetch the site's Unicode renditions instead of Shift_JIS.
    #[must_use]
    pub fn encoding(mut self, encoding: TextEncoding) -> Self {
        self.encoding = Some(encoding);
        self
    }

    /// Swap the HTTP transport for a custom one.
    #[must_use]
    pub fn transport(mut self, transport: impl Transport + 'static) -> Self {
        self.transport = Some(Box::new(transport));
        self
    }

    /// Rows per batch in dataset mode.
    #[must_use]
    pub fn batch_rows(mut self, batch_rows: usize) -> Self {
        self.batch_rows = batch_rows.max(1);
        self
    }

    #[must_use]
    pub fn build(self) -> RegistryClient {
        let mut locator = match self.base_url {
            Some(url) => Locator::with_base_url(url),
            None => Locator::new(),
        };
        if let Some(encoding) = self.encoding {
            locator = locator.with_encoding(encoding);
        }
        RegistryClient {
            locator,
            transport: self
                .transport
                .unwrap_or_else(|| Box::new(HttpTransport::new())),
            batch_rows: self.batch_rows,
        }
    }
}

/// Lazy record stream over a sequence of resources, opened one at a time.
struct PipelineStream<'a> {
    transport: &'a dyn Transport,
    resources: std::vec::IntoIter<RemoteResource>,
    current: Option<RecordStream<LineStream>>,
    failed: bool,
}

impl<'a> PipelineStream<'a> {
    fn new(resources: Vec<RemoteResource>, transport: &'a dyn Transport) -> Self {
        Self {
            transport,
            resources: resources.into_iter(),
            current: None,
            failed: false,
        }
    }
}

impl Iterator for PipelineStream<'_> {
    type Item = Result<CorporateRecord>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.failed {
            return None;
        }
        loop {
            if let Some(records) = &mut self.current {
                match records.next() {
                    Some(Ok(record)) => return Some(Ok(record)),
                    Some(Err(err)) => {
                        self.failed = true;
                        return Some(Err(err));
                    }
                    None => self.current = None,
                }
            }
            let resource = self.resources.next()?;
            match stream::open(&resource, self.transport) {
                Ok(lines) => self.current = Some(parser::parse(lines)),
                Err(err) => {
                    self.failed = true;
                    return Some(Err(err));
                }
            }
        }
    }
}

static DATASET_SEQ: AtomicU64 = AtomicU64::new(0);

/// A fresh, collision-free default dataset root under the temp dir.
fn default_dataset_root() -> PathBuf {
    let seq = DATASET_SEQ.fetch_add(1, Ordering::Relaxed);
    std::env::temp_dir().join(format!("corpreg-dataset-{}-{seq}", std::process::id()))
}
