//! Error taxonomy for the registry client.
//!
//! Every failure carries enough context (resource label, line number, byte
//! offset, filesystem path) to diagnose without re-running the fetch. The
//! crate never retries and never swallows an error: retry/backoff policy
//! belongs to the caller, layered on top of repeated [`crate::locator`] /
//! [`crate::stream`] calls.

use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Crate-wide result alias.
pub type Result<T> = std::result::Result<T, RegistryError>;

/// Everything that can go wrong between a request and its table or dataset.
#[derive(Debug, Error)]
pub enum RegistryError {
    /// The requested region is not one of the 47 known prefectures.
    #[error("unexpected prefecture or region: '{name}'")]
    InvalidPrefecture { name: String },

    /// A date literal was not 8 digits forming a real calendar date.
    #[error("invalid date '{input}': expected YYYYMMDD digits")]
    InvalidDateFormat { input: String },

    /// No publication exists for the requested target (date, listing, URL).
    #[error("no publication found for {target}")]
    ResourceNotFound { target: String },

    /// Connectivity failure while talking to the publication site.
    #[error("transport failure for {url}: {reason}")]
    Transport { url: String, reason: String },

    /// The archive container is corrupt or structured unexpectedly.
    #[error("corrupt archive from {resource}: {detail}")]
    Decompression { resource: String, detail: String },

    /// A byte sequence could not be decoded under the declared encoding.
    ///
    /// `offset` is the position of the offending sequence within the
    /// decompressed member, counted from zero.
    #[error("undecodable {encoding} byte sequence in {resource} at byte offset {offset}")]
    Encoding {
        resource: String,
        encoding: &'static str,
        offset: u64,
    },

    /// A line violated the fixed record schema. `line` is 1-based.
    #[error("malformed record in {resource} at line {line}: {detail}")]
    MalformedRecord {
        resource: String,
        line: u64,
        detail: String,
    },

    /// A requested partition column is absent from the record schema.
    #[error("unknown partition column '{column}'")]
    UnknownPartitionColumn { column: String },

    /// Filesystem or encoder failure while writing the partitioned dataset.
    #[error("failed to write partition data under {path}: {source}")]
    PartitionWrite {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}
