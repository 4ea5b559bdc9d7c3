//! The byte-stream collaborator contract and its HTTP implementation.
//!
//! The pipeline only needs one thing from the network layer: given a URL,
//! produce a byte stream, distinguishing "not published" from "not
//! reachable". [`Transport`] captures that contract so the whole pipeline
//! can run against [`crate::testing::StaticTransport`] in tests, and so
//! callers can swap in their own client (proxies, retries, instrumented
//! transports) without touching the core.
//!
//! Timeout policy lives here, not in the pipeline: the stages downstream
//! of a fetch never block on anything but the reader they were handed.

use std::io::Read;
use std::time::Duration;

use crate::errors::{RegistryError, Result};

const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);
const READ_TIMEOUT: Duration = Duration::from_secs(300);

/// "Given a URL, produce a byte stream."
///
/// A missing resource (HTTP 404) maps to [`RegistryError::ResourceNotFound`];
/// every other failure to reach or read the resource maps to
/// [`RegistryError::Transport`]. Implementations never retry.
pub trait Transport: Send + Sync {
    /// Open a streaming reader over the resource body.
    ///
    /// # Errors
    /// `ResourceNotFound` when the server reports the resource absent,
    /// `Transport` on connectivity failure or an unexpected status.
    fn fetch(&self, url: &str) -> Result<Box<dyn Read + Send>>;

    /// Fetch a small text document in full (the diff listing page).
    ///
    /// # Errors
    /// Same as [`Transport::fetch`], plus `Transport` if the body cannot be
    /// read to the end.
    fn fetch_text(&self, url: &str) -> Result<String> {
        let mut reader = self.fetch(url)?;
        let mut body = String::new();
        reader
            .read_to_string(&mut body)
            .map_err(|err| RegistryError::Transport {
                url: url.to_string(),
                reason: err.to_string(),
            })?;
        Ok(body)
    }
}

/// Default [`Transport`] backed by a blocking `ureq` agent.
pub struct HttpTransport {
    agent: ureq::Agent,
}

impl HttpTransport {
    #[must_use]
    pub fn new() -> Self {
        let agent = ureq::AgentBuilder::new()
            .timeout_connect(CONNECT_TIMEOUT)
            .timeout_read(READ_TIMEOUT)
            .build();
        Self { agent }
    }
}

impl Default for HttpTransport {
    fn default() -> Self {
        Self::new()
    }
}

impl Transport for HttpTransport {
    fn fetch(&self, url: &str) -> Result<Box<dyn Read + Send>> {
        match self.agent.get(url).call() {
            Ok(response) => Ok(Box::new(response.into_reader())),
            Err(ureq::Error::Status(404, _)) => Err(RegistryError::ResourceNotFound {
                target: url.to_string(),
            }),
            Err(ureq::Error::Status(code, _)) => Err(RegistryError::Transport {
                url: url.to_string(),
                reason: format!("unexpected http status {code}"),
            }),
            Err(ureq::Error::Transport(err)) => Err(RegistryError::Transport {
                url: url.to_string(),
                reason: err.to_string(),
            }),
        }
    }
}
