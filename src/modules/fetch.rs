//! Fetch Capability
//!
//! A `Fetcher` retrieves package source text by address. It distinguishes
//! "not here" (`Ok(None)`), which lets the resolver move on to the next
//! location, from a transport failure (`Err`).
//!
//! Provided transports:
//! - `FsFetcher` - reads files
//! - `HttpFetcher` - blocking HTTP GET
//! - `DefaultFetcher` - routes `http(s)://` addresses to HTTP, the rest to files
//! - `MemoryFetcher` - serves registered strings and counts requests

use std::collections::HashMap;
use std::io::ErrorKind;

use parking_lot::Mutex;
use tracing::trace;

use super::errors::FetchError;

/// Result of a fetch: `Ok(None)` means the address holds nothing.
pub type FetchResult = Result<Option<String>, FetchError>;

/// Blocking "fetch text by address" capability.
pub trait Fetcher: Send + Sync {
    fn fetch_text(&self, address: &str) -> FetchResult;
}

impl<F> Fetcher for F
where
    F: Fn(&str) -> FetchResult + Send + Sync,
{
    fn fetch_text(&self, address: &str) -> FetchResult {
        self(address)
    }
}

/// Reads package sources from the file system.
#[derive(Debug, Clone, Copy, Default)]
pub struct FsFetcher;

impl Fetcher for FsFetcher {
    fn fetch_text(&self, address: &str) -> FetchResult {
        trace!(target: "just::fetch", address, "Reading file");
        match std::fs::read_to_string(address) {
            Ok(text) => Ok(Some(text)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(FetchError::new(address, e.to_string())),
        }
    }
}

/// Fetches package sources over HTTP with a blocking agent.
#[derive(Clone)]
pub struct HttpFetcher {
    agent: ureq::Agent,
}

impl HttpFetcher {
    pub fn new() -> Self {
        Self {
            agent: ureq::AgentBuilder::new().build(),
        }
    }

    /// Use a preconfigured agent (timeouts, proxies, TLS).
    pub fn with_agent(agent: ureq::Agent) -> Self {
        Self { agent }
    }
}

impl Default for HttpFetcher {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for HttpFetcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpFetcher").finish_non_exhaustive()
    }
}

impl Fetcher for HttpFetcher {
    fn fetch_text(&self, address: &str) -> FetchResult {
        trace!(target: "just::fetch", address, "HTTP GET");
        match self.agent.get(address).call() {
            Ok(resp) => resp
                .into_string()
                .map(Some)
                .map_err(|e| FetchError::new(address, e.to_string())),
            Err(ureq::Error::Status(404 | 410, _)) => Ok(None),
            Err(ureq::Error::Status(code, _)) => {
                Err(FetchError::new(address, format!("HTTP status {}", code)))
            }
            Err(ureq::Error::Transport(err)) => Err(FetchError::new(address, err.to_string())),
        }
    }
}

/// Whether an address should be fetched over HTTP.
pub fn is_remote_address(address: &str) -> bool {
    address.starts_with("http://") || address.starts_with("https://")
}

/// Routes remote addresses to `HttpFetcher` and everything else to `FsFetcher`.
#[derive(Debug, Clone, Default)]
pub struct DefaultFetcher {
    fs: FsFetcher,
    http: HttpFetcher,
}

impl DefaultFetcher {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Fetcher for DefaultFetcher {
    fn fetch_text(&self, address: &str) -> FetchResult {
        if is_remote_address(address) {
            self.http.fetch_text(address)
        } else {
            self.fs.fetch_text(address)
        }
    }
}

/// What a `MemoryFetcher` serves for an address.
#[derive(Debug, Clone)]
enum Entry {
    Text(String),
    Failure(String),
}

/// In-memory fetcher for embedded hosts and tests.
///
/// Every request is counted per address, found or not.
#[derive(Debug, Default)]
pub struct MemoryFetcher {
    entries: Mutex<HashMap<String, Entry>>,
    requests: Mutex<HashMap<String, usize>>,
}

impl MemoryFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Serve `text` at `address`.
    pub fn insert(&self, address: impl Into<String>, text: impl Into<String>) {
        self.entries
            .lock()
            .insert(address.into(), Entry::Text(text.into()));
    }

    pub fn with(self, address: impl Into<String>, text: impl Into<String>) -> Self {
        self.insert(address, text);
        self
    }

    /// Make requests for `address` fail with a transport error.
    pub fn insert_failure(&self, address: impl Into<String>, message: impl Into<String>) {
        self.entries
            .lock()
            .insert(address.into(), Entry::Failure(message.into()));
    }

    pub fn with_failure(self, address: impl Into<String>, message: impl Into<String>) -> Self {
        self.insert_failure(address, message);
        self
    }

    /// Number of requests made for `address`.
    pub fn request_count(&self, address: &str) -> usize {
        self.requests.lock().get(address).copied().unwrap_or(0)
    }

    /// Total number of requests across all addresses.
    pub fn total_requests(&self) -> usize {
        self.requests.lock().values().sum()
    }
}

impl Fetcher for MemoryFetcher {
    fn fetch_text(&self, address: &str) -> FetchResult {
        *self.requests.lock().entry(address.to_string()).or_insert(0) += 1;
        match self.entries.lock().get(address) {
            Some(Entry::Text(text)) => Ok(Some(text.clone())),
            Some(Entry::Failure(message)) => Err(FetchError::new(address, message.clone())),
            None => Ok(None),
        }
    }
}
