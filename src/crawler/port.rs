//! Fetch/render port: the only way the crawler touches the outside world
//!
//! The engine never knows how documents are produced. It opens sessions through a
//! `SessionFactory` and drives each session through the four document operations.

use crate::state::Address;
use async_trait::async_trait;
use std::time::Duration;
use thiserror::Error;

/// Errors raised by port operations
#[derive(Debug, Clone, Error)]
pub enum PortError {
    /// The document could not be loaded (network, HTTP status, body read)
    #[error("Failed to load {address}: {message}")]
    Load { address: Address, message: String },

    /// An operation did not finish within its timeout
    #[error("Timed out during {operation} for {address}")]
    Timeout {
        address: Address,
        operation: &'static str,
    },

    /// No element matched the selector, or the match had no text
    #[error("No element matches selector '{selector}'")]
    NotFound { selector: String },

    #[error("Invalid selector '{selector}': {message}")]
    InvalidSelector { selector: String, message: String },

    /// The session could not be opened or was already closed
    #[error("Session error: {0}")]
    Session(String),
}

impl PortError {
    /// Returns true for timeouts, which callers may tolerate as best-effort content
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::Timeout { .. })
    }

    /// Returns false for failures another attempt against the same document cannot fix
    ///
    /// A selector that matched nothing, or does not parse, fails the same way every
    /// time. Load, timeout and session errors are retryable.
    pub fn is_retryable(&self) -> bool {
        !matches!(self, Self::NotFound { .. } | Self::InvalidSelector { .. })
    }
}

/// One exclusively-owned browsing session holding one document view at a time
#[async_trait]
pub trait FetchPort: Send + Sync {
    /// The loaded document type
    type Document: Send + Sync;

    /// Navigates to `address` and returns the loaded document
    async fn load(&self, address: &Address, timeout: Duration) -> Result<Self::Document, PortError>;

    /// Waits until the document reports itself ready
    async fn wait_ready(&self, document: &Self::Document, timeout: Duration) -> Result<(), PortError>;

    /// Returns the text of the first element matching `selector`
    async fn read_text(
        &self,
        document: &Self::Document,
        selector: &str,
        timeout: Duration,
    ) -> Result<String, PortError>;

    /// Returns the addresses linked by every element matching `selector`, in document order
    async fn find_all(
        &self,
        document: &Self::Document,
        selector: &str,
    ) -> Result<Vec<Address>, PortError>;

    /// Address the document ended up at after navigation
    fn current_address(&self, document: &Self::Document) -> Address;

    /// Releases the session; called exactly once at the end of a run
    async fn close(&self);
}

/// Opens independent sessions
///
/// A serial run opens one session. The worker pool opens one per worker.
#[async_trait]
pub trait SessionFactory: Send + Sync {
    type Session: FetchPort + 'static;

    async fn open(&self) -> Result<Self::Session, PortError>;
}
