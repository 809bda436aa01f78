//! HTTP implementation of the fetch port
//!
//! This module handles all HTTP requests for the crawler, including:
//! - Building HTTP clients with proper user agent strings
//! - GET requests bounded by the page-load timeout
//! - Error classification into port errors
//!
//! Documents are fully read during `load`, so the ready signal is immediate. Redirects
//! are followed and the final URL becomes the document's canonical address.

use crate::config::UserAgentConfig;
use crate::crawler::parser::{select_links, select_text};
use crate::crawler::port::{FetchPort, PortError, SessionFactory};
use crate::state::Address;
use async_trait::async_trait;
use reqwest::{redirect::Policy, Client};
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use url::Url;

/// Maximum redirect hops followed for a single load
const MAX_REDIRECTS: usize = 10;

/// A fetched HTML document
#[derive(Debug, Clone)]
pub struct HttpDocument {
    /// Final URL after redirects
    pub url: Url,
    /// HTTP status code
    pub status_code: u16,
    /// Page body content
    pub body: String,
}

/// Builds an HTTP client with proper configuration
///
/// # Example
///
/// ```no_run
/// use trawl::config::UserAgentConfig;
/// use trawl::crawler::build_http_client;
///
/// let config = UserAgentConfig {
///     crawler_name: "Trawl".to_string(),
///     crawler_version: "1.0".to_string(),
///     contact_url: "https://example.com/about".to_string(),
///     contact_email: "admin@example.com".to_string(),
/// };
///
/// let client = build_http_client(&config).unwrap();
/// ```
pub fn build_http_client(config: &UserAgentConfig) -> Result<Client, reqwest::Error> {
    Client::builder()
        .user_agent(config.header_value())
        .connect_timeout(Duration::from_secs(10))
        .redirect(Policy::limited(MAX_REDIRECTS))
        .gzip(true)
        .brotli(true)
        .build()
}

/// Opens HTTP sessions sharing one user agent identity
#[derive(Debug, Clone)]
pub struct HttpSessionFactory {
    user_agent: UserAgentConfig,
}

impl HttpSessionFactory {
    pub fn new(user_agent: UserAgentConfig) -> Self {
        Self { user_agent }
    }
}

#[async_trait]
impl SessionFactory for HttpSessionFactory {
    type Session = HttpSession;

    async fn open(&self) -> Result<HttpSession, PortError> {
        let client = build_http_client(&self.user_agent)
            .map_err(|e| PortError::Session(format!("failed to build HTTP client: {}", e)))?;
        tracing::debug!("Opened HTTP session");
        Ok(HttpSession::new(client))
    }
}

/// One HTTP "browsing" session
pub struct HttpSession {
    client: Client,
    closed: AtomicBool,
}

impl HttpSession {
    pub fn new(client: Client) -> Self {
        Self {
            client,
            closed: AtomicBool::new(false),
        }
    }

    fn ensure_open(&self) -> Result<(), PortError> {
        if self.closed.load(Ordering::Acquire) {
            return Err(PortError::Session("session already closed".to_string()));
        }
        Ok(())
    }

    async fn fetch(&self, address: &Address) -> Result<HttpDocument, PortError> {
        let load_error = |message: String| PortError::Load {
            address: address.clone(),
            message,
        };

        let response = self
            .client
            .get(address.as_str())
            .send()
            .await
            .map_err(|e| classify_error(address, e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(load_error(format!("HTTP {}", status.as_u16())));
        }

        let url = response.url().clone();
        let body = response
            .text()
            .await
            .map_err(|e| classify_error(address, e))?;

        Ok(HttpDocument {
            url,
            status_code: status.as_u16(),
            body,
        })
    }
}

/// Maps a reqwest error to a port error
fn classify_error(address: &Address, error: reqwest::Error) -> PortError {
    if error.is_timeout() {
        PortError::Timeout {
            address: address.clone(),
            operation: "load",
        }
    } else if error.is_connect() {
        PortError::Load {
            address: address.clone(),
            message: "Connection refused".to_string(),
        }
    } else {
        PortError::Load {
            address: address.clone(),
            message: error.to_string(),
        }
    }
}

#[async_trait]
impl FetchPort for HttpSession {
    type Document = HttpDocument;

    async fn load(&self, address: &Address, timeout: Duration) -> Result<HttpDocument, PortError> {
        self.ensure_open()?;

        match tokio::time::timeout(timeout, self.fetch(address)).await {
            Ok(result) => result,
            Err(_) => Err(PortError::Timeout {
                address: address.clone(),
                operation: "load",
            }),
        }
    }

    async fn wait_ready(&self, _document: &HttpDocument, _timeout: Duration) -> Result<(), PortError> {
        // The body was read completely during load
        self.ensure_open()
    }

    async fn read_text(
        &self,
        document: &HttpDocument,
        selector: &str,
        _timeout: Duration,
    ) -> Result<String, PortError> {
        self.ensure_open()?;

        select_text(&document.body, selector)?.ok_or_else(|| PortError::NotFound {
            selector: selector.to_string(),
        })
    }

    async fn find_all(
        &self,
        document: &HttpDocument,
        selector: &str,
    ) -> Result<Vec<Address>, PortError> {
        self.ensure_open()?;

        let links = select_links(&document.body, selector, &document.url)?;
        Ok(links.into_iter().map(Address::from).collect())
    }

    fn current_address(&self, document: &HttpDocument) -> Address {
        Address::from(document.url.clone())
    }

    async fn close(&self) {
        if !self.closed.swap(true, Ordering::AcqRel) {
            tracing::debug!("Closed HTTP session");
        }
    }
}
