//! In-memory site for driving the engine without a network
//!
//! A `ScriptedSite` maps addresses to `ScriptedPage`s and records every call made
//! against it, so tests can assert on load order, attempt counts and session
//! lifecycle. Delays run on the tokio clock and work with paused time.

use crate::crawler::port::{FetchPort, PortError, SessionFactory};
use crate::state::Address;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;
use tokio::time::Instant;

/// Scripted behavior of one page
#[derive(Debug, Clone, Default)]
pub struct ScriptedPage {
    title: Option<String>,
    links: Vec<Address>,
    canonical: Option<Address>,
    load_delay: Duration,
    fail_load: bool,
    link_failures: u32,
    title_failures: u32,
    ready_timeout: bool,
}

impl ScriptedPage {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Text returned for the title selector; pages without one have no record
    #[must_use]
    pub fn title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    /// Outbound links, in document order
    #[must_use]
    pub fn links<I, A>(mut self, links: I) -> Self
    where
        I: IntoIterator<Item = A>,
        A: Into<Address>,
    {
        self.links = links.into_iter().map(Into::into).collect();
        self
    }

    /// Address the page reports after loading, as if redirected
    #[must_use]
    pub fn canonical(mut self, address: impl Into<Address>) -> Self {
        self.canonical = Some(address.into());
        self
    }

    /// Time a load takes; loads slower than their timeout fail with a timeout
    #[must_use]
    pub fn load_delay(mut self, delay: Duration) -> Self {
        self.load_delay = delay;
        self
    }

    #[must_use]
    pub fn failing_load(mut self) -> Self {
        self.fail_load = true;
        self
    }

    /// Fails the first `n` link discovery attempts
    #[must_use]
    pub fn failing_links(mut self, n: u32) -> Self {
        self.link_failures = n;
        self
    }

    /// Fails the first `n` title reads
    #[must_use]
    pub fn failing_title(mut self, n: u32) -> Self {
        self.title_failures = n;
        self
    }

    /// Never reports ready; readiness waits run into their timeout
    #[must_use]
    pub fn ready_timeout(mut self) -> Self {
        self.ready_timeout = true;
        self
    }
}

#[derive(Debug, Default)]
struct SiteInner {
    pages: Mutex<HashMap<Address, ScriptedPage>>,
    loads: Mutex<Vec<(Address, Instant)>>,
    title_calls: Mutex<HashMap<Address, u32>>,
    link_calls: Mutex<HashMap<Address, u32>>,
    fail_open: AtomicBool,
    opened: AtomicUsize,
    closed: AtomicUsize,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

impl SiteInner {
    fn page(&self, address: &Address) -> Option<ScriptedPage> {
        lock(&self.pages).get(address).cloned()
    }

    fn bump(counter: &Mutex<HashMap<Address, u32>>, address: &Address) -> u32 {
        let mut calls = lock(counter);
        let count = calls.entry(address.clone()).or_insert(0);
        *count += 1;
        *count
    }
}

/// Session factory over an in-memory site
#[derive(Debug, Clone, Default)]
pub struct ScriptedSite {
    inner: Arc<SiteInner>,
}

impl ScriptedSite {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds (or replaces) the page served at `address`
    #[must_use]
    pub fn page(self, address: impl Into<Address>, page: ScriptedPage) -> Self {
        lock(&self.inner.pages).insert(address.into(), page);
        self
    }

    /// Makes every `open` call fail
    #[must_use]
    pub fn failing_sessions(self) -> Self {
        self.inner.fail_open.store(true, Ordering::SeqCst);
        self
    }

    /// Every load started, in order
    pub fn loads(&self) -> Vec<Address> {
        lock(&self.inner.loads)
            .iter()
            .map(|(address, _)| address.clone())
            .collect()
    }

    /// Instants at which loads started, in order
    pub fn load_times(&self) -> Vec<Instant> {
        lock(&self.inner.loads).iter().map(|(_, at)| *at).collect()
    }

    pub fn load_count(&self, address: &Address) -> usize {
        lock(&self.inner.loads)
            .iter()
            .filter(|(loaded, _)| loaded == address)
            .count()
    }

    pub fn title_attempts(&self, address: &Address) -> u32 {
        lock(&self.inner.title_calls).get(address).copied().unwrap_or(0)
    }

    pub fn link_attempts(&self, address: &Address) -> u32 {
        lock(&self.inner.link_calls).get(address).copied().unwrap_or(0)
    }

    pub fn sessions_opened(&self) -> usize {
        self.inner.opened.load(Ordering::SeqCst)
    }

    /// Number of `close` calls across all sessions
    pub fn sessions_closed(&self) -> usize {
        self.inner.closed.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl SessionFactory for ScriptedSite {
    type Session = ScriptedSession;

    async fn open(&self) -> Result<ScriptedSession, PortError> {
        if self.inner.fail_open.load(Ordering::SeqCst) {
            return Err(PortError::Session("scripted site refuses sessions".to_string()));
        }

        self.inner.opened.fetch_add(1, Ordering::SeqCst);
        Ok(ScriptedSession {
            site: Arc::clone(&self.inner),
            closed: AtomicBool::new(false),
        })
    }
}

/// Document loaded from a scripted site
#[derive(Debug, Clone)]
pub struct ScriptedDocument {
    /// Address the load was asked for
    pub requested: Address,

    /// Address the document reports (canonical if scripted)
    pub address: Address,
}

/// One session against a `ScriptedSite`
#[derive(Debug)]
pub struct ScriptedSession {
    site: Arc<SiteInner>,
    closed: AtomicBool,
}

impl ScriptedSession {
    fn ensure_open(&self) -> Result<(), PortError> {
        if self.closed.load(Ordering::SeqCst) {
            return Err(PortError::Session("session already closed".to_string()));
        }
        Ok(())
    }

    fn page_of(&self, document: &ScriptedDocument) -> Result<ScriptedPage, PortError> {
        self.site.page(&document.requested).ok_or_else(|| PortError::Load {
            address: document.requested.clone(),
            message: "page disappeared".to_string(),
        })
    }
}

#[async_trait]
impl FetchPort for ScriptedSession {
    type Document = ScriptedDocument;

    async fn load(&self, address: &Address, timeout: Duration) -> Result<ScriptedDocument, PortError> {
        self.ensure_open()?;
        lock(&self.site.loads).push((address.clone(), Instant::now()));

        let page = self.site.page(address).ok_or_else(|| PortError::Load {
            address: address.clone(),
            message: "HTTP 404".to_string(),
        })?;

        if page.load_delay > timeout {
            tokio::time::sleep(timeout).await;
            return Err(PortError::Timeout {
                address: address.clone(),
                operation: "load",
            });
        }
        if !page.load_delay.is_zero() {
            tokio::time::sleep(page.load_delay).await;
        }

        if page.fail_load {
            return Err(PortError::Load {
                address: address.clone(),
                message: "connection reset".to_string(),
            });
        }

        Ok(ScriptedDocument {
            requested: address.clone(),
            address: page.canonical.unwrap_or_else(|| address.clone()),
        })
    }

    async fn wait_ready(&self, document: &ScriptedDocument, timeout: Duration) -> Result<(), PortError> {
        self.ensure_open()?;
        if self.page_of(document)?.ready_timeout {
            tokio::time::sleep(timeout).await;
            return Err(PortError::Timeout {
                address: document.address.clone(),
                operation: "wait_ready",
            });
        }
        Ok(())
    }

    async fn read_text(
        &self,
        document: &ScriptedDocument,
        selector: &str,
        _timeout: Duration,
    ) -> Result<String, PortError> {
        self.ensure_open()?;
        let page = self.page_of(document)?;
        let attempt = SiteInner::bump(&self.site.title_calls, &document.requested);

        if attempt <= page.title_failures {
            return Err(PortError::Timeout {
                address: document.address.clone(),
                operation: "read_text",
            });
        }

        page.title.ok_or_else(|| PortError::NotFound {
            selector: selector.to_string(),
        })
    }

    async fn find_all(
        &self,
        document: &ScriptedDocument,
        _selector: &str,
    ) -> Result<Vec<Address>, PortError> {
        self.ensure_open()?;
        let page = self.page_of(document)?;
        let attempt = SiteInner::bump(&self.site.link_calls, &document.requested);

        if attempt <= page.link_failures {
            return Err(PortError::Timeout {
                address: document.address.clone(),
                operation: "find_all",
            });
        }

        Ok(page.links)
    }

    fn current_address(&self, document: &ScriptedDocument) -> Address {
        document.address.clone()
    }

    async fn close(&self) {
        self.closed.store(true, Ordering::SeqCst);
        self.site.closed.fetch_add(1, Ordering::SeqCst);
    }
}
