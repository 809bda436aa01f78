//! Crawler module for bounded depth-first record collection
//!
//! This module contains the core crawling logic, including:
//! - The fetch port abstraction and its HTTP and scripted implementations
//! - Retry-with-backoff for port operations
//! - Link discovery and record extraction
//! - Root frontier, work stack and per-branch budgets
//! - Overall crawl orchestration

mod engine;
mod explorer;
mod extract;
mod fetcher;
mod frontier;
mod parser;
mod port;
mod retry;
mod scripted;
mod settings;

pub use engine::{run_crawl, CrawlEngine, CrawlOutcome};
pub use explorer::{Exploration, Explorer, NodeStats};
pub use extract::{discover_links, extract_record, wait_for_document};
pub use fetcher::{build_http_client, HttpDocument, HttpSession, HttpSessionFactory};
pub use frontier::{Branch, RootFrontier, WorkStack};
pub use parser::{parse_selector, select_links, select_text};
pub use port::{FetchPort, PortError, SessionFactory};
pub use retry::{retry, retry_if, RetryPolicy};
pub use scripted::{ScriptedDocument, ScriptedPage, ScriptedSession, ScriptedSite};
pub use settings::CrawlSettings;
