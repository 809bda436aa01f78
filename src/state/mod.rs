//! State module for tracking crawl progress
//!
//! # Components
//!
//! - `Address` / `Record`: the crawled locations and the results extracted from them
//! - `CrawlState`: visited set, unique-result set, ledger and deadline clock of one run
//! - `NodePhase`: the phase an explored node is in, used for structured logging

mod crawl_state;
mod node_phase;
mod record;

// Re-export main types
pub use crawl_state::{CrawlState, SharedCrawlState, StateAccess};
pub use node_phase::NodePhase;
pub use record::{Address, Record};
