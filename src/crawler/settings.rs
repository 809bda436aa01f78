use crate::config::{Config, RecordCapPolicy};
use crate::crawler::RetryPolicy;
use crate::state::Address;
use std::time::Duration;

/// Immutable run parameters the engine reads, resolved once from `Config`
#[derive(Debug, Clone)]
pub struct CrawlSettings {
    pub seed: Address,
    pub max_records: usize,
    pub page_load_timeout: Duration,
    pub timeout_total: Duration,
    pub timeout_deeper: Duration,
    pub settle_delay: Duration,
    pub record_cap_policy: RecordCapPolicy,
    pub workers: usize,
    pub shuffle_seed: Option<u64>,
    pub retry: RetryPolicy,
    pub link_selector: String,
    pub title_selector: String,
}

impl CrawlSettings {
    pub fn from_config(config: &Config) -> Self {
        let crawler = &config.crawler;

        Self {
            seed: Address::from(crawler.seed_url.as_str()),
            max_records: crawler.max_records,
            page_load_timeout: crawler.page_load_timeout(),
            timeout_total: crawler.timeout_total(),
            timeout_deeper: crawler.timeout_deeper(),
            settle_delay: crawler.settle_delay(),
            record_cap_policy: crawler.record_cap_policy,
            workers: crawler.workers.max(1),
            shuffle_seed: crawler.shuffle_seed,
            retry: RetryPolicy::from_config(&config.retry),
            link_selector: config.selectors.link.clone(),
            title_selector: config.selectors.title.clone(),
        }
    }
}

impl From<&Config> for CrawlSettings {
    fn from(config: &Config) -> Self {
        Self::from_config(config)
    }
}
