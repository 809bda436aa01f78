use serde::Deserialize;
use std::time::Duration;

/// Main configuration structure for Trawl
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub crawler: CrawlerConfig,
    #[serde(default)]
    pub retry: RetryConfig,
    #[serde(default)]
    pub selectors: SelectorConfig,
    #[serde(rename = "user-agent")]
    pub user_agent: UserAgentConfig,
    #[serde(default)]
    pub output: OutputConfig,
}

/// Whether the record cap may interrupt a branch that is already being explored
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RecordCapPolicy {
    /// The cap only stops new root branches; running branches finish naturally
    #[default]
    RootGate,

    /// Every explorer entry checks the cap and unwinds the branch once it is reached
    Preempt,
}

/// Crawler behavior configuration
#[derive(Debug, Clone, Deserialize)]
pub struct CrawlerConfig {
    /// Page the root frontier is discovered from
    #[serde(rename = "seed-url")]
    pub seed_url: String,

    /// Number of unique records after which no new root branch starts
    #[serde(rename = "max-records", default = "default_max_records")]
    pub max_records: usize,

    /// Timeout for loading a page and for each document read (milliseconds)
    #[serde(rename = "page-load-timeout-ms", default = "default_page_load_timeout_ms")]
    pub page_load_timeout_ms: u64,

    /// Run is aborted when no new record was saved for this long (seconds)
    #[serde(rename = "timeout-total-seconds", default = "default_timeout_total_seconds")]
    pub timeout_total_seconds: u64,

    /// Budget for exploring the links discovered on a single node (seconds)
    #[serde(rename = "timeout-deeper-seconds", default = "default_timeout_deeper_seconds")]
    pub timeout_deeper_seconds: u64,

    /// Pause after the document-ready signal before reading content (milliseconds)
    #[serde(rename = "settle-delay-ms", default = "default_settle_delay_ms")]
    pub settle_delay_ms: u64,

    #[serde(rename = "record-cap-policy", default)]
    pub record_cap_policy: RecordCapPolicy,

    /// Number of independent sessions; 1 is the strictly serial crawl
    #[serde(default = "default_workers")]
    pub workers: usize,

    /// Fixed seed for branch shuffling, for reproducible runs
    #[serde(rename = "shuffle-seed", default)]
    pub shuffle_seed: Option<u64>,
}

impl CrawlerConfig {
    pub fn page_load_timeout(&self) -> Duration {
        Duration::from_millis(self.page_load_timeout_ms)
    }

    pub fn timeout_total(&self) -> Duration {
        Duration::from_secs(self.timeout_total_seconds)
    }

    pub fn timeout_deeper(&self) -> Duration {
        Duration::from_secs(self.timeout_deeper_seconds)
    }

    pub fn settle_delay(&self) -> Duration {
        Duration::from_millis(self.settle_delay_ms)
    }
}

/// Retry-with-backoff settings for document reads
#[derive(Debug, Clone, Deserialize)]
pub struct RetryConfig {
    /// Total attempts per operation, including the first one
    #[serde(rename = "max-retry-fails", default = "default_max_retry_fails")]
    pub max_retry_fails: u32,

    /// Base of the exponential backoff (milliseconds)
    #[serde(rename = "multiplier-ms", default = "default_multiplier_ms")]
    pub multiplier_ms: u64,

    /// Lower clamp of the wait between attempts (milliseconds)
    #[serde(rename = "wait-min-ms", default = "default_wait_min_ms")]
    pub wait_min_ms: u64,

    /// Upper clamp of the wait between attempts (milliseconds)
    #[serde(rename = "wait-max-ms", default = "default_wait_max_ms")]
    pub wait_max_ms: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retry_fails: default_max_retry_fails(),
            multiplier_ms: default_multiplier_ms(),
            wait_min_ms: default_wait_min_ms(),
            wait_max_ms: default_wait_max_ms(),
        }
    }
}

/// CSS selectors used to read documents
#[derive(Debug, Clone, Deserialize)]
pub struct SelectorConfig {
    /// Elements whose `href` are followed
    #[serde(default = "default_link_selector")]
    pub link: String,

    /// Element whose text becomes the record title
    #[serde(default = "default_title_selector")]
    pub title: String,
}

impl Default for SelectorConfig {
    fn default() -> Self {
        Self {
            link: default_link_selector(),
            title: default_title_selector(),
        }
    }
}

/// User agent identification configuration
#[derive(Debug, Clone, Deserialize)]
pub struct UserAgentConfig {
    /// Name of the crawler
    #[serde(rename = "crawler-name")]
    pub crawler_name: String,

    /// Version of the crawler
    #[serde(rename = "crawler-version")]
    pub crawler_version: String,

    /// URL with information about the crawler
    #[serde(rename = "contact-url")]
    pub contact_url: String,

    /// Email address for crawler-related contact
    #[serde(rename = "contact-email")]
    pub contact_email: String,
}

impl UserAgentConfig {
    /// Format: CrawlerName/Version (+ContactURL; ContactEmail)
    pub fn header_value(&self) -> String {
        format!(
            "{}/{} (+{}; {})",
            self.crawler_name, self.crawler_version, self.contact_url, self.contact_email
        )
    }
}

/// Output configuration
#[derive(Debug, Clone, Deserialize)]
pub struct OutputConfig {
    /// Path of the CSV file receiving the records
    #[serde(rename = "csv-path", default = "default_csv_path")]
    pub csv_path: String,

    /// Optional SQLite database receiving the run and its records
    #[serde(rename = "database-path", default)]
    pub database_path: Option<String>,

    /// Directory for timestamped log files; console only when `None`
    #[serde(rename = "log-dir", default = "default_log_dir")]
    pub log_dir: Option<String>,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            csv_path: default_csv_path(),
            database_path: None,
            log_dir: default_log_dir(),
        }
    }
}

fn default_max_records() -> usize {
    150
}

fn default_page_load_timeout_ms() -> u64 {
    30_000
}

fn default_timeout_total_seconds() -> u64 {
    60
}

fn default_timeout_deeper_seconds() -> u64 {
    45
}

fn default_settle_delay_ms() -> u64 {
    3_000
}

fn default_workers() -> usize {
    1
}

fn default_max_retry_fails() -> u32 {
    3
}

fn default_multiplier_ms() -> u64 {
    1_000
}

fn default_wait_min_ms() -> u64 {
    2_000
}

fn default_wait_max_ms() -> u64 {
    10_000
}

fn default_link_selector() -> String {
    "a[href*='/job-offer/']".to_string()
}

fn default_title_selector() -> String {
    "h1".to_string()
}

fn default_csv_path() -> String {
    "JobResults.csv".to_string()
}

fn default_log_dir() -> Option<String> {
    Some("logs".to_string())
}
