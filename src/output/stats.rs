//! Run report and its console rendering

use crate::crawler::NodeStats;
use chrono::{DateTime, Utc};
use std::fmt;
use std::time::Duration;

/// How a run ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunOutcome {
    /// The root frontier was exhausted
    Completed,

    /// The root loop stopped because the ledger reached the record cap
    RecordCapReached,

    /// No record was saved within the global budget
    DeadlineExceeded,

    /// A critical error (session or seed load) ended the run early
    Aborted,
}

impl RunOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Completed => "completed",
            Self::RecordCapReached => "record-cap-reached",
            Self::DeadlineExceeded => "deadline-exceeded",
            Self::Aborted => "aborted",
        }
    }
}

impl fmt::Display for RunOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Summary of one run
#[derive(Debug, Clone)]
pub struct RunReport {
    pub outcome: RunOutcome,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub duration: Duration,

    /// Records in the ledger
    pub records: usize,

    /// Addresses scheduled for exploration
    pub visited: usize,

    /// Root addresses never popped
    pub frontier_remaining: usize,

    pub nodes: NodeStats,
}

impl RunReport {
    /// Report of a run that did nothing
    pub fn empty() -> Self {
        let now = Utc::now();
        Self {
            outcome: RunOutcome::Completed,
            started_at: now,
            finished_at: now,
            duration: Duration::ZERO,
            records: 0,
            visited: 0,
            frontier_remaining: 0,
            nodes: NodeStats::default(),
        }
    }
}

/// Prints the run report to stdout
pub fn print_report(report: &RunReport) {
    println!("=== Crawl Report ===\n");

    println!("Run:");
    println!("  Outcome: {}", report.outcome);
    println!("  Started: {}", report.started_at.to_rfc3339());
    println!("  Duration: {:.1}s", report.duration.as_secs_f64());
    println!();

    println!("Results:");
    println!("  Records saved: {}", report.records);
    println!("  Addresses visited: {}", report.visited);
    println!("  Root addresses left: {}", report.frontier_remaining);
    println!();

    let nodes = &report.nodes;
    println!("Nodes:");
    println!("  Explored: {}", nodes.nodes_explored);
    println!("  Failed: {}", nodes.nodes_failed);
    println!("  Extractions degraded: {}", nodes.extractions_degraded);
    println!("  Discoveries degraded: {}", nodes.discoveries_degraded);
    println!("  Branch timeouts: {}", nodes.branch_timeouts);
    println!("  Max depth: {}", nodes.max_depth);

    let yield_rate = if nodes.nodes_explored > 0 {
        (report.records as f64 / nodes.nodes_explored as f64) * 100.0
    } else {
        0.0
    };
    println!(
        "\nYield: {:.1}% ({} records / {} nodes explored)",
        yield_rate, report.records, nodes.nodes_explored
    );
}
