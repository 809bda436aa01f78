//! Bounded depth-first exploration below one root address
//!
//! The explorer walks a subtree with an explicit `WorkStack` instead of recursion.
//! Every node entry first checks the global deadline; when it fires, the stack is
//! drained and the whole run is flagged as aborted. Each node walks its own shuffled
//! candidates under a fresh branch budget, and any failure is confined to the node
//! that raised it.

use crate::config::RecordCapPolicy;
use crate::crawler::extract::{discover_links, extract_record};
use crate::crawler::frontier::{Branch, WorkStack};
use crate::crawler::port::{FetchPort, PortError};
use crate::crawler::CrawlSettings;
use crate::state::{Address, NodePhase, StateAccess};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use std::ops::AddAssign;

/// How an exploration ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Exploration {
    /// Every reachable candidate was explored, dropped by its branch budget, or failed
    Exhausted,

    /// The record cap interrupted the branch (`preempt` policy only)
    CapReached,

    /// The global deadline fired; the run must stop
    DeadlineExceeded,
}

/// Per-run counters kept by explorers
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct NodeStats {
    /// Explorer entries that passed the deadline check and started loading
    pub nodes_explored: u64,

    /// Nodes whose load failed
    pub nodes_failed: u64,

    /// Nodes where record extraction ran out of attempts
    pub extractions_degraded: u64,

    /// Nodes where link discovery ran out of attempts (root page included)
    pub discoveries_degraded: u64,

    /// Branches that stopped walking candidates because their budget ran out
    pub branch_timeouts: u64,

    /// Deepest depth entered
    pub max_depth: u32,
}

impl AddAssign for NodeStats {
    fn add_assign(&mut self, other: Self) {
        self.nodes_explored += other.nodes_explored;
        self.nodes_failed += other.nodes_failed;
        self.extractions_degraded += other.extractions_degraded;
        self.discoveries_degraded += other.discoveries_degraded;
        self.branch_timeouts += other.branch_timeouts;
        self.max_depth = self.max_depth.max(other.max_depth);
    }
}

/// Result of entering a node
enum Entry {
    /// Node processed; its candidates still need walking
    Branch(Branch),
    /// Node contributed no children (failed load)
    Leaf,
    /// Exploration must unwind
    Abort(Exploration),
}

/// Explores subtrees with one session against one run state
pub struct Explorer<'a, P: FetchPort, S: StateAccess> {
    port: &'a P,
    settings: &'a CrawlSettings,
    state: &'a mut S,
    rng: StdRng,
    stats: NodeStats,
}

impl<'a, P: FetchPort, S: StateAccess> Explorer<'a, P, S> {
    pub fn new(port: &'a P, settings: &'a CrawlSettings, state: &'a mut S, rng: StdRng) -> Self {
        Self {
            port,
            settings,
            state,
            rng,
            stats: NodeStats::default(),
        }
    }

    pub fn state(&self) -> &S {
        &*self.state
    }

    pub fn state_mut(&mut self) -> &mut S {
        &mut *self.state
    }

    pub fn stats(&self) -> NodeStats {
        self.stats
    }

    /// Explores `root` (already marked visited) and everything reachable below it
    pub async fn explore(&mut self, root: Address) -> Exploration {
        let mut stack = WorkStack::new();

        match self.enter(root, 0).await {
            Entry::Branch(branch) => stack.push(branch),
            Entry::Leaf => return Exploration::Exhausted,
            Entry::Abort(reason) => return reason,
        }

        while let Some(branch) = stack.top_mut() {
            if branch.is_exhausted() {
                stack.pop();
                continue;
            }

            if branch.is_expired(self.settings.timeout_deeper) {
                tracing::warn!(
                    phase = %NodePhase::Recursing,
                    depth = branch.depth,
                    address = %branch.address,
                    dropped = branch.remaining(),
                    "Timeout for deeper exploration"
                );
                self.stats.branch_timeouts += 1;
                stack.pop();
                continue;
            }

            let depth = branch.depth + 1;
            let Some(candidate) = branch.next_candidate() else {
                stack.pop();
                continue;
            };

            if !self.state.mark_visited(&candidate) {
                continue;
            }

            match self.enter(candidate, depth).await {
                Entry::Branch(child) => stack.push(child),
                Entry::Leaf => {}
                Entry::Abort(reason) => {
                    let dropped = stack.drain();
                    tracing::debug!(dropped, "Unwound work stack");
                    return reason;
                }
            }
        }

        Exploration::Exhausted
    }

    /// Explorer entry: run-level checks, then the node itself
    async fn enter(&mut self, address: Address, depth: u32) -> Entry {
        if self.state.is_aborted() {
            return Entry::Abort(Exploration::DeadlineExceeded);
        }

        let idle = self.state.idle_for();
        if idle > self.settings.timeout_total {
            tracing::warn!(
                phase = %NodePhase::Scheduled,
                depth,
                address = %address,
                idle_secs = idle.as_secs_f64(),
                "Overall timeout reached. Ending crawl."
            );
            self.state.abort();
            return Entry::Abort(Exploration::DeadlineExceeded);
        }

        if self.settings.record_cap_policy == RecordCapPolicy::Preempt
            && self.state.record_count() >= self.settings.max_records
        {
            tracing::info!(
                phase = %NodePhase::Scheduled,
                depth,
                address = %address,
                "Record cap reached, unwinding branch"
            );
            return Entry::Abort(Exploration::CapReached);
        }

        self.stats.nodes_explored += 1;
        self.stats.max_depth = self.stats.max_depth.max(depth);

        match self.process_node(&address, depth).await {
            Ok(branch) => Entry::Branch(branch),
            Err(e) => {
                self.stats.nodes_failed += 1;
                tracing::error!(
                    phase = %NodePhase::Done,
                    depth,
                    address = %address,
                    error = %e,
                    "Error visiting node"
                );
                Entry::Leaf
            }
        }
    }

    /// Loads the node, saves its record, and prepares its shuffled candidates
    ///
    /// Only a failed load is an error; extraction and discovery degrade in place.
    async fn process_node(&mut self, address: &Address, depth: u32) -> Result<Branch, PortError> {
        let port = self.port;
        let settings = self.settings;

        tracing::info!(phase = %NodePhase::Loading, depth, address = %address, "Visiting");
        let document = port.load(address, settings.page_load_timeout).await?;

        match extract_record(port, &document, settings).await {
            Ok(record) => {
                let canonical = record.address.clone();
                if self.state.save_record(record) {
                    tracing::info!(
                        phase = %NodePhase::Extracting,
                        depth,
                        address = %address,
                        canonical = %canonical,
                        records = self.state.record_count(),
                        "Saved"
                    );
                } else {
                    tracing::info!(
                        phase = %NodePhase::Extracting,
                        depth,
                        address = %address,
                        canonical = %canonical,
                        "Visited but not saved (duplicate)"
                    );
                }
            }
            Err(e) => {
                self.stats.extractions_degraded += 1;
                tracing::warn!(
                    phase = %NodePhase::Extracting,
                    depth,
                    address = %address,
                    error = %e,
                    "Visited but not saved (no record)"
                );
            }
        }

        let mut candidates = match discover_links(port, &document, settings).await {
            Ok(links) => links,
            Err(e) => {
                self.stats.discoveries_degraded += 1;
                tracing::warn!(
                    phase = %NodePhase::LinkDiscovery,
                    depth,
                    address = %address,
                    error = %e,
                    "Link discovery degraded, node has no children"
                );
                Vec::new()
            }
        };
        candidates.shuffle(&mut self.rng);

        tracing::debug!(
            phase = %NodePhase::LinkDiscovery,
            depth,
            address = %address,
            candidates = candidates.len(),
            "Discovered links"
        );

        Ok(Branch::new(address.clone(), depth, candidates))
    }
}
