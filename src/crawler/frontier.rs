//! Frontier management for the crawl
//!
//! Two structures hold pending work:
//! - `RootFrontier`: FIFO of the seed page's links, consumed breadth-first
//! - `WorkStack`: LIFO of `Branch` frames replacing native recursion below the root
//!
//! A `Branch` is one explored node together with its shuffled, not yet explored
//! candidates and the instant its own branch budget started.

use crate::state::Address;
use std::collections::VecDeque;
use std::time::Duration;
use tokio::time::Instant;

/// Root-level queue of addresses discovered on the seed page
///
/// Addresses are kept verbatim, duplicates included; the visited set filters them
/// when they are popped.
#[derive(Debug, Clone, Default)]
pub struct RootFrontier {
    queue: VecDeque<Address>,
}

impl RootFrontier {
    pub fn new(links: Vec<Address>) -> Self {
        Self {
            queue: VecDeque::from(links),
        }
    }

    /// Pops the next root address in discovery order
    pub fn pop(&mut self) -> Option<Address> {
        self.queue.pop_front()
    }

    pub fn len(&self) -> usize {
        self.queue.len()
    }

    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }
}

/// One explored node whose candidates are still being walked
#[derive(Debug, Clone)]
pub struct Branch {
    /// Address the node was navigated to
    pub address: Address,

    /// Distance from the root frontier (root links are depth 0)
    pub depth: u32,

    /// Remaining candidates in shuffled order
    candidates: VecDeque<Address>,

    /// When this node started walking its candidates
    deeper_start: Instant,
}

impl Branch {
    /// Creates a branch whose budget starts now
    pub fn new(address: Address, depth: u32, candidates: Vec<Address>) -> Self {
        Self {
            address,
            depth,
            candidates: VecDeque::from(candidates),
            deeper_start: Instant::now(),
        }
    }

    pub fn next_candidate(&mut self) -> Option<Address> {
        self.candidates.pop_front()
    }

    pub fn remaining(&self) -> usize {
        self.candidates.len()
    }

    pub fn is_exhausted(&self) -> bool {
        self.candidates.is_empty()
    }

    /// Time spent since this branch started walking its candidates
    pub fn deeper_elapsed(&self) -> Duration {
        self.deeper_start.elapsed()
    }

    /// True once the branch has spent more than `budget` on its candidates
    pub fn is_expired(&self, budget: Duration) -> bool {
        self.deeper_elapsed() > budget
    }
}

/// Explicit LIFO of branches; the top frame is the deepest node being walked
#[derive(Debug, Default)]
pub struct WorkStack {
    frames: Vec<Branch>,
}

impl WorkStack {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, branch: Branch) {
        self.frames.push(branch);
    }

    pub fn top_mut(&mut self) -> Option<&mut Branch> {
        self.frames.last_mut()
    }

    pub fn pop(&mut self) -> Option<Branch> {
        self.frames.pop()
    }

    pub fn len(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    /// Drops every pending frame, returning how many candidates were abandoned
    pub fn drain(&mut self) -> usize {
        self.frames.drain(..).map(|branch| branch.remaining()).sum()
    }
}
