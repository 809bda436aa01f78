//! Crawl engine - run orchestration
//!
//! A run has three stages:
//! 1. Root phase: load the seed once and fill the root frontier from its links
//! 2. Root loop: pop root addresses while the record cap allows and explore each one
//! 3. Finalization: close the session(s) and classify the outcome
//!
//! With `workers > 1` the root loop is shared by a pool of workers, each with its own
//! session, pulling from one mutex-guarded frontier and crawl state.

use crate::config::{validate, Config};
use crate::crawler::explorer::{Exploration, Explorer, NodeStats};
use crate::crawler::extract::discover_links;
use crate::crawler::fetcher::HttpSessionFactory;
use crate::crawler::frontier::RootFrontier;
use crate::crawler::port::{FetchPort, PortError, SessionFactory};
use crate::crawler::CrawlSettings;
use crate::output::{self, RunOutcome, RunReport};
use crate::state::{Address, CrawlState, NodePhase, SharedCrawlState, StateAccess};
use chrono::Utc;
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::sync::{Arc, Mutex, PoisonError};
use tokio::task::JoinSet;
use tokio::time::Instant;

/// Final state and report of a run
#[derive(Debug)]
pub struct CrawlOutcome {
    pub state: CrawlState,
    pub report: RunReport,
}

/// Drives one crawl run against sessions from `F`
pub struct CrawlEngine<F: SessionFactory> {
    settings: Arc<CrawlSettings>,
    factory: Arc<F>,
}

/// What the root loop left behind
struct LoopResult {
    state: CrawlState,
    nodes: NodeStats,
    frontier_remaining: usize,
}

impl<F: SessionFactory + 'static> CrawlEngine<F> {
    pub fn new(settings: CrawlSettings, factory: F) -> Self {
        Self {
            settings: Arc::new(settings),
            factory: Arc::new(factory),
        }
    }

    pub fn settings(&self) -> &CrawlSettings {
        &self.settings
    }

    /// Runs the crawl to completion
    ///
    /// Never fails: critical errors end the run early with `RunOutcome::Aborted` and
    /// whatever was collected so far.
    pub async fn run(&self) -> CrawlOutcome {
        let started_at = Utc::now();
        let clock = Instant::now();
        let state = CrawlState::new();
        let mut nodes = NodeStats::default();

        tracing::info!(
            seed = %self.settings.seed,
            max_records = self.settings.max_records,
            workers = self.settings.workers,
            "Starting crawl"
        );

        let session = match self.factory.open().await {
            Ok(session) => session,
            Err(e) => {
                tracing::error!(error = %e, "Critical error opening session");
                return self.finish(state, nodes, 0, Some(RunOutcome::Aborted), started_at, clock);
            }
        };

        let frontier = match self.root_phase(&session, &mut nodes).await {
            Ok(frontier) => frontier,
            Err(e) => {
                tracing::error!(
                    phase = %NodePhase::Loading,
                    address = %self.settings.seed,
                    error = %e,
                    "Critical error during root exploration"
                );
                session.close().await;
                return self.finish(
                    state,
                    nodes,
                    0,
                    Some(RunOutcome::Aborted),
                    started_at,
                    clock,
                );
            }
        };

        let result = if self.settings.workers <= 1 {
            self.run_serial(session, frontier, state).await
        } else {
            self.run_pool(session, frontier, state).await
        };
        nodes += result.nodes;

        self.finish(
            result.state,
            nodes,
            result.frontier_remaining,
            None,
            started_at,
            clock,
        )
    }

    /// Loads the seed and collects its links verbatim into the root frontier
    ///
    /// A failed load is critical. Failed link discovery degrades to an empty frontier.
    async fn root_phase<P: FetchPort>(
        &self,
        port: &P,
        nodes: &mut NodeStats,
    ) -> Result<RootFrontier, PortError> {
        let settings = &*self.settings;
        tracing::info!(
            phase = %NodePhase::Loading,
            address = %settings.seed,
            "Starting root exploration"
        );

        let document = port.load(&settings.seed, settings.page_load_timeout).await?;

        let links = match discover_links(port, &document, settings).await {
            Ok(links) => links,
            Err(e) => {
                nodes.discoveries_degraded += 1;
                tracing::warn!(
                    phase = %NodePhase::LinkDiscovery,
                    address = %settings.seed,
                    error = %e,
                    "Root link discovery degraded, frontier is empty"
                );
                Vec::new()
            }
        };

        tracing::info!(
            phase = %NodePhase::LinkDiscovery,
            address = %settings.seed,
            links = links.len(),
            "Root frontier seeded"
        );

        Ok(RootFrontier::new(links))
    }

    async fn run_serial(
        &self,
        session: F::Session,
        mut frontier: RootFrontier,
        mut state: CrawlState,
    ) -> LoopResult {
        let nodes = {
            let mut explorer =
                Explorer::new(&session, &self.settings, &mut state, self.rng_for(0));
            drive_roots(&mut explorer, self.settings.max_records, || frontier.pop()).await;
            explorer.stats()
        };

        session.close().await;

        LoopResult {
            state,
            nodes,
            frontier_remaining: frontier.len(),
        }
    }

    /// Root loop shared by `workers` sessions; the primary session becomes worker 0
    async fn run_pool(
        &self,
        primary: F::Session,
        frontier: RootFrontier,
        state: CrawlState,
    ) -> LoopResult {
        let state = SharedCrawlState::new(state);
        let frontier = Arc::new(Mutex::new(frontier));

        let mut sessions = vec![primary];
        for index in 1..self.settings.workers {
            match self.factory.open().await {
                Ok(session) => sessions.push(session),
                Err(e) => {
                    tracing::warn!(
                        worker = index,
                        error = %e,
                        "Could not open worker session, continuing with fewer workers"
                    );
                }
            }
        }

        tracing::info!(workers = sessions.len(), "Starting worker pool");

        let mut tasks = JoinSet::new();
        for (index, session) in sessions.into_iter().enumerate() {
            tasks.spawn(run_worker(
                index,
                session,
                Arc::clone(&self.settings),
                Arc::clone(&frontier),
                state.clone(),
                self.rng_for(index),
            ));
        }

        let mut nodes = NodeStats::default();
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok(stats) => nodes += stats,
                Err(e) => tracing::error!(error = %e, "Worker task failed"),
            }
        }

        let frontier_remaining = frontier
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len();

        LoopResult {
            state: state.into_inner(),
            nodes,
            frontier_remaining,
        }
    }

    /// Shuffle source for one session; seeded runs are reproducible per worker
    fn rng_for(&self, index: usize) -> StdRng {
        match self.settings.shuffle_seed {
            Some(seed) => StdRng::seed_from_u64(seed.wrapping_add(index as u64)),
            None => StdRng::from_entropy(),
        }
    }

    fn finish(
        &self,
        state: CrawlState,
        nodes: NodeStats,
        frontier_remaining: usize,
        forced: Option<RunOutcome>,
        started_at: chrono::DateTime<Utc>,
        clock: Instant,
    ) -> CrawlOutcome {
        let outcome = forced.unwrap_or_else(|| {
            if state.is_aborted() {
                RunOutcome::DeadlineExceeded
            } else if state.record_count() >= self.settings.max_records {
                RunOutcome::RecordCapReached
            } else {
                RunOutcome::Completed
            }
        });

        let report = RunReport {
            outcome,
            started_at,
            finished_at: Utc::now(),
            duration: clock.elapsed(),
            records: state.record_count(),
            visited: state.visited_count(),
            frontier_remaining,
            nodes,
        };

        tracing::info!(
            outcome = outcome.as_str(),
            records = report.records,
            visited = report.visited,
            frontier_remaining,
            duration_secs = report.duration.as_secs_f64(),
            "Crawl finished"
        );

        CrawlOutcome { state, report }
    }
}

/// Pops root addresses until the frontier is empty, the cap is reached or the run stops
async fn drive_roots<P, S, N>(explorer: &mut Explorer<'_, P, S>, max_records: usize, mut next: N)
where
    P: FetchPort,
    S: StateAccess,
    N: FnMut() -> Option<Address>,
{
    loop {
        if explorer.state().is_aborted() {
            break;
        }

        let count = explorer.state().record_count();
        if count >= max_records {
            tracing::info!(records = count, max_records, "Record cap reached, stopping root loop");
            break;
        }

        let Some(address) = next() else {
            tracing::info!("Root frontier is empty");
            break;
        };

        if !explorer.state_mut().mark_visited(&address) {
            tracing::debug!(address = %address, "Skipping visited root address");
            continue;
        }

        if explorer.explore(address).await == Exploration::DeadlineExceeded {
            break;
        }
    }
}

async fn run_worker<P: FetchPort + 'static>(
    index: usize,
    session: P,
    settings: Arc<CrawlSettings>,
    frontier: Arc<Mutex<RootFrontier>>,
    mut state: SharedCrawlState,
    rng: StdRng,
) -> NodeStats {
    tracing::debug!(worker = index, "Worker started");

    let stats = {
        let mut explorer = Explorer::new(&session, &settings, &mut state, rng);
        drive_roots(&mut explorer, settings.max_records, || {
            frontier
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .pop()
        })
        .await;
        explorer.stats()
    };

    session.close().await;
    tracing::debug!(worker = index, nodes = stats.nodes_explored, "Worker finished");
    stats
}

/// Runs a complete crawl over HTTP and persists the results
///
/// This is the main entry point used by the binary. The configuration is validated
/// first; an invalid one is rejected before any session opens. Output is written on
/// every exit path of the crawl itself, including deadline and critical aborts.
pub async fn run_crawl(config: Config) -> crate::Result<RunReport> {
    validate(&config)?;

    let settings = CrawlSettings::from_config(&config);
    let factory = HttpSessionFactory::new(config.user_agent.clone());
    let engine = CrawlEngine::new(settings, factory);

    let CrawlOutcome { state, report } = engine.run().await;
    output::persist(&config.output, state.records(), &report)?;

    Ok(report)
}
