//! Scenario tests for the crawl engine
//!
//! These tests drive the engine against an in-memory scripted site on a paused tokio
//! clock, so every budget is exercised deterministically.

use std::collections::HashSet;
use std::time::Duration;
use trawl::config::{OutputConfig, RecordCapPolicy};
use trawl::crawler::{CrawlEngine, CrawlOutcome, CrawlSettings, RetryPolicy, ScriptedPage, ScriptedSite};
use trawl::output::{persist, RunOutcome};
use trawl::Address;

const SEED: &str = "https://jobs.example.com/offers";

fn addr(path: &str) -> Address {
    Address::from(format!("https://jobs.example.com{}", path))
}

/// Settings with no settle delay and immediate retries
fn test_settings() -> CrawlSettings {
    CrawlSettings {
        seed: Address::from(SEED),
        max_records: 150,
        page_load_timeout: Duration::from_secs(60),
        timeout_total: Duration::from_secs(600),
        timeout_deeper: Duration::from_secs(45),
        settle_delay: Duration::ZERO,
        record_cap_policy: RecordCapPolicy::RootGate,
        workers: 1,
        shuffle_seed: Some(42),
        retry: RetryPolicy::immediate(3),
        link_selector: "a[href*='/job-offer/']".to_string(),
        title_selector: "h1".to_string(),
    }
}

async fn run(settings: CrawlSettings, site: &ScriptedSite) -> CrawlOutcome {
    CrawlEngine::new(settings, site.clone()).run().await
}

fn assert_unique_records(outcome: &CrawlOutcome) {
    let addresses: HashSet<_> = outcome
        .state
        .records()
        .iter()
        .map(|r| r.address.clone())
        .collect();
    assert_eq!(addresses.len(), outcome.state.records().len());
}

#[tokio::test(start_paused = true)]
async fn test_scenario_a_three_distinct_records() {
    let site = ScriptedSite::new()
        .page(
            SEED,
            ScriptedPage::new().links([addr("/job-offer/1"), addr("/job-offer/2"), addr("/job-offer/3")]),
        )
        .page(addr("/job-offer/1"), ScriptedPage::new().title("QA Engineer"))
        .page(addr("/job-offer/2"), ScriptedPage::new().title("Test Automation"))
        .page(addr("/job-offer/3"), ScriptedPage::new().title("Manual Tester"));

    let outcome = run(test_settings(), &site).await;

    assert_eq!(outcome.report.outcome, RunOutcome::Completed);
    assert_eq!(outcome.state.records().len(), 3);
    assert!(outcome.state.visited_count() >= 3);
    assert_unique_records(&outcome);

    let dir = tempfile::tempdir().unwrap();
    let output = OutputConfig {
        csv_path: dir.path().join("JobResults.csv").display().to_string(),
        database_path: None,
        log_dir: None,
    };
    persist(&output, outcome.state.records(), &outcome.report).unwrap();

    let csv = std::fs::read_to_string(&output.csv_path).unwrap();
    let lines: Vec<_> = csv.lines().collect();
    assert_eq!(lines.len(), 4);
    assert_eq!(lines[0], "title,url");
    assert_eq!(lines[1], "QA Engineer,https://jobs.example.com/job-offer/1");
}

#[tokio::test(start_paused = true)]
async fn test_scenario_b_address_reached_twice_is_saved_once() {
    let shared = addr("/job-offer/shared");
    let site = ScriptedSite::new()
        .page(SEED, ScriptedPage::new().links([addr("/job-offer/a"), addr("/job-offer/b")]))
        .page(addr("/job-offer/a"), ScriptedPage::new().title("A").links([shared.clone()]))
        .page(addr("/job-offer/b"), ScriptedPage::new().title("B").links([shared.clone()]))
        .page(shared.clone(), ScriptedPage::new().title("Shared"));

    let outcome = run(test_settings(), &site).await;

    let shared_records = outcome
        .state
        .records()
        .iter()
        .filter(|r| r.address == shared)
        .count();
    assert_eq!(shared_records, 1);
    assert_eq!(site.load_count(&shared), 1);
    assert_eq!(outcome.state.records().len(), 3);
}

#[tokio::test(start_paused = true)]
async fn test_scenario_b_canonical_duplicates_are_saved_once() {
    let canonical = addr("/job-offer/42");
    let site = ScriptedSite::new()
        .page(
            SEED,
            ScriptedPage::new().links([addr("/job-offer/42?ref=list"), addr("/job-offer/42?ref=map")]),
        )
        .page(
            addr("/job-offer/42?ref=list"),
            ScriptedPage::new().title("Tester").canonical(canonical.clone()),
        )
        .page(
            addr("/job-offer/42?ref=map"),
            ScriptedPage::new().title("Tester").canonical(canonical.clone()),
        );

    let outcome = run(test_settings(), &site).await;

    // Both addresses are explored, only one record is kept
    assert_eq!(site.loads().len(), 3);
    assert_eq!(outcome.state.visited_count(), 2);
    assert_eq!(outcome.state.records().len(), 1);
    assert_eq!(outcome.state.records()[0].address, canonical);
}

#[tokio::test(start_paused = true)]
async fn test_scenario_c_zero_total_budget_ends_immediately() {
    let site = ScriptedSite::new()
        .page(
            SEED,
            ScriptedPage::new()
                .links([addr("/job-offer/1"), addr("/job-offer/2")])
                .load_delay(Duration::from_millis(10)),
        )
        .page(addr("/job-offer/1"), ScriptedPage::new().title("One"))
        .page(addr("/job-offer/2"), ScriptedPage::new().title("Two"));
    let mut settings = test_settings();
    settings.timeout_total = Duration::ZERO;

    let outcome = run(settings, &site).await;

    assert_eq!(outcome.report.outcome, RunOutcome::DeadlineExceeded);
    assert_eq!(site.loads(), vec![Address::from(SEED)]);
    assert!(outcome.state.records().is_empty());
    assert_eq!(site.sessions_closed(), 1);

    let dir = tempfile::tempdir().unwrap();
    let output = OutputConfig {
        csv_path: dir.path().join("JobResults.csv").display().to_string(),
        database_path: None,
        log_dir: None,
    };
    persist(&output, outcome.state.records(), &outcome.report).unwrap();
    assert_eq!(std::fs::read_to_string(&output.csv_path).unwrap(), "title,url\n");
}

#[tokio::test(start_paused = true)]
async fn test_scenario_d_failing_discovery_only_prunes_its_node() {
    let site = ScriptedSite::new()
        .page(SEED, ScriptedPage::new().links([addr("/job-offer/a"), addr("/job-offer/b")]))
        .page(
            addr("/job-offer/a"),
            ScriptedPage::new()
                .title("A")
                .links([addr("/job-offer/hidden")])
                .failing_links(3),
        )
        .page(addr("/job-offer/b"), ScriptedPage::new().title("B").links([addr("/job-offer/c")]))
        .page(addr("/job-offer/c"), ScriptedPage::new().title("C"))
        .page(addr("/job-offer/hidden"), ScriptedPage::new().title("Hidden"));

    let outcome = run(test_settings(), &site).await;

    assert_eq!(site.link_attempts(&addr("/job-offer/a")), 3);
    assert_eq!(site.load_count(&addr("/job-offer/hidden")), 0);
    assert_eq!(outcome.report.nodes.discoveries_degraded, 1);

    let titles: Vec<_> = outcome.state.records().iter().map(|r| r.title.as_str()).collect();
    assert_eq!(titles, vec!["A", "B", "C"]);
}

#[tokio::test(start_paused = true)]
async fn test_scenario_e_cap_is_checked_only_at_the_root() {
    let roots: Vec<_> = (1..=5).map(|i| addr(&format!("/job-offer/{}", i))).collect();
    let mut site = ScriptedSite::new()
        .page(SEED, ScriptedPage::new().links(roots.clone()))
        .page(
            roots[0].clone(),
            ScriptedPage::new()
                .title("Root 1")
                .links([addr("/job-offer/1a"), addr("/job-offer/1b")]),
        )
        .page(addr("/job-offer/1a"), ScriptedPage::new().title("1a"))
        .page(addr("/job-offer/1b"), ScriptedPage::new().title("1b"));
    for root in &roots[1..] {
        site = site.page(root.clone(), ScriptedPage::new().title("Other root"));
    }
    let mut settings = test_settings();
    settings.max_records = 1;

    let outcome = run(settings, &site).await;

    // The first branch finishes naturally and overshoots the cap
    assert_eq!(outcome.state.records().len(), 3);
    assert_unique_records(&outcome);
    assert_eq!(outcome.report.outcome, RunOutcome::RecordCapReached);
    assert_eq!(outcome.report.frontier_remaining, 4);
    for root in &roots[1..] {
        assert_eq!(site.load_count(root), 0);
    }
}

#[tokio::test(start_paused = true)]
async fn test_preempt_policy_stops_inflight_branch() {
    let site = ScriptedSite::new()
        .page(SEED, ScriptedPage::new().links([addr("/job-offer/1"), addr("/job-offer/2")]))
        .page(
            addr("/job-offer/1"),
            ScriptedPage::new()
                .title("Root 1")
                .links([addr("/job-offer/1a"), addr("/job-offer/1b")]),
        )
        .page(addr("/job-offer/1a"), ScriptedPage::new().title("1a"))
        .page(addr("/job-offer/1b"), ScriptedPage::new().title("1b"))
        .page(addr("/job-offer/2"), ScriptedPage::new().title("Root 2"));
    let mut settings = test_settings();
    settings.max_records = 1;
    settings.record_cap_policy = RecordCapPolicy::Preempt;

    let outcome = run(settings, &site).await;

    assert_eq!(outcome.state.records().len(), 1);
    assert_eq!(outcome.report.outcome, RunOutcome::RecordCapReached);
    assert_eq!(site.load_count(&addr("/job-offer/1a")), 0);
    assert_eq!(site.load_count(&addr("/job-offer/2")), 0);
}

#[tokio::test(start_paused = true)]
async fn test_branch_budget_drops_remaining_candidates() {
    let children = [addr("/job-offer/c1"), addr("/job-offer/c2"), addr("/job-offer/c3")];
    let mut site = ScriptedSite::new()
        .page(SEED, ScriptedPage::new().links([addr("/job-offer/p")]))
        .page(addr("/job-offer/p"), ScriptedPage::new().title("Parent").links(children.clone()));
    for (i, child) in children.iter().enumerate() {
        site = site.page(
            child.clone(),
            ScriptedPage::new()
                .title(format!("Child {}", i))
                .load_delay(Duration::from_secs(30)),
        );
    }

    let outcome = run(test_settings(), &site).await;

    // 30s after the first child, 60s after the second: the third is dropped
    let loaded = children.iter().filter(|c| site.load_count(c) == 1).count();
    assert_eq!(loaded, 2);
    assert_eq!(outcome.report.nodes.branch_timeouts, 1);
    assert_eq!(outcome.state.records().len(), 3);
}

#[tokio::test(start_paused = true)]
async fn test_branch_budget_is_rearmed_per_node() {
    let site = ScriptedSite::new()
        .page(SEED, ScriptedPage::new().links([addr("/job-offer/p")]))
        .page(addr("/job-offer/p"), ScriptedPage::new().title("Parent").links([addr("/job-offer/c")]))
        .page(
            addr("/job-offer/c"),
            ScriptedPage::new()
                .title("Child")
                .links([addr("/job-offer/g1"), addr("/job-offer/g2")])
                .load_delay(Duration::from_secs(40)),
        )
        .page(
            addr("/job-offer/g1"),
            ScriptedPage::new().title("G1").load_delay(Duration::from_secs(30)),
        )
        .page(
            addr("/job-offer/g2"),
            ScriptedPage::new().title("G2").load_delay(Duration::from_secs(30)),
        );

    let outcome = run(test_settings(), &site).await;

    // The parent's budget is long spent when g2 starts, the child's is not
    assert_eq!(site.load_count(&addr("/job-offer/g1")), 1);
    assert_eq!(site.load_count(&addr("/job-offer/g2")), 1);
    assert_eq!(outcome.report.nodes.branch_timeouts, 0);
    assert_eq!(outcome.report.nodes.max_depth, 2);
}

#[tokio::test(start_paused = true)]
async fn test_no_load_starts_after_global_deadline() {
    let site = ScriptedSite::new()
        .page(
            SEED,
            ScriptedPage::new().links([addr("/job-offer/a"), addr("/job-offer/b"), addr("/job-offer/c")]),
        )
        .page(addr("/job-offer/a"), ScriptedPage::new().load_delay(Duration::from_secs(40)))
        .page(addr("/job-offer/b"), ScriptedPage::new().load_delay(Duration::from_secs(40)))
        .page(addr("/job-offer/c"), ScriptedPage::new().title("Too late"));
    let mut settings = test_settings();
    settings.timeout_total = Duration::from_secs(60);

    let start = tokio::time::Instant::now();
    let outcome = run(settings, &site).await;

    assert_eq!(outcome.report.outcome, RunOutcome::DeadlineExceeded);
    assert_eq!(site.load_count(&addr("/job-offer/c")), 0);
    assert!(site
        .load_times()
        .iter()
        .all(|at| at.duration_since(start) <= Duration::from_secs(60)));
    assert_eq!(site.sessions_closed(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_global_deadline_unwinds_deep_branch() {
    let site = ScriptedSite::new()
        .page(SEED, ScriptedPage::new().links([addr("/job-offer/r"), addr("/job-offer/r2")]))
        .page(addr("/job-offer/r"), ScriptedPage::new().links([addr("/job-offer/d1")]))
        .page(
            addr("/job-offer/d1"),
            ScriptedPage::new()
                .links([addr("/job-offer/d2")])
                .load_delay(Duration::from_secs(35)),
        )
        .page(
            addr("/job-offer/d2"),
            ScriptedPage::new()
                .links([addr("/job-offer/s1"), addr("/job-offer/s2")])
                .load_delay(Duration::from_secs(35)),
        )
        .page(addr("/job-offer/s1"), ScriptedPage::new().title("S1"))
        .page(addr("/job-offer/s2"), ScriptedPage::new().title("S2"))
        .page(addr("/job-offer/r2"), ScriptedPage::new().title("R2"));
    let mut settings = test_settings();
    settings.timeout_total = Duration::from_secs(60);

    let outcome = run(settings, &site).await;

    // The deadline fires at depth 3 while every ancestor still sits on the stack
    assert_eq!(outcome.report.outcome, RunOutcome::DeadlineExceeded);
    assert_eq!(
        site.loads(),
        vec![
            Address::from(SEED),
            addr("/job-offer/r"),
            addr("/job-offer/d1"),
            addr("/job-offer/d2"),
        ]
    );
    assert_eq!(site.load_count(&addr("/job-offer/s1")), 0);
    assert_eq!(site.load_count(&addr("/job-offer/s2")), 0);
    assert_eq!(site.load_count(&addr("/job-offer/r2")), 0);
    assert!(outcome.state.records().is_empty());
    assert_eq!(site.sessions_closed(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_saved_record_rearms_global_deadline() {
    let site = ScriptedSite::new()
        .page(
            SEED,
            ScriptedPage::new().links([addr("/job-offer/a"), addr("/job-offer/b"), addr("/job-offer/c")]),
        )
        .page(addr("/job-offer/a"), ScriptedPage::new().load_delay(Duration::from_secs(40)))
        .page(
            addr("/job-offer/b"),
            ScriptedPage::new().title("B").load_delay(Duration::from_secs(40)),
        )
        .page(addr("/job-offer/c"), ScriptedPage::new().title("C"));
    let mut settings = test_settings();
    settings.timeout_total = Duration::from_secs(60);

    let outcome = run(settings, &site).await;

    assert_eq!(outcome.report.outcome, RunOutcome::Completed);
    assert_eq!(site.load_count(&addr("/job-offer/c")), 1);
    assert_eq!(outcome.state.records().len(), 2);
}

#[tokio::test(start_paused = true)]
async fn test_transient_title_failures_are_retried() {
    let site = ScriptedSite::new()
        .page(SEED, ScriptedPage::new().links([addr("/job-offer/flaky"), addr("/job-offer/broken")]))
        .page(addr("/job-offer/flaky"), ScriptedPage::new().title("Flaky").failing_title(2))
        .page(
            addr("/job-offer/broken"),
            ScriptedPage::new()
                .failing_title(3)
                .title("Never read")
                .links([addr("/job-offer/child")]),
        )
        .page(addr("/job-offer/child"), ScriptedPage::new().title("Child"));

    let outcome = run(test_settings(), &site).await;

    assert_eq!(site.title_attempts(&addr("/job-offer/flaky")), 3);
    assert_eq!(site.title_attempts(&addr("/job-offer/broken")), 3);
    assert_eq!(outcome.report.nodes.extractions_degraded, 1);

    // A node without a record still contributes its children
    let titles: Vec<_> = outcome.state.records().iter().map(|r| r.title.as_str()).collect();
    assert_eq!(titles, vec!["Flaky", "Child"]);
}

#[tokio::test(start_paused = true)]
async fn test_missing_title_is_not_retried() {
    let site = ScriptedSite::new()
        .page(SEED, ScriptedPage::new().links([addr("/job-offer/list")]))
        .page(
            addr("/job-offer/list"),
            ScriptedPage::new().links([addr("/job-offer/1")]),
        )
        .page(addr("/job-offer/1"), ScriptedPage::new().title("Only Offer"));
    let mut settings = test_settings();
    settings.retry = RetryPolicy {
        max_attempts: 3,
        multiplier: Duration::from_secs(1),
        wait_min: Duration::from_secs(2),
        wait_max: Duration::from_secs(10),
    };

    let start = tokio::time::Instant::now();
    let outcome = run(settings, &site).await;

    assert_eq!(site.title_attempts(&addr("/job-offer/list")), 1);
    assert_eq!(outcome.report.nodes.extractions_degraded, 1);
    assert_eq!(outcome.state.records().len(), 1);
    // No backoff sleep was spent on the page without a title
    assert_eq!(start.elapsed(), Duration::ZERO);
}

#[tokio::test(start_paused = true)]
async fn test_readiness_timeout_is_tolerated() {
    let site = ScriptedSite::new()
        .page(SEED, ScriptedPage::new().links([addr("/job-offer/slow")]))
        .page(addr("/job-offer/slow"), ScriptedPage::new().title("Slow").ready_timeout());

    let outcome = run(test_settings(), &site).await;

    assert_eq!(outcome.state.records().len(), 1);
    assert_eq!(outcome.report.nodes.extractions_degraded, 0);
}

#[tokio::test(start_paused = true)]
async fn test_failed_node_load_is_isolated() {
    let site = ScriptedSite::new()
        .page(
            SEED,
            ScriptedPage::new().links([addr("/job-offer/gone"), addr("/job-offer/missing"), addr("/job-offer/ok")]),
        )
        .page(addr("/job-offer/gone"), ScriptedPage::new().failing_load())
        .page(addr("/job-offer/ok"), ScriptedPage::new().title("OK"));

    let outcome = run(test_settings(), &site).await;

    assert_eq!(outcome.report.outcome, RunOutcome::Completed);
    assert_eq!(outcome.report.nodes.nodes_failed, 2);
    assert_eq!(outcome.state.records().len(), 1);
    assert_eq!(outcome.state.visited_count(), 3);
}

#[tokio::test(start_paused = true)]
async fn test_node_load_timeout_fails_only_that_node() {
    let site = ScriptedSite::new()
        .page(
            SEED,
            ScriptedPage::new().links([addr("/job-offer/stuck"), addr("/job-offer/ok")]),
        )
        .page(
            addr("/job-offer/stuck"),
            ScriptedPage::new()
                .title("Stuck")
                .links([addr("/job-offer/behind")])
                .load_delay(Duration::from_secs(90)),
        )
        .page(addr("/job-offer/behind"), ScriptedPage::new().title("Behind"))
        .page(addr("/job-offer/ok"), ScriptedPage::new().title("OK"));

    let outcome = run(test_settings(), &site).await;

    assert_eq!(outcome.report.outcome, RunOutcome::Completed);
    assert_eq!(outcome.report.nodes.nodes_failed, 1);
    assert_eq!(site.title_attempts(&addr("/job-offer/stuck")), 0);
    assert_eq!(site.load_count(&addr("/job-offer/behind")), 0);

    let titles: Vec<_> = outcome.state.records().iter().map(|r| r.title.as_str()).collect();
    assert_eq!(titles, vec!["OK"]);
}

#[tokio::test(start_paused = true)]
async fn test_dense_graph_explores_each_address_once() {
    let pages: Vec<_> = (0..6).map(|i| addr(&format!("/job-offer/{}", i))).collect();
    let mut site = ScriptedSite::new().page(SEED, ScriptedPage::new().links(pages.clone()));
    for (i, page) in pages.iter().enumerate() {
        site = site.page(
            page.clone(),
            ScriptedPage::new().title(format!("Job {}", i)).links(pages.clone()),
        );
    }

    let outcome = run(test_settings(), &site).await;

    for page in &pages {
        assert_eq!(site.load_count(page), 1);
    }
    assert_eq!(outcome.state.records().len(), 6);
    assert_unique_records(&outcome);
}

#[tokio::test(start_paused = true)]
async fn test_same_shuffle_seed_reproduces_order() {
    let pages: Vec<_> = (0..8).map(|i| addr(&format!("/job-offer/{}", i))).collect();
    let build = || {
        let mut site = ScriptedSite::new()
            .page(SEED, ScriptedPage::new().links([addr("/job-offer/hub")]))
            .page(addr("/job-offer/hub"), ScriptedPage::new().title("Hub").links(pages.clone()));
        for page in &pages {
            site = site.page(page.clone(), ScriptedPage::new().title(page.as_str()));
        }
        site
    };

    let first = build();
    let second = build();
    run(test_settings(), &first).await;
    run(test_settings(), &second).await;

    assert_eq!(first.loads(), second.loads());
}

#[tokio::test(start_paused = true)]
async fn test_worker_pool_shares_state() {
    let roots: Vec<_> = (0..8).map(|i| addr(&format!("/job-offer/{}", i))).collect();
    let mut site = ScriptedSite::new().page(SEED, ScriptedPage::new().links(roots.clone()));
    for (i, root) in roots.iter().enumerate() {
        let next = roots[(i + 1) % roots.len()].clone();
        site = site.page(
            root.clone(),
            ScriptedPage::new()
                .title(format!("Job {}", i))
                .links([next])
                .load_delay(Duration::from_secs(1)),
        );
    }
    let mut settings = test_settings();
    settings.workers = 4;

    let outcome = run(settings, &site).await;

    assert_eq!(outcome.report.outcome, RunOutcome::Completed);
    assert_eq!(outcome.state.records().len(), 8);
    assert_unique_records(&outcome);
    for root in &roots {
        assert_eq!(site.load_count(root), 1);
    }
    assert_eq!(site.sessions_opened(), 4);
    assert_eq!(site.sessions_closed(), 4);
}

#[tokio::test(start_paused = true)]
async fn test_session_closed_once_on_every_path() {
    let ok = ScriptedSite::new().page(SEED, ScriptedPage::new());
    run(test_settings(), &ok).await;
    assert_eq!(ok.sessions_closed(), 1);

    let broken_seed = ScriptedSite::new().page(SEED, ScriptedPage::new().failing_load());
    let outcome = run(test_settings(), &broken_seed).await;
    assert_eq!(outcome.report.outcome, RunOutcome::Aborted);
    assert_eq!(broken_seed.sessions_closed(), 1);
}
