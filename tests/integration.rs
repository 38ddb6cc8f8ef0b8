//! Integration tests for the Zentinel Crawl Analytics Agent.
//!
//! These tests exercise the public API end to end: configuration parsing,
//! classification, session windowing, crawl budget rules, the artifact
//! cache, warmup jobs, rate tracking and the agent request path.

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use std::io::Write;
use std::net::IpAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::Semaphore;
use zentinel_agent_crawl_analytics::analytics::{citation_rate, CitationBand};
use zentinel_agent_crawl_analytics::budget::{BudgetPeriod, CrawlBudgetAnalyzer, Severity};
use zentinel_agent_crawl_analytics::cache::ArtifactCache;
use zentinel_agent_crawl_analytics::config::{BotConfig, CacheConfig, CustomBotPattern, RateLimitConfig};
use zentinel_agent_crawl_analytics::sessions::{split_sessions, SessionAggregator, SessionMetric};
use zentinel_agent_crawl_analytics::visits::{CacheStatus, TrafficType};
use zentinel_agent_crawl_analytics::warmup::{ContentItem, MemoryContentSource, WarmupState};
use zentinel_agent_crawl_analytics::{
    BotClassifier, BotRequest, BotVisit, CrawlAnalyticsAgent, CrawlAnalyticsConfig, CrawlError,
    CrawlResult, Decision, ManualClock, MemoryVisitStore, Priority, Renderer, RequestOutcome,
    StartOutcome, VisitFilters, VisitStore, WarmupOrchestrator,
};

const GPTBOT_UA: &str = "Mozilla/5.0 AppleWebKit/537.36 (KHTML, like Gecko; compatible; GPTBot/1.2; +https://openai.com/gptbot)";
const CLAUDEBOT_UA: &str = "Mozilla/5.0 (compatible; ClaudeBot/1.0; +claudebot@anthropic.com)";

fn t0() -> DateTime<Utc> {
    DateTime::parse_from_rfc3339("2024-05-10T12:00:00Z")
        .unwrap()
        .with_timezone(&Utc)
}

fn ip(s: &str) -> IpAddr {
    s.parse().unwrap()
}

struct MarkdownRenderer;

#[async_trait]
impl Renderer for MarkdownRenderer {
    async fn render(&self, url: &str) -> CrawlResult<String> {
        Ok(format!("# {url}\n"))
    }
}

/// Renders only as permits are released.
struct GatedRenderer {
    gate: Semaphore,
    entered: AtomicUsize,
}

impl GatedRenderer {
    fn closed() -> Self {
        Self {
            gate: Semaphore::new(0),
            entered: AtomicUsize::new(0),
        }
    }

    /// Wait until `n` renders are parked on the gate or past it.
    async fn wait_entered(&self, n: usize) {
        while self.entered.load(Ordering::SeqCst) < n {
            tokio::task::yield_now().await;
        }
    }
}

#[async_trait]
impl Renderer for GatedRenderer {
    async fn render(&self, url: &str) -> CrawlResult<String> {
        self.entered.fetch_add(1, Ordering::SeqCst);
        self.gate
            .acquire()
            .await
            .map_err(|_| CrawlError::render(url, "gate closed"))?
            .forget();
        Ok(format!("# {url}\n"))
    }
}

fn content(n: u64) -> Vec<ContentItem> {
    (1..=n)
        .map(|id| ContentItem {
            id,
            url: format!("/post-{id}"),
        })
        .collect()
}

/// Pages under `/gone` were deleted upstream.
struct RemovedPagesRenderer;

#[async_trait]
impl Renderer for RemovedPagesRenderer {
    async fn render(&self, url: &str) -> CrawlResult<String> {
        if url.starts_with("/gone") {
            return Err(CrawlError::render_with_status(url, 404, "content removed"));
        }
        Ok(format!("# {url}\n"))
    }
}

fn agent(config: CrawlAnalyticsConfig) -> (CrawlAnalyticsAgent, Arc<MemoryVisitStore>, Arc<ManualClock>) {
    agent_with_renderer(config, Arc::new(MarkdownRenderer))
}

fn agent_with_renderer(
    config: CrawlAnalyticsConfig,
    renderer: Arc<dyn Renderer>,
) -> (CrawlAnalyticsAgent, Arc<MemoryVisitStore>, Arc<ManualClock>) {
    let store = Arc::new(MemoryVisitStore::new());
    let clock = Arc::new(ManualClock::new(t0()));
    let agent = CrawlAnalyticsAgent::with_clock(
        config,
        store.clone(),
        renderer,
        Arc::new(MemoryContentSource::new(content(3))),
        clock.clone(),
    )
    .unwrap();
    (agent, store, clock)
}

// =============================================================================
// Configuration Tests
// =============================================================================

#[test]
fn test_default_config_is_valid() {
    let config = CrawlAnalyticsConfig::default();

    assert_eq!(config.sessions.session_gap_seconds, 1800);
    assert_eq!(config.cache.high_ttl_seconds, 3600);
    assert_eq!(config.cache.medium_ttl_seconds, 21600);
    assert_eq!(config.cache.low_ttl_seconds, 86400);
    assert_eq!(config.warmup.batch_size, 10);
    assert_eq!(config.budget.period_days, 7);
    assert!(config.validate().is_ok());
}

#[test]
fn test_config_from_json() {
    let json = r#"{
        "bots": {
            "track_unknown": true,
            "bot_priorities": { "GPTBot": "high", "CCBot": "low" },
            "blocked_bots": ["Bytespider"]
        },
        "rate_limit": { "max_requests": 5 }
    }"#;

    let config: CrawlAnalyticsConfig = serde_json::from_str(json).unwrap();

    assert!(config.bots.track_unknown);
    assert_eq!(config.bots.bot_priorities["GPTBot"], Priority::High);
    assert_eq!(config.bots.blocked_bots, vec!["Bytespider".to_string()]);
    assert_eq!(config.rate_limit.max_requests, 5);
    assert_eq!(config.rate_limit.window_seconds, 60);
    assert_eq!(config.sessions.session_gap_seconds, 1800);
}

#[test]
fn test_config_from_yaml_file() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    writeln!(
        file,
        "bots:\n  custom_bot_patterns:\n    - name: Internal Indexer\n      pattern: indexer/\\d+\ncache:\n  high_ttl_seconds: 600\n  warmup_priority: low\n"
    )
    .unwrap();

    let content = std::fs::read_to_string(file.path()).unwrap();
    let config: CrawlAnalyticsConfig = serde_yaml::from_str(&content).unwrap();

    assert_eq!(config.bots.custom_bot_patterns[0].name, "Internal Indexer");
    assert_eq!(config.cache.high_ttl_seconds, 600);
    assert_eq!(config.cache.warmup_priority, Priority::Low);
    assert!(config.validate().is_ok());
}

#[test]
fn test_invalid_config_rejected() {
    let config = CrawlAnalyticsConfig {
        cache: CacheConfig {
            medium_ttl_seconds: 100_000,
            ..Default::default()
        },
        ..Default::default()
    };
    assert!(matches!(config.validate(), Err(CrawlError::Config(_))));

    let blocked_warmup = CrawlAnalyticsConfig {
        cache: CacheConfig {
            warmup_priority: Priority::Blocked,
            ..Default::default()
        },
        ..Default::default()
    };
    assert!(blocked_warmup.validate().is_err());
}

// =============================================================================
// Classifier Tests
// =============================================================================

fn classify(classifier: &BotClassifier, ua: &str) -> Option<zentinel_agent_crawl_analytics::Classification> {
    use zentinel_agent_crawl_analytics::classifier::RequestSignature;
    classifier.classify(&RequestSignature {
        user_agent: ua,
        ip: ip("192.0.2.1"),
    })
}

#[test]
fn test_known_bots_classified() {
    let classifier = BotClassifier::default();

    assert_eq!(classify(&classifier, GPTBOT_UA).unwrap().bot_type, "GPTBot");
    assert_eq!(classify(&classifier, CLAUDEBOT_UA).unwrap().bot_type, "ClaudeBot");
    assert!(classify(&classifier, "Mozilla/5.0 (Macintosh) Safari/605.1.15").is_none());
    assert!(classify(&classifier, "").is_none());
}

#[test]
fn test_unknown_bot_fallback() {
    let ua = "python-requests/2.31.0";

    let default = BotClassifier::default();
    assert!(classify(&default, ua).is_none());

    let tracking = BotClassifier::new(&BotConfig {
        track_unknown: true,
        ..Default::default()
    });
    let result = classify(&tracking, ua).unwrap();
    assert_eq!(result.bot_name, "Unknown Bot");
    assert_eq!(result.priority, Priority::Medium);
}

#[test]
fn test_priorities_and_blocking() {
    let mut priorities = std::collections::HashMap::new();
    priorities.insert("GPTBot".to_string(), Priority::High);
    let classifier = BotClassifier::new(&BotConfig {
        bot_priorities: priorities,
        blocked_bots: vec!["ClaudeBot".to_string()],
        ..Default::default()
    });

    let gpt = classify(&classifier, GPTBOT_UA).unwrap();
    assert_eq!(gpt.priority, Priority::High);
    assert_eq!(gpt.decision(), Decision::Allow);

    let claude = classify(&classifier, CLAUDEBOT_UA).unwrap();
    assert_eq!(claude.priority, Priority::Blocked);
    assert_eq!(claude.decision(), Decision::Deny);
}

#[test]
fn test_custom_pattern_wins() {
    let classifier = BotClassifier::new(&BotConfig {
        custom_bot_patterns: vec![CustomBotPattern {
            name: "Partner Crawler".to_string(),
            pattern: "(?i)gptbot/1\\.2".to_string(),
        }],
        ..Default::default()
    });
    let result = classify(&classifier, GPTBOT_UA).unwrap();
    assert_eq!(result.bot_name, "Partner Crawler");
}

// =============================================================================
// Session Tests
// =============================================================================

fn visit(bot: &str, addr: &str, at: DateTime<Utc>, url: &str) -> BotVisit {
    BotVisit::crawl(at, bot, ip(addr), url)
}

#[test]
fn test_twelve_visit_example() {
    // 5 minutes apart, with a 40 minute gap before the 7th visit
    let mut at = t0();
    let mut timestamps = Vec::new();
    for i in 0..12 {
        if i == 6 {
            at += Duration::minutes(40);
        } else if i > 0 {
            at += Duration::minutes(5);
        }
        timestamps.push(at);
    }

    let sessions = split_sessions(&timestamps, Duration::seconds(1800));
    assert_eq!(sessions.len(), 2);
    assert_eq!(sessions.iter().map(|s| s.page_count).sum::<usize>(), 12);
    assert_eq!(sessions[0].page_count, 6);
}

#[test]
fn test_session_partition_properties() {
    let offsets = [0, 100, 1900, 4000, 4001, 9000, 10800];
    let timestamps: Vec<_> = offsets.iter().map(|s| t0() + Duration::seconds(*s)).collect();
    let gap = Duration::seconds(1800);
    let sessions = split_sessions(&timestamps, gap);

    assert_eq!(sessions.len(), 3);
    assert_eq!(sessions.iter().map(|s| s.page_count).sum::<usize>(), offsets.len());
    for pair in sessions.windows(2) {
        assert!(pair[1].start - pair[0].end > gap);
    }
    // Exactly 1800s stays in one session
    assert_eq!(sessions[0].page_count, 3);
    assert_eq!(sessions[2].page_count, 2);
}

#[test]
fn test_aggregate_identity() {
    let visits: Vec<BotVisit> = (0..9)
        .map(|i| {
            let addr = if i % 3 == 0 { "10.0.0.2" } else { "10.0.0.1" };
            visit("GPTBot", addr, t0() + Duration::minutes(i * 20), "/a")
        })
        .collect();

    let aggregator = SessionAggregator::default();
    for stats in aggregator.fingerprint_stats(&visits) {
        let expected = stats.total_visits as f64 / stats.total_sessions as f64;
        assert!((stats.avg_pages_per_session - expected).abs() < 1e-9);
    }

    let top = aggregator.top_by_metric(&visits, SessionMetric::Recency, 1);
    assert_eq!(top.len(), 1);
    assert_eq!(top[0].fingerprint.ip, ip("10.0.0.1"));
}

// =============================================================================
// Crawl Budget Tests
// =============================================================================

fn crawls_with_hit_rate(hits: usize, total: usize) -> Vec<BotVisit> {
    (0..total)
        .map(|i| {
            let mut v = visit(
                "GPTBot",
                "10.0.0.1",
                t0() - Duration::minutes(i as i64),
                &format!("/page-{}", i % 4),
            );
            v.cache_status = if i < hits { CacheStatus::Hit } else { CacheStatus::Miss };
            v
        })
        .collect()
}

#[test]
fn test_low_hit_rate_warns() {
    let analyzer = CrawlBudgetAnalyzer::default();
    let report = analyzer.analyze(&crawls_with_hit_rate(13, 20), Some("GPTBot"), 7, t0());

    assert_eq!(report.metrics.cache_hit_rate, 65.0);
    let rec = report
        .recommendations
        .iter()
        .find(|r| r.kind == "cache_performance")
        .unwrap();
    assert_eq!(rec.severity, Severity::Warning);
}

#[test]
fn test_high_hit_rate_is_quiet() {
    let analyzer = CrawlBudgetAnalyzer::default();
    let report = analyzer.analyze(&crawls_with_hit_rate(19, 20), None, 7, t0());

    assert_eq!(report.metrics.cache_hit_rate, 95.0);
    assert!(report.recommendations.iter().all(|r| r.kind != "cache_performance"));
}

#[test]
fn test_rules_fire_independently() {
    let mut visits = crawls_with_hit_rate(0, 20);
    visits[0].status_code = 404;
    visits[1].status_code = 404;
    visits[2].status_code = 404;
    visits[3].url = "/wp-admin/options.php".to_string();

    let report = CrawlBudgetAnalyzer::default().analyze(&visits, None, 7, t0());
    let kinds: Vec<&str> = report.recommendations.iter().map(|r| r.kind.as_str()).collect();

    assert!(kinds.contains(&"cache_performance"));
    assert!(kinds.contains(&"errors"));
    assert!(kinds.contains(&"admin_crawls"));
    assert!(kinds.contains(&"deep_crawl"));
}

#[test]
fn test_empty_window_has_no_recommendations() {
    let report = CrawlBudgetAnalyzer::default().analyze(&[], None, 7, t0());
    assert_eq!(report.metrics.total_requests, 0);
    assert!(report.recommendations.is_empty());
}

#[test]
fn test_citation_rate_examples() {
    assert_eq!(citation_rate(10, 3), 0.3);
    assert_eq!(citation_rate(0, 0), 0.0);
    assert_eq!(CitationBand::for_rate(0.3), CitationBand::Medium);
    assert_eq!(CitationBand::for_rate(0.5), CitationBand::High);
}

// =============================================================================
// Artifact Cache Tests
// =============================================================================

#[test]
fn test_cache_expiry_boundary() {
    let clock = Arc::new(ManualClock::new(t0()));
    let cache = ArtifactCache::new(CacheConfig::default(), clock.clone());
    cache.put("content:7", "# Seven".to_string(), Priority::High);

    clock.set(t0() + Duration::seconds(3599));
    assert!(cache.get("content:7").hit);

    clock.set(t0() + Duration::seconds(3601));
    let lookup = cache.get("content:7");
    assert!(!lookup.hit);
    assert!(lookup.content.is_none());
}

#[test]
fn test_cache_ttl_monotonic() {
    let config = CacheConfig::default();
    assert!(config.ttl(Priority::High) <= config.ttl(Priority::Medium));
    assert!(config.ttl(Priority::Medium) <= config.ttl(Priority::Low));
    assert!(config.ttl(Priority::Blocked).is_none());

    let cache = ArtifactCache::default();
    assert!(!cache.put("content:1", "x".to_string(), Priority::Blocked));
    assert!(cache.view("content:1").is_none());
}

// =============================================================================
// Warmup Tests
// =============================================================================

fn orchestrator(items: u64, renderer: Arc<dyn Renderer>, batch_size: usize) -> Arc<WarmupOrchestrator> {
    let cache = Arc::new(ArtifactCache::default());
    Arc::new(WarmupOrchestrator::new(
        cache,
        Arc::new(MemoryContentSource::new(content(items))),
        renderer,
        batch_size,
    ))
}

#[tokio::test]
async fn test_warmup_is_idempotent() {
    let warmup = orchestrator(5, Arc::new(MarkdownRenderer), 2);

    let StartOutcome::Started(handle) = warmup.start() else {
        panic!("first start should be accepted");
    };
    let first = handle.wait().await;
    assert_eq!(first.state, WarmupState::Completed);
    assert_eq!(first.total_warmed, 5);

    let StartOutcome::Started(handle) = warmup.start() else {
        panic!("lease should be released after completion");
    };
    let second = handle.wait().await;
    assert_eq!(second.total_warmed, 0);
    assert_eq!(second.batches, 0);
    assert_eq!(second.stats.unwrap().uncached, 0);
    assert_eq!(warmup.stats().await.unwrap().percentage, 100);
}

#[tokio::test]
async fn test_concurrent_start_rejected() {
    let renderer = Arc::new(GatedRenderer::closed());
    let warmup = orchestrator(4, renderer.clone(), 2);

    let StartOutcome::Started(handle) = warmup.start() else {
        panic!("first start should be accepted");
    };
    assert!(warmup.is_running());
    assert!(matches!(warmup.start(), StartOutcome::Rejected));

    renderer.gate.add_permits(4);
    let report = handle.wait().await;
    assert_eq!(report.state, WarmupState::Completed);
    assert_eq!(report.total_warmed, 4);
    assert!(!warmup.is_running());
}

#[tokio::test]
async fn test_warmup_cancellation() {
    let renderer = Arc::new(GatedRenderer::closed());
    let warmup = orchestrator(6, renderer.clone(), 2);

    let StartOutcome::Started(handle) = warmup.start() else {
        panic!("first start should be accepted");
    };
    handle.cancel();
    renderer.gate.add_permits(6);
    let report = handle.wait().await;

    assert_eq!(report.state, WarmupState::Cancelled);
    assert!(report.batches <= 1);
    assert_eq!(report.total_warmed, report.batches * 2);
    assert_eq!(warmup.stats().await.unwrap().cached, report.total_warmed);
    assert_eq!(warmup.state(), WarmupState::Cancelled);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_warmup_cancelled_mid_batch() {
    let renderer = Arc::new(GatedRenderer::closed());
    let warmup = orchestrator(6, renderer.clone(), 2);

    let StartOutcome::Started(handle) = warmup.start() else {
        panic!("first start should be accepted");
    };
    // The first batch is parked on its first render
    renderer.wait_entered(1).await;
    handle.cancel();
    renderer.gate.add_permits(6);
    let report = handle.wait().await;

    assert_eq!(report.state, WarmupState::Cancelled);
    assert_eq!(report.batches, 1);
    assert_eq!(report.total_warmed, 2);
    assert_eq!(warmup.stats().await.unwrap().cached, 2);
    assert_eq!(renderer.entered.load(Ordering::SeqCst), 2);
    assert!(!warmup.is_running());
}

// =============================================================================
// Agent Tests
// =============================================================================

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_client_batch_holds_warmup_lease() {
    let renderer = Arc::new(GatedRenderer::closed());
    let (agent, _, _) = agent_with_renderer(CrawlAnalyticsConfig::default(), renderer.clone());
    let agent = Arc::new(agent);

    let batch = tokio::spawn({
        let agent = Arc::clone(&agent);
        async move { agent.start_warmup_batch(10, 0).await }
    });
    renderer.wait_entered(1).await;

    assert!(matches!(agent.start_warmup(), StartOutcome::Rejected));
    assert!(matches!(
        agent.start_warmup_batch(10, 0).await,
        Err(CrawlError::WarmupInProgress)
    ));
    assert_eq!(agent.warmup_state(), WarmupState::Idle);

    renderer.gate.add_permits(3);
    let outcome = batch.await.unwrap().unwrap();
    assert_eq!(outcome.results.warmed, 3);

    let StartOutcome::Started(handle) = agent.start_warmup() else {
        panic!("lease should be released after the batch");
    };
    let report = handle.wait().await;
    assert_eq!(report.state, WarmupState::Completed);
    assert_eq!(report.total_warmed, 0);
}

#[tokio::test]
async fn test_failed_renders_feed_crawl_budget() {
    let (agent, store, clock) = agent_with_renderer(
        CrawlAnalyticsConfig::default(),
        Arc::new(RemovedPagesRenderer),
    );

    for i in 0..15 {
        let url = if i % 3 == 0 { format!("/gone-{i}") } else { format!("/post-{i}") };
        let result = agent
            .on_request(&BotRequest::new(GPTBOT_UA, ip("192.0.2.5"), url))
            .await;
        if i % 3 == 0 {
            assert!(matches!(result, Err(CrawlError::Render { status: 404, .. })));
        } else {
            assert!(result.is_ok());
        }
        clock.advance(Duration::minutes(1));
    }
    assert_eq!(store.len(), 15);

    let report = agent
        .analyze_crawl_budget(Some("GPTBot"), None)
        .await
        .unwrap();
    assert_eq!(report.metrics.total_requests, 15);
    assert_eq!(report.metrics.error_count, 5);
    assert_eq!(report.metrics.not_found_count, 5);
    let errors = report
        .recommendations
        .iter()
        .find(|r| r.kind == "errors")
        .expect("error rule should fire");
    assert_eq!(errors.severity, Severity::Warning);
}

#[tokio::test]
async fn test_request_flow_miss_then_hit() {
    let (agent, store, clock) = agent(CrawlAnalyticsConfig::default());
    let request = BotRequest::new(GPTBOT_UA, ip("192.0.2.5"), "/post-1").with_content_id(1);

    let first = agent.on_request(&request).await.unwrap();
    assert!(matches!(first, RequestOutcome::Served { cache_status: CacheStatus::Miss, .. }));

    clock.advance(Duration::minutes(1));
    let second = agent.on_request(&request).await.unwrap();
    assert!(matches!(second, RequestOutcome::Served { cache_status: CacheStatus::Hit, .. }));

    // Medium tier expires after six hours
    clock.advance(Duration::hours(7));
    let third = agent.on_request(&request).await.unwrap();
    assert!(matches!(third, RequestOutcome::Served { cache_status: CacheStatus::Miss, .. }));

    let visits = store.query(&VisitFilters::for_bot("GPTBot")).await.unwrap();
    assert_eq!(visits.len(), 3);
    assert_eq!(visits[1].cache_status, CacheStatus::Hit);
    assert_eq!(visits[0].content_id, Some(1));
}

#[tokio::test]
async fn test_blocked_bot_never_cached() {
    let config = CrawlAnalyticsConfig {
        bots: BotConfig {
            blocked_bots: vec!["ClaudeBot".to_string()],
            ..Default::default()
        },
        ..Default::default()
    };
    let (agent, store, _) = agent(config);

    let outcome = agent
        .on_request(&BotRequest::new(CLAUDEBOT_UA, ip("192.0.2.5"), "/post-1"))
        .await
        .unwrap();

    assert!(matches!(outcome, RequestOutcome::Denied { .. }));
    assert!(store.is_empty());
    assert!(agent.list_cache_entries().is_empty());
}

#[tokio::test]
async fn test_rate_limit_is_observational() {
    let config = CrawlAnalyticsConfig {
        rate_limit: RateLimitConfig {
            window_seconds: 60,
            max_requests: 2,
            max_violations: 100,
        },
        ..Default::default()
    };
    let (agent, _, clock) = agent(config);
    let request = BotRequest::new(GPTBOT_UA, ip("192.0.2.5"), "/post-2");

    for _ in 0..4 {
        let outcome = agent.on_request(&request).await.unwrap();
        assert!(matches!(outcome, RequestOutcome::Served { .. }));
        clock.advance(Duration::seconds(1));
    }

    let violations = agent.get_rate_limit_violations(10);
    assert_eq!(violations.len(), 2);
    assert!(violations[0].timestamp > violations[1].timestamp);
    assert_eq!(agent.get_rate_limit_violation_stats()[0].violations, 2);
}

#[tokio::test]
async fn test_dashboard_reads() {
    let (agent, _, clock) = agent(CrawlAnalyticsConfig::default());
    for (ua, url) in [(GPTBOT_UA, "/post-1"), (CLAUDEBOT_UA, "/post-1"), (GPTBOT_UA, "/post-2")] {
        agent
            .on_request(&BotRequest::new(ua, ip("192.0.2.5"), url))
            .await
            .unwrap();
        clock.advance(Duration::minutes(2));
    }

    let summary = agent.get_summary(&VisitFilters::default()).await.unwrap();
    assert_eq!(summary.total_visits, 3);
    assert_eq!(summary.unique_bots, 2);
    assert_eq!(summary.unique_pages, 2);

    let top = agent.get_top_pages(&VisitFilters::default(), 1).await.unwrap();
    assert_eq!(top[0].url, "/post-1");

    let gpt_only = agent
        .get_summary(&VisitFilters::for_bot("GPTBot").with_traffic(TrafficType::BotCrawl))
        .await
        .unwrap();
    assert_eq!(gpt_only.total_visits, 2);

    let metrics = agent
        .get_crawl_budget_metrics(None, Some(BudgetPeriod::Day))
        .await
        .unwrap();
    assert_eq!(metrics.total_requests, 3);

    let warmup = agent.get_warmup_stats().await.unwrap();
    assert_eq!(warmup.total, 3);
    let batch = agent.start_warmup_batch(10, 0).await.unwrap();
    assert_eq!(batch.results.warmed, 3);
    assert_eq!(batch.stats.percentage, 100);
}
