//! Crawl analytics agent.
//!
//! Ties the components together: the inline request path
//! (classify, rate-limit observation, cache, render on miss, record visit)
//! and the read and admin operations consumed by a dashboard.

use crate::analytics::{
    self, BotBreakdown, CitationRatio, ContentPerformance, OptimalContentLength, Summary,
    TimeBucket, TimeSeriesPoint, TopPage,
};
use crate::budget::{BudgetPeriod, BudgetReport, CrawlBudgetAnalyzer, CrawlMetrics};
use crate::cache::{ArtifactCache, CacheEntry, CacheEntryInfo, CacheKey, CacheStats};
use crate::citation::{detect_citation, CitationSource};
use crate::classifier::{BotClassifier, IpVerification, IpVerifier, RequestSignature};
use crate::clock::{Clock, SystemClock};
use crate::config::CrawlAnalyticsConfig;
use crate::error::{ActionResult, CrawlResult};
use crate::priority::{Classification, Decision};
use crate::rate_limit::{RateLimitViolation, RateLimiter, ViolationStats};
use crate::sessions::{FingerprintStats, SessionAggregator, SessionAnalytics, SessionMetric};
use crate::visits::{
    BotVisit, CacheStatus, ContentMetrics, ContentType, Fingerprint, TrafficType, VisitFilters,
    VisitStore,
};
use crate::warmup::{
    BatchOutcome, ContentSource, Renderer, StartOutcome, WarmupOrchestrator, WarmupState,
    WarmupStats,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::net::IpAddr;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn};

/// A request as seen by the agent.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BotRequest {
    pub user_agent: String,
    pub ip: IpAddr,
    pub url: String,
    /// Content identity, when the URL resolves to a known item
    #[serde(default)]
    pub content_id: Option<u64>,
    #[serde(default)]
    pub content_type: ContentType,
    #[serde(default)]
    pub country_code: Option<String>,
    #[serde(default)]
    pub content_metrics: Option<ContentMetrics>,
}

impl BotRequest {
    pub fn new(user_agent: impl Into<String>, ip: IpAddr, url: impl Into<String>) -> Self {
        Self {
            user_agent: user_agent.into(),
            ip,
            url: url.into(),
            content_id: None,
            content_type: ContentType::Markdown,
            country_code: None,
            content_metrics: None,
        }
    }

    pub fn with_content_id(mut self, id: u64) -> Self {
        self.content_id = Some(id);
        self
    }

    fn cache_key(&self) -> String {
        self.content_id
            .map_or_else(|| CacheKey::url(&self.url), CacheKey::content)
    }
}

/// Result of handling one request.
#[derive(Debug, Clone, PartialEq)]
pub enum RequestOutcome {
    /// Not bot traffic; nothing was recorded
    NotBot,
    /// Blocked priority; caller returns a forbidden response
    Denied { classification: Classification },
    Served {
        content: String,
        cache_status: CacheStatus,
        classification: Classification,
        verification: IpVerification,
    },
}

/// A human landing on the site, possibly from an AI answer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CitationClick {
    pub landing_url: String,
    #[serde(default)]
    pub referrer: Option<String>,
    pub ip: IpAddr,
    #[serde(default)]
    pub user_agent: String,
    #[serde(default)]
    pub content_id: Option<u64>,
    #[serde(default)]
    pub content_metrics: Option<ContentMetrics>,
}

/// Crawl analytics agent.
pub struct CrawlAnalyticsAgent {
    config: CrawlAnalyticsConfig,
    classifier: BotClassifier,
    verifier: IpVerifier,
    rate_limiter: RateLimiter,
    cache: Arc<ArtifactCache>,
    store: Arc<dyn VisitStore>,
    renderer: Arc<dyn Renderer>,
    sessions: SessionAggregator,
    budget: CrawlBudgetAnalyzer,
    warmup: Arc<WarmupOrchestrator>,
    clock: Arc<dyn Clock>,
}

impl CrawlAnalyticsAgent {
    /// Create an agent on the wall clock.
    pub fn new(
        config: CrawlAnalyticsConfig,
        store: Arc<dyn VisitStore>,
        renderer: Arc<dyn Renderer>,
        source: Arc<dyn ContentSource>,
    ) -> CrawlResult<Self> {
        Self::with_clock(config, store, renderer, source, Arc::new(SystemClock))
    }

    /// Create an agent with an explicit time source.
    pub fn with_clock(
        config: CrawlAnalyticsConfig,
        store: Arc<dyn VisitStore>,
        renderer: Arc<dyn Renderer>,
        source: Arc<dyn ContentSource>,
        clock: Arc<dyn Clock>,
    ) -> CrawlResult<Self> {
        config.validate()?;

        let classifier = BotClassifier::new(&config.bots);
        let sessions = SessionAggregator::new(&config.sessions);
        let cache = Arc::new(ArtifactCache::new(config.cache.clone(), Arc::clone(&clock)));
        let warmup = Arc::new(WarmupOrchestrator::new(
            Arc::clone(&cache),
            source,
            Arc::clone(&renderer),
            config.warmup.batch_size,
        ));

        info!(
            matchers = classifier.matcher_count(),
            track_unknown = config.bots.track_unknown,
            blocked = config.bots.blocked_bots.len(),
            "Crawl analytics agent initialized"
        );

        Ok(Self {
            verifier: IpVerifier::new(&config.verification),
            rate_limiter: RateLimiter::new(&config.rate_limit),
            budget: CrawlBudgetAnalyzer::new(config.budget.clone(), sessions.clone()),
            classifier,
            cache,
            store,
            renderer,
            sessions,
            warmup,
            clock,
            config,
        })
    }

    pub fn config(&self) -> &CrawlAnalyticsConfig {
        &self.config
    }

    /// Classify a user-agent and IP without recording anything.
    pub fn classify(&self, user_agent: &str, ip: IpAddr) -> Option<Classification> {
        self.classifier.classify(&RequestSignature { user_agent, ip })
    }

    /// Handle one request inline: classify, observe the rate, serve from
    /// cache or render, and record the visit.
    ///
    /// Render failures propagate and leave no cache entry. The visit is
    /// still recorded with the status the failure maps to.
    pub async fn on_request(&self, request: &BotRequest) -> CrawlResult<RequestOutcome> {
        let started = Instant::now();

        let Some(classification) = self.classify(&request.user_agent, request.ip) else {
            return Ok(RequestOutcome::NotBot);
        };

        if classification.decision() == Decision::Deny {
            info!(
                bot_type = %classification.bot_type,
                client_ip = %request.ip,
                url = %request.url,
                "Blocked bot denied"
            );
            return Ok(RequestOutcome::Denied { classification });
        }

        let verification = self
            .verifier
            .verify(&classification.bot_type, request.ip)
            .await;
        debug!(status = ?verification.status, "IP verification complete");

        let now = self.clock.now();
        let fingerprint = Fingerprint {
            bot_type: classification.bot_type.clone(),
            ip: request.ip,
        };
        self.rate_limiter.record(&fingerprint, &request.url, now);

        let key = request.cache_key();
        let lookup = self.cache.get(&key);
        let served = match lookup.content {
            Some(content) => Ok((content, CacheStatus::Hit)),
            None => self.renderer.render(&request.url).await.map(|content| {
                self.cache.put(&key, content.clone(), classification.priority);
                (content, CacheStatus::Miss)
            }),
        };

        let (status_code, cache_status, size) = match &served {
            Ok((content, cache_status)) => (200, *cache_status, content.len() as u64),
            Err(e) => (e.status_code(), CacheStatus::Miss, 0),
        };
        let visit = BotVisit {
            bot_name: classification.bot_name.clone(),
            user_agent: request.user_agent.clone(),
            country_code: request.country_code.clone(),
            content_id: request.content_id,
            content_type: request.content_type,
            cache_status,
            status_code,
            response_time_ms: u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX),
            response_size_bytes: size,
            ip_verified: verification.status,
            ip_verification_method: verification.method,
            content_metrics: request.content_metrics.clone(),
            ..BotVisit::crawl(now, classification.bot_type.clone(), request.ip, request.url.clone())
        };
        if let Err(e) = self.store.insert(visit).await {
            warn!(error = %e, url = %request.url, "Failed to record bot visit");
        }

        let (content, cache_status) = match served {
            Ok(served) => served,
            Err(e) => {
                warn!(
                    bot_type = %classification.bot_type,
                    url = %request.url,
                    status = status_code,
                    error = %e,
                    "Bot request render failed"
                );
                return Err(e);
            }
        };

        info!(
            bot_type = %classification.bot_type,
            priority = %classification.priority,
            client_ip = %request.ip,
            url = %request.url,
            cache_status = ?cache_status,
            "Bot request served"
        );

        Ok(RequestOutcome::Served {
            content,
            cache_status,
            classification,
            verification,
        })
    }

    /// Record a citation click when the landing URL or referrer identifies
    /// an AI platform. Returns the detected source.
    pub async fn record_citation_click(
        &self,
        click: &CitationClick,
    ) -> CrawlResult<Option<CitationSource>> {
        let Some(source) = detect_citation(&click.landing_url, click.referrer.as_deref()) else {
            return Ok(None);
        };

        let visit = BotVisit {
            user_agent: click.user_agent.clone(),
            content_id: click.content_id,
            traffic_type: TrafficType::CitationClick,
            ai_platform: Some(source.platform.clone()),
            search_query: source.search_query.clone(),
            content_metrics: click.content_metrics.clone(),
            ..BotVisit::crawl(
                self.clock.now(),
                source.platform.clone(),
                click.ip,
                strip_query(&click.landing_url),
            )
        };
        self.store.insert(visit).await?;

        info!(
            platform = %source.platform,
            method = ?source.method,
            url = %click.landing_url,
            "Citation click recorded"
        );
        Ok(Some(source))
    }

    // ---- read APIs -------------------------------------------------------

    async fn visits(&self, filters: &VisitFilters) -> CrawlResult<Vec<BotVisit>> {
        self.store.query(filters).await
    }

    async fn crawls(&self) -> CrawlResult<Vec<BotVisit>> {
        self.visits(&VisitFilters::default().with_traffic(TrafficType::BotCrawl))
            .await
    }

    pub async fn get_summary(&self, filters: &VisitFilters) -> CrawlResult<Summary> {
        Ok(analytics::summary(&self.visits(filters).await?, self.clock.now()))
    }

    pub async fn get_visits_by_bot(&self, filters: &VisitFilters) -> CrawlResult<Vec<BotBreakdown>> {
        Ok(analytics::visits_by_bot(&self.visits(filters).await?))
    }

    pub async fn get_top_pages(&self, filters: &VisitFilters, limit: usize) -> CrawlResult<Vec<TopPage>> {
        Ok(analytics::top_pages(&self.visits(filters).await?, limit))
    }

    pub async fn get_visits_over_time(
        &self,
        filters: &VisitFilters,
        period: TimeBucket,
        days: u32,
    ) -> CrawlResult<Vec<TimeSeriesPoint>> {
        let visits = self.visits(filters).await?;
        Ok(analytics::visits_over_time(&visits, period, days, self.clock.now()))
    }

    pub async fn get_session_analytics(&self) -> CrawlResult<SessionAnalytics> {
        Ok(self.sessions.analytics(&self.crawls().await?))
    }

    pub async fn get_top_bots_by_metric(
        &self,
        metric: SessionMetric,
        limit: usize,
    ) -> CrawlResult<Vec<FingerprintStats>> {
        Ok(self.sessions.top_by_metric(&self.crawls().await?, metric, limit))
    }

    /// Crawl budget metrics over `period`, or over the configured
    /// `budget.period_days` when no period is given.
    pub async fn get_crawl_budget_metrics(
        &self,
        bot_type: Option<&str>,
        period: Option<BudgetPeriod>,
    ) -> CrawlResult<CrawlMetrics> {
        let now = self.clock.now();
        let days = self.period_days(period);
        let visits = self.window(days, now).await?;
        Ok(self.budget.metrics(&visits, bot_type, days, now))
    }

    /// Metrics plus recommendations for one bot type (or all).
    pub async fn analyze_crawl_budget(
        &self,
        bot_type: Option<&str>,
        period: Option<BudgetPeriod>,
    ) -> CrawlResult<BudgetReport> {
        let now = self.clock.now();
        let days = self.period_days(period);
        let visits = self.window(days, now).await?;
        Ok(self.budget.analyze(&visits, bot_type, days, now))
    }

    fn period_days(&self, period: Option<BudgetPeriod>) -> u32 {
        period.map_or(self.config.budget.period_days, |p| p.days())
    }

    async fn window(&self, days: u32, now: DateTime<Utc>) -> CrawlResult<Vec<BotVisit>> {
        self.visits(
            &VisitFilters::default()
                .with_traffic(TrafficType::BotCrawl)
                .since(analytics::days_before(now, days)),
        )
        .await
    }

    pub async fn get_citation_to_crawl_ratio(
        &self,
        filters: &VisitFilters,
        limit: usize,
    ) -> CrawlResult<Vec<CitationRatio>> {
        Ok(analytics::citation_to_crawl_ratio(&self.visits(filters).await?, limit))
    }

    pub async fn get_content_performance_analysis(
        &self,
        filters: &VisitFilters,
    ) -> CrawlResult<ContentPerformance> {
        Ok(analytics::content_performance(&self.visits(filters).await?))
    }

    pub async fn get_optimal_content_length(&self) -> CrawlResult<OptimalContentLength> {
        let visits = self.visits(&VisitFilters::default()).await?;
        Ok(analytics::optimal_content_length(&visits))
    }

    pub fn get_rate_limit_violations(&self, limit: usize) -> Vec<RateLimitViolation> {
        self.rate_limiter.violations(limit)
    }

    pub fn get_rate_limit_violation_stats(&self) -> Vec<ViolationStats> {
        self.rate_limiter.violation_stats()
    }

    // ---- cache and warmup actions ---------------------------------------

    pub async fn get_warmup_stats(&self) -> CrawlResult<WarmupStats> {
        self.warmup.stats().await
    }

    /// Run a single warmup batch under the warmup lease. Rejected while a
    /// job or another batch holds it.
    pub async fn start_warmup_batch(&self, batch_size: usize, offset: usize) -> CrawlResult<BatchOutcome> {
        let outcome = self.warmup.run_exclusive_batch(batch_size, offset).await?;
        info!(
            offset,
            warmed = outcome.results.warmed,
            percentage = outcome.stats.percentage,
            "Warmup batch processed"
        );
        Ok(outcome)
    }

    /// Start a full warmup job in the background.
    pub fn start_warmup(&self) -> StartOutcome {
        self.warmup.start()
    }

    pub fn warmup_state(&self) -> WarmupState {
        self.warmup.state()
    }

    pub fn delete_cache_entry(&self, key: &str) -> ActionResult {
        let existed = self.cache.delete(key);
        debug!(key, existed, "Cache entry deleted");
        ActionResult::ok("Cache entry deleted")
    }

    pub fn bulk_delete_cache<S: AsRef<str>>(&self, keys: &[S]) -> ActionResult {
        let removed = self.cache.bulk_delete(keys);
        ActionResult::ok(format!("{removed} cache entries deleted"))
    }

    pub fn clear_expired_cache(&self) -> ActionResult {
        let removed = self.cache.clear_expired();
        ActionResult::ok(format!("{removed} expired cache entries cleared"))
    }

    pub fn view_cache_content(&self, key: &str) -> Option<CacheEntry> {
        self.cache.view(key)
    }

    /// Re-render one content item regardless of its cache state.
    pub async fn regenerate_cache(&self, content_id: u64) -> ActionResult {
        match self.warmup.regenerate(content_id).await {
            Ok(()) => ActionResult::ok("Cache regenerated"),
            Err(e) => {
                warn!(content_id, error = %e, "Cache regeneration failed");
                e.into()
            }
        }
    }

    pub fn cache_stats(&self) -> CacheStats {
        self.cache.stats()
    }

    pub fn list_cache_entries(&self) -> Vec<CacheEntryInfo> {
        self.cache.list_entries()
    }
}

fn strip_query(url: &str) -> String {
    url.split(['?', '#']).next().unwrap_or(url).to_string()
}
