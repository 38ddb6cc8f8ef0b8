//! Crawl budget analysis.
//!
//! Metrics are computed once per call from the visit window, then handed to
//! an ordered list of independent rules. Each rule may emit at most one
//! recommendation; all rules run and their outputs are concatenated in rule
//! order. Nothing here is persisted.

use crate::analytics::{days_before, percentage, round_to};
use crate::config::BudgetConfig;
use crate::sessions::SessionAggregator;
use crate::visits::{BotVisit, CacheStatus, TrafficType};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap, HashSet};
use std::str::FromStr;
use tracing::debug;

/// Fixed lookback windows offered to dashboards.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BudgetPeriod {
    #[default]
    Day,
    Week,
    Month,
}

impl BudgetPeriod {
    pub fn days(&self) -> u32 {
        match self {
            BudgetPeriod::Day => 1,
            BudgetPeriod::Week => 7,
            BudgetPeriod::Month => 30,
        }
    }
}

impl FromStr for BudgetPeriod {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "day" => Ok(Self::Day),
            "week" => Ok(Self::Week),
            "month" => Ok(Self::Month),
            other => Err(format!("unknown budget period: {other}")),
        }
    }
}

/// URL crawled most often by a single bot in the window.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecrawlHotspot {
    pub url: String,
    pub bot_type: String,
    pub crawls: usize,
    pub daily_crawls: f64,
}

/// Aggregated crawl metrics for one bot (or all bots) over a window.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CrawlMetrics {
    pub bot_type: Option<String>,
    pub period_days: u32,
    pub total_requests: usize,
    pub unique_pages: usize,
    pub total_bandwidth: u64,
    pub cache_hits: usize,
    /// Percent, one decimal
    pub cache_hit_rate: f64,
    pub avg_response_ms: u64,
    /// `unique_pages / total_requests` (0.0-1.0)
    pub content_diversity: f64,
    /// Responses with a status other than 200
    pub error_count: usize,
    pub not_found_count: usize,
    /// `error_count / total_requests` (0.0-1.0)
    pub error_rate: f64,
    /// URL with the most failed responses
    pub top_error_url: Option<String>,
    pub avg_pages_per_session: f64,
    pub top_recrawl: Option<RecrawlHotspot>,
    /// Crawls of admin and login pages
    pub admin_crawls: usize,
    pub recent_crawls: usize,
    pub older_crawls: usize,
    /// Drop of the recent half of the window against the older half, percent
    pub crawl_drop_percentage: f64,
}

const ADMIN_PATHS: [&str; 2] = ["/wp-admin/", "/wp-login.php"];

impl CrawlMetrics {
    /// Compute metrics over bot crawls in `[now - period_days, now]`.
    pub fn compute(
        visits: &[BotVisit],
        bot_type: Option<&str>,
        period_days: u32,
        now: DateTime<Utc>,
        sessions: &SessionAggregator,
    ) -> Self {
        let since = days_before(now, period_days);
        let window: Vec<BotVisit> = visits
            .iter()
            .filter(|v| v.traffic_type == TrafficType::BotCrawl)
            .filter(|v| bot_type.map_or(true, |b| v.bot_type == b))
            .filter(|v| v.timestamp >= since && v.timestamp <= now)
            .cloned()
            .collect();

        let total = window.len();
        let mut metrics = CrawlMetrics {
            bot_type: bot_type.map(str::to_string),
            period_days,
            total_requests: total,
            ..Default::default()
        };
        if total == 0 {
            return metrics;
        }

        let unique_pages = window.iter().map(|v| v.url.as_str()).collect::<HashSet<_>>().len();
        let cache_hits = window.iter().filter(|v| v.cache_status == CacheStatus::Hit).count();
        let measured: Vec<u64> = window
            .iter()
            .map(|v| v.response_time_ms)
            .filter(|ms| *ms > 0)
            .collect();

        metrics.unique_pages = unique_pages;
        metrics.total_bandwidth = window.iter().map(|v| v.response_size_bytes).sum();
        metrics.cache_hits = cache_hits;
        metrics.cache_hit_rate = percentage(cache_hits, total);
        metrics.avg_response_ms = if measured.is_empty() {
            0
        } else {
            (measured.iter().sum::<u64>() as f64 / measured.len() as f64).round() as u64
        };
        metrics.content_diversity = unique_pages as f64 / total as f64;

        let errors: Vec<&BotVisit> = window.iter().filter(|v| v.status_code != 200).collect();
        metrics.error_count = errors.len();
        metrics.not_found_count = errors.iter().filter(|v| v.status_code == 404).count();
        metrics.error_rate = errors.len() as f64 / total as f64;
        metrics.top_error_url = most_common(errors.iter().map(|v| v.url.as_str()));

        let sessions = sessions.sessions(&window);
        let session_count: usize = sessions.values().map(Vec::len).sum();
        metrics.avg_pages_per_session = total as f64 / session_count.max(1) as f64;

        metrics.top_recrawl = top_recrawl(&window, period_days);
        metrics.admin_crawls = window
            .iter()
            .filter(|v| ADMIN_PATHS.iter().any(|p| v.url.contains(p)))
            .count();

        let half = period_days / 2;
        if half > 0 {
            let split = days_before(now, half);
            metrics.recent_crawls = window.iter().filter(|v| v.timestamp >= split).count();
            metrics.older_crawls = total - metrics.recent_crawls;
            if metrics.older_crawls > 0 {
                let older = metrics.older_crawls as f64;
                metrics.crawl_drop_percentage =
                    round_to((older - metrics.recent_crawls as f64) / older * 100.0, 1);
            }
        }

        metrics
    }
}

fn most_common<'a>(items: impl Iterator<Item = &'a str>) -> Option<String> {
    let mut counts: BTreeMap<&str, usize> = BTreeMap::new();
    for item in items {
        *counts.entry(item).or_default() += 1;
    }
    // BTreeMap order makes ties resolve to the lexicographically first key
    counts
        .into_iter()
        .fold(None, |best: Option<(&str, usize)>, (item, n)| match best {
            Some((_, top)) if top >= n => best,
            _ => Some((item, n)),
        })
        .map(|(item, _)| item.to_string())
}

fn top_recrawl(window: &[BotVisit], period_days: u32) -> Option<RecrawlHotspot> {
    let mut counts: HashMap<(&str, &str), usize> = HashMap::new();
    for visit in window {
        *counts
            .entry((visit.url.as_str(), visit.bot_type.as_str()))
            .or_default() += 1;
    }
    counts
        .into_iter()
        .max_by(|a, b| a.1.cmp(&b.1).then_with(|| b.0.cmp(&a.0)))
        .map(|((url, bot_type), crawls)| RecrawlHotspot {
            url: url.to_string(),
            bot_type: bot_type.to_string(),
            crawls,
            daily_crawls: round_to(crawls as f64 / f64::from(period_days.max(1)), 1),
        })
}

/// Recommendation severity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Warning,
    Medium,
    Low,
}

/// Declarative one-click action offered with a recommendation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QuickFixAction {
    /// Open an admin screen
    Navigate,
    /// Pre-fill the visit log filter with failing responses
    Filter404,
    /// Propose a robots.txt rule; never applied without confirmation
    UpdateRobotsTxt,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuickFix {
    pub id: String,
    pub label: String,
    pub action: QuickFixAction,
    pub data: BTreeMap<String, String>,
    pub requires_confirmation: bool,
}

impl QuickFix {
    pub fn navigate(id: &str, label: &str, page: &str) -> Self {
        Self::new(id, label, QuickFixAction::Navigate, [("page", page)])
    }

    pub fn filter_404(status_code: u16) -> Self {
        Self::new(
            "view_404s",
            "View Broken Links",
            QuickFixAction::Filter404,
            [("status_code", status_code.to_string().as_str())],
        )
    }

    pub fn update_robots_txt(id: &str, label: &str, rule: &str) -> Self {
        Self::new(id, label, QuickFixAction::UpdateRobotsTxt, [("rule", rule)])
    }

    fn new<const N: usize>(
        id: &str,
        label: &str,
        action: QuickFixAction,
        data: [(&str, &str); N],
    ) -> Self {
        Self {
            id: id.to_string(),
            label: label.to_string(),
            action,
            data: data
                .into_iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
            requires_confirmation: action == QuickFixAction::UpdateRobotsTxt,
        }
    }
}

/// A recommendation produced by one rule.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Recommendation {
    /// Stable identifier of the rule that fired
    pub kind: String,
    pub severity: Severity,
    pub title: String,
    pub message: String,
    pub action: String,
    pub impact: String,
    pub quick_fixes: Vec<QuickFix>,
}

impl Recommendation {
    fn new(kind: &str, severity: Severity, title: &str) -> Self {
        Self {
            kind: kind.to_string(),
            severity,
            title: title.to_string(),
            message: String::new(),
            action: String::new(),
            impact: String::new(),
            quick_fixes: Vec::new(),
        }
    }

    fn message(mut self, message: impl Into<String>) -> Self {
        self.message = message.into();
        self
    }

    fn action(mut self, action: impl Into<String>) -> Self {
        self.action = action.into();
        self
    }

    fn impact(mut self, impact: impl Into<String>) -> Self {
        self.impact = impact.into();
        self
    }

    fn fix(mut self, fix: QuickFix) -> Self {
        self.quick_fixes.push(fix);
        self
    }
}

/// A recommendation rule.
pub type Rule = fn(&CrawlMetrics, &BudgetConfig) -> Option<Recommendation>;

/// Built-in rules in presentation order.
pub const DEFAULT_RULES: &[Rule] = &[
    cache_hit_rate_rule,
    content_diversity_rule,
    error_rate_rule,
    deep_crawl_rule,
    recrawl_rule,
    admin_crawl_rule,
    crawl_drop_rule,
];

pub fn cache_hit_rate_rule(m: &CrawlMetrics, _: &BudgetConfig) -> Option<Recommendation> {
    let misses = m.total_requests.saturating_sub(m.cache_hits);
    let saved_seconds = misses as u64 * m.avg_response_ms / 1000;
    let impact = format!(
        "{misses} requests rendered on demand; warming could save about {saved_seconds}s of render time and {} of bandwidth",
        format_bytes(m.total_bandwidth.saturating_mul(misses as u64) / m.total_requests.max(1) as u64),
    );
    let settings = QuickFix::navigate("cache_settings", "Cache Settings", "cache");

    if m.cache_hit_rate < 70.0 {
        Some(
            Recommendation::new("cache_performance", Severity::Warning, "Low Cache Hit Rate")
                .message(format!("Only {:.1}% of bot requests were served from cache", m.cache_hit_rate))
                .action("Enable cache warming for popular content")
                .impact(impact)
                .fix(settings),
        )
    } else if m.cache_hit_rate < 90.0 {
        Some(
            Recommendation::new("cache_performance", Severity::Medium, "Cache Could Be Warmer")
                .message(format!("{:.1}% of bot requests were served from cache", m.cache_hit_rate))
                .action("Consider pre-warming popular content")
                .impact(impact)
                .fix(settings),
        )
    } else {
        None
    }
}

pub fn content_diversity_rule(m: &CrawlMetrics, _: &BudgetConfig) -> Option<Recommendation> {
    let ratio = m.content_diversity * 100.0;
    if ratio > 80.0 {
        Some(
            Recommendation::new("content_diversity", Severity::Low, "Broad Content Coverage")
                .message(format!("{ratio:.0}% of crawled requests hit distinct pages"))
                .action("No action needed; bots are exploring most of the site")
                .impact("Low re-crawl rate keeps crawl budget spread across content"),
        )
    } else {
        Some(
            Recommendation::new("content_freshness", Severity::Low, "Bots Re-crawl Content Often")
                .message(format!("Only {ratio:.0}% of crawled requests hit distinct pages"))
                .action("Keep modification dates accurate so re-crawls pick up fresh content")
                .impact("Frequent re-crawls signal that bots treat the content as worth refreshing"),
        )
    }
}

pub fn error_rate_rule(m: &CrawlMetrics, config: &BudgetConfig) -> Option<Recommendation> {
    if m.error_count == 0 || m.error_rate < config.error_rate_threshold {
        return None;
    }
    let who = m.bot_type.as_deref().unwrap_or("Bots");
    let mut rec = Recommendation::new("errors", Severity::Warning, "Errors Consuming Crawl Budget")
        .message(format!(
            "{who} received {} non-200 responses ({} returned 404)",
            m.error_count, m.not_found_count
        ))
        .action("Set up 301 redirects or remove broken links")
        .impact(format!("{:.0}% of crawl budget wasted", m.error_rate * 100.0))
        .fix(QuickFix::filter_404(404));
    if let Some(url) = &m.top_error_url {
        rec = rec.fix(QuickFix::update_robots_txt(
            "disallow_broken",
            "Disallow failing URL",
            &format!("Disallow: {url}"),
        ));
    }
    Some(rec)
}

pub fn deep_crawl_rule(m: &CrawlMetrics, config: &BudgetConfig) -> Option<Recommendation> {
    (m.avg_pages_per_session >= config.deep_crawl_pages_per_session).then(|| {
        Recommendation::new("deep_crawl", Severity::Low, "Deep Crawling Detected")
            .message(format!(
                "Bots fetch {:.1} pages per session on average",
                m.avg_pages_per_session
            ))
            .action("Make sure internal links point bots at your most valuable content")
            .impact("Deep sessions spend more budget per visit")
    })
}

pub fn recrawl_rule(m: &CrawlMetrics, config: &BudgetConfig) -> Option<Recommendation> {
    let hotspot = m.top_recrawl.as_ref()?;
    let threshold = f64::from(m.period_days.max(1)) * config.recrawl_per_day_threshold;
    if (hotspot.crawls as f64) <= threshold {
        return None;
    }
    let wasted = hotspot.crawls as f64 / m.total_requests.max(1) as f64 * 100.0;
    Some(
        Recommendation::new("recrawling", Severity::Warning, "Excessive Recrawling Detected")
            .message(format!(
                "{} is recrawling {} {:.1}x per day",
                hotspot.bot_type, hotspot.url, hotspot.daily_crawls
            ))
            .action("Add longer cache headers or a robots.txt crawl-delay")
            .impact(format!("Wasting {wasted:.0}% of crawl budget"))
            .fix(QuickFix::navigate("cache_settings", "Cache Settings", "cache")),
    )
}

pub fn admin_crawl_rule(m: &CrawlMetrics, _: &BudgetConfig) -> Option<Recommendation> {
    if m.admin_crawls == 0 {
        return None;
    }
    let wasted = m.admin_crawls as f64 / m.total_requests.max(1) as f64 * 100.0;
    Some(
        Recommendation::new("admin_crawls", Severity::Warning, "Bots Crawling Admin Pages")
            .message(format!("{} crawls detected on admin/login pages", m.admin_crawls))
            .action("Block /wp-admin/ in robots.txt")
            .impact(format!("{wasted:.0}% of crawl budget wasted"))
            .fix(QuickFix::update_robots_txt(
                "block_admin",
                "Block /wp-admin/",
                "Disallow: /wp-admin/",
            )),
    )
}

pub fn crawl_drop_rule(m: &CrawlMetrics, config: &BudgetConfig) -> Option<Recommendation> {
    (m.crawl_drop_percentage > config.crawl_drop_percentage).then(|| {
        Recommendation::new("crawl_drop", Severity::Warning, "Crawl Rate Dropped Significantly")
            .message(format!(
                "Crawls dropped {:.0}% in the last {} days",
                m.crawl_drop_percentage,
                m.period_days / 2
            ))
            .action("Check server performance, response times, and robots.txt")
            .impact("Reduced visibility in AI platforms")
    })
}

fn format_bytes(bytes: u64) -> String {
    const UNITS: [&str; 4] = ["B", "KB", "MB", "GB"];
    let mut value = bytes as f64;
    let mut unit = 0;
    while value >= 1024.0 && unit < UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }
    if unit == 0 {
        format!("{bytes} B")
    } else {
        format!("{value:.1} {}", UNITS[unit])
    }
}

/// Output of one analysis call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BudgetReport {
    pub metrics: CrawlMetrics,
    pub recommendations: Vec<Recommendation>,
}

/// Runs the rule set over crawl metrics.
pub struct CrawlBudgetAnalyzer {
    config: BudgetConfig,
    sessions: SessionAggregator,
    rules: Vec<Rule>,
}

impl CrawlBudgetAnalyzer {
    pub fn new(config: BudgetConfig, sessions: SessionAggregator) -> Self {
        Self {
            config,
            sessions,
            rules: DEFAULT_RULES.to_vec(),
        }
    }

    /// Replace the rule set.
    pub fn with_rules(mut self, rules: Vec<Rule>) -> Self {
        self.rules = rules;
        self
    }

    pub fn metrics(
        &self,
        visits: &[BotVisit],
        bot_type: Option<&str>,
        period_days: u32,
        now: DateTime<Utc>,
    ) -> CrawlMetrics {
        CrawlMetrics::compute(visits, bot_type, period_days, now, &self.sessions)
    }

    /// Evaluate every rule against pre-computed metrics. An empty window
    /// yields no recommendations.
    pub fn recommend(&self, metrics: &CrawlMetrics) -> Vec<Recommendation> {
        if metrics.total_requests == 0 {
            return Vec::new();
        }
        self.rules
            .iter()
            .filter_map(|rule| rule(metrics, &self.config))
            .collect()
    }

    pub fn analyze(
        &self,
        visits: &[BotVisit],
        bot_type: Option<&str>,
        period_days: u32,
        now: DateTime<Utc>,
    ) -> BudgetReport {
        let metrics = self.metrics(visits, bot_type, period_days, now);
        let recommendations = self.recommend(&metrics);
        debug!(
            bot_type = bot_type.unwrap_or("all"),
            period_days,
            total_requests = metrics.total_requests,
            recommendations = recommendations.len(),
            "Crawl budget analyzed"
        );
        BudgetReport {
            metrics,
            recommendations,
        }
    }
}

impl Default for CrawlBudgetAnalyzer {
    fn default() -> Self {
        Self::new(BudgetConfig::default(), SessionAggregator::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use std::net::IpAddr;

    fn now() -> DateTime<Utc> {
        DateTime::parse_from_rfc3339("2024-05-10T12:00:00Z").unwrap().with_timezone(&Utc)
    }

    fn crawl(url: &str, minutes_ago: i64, hit: bool) -> BotVisit {
        let ip: IpAddr = "10.0.0.1".parse().unwrap();
        let mut v = BotVisit::crawl(now() - Duration::minutes(minutes_ago), "GPTBot", ip, url);
        v.cache_status = if hit { CacheStatus::Hit } else { CacheStatus::Miss };
        v.response_time_ms = 120;
        v.response_size_bytes = 2048;
        v
    }

    /// `n` visits, `hits` of them cache hits, spread one hour apart.
    fn dataset(n: usize, hits: usize) -> Vec<BotVisit> {
        (0..n)
            .map(|i| crawl(&format!("/post-{i}"), i as i64 * 60, i < hits))
            .collect()
    }

    fn kinds(report: &BudgetReport) -> Vec<&str> {
        report.recommendations.iter().map(|r| r.kind.as_str()).collect()
    }

    #[test]
    fn test_low_hit_rate_warns() {
        let analyzer = CrawlBudgetAnalyzer::default();
        let report = analyzer.analyze(&dataset(20, 13), None, 7, now());
        assert_eq!(report.metrics.cache_hit_rate, 65.0);
        let rec = report
            .recommendations
            .iter()
            .find(|r| r.kind == "cache_performance")
            .unwrap();
        assert_eq!(rec.severity, Severity::Warning);
        assert!(rec.action.contains("cache warming"));
    }

    #[test]
    fn test_medium_and_high_hit_rate() {
        let analyzer = CrawlBudgetAnalyzer::default();
        let medium = analyzer.analyze(&dataset(20, 16), None, 7, now());
        let rec = medium
            .recommendations
            .iter()
            .find(|r| r.kind == "cache_performance")
            .unwrap();
        assert_eq!(rec.severity, Severity::Medium);

        let high = analyzer.analyze(&dataset(20, 19), None, 7, now());
        assert_eq!(high.metrics.cache_hit_rate, 95.0);
        assert!(!kinds(&high).contains(&"cache_performance"));
    }

    #[test]
    fn test_diversity_notes() {
        let analyzer = CrawlBudgetAnalyzer::default();
        let diverse = analyzer.analyze(&dataset(10, 10), None, 7, now());
        assert!(kinds(&diverse).contains(&"content_diversity"));

        let repeated: Vec<BotVisit> = (0..10).map(|i| crawl("/same", i * 60, true)).collect();
        let report = analyzer.analyze(&repeated, None, 7, now());
        assert!(kinds(&report).contains(&"content_freshness"));
    }

    #[test]
    fn test_error_rate_quick_fixes() {
        let analyzer = CrawlBudgetAnalyzer::default();
        let mut visits = dataset(10, 10);
        visits[0].status_code = 404;
        visits[1].status_code = 404;
        let report = analyzer.analyze(&visits, Some("GPTBot"), 7, now());
        let rec = report.recommendations.iter().find(|r| r.kind == "errors").unwrap();
        assert_eq!(rec.severity, Severity::Warning);
        let actions: Vec<_> = rec.quick_fixes.iter().map(|f| f.action).collect();
        assert!(actions.contains(&QuickFixAction::Filter404));
        let robots = rec
            .quick_fixes
            .iter()
            .find(|f| f.action == QuickFixAction::UpdateRobotsTxt)
            .unwrap();
        assert!(robots.requires_confirmation);
    }

    #[test]
    fn test_deep_crawl_and_admin_pages() {
        let analyzer = CrawlBudgetAnalyzer::default();
        let mut visits: Vec<BotVisit> = (0..6).map(|i| crawl(&format!("/p{i}"), i, true)).collect();
        visits.push(crawl("/wp-admin/options.php", 7, true));
        let report = analyzer.analyze(&visits, None, 7, now());
        assert!(report.metrics.avg_pages_per_session >= 5.0);
        assert!(kinds(&report).contains(&"deep_crawl"));

        let admin = report
            .recommendations
            .iter()
            .find(|r| r.kind == "admin_crawls")
            .unwrap();
        assert_eq!(admin.quick_fixes[0].data["rule"], "Disallow: /wp-admin/");
        assert!(admin.quick_fixes[0].requires_confirmation);
    }

    #[test]
    fn test_recrawl_and_drop() {
        let analyzer = CrawlBudgetAnalyzer::default();
        // 80 crawls of one URL in the older half, 10 in the recent half
        let mut visits: Vec<BotVisit> = (0..80)
            .map(|i| crawl("/hot", 4 * 24 * 60 + i * 30, true))
            .collect();
        visits.extend((0..10).map(|i| crawl("/hot", i * 30, true)));
        let report = analyzer.analyze(&visits, None, 7, now());

        let hotspot = report.metrics.top_recrawl.as_ref().unwrap();
        assert_eq!(hotspot.crawls, 90);
        assert!(kinds(&report).contains(&"recrawling"));
        assert!(report.metrics.crawl_drop_percentage > 30.0);
        assert!(kinds(&report).contains(&"crawl_drop"));
    }

    #[test]
    fn test_rules_are_independent() {
        let metrics = CrawlMetrics {
            total_requests: 10,
            cache_hits: 9,
            cache_hit_rate: 90.0,
            content_diversity: 1.0,
            ..Default::default()
        };
        let config = BudgetConfig::default();
        assert!(cache_hit_rate_rule(&metrics, &config).is_none());
        assert!(content_diversity_rule(&metrics, &config).is_some());
        assert!(admin_crawl_rule(&metrics, &config).is_none());
    }

    #[test]
    fn test_empty_window() {
        let report = CrawlBudgetAnalyzer::default().analyze(&[], None, 7, now());
        assert_eq!(report.metrics.total_requests, 0);
        assert!(report.recommendations.is_empty());
    }

    #[test]
    fn test_oversized_period_covers_everything() {
        let visits = dataset(5, 1);
        let metrics = CrawlBudgetAnalyzer::default().metrics(&visits, None, u32::MAX, now());
        assert_eq!(metrics.total_requests, 5);
        assert_eq!(metrics.recent_crawls, 5);
        assert_eq!(metrics.older_crawls, 0);
    }

    #[test]
    fn test_period_days() {
        assert_eq!(BudgetPeriod::Week.days(), 7);
        assert_eq!("month".parse::<BudgetPeriod>(), Ok(BudgetPeriod::Month));
    }
}
