//! Configuration types for the crawl analytics agent.

use crate::error::{CrawlError, CrawlResult};
use crate::priority::Priority;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::time::Duration;

/// Main configuration for the crawl analytics agent.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct CrawlAnalyticsConfig {
    /// Bot recognition and priority settings
    pub bots: BotConfig,

    /// Session windowing settings
    pub sessions: SessionConfig,

    /// Artifact cache settings
    pub cache: CacheConfig,

    /// Cache warmup settings
    pub warmup: WarmupConfig,

    /// Rate limit observation settings
    pub rate_limit: RateLimitConfig,

    /// Crawl budget analysis settings
    pub budget: BudgetConfig,

    /// IP verification settings
    pub verification: VerificationConfig,
}

impl CrawlAnalyticsConfig {
    /// Check cross-field invariants.
    pub fn validate(&self) -> CrawlResult<()> {
        self.cache.validate()?;
        if self.sessions.gap().is_none() {
            return Err(CrawlError::Config(format!(
                "sessions.session_gap_seconds must be positive and in range, got {}",
                self.sessions.session_gap_seconds
            )));
        }
        if self.rate_limit.window_seconds == 0 {
            return Err(CrawlError::Config(
                "rate_limit.window_seconds must be greater than zero".to_string(),
            ));
        }
        if self.warmup.batch_size == 0 {
            return Err(CrawlError::Config(
                "warmup.batch_size must be greater than zero".to_string(),
            ));
        }
        if self.budget.period_days == 0 {
            return Err(CrawlError::Config(
                "budget.period_days must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }
}

/// Bot recognition settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BotConfig {
    /// Classify unrecognized automated traffic as "Unknown Bot"
    pub track_unknown: bool,

    /// Priority overrides keyed by bot type
    pub bot_priorities: HashMap<String, Priority>,

    /// Operator-supplied patterns, checked before the built-in table
    pub custom_bot_patterns: Vec<CustomBotPattern>,

    /// Bot types that are always denied
    pub blocked_bots: Vec<String>,
}

impl Default for BotConfig {
    fn default() -> Self {
        Self {
            track_unknown: false,
            bot_priorities: HashMap::new(),
            custom_bot_patterns: vec![],
            blocked_bots: vec![],
        }
    }
}

/// A custom user-agent pattern bound to a bot name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CustomBotPattern {
    /// Display name for matches
    pub name: String,

    /// Regular expression matched against the user-agent
    pub pattern: String,
}

/// Session windowing settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Maximum gap between consecutive visits of one session
    pub session_gap_seconds: i64,
}

impl SessionConfig {
    /// The session gap, or `None` when it is not a positive duration that
    /// fits the time arithmetic.
    pub fn gap(&self) -> Option<chrono::Duration> {
        chrono::Duration::try_seconds(self.session_gap_seconds)
            .filter(|gap| *gap > chrono::Duration::zero())
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            session_gap_seconds: 1800,
        }
    }
}

/// Artifact cache settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// TTL for high priority bots
    pub high_ttl_seconds: u64,

    /// TTL for medium priority bots
    pub medium_ttl_seconds: u64,

    /// TTL for low priority bots
    pub low_ttl_seconds: u64,

    /// Priority recorded on entries produced by warmup and regeneration
    pub warmup_priority: Priority,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            high_ttl_seconds: 3600,
            medium_ttl_seconds: 6 * 3600,
            low_ttl_seconds: 24 * 3600,
            warmup_priority: Priority::Medium,
        }
    }
}

impl CacheConfig {
    /// TTL for a priority tier. Blocked bots never get a cache entry.
    pub fn ttl(&self, priority: Priority) -> Option<Duration> {
        let seconds = match priority {
            Priority::High => self.high_ttl_seconds,
            Priority::Medium => self.medium_ttl_seconds,
            Priority::Low => self.low_ttl_seconds,
            Priority::Blocked => return None,
        };
        Some(Duration::from_secs(seconds))
    }

    /// Higher priority must never outlive lower priority.
    pub fn validate(&self) -> CrawlResult<()> {
        if self.high_ttl_seconds > self.medium_ttl_seconds
            || self.medium_ttl_seconds > self.low_ttl_seconds
        {
            return Err(CrawlError::Config(format!(
                "cache TTLs must satisfy high <= medium <= low (got {}/{}/{})",
                self.high_ttl_seconds, self.medium_ttl_seconds, self.low_ttl_seconds
            )));
        }
        if self.warmup_priority.is_blocked() {
            return Err(CrawlError::Config(
                "cache.warmup_priority cannot be blocked".to_string(),
            ));
        }
        Ok(())
    }
}

/// Cache warmup settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WarmupConfig {
    /// Items processed per batch
    pub batch_size: usize,
}

impl Default for WarmupConfig {
    fn default() -> Self {
        Self { batch_size: 10 }
    }
}

/// Rate limit observation settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RateLimitConfig {
    /// Fixed window length in seconds
    pub window_seconds: u64,

    /// Requests allowed per window before a violation is recorded
    pub max_requests: u32,

    /// Violations retained in memory
    pub max_violations: usize,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            window_seconds: 60,
            max_requests: 60,
            max_violations: 1000,
        }
    }
}

/// Crawl budget analysis settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BudgetConfig {
    /// Default analysis window in days
    pub period_days: u32,

    /// Share of non-200 responses (0.0-1.0) that triggers a warning
    pub error_rate_threshold: f64,

    /// Pages per session at which deep crawling is reported
    pub deep_crawl_pages_per_session: f64,

    /// Crawls per URL per day considered excessive
    pub recrawl_per_day_threshold: f64,

    /// Drop between period halves (percent) that triggers a warning
    pub crawl_drop_percentage: f64,
}

impl Default for BudgetConfig {
    fn default() -> Self {
        Self {
            period_days: 7,
            error_rate_threshold: 0.10,
            deep_crawl_pages_per_session: 5.0,
            recrawl_per_day_threshold: 10.0,
            crawl_drop_percentage: 30.0,
        }
    }
}

/// IP verification settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct VerificationConfig {
    /// Run IP verification at all
    pub enabled: bool,

    /// Fall back to reverse DNS when no range matches
    pub reverse_dns: bool,

    /// Verification cache size
    pub cache_size: u64,

    /// Verification cache TTL in seconds
    pub cache_ttl_seconds: u64,

    /// Additional CIDR ranges keyed by bot type
    pub custom_ip_ranges: HashMap<String, Vec<String>>,
}

impl Default for VerificationConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            reverse_dns: false,
            cache_size: 10_000,
            cache_ttl_seconds: 3600,
            custom_ip_ranges: HashMap::new(),
        }
    }
}
