//! Visit events and the append-only visit store seam.

use crate::classifier::{VerificationMethod, VerificationStatus};
use crate::error::CrawlResult;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::net::IpAddr;

/// Representation served to the bot.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContentType {
    Html,
    #[default]
    Markdown,
}

/// Whether the response came from the artifact cache.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CacheStatus {
    Hit,
    #[default]
    Miss,
}

/// Kind of traffic a visit represents.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TrafficType {
    /// A bot fetching content
    #[default]
    BotCrawl,
    /// A human arriving from an AI platform's answer
    CitationClick,
}

/// Content quality signals captured alongside a visit.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ContentMetrics {
    pub word_count: u32,
    pub heading_count: u32,
    pub image_count: u32,
    pub has_schema: bool,
    /// Days since the content was last modified
    pub freshness_days: u32,
}

/// One recorded visit. Immutable once appended.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BotVisit {
    pub timestamp: DateTime<Utc>,
    pub bot_type: String,
    pub bot_name: String,
    #[serde(default)]
    pub user_agent: String,
    pub ip: IpAddr,
    #[serde(default)]
    pub country_code: Option<String>,
    pub url: String,
    #[serde(default)]
    pub content_id: Option<u64>,
    #[serde(default)]
    pub content_type: ContentType,
    #[serde(default)]
    pub cache_status: CacheStatus,
    #[serde(default = "default_status_code")]
    pub status_code: u16,
    #[serde(default)]
    pub response_time_ms: u64,
    #[serde(default)]
    pub response_size_bytes: u64,
    #[serde(default)]
    pub ip_verified: VerificationStatus,
    #[serde(default)]
    pub ip_verification_method: VerificationMethod,
    #[serde(default)]
    pub traffic_type: TrafficType,
    #[serde(default)]
    pub ai_platform: Option<String>,
    #[serde(default)]
    pub search_query: Option<String>,
    #[serde(default)]
    pub content_metrics: Option<ContentMetrics>,
}

fn default_status_code() -> u16 {
    200
}

impl BotVisit {
    /// A bot crawl visit with neutral defaults for the optional fields.
    pub fn crawl(
        timestamp: DateTime<Utc>,
        bot_type: impl Into<String>,
        ip: IpAddr,
        url: impl Into<String>,
    ) -> Self {
        let bot_type = bot_type.into();
        Self {
            timestamp,
            bot_name: bot_type.clone(),
            bot_type,
            user_agent: String::new(),
            ip,
            country_code: None,
            url: url.into(),
            content_id: None,
            content_type: ContentType::Markdown,
            cache_status: CacheStatus::Miss,
            status_code: 200,
            response_time_ms: 0,
            response_size_bytes: 0,
            ip_verified: VerificationStatus::Unverified,
            ip_verification_method: VerificationMethod::None,
            traffic_type: TrafficType::BotCrawl,
            ai_platform: None,
            search_query: None,
            content_metrics: None,
        }
    }

    /// Fingerprint key used to group visits into sessions.
    pub fn fingerprint(&self) -> Fingerprint {
        Fingerprint {
            bot_type: self.bot_type.clone(),
            ip: self.ip,
        }
    }
}

/// `(bot_type, ip)` pair identifying one crawler instance.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Fingerprint {
    pub bot_type: String,
    pub ip: IpAddr,
}

impl std::fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}@{}", self.bot_type, self.ip)
    }
}

/// Query filters. Unset fields match everything.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct VisitFilters {
    pub bot_type: Option<String>,
    pub content_type: Option<ContentType>,
    pub cache_status: Option<CacheStatus>,
    pub traffic_type: Option<TrafficType>,
    /// Inclusive lower bound
    pub since: Option<DateTime<Utc>>,
    /// Exclusive upper bound
    pub until: Option<DateTime<Utc>>,
    /// Case-insensitive substring over url, bot name and user-agent
    pub search: Option<String>,
}

impl VisitFilters {
    pub fn for_bot(bot_type: impl Into<String>) -> Self {
        Self {
            bot_type: Some(bot_type.into()),
            ..Default::default()
        }
    }

    pub fn with_traffic(mut self, traffic_type: TrafficType) -> Self {
        self.traffic_type = Some(traffic_type);
        self
    }

    pub fn since(mut self, since: DateTime<Utc>) -> Self {
        self.since = Some(since);
        self
    }

    pub fn matches(&self, visit: &BotVisit) -> bool {
        if let Some(bot_type) = &self.bot_type {
            if &visit.bot_type != bot_type {
                return false;
            }
        }
        if self.content_type.is_some_and(|c| c != visit.content_type) {
            return false;
        }
        if self.cache_status.is_some_and(|c| c != visit.cache_status) {
            return false;
        }
        if self.traffic_type.is_some_and(|t| t != visit.traffic_type) {
            return false;
        }
        if self.since.is_some_and(|since| visit.timestamp < since) {
            return false;
        }
        if self.until.is_some_and(|until| visit.timestamp >= until) {
            return false;
        }
        if let Some(search) = &self.search {
            let needle = search.to_lowercase();
            let hit = visit.url.to_lowercase().contains(&needle)
                || visit.bot_name.to_lowercase().contains(&needle)
                || visit.user_agent.to_lowercase().contains(&needle);
            if !hit {
                return false;
            }
        }
        true
    }
}

/// Durable, append-only log of visits.
///
/// Readers see an eventually-consistent view: visits appended while a query
/// runs may or may not be included.
#[async_trait]
pub trait VisitStore: Send + Sync {
    /// Append a visit.
    async fn insert(&self, visit: BotVisit) -> CrawlResult<()>;

    /// Return visits matching the filters, in insertion order.
    async fn query(&self, filters: &VisitFilters) -> CrawlResult<Vec<BotVisit>>;
}

/// In-process visit store.
#[derive(Debug, Default)]
pub struct MemoryVisitStore {
    visits: RwLock<Vec<BotVisit>>,
}

impl MemoryVisitStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a store from existing visits.
    pub fn with_visits(visits: Vec<BotVisit>) -> Self {
        Self {
            visits: RwLock::new(visits),
        }
    }

    pub fn len(&self) -> usize {
        self.visits.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.visits.read().is_empty()
    }
}

#[async_trait]
impl VisitStore for MemoryVisitStore {
    async fn insert(&self, visit: BotVisit) -> CrawlResult<()> {
        self.visits.write().push(visit);
        Ok(())
    }

    async fn query(&self, filters: &VisitFilters) -> CrawlResult<Vec<BotVisit>> {
        Ok(self
            .visits
            .read()
            .iter()
            .filter(|v| filters.matches(v))
            .cloned()
            .collect())
    }
}
