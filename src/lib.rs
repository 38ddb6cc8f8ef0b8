//! Crawl Analytics Agent for Zentinel
//!
//! Recognizes AI crawlers, serves them cached rendered content with a
//! freshness tier per bot, and records every visit for analysis.
//!
//! # Features
//!
//! - First-match-wins bot classification with priority tiers and IP verification
//! - Priority-tiered artifact cache with batch warmup
//! - Session windowing per `(bot_type, ip)` fingerprint
//! - Crawl budget metrics and rule-based recommendations
//! - Citation click tracking and citation-to-crawl analysis
//! - Observational per-fingerprint rate tracking
//!
//! # Example
//!
//! ```ignore
//! use zentinel_agent_crawl_analytics::{BotRequest, CrawlAnalyticsAgent, MemoryVisitStore};
//!
//! let agent = CrawlAnalyticsAgent::new(config, Arc::new(MemoryVisitStore::new()), renderer, source)?;
//! let outcome = agent.on_request(&BotRequest::new(user_agent, ip, "/guide")).await?;
//! ```

pub mod agent;
pub mod analytics;
pub mod budget;
pub mod cache;
pub mod citation;
pub mod classifier;
pub mod clock;
pub mod config;
pub mod error;
pub mod priority;
pub mod rate_limit;
pub mod sessions;
pub mod visits;
pub mod warmup;

pub use agent::{BotRequest, CitationClick, CrawlAnalyticsAgent, RequestOutcome};
pub use cache::{ArtifactCache, CacheKey};
pub use classifier::BotClassifier;
pub use clock::{Clock, ManualClock, SystemClock};
pub use config::CrawlAnalyticsConfig;
pub use error::{ActionResult, CrawlError, CrawlResult};
pub use priority::{Classification, Decision, Priority};
pub use visits::{BotVisit, MemoryVisitStore, VisitFilters, VisitStore};
pub use warmup::{ContentSource, Renderer, StartOutcome, WarmupOrchestrator};
