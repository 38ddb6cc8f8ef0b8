//! Session windowing over recorded visits.
//!
//! A session is a maximal run of one fingerprint's visits in which every
//! consecutive gap is at most the configured session gap. Sessions partition
//! the visits: each visit belongs to exactly one session and sessions never
//! overlap.

use crate::config::SessionConfig;
use crate::visits::{BotVisit, Fingerprint};
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::str::FromStr;

/// A derived crawl session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub page_count: usize,
}

impl Session {
    fn open(at: DateTime<Utc>) -> Self {
        Self {
            start: at,
            end: at,
            page_count: 1,
        }
    }

    /// `end - start`.
    pub fn duration(&self) -> Duration {
        self.end - self.start
    }

    /// Mean gap between requests in seconds. Undefined for one-page sessions.
    pub fn mean_interval_seconds(&self) -> Option<f64> {
        (self.page_count > 1)
            .then(|| self.duration().num_milliseconds() as f64 / 1000.0 / (self.page_count - 1) as f64)
    }
}

/// Split timestamps into sessions. Input is sorted here, so any order works.
pub fn split_sessions(timestamps: &[DateTime<Utc>], gap: Duration) -> Vec<Session> {
    let mut sorted = timestamps.to_vec();
    sorted.sort_unstable();

    let mut sessions: Vec<Session> = Vec::new();
    for at in sorted {
        match sessions.last_mut() {
            Some(current) if at - current.end <= gap => {
                current.end = at;
                current.page_count += 1;
            }
            _ => sessions.push(Session::open(at)),
        }
    }
    sessions
}

/// Per-fingerprint session statistics.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FingerprintStats {
    pub fingerprint: Fingerprint,
    pub bot_name: String,
    pub total_visits: usize,
    pub total_sessions: usize,
    pub avg_pages_per_session: f64,
    pub avg_session_duration_seconds: f64,
    /// `None` when every session has a single page
    pub avg_request_interval_seconds: Option<f64>,
    pub last_seen: DateTime<Utc>,
}

impl FingerprintStats {
    fn from_sessions(
        fingerprint: Fingerprint,
        bot_name: String,
        sessions: &[Session],
    ) -> Option<Self> {
        let last_seen = sessions.last()?.end;
        let total_sessions = sessions.len();
        let total_visits: usize = sessions.iter().map(|s| s.page_count).sum();
        let durations: f64 = sessions
            .iter()
            .map(|s| s.duration().num_milliseconds() as f64 / 1000.0)
            .sum();
        let intervals: Vec<f64> = sessions.iter().filter_map(Session::mean_interval_seconds).collect();

        Some(Self {
            fingerprint,
            bot_name,
            total_visits,
            total_sessions,
            avg_pages_per_session: total_visits as f64 / total_sessions as f64,
            avg_session_duration_seconds: durations / total_sessions as f64,
            avg_request_interval_seconds: mean(&intervals),
            last_seen,
        })
    }
}

/// Aggregate session metrics across every fingerprint.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SessionAnalytics {
    pub total_fingerprints: usize,
    pub total_sessions: usize,
    pub avg_visits_per_fingerprint: f64,
    pub avg_pages_per_session: f64,
    pub avg_session_duration_seconds: f64,
    pub avg_request_interval_seconds: Option<f64>,
}

/// Metric used to rank fingerprints.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionMetric {
    PagesPerSession,
    SessionDuration,
    RequestInterval,
    Recency,
}

impl FromStr for SessionMetric {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pages_per_session" => Ok(Self::PagesPerSession),
            "session_duration" => Ok(Self::SessionDuration),
            "request_interval" => Ok(Self::RequestInterval),
            "recency" => Ok(Self::Recency),
            other => Err(format!("unknown session metric: {other}")),
        }
    }
}

/// Groups visits by fingerprint and derives session statistics.
#[derive(Debug, Clone)]
pub struct SessionAggregator {
    gap: Duration,
}

impl SessionAggregator {
    /// An out-of-range gap falls back to the default of 30 minutes;
    /// `CrawlAnalyticsConfig::validate` rejects such configs up front.
    pub fn new(config: &SessionConfig) -> Self {
        Self {
            gap: config.gap().unwrap_or_else(|| Duration::minutes(30)),
        }
    }

    pub fn gap(&self) -> Duration {
        self.gap
    }

    /// Sessions per fingerprint.
    pub fn sessions(&self, visits: &[BotVisit]) -> BTreeMap<Fingerprint, Vec<Session>> {
        group_by_fingerprint(visits)
            .into_iter()
            .map(|(fingerprint, group)| {
                let sessions = split_sessions(&group.timestamps, self.gap);
                (fingerprint, sessions)
            })
            .collect()
    }

    /// Statistics for every fingerprint, ordered by fingerprint.
    pub fn fingerprint_stats(&self, visits: &[BotVisit]) -> Vec<FingerprintStats> {
        group_by_fingerprint(visits)
            .into_iter()
            .filter_map(|(fingerprint, group)| {
                let sessions = split_sessions(&group.timestamps, self.gap);
                FingerprintStats::from_sessions(fingerprint, group.bot_name, &sessions)
            })
            .collect()
    }

    /// Global metrics across all fingerprints.
    pub fn analytics(&self, visits: &[BotVisit]) -> SessionAnalytics {
        summarize(&self.fingerprint_stats(visits))
    }

    /// Top `limit` fingerprints by `metric`, descending.
    pub fn top_by_metric(
        &self,
        visits: &[BotVisit],
        metric: SessionMetric,
        limit: usize,
    ) -> Vec<FingerprintStats> {
        let mut stats = self.fingerprint_stats(visits);
        stats.sort_by(|a, b| match metric {
            SessionMetric::PagesPerSession => b.avg_pages_per_session.total_cmp(&a.avg_pages_per_session),
            SessionMetric::SessionDuration => b
                .avg_session_duration_seconds
                .total_cmp(&a.avg_session_duration_seconds),
            SessionMetric::RequestInterval => interval_key(b).total_cmp(&interval_key(a)),
            SessionMetric::Recency => b.last_seen.cmp(&a.last_seen),
        });
        stats.truncate(limit);
        stats
    }
}

impl Default for SessionAggregator {
    fn default() -> Self {
        Self::new(&SessionConfig::default())
    }
}

struct FingerprintGroup {
    bot_name: String,
    timestamps: Vec<DateTime<Utc>>,
}

fn group_by_fingerprint(visits: &[BotVisit]) -> BTreeMap<Fingerprint, FingerprintGroup> {
    let mut groups: BTreeMap<Fingerprint, FingerprintGroup> = BTreeMap::new();
    for visit in visits {
        groups
            .entry(visit.fingerprint())
            .or_insert_with(|| FingerprintGroup {
                bot_name: visit.bot_name.clone(),
                timestamps: Vec::new(),
            })
            .timestamps
            .push(visit.timestamp);
    }
    groups
}

fn summarize(stats: &[FingerprintStats]) -> SessionAnalytics {
    if stats.is_empty() {
        return SessionAnalytics::default();
    }
    let n = stats.len() as f64;
    let total_visits: usize = stats.iter().map(|s| s.total_visits).sum();
    let intervals: Vec<f64> = stats
        .iter()
        .filter_map(|s| s.avg_request_interval_seconds)
        .collect();

    SessionAnalytics {
        total_fingerprints: stats.len(),
        total_sessions: stats.iter().map(|s| s.total_sessions).sum(),
        avg_visits_per_fingerprint: total_visits as f64 / n,
        avg_pages_per_session: stats.iter().map(|s| s.avg_pages_per_session).sum::<f64>() / n,
        avg_session_duration_seconds: stats
            .iter()
            .map(|s| s.avg_session_duration_seconds)
            .sum::<f64>()
            / n,
        avg_request_interval_seconds: mean(&intervals),
    }
}

// Fingerprints without an interval sort last.
fn interval_key(stats: &FingerprintStats) -> f64 {
    stats.avg_request_interval_seconds.unwrap_or(f64::NEG_INFINITY)
}

fn mean(values: &[f64]) -> Option<f64> {
    (!values.is_empty()).then(|| values.iter().sum::<f64>() / values.len() as f64)
}
