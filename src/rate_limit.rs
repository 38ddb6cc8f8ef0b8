//! Observational per-fingerprint rate tracking.
//!
//! Each fingerprint gets a fixed window that opens on its first request and
//! is superseded once the window length has elapsed. Requests beyond the
//! threshold are recorded as violations. Nothing here throttles or denies.

use crate::config::RateLimitConfig;
use crate::visits::Fingerprint;
use chrono::{DateTime, Duration, Utc};
use dashmap::DashMap;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::warn;

/// Counter for the current window of one fingerprint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RateLimitRecord {
    pub fingerprint: Fingerprint,
    pub window_start: DateTime<Utc>,
    pub count: u32,
}

/// Outcome of recording one request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RateLimitStatus {
    pub count: u32,
    pub limit: u32,
    pub window_start: DateTime<Utc>,
    pub exceeded: bool,
}

/// A request that arrived over the threshold.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RateLimitViolation {
    pub fingerprint: Fingerprint,
    pub url: String,
    pub timestamp: DateTime<Utc>,
    pub count: u32,
    pub limit: u32,
}

/// Violations grouped by bot type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ViolationStats {
    pub bot_type: String,
    pub violations: usize,
    pub unique_ips: usize,
    pub last_violation: DateTime<Utc>,
}

pub struct RateLimiter {
    windows: DashMap<Fingerprint, RateLimitRecord>,
    violations: Mutex<VecDeque<RateLimitViolation>>,
    window: Duration,
    max_requests: u32,
    max_violations: usize,
    request_counter: AtomicU64,
}

impl RateLimiter {
    pub fn new(config: &RateLimitConfig) -> Self {
        Self {
            windows: DashMap::new(),
            violations: Mutex::new(VecDeque::new()),
            window: Duration::seconds(
                i64::try_from(config.window_seconds)
                    .unwrap_or(i64::MAX)
                    .min(i64::MAX / 1000),
            ),
            max_requests: config.max_requests,
            max_violations: config.max_violations,
            request_counter: AtomicU64::new(0),
        }
    }

    /// Count a request and record a violation when over the threshold.
    pub fn record(&self, fingerprint: &Fingerprint, url: &str, at: DateTime<Utc>) -> RateLimitStatus {
        self.maybe_cleanup(at);

        let (count, window_start) = {
            let mut record = self
                .windows
                .entry(fingerprint.clone())
                .or_insert_with(|| RateLimitRecord {
                    fingerprint: fingerprint.clone(),
                    window_start: at,
                    count: 0,
                });
            if at - record.window_start >= self.window {
                record.window_start = at;
                record.count = 0;
            }
            record.count = record.count.saturating_add(1);
            (record.count, record.window_start)
        };

        let exceeded = count > self.max_requests;
        if exceeded {
            warn!(
                bot_type = %fingerprint.bot_type,
                ip = %fingerprint.ip,
                url,
                count,
                limit = self.max_requests,
                "Rate limit exceeded"
            );
            self.push_violation(RateLimitViolation {
                fingerprint: fingerprint.clone(),
                url: url.to_string(),
                timestamp: at,
                count,
                limit: self.max_requests,
            });
        }

        RateLimitStatus {
            count,
            limit: self.max_requests,
            window_start,
            exceeded,
        }
    }

    /// Current window for a fingerprint, if any.
    pub fn current(&self, fingerprint: &Fingerprint) -> Option<RateLimitRecord> {
        self.windows.get(fingerprint).map(|r| r.clone())
    }

    /// Most recent `limit` violations, newest first.
    pub fn violations(&self, limit: usize) -> Vec<RateLimitViolation> {
        let mut all: Vec<RateLimitViolation> = self.violations.lock().iter().cloned().collect();
        all.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
        all.truncate(limit);
        all
    }

    /// Violation counts per bot type, most violations first.
    pub fn violation_stats(&self) -> Vec<ViolationStats> {
        let violations = self.violations.lock();
        let mut grouped: HashMap<&str, (usize, HashSet<std::net::IpAddr>, DateTime<Utc>)> =
            HashMap::new();
        for v in violations.iter() {
            let entry = grouped
                .entry(v.fingerprint.bot_type.as_str())
                .or_insert_with(|| (0, HashSet::new(), v.timestamp));
            entry.0 += 1;
            entry.1.insert(v.fingerprint.ip);
            entry.2 = entry.2.max(v.timestamp);
        }
        let mut stats: Vec<ViolationStats> = grouped
            .into_iter()
            .map(|(bot_type, (violations, ips, last))| ViolationStats {
                bot_type: bot_type.to_string(),
                violations,
                unique_ips: ips.len(),
                last_violation: last,
            })
            .collect();
        stats.sort_by(|a, b| b.violations.cmp(&a.violations).then_with(|| a.bot_type.cmp(&b.bot_type)));
        stats
    }

    /// Number of fingerprints with an open window.
    pub fn tracked(&self) -> usize {
        self.windows.len()
    }

    fn push_violation(&self, violation: RateLimitViolation) {
        let mut violations = self.violations.lock();
        if violations.len() >= self.max_violations {
            violations.pop_front();
        }
        if self.max_violations > 0 {
            violations.push_back(violation);
        }
    }

    /// Drop elapsed windows periodically.
    fn maybe_cleanup(&self, now: DateTime<Utc>) {
        let count = self.request_counter.fetch_add(1, Ordering::Relaxed);

        // Cleanup every 1000 requests
        if count % 1000 == 999 {
            self.windows.retain(|_, r| now - r.window_start < self.window);
        }
    }
}

impl Default for RateLimiter {
    fn default() -> Self {
        Self::new(&RateLimitConfig::default())
    }
}
