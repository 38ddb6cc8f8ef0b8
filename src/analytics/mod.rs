//! Read-side aggregations over recorded visits.
//!
//! Every function here is pure: it takes a slice of visits already pulled
//! from the visit store (and a reference time where windows matter) and
//! returns a serializable report.

pub mod citations;

pub use citations::{
    citation_rate, citation_to_crawl_ratio, content_performance, optimal_content_length,
    CitationBand, CitationRatio, ContentPerformance, ContentProfile, LengthBucket,
    OptimalContentLength,
};

use crate::classifier::VerificationStatus;
use crate::visits::{BotVisit, CacheStatus};
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap, HashSet};
use std::str::FromStr;

/// Dashboard headline numbers.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Summary {
    pub total_visits: usize,
    pub unique_pages: usize,
    pub unique_bots: usize,
    /// Percent of visits served from cache, one decimal
    pub cache_hit_rate: f64,
    pub avg_response_time_ms: u64,
    pub total_bandwidth_bytes: u64,
    pub visits_last_24h: usize,
    pub visits_last_7d: usize,
    pub visits_last_30d: usize,
    /// Change of the last 24h against the 24h before, in percent
    pub trend_percentage: f64,
    pub ip_verified_count: usize,
    pub ip_failed_count: usize,
    pub ip_verified_percentage: f64,
}

/// Visit count per bot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BotBreakdown {
    pub bot_type: String,
    pub bot_name: String,
    pub count: usize,
}

/// A frequently visited URL.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TopPage {
    pub url: String,
    pub visits: usize,
    pub unique_bots: usize,
    pub avg_response_time_ms: u64,
}

/// Bucket width for time series.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TimeBucket {
    Hour,
    #[default]
    Day,
    Week,
    Month,
}

impl TimeBucket {
    fn label(&self, at: DateTime<Utc>) -> String {
        match self {
            TimeBucket::Hour => at.format("%Y-%m-%d %H:00").to_string(),
            TimeBucket::Day => at.format("%Y-%m-%d").to_string(),
            TimeBucket::Week => at.format("%G-W%V").to_string(),
            TimeBucket::Month => at.format("%Y-%m").to_string(),
        }
    }
}

impl FromStr for TimeBucket {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "hour" => Ok(Self::Hour),
            "day" => Ok(Self::Day),
            "week" => Ok(Self::Week),
            "month" => Ok(Self::Month),
            other => Err(format!("unknown time bucket: {other}")),
        }
    }
}

/// One point of a visits-over-time series.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeSeriesPoint {
    pub period: String,
    pub visits: usize,
    pub unique_bots: usize,
}

pub fn summary(visits: &[BotVisit], now: DateTime<Utc>) -> Summary {
    let total = visits.len();
    if total == 0 {
        return Summary::default();
    }

    let hits = visits.iter().filter(|v| v.cache_status == CacheStatus::Hit).count();
    let verified = visits
        .iter()
        .filter(|v| v.ip_verified == VerificationStatus::Verified)
        .count();
    let failed = visits
        .iter()
        .filter(|v| v.ip_verified == VerificationStatus::Failed)
        .count();
    let within = |days: i64| {
        let since = now - Duration::days(days);
        visits.iter().filter(|v| v.timestamp >= since).count()
    };
    let last_24h = within(1);
    let previous_24h = visits
        .iter()
        .filter(|v| v.timestamp >= now - Duration::days(2) && v.timestamp < now - Duration::days(1))
        .count();

    Summary {
        total_visits: total,
        unique_pages: visits.iter().map(|v| v.url.as_str()).collect::<HashSet<_>>().len(),
        unique_bots: visits.iter().map(|v| v.bot_type.as_str()).collect::<HashSet<_>>().len(),
        cache_hit_rate: percentage(hits, total),
        avg_response_time_ms: average_response_ms(visits.iter()),
        total_bandwidth_bytes: visits.iter().map(|v| v.response_size_bytes).sum(),
        visits_last_24h: last_24h,
        visits_last_7d: within(7),
        visits_last_30d: within(30),
        trend_percentage: trend(last_24h, previous_24h),
        ip_verified_count: verified,
        ip_failed_count: failed,
        ip_verified_percentage: percentage(verified, total),
    }
}

/// Counts grouped by `(bot_type, bot_name)`, most visits first.
pub fn visits_by_bot(visits: &[BotVisit]) -> Vec<BotBreakdown> {
    let mut counts: HashMap<(&str, &str), usize> = HashMap::new();
    for visit in visits {
        *counts
            .entry((visit.bot_type.as_str(), visit.bot_name.as_str()))
            .or_default() += 1;
    }
    let mut breakdown: Vec<BotBreakdown> = counts
        .into_iter()
        .map(|((bot_type, bot_name), count)| BotBreakdown {
            bot_type: bot_type.to_string(),
            bot_name: bot_name.to_string(),
            count,
        })
        .collect();
    breakdown.sort_by(|a, b| b.count.cmp(&a.count).then_with(|| a.bot_type.cmp(&b.bot_type)));
    breakdown
}

/// Most visited URLs.
pub fn top_pages(visits: &[BotVisit], limit: usize) -> Vec<TopPage> {
    let mut by_url: HashMap<&str, Vec<&BotVisit>> = HashMap::new();
    for visit in visits {
        by_url.entry(visit.url.as_str()).or_default().push(visit);
    }
    let mut pages: Vec<TopPage> = by_url
        .into_iter()
        .map(|(url, group)| TopPage {
            url: url.to_string(),
            visits: group.len(),
            unique_bots: group.iter().map(|v| v.bot_type.as_str()).collect::<HashSet<_>>().len(),
            avg_response_time_ms: average_response_ms(group.iter().copied()),
        })
        .collect();
    pages.sort_by(|a, b| b.visits.cmp(&a.visits).then_with(|| a.url.cmp(&b.url)));
    pages.truncate(limit);
    pages
}

/// Visit counts per bucket over the last `days` days, oldest first.
pub fn visits_over_time(
    visits: &[BotVisit],
    bucket: TimeBucket,
    days: u32,
    now: DateTime<Utc>,
) -> Vec<TimeSeriesPoint> {
    let since = days_before(now, days);
    let mut series: BTreeMap<String, (usize, HashSet<&str>)> = BTreeMap::new();
    for visit in visits.iter().filter(|v| v.timestamp >= since && v.timestamp <= now) {
        let point = series.entry(bucket.label(visit.timestamp)).or_default();
        point.0 += 1;
        point.1.insert(visit.bot_type.as_str());
    }
    series
        .into_iter()
        .map(|(period, (visits, bots))| TimeSeriesPoint {
            period,
            visits,
            unique_bots: bots.len(),
        })
        .collect()
}

/// Start of a window of `days` days ending at `now`. Saturates at the
/// earliest representable instant.
pub(crate) fn days_before(now: DateTime<Utc>, days: u32) -> DateTime<Utc> {
    Duration::try_days(i64::from(days))
        .and_then(|d| now.checked_sub_signed(d))
        .unwrap_or(DateTime::<Utc>::MIN_UTC)
}

/// `part / whole * 100`, one decimal. Zero when `whole` is zero.
pub(crate) fn percentage(part: usize, whole: usize) -> f64 {
    if whole == 0 {
        return 0.0;
    }
    round_to(part as f64 / whole as f64 * 100.0, 1)
}

pub(crate) fn round_to(value: f64, places: i32) -> f64 {
    let factor = 10f64.powi(places);
    (value * factor).round() / factor
}

// Zero response times are "not measured" and are skipped.
fn average_response_ms<'a>(visits: impl Iterator<Item = &'a BotVisit>) -> u64 {
    let (sum, n) = visits
        .filter(|v| v.response_time_ms > 0)
        .fold((0u64, 0u64), |(sum, n), v| (sum + v.response_time_ms, n + 1));
    if n == 0 {
        0
    } else {
        (sum as f64 / n as f64).round() as u64
    }
}

fn trend(current: usize, previous: usize) -> f64 {
    if previous > 0 {
        round_to((current as f64 - previous as f64) / previous as f64 * 100.0, 1)
    } else if current > 0 {
        100.0
    } else {
        0.0
    }
}
