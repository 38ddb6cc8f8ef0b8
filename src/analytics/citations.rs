//! Citation performance: how often crawled content is cited back by AI
//! platforms, and what cited content looks like.

use super::{percentage, round_to};
use crate::visits::{BotVisit, ContentMetrics, TrafficType};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Color band for a citation rate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CitationBand {
    /// 50% and above
    High,
    /// 20% up to 50%
    Medium,
    /// Below 20%
    Low,
}

impl CitationBand {
    pub fn for_rate(rate: f64) -> Self {
        if rate >= 0.5 {
            CitationBand::High
        } else if rate >= 0.2 {
            CitationBand::Medium
        } else {
            CitationBand::Low
        }
    }
}

/// `citations / crawls`, three decimals. Zero when nothing was crawled.
pub fn citation_rate(crawls: usize, citations: usize) -> f64 {
    if crawls == 0 {
        return 0.0;
    }
    round_to(citations as f64 / crawls as f64, 3)
}

/// Crawl and citation counts for one URL.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CitationRatio {
    pub url: String,
    pub crawls: usize,
    pub citations: usize,
    pub citation_rate: f64,
    pub band: CitationBand,
}

/// Per-URL citation rates for crawled URLs, most crawled first.
pub fn citation_to_crawl_ratio(visits: &[BotVisit], limit: usize) -> Vec<CitationRatio> {
    let mut counts: HashMap<&str, (usize, usize)> = HashMap::new();
    for visit in visits {
        let entry = counts.entry(visit.url.as_str()).or_default();
        match visit.traffic_type {
            TrafficType::BotCrawl => entry.0 += 1,
            TrafficType::CitationClick => entry.1 += 1,
        }
    }

    let mut ratios: Vec<CitationRatio> = counts
        .into_iter()
        .filter(|(_, (crawls, _))| *crawls > 0)
        .map(|(url, (crawls, citations))| {
            let rate = citation_rate(crawls, citations);
            CitationRatio {
                url: url.to_string(),
                crawls,
                citations,
                citation_rate: rate,
                band: CitationBand::for_rate(rate),
            }
        })
        .collect();
    ratios.sort_by(|a, b| b.crawls.cmp(&a.crawls).then_with(|| a.url.cmp(&b.url)));
    ratios.truncate(limit);
    ratios
}

/// Averaged content quality signals for a group of visits.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ContentProfile {
    pub avg_word_count: f64,
    pub avg_headings: f64,
    pub avg_images: f64,
    /// Percent of samples carrying schema markup
    pub schema_rate: f64,
    pub avg_freshness_days: f64,
    pub sample_size: usize,
}

impl ContentProfile {
    fn from_metrics<'a>(metrics: impl Iterator<Item = &'a ContentMetrics>) -> Self {
        let samples: Vec<&ContentMetrics> = metrics.collect();
        let n = samples.len();
        if n == 0 {
            return Self::default();
        }
        let avg = |f: fn(&ContentMetrics) -> u32| {
            samples.iter().map(|m| f64::from(f(m))).sum::<f64>() / n as f64
        };
        Self {
            avg_word_count: avg(|m| m.word_count).round(),
            avg_headings: round_to(avg(|m| m.heading_count), 1),
            avg_images: round_to(avg(|m| m.image_count), 1),
            schema_rate: percentage(samples.iter().filter(|m| m.has_schema).count(), n),
            avg_freshness_days: round_to(avg(|m| m.freshness_days), 1),
            sample_size: n,
        }
    }
}

/// Cited content against merely crawled content.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ContentPerformance {
    pub cited: ContentProfile,
    pub crawled: ContentProfile,
}

/// Compare content signals of cited and crawled visits. Visits without
/// content metrics are ignored.
pub fn content_performance(visits: &[BotVisit]) -> ContentPerformance {
    let profile = |traffic: TrafficType| {
        ContentProfile::from_metrics(
            visits
                .iter()
                .filter(|v| v.traffic_type == traffic)
                .filter_map(|v| v.content_metrics.as_ref()),
        )
    };
    ContentPerformance {
        cited: profile(TrafficType::CitationClick),
        crawled: profile(TrafficType::BotCrawl),
    }
}

const LENGTH_BUCKETS: [(u32, Option<u32>); 7] = [
    (0, Some(299)),
    (300, Some(599)),
    (600, Some(899)),
    (900, Some(1199)),
    (1200, Some(1499)),
    (1500, Some(1999)),
    (2000, None),
];

/// Citation count for a word-count range.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LengthBucket {
    pub range: String,
    pub min_words: u32,
    pub max_words: Option<u32>,
    pub citations: usize,
}

impl LengthBucket {
    fn contains(&self, words: u32) -> bool {
        words >= self.min_words && self.max_words.map_or(true, |max| words <= max)
    }
}

/// The word-count range that collects the most citations.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OptimalContentLength {
    /// Winning range label, or "N/A" without citation data
    pub optimal_range: String,
    pub citation_count: usize,
    /// Every non-empty bucket, most cited first
    pub all_ranges: Vec<LengthBucket>,
}

pub fn optimal_content_length(visits: &[BotVisit]) -> OptimalContentLength {
    let mut buckets: Vec<LengthBucket> = LENGTH_BUCKETS
        .iter()
        .map(|&(min_words, max_words)| LengthBucket {
            range: match max_words {
                Some(max) => format!("{min_words}-{max}"),
                None => format!("{min_words}+"),
            },
            min_words,
            max_words,
            citations: 0,
        })
        .collect();

    let cited_lengths = visits
        .iter()
        .filter(|v| v.traffic_type == TrafficType::CitationClick)
        .filter_map(|v| v.content_metrics.as_ref().map(|m| m.word_count));
    for words in cited_lengths {
        if let Some(bucket) = buckets.iter_mut().find(|b| b.contains(words)) {
            bucket.citations += 1;
        }
    }

    buckets.retain(|b| b.citations > 0);
    // Stable sort keeps the shorter range first on ties
    buckets.sort_by(|a, b| b.citations.cmp(&a.citations));

    let (optimal_range, citation_count) = buckets
        .first()
        .map(|b| (b.range.clone(), b.citations))
        .unwrap_or_else(|| ("N/A".to_string(), 0));

    OptimalContentLength {
        optimal_range,
        citation_count,
        all_ranges: buckets,
    }
}
