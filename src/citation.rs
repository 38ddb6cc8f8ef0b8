//! Citation click detection.
//!
//! A citation click is a human arriving from an answer on an AI platform.
//! The platform is recognized from a `utm_source` parameter on the landing
//! URL, or failing that from the referrer host.

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::LazyLock;
use url::Url;

/// A recognized AI platform.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AiPlatform {
    /// Referrer domain; subdomains match too
    pub domain: &'static str,
    pub name: &'static str,
    /// Referrer query parameter carrying the user's question
    pub query_param: Option<&'static str>,
}

const fn platform(domain: &'static str, name: &'static str, query_param: Option<&'static str>) -> AiPlatform {
    AiPlatform {
        domain,
        name,
        query_param,
    }
}

pub static AI_PLATFORMS: &[AiPlatform] = &[
    platform("chat.openai.com", "ChatGPT", None),
    platform("chatgpt.com", "ChatGPT", None),
    platform("perplexity.ai", "Perplexity", Some("q")),
    platform("claude.ai", "Claude", None),
    platform("gemini.google.com", "Gemini", None),
    platform("bard.google.com", "Gemini", None),
    platform("copilot.microsoft.com", "Copilot", None),
    platform("you.com", "You.com", Some("q")),
    platform("search.brave.com", "Brave Search", Some("q")),
    platform("kagi.com", "Kagi", Some("q")),
];

/// `utm_source` substrings and the platform they identify.
const UTM_SOURCES: [(&str, &str); 4] = [
    ("chatgpt", "ChatGPT"),
    ("perplexity", "Perplexity"),
    ("gemini", "Gemini"),
    ("claude", "Claude"),
];

// Trailing opaque id on Perplexity search slugs
static PERPLEXITY_SLUG_ID: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"-[A-Za-z0-9_]{15,}$").expect("valid regex: perplexity slug id"));

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DetectionMethod {
    UtmParameter,
    Referrer,
}

/// A detected citation click.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CitationSource {
    pub platform: String,
    pub search_query: Option<String>,
    pub method: DetectionMethod,
    /// 0.0-1.0
    pub confidence: f64,
}

/// Detect a citation click from the landing URL (absolute, or a path with
/// query) and the referrer header.
pub fn detect_citation(landing_url: &str, referrer: Option<&str>) -> Option<CitationSource> {
    if let Some(source) = parse_lenient(landing_url).and_then(|url| from_utm(&url)) {
        return Some(source);
    }

    let referrer = Url::parse(referrer?.trim()).ok()?;
    let host = referrer.host_str()?.to_ascii_lowercase();
    let platform = identify_platform(&host)?;

    Some(CitationSource {
        platform: platform.name.to_string(),
        search_query: extract_query(&referrer, platform),
        method: DetectionMethod::Referrer,
        confidence: 0.95,
    })
}

/// Platform for a referrer host.
pub fn identify_platform(host: &str) -> Option<&'static AiPlatform> {
    AI_PLATFORMS
        .iter()
        .find(|p| host == p.domain || host.ends_with(&format!(".{}", p.domain)))
}

fn from_utm(url: &Url) -> Option<CitationSource> {
    let utm = url
        .query_pairs()
        .find(|(k, _)| k == "utm_source")
        .map(|(_, v)| v.to_ascii_lowercase())?;
    let (_, name) = UTM_SOURCES.iter().find(|(needle, _)| utm.contains(needle))?;
    Some(CitationSource {
        platform: name.to_string(),
        search_query: None,
        method: DetectionMethod::UtmParameter,
        confidence: 1.0,
    })
}

fn extract_query(referrer: &Url, platform: &AiPlatform) -> Option<String> {
    let param = platform.query_param?;

    if platform.name == "Perplexity" {
        if let Some(slug) = referrer.path().strip_prefix("/search/") {
            let slug = PERPLEXITY_SLUG_ID.replace(slug, "");
            let query = slug.replace(['-', '_'], " ");
            let query = query.trim();
            if !query.is_empty() {
                return Some(query.to_string());
            }
        }
    }

    referrer
        .query_pairs()
        .find(|(k, _)| k == param)
        .map(|(_, v)| v.trim().to_string())
        .filter(|q| !q.is_empty())
}

fn parse_lenient(raw: &str) -> Option<Url> {
    match Url::parse(raw) {
        Ok(url) => Some(url),
        Err(url::ParseError::RelativeUrlWithoutBase) => {
            Url::parse("http://localhost").ok()?.join(raw).ok()
        }
        Err(_) => None,
    }
}
