//! Built-in signature table for AI crawlers.
//!
//! Entries are matched case-insensitively against the user-agent in table
//! order; the first match wins.

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::LazyLock;

/// A known bot definition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KnownBot {
    /// Bot type key (e.g., "GPTBot")
    pub bot_type: String,

    /// Display name (e.g., "GPT (OpenAI)")
    pub name: String,

    /// User-Agent token to match
    pub ua_token: String,

    /// Reverse DNS suffix used for identity verification
    #[serde(default)]
    pub verify_dns: Option<String>,

    /// Published IP ranges (CIDR notation)
    #[serde(default)]
    pub ip_ranges: Vec<String>,
}

fn bot(bot_type: &str, name: &str, verify_dns: Option<&str>, ip_ranges: &[&str]) -> KnownBot {
    KnownBot {
        bot_type: bot_type.to_string(),
        name: name.to_string(),
        ua_token: bot_type.to_string(),
        verify_dns: verify_dns.map(str::to_string),
        ip_ranges: ip_ranges.iter().map(|r| r.to_string()).collect(),
    }
}

/// The built-in table. `ChatGPT-User` precedes `GPTBot` and
/// `Applebot-Extended`/`Google-Extended` precede their generic siblings so
/// the more specific token wins.
pub static KNOWN_BOTS: LazyLock<Vec<KnownBot>> = LazyLock::new(|| {
    vec![
        bot("ClaudeBot", "Claude (Anthropic)", Some("anthropic.com"), &[
            "3.128.0.0/9",
            "52.15.0.0/16",
            "18.216.0.0/14",
        ]),
        bot("anthropic-ai", "Anthropic AI", Some("anthropic.com"), &[]),
        bot("ChatGPT-User", "ChatGPT User", Some("openai.com"), &[
            "23.98.142.0/24",
            "40.84.180.0/22",
        ]),
        bot("OAI-SearchBot", "OpenAI Search", Some("openai.com"), &[]),
        bot("GPTBot", "GPT (OpenAI)", Some("openai.com"), &[
            "23.98.142.0/24",
            "40.84.180.0/22",
            "13.66.11.96/28",
        ]),
        bot("PerplexityBot", "Perplexity", Some("perplexity.ai"), &[
            "44.214.0.0/16",
            "52.20.0.0/14",
        ]),
        bot("Perplexity-User", "Perplexity User", Some("perplexity.ai"), &[]),
        bot("Google-Extended", "Google Gemini", Some("google.com"), &[
            "66.249.64.0/19",
            "66.102.0.0/20",
        ]),
        bot("Applebot-Extended", "Apple Intelligence", Some("apple.com"), &["17.0.0.0/8"]),
        bot("Bytespider", "ByteDance AI", Some("bytedance.com"), &[
            "110.249.0.0/16",
            "111.225.0.0/16",
        ]),
        bot("cohere-ai", "Cohere", Some("cohere.ai"), &[]),
        bot("FacebookBot", "Meta AI", Some("facebook.com"), &[
            "69.63.176.0/20",
            "31.13.24.0/21",
            "66.220.144.0/20",
        ]),
        bot("meta-externalagent", "Meta External Agent", Some("facebook.com"), &[]),
        bot("Amazonbot", "Amazon", Some("amazonbot.amazon"), &[]),
        bot("CCBot", "Common Crawl", None, &[]),
        bot("YouBot", "You.com", None, &[]),
        bot("DuckAssistBot", "DuckDuckGo Assist", None, &[]),
    ]
});

/// Tokens that mark a user-agent as automated even when no signature
/// matches. Drives the "Unknown Bot" fallback.
static AUTOMATION_MARKERS: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)bot\b|bot/|crawler|spider|scraper|curl/|wget/|python-requests|python-urllib|go-http-client|headless|phantomjs|puppeteer|playwright|selenium|httpclient|okhttp|node-fetch|axios/",
    )
    .expect("valid regex: automation markers")
});

/// Compile a user-agent token into a case-insensitive literal matcher.
pub fn token_matcher(token: &str) -> Regex {
    Regex::new(&format!("(?i){}", regex::escape(token)))
        .expect("escaped literal is always a valid regex")
}

/// Whether a user-agent carries generic automation markers.
pub fn looks_automated(user_agent: &str) -> bool {
    AUTOMATION_MARKERS.is_match(user_agent)
}
