//! Bot classification and priority resolution.
//!
//! Matchers are evaluated first-match-wins:
//! 1. custom patterns from configuration, in declaration order
//! 2. the built-in signature table
//! 3. an "Unknown Bot" catch-all for automated user-agents, when enabled
//!
//! Anything else is not bot traffic.

pub mod ip_verifier;
pub mod known_bots;

pub use ip_verifier::{IpVerification, IpVerifier, VerificationMethod, VerificationStatus};
pub use known_bots::{KnownBot, KNOWN_BOTS};

use crate::config::{BotConfig, CustomBotPattern};
use crate::error::{CrawlError, CrawlResult};
use crate::priority::{Classification, MatchSource, Priority};
use regex::Regex;
use std::collections::{HashMap, HashSet};
use std::net::IpAddr;
use tracing::{debug, warn};

/// Bot type assigned by the catch-all matcher.
pub const UNKNOWN_BOT_TYPE: &str = "Unknown";

/// Display name assigned by the catch-all matcher.
pub const UNKNOWN_BOT_NAME: &str = "Unknown Bot";

/// Raw request signature presented for classification.
#[derive(Debug, Clone)]
pub struct RequestSignature<'a> {
    pub user_agent: &'a str,
    pub ip: IpAddr,
}

/// A compiled matcher entry.
#[derive(Debug, Clone)]
struct BotMatcher {
    bot_type: String,
    bot_name: String,
    pattern: Regex,
    source: MatchSource,
}

/// Classifies user-agents into bot types and resolves their priority.
#[derive(Debug, Clone)]
pub struct BotClassifier {
    matchers: Vec<BotMatcher>,
    priorities: HashMap<String, Priority>,
    blocked: HashSet<String>,
    track_unknown: bool,
}

impl BotClassifier {
    /// Build a classifier, skipping custom patterns that fail to compile.
    pub fn new(config: &BotConfig) -> Self {
        let mut matchers = Vec::with_capacity(config.custom_bot_patterns.len() + KNOWN_BOTS.len());

        for custom in &config.custom_bot_patterns {
            match compile_custom(custom) {
                Ok(matcher) => matchers.push(matcher),
                Err(e) => warn!(error = %e, "Skipping custom bot pattern"),
            }
        }

        matchers.extend(KNOWN_BOTS.iter().map(|bot| BotMatcher {
            bot_type: bot.bot_type.clone(),
            bot_name: bot.name.clone(),
            pattern: known_bots::token_matcher(&bot.ua_token),
            source: MatchSource::KnownSignature,
        }));

        Self {
            matchers,
            priorities: config.bot_priorities.clone(),
            blocked: config.blocked_bots.iter().cloned().collect(),
            track_unknown: config.track_unknown,
        }
    }

    /// Build a classifier, failing on the first invalid custom pattern.
    pub fn try_new(config: &BotConfig) -> CrawlResult<Self> {
        for custom in &config.custom_bot_patterns {
            compile_custom(custom)?;
        }
        Ok(Self::new(config))
    }

    /// Classify a request signature. `None` means not bot traffic.
    pub fn classify(&self, signature: &RequestSignature<'_>) -> Option<Classification> {
        let ua = signature.user_agent.trim();
        if ua.is_empty() {
            return None;
        }

        if let Some(matcher) = self.matchers.iter().find(|m| m.pattern.is_match(ua)) {
            let classification = Classification {
                bot_type: matcher.bot_type.clone(),
                bot_name: matcher.bot_name.clone(),
                priority: self.priority_for(&matcher.bot_type),
                source: matcher.source,
            };
            debug!(
                bot_type = %classification.bot_type,
                priority = %classification.priority,
                ip = %signature.ip,
                "Bot classified"
            );
            return Some(classification);
        }

        if self.track_unknown && known_bots::looks_automated(ua) {
            return Some(Classification {
                bot_type: UNKNOWN_BOT_TYPE.to_string(),
                bot_name: UNKNOWN_BOT_NAME.to_string(),
                priority: self.priority_for(UNKNOWN_BOT_TYPE),
                source: MatchSource::Fallback,
            });
        }

        None
    }

    /// Priority for a bot type: blocked list first, then the configured map,
    /// then medium.
    pub fn priority_for(&self, bot_type: &str) -> Priority {
        if self.blocked.contains(bot_type) {
            return Priority::Blocked;
        }
        self.priorities.get(bot_type).copied().unwrap_or_default()
    }

    /// Number of compiled matchers (custom plus built-in).
    pub fn matcher_count(&self) -> usize {
        self.matchers.len()
    }
}

impl Default for BotClassifier {
    fn default() -> Self {
        Self::new(&BotConfig::default())
    }
}

/// Bot type key for a custom pattern name, e.g. "My Bot" -> "Custom_my-bot".
pub fn custom_bot_type(name: &str) -> String {
    let mut slug = String::with_capacity(name.len());
    let mut last_dash = true;
    for c in name.chars() {
        if c.is_ascii_alphanumeric() {
            slug.push(c.to_ascii_lowercase());
            last_dash = false;
        } else if !last_dash {
            slug.push('-');
            last_dash = true;
        }
    }
    while slug.ends_with('-') {
        slug.pop();
    }
    format!("Custom_{slug}")
}

fn compile_custom(custom: &CustomBotPattern) -> CrawlResult<BotMatcher> {
    let pattern = normalize_pattern(&custom.pattern);
    let pattern = Regex::new(&pattern).map_err(|source| CrawlError::InvalidPattern {
        name: custom.name.clone(),
        source,
    })?;
    Ok(BotMatcher {
        bot_type: custom_bot_type(&custom.name),
        bot_name: custom.name.clone(),
        pattern,
        source: MatchSource::CustomPattern,
    })
}

/// Accept both bare regexes and delimited `/expr/flags` forms.
fn normalize_pattern(raw: &str) -> String {
    let raw = raw.trim();
    if let Some(rest) = raw.strip_prefix('/') {
        if let Some(end) = rest.rfind('/') {
            let (body, flags) = (&rest[..end], &rest[end + 1..]);
            if flags.chars().all(|f| f.is_ascii_alphabetic()) {
                let flags: String = flags.chars().filter(|f| matches!(f, 'i' | 'm' | 's' | 'x')).collect();
                return if flags.is_empty() {
                    body.to_string()
                } else {
                    format!("(?{flags}){body}")
                };
            }
        }
    }
    raw.to_string()
}
