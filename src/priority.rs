//! Priority tiers and classification results.

use serde::{Deserialize, Serialize};

/// Priority tier assigned to a bot type.
///
/// Controls cache freshness for the bot's requests and whether it is served
/// at all.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Priority {
    /// Served the freshest content (shortest TTL)
    High,
    /// Default tier
    #[default]
    Medium,
    /// Served long-lived cached content
    Low,
    /// Denied before rendering or caching
    Blocked,
}

impl Priority {
    /// Returns true if requests at this tier must be denied.
    pub fn is_blocked(&self) -> bool {
        matches!(self, Priority::Blocked)
    }

    /// Returns the priority as a string for logs and headers.
    pub fn as_str(&self) -> &'static str {
        match self {
            Priority::High => "high",
            Priority::Medium => "medium",
            Priority::Low => "low",
            Priority::Blocked => "blocked",
        }
    }
}

impl std::fmt::Display for Priority {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How a bot was identified.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchSource {
    /// Operator-supplied regex from configuration
    CustomPattern,
    /// Built-in signature table
    KnownSignature,
    /// Catch-all for unrecognized automated traffic
    Fallback,
}

/// Result of classifying a request signature.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Classification {
    /// Stable bot type key (e.g., "GPTBot")
    pub bot_type: String,
    /// Display name (e.g., "GPT (OpenAI)")
    pub bot_name: String,
    /// Resolved priority tier
    pub priority: Priority,
    /// Which matcher produced the result
    pub source: MatchSource,
}

impl Classification {
    /// Whether the caller may serve this request.
    pub fn decision(&self) -> Decision {
        if self.priority.is_blocked() {
            Decision::Deny
        } else {
            Decision::Allow
        }
    }
}

/// Access decision for a classified bot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Decision {
    Allow,
    /// Skip rendering and caching; caller returns a forbidden outcome
    Deny,
}
