//! Error types for the crawl analytics agent.

use serde::{Deserialize, Serialize};

/// Top-level error enum for the crawl analytics library.
#[derive(Debug, thiserror::Error)]
pub enum CrawlError {
    #[error("render failed for {url}: {message}")]
    Render {
        url: String,
        /// HTTP status the failure maps to
        status: u16,
        message: String,
    },

    #[error("visit store error: {0}")]
    Store(String),

    #[error("content not found: {0}")]
    ContentNotFound(u64),

    #[error("cache warmup already running")]
    WarmupInProgress,

    #[error("configuration error: {0}")]
    Config(String),

    #[error("invalid bot pattern {name:?}: {source}")]
    InvalidPattern {
        name: String,
        #[source]
        source: regex::Error,
    },
}

impl CrawlError {
    /// Shorthand for a renderer failure with status 500.
    pub fn render(url: impl Into<String>, message: impl Into<String>) -> Self {
        Self::render_with_status(url, 500, message)
    }

    /// Renderer failure that maps to a specific HTTP status, e.g. 404 for
    /// content that no longer exists.
    pub fn render_with_status(
        url: impl Into<String>,
        status: u16,
        message: impl Into<String>,
    ) -> Self {
        Self::Render {
            url: url.into(),
            status,
            message: message.into(),
        }
    }

    /// HTTP status to report for this error.
    pub fn status_code(&self) -> u16 {
        match self {
            Self::Render { status, .. } => *status,
            Self::ContentNotFound(_) => 404,
            Self::WarmupInProgress => 409,
            _ => 500,
        }
    }
}

pub type CrawlResult<T> = Result<T, CrawlError>;

/// Outcome of an admin action, handed back to the caller to map onto its
/// own transport.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActionResult {
    pub success: bool,
    pub message: String,
}

impl ActionResult {
    pub fn ok(message: impl Into<String>) -> Self {
        Self {
            success: true,
            message: message.into(),
        }
    }

    pub fn failed(message: impl Into<String>) -> Self {
        Self {
            success: false,
            message: message.into(),
        }
    }
}

impl From<CrawlError> for ActionResult {
    fn from(err: CrawlError) -> Self {
        Self::failed(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_error_into_action_result() {
        let result: ActionResult = CrawlError::render("/a", "timeout").into();
        assert!(!result.success);
        assert_eq!(result.message, "render failed for /a: timeout");
    }

    #[test]
    fn test_status_codes() {
        assert_eq!(CrawlError::render("/a", "timeout").status_code(), 500);
        assert_eq!(CrawlError::render_with_status("/gone", 404, "deleted").status_code(), 404);
        assert_eq!(CrawlError::ContentNotFound(7).status_code(), 404);
        assert_eq!(CrawlError::Store("down".into()).status_code(), 500);
    }
}
