//! IP identity verification for classified bots.
//!
//! Checks the client IP against published ranges and, optionally, a
//! reverse-then-forward DNS lookup. The outcome only annotates the visit;
//! it never changes priority or the access decision.

use super::known_bots::KNOWN_BOTS;
use crate::config::VerificationConfig;
use ipnet::IpNet;
use moka::future::Cache;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::net::IpAddr;
use std::time::Duration;
use tracing::debug;
use trust_dns_resolver::config::{ResolverConfig, ResolverOpts};
use trust_dns_resolver::TokioAsyncResolver;

/// Verification status recorded on a visit.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VerificationStatus {
    /// IP belongs to the claimed operator
    Verified,
    /// Claimed bot with a checkable identity failed the check
    Failed,
    /// No verification data for this bot, or verification disabled
    #[default]
    Unverified,
}

/// How a verification result was reached.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VerificationMethod {
    IpRange,
    ReverseDns,
    #[default]
    None,
}

/// Verification annotation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IpVerification {
    pub status: VerificationStatus,
    pub method: VerificationMethod,
}

impl IpVerification {
    fn new(status: VerificationStatus, method: VerificationMethod) -> Self {
        Self { status, method }
    }
}

/// Identity data for one bot type.
struct BotIdentity {
    ip_ranges: Vec<IpNet>,
    verify_dns: Option<String>,
}

/// Verifies bot IPs, memoizing results per `(ip, bot_type)`.
pub struct IpVerifier {
    identities: HashMap<String, BotIdentity>,
    cache: Cache<(IpAddr, String), IpVerification>,
    resolver: Option<TokioAsyncResolver>,
    enabled: bool,
}

impl IpVerifier {
    /// Create a verifier from configuration.
    pub fn new(config: &VerificationConfig) -> Self {
        let mut identities: HashMap<String, BotIdentity> = KNOWN_BOTS
            .iter()
            .map(|bot| {
                let identity = BotIdentity {
                    ip_ranges: bot.ip_ranges.iter().filter_map(|r| r.parse().ok()).collect(),
                    verify_dns: bot.verify_dns.clone(),
                };
                (bot.bot_type.clone(), identity)
            })
            .collect();

        for (bot_type, ranges) in &config.custom_ip_ranges {
            let parsed: Vec<IpNet> = ranges.iter().filter_map(|r| r.parse().ok()).collect();
            identities
                .entry(bot_type.clone())
                .or_insert_with(|| BotIdentity {
                    ip_ranges: vec![],
                    verify_dns: None,
                })
                .ip_ranges
                .extend(parsed);
        }

        let resolver = config
            .reverse_dns
            .then(|| TokioAsyncResolver::tokio(ResolverConfig::default(), ResolverOpts::default()));

        let cache = Cache::builder()
            .max_capacity(config.cache_size)
            .time_to_live(Duration::from_secs(config.cache_ttl_seconds))
            .build();

        Self {
            identities,
            cache,
            resolver,
            enabled: config.enabled,
        }
    }

    /// Verify that `ip` belongs to the operator of `bot_type`.
    pub async fn verify(&self, bot_type: &str, ip: IpAddr) -> IpVerification {
        if !self.enabled {
            return IpVerification::default();
        }

        let Some(identity) = self.identities.get(bot_type) else {
            return IpVerification::default();
        };

        let cache_key = (ip, bot_type.to_string());
        if let Some(cached) = self.cache.get(&cache_key).await {
            return cached;
        }

        let result = self.check(identity, ip).await;
        debug!(bot_type, %ip, status = ?result.status, method = ?result.method, "IP verification complete");
        self.cache.insert(cache_key, result).await;
        result
    }

    async fn check(&self, identity: &BotIdentity, ip: IpAddr) -> IpVerification {
        // Ranges first (no network)
        if identity.ip_ranges.iter().any(|range| range.contains(&ip)) {
            return IpVerification::new(VerificationStatus::Verified, VerificationMethod::IpRange);
        }

        if let (Some(resolver), Some(suffix)) = (&self.resolver, &identity.verify_dns) {
            if let Ok(hostnames) = resolver.reverse_lookup(ip).await {
                for hostname in hostnames.iter() {
                    let host = hostname.to_string();
                    let bare = host.trim_end_matches('.');
                    if !host_in_domain(bare, suffix) {
                        continue;
                    }
                    // Forward-confirm the PTR record
                    if let Ok(ips) = resolver.lookup_ip(bare).await {
                        if ips.iter().any(|resolved| resolved == ip) {
                            return IpVerification::new(
                                VerificationStatus::Verified,
                                VerificationMethod::ReverseDns,
                            );
                        }
                    }
                }
            }
            return IpVerification::new(VerificationStatus::Failed, VerificationMethod::ReverseDns);
        }

        if identity.ip_ranges.is_empty() {
            // Nothing to check against
            IpVerification::default()
        } else {
            IpVerification::new(VerificationStatus::Failed, VerificationMethod::IpRange)
        }
    }
}

/// Whether `host` is `domain` or one of its subdomains.
fn host_in_domain(host: &str, domain: &str) -> bool {
    let host = host.to_ascii_lowercase();
    let domain = domain.to_ascii_lowercase();
    host == domain || host.ends_with(&format!(".{domain}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn verifier() -> IpVerifier {
        IpVerifier::new(&VerificationConfig::default())
    }

    #[tokio::test]
    async fn test_range_verified() {
        let result = verifier().verify("GPTBot", "23.98.142.17".parse().unwrap()).await;
        assert_eq!(result.status, VerificationStatus::Verified);
        assert_eq!(result.method, VerificationMethod::IpRange);
    }

    #[tokio::test]
    async fn test_range_failed() {
        let result = verifier().verify("GPTBot", "192.0.2.1".parse().unwrap()).await;
        assert_eq!(result.status, VerificationStatus::Failed);
    }

    #[tokio::test]
    async fn test_no_identity_data() {
        let result = verifier().verify("CCBot", "192.0.2.1".parse().unwrap()).await;
        assert_eq!(result.status, VerificationStatus::Unverified);
        let unknown = verifier().verify("Custom_thing", "192.0.2.1".parse().unwrap()).await;
        assert_eq!(unknown.status, VerificationStatus::Unverified);
    }

    #[tokio::test]
    async fn test_custom_ranges() {
        let mut custom = HashMap::new();
        custom.insert("Custom_internal".to_string(), vec!["10.0.0.0/8".to_string()]);
        let verifier = IpVerifier::new(&VerificationConfig {
            custom_ip_ranges: custom,
            ..Default::default()
        });
        let result = verifier.verify("Custom_internal", "10.1.2.3".parse().unwrap()).await;
        assert_eq!(result.status, VerificationStatus::Verified);
    }

    #[tokio::test]
    async fn test_disabled() {
        let verifier = IpVerifier::new(&VerificationConfig {
            enabled: false,
            ..Default::default()
        });
        let result = verifier.verify("GPTBot", "23.98.142.17".parse().unwrap()).await;
        assert_eq!(result, IpVerification::default());
    }

    #[test]
    fn test_host_in_domain() {
        assert!(host_in_domain("crawl-20-15-240-1.searchbot.openai.com", "openai.com"));
        assert!(host_in_domain("openai.com", "openai.com"));
        assert!(host_in_domain("Crawl.OpenAI.com", "openai.com"));
        assert!(!host_in_domain("crawl.evilopenai.com", "openai.com"));
        assert!(!host_in_domain("openai.com.attacker.net", "openai.com"));
    }
}
