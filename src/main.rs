//! Crawl Analytics Agent for Zentinel
//!
//! Command-line front end: classify a single user-agent, or analyze a
//! recorded visit log.

use anyhow::{Context, Result};
use chrono::Utc;
use clap::{Parser, Subcommand};
use serde_json::json;
use std::net::IpAddr;
use std::path::{Path, PathBuf};
use tracing::{info, Level};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};
use zentinel_agent_crawl_analytics::analytics::{self, TimeBucket};
use zentinel_agent_crawl_analytics::budget::{BudgetPeriod, CrawlBudgetAnalyzer};
use zentinel_agent_crawl_analytics::classifier::{IpVerifier, RequestSignature};
use zentinel_agent_crawl_analytics::sessions::{SessionAggregator, SessionMetric};
use zentinel_agent_crawl_analytics::visits::TrafficType;
use zentinel_agent_crawl_analytics::{BotClassifier, BotVisit, CrawlAnalyticsConfig};

#[derive(Parser, Debug)]
#[command(name = "zentinel-agent-crawl-analytics")]
#[command(author, version, about = "Crawl analytics and adaptive cache agent for AI bot traffic")]
struct Args {
    /// Path to configuration file (JSON or YAML)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Enable JSON logging format
    #[arg(long, global = true)]
    json_logs: bool,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, global = true, default_value = "info")]
    log_level: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Classify one user-agent and IP
    Classify {
        /// User-Agent header value
        user_agent: String,

        /// Client IP address
        #[arg(long, default_value = "0.0.0.0")]
        ip: IpAddr,
    },

    /// Analyze a JSON-lines visit log
    Analyze {
        /// File with one visit per line
        visits: PathBuf,

        /// Restrict the crawl budget report to one bot type
        #[arg(long)]
        bot_type: Option<String>,

        /// Crawl budget window (day, week, month). Defaults to
        /// `budget.period_days` from the config.
        #[arg(long)]
        period: Option<BudgetPeriod>,

        /// Bucket size for the visits series (hour, day, week, month)
        #[arg(long, default_value = "day")]
        bucket: TimeBucket,

        /// Rows in ranked lists
        #[arg(long, default_value_t = 10)]
        limit: usize,
    },
}

fn init_logging(json: bool, level: &str) {
    let level = match level.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };

    let env_filter = EnvFilter::from_default_env().add_directive(level.into());

    // Reports go to stdout, logs to stderr
    if json {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(fmt::layer().with_writer(std::io::stderr))
            .init();
    }
}

fn load_config(path: Option<&Path>) -> Result<CrawlAnalyticsConfig> {
    let config = if let Some(path) = path {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("reading config {}", path.display()))?;
        if path.extension().is_some_and(|e| e == "yaml" || e == "yml") {
            serde_yaml::from_str(&content)?
        } else {
            serde_json::from_str(&content)?
        }
    } else {
        CrawlAnalyticsConfig::default()
    };
    config.validate()?;
    Ok(config)
}

fn load_visits(path: &Path) -> Result<Vec<BotVisit>> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("reading visit log {}", path.display()))?;
    content
        .lines()
        .enumerate()
        .filter(|(_, line)| !line.trim().is_empty())
        .map(|(n, line)| {
            serde_json::from_str(line).with_context(|| format!("{}:{}", path.display(), n + 1))
        })
        .collect()
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Initialize logging
    init_logging(args.json_logs, &args.log_level);

    // Load configuration
    let config = load_config(args.config.as_deref())?;

    let report = match args.command {
        Command::Classify { user_agent, ip } => {
            let classifier = BotClassifier::new(&config.bots);
            let classification = classifier.classify(&RequestSignature {
                user_agent: &user_agent,
                ip,
            });
            let verification = match &classification {
                Some(c) => Some(IpVerifier::new(&config.verification).verify(&c.bot_type, ip).await),
                None => None,
            };
            json!({
                "is_bot": classification.is_some(),
                "decision": classification.as_ref().map(|c| c.decision()),
                "classification": classification,
                "verification": verification,
            })
        }
        Command::Analyze {
            visits,
            bot_type,
            period,
            bucket,
            limit,
        } => {
            let days = period.map_or(config.budget.period_days, |p| p.days());
            let visits = load_visits(&visits)?;
            // Analyze relative to the newest visit so archived logs stay meaningful
            let now = visits
                .iter()
                .map(|v| v.timestamp)
                .max()
                .unwrap_or_else(Utc::now);
            info!(visits = visits.len(), %now, "Visit log loaded");

            let crawls: Vec<BotVisit> = visits
                .iter()
                .filter(|v| v.traffic_type == TrafficType::BotCrawl)
                .cloned()
                .collect();
            let sessions = SessionAggregator::new(&config.sessions);
            let budget = CrawlBudgetAnalyzer::new(config.budget.clone(), sessions.clone());

            json!({
                "summary": analytics::summary(&visits, now),
                "visits_by_bot": analytics::visits_by_bot(&visits),
                "top_pages": analytics::top_pages(&crawls, limit),
                "visits_over_time": analytics::visits_over_time(&visits, bucket, days, now),
                "sessions": sessions.analytics(&crawls),
                "top_bots_by_pages_per_session": sessions.top_by_metric(&crawls, SessionMetric::PagesPerSession, limit),
                "crawl_budget": budget.analyze(&visits, bot_type.as_deref(), days, now),
                "citation_to_crawl_ratio": analytics::citation_to_crawl_ratio(&visits, limit),
                "content_performance": analytics::content_performance(&visits),
                "optimal_content_length": analytics::optimal_content_length(&visits),
            })
        }
    };

    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}
