//! Cache warmup.
//!
//! A warmup job renders every published item that has no live cache entry,
//! one fixed-size batch at a time. Only one job runs at a time; a start
//! request while a job holds the lease is rejected, not queued. Cancellation
//! is cooperative and only observed between batches.

use crate::cache::{ArtifactCache, CacheKey};
use crate::error::{CrawlError, CrawlResult};
use crate::priority::Priority;
use async_trait::async_trait;
use parking_lot::{Mutex, RwLock};
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

/// Converts a page into the cached artifact.
#[async_trait]
pub trait Renderer: Send + Sync {
    async fn render(&self, url: &str) -> CrawlResult<String>;
}

/// A published content item eligible for warmup.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContentItem {
    pub id: u64,
    pub url: String,
}

/// Lists published content.
#[async_trait]
pub trait ContentSource: Send + Sync {
    /// Every published item, in a stable order.
    async fn published(&self) -> CrawlResult<Vec<ContentItem>>;

    /// One item by identity.
    async fn get(&self, id: u64) -> CrawlResult<Option<ContentItem>> {
        Ok(self.published().await?.into_iter().find(|item| item.id == id))
    }
}

/// In-memory content source.
#[derive(Debug, Default)]
pub struct MemoryContentSource {
    items: RwLock<Vec<ContentItem>>,
}

impl MemoryContentSource {
    pub fn new(items: Vec<ContentItem>) -> Self {
        Self {
            items: RwLock::new(items),
        }
    }

    pub fn publish(&self, item: ContentItem) {
        self.items.write().push(item);
    }
}

#[async_trait]
impl ContentSource for MemoryContentSource {
    async fn published(&self) -> CrawlResult<Vec<ContentItem>> {
        Ok(self.items.read().clone())
    }
}

/// Coverage of published content by live cache entries.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WarmupStats {
    /// `round(cached / total * 100)`, 0 with no content
    pub percentage: u32,
    pub cached: usize,
    pub uncached: usize,
    pub total: usize,
}

impl WarmupStats {
    fn new(cached: usize, total: usize) -> Self {
        let percentage = if total == 0 {
            0
        } else {
            (cached as f64 / total as f64 * 100.0).round() as u32
        };
        Self {
            percentage,
            cached,
            uncached: total - cached,
            total,
        }
    }
}

/// Per-batch counters. Render failures are counted, not raised.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchResults {
    pub processed: usize,
    pub warmed: usize,
    /// Items that gained a live entry before this batch reached them
    pub skipped: usize,
    pub failed: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchOutcome {
    pub results: BatchResults,
    pub stats: WarmupStats,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WarmupState {
    #[default]
    Idle,
    Running,
    /// Cancellation requested; the current batch is finishing
    Cancelling,
    Completed,
    Cancelled,
    /// Stopped early; cumulative progress is still reported
    Failed,
}

impl WarmupState {
    pub fn is_active(&self) -> bool {
        matches!(self, WarmupState::Running | WarmupState::Cancelling)
    }
}

/// Final report of a warmup job.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WarmupReport {
    pub state: WarmupState,
    /// Sum of `warmed` over completed batches
    pub total_warmed: usize,
    pub batches: usize,
    pub failed: usize,
    pub stats: Option<WarmupStats>,
    pub message: Option<String>,
}

/// Single-slot lease guarding the warmup job.
#[derive(Debug, Default)]
pub struct WarmupLease {
    held: AtomicBool,
}

impl WarmupLease {
    pub fn new() -> Self {
        Self::default()
    }

    /// Take the lease, or `None` when another job holds it.
    pub fn try_acquire(self: &Arc<Self>) -> Option<LeaseGuard> {
        self.held
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| LeaseGuard {
                lease: Arc::clone(self),
            })
    }

    pub fn is_held(&self) -> bool {
        self.held.load(Ordering::Acquire)
    }

    fn release(&self) {
        self.held.store(false, Ordering::Release);
    }
}

/// Releases the lease when dropped.
#[derive(Debug)]
pub struct LeaseGuard {
    lease: Arc<WarmupLease>,
}

impl LeaseGuard {
    pub fn release(self) {}
}

impl Drop for LeaseGuard {
    fn drop(&mut self) {
        self.lease.release();
    }
}

/// Handle to a running job.
pub struct WarmupHandle {
    cancel: watch::Sender<bool>,
    state: Arc<Mutex<WarmupState>>,
    task: JoinHandle<WarmupReport>,
}

impl WarmupHandle {
    /// Request cancellation. Takes effect before the next batch.
    pub fn cancel(&self) {
        {
            let mut state = self.state.lock();
            if *state == WarmupState::Running {
                *state = WarmupState::Cancelling;
            }
        }
        let _ = self.cancel.send(true);
    }

    pub fn state(&self) -> WarmupState {
        *self.state.lock()
    }

    /// Wait for the job to finish.
    pub async fn wait(self) -> WarmupReport {
        match self.task.await {
            Ok(report) => report,
            Err(e) => {
                warn!(error = %e, "Warmup task ended abnormally");
                *self.state.lock() = WarmupState::Failed;
                WarmupReport {
                    state: WarmupState::Failed,
                    total_warmed: 0,
                    batches: 0,
                    failed: 0,
                    stats: None,
                    message: Some("Cache warmup stopped unexpectedly".to_string()),
                }
            }
        }
    }
}

/// Result of a start request.
pub enum StartOutcome {
    Started(WarmupHandle),
    /// Another job holds the lease
    Rejected,
}

/// Drives warmup batches against the artifact cache.
pub struct WarmupOrchestrator {
    cache: Arc<ArtifactCache>,
    source: Arc<dyn ContentSource>,
    renderer: Arc<dyn Renderer>,
    priority: Priority,
    batch_size: usize,
    lease: Arc<WarmupLease>,
    state: Arc<Mutex<WarmupState>>,
}

impl WarmupOrchestrator {
    pub fn new(
        cache: Arc<ArtifactCache>,
        source: Arc<dyn ContentSource>,
        renderer: Arc<dyn Renderer>,
        batch_size: usize,
    ) -> Self {
        let priority = cache.config().warmup_priority;
        Self {
            cache,
            source,
            renderer,
            priority,
            batch_size: batch_size.max(1),
            lease: Arc::new(WarmupLease::new()),
            state: Arc::new(Mutex::new(WarmupState::Idle)),
        }
    }

    pub fn state(&self) -> WarmupState {
        *self.state.lock()
    }

    pub fn is_running(&self) -> bool {
        self.lease.is_held()
    }

    /// Coverage of published content.
    pub async fn stats(&self) -> CrawlResult<WarmupStats> {
        let items = self.source.published().await?;
        let cached = items
            .iter()
            .filter(|item| self.cache.has_live(&CacheKey::content(item.id)))
            .count();
        Ok(WarmupStats::new(cached, items.len()))
    }

    /// Warm up to `batch_size` uncached items, skipping the first `offset`
    /// uncached ones.
    pub async fn run_batch(&self, batch_size: usize, offset: usize) -> CrawlResult<BatchOutcome> {
        let items = self.source.published().await?;
        let batch: Vec<ContentItem> = items
            .into_iter()
            .filter(|item| !self.cache.has_live(&CacheKey::content(item.id)))
            .skip(offset)
            .take(batch_size.max(1))
            .collect();

        let mut results = BatchResults::default();
        for item in &batch {
            results.processed += 1;
            let key = CacheKey::content(item.id);
            if self.cache.has_live(&key) {
                results.skipped += 1;
                continue;
            }
            match self.renderer.render(&item.url).await {
                Ok(content) => {
                    if self.cache.put(&key, content, self.priority) {
                        results.warmed += 1;
                    } else {
                        results.failed += 1;
                    }
                }
                Err(e) => {
                    warn!(content_id = item.id, url = %item.url, error = %e, "Warmup render failed");
                    results.failed += 1;
                }
            }
        }

        let stats = self.stats().await?;
        debug!(
            offset,
            processed = results.processed,
            warmed = results.warmed,
            failed = results.failed,
            uncached = stats.uncached,
            "Warmup batch complete"
        );
        Ok(BatchOutcome { results, stats })
    }

    /// Run one batch while holding the lease, so no job can start until it
    /// finishes. Fails with `WarmupInProgress` when the lease is taken.
    pub async fn run_exclusive_batch(
        &self,
        batch_size: usize,
        offset: usize,
    ) -> CrawlResult<BatchOutcome> {
        let Some(_guard) = self.lease.try_acquire() else {
            debug!(offset, "Warmup batch rejected, lease held");
            return Err(CrawlError::WarmupInProgress);
        };
        self.run_batch(batch_size, offset).await
    }

    /// Render and store one item regardless of its current cache state.
    pub async fn regenerate(&self, id: u64) -> CrawlResult<()> {
        let item = self
            .source
            .get(id)
            .await?
            .ok_or(CrawlError::ContentNotFound(id))?;
        let content = self.renderer.render(&item.url).await?;
        self.cache.put(&CacheKey::content(id), content, self.priority);
        info!(content_id = id, url = %item.url, "Cache entry regenerated");
        Ok(())
    }

    /// Start a warmup job on the runtime, or reject when one is running.
    pub fn start(self: &Arc<Self>) -> StartOutcome {
        let Some(guard) = self.lease.try_acquire() else {
            debug!("Warmup start rejected, job already running");
            return StartOutcome::Rejected;
        };
        *self.state.lock() = WarmupState::Running;

        let (cancel, cancel_rx) = watch::channel(false);
        let orchestrator = Arc::clone(self);
        let task = tokio::spawn(async move {
            let report = orchestrator.drive(cancel_rx).await;
            *orchestrator.state.lock() = report.state;
            guard.release();
            report
        });

        StartOutcome::Started(WarmupHandle {
            cancel,
            state: Arc::clone(&self.state),
            task,
        })
    }

    /// Issue batches until nothing is left uncached, cancellation is
    /// requested, or a batch fails.
    pub async fn drive(&self, cancel: watch::Receiver<bool>) -> WarmupReport {
        let mut report = WarmupReport {
            state: WarmupState::Running,
            total_warmed: 0,
            batches: 0,
            failed: 0,
            stats: None,
            message: None,
        };

        let mut stats = match self.stats().await {
            Ok(stats) => stats,
            Err(e) => return self.fail(report, e),
        };
        report.stats = Some(stats);
        info!(total = stats.total, uncached = stats.uncached, "Cache warmup started");

        loop {
            if stats.uncached == 0 {
                report.state = WarmupState::Completed;
                break;
            }
            // Items that failed stay uncached ahead of the rest; skip them
            if stats.uncached <= report.failed {
                report.state = WarmupState::Failed;
                report.message = Some(format!("{} items could not be rendered", report.failed));
                break;
            }
            if *cancel.borrow() {
                report.state = WarmupState::Cancelled;
                break;
            }

            let outcome = match self.run_batch(self.batch_size, report.failed).await {
                Ok(outcome) => outcome,
                Err(e) => return self.fail(report, e),
            };
            report.batches += 1;
            report.total_warmed += outcome.results.warmed;
            report.failed += outcome.results.failed;
            report.stats = Some(outcome.stats);
            stats = outcome.stats;

            info!(
                batch = report.batches,
                warmed = outcome.results.warmed,
                total_warmed = report.total_warmed,
                percentage = stats.percentage,
                "Warmup batch finished"
            );

            if outcome.results.processed == 0 {
                report.state = WarmupState::Failed;
                report.message = Some("Cache warmup made no progress".to_string());
                break;
            }
        }

        info!(
            state = ?report.state,
            total_warmed = report.total_warmed,
            batches = report.batches,
            "Cache warmup finished"
        );
        report
    }

    fn fail(&self, mut report: WarmupReport, error: CrawlError) -> WarmupReport {
        warn!(error = %error, total_warmed = report.total_warmed, "Cache warmup stopped");
        report.state = WarmupState::Failed;
        report.message = Some("Cache warmup failed; progress so far has been kept".to_string());
        report
    }
}
