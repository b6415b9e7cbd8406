/// In-process job runner
use async_trait::async_trait;
use parking_lot::Mutex;
use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc::{self, error::TrySendError};
use tokio::task::JoinHandle;

use super::{JobQueue, MutationHandler, QueuedMutation};
use crate::{
    arguments::is_debug_jobs_enabled,
    config::JobsConfig,
    errors::{AppError, AppResult},
    logger::{self, LogTag},
};

#[derive(Default)]
struct JobMetrics {
    enqueued: AtomicU64,
    applied: AtomicU64,
    retried: AtomicU64,
    failed: AtomicU64,
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct JobMetricsSnapshot {
    pub enqueued: u64,
    pub applied: u64,
    pub retried: u64,
    pub failed: u64,
}

pub struct LocalJobRunner {
    tx: Mutex<Option<mpsc::Sender<QueuedMutation>>>,
    metrics: Arc<JobMetrics>,
}

impl LocalJobRunner {
    /// Spawn the worker task and return the queue handle plus the worker's
    /// join handle. The worker exits after `shutdown` once the backlog drains.
    pub fn start(config: &JobsConfig, handler: Arc<dyn MutationHandler>) -> (Arc<Self>, JoinHandle<()>) {
        let (tx, rx) = mpsc::channel(config.queue_capacity.max(1));
        let metrics = Arc::new(JobMetrics::default());

        let worker = tokio::spawn(run_worker(
            rx,
            handler,
            metrics.clone(),
            config.max_attempts.max(1),
            Duration::from_millis(config.retry_backoff_ms),
        ));

        let runner = Arc::new(Self {
            tx: Mutex::new(Some(tx)),
            metrics,
        });
        (runner, worker)
    }

    /// Stop accepting mutations; queued ones are still applied
    pub fn shutdown(&self) {
        if self.tx.lock().take().is_some() {
            logger::info(LogTag::Jobs, "Job runner closed for new mutations");
        }
    }

    pub fn metrics(&self) -> JobMetricsSnapshot {
        JobMetricsSnapshot {
            enqueued: self.metrics.enqueued.load(Ordering::Relaxed),
            applied: self.metrics.applied.load(Ordering::Relaxed),
            retried: self.metrics.retried.load(Ordering::Relaxed),
            failed: self.metrics.failed.load(Ordering::Relaxed),
        }
    }
}

#[async_trait]
impl JobQueue for LocalJobRunner {
    async fn enqueue(&self, mutation: QueuedMutation) -> AppResult<()> {
        let tx = self
            .tx
            .lock()
            .clone()
            .ok_or_else(|| AppError::Queue("job runner is shut down".to_string()))?;

        let name = mutation.name.clone();
        match tx.try_send(mutation) {
            Ok(()) => {
                self.metrics.enqueued.fetch_add(1, Ordering::Relaxed);
                if is_debug_jobs_enabled() {
                    logger::debug(LogTag::Jobs, &format!("Enqueued {}", name));
                }
                Ok(())
            }
            Err(TrySendError::Full(_)) => {
                logger::error(LogTag::Jobs, &format!("Job queue full, rejected {}", name));
                Err(AppError::Queue("job queue is full".to_string()))
            }
            Err(TrySendError::Closed(_)) => {
                logger::error(LogTag::Jobs, &format!("Job worker gone, rejected {}", name));
                Err(AppError::Queue("job worker is not running".to_string()))
            }
        }
    }
}

async fn run_worker(
    mut rx: mpsc::Receiver<QueuedMutation>,
    handler: Arc<dyn MutationHandler>,
    metrics: Arc<JobMetrics>,
    max_attempts: u32,
    backoff: Duration,
) {
    logger::info(LogTag::Jobs, "Job worker started");

    while let Some(mutation) = rx.recv().await {
        let mut attempt = 1;
        loop {
            match handler.apply(&mutation).await {
                Ok(()) => {
                    metrics.applied.fetch_add(1, Ordering::Relaxed);
                    if is_debug_jobs_enabled() {
                        logger::debug(
                            LogTag::Jobs,
                            &format!("Applied {} (attempt {})", mutation.name, attempt),
                        );
                    }
                    break;
                }
                Err(e) if attempt < max_attempts => {
                    metrics.retried.fetch_add(1, Ordering::Relaxed);
                    logger::warning(
                        LogTag::Jobs,
                        &format!(
                            "{} failed (attempt {}/{}): {}",
                            mutation.name, attempt, max_attempts, e
                        ),
                    );
                    tokio::time::sleep(backoff * attempt).await;
                    attempt += 1;
                }
                Err(e) => {
                    metrics.failed.fetch_add(1, Ordering::Relaxed);
                    logger::error(
                        LogTag::Jobs,
                        &format!(
                            "{} dropped after {} attempts: {} (data={})",
                            mutation.name, max_attempts, e, mutation.data
                        ),
                    );
                    break;
                }
            }
        }
    }

    logger::info(LogTag::Jobs, "Job worker stopped");
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::sync::atomic::AtomicU32;

    /// Fails the first `failures` calls, then succeeds
    struct FlakyHandler {
        failures: u32,
        calls: AtomicU32,
        applied: Mutex<Vec<String>>,
    }

    impl FlakyHandler {
        fn new(failures: u32) -> Arc<Self> {
            Arc::new(Self {
                failures,
                calls: AtomicU32::new(0),
                applied: Mutex::new(Vec::new()),
            })
        }
    }

    #[async_trait]
    impl MutationHandler for FlakyHandler {
        async fn apply(&self, mutation: &QueuedMutation) -> Result<(), String> {
            let call = self.calls.fetch_add(1, Ordering::SeqCst);
            if call < self.failures {
                return Err("store busy".to_string());
            }
            self.applied.lock().push(mutation.name.clone());
            Ok(())
        }
    }

    fn config(max_attempts: u32) -> JobsConfig {
        JobsConfig {
            queue_capacity: 8,
            max_attempts,
            retry_backoff_ms: 10,
        }
    }

    #[tokio::test]
    async fn test_applies_in_order_and_drains_on_shutdown() {
        let handler = FlakyHandler::new(0);
        let (runner, worker) = LocalJobRunner::start(&config(3), handler.clone());

        runner.enqueue(QueuedMutation::new("a", json!({}))).await.unwrap();
        runner.enqueue(QueuedMutation::new("b", json!({}))).await.unwrap();
        runner.shutdown();
        worker.await.unwrap();

        assert_eq!(*handler.applied.lock(), vec!["a", "b"]);
        assert_eq!(runner.metrics().applied, 2);
        assert!(matches!(
            runner.enqueue(QueuedMutation::new("c", json!({}))).await,
            Err(AppError::Queue(_))
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn test_retries_then_succeeds() {
        let handler = FlakyHandler::new(2);
        let (runner, worker) = LocalJobRunner::start(&config(3), handler.clone());

        runner.enqueue(QueuedMutation::new("a", json!({}))).await.unwrap();
        runner.shutdown();
        worker.await.unwrap();

        let metrics = runner.metrics();
        assert_eq!(metrics.retried, 2);
        assert_eq!(metrics.applied, 1);
        assert_eq!(metrics.failed, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_gives_up_after_max_attempts() {
        let handler = FlakyHandler::new(10);
        let (runner, worker) = LocalJobRunner::start(&config(2), handler.clone());

        runner.enqueue(QueuedMutation::new("a", json!({}))).await.unwrap();
        runner.shutdown();
        worker.await.unwrap();

        assert_eq!(handler.calls.load(Ordering::SeqCst), 2);
        assert_eq!(runner.metrics().failed, 1);
    }

    #[tokio::test]
    async fn test_full_queue_rejects() {
        struct Stuck;
        #[async_trait]
        impl MutationHandler for Stuck {
            async fn apply(&self, _: &QueuedMutation) -> Result<(), String> {
                std::future::pending::<()>().await;
                Ok(())
            }
        }

        let mut cfg = config(1);
        cfg.queue_capacity = 1;
        let (runner, _worker) = LocalJobRunner::start(&cfg, Arc::new(Stuck));

        // the worker holds at most one mutation; fill the channel behind it
        let mut rejected = false;
        for i in 0..4 {
            if runner
                .enqueue(QueuedMutation::new(format!("m{}", i), json!({})))
                .await
                .is_err()
            {
                rejected = true;
                break;
            }
            tokio::task::yield_now().await;
        }
        assert!(rejected);
    }
}
