//! Janitor - 期限切れ lease の回収
//!
//! # フロー（1 tick）
//! 1. `now - lease_start > lease_timeout` の lease を列挙
//! 2. 各 lease について retry 予算内なら PENDING に戻し、尽きていれば FAILURE
//! 3. 期限切れが 0 件なら何もしない
//!
//! 個々の task で失敗することはない（必ず rescue か abandon）。
//! ストア障害だけが sweep を失敗させ、`error_backoff` 後に次の tick で再試行する。

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, error, info};

use crate::domain::{QueueError, SweepReport};
use crate::ports::Clock;

use super::queue_service::QueueService;

#[derive(Clone)]
pub struct Janitor {
    queue: Arc<QueueService>,
    clock: Arc<dyn Clock>,
    sweep_interval: Duration,
    error_backoff: Duration,
}

impl Janitor {
    pub fn new(
        queue: Arc<QueueService>,
        clock: Arc<dyn Clock>,
        sweep_interval: Duration,
        error_backoff: Duration,
    ) -> Self {
        Self {
            queue,
            clock,
            sweep_interval,
            error_backoff,
        }
    }

    pub async fn sweep_once(&self) -> Result<SweepReport, QueueError> {
        self.queue.sweep_expired(self.clock.now()).await
    }

    /// Sweep every `sweep_interval` until the handle is shut down.
    pub fn spawn(self) -> JanitorHandle {
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let join = tokio::spawn(self.run(shutdown_rx));
        JanitorHandle { shutdown_tx, join }
    }

    async fn run(self, mut shutdown: watch::Receiver<bool>) {
        info!(
            lease_timeout_secs = self.queue.lease_timeout().as_secs(),
            sweep_interval_secs = self.sweep_interval.as_secs(),
            "janitor started"
        );

        loop {
            if *shutdown.borrow() {
                break;
            }

            let wait = match self.sweep_once().await {
                Ok(report) => {
                    if report.is_noop() {
                        debug!(skipped = report.skipped, "sweep found nothing to reclaim");
                    } else {
                        info!(
                            rescued = report.rescued,
                            abandoned = report.abandoned,
                            skipped = report.skipped,
                            "sweep finished"
                        );
                    }
                    self.sweep_interval
                }
                Err(err) => {
                    error!(error = %err, backoff_secs = self.error_backoff.as_secs(), "sweep failed");
                    self.error_backoff
                }
            };

            tokio::select! {
                _ = tokio::time::sleep(wait) => {}
                changed = shutdown.changed() => {
                    if changed.is_err() {
                        break;
                    }
                }
            }
        }

        info!("janitor stopped");
    }
}

pub struct JanitorHandle {
    shutdown_tx: watch::Sender<bool>,
    join: JoinHandle<()>,
}

impl JanitorHandle {
    pub fn request_shutdown(&self) {
        let _ = self.shutdown_tx.send(true);
    }

    pub async fn shutdown_and_join(self) {
        self.request_shutdown();
        if let Err(err) = self.join.await {
            debug!(error = %err, "janitor task ended abnormally");
        }
    }
}
