//! WorkerLoop - polling worker
//!
//! # フロー
//! 1. heartbeat の時刻なら FleetRegistry に heartbeat（lease とは無関係）
//! 2. `acquire` で task を 1 つ取得。空なら `poll_interval` 待つ
//! 3. TaskProcessor 実行
//! 4. 成功 → `complete`、失敗 → `fail`
//! 5. NotLeased / WrongOwner は Janitor に負けただけ → warn して結果を捨てる
//! 6. StoreUnavailable は `error_backoff` 待って続行。それ以外（revoke 等）は停止

use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{Duration, Instant};
use tracing::{debug, error, info, warn};

use crate::config::WorkerConfig;
use crate::domain::{QueueError, TaskId, WorkerId};

use super::gateway::WorkerGateway;

/// payload → result（失敗はエラーメッセージ）
#[async_trait]
pub trait TaskProcessor: Send + Sync {
    async fn process(&self, payload: &serde_json::Value) -> Result<serde_json::Value, String>;
}

/// 1 回の `run_once` で起きたこと
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Step {
    /// queue が空だった
    Idle,
    Completed(TaskId),
    Failed(TaskId),
    /// lease を失っていたので結果を捨てた
    Discarded(TaskId),
}

/// worker 1 つ分の集計
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkerReport {
    pub completed: usize,
    pub failed: usize,
    pub discarded: usize,
}

impl WorkerReport {
    fn record(&mut self, step: &Step) {
        match step {
            Step::Idle => {}
            Step::Completed(_) => self.completed += 1,
            Step::Failed(_) => self.failed += 1,
            Step::Discarded(_) => self.discarded += 1,
        }
    }

    pub fn merge(mut self, other: WorkerReport) -> WorkerReport {
        self.completed += other.completed;
        self.failed += other.failed;
        self.discarded += other.discarded;
        self
    }
}

pub struct WorkerLoop {
    gateway: WorkerGateway,
    processor: Arc<dyn TaskProcessor>,
    worker_id: WorkerId,
    config: WorkerConfig,
}

impl WorkerLoop {
    pub fn new(
        gateway: WorkerGateway,
        processor: Arc<dyn TaskProcessor>,
        worker_id: WorkerId,
        config: WorkerConfig,
    ) -> Self {
        Self {
            gateway,
            processor,
            worker_id,
            config,
        }
    }

    pub fn worker_id(&self) -> WorkerId {
        self.worker_id
    }

    /// acquire → process → resolve を 1 回。
    pub async fn run_once(&self) -> Result<Step, QueueError> {
        let Some(task) = self.gateway.acquire(self.worker_id).await? else {
            return Ok(Step::Idle);
        };
        let task_id = task.task_id;

        let resolution = match self.processor.process(&task.payload).await {
            Ok(result) => self
                .gateway
                .complete(task_id, self.worker_id, result)
                .await
                .map(|_| Step::Completed(task_id)),
            Err(message) => self
                .gateway
                .fail(task_id, self.worker_id, message)
                .await
                .map(|_| Step::Failed(task_id)),
        };

        match resolution {
            Err(err) if err.is_race() => {
                warn!(
                    task_id = %task_id,
                    worker_id = %self.worker_id,
                    error = %err,
                    "lease lost before resolution, discarding result"
                );
                Ok(Step::Discarded(task_id))
            }
            other => other,
        }
    }

    /// shutdown が立つまで回し続ける。処理中の task は中断しない。
    pub async fn run(self, mut shutdown: watch::Receiver<bool>) -> WorkerReport {
        let mut report = WorkerReport::default();
        let mut next_heartbeat = Instant::now();
        info!(worker_id = %self.worker_id, "worker started");

        loop {
            if *shutdown.borrow() {
                break;
            }

            if Instant::now() >= next_heartbeat {
                if let Err(err) = self.gateway.heartbeat(self.worker_id).await {
                    warn!(worker_id = %self.worker_id, error = %err, "heartbeat failed");
                }
                next_heartbeat = Instant::now() + self.config.heartbeat_interval;
            }

            let pause = match self.run_once().await {
                Ok(step) => {
                    report.record(&step);
                    match step {
                        Step::Idle => Some(self.config.poll_interval),
                        _ => None,
                    }
                }
                Err(err) if err.is_retryable() => {
                    error!(worker_id = %self.worker_id, error = %err, "store unavailable, backing off");
                    Some(self.config.error_backoff)
                }
                Err(err) => {
                    error!(worker_id = %self.worker_id, error = %err, "worker stopping");
                    break;
                }
            };

            if let Some(pause) = pause
                && !sleep_or_shutdown(pause, &mut shutdown).await
            {
                break;
            }
        }

        info!(
            worker_id = %self.worker_id,
            completed = report.completed,
            failed = report.failed,
            discarded = report.discarded,
            "worker stopped"
        );
        report
    }
}

/// `false` if shutdown was requested while sleeping.
async fn sleep_or_shutdown(pause: Duration, shutdown: &mut watch::Receiver<bool>) -> bool {
    tokio::select! {
        _ = tokio::time::sleep(pause) => true,
        changed = shutdown.changed() => {
            // sender dropped counts as shutdown
            changed.is_ok() && !*shutdown.borrow()
        }
    }
}

/// Worker group handle.
/// - `request_shutdown` で新しい lease の取得を止める（処理中の task は最後まで処理）
/// - `shutdown_and_join()` で全ワーカーの終了を待てる
pub struct WorkerGroup {
    shutdown_tx: watch::Sender<bool>,
    joins: Vec<JoinHandle<WorkerReport>>,
}

impl WorkerGroup {
    pub fn spawn(loops: Vec<WorkerLoop>) -> Self {
        let (shutdown_tx, shutdown_rx) = watch::channel(false);

        let joins = loops
            .into_iter()
            .map(|worker| tokio::spawn(worker.run(shutdown_rx.clone())))
            .collect();

        Self { shutdown_tx, joins }
    }

    pub fn len(&self) -> usize {
        self.joins.len()
    }

    pub fn is_empty(&self) -> bool {
        self.joins.is_empty()
    }

    pub fn request_shutdown(&self) {
        // receivers may already be gone
        let _ = self.shutdown_tx.send(true);
    }

    /// Shutdown and wait for all workers; returns the summed report.
    pub async fn shutdown_and_join(self) -> WorkerReport {
        self.request_shutdown();
        let mut total = WorkerReport::default();
        for join in self.joins {
            match join.await {
                Ok(report) => total = total.merge(report),
                Err(err) => debug!(error = %err, "worker task ended abnormally"),
            }
        }
        total
    }
}
