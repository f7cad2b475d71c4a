//! QueueService - task ライフサイクルの唯一の更新者
//!
//! TaskStore の原子的操作を組み合わせ、時刻・ID・イベント・ログを付け足す層。
//! `status` / `retries` / lease を書き換えるのはここ（とここから呼ばれるストア）だけ。

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tracing::{debug, error, info, warn};

use super::status::TaskStatusView;
use crate::domain::lease::expiry_cutoff;
use crate::domain::{
    Decider, DomainEvent, QueueError, QueueStats, SweepReport, TaskId, TaskRecord, TaskStatus,
    WorkerId,
};
use crate::ports::{Clock, EventSink, IdGenerator, ReclaimOutcome, TaskStore};

/// Parse a JSON payload / result given as text.
pub fn parse_payload(text: &str) -> Result<serde_json::Value, QueueError> {
    serde_json::from_str(text).map_err(|e| QueueError::InvalidPayload(e.to_string()))
}

pub struct QueueService {
    store: Arc<dyn TaskStore>,
    clock: Arc<dyn Clock>,
    ids: Arc<dyn IdGenerator>,
    events: Arc<dyn EventSink>,
    decider: Arc<dyn Decider>,
    lease_timeout: Duration,
}

impl QueueService {
    pub fn new(
        store: Arc<dyn TaskStore>,
        clock: Arc<dyn Clock>,
        ids: Arc<dyn IdGenerator>,
        events: Arc<dyn EventSink>,
        decider: Arc<dyn Decider>,
        lease_timeout: Duration,
    ) -> Self {
        Self {
            store,
            clock,
            ids,
            events,
            decider,
            lease_timeout,
        }
    }

    pub fn lease_timeout(&self) -> Duration {
        self.lease_timeout
    }

    /// New PENDING task at the tail of the work queue.
    pub async fn enqueue(&self, payload: serde_json::Value) -> Result<TaskId, QueueError> {
        let now = self.clock.now();
        let task_id = self.ids.generate_task_id();
        self.store
            .insert_pending(TaskRecord::new(task_id, payload, now))
            .await?;

        info!(task_id = %task_id, "task enqueued");
        self.events
            .emit(DomainEvent::TaskEnqueued { task_id, at: now });
        Ok(task_id)
    }

    /// Claim the queue head. `None` means no work (not an error).
    pub async fn acquire(&self, worker_id: WorkerId) -> Result<Option<TaskRecord>, QueueError> {
        let now = self.clock.now();
        let Some(record) = self.store.acquire_next(worker_id, now).await? else {
            debug!(worker_id = %worker_id, "no pending task");
            return Ok(None);
        };

        info!(task_id = %record.task_id, worker_id = %worker_id, retries = record.retries, "task acquired");
        self.events.emit(DomainEvent::TaskAcquired {
            task_id: record.task_id,
            worker_id,
            at: now,
        });
        Ok(Some(record))
    }

    pub async fn complete(
        &self,
        task_id: TaskId,
        worker_id: WorkerId,
        result: serde_json::Value,
    ) -> Result<TaskRecord, QueueError> {
        let now = self.clock.now();
        let record = self.store.complete(task_id, worker_id, result, now).await?;

        info!(task_id = %task_id, worker_id = %worker_id, "task completed");
        self.events.emit(DomainEvent::TaskCompleted {
            task_id,
            worker_id,
            at: now,
        });
        Ok(record)
    }

    /// Worker-reported failure. Terminal, never retried automatically.
    pub async fn fail(
        &self,
        task_id: TaskId,
        worker_id: WorkerId,
        error_message: impl Into<String>,
    ) -> Result<TaskRecord, QueueError> {
        let now = self.clock.now();
        let error_message = error_message.into();
        let record = self
            .store
            .fail(task_id, worker_id, error_message, now)
            .await?;

        info!(
            task_id = %task_id,
            worker_id = %worker_id,
            error = record.error_message.as_deref().unwrap_or_default(),
            "task failed"
        );
        self.events.emit(DomainEvent::TaskFailed {
            task_id,
            worker_id,
            at: now,
        });
        Ok(record)
    }

    /// Operator override: FAILURE -> PENDING, unbounded, `retries` untouched.
    pub async fn retry(&self, task_id: TaskId) -> Result<TaskRecord, QueueError> {
        let record = self.store.retry_failed(task_id).await?;

        info!(task_id = %task_id, retries = record.retries, "task requeued by operator");
        self.events.emit(DomainEvent::TaskRetried {
            task_id,
            at: self.clock.now(),
        });
        Ok(record)
    }

    /// `retry` for every FAILURE task, in order of failure. Returns how many.
    pub async fn retry_all_failed(&self) -> Result<usize, QueueError> {
        let ids = self.store.retry_all_failed().await?;
        let now = self.clock.now();
        for task_id in &ids {
            self.events.emit(DomainEvent::TaskRetried {
                task_id: *task_id,
                at: now,
            });
        }

        info!(count = ids.len(), "failed tasks requeued by operator");
        Ok(ids.len())
    }

    pub async fn stats(&self) -> Result<QueueStats, QueueError> {
        self.store.stats().await
    }

    /// PENDING の task には queue 内の位置（先頭 = 1）も付く
    pub async fn get_status(&self, task_id: TaskId) -> Result<TaskStatusView, QueueError> {
        self.store
            .get_with_position(task_id)
            .await?
            .map(|(record, position)| TaskStatusView::from(record).with_queue_position(position))
            .ok_or(QueueError::TaskNotFound(task_id))
    }

    pub async fn list_tasks(
        &self,
        status: Option<TaskStatus>,
        limit: usize,
    ) -> Result<Vec<TaskRecord>, QueueError> {
        self.store.list(status, limit).await
    }

    /// Resolve every lease that is expired at `now`.
    ///
    /// Each resolution is atomic per task. A store failure aborts the rest of
    /// the sweep; resolutions already made stay made.
    pub async fn sweep_expired(&self, now: DateTime<Utc>) -> Result<SweepReport, QueueError> {
        let candidates = self
            .store
            .expired_leases(expiry_cutoff(now, self.lease_timeout))
            .await?;

        let mut report = SweepReport::default();
        for lease in candidates {
            // the range query is inclusive, expiry is strict
            if !lease.is_expired(now, self.lease_timeout) {
                continue;
            }

            match self
                .store
                .reclaim(lease, Arc::clone(&self.decider), now)
                .await?
            {
                ReclaimOutcome::Rescued { record, reason } => {
                    report.rescued += 1;
                    warn!(
                        task_id = %record.task_id,
                        worker_id = %lease.worker_id,
                        retries = record.retries,
                        reason = %reason,
                        "lease expired, task requeued"
                    );
                    self.events.emit(DomainEvent::TaskRescued {
                        task_id: record.task_id,
                        worker_id: lease.worker_id,
                        retries: record.retries,
                        at: now,
                    });
                }
                ReclaimOutcome::Abandoned(record) => {
                    report.abandoned += 1;
                    error!(
                        task_id = %record.task_id,
                        worker_id = %lease.worker_id,
                        retries = record.retries,
                        "lease expired, retry budget exhausted"
                    );
                    self.events.emit(DomainEvent::TaskAbandoned {
                        task_id: record.task_id,
                        worker_id: lease.worker_id,
                        retries: record.retries,
                        at: now,
                    });
                }
                ReclaimOutcome::Skipped => {
                    report.skipped += 1;
                    debug!(task_id = %lease.task_id, "lease resolved before reclaim");
                }
            }
        }
        Ok(report)
    }
}
