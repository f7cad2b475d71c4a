//! In-memory TaskStore implementation.
//!
//! task records / work queue / lease table を 1 つの `tokio::sync::Mutex` に入れ、
//! 各操作を 1 つの critical section で完結させる。
//! 書き込みは「検証 → ステージ → コミット」の順なので、途中で失敗しても状態は変わらない。
//! acquire だけは先に head を pop し、lease の準備に失敗したら同じ critical section 内で戻す。

use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
#[cfg(test)]
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::Mutex;

use crate::domain::lease::{check_owner, check_unchanged};
use crate::domain::{
    Decider, Decision, Lease, QueueError, QueueStats, TaskId, TaskRecord, TaskStatus, WorkerId,
};
use crate::ports::{LIST_ORDER, ReclaimOutcome, TaskStore};

/// In-memory queue state.
#[derive(Default)]
struct InMemoryQueueState {
    /// All task records (single source of truth).
    records: HashMap<TaskId, TaskRecord>,

    /// Work queue (TaskIds only, FIFO).
    pending: VecDeque<TaskId>,

    /// Lease table. An entry exists iff the task is PROCESSING.
    leases: HashMap<TaskId, Lease>,
}

impl InMemoryQueueState {
    fn record(&self, task_id: TaskId) -> Result<&TaskRecord, QueueError> {
        self.records
            .get(&task_id)
            .ok_or(QueueError::TaskNotFound(task_id))
    }

    /// Commit a resolved task: drop its lease and store the new record.
    fn commit_resolved(&mut self, record: TaskRecord) {
        self.leases.remove(&record.task_id);
        self.records.insert(record.task_id, record);
    }

    fn commit_requeued(&mut self, record: TaskRecord) {
        self.leases.remove(&record.task_id);
        self.pending.push_back(record.task_id);
        self.records.insert(record.task_id, record);
    }

    fn list_status(&self, status: TaskStatus, limit: usize) -> Vec<TaskRecord> {
        match status {
            TaskStatus::Pending => self
                .pending
                .iter()
                .filter_map(|id| self.records.get(id))
                .take(limit)
                .cloned()
                .collect(),
            TaskStatus::Processing => {
                let mut leases: Vec<&Lease> = self.leases.values().collect();
                leases.sort_by_key(|l| (l.lease_start, l.task_id));
                leases
                    .into_iter()
                    .filter_map(|l| self.records.get(&l.task_id))
                    .take(limit)
                    .cloned()
                    .collect()
            }
            TaskStatus::Success | TaskStatus::Failure => {
                let mut done: Vec<&TaskRecord> = self
                    .records
                    .values()
                    .filter(|r| r.status == status)
                    .collect();
                // newest first
                done.sort_by(|a, b| {
                    b.completed_at
                        .cmp(&a.completed_at)
                        .then(b.task_id.cmp(&a.task_id))
                });
                done.into_iter().take(limit).cloned().collect()
            }
        }
    }

    fn stats(&self) -> QueueStats {
        let mut stats = QueueStats {
            pending: self.pending.len(),
            in_flight: self.leases.len(),
            ..QueueStats::default()
        };
        for record in self.records.values() {
            match record.status {
                TaskStatus::Success => stats.success += 1,
                TaskStatus::Failure => stats.failure += 1,
                TaskStatus::Pending | TaskStatus::Processing => {}
            }
        }
        stats
    }
}

/// In-memory TaskStore.
///
/// clone は同じ状態を共有する。
#[derive(Clone, Default)]
pub struct InMemoryTaskStore {
    state: Arc<Mutex<InMemoryQueueState>>,

    /// Simulated crash between the queue pop and the lease write.
    #[cfg(test)]
    crash_after_pop: Arc<AtomicBool>,
}

impl InMemoryTaskStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// The next `acquire_next` fails right after popping the queue head.
    #[cfg(test)]
    pub(crate) fn crash_next_acquire_after_pop(&self) {
        self.crash_after_pop.store(true, Ordering::SeqCst);
    }

    /// Lease + PROCESSING record for a task already popped from the queue.
    fn stage_lease(
        &self,
        state: &InMemoryQueueState,
        task_id: TaskId,
        worker_id: WorkerId,
        now: DateTime<Utc>,
    ) -> Result<(TaskRecord, Lease), QueueError> {
        let mut record = state.record(task_id)?.clone();
        record.start_processing(worker_id, now)?;

        #[cfg(test)]
        if self.crash_after_pop.swap(false, Ordering::SeqCst) {
            return Err(QueueError::StoreUnavailable(
                "simulated crash after pop".to_string(),
            ));
        }

        Ok((record, Lease::new(task_id, worker_id, now)))
    }

    #[cfg(test)]
    pub(crate) async fn pending_ids(&self) -> Vec<TaskId> {
        self.state.lock().await.pending.iter().copied().collect()
    }

    #[cfg(test)]
    pub(crate) async fn lease_of(&self, task_id: TaskId) -> Option<Lease> {
        self.state.lock().await.leases.get(&task_id).copied()
    }
}

#[async_trait]
impl TaskStore for InMemoryTaskStore {
    async fn insert_pending(&self, record: TaskRecord) -> Result<(), QueueError> {
        let mut state = self.state.lock().await;
        let task_id = record.task_id;
        state.records.insert(task_id, record);
        state.pending.push_back(task_id);
        Ok(())
    }

    async fn acquire_next(
        &self,
        worker_id: WorkerId,
        now: DateTime<Utc>,
    ) -> Result<Option<TaskRecord>, QueueError> {
        let mut state = self.state.lock().await;

        let Some(task_id) = state.pending.pop_front() else {
            return Ok(None);
        };

        // lease / record 未書き込みの間に失敗したら head を戻す
        match self.stage_lease(&state, task_id, worker_id, now) {
            Ok((record, lease)) => {
                state.leases.insert(task_id, lease);
                state.records.insert(task_id, record.clone());
                Ok(Some(record))
            }
            Err(err) => {
                state.pending.push_front(task_id);
                Err(err)
            }
        }
    }

    async fn complete(
        &self,
        task_id: TaskId,
        worker_id: WorkerId,
        result: serde_json::Value,
        now: DateTime<Utc>,
    ) -> Result<TaskRecord, QueueError> {
        let mut state = self.state.lock().await;
        check_owner(task_id, state.leases.get(&task_id), worker_id)?;

        let mut record = state.record(task_id)?.clone();
        record.mark_succeeded(result, now)?;
        state.commit_resolved(record.clone());
        Ok(record)
    }

    async fn fail(
        &self,
        task_id: TaskId,
        worker_id: WorkerId,
        error_message: String,
        now: DateTime<Utc>,
    ) -> Result<TaskRecord, QueueError> {
        let mut state = self.state.lock().await;
        check_owner(task_id, state.leases.get(&task_id), worker_id)?;

        let mut record = state.record(task_id)?.clone();
        record.mark_failed(error_message, now)?;
        state.commit_resolved(record.clone());
        Ok(record)
    }

    async fn retry_failed(&self, task_id: TaskId) -> Result<TaskRecord, QueueError> {
        let mut state = self.state.lock().await;

        let mut record = state.record(task_id)?.clone();
        record.reset_for_retry()?;
        state.commit_requeued(record.clone());
        Ok(record)
    }

    async fn retry_all_failed(&self) -> Result<Vec<TaskId>, QueueError> {
        let mut state = self.state.lock().await;

        let mut failed: Vec<TaskRecord> = state
            .records
            .values()
            .filter(|r| r.status == TaskStatus::Failure)
            .cloned()
            .collect();
        // in order of failure
        failed.sort_by_key(|r| (r.completed_at, r.task_id));

        for record in &mut failed {
            record.reset_for_retry()?;
        }

        let ids = failed.iter().map(|r| r.task_id).collect();
        for record in failed {
            state.commit_requeued(record);
        }
        Ok(ids)
    }

    async fn expired_leases(&self, cutoff: DateTime<Utc>) -> Result<Vec<Lease>, QueueError> {
        let state = self.state.lock().await;
        let mut expired: Vec<Lease> = state
            .leases
            .values()
            .filter(|l| l.lease_start <= cutoff)
            .copied()
            .collect();
        expired.sort_by_key(|l| (l.lease_start, l.task_id));
        Ok(expired)
    }

    async fn reclaim(
        &self,
        expected: Lease,
        decider: Arc<dyn Decider>,
        now: DateTime<Utc>,
    ) -> Result<ReclaimOutcome, QueueError> {
        let mut state = self.state.lock().await;
        if check_unchanged(&expected, state.leases.get(&expected.task_id)).is_err() {
            return Ok(ReclaimOutcome::Skipped);
        }

        let mut record = state.record(expected.task_id)?.clone();
        match decider.decide_expired(&record) {
            Decision::Requeue { reason } => {
                record.requeue_after_expiry()?;
                state.commit_requeued(record.clone());
                Ok(ReclaimOutcome::Rescued { record, reason })
            }
            Decision::MarkFailed { reason } => {
                record.mark_failed(reason, now)?;
                state.commit_resolved(record.clone());
                Ok(ReclaimOutcome::Abandoned(record))
            }
        }
    }

    async fn get(&self, task_id: TaskId) -> Result<Option<TaskRecord>, QueueError> {
        let state = self.state.lock().await;
        Ok(state.records.get(&task_id).cloned())
    }

    async fn get_with_position(
        &self,
        task_id: TaskId,
    ) -> Result<Option<(TaskRecord, Option<usize>)>, QueueError> {
        let state = self.state.lock().await;
        Ok(state.records.get(&task_id).map(|record| {
            let position = state.pending.iter().position(|id| *id == task_id);
            (record.clone(), position.map(|i| i + 1))
        }))
    }

    async fn list(
        &self,
        status: Option<TaskStatus>,
        limit: usize,
    ) -> Result<Vec<TaskRecord>, QueueError> {
        let state = self.state.lock().await;
        let tasks = match status {
            Some(status) => state.list_status(status, limit),
            None => LIST_ORDER
                .iter()
                .flat_map(|status| state.list_status(*status, limit))
                .take(limit)
                .collect(),
        };
        Ok(tasks)
    }

    async fn stats(&self) -> Result<QueueStats, QueueError> {
        let state = self.state.lock().await;
        Ok(state.stats())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::impls::contract;

    contract::task_store_contract!(InMemoryTaskStore::new());

    #[tokio::test]
    async fn crash_after_pop_leaves_task_queued() {
        let store = InMemoryTaskStore::new();
        let head = contract::enqueue(&store).await;
        let next = contract::enqueue(&store).await;
        let worker = contract::worker();

        store.crash_next_acquire_after_pop();
        let err = store.acquire_next(worker, contract::t0()).await.unwrap_err();
        assert!(err.is_retryable());

        // head went back to the front, not leased, still PENDING
        assert_eq!(store.pending_ids().await, vec![head, next]);
        assert!(store.lease_of(head).await.is_none());
        let record = store.get(head).await.unwrap().unwrap();
        assert_eq!(record.status, TaskStatus::Pending);
        assert!(record.assigned_worker.is_none());
        assert_eq!(store.stats().await.unwrap().pending, 2);

        // the next acquire gets it
        let acquired = store.acquire_next(worker, contract::t0()).await.unwrap().unwrap();
        assert_eq!(acquired.task_id, head);
        assert!(store.lease_of(head).await.is_some());
        assert_eq!(store.pending_ids().await, vec![next]);
    }
}
