//! In-memory WorkerRegistry implementation.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::Mutex;

use crate::domain::{QueueError, WorkerId, WorkerRecord};
use crate::ports::WorkerRegistry;

#[derive(Clone, Default)]
pub struct InMemoryWorkerRegistry {
    workers: Arc<Mutex<HashMap<WorkerId, WorkerRecord>>>,
}

impl InMemoryWorkerRegistry {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl WorkerRegistry for InMemoryWorkerRegistry {
    async fn insert_worker(&self, record: WorkerRecord) -> Result<(), QueueError> {
        let mut workers = self.workers.lock().await;
        workers.entry(record.worker_id).or_insert(record);
        Ok(())
    }

    async fn get_worker(&self, worker_id: WorkerId) -> Result<Option<WorkerRecord>, QueueError> {
        Ok(self.workers.lock().await.get(&worker_id).cloned())
    }

    async fn record_heartbeat(
        &self,
        worker_id: WorkerId,
        now: DateTime<Utc>,
    ) -> Result<WorkerRecord, QueueError> {
        let mut workers = self.workers.lock().await;
        let worker = workers
            .get_mut(&worker_id)
            .ok_or(QueueError::WorkerNotFound(worker_id))?;
        if !worker.is_active() {
            return Err(QueueError::WorkerRevoked(worker_id));
        }
        worker.record_heartbeat(now);
        Ok(worker.clone())
    }

    async fn revoke_worker(
        &self,
        worker_id: WorkerId,
        now: DateTime<Utc>,
    ) -> Result<WorkerRecord, QueueError> {
        let mut workers = self.workers.lock().await;
        let worker = workers
            .get_mut(&worker_id)
            .ok_or(QueueError::WorkerNotFound(worker_id))?;
        worker.revoke(now);
        Ok(worker.clone())
    }

    async fn list_workers(&self) -> Result<Vec<WorkerRecord>, QueueError> {
        let workers = self.workers.lock().await;
        let mut list: Vec<WorkerRecord> = workers.values().cloned().collect();
        list.sort_by_key(|w| (w.registered_at, w.worker_id));
        Ok(list)
    }
}
