//! FleetRegistry - worker の登録・heartbeat・revoke
//!
//! 観測専用。heartbeat は lease を延長しないし、lease の期限切れ判定にも使われない。
//! `silent_workers` は heartbeat と reclaim を連動させたい場合の拡張ポイントで、
//! engine 自身はこの結果に基づいて何もしない。

use std::sync::Arc;
use std::time::Duration;

use tracing::{info, warn};

use crate::domain::{QueueError, WorkerId, WorkerRecord};
use crate::ports::{Clock, IdGenerator, WorkerRegistry};

pub struct FleetRegistry {
    registry: Arc<dyn WorkerRegistry>,
    clock: Arc<dyn Clock>,
    ids: Arc<dyn IdGenerator>,
}

impl FleetRegistry {
    pub fn new(
        registry: Arc<dyn WorkerRegistry>,
        clock: Arc<dyn Clock>,
        ids: Arc<dyn IdGenerator>,
    ) -> Self {
        Self {
            registry,
            clock,
            ids,
        }
    }

    /// Store a new worker identity. Credential minting happens elsewhere.
    pub async fn register_worker(&self, name: &str) -> Result<WorkerRecord, QueueError> {
        let name = name.trim();
        if name.is_empty() {
            return Err(QueueError::InvalidPayload(
                "worker name must not be empty".to_string(),
            ));
        }

        let record = WorkerRecord::new(self.ids.generate_worker_id(), name, self.clock.now());
        self.registry.insert_worker(record.clone()).await?;

        info!(worker_id = %record.worker_id, name = %record.name, "worker registered");
        Ok(record)
    }

    pub async fn heartbeat(&self, worker_id: WorkerId) -> Result<WorkerRecord, QueueError> {
        self.registry
            .record_heartbeat(worker_id, self.clock.now())
            .await
    }

    /// Soft revoke; idempotent.
    pub async fn revoke_worker(&self, worker_id: WorkerId) -> Result<WorkerRecord, QueueError> {
        let record = self
            .registry
            .revoke_worker(worker_id, self.clock.now())
            .await?;
        warn!(worker_id = %worker_id, "worker revoked");
        Ok(record)
    }

    pub async fn list_workers(&self) -> Result<Vec<WorkerRecord>, QueueError> {
        self.registry.list_workers().await
    }

    pub async fn get_worker(&self, worker_id: WorkerId) -> Result<WorkerRecord, QueueError> {
        self.registry
            .get_worker(worker_id)
            .await?
            .ok_or(QueueError::WorkerNotFound(worker_id))
    }

    /// Known and not revoked.
    pub async fn authorize(&self, worker_id: WorkerId) -> Result<WorkerRecord, QueueError> {
        let worker = self.get_worker(worker_id).await?;
        if worker.is_active() {
            Ok(worker)
        } else {
            Err(QueueError::WorkerRevoked(worker_id))
        }
    }

    /// Active workers with no sign of life for longer than `threshold`.
    pub async fn silent_workers(
        &self,
        threshold: Duration,
    ) -> Result<Vec<WorkerRecord>, QueueError> {
        let now = self.clock.now();
        Ok(self
            .registry
            .list_workers()
            .await?
            .into_iter()
            .filter(|w| w.is_active() && w.is_silent(now, threshold))
            .collect())
    }
}
