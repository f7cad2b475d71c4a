//! WorkerGateway - 認証済み worker 向けの操作面
//!
//! すべての操作で先に worker を確認（未登録 / revoke 済みは拒否）してから
//! QueueService / FleetRegistry に委譲する。

use std::sync::Arc;

use crate::domain::{QueueError, TaskId, TaskRecord, WorkerId, WorkerRecord};

use super::fleet::FleetRegistry;
use super::queue_service::QueueService;

#[derive(Clone)]
pub struct WorkerGateway {
    queue: Arc<QueueService>,
    fleet: Arc<FleetRegistry>,
}

impl WorkerGateway {
    pub fn new(queue: Arc<QueueService>, fleet: Arc<FleetRegistry>) -> Self {
        Self { queue, fleet }
    }

    pub async fn acquire(&self, worker_id: WorkerId) -> Result<Option<TaskRecord>, QueueError> {
        self.fleet.authorize(worker_id).await?;
        self.queue.acquire(worker_id).await
    }

    pub async fn complete(
        &self,
        task_id: TaskId,
        worker_id: WorkerId,
        result: serde_json::Value,
    ) -> Result<TaskRecord, QueueError> {
        self.fleet.authorize(worker_id).await?;
        self.queue.complete(task_id, worker_id, result).await
    }

    pub async fn fail(
        &self,
        task_id: TaskId,
        worker_id: WorkerId,
        error_message: impl Into<String>,
    ) -> Result<TaskRecord, QueueError> {
        self.fleet.authorize(worker_id).await?;
        self.queue.fail(task_id, worker_id, error_message).await
    }

    /// Registry-only; never touches leases.
    pub async fn heartbeat(&self, worker_id: WorkerId) -> Result<WorkerRecord, QueueError> {
        self.fleet.heartbeat(worker_id).await
    }
}
