//! WorkerRegistry port - worker fleet の保存先
//!
//! heartbeat / revoke の記録だけを持つ。lease とは一切関係しない。

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::domain::{QueueError, WorkerId, WorkerRecord};

#[async_trait]
pub trait WorkerRegistry: Send + Sync {
    /// 新しい worker を保存（同じ ID が既にあれば上書きしない）
    async fn insert_worker(&self, record: WorkerRecord) -> Result<(), QueueError>;

    async fn get_worker(&self, worker_id: WorkerId) -> Result<Option<WorkerRecord>, QueueError>;

    /// `last_heartbeat_at = now`。WorkerNotFound / WorkerRevoked を返し得る
    async fn record_heartbeat(
        &self,
        worker_id: WorkerId,
        now: DateTime<Utc>,
    ) -> Result<WorkerRecord, QueueError>;

    /// soft revoke。既に revoke 済みなら何もしない
    async fn revoke_worker(
        &self,
        worker_id: WorkerId,
        now: DateTime<Utc>,
    ) -> Result<WorkerRecord, QueueError>;

    /// 登録順
    async fn list_workers(&self) -> Result<Vec<WorkerRecord>, QueueError>;
}
