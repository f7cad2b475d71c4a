//! Status - producer / operator 向けの状態ビュー

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::{TaskId, TaskRecord, TaskStatus, WorkerId, WorkerRecord};

/// `get_status` の戻り値（payload は含めない）
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskStatusView {
    pub task_id: TaskId,
    pub status: TaskStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<serde_json::Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
    pub retries: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub assigned_worker: Option<WorkerId>,
    pub created_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub started_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,
    /// work queue 内の位置（先頭 = 1）。PENDING の間だけ
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub queue_position: Option<usize>,
}

impl TaskStatusView {
    pub fn with_queue_position(mut self, position: Option<usize>) -> Self {
        self.queue_position = position;
        self
    }
}

impl From<TaskRecord> for TaskStatusView {
    fn from(record: TaskRecord) -> Self {
        Self {
            task_id: record.task_id,
            status: record.status,
            result: record.result,
            error_message: record.error_message,
            retries: record.retries,
            assigned_worker: record.assigned_worker,
            created_at: record.created_at,
            started_at: record.started_at,
            completed_at: record.completed_at,
            queue_position: None,
        }
    }
}

/// worker 一覧などで返すビュー（`is_active` を明示）
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkerView {
    pub worker_id: WorkerId,
    pub name: String,
    pub is_active: bool,
    pub registered_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub revoked_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_heartbeat_at: Option<DateTime<Utc>>,
}

impl From<WorkerRecord> for WorkerView {
    fn from(record: WorkerRecord) -> Self {
        Self {
            is_active: record.is_active(),
            worker_id: record.worker_id,
            name: record.name,
            registered_at: record.registered_at,
            revoked_at: record.revoked_at,
            last_heartbeat_at: record.last_heartbeat_at,
        }
    }
}
