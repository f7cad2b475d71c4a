//! Task record: lifecycle state + payload/result blobs.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::errors::QueueError;
use super::ids::{TaskId, WorkerId};

/// Task lifecycle state.
///
/// State transitions:
/// - PENDING -> PROCESSING (acquire)
/// - PROCESSING -> SUCCESS (complete) / FAILURE (fail, lease exhausted)
/// - PROCESSING -> PENDING (lease expired, retry budget left)
/// - FAILURE -> PENDING (operator retry)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TaskStatus {
    Pending,
    Processing,
    Success,
    Failure,
}

impl TaskStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            TaskStatus::Pending => "PENDING",
            TaskStatus::Processing => "PROCESSING",
            TaskStatus::Success => "SUCCESS",
            TaskStatus::Failure => "FAILURE",
        }
    }

    /// Is this a terminal state (only operator retry leaves it)?
    pub fn is_terminal(self) -> bool {
        matches!(self, TaskStatus::Success | TaskStatus::Failure)
    }
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown task status: {0:?}")]
pub struct UnknownStatus(pub String);

impl FromStr for TaskStatus {
    type Err = UnknownStatus;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "PENDING" => Ok(TaskStatus::Pending),
            "PROCESSING" => Ok(TaskStatus::Processing),
            "SUCCESS" => Ok(TaskStatus::Success),
            "FAILURE" => Ok(TaskStatus::Failure),
            _ => Err(UnknownStatus(s.to_string())),
        }
    }
}

/// Durable record of one task.
///
/// Design:
/// - This is the "single source of truth" for task state.
/// - The work queue and the lease table hold TaskId only.
/// - Every state change goes through one of the methods below, so both stores
///   apply identical transitions. Membership in the queue / lease table is the
///   store's job and must be updated in the same transaction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskRecord {
    pub task_id: TaskId,
    pub status: TaskStatus,
    pub payload: serde_json::Value,
    pub result: Option<serde_json::Value>,
    pub error_message: Option<String>,

    /// Automatic (lease-expiry) requeues only. Never decremented.
    pub retries: u32,

    /// Holder of the current lease. Some iff status == PROCESSING.
    pub assigned_worker: Option<WorkerId>,

    pub created_at: DateTime<Utc>,
    /// Start of the current lease.
    pub started_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
}

impl TaskRecord {
    pub fn new(task_id: TaskId, payload: serde_json::Value, now: DateTime<Utc>) -> Self {
        Self {
            task_id,
            status: TaskStatus::Pending,
            payload,
            result: None,
            error_message: None,
            retries: 0,
            assigned_worker: None,
            created_at: now,
            started_at: None,
            completed_at: None,
        }
    }

    fn expect_status(&self, expected: TaskStatus) -> Result<(), QueueError> {
        if self.status == expected {
            Ok(())
        } else {
            Err(QueueError::InvalidState {
                task_id: self.task_id,
                expected,
                actual: self.status,
            })
        }
    }

    /// PENDING -> PROCESSING.
    pub fn start_processing(
        &mut self,
        worker_id: WorkerId,
        now: DateTime<Utc>,
    ) -> Result<(), QueueError> {
        self.expect_status(TaskStatus::Pending)?;
        self.status = TaskStatus::Processing;
        self.assigned_worker = Some(worker_id);
        self.started_at = Some(now);
        Ok(())
    }

    /// PROCESSING -> SUCCESS.
    pub fn mark_succeeded(
        &mut self,
        result: serde_json::Value,
        now: DateTime<Utc>,
    ) -> Result<(), QueueError> {
        self.expect_status(TaskStatus::Processing)?;
        self.status = TaskStatus::Success;
        self.result = Some(result);
        self.assigned_worker = None;
        self.completed_at = Some(now);
        Ok(())
    }

    /// PROCESSING -> FAILURE (worker report or exhausted lease budget).
    pub fn mark_failed(
        &mut self,
        error_message: impl Into<String>,
        now: DateTime<Utc>,
    ) -> Result<(), QueueError> {
        self.expect_status(TaskStatus::Processing)?;
        self.status = TaskStatus::Failure;
        self.error_message = Some(error_message.into());
        self.assigned_worker = None;
        self.completed_at = Some(now);
        Ok(())
    }

    /// PROCESSING -> PENDING after a lease expired. Consumes one retry.
    pub fn requeue_after_expiry(&mut self) -> Result<(), QueueError> {
        self.expect_status(TaskStatus::Processing)?;
        self.status = TaskStatus::Pending;
        self.retries += 1;
        self.assigned_worker = None;
        Ok(())
    }

    /// FAILURE -> PENDING by operator. `retries` is left alone.
    pub fn reset_for_retry(&mut self) -> Result<(), QueueError> {
        self.expect_status(TaskStatus::Failure)?;
        self.status = TaskStatus::Pending;
        self.error_message = None;
        self.completed_at = None;
        Ok(())
    }
}
