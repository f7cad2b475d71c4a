//! Errors - エラー型と分類
//!
//! `QueueError` は engine の全操作が返すエラー。
//! `kind()` で運用上の分類（競合 / 呼び出し側のバグ / インフラ障害）を返します。

use thiserror::Error;

use super::ids::{TaskId, WorkerId};
use super::task::TaskStatus;

/// ErrorKind は運用分類
///
/// - Race: Janitor との競合で起こり得る想定内の結果（ログに残して結果を破棄）
/// - Caller: 呼び出し側の誤り（そのまま返す）
/// - Infrastructure: ストア障害（呼び出し側が backoff してリトライ）
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Race,
    Caller,
    Infrastructure,
}

#[derive(Debug, Error)]
pub enum QueueError {
    #[error("task {0} has no active lease")]
    NotLeased(TaskId),

    #[error("task {task_id} is leased by {holder}, not {caller}")]
    WrongOwner {
        task_id: TaskId,
        holder: WorkerId,
        caller: WorkerId,
    },

    #[error("task {task_id} is {actual}, expected {expected}")]
    InvalidState {
        task_id: TaskId,
        expected: TaskStatus,
        actual: TaskStatus,
    },

    #[error("task not found: {0}")]
    TaskNotFound(TaskId),

    #[error("worker not found: {0}")]
    WorkerNotFound(WorkerId),

    #[error("worker {0} has been revoked")]
    WorkerRevoked(WorkerId),

    #[error("invalid payload: {0}")]
    InvalidPayload(String),

    #[error("store unavailable: {0}")]
    StoreUnavailable(String),
}

impl QueueError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            QueueError::NotLeased(_) | QueueError::WrongOwner { .. } => ErrorKind::Race,
            QueueError::StoreUnavailable(_) => ErrorKind::Infrastructure,
            QueueError::InvalidState { .. }
            | QueueError::TaskNotFound(_)
            | QueueError::WorkerNotFound(_)
            | QueueError::WorkerRevoked(_)
            | QueueError::InvalidPayload(_) => ErrorKind::Caller,
        }
    }

    /// Lost a race with the janitor (or a duplicate resolution).
    pub fn is_race(&self) -> bool {
        self.kind() == ErrorKind::Race
    }

    /// Worth retrying after a backoff.
    pub fn is_retryable(&self) -> bool {
        self.kind() == ErrorKind::Infrastructure
    }
}
