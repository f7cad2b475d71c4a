//! Events - ドメインイベント
//!
//! Queue Service / Janitor が状態遷移のたびに EventSink へ送る。
//! tracing ログとは別に、テストやデモの集計に使う。

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::ids::{TaskId, WorkerId};

/// DomainEvent はドメインで発生したイベント
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum DomainEvent {
    TaskEnqueued {
        task_id: TaskId,
        at: DateTime<Utc>,
    },
    TaskAcquired {
        task_id: TaskId,
        worker_id: WorkerId,
        at: DateTime<Utc>,
    },
    TaskCompleted {
        task_id: TaskId,
        worker_id: WorkerId,
        at: DateTime<Utc>,
    },
    TaskFailed {
        task_id: TaskId,
        worker_id: WorkerId,
        at: DateTime<Utc>,
    },
    /// Lease が期限切れ → PENDING に戻した
    TaskRescued {
        task_id: TaskId,
        /// 期限切れになった lease の保持者
        worker_id: WorkerId,
        retries: u32,
        at: DateTime<Utc>,
    },
    /// Lease が期限切れ + retry 予算切れ → FAILURE
    TaskAbandoned {
        task_id: TaskId,
        worker_id: WorkerId,
        retries: u32,
        at: DateTime<Utc>,
    },
    /// Operator による FAILURE → PENDING
    TaskRetried {
        task_id: TaskId,
        at: DateTime<Utc>,
    },
}

impl DomainEvent {
    pub fn task_id(&self) -> TaskId {
        match self {
            DomainEvent::TaskEnqueued { task_id, .. }
            | DomainEvent::TaskAcquired { task_id, .. }
            | DomainEvent::TaskCompleted { task_id, .. }
            | DomainEvent::TaskFailed { task_id, .. }
            | DomainEvent::TaskRescued { task_id, .. }
            | DomainEvent::TaskAbandoned { task_id, .. }
            | DomainEvent::TaskRetried { task_id, .. } => *task_id,
        }
    }

    /// snake_case のイベント名（ログ・集計用）
    pub fn name(&self) -> &'static str {
        match self {
            DomainEvent::TaskEnqueued { .. } => "task_enqueued",
            DomainEvent::TaskAcquired { .. } => "task_acquired",
            DomainEvent::TaskCompleted { .. } => "task_completed",
            DomainEvent::TaskFailed { .. } => "task_failed",
            DomainEvent::TaskRescued { .. } => "task_rescued",
            DomainEvent::TaskAbandoned { .. } => "task_abandoned",
            DomainEvent::TaskRetried { .. } => "task_retried",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use ulid::Ulid;

    #[test]
    fn event_serializes_with_tag() {
        let task_id = TaskId::from_ulid(Ulid::new());
        let event = DomainEvent::TaskRescued {
            task_id,
            worker_id: WorkerId::from_ulid(Ulid::new()),
            retries: 1,
            at: Utc.with_ymd_and_hms(2024, 1, 1, 12, 0, 0).unwrap(),
        };

        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["event"], "task_rescued");
        assert_eq!(json["retries"], 1);
        assert_eq!(event.name(), "task_rescued");
        assert_eq!(event.task_id(), task_id);
    }
}
