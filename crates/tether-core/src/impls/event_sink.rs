//! EventSink 実装
//!
//! - TracingEventSink: `tracing` に構造化ログとして流す（デフォルト）
//! - MemoryEventSink: Vec に溜める（テスト・デモの集計用）

use std::sync::{Arc, Mutex};

use crate::domain::DomainEvent;
use crate::ports::EventSink;

#[derive(Debug, Clone, Copy, Default)]
pub struct TracingEventSink;

impl EventSink for TracingEventSink {
    fn emit(&self, event: DomainEvent) {
        match &event {
            DomainEvent::TaskAbandoned {
                task_id,
                worker_id,
                retries,
                ..
            } => tracing::error!(
                target: "tether::events",
                event = event.name(),
                task_id = %task_id,
                worker_id = %worker_id,
                retries,
                "task abandoned"
            ),
            DomainEvent::TaskRescued {
                task_id,
                worker_id,
                retries,
                ..
            } => tracing::warn!(
                target: "tether::events",
                event = event.name(),
                task_id = %task_id,
                worker_id = %worker_id,
                retries,
                "task rescued"
            ),
            other => tracing::debug!(
                target: "tether::events",
                event = other.name(),
                task_id = %other.task_id(),
                "domain event"
            ),
        }
    }
}

/// 受け取ったイベントをすべて保持する
///
/// clone は同じバッファを共有する。
#[derive(Debug, Clone, Default)]
pub struct MemoryEventSink {
    events: Arc<Mutex<Vec<DomainEvent>>>,
}

impl MemoryEventSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<DomainEvent> {
        self.events
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    /// 指定した名前のイベント数（`DomainEvent::name`）
    pub fn count(&self, name: &str) -> usize {
        self.events
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .iter()
            .filter(|e| e.name() == name)
            .count()
    }
}

impl EventSink for MemoryEventSink {
    fn emit(&self, event: DomainEvent) {
        self.events
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(event);
    }
}
