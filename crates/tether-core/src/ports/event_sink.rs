//! EventSink port - ドメインイベントの送信先
//!
//! # 実装
//! - TracingEventSink: tracing に流す（デフォルト）
//! - MemoryEventSink: メモリに溜める（テスト・デモ集計用）

use crate::domain::DomainEvent;

/// EventSink はドメインイベントを記録
///
/// 送信の失敗で状態遷移を巻き戻すことはないので、戻り値は持たない。
pub trait EventSink: Send + Sync {
    fn emit(&self, event: DomainEvent);
}
