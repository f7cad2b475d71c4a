//! Ports - 抽象化レイヤー
//!
//! このモジュールは Hexagonal Architecture の「ポート」を定義します。
//! 各 trait は外部のストアや時刻源へのインターフェースを提供し、実装の詳細を隠蔽します。
//!
//! # 設計原則
//! - TaskStore が task / queue / lease の正本
//! - WorkerRegistry は fleet の記録のみ（lease には触らない）
//! - 時刻と ID は Clock / IdGenerator 経由（テストで差し替え可能）

pub mod clock;
pub mod event_sink;
pub mod id_generator;
pub mod task_store;
pub mod worker_registry;

pub use self::clock::{Clock, FixedClock, SystemClock};
pub use self::event_sink::EventSink;
pub use self::id_generator::{IdGenerator, UlidGenerator};
pub use self::task_store::{LIST_ORDER, ReclaimOutcome, TaskStore};
pub use self::worker_registry::WorkerRegistry;
