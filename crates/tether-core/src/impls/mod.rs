//! Impls - ports の実装
//!
//! # 含まれる実装
//! - **InMemoryTaskStore / InMemoryWorkerRegistry**: テスト・デモ用（プロセス内のみ）
//! - **SqliteStore**: 1 ファイルを複数プロセスで共有する本番用（feature `sqlite`）
//! - **TracingEventSink / MemoryEventSink**: ドメインイベントの送信先

pub mod event_sink;
pub mod memory;
pub mod memory_fleet;
#[cfg(feature = "sqlite")]
pub mod sqlite;

#[cfg(test)]
pub(crate) mod contract;

pub use self::event_sink::{MemoryEventSink, TracingEventSink};
pub use self::memory::InMemoryTaskStore;
pub use self::memory_fleet::InMemoryWorkerRegistry;
#[cfg(feature = "sqlite")]
pub use self::sqlite::SqliteStore;
