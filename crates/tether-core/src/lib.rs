//! tether-core
//!
//! Task lifecycle engine: producers enqueue JSON payloads, workers lease them one at a time,
//! and a janitor reclaims leases whose holder went silent.
//!
//! # モジュール構成
//! - **domain**: ドメインモデル（ids, task, lease, worker, decision, errors, events）
//! - **ports**: 抽象化レイヤー（TaskStore, WorkerRegistry, Clock, IdGenerator, EventSink）
//! - **app**: アプリケーションロジック（builder, queue_service, fleet, worker_loop, janitor）
//! - **impls**: 実装（in-memory / SQLite ストア、イベント送信先）
//! - **config**: engine / worker の設定値

pub mod app;
pub mod config;
pub mod domain;
pub mod impls;
pub mod ports;
