//! App - アプリケーション層
//!
//! このモジュールは、ports を組み合わせてアプリケーションロジックを実装します。
//!
//! # 主要コンポーネント
//! - **EngineBuilder / Engine**: 構築とワイヤリング
//! - **QueueService**: producer / operator 向けの操作（enqueue, retry, stats, ...）
//! - **FleetRegistry**: worker の登録・heartbeat・revoke
//! - **WorkerGateway**: 認証済み worker 向けの acquire / complete / fail
//! - **WorkerLoop / WorkerGroup**: polling worker
//! - **Janitor**: 期限切れ lease の回収

pub mod builder;
pub mod fleet;
pub mod gateway;
pub mod janitor;
pub mod queue_service;
pub mod status;
pub mod worker_loop;

// 主要な型を再エクスポート
pub use self::builder::{BuildError, Engine, EngineBuilder};
pub use self::fleet::FleetRegistry;
pub use self::gateway::WorkerGateway;
pub use self::janitor::{Janitor, JanitorHandle};
pub use self::queue_service::{QueueService, parse_payload};
pub use self::status::{TaskStatusView, WorkerView};
pub use self::worker_loop::{Step, TaskProcessor, WorkerGroup, WorkerLoop, WorkerReport};
