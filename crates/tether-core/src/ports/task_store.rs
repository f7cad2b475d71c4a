//! TaskStore port - task 状態の正本（source of truth）
//!
//! TaskStore は 3 つの構造を 1 つのトランザクション領域として管理します：
//! - Task records（task_id → TaskRecord）
//! - Work queue（PENDING の task_id を FIFO で保持）
//! - Lease table（task_id → Lease、PROCESSING の間だけ存在）
//!
//! # 実装
//! - `impls::memory::InMemoryTaskStore`（テスト・デモ用）
//! - `impls::sqlite::SqliteStore`（複数プロセスで共有する本番用）

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::domain::{Decider, Lease, QueueError, QueueStats, TaskId, TaskRecord, TaskStatus, WorkerId};

/// Janitor が 1 つの期限切れ lease を処理した結果
#[derive(Debug, Clone, PartialEq)]
pub enum ReclaimOutcome {
    /// PENDING に戻して queue 末尾へ（retries + 1 済み）。`reason` は decider の判断理由
    Rescued { record: TaskRecord, reason: String },
    /// FAILURE で確定
    Abandoned(TaskRecord),
    /// 検出から reclaim までの間に worker が complete / fail した
    Skipped,
}

/// TaskStore は task / queue / lease の正本
///
/// # 設計原則
/// - 各メソッドは全体で 1 つの原子的操作。途中の状態は外から見えない
/// - acquire の pop と lease 書き込みは分割しない（途中で落ちても task は消えない）
/// - ownership チェック（NotLeased / WrongOwner）は complete / fail / reclaim で共通
#[async_trait]
pub trait TaskStore: Send + Sync {
    /// 新しい PENDING task を保存し、work queue 末尾に追加
    async fn insert_pending(&self, record: TaskRecord) -> Result<(), QueueError>;

    /// queue 先頭を pop → lease 発行 → PROCESSING。queue が空なら `None`
    async fn acquire_next(
        &self,
        worker_id: WorkerId,
        now: DateTime<Utc>,
    ) -> Result<Option<TaskRecord>, QueueError>;

    /// lease を削除して SUCCESS
    async fn complete(
        &self,
        task_id: TaskId,
        worker_id: WorkerId,
        result: serde_json::Value,
        now: DateTime<Utc>,
    ) -> Result<TaskRecord, QueueError>;

    /// lease を削除して FAILURE（自動リトライなし）
    async fn fail(
        &self,
        task_id: TaskId,
        worker_id: WorkerId,
        error_message: String,
        now: DateTime<Utc>,
    ) -> Result<TaskRecord, QueueError>;

    /// FAILURE → PENDING（operator 操作、retries はそのまま）
    async fn retry_failed(&self, task_id: TaskId) -> Result<TaskRecord, QueueError>;

    /// 全 FAILURE task を失敗順に queue 末尾へ。戻した task_id を返す
    async fn retry_all_failed(&self) -> Result<Vec<TaskId>, QueueError>;

    /// `lease_start <= cutoff` の lease を列挙（古い順）
    async fn expired_leases(&self, cutoff: DateTime<Utc>) -> Result<Vec<Lease>, QueueError>;

    /// 期限切れ lease を 1 件処理
    ///
    /// lease が `expected` のまま（同じ worker・同じ lease_start）でなければ Skipped。
    /// そうでなければ decider の判断を lease 削除と同時に適用する。
    async fn reclaim(
        &self,
        expected: Lease,
        decider: Arc<dyn Decider>,
        now: DateTime<Utc>,
    ) -> Result<ReclaimOutcome, QueueError>;

    async fn get(&self, task_id: TaskId) -> Result<Option<TaskRecord>, QueueError>;

    /// `get` + work queue 内の位置（先頭 = 1）を同じ snapshot で。queue に無ければ位置は `None`
    async fn get_with_position(
        &self,
        task_id: TaskId,
    ) -> Result<Option<(TaskRecord, Option<usize>)>, QueueError>;

    /// status 指定あり: その status の task を最大 `limit` 件
    /// - PENDING: queue 順
    /// - PROCESSING: lease 開始順
    /// - SUCCESS / FAILURE: 完了時刻の新しい順
    ///
    /// status 指定なし: FAILURE → PROCESSING → PENDING → SUCCESS の順に連結して `limit` で切る
    async fn list(
        &self,
        status: Option<TaskStatus>,
        limit: usize,
    ) -> Result<Vec<TaskRecord>, QueueError>;

    /// 1 つの snapshot から集計した件数
    async fn stats(&self) -> Result<QueueStats, QueueError>;
}

/// 未指定 list の連結順
pub const LIST_ORDER: [TaskStatus; 4] = [
    TaskStatus::Failure,
    TaskStatus::Processing,
    TaskStatus::Pending,
    TaskStatus::Success,
];
