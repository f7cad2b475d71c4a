//! TaskStore の共通テスト
//!
//! `task_store_contract!(<store 生成式>)` を各実装のテストモジュールで展開すると、
//! 同じ性質をすべてのストアで検証できる。

use std::collections::HashSet;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use serde_json::json;
use ulid::Ulid;

use crate::domain::lease::expiry_cutoff;
use crate::domain::{
    Decider, Lease, QueueError, QueueStats, RetryBudgetDecider, TaskId, TaskRecord, TaskStatus,
    WorkerId, WorkerRecord,
};
use crate::impls::InMemoryTaskStore;
use crate::ports::{ReclaimOutcome, TaskStore, WorkerRegistry};

pub fn t0() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 1, 1, 12, 0, 0).unwrap()
}

pub fn at(secs: i64) -> DateTime<Utc> {
    t0() + chrono::Duration::seconds(secs)
}

pub fn worker() -> WorkerId {
    WorkerId::from_ulid(Ulid::new())
}

pub async fn enqueue<S: TaskStore + ?Sized>(store: &S) -> TaskId {
    enqueue_with(store, json!({"n": 0})).await
}

pub async fn enqueue_with<S: TaskStore + ?Sized>(store: &S, payload: serde_json::Value) -> TaskId {
    let task_id = TaskId::from_ulid(Ulid::new());
    store
        .insert_pending(TaskRecord::new(task_id, payload, t0()))
        .await
        .unwrap();
    task_id
}

fn budget(max_retries: u32) -> Arc<dyn Decider> {
    Arc::new(RetryBudgetDecider::new(max_retries))
}

const TIMEOUT: Duration = Duration::from_secs(30);

pub async fn fifo_acquire_then_empty<S: TaskStore>(store: S) {
    let a = enqueue(&store).await;
    let b = enqueue(&store).await;
    let c = enqueue(&store).await;
    let w = worker();

    let mut order = Vec::new();
    while let Some(record) = store.acquire_next(w, t0()).await.unwrap() {
        assert_eq!(record.status, TaskStatus::Processing);
        assert_eq!(record.assigned_worker, Some(w));
        assert_eq!(record.started_at, Some(t0()));
        order.push(record.task_id);
    }

    assert_eq!(order, vec![a, b, c]);
    assert!(store.acquire_next(w, t0()).await.unwrap().is_none());
}

pub async fn concurrent_acquire_is_exclusive<S: TaskStore + 'static>(store: Arc<S>) {
    const N: usize = 16;
    for _ in 0..N {
        enqueue(store.as_ref()).await;
    }

    let mut joins = Vec::with_capacity(N);
    for _ in 0..N {
        let store = Arc::clone(&store);
        joins.push(tokio::spawn(async move {
            store.acquire_next(worker(), t0()).await
        }));
    }

    let mut seen = HashSet::new();
    for join in joins {
        let record = join.await.unwrap().unwrap().expect("one task per acquire");
        assert!(seen.insert(record.task_id), "task acquired twice");
    }

    assert_eq!(seen.len(), N);
    let stats = store.stats().await.unwrap();
    assert_eq!(stats.pending, 0);
    assert_eq!(stats.in_flight, N);
}

pub async fn resolution_requires_lease_owner<S: TaskStore>(store: S) {
    let task_id = enqueue(&store).await;
    let owner = worker();
    let stranger = worker();
    store.acquire_next(owner, t0()).await.unwrap().unwrap();

    let err = store
        .complete(task_id, stranger, json!({"score": 0.1}), at(1))
        .await
        .unwrap_err();
    assert!(matches!(err, QueueError::WrongOwner { holder, caller, .. } if holder == owner && caller == stranger));

    let err = store
        .fail(task_id, stranger, "nope".into(), at(1))
        .await
        .unwrap_err();
    assert!(err.is_race());

    let done = store
        .complete(task_id, owner, json!({"score": 0.9}), at(2))
        .await
        .unwrap();
    assert_eq!(done.status, TaskStatus::Success);
    assert_eq!(done.completed_at, Some(at(2)));
    assert!(done.assigned_worker.is_none());
}

pub async fn second_completion_is_not_leased<S: TaskStore>(store: S) {
    let task_id = enqueue(&store).await;
    let w = worker();
    store.acquire_next(w, t0()).await.unwrap().unwrap();
    store
        .complete(task_id, w, json!({"score": 0.9}), at(1))
        .await
        .unwrap();

    let err = store
        .complete(task_id, w, json!({"score": 0.0}), at(2))
        .await
        .unwrap_err();
    assert!(matches!(err, QueueError::NotLeased(id) if id == task_id));

    let record = store.get(task_id).await.unwrap().unwrap();
    assert_eq!(record.result, Some(json!({"score": 0.9})));
    assert_eq!(record.completed_at, Some(at(1)));
}

pub async fn worker_failure_is_terminal<S: TaskStore>(store: S) {
    let task_id = enqueue(&store).await;
    let w = worker();
    store.acquire_next(w, t0()).await.unwrap().unwrap();

    let failed = store
        .fail(task_id, w, "model crashed".into(), at(3))
        .await
        .unwrap();
    assert_eq!(failed.status, TaskStatus::Failure);
    assert_eq!(failed.error_message.as_deref(), Some("model crashed"));
    assert_eq!(failed.retries, 0);

    // not requeued
    assert!(store.acquire_next(w, at(4)).await.unwrap().is_none());
    let stats = store.stats().await.unwrap();
    assert_eq!((stats.pending, stats.in_flight, stats.failure), (0, 0, 1));
}

pub async fn reclaim_rescues_then_abandons<S: TaskStore>(store: S) {
    let task_id = enqueue(&store).await;
    let w1 = worker();
    store.acquire_next(w1, t0()).await.unwrap().unwrap();

    // not yet expired at T+29
    assert!(store
        .expired_leases(expiry_cutoff(at(29), TIMEOUT))
        .await
        .unwrap()
        .is_empty());

    let expired = store
        .expired_leases(expiry_cutoff(at(31), TIMEOUT))
        .await
        .unwrap();
    assert_eq!(expired.len(), 1);
    assert_eq!(expired[0].task_id, task_id);
    assert_eq!(expired[0].worker_id, w1);

    let outcome = store.reclaim(expired[0], budget(1), at(31)).await.unwrap();
    let ReclaimOutcome::Rescued {
        record: rescued,
        reason,
    } = outcome
    else {
        panic!("expected rescue, got {outcome:?}");
    };
    assert_eq!(reason, "lease expired, retry 1/1");
    assert_eq!(rescued.status, TaskStatus::Pending);
    assert_eq!(rescued.retries, 1);
    assert!(rescued.assigned_worker.is_none());

    // second lease: started_at is rewritten
    let w2 = worker();
    let again = store.acquire_next(w2, at(40)).await.unwrap().unwrap();
    assert_eq!(again.task_id, task_id);
    assert_eq!(again.started_at, Some(at(40)));

    let expired = store
        .expired_leases(expiry_cutoff(at(71), TIMEOUT))
        .await
        .unwrap();
    let outcome = store.reclaim(expired[0], budget(1), at(71)).await.unwrap();
    let ReclaimOutcome::Abandoned(abandoned) = outcome else {
        panic!("expected abandon, got {outcome:?}");
    };
    assert_eq!(abandoned.status, TaskStatus::Failure);
    assert_eq!(abandoned.retries, 1);
    assert_eq!(
        abandoned.error_message.as_deref(),
        Some("lease expired after 1 retries")
    );
    assert_eq!(abandoned.completed_at, Some(at(71)));

    let stats = store.stats().await.unwrap();
    assert_eq!((stats.pending, stats.in_flight, stats.failure), (0, 0, 1));
}

pub async fn reclaim_loses_to_worker_resolution<S: TaskStore>(store: S) {
    let task_id = enqueue(&store).await;
    let w = worker();
    store.acquire_next(w, t0()).await.unwrap().unwrap();

    let expired = store
        .expired_leases(expiry_cutoff(at(31), TIMEOUT))
        .await
        .unwrap();

    // worker finishes between detection and reclaim
    store
        .complete(task_id, w, json!({"late": true}), at(31))
        .await
        .unwrap();

    let outcome = store.reclaim(expired[0], budget(1), at(32)).await.unwrap();
    assert_eq!(outcome, ReclaimOutcome::Skipped);

    let record = store.get(task_id).await.unwrap().unwrap();
    assert_eq!(record.status, TaskStatus::Success);
    assert_eq!(record.retries, 0);
}

pub async fn stale_lease_cannot_be_reclaimed_twice<S: TaskStore>(store: S) {
    let task_id = enqueue(&store).await;
    let w = worker();
    store.acquire_next(w, t0()).await.unwrap().unwrap();

    let expired = store
        .expired_leases(expiry_cutoff(at(31), TIMEOUT))
        .await
        .unwrap();
    let stale = expired[0];
    store.reclaim(stale, budget(5), at(31)).await.unwrap();

    // same worker picks it up again; the old lease is gone
    store.acquire_next(w, at(32)).await.unwrap().unwrap();
    let outcome = store.reclaim(stale, budget(5), at(33)).await.unwrap();
    assert_eq!(outcome, ReclaimOutcome::Skipped);

    let record = store.get(task_id).await.unwrap().unwrap();
    assert_eq!(record.status, TaskStatus::Processing);
    assert_eq!(record.retries, 1);
}

pub async fn late_completion_after_rescue_is_wrong_owner<S: TaskStore>(store: S) {
    let task_id = enqueue(&store).await;
    let slow = worker();
    let fast = worker();
    store.acquire_next(slow, t0()).await.unwrap().unwrap();

    let expired = store
        .expired_leases(expiry_cutoff(at(31), TIMEOUT))
        .await
        .unwrap();
    store.reclaim(expired[0], budget(1), at(31)).await.unwrap();
    store.acquire_next(fast, at(32)).await.unwrap().unwrap();

    let err = store
        .complete(task_id, slow, json!({"stale": true}), at(33))
        .await
        .unwrap_err();
    assert!(matches!(err, QueueError::WrongOwner { .. }));

    let record = store.get(task_id).await.unwrap().unwrap();
    assert_eq!(record.assigned_worker, Some(fast));
    assert!(record.result.is_none());
}

pub async fn operator_retry_ignores_budget<S: TaskStore>(store: S) {
    let first = enqueue(&store).await;
    let task_id = enqueue(&store).await;
    let w = worker();

    // exhaust the budget on task_id: rescue once, then abandon
    store.acquire_next(w, t0()).await.unwrap().unwrap();
    store.acquire_next(w, t0()).await.unwrap().unwrap();
    store.complete(first, w, json!({}), at(1)).await.unwrap();
    let expired = store
        .expired_leases(expiry_cutoff(at(31), TIMEOUT))
        .await
        .unwrap();
    store.reclaim(expired[0], budget(1), at(31)).await.unwrap();
    store.acquire_next(w, at(32)).await.unwrap().unwrap();
    let expired = store
        .expired_leases(expiry_cutoff(at(63), TIMEOUT))
        .await
        .unwrap();
    store.reclaim(expired[0], budget(1), at(63)).await.unwrap();

    let fresh = enqueue(&store).await;
    let retried = store.retry_failed(task_id).await.unwrap();
    assert_eq!(retried.status, TaskStatus::Pending);
    assert_eq!(retried.retries, 1);
    assert!(retried.error_message.is_none());
    assert!(retried.completed_at.is_none());

    // requeued behind the fresh arrival
    let next = store.acquire_next(w, at(70)).await.unwrap().unwrap();
    assert_eq!(next.task_id, fresh);
    let next = store.acquire_next(w, at(70)).await.unwrap().unwrap();
    assert_eq!(next.task_id, task_id);

    let err = store.retry_failed(first).await.unwrap_err();
    assert!(matches!(
        err,
        QueueError::InvalidState {
            expected: TaskStatus::Failure,
            actual: TaskStatus::Success,
            ..
        }
    ));

    let unknown = TaskId::from_ulid(Ulid::new());
    assert!(matches!(
        store.retry_failed(unknown).await.unwrap_err(),
        QueueError::TaskNotFound(id) if id == unknown
    ));
}

pub async fn retry_all_failed_keeps_failure_order<S: TaskStore>(store: S) {
    let a = enqueue(&store).await;
    let b = enqueue(&store).await;
    let ok = enqueue(&store).await;
    let w = worker();
    for _ in 0..3 {
        store.acquire_next(w, t0()).await.unwrap().unwrap();
    }
    // b fails first, then a
    store.fail(b, w, "b".into(), at(1)).await.unwrap();
    store.fail(a, w, "a".into(), at(2)).await.unwrap();
    store.complete(ok, w, json!({}), at(3)).await.unwrap();

    let ids = store.retry_all_failed().await.unwrap();
    assert_eq!(ids, vec![b, a]);

    let stats = store.stats().await.unwrap();
    assert_eq!((stats.pending, stats.failure, stats.success), (2, 0, 1));

    assert!(store.retry_all_failed().await.unwrap().is_empty());
}

pub async fn list_orders_by_status<S: TaskStore>(store: S) {
    let w = worker();
    let done_early = enqueue(&store).await;
    let done_late = enqueue(&store).await;
    let failed = enqueue(&store).await;
    let running = enqueue(&store).await;
    let queued_1 = enqueue(&store).await;
    let queued_2 = enqueue(&store).await;

    for secs in 0..4 {
        store.acquire_next(w, at(secs)).await.unwrap().unwrap();
    }
    store.complete(done_early, w, json!({}), at(10)).await.unwrap();
    store.complete(done_late, w, json!({}), at(11)).await.unwrap();
    store.fail(failed, w, "x".into(), at(12)).await.unwrap();

    let ids = |records: Vec<TaskRecord>| records.into_iter().map(|r| r.task_id).collect::<Vec<_>>();

    assert_eq!(
        ids(store.list(Some(TaskStatus::Success), 10).await.unwrap()),
        vec![done_late, done_early]
    );
    assert_eq!(
        ids(store.list(Some(TaskStatus::Pending), 10).await.unwrap()),
        vec![queued_1, queued_2]
    );
    assert_eq!(
        ids(store.list(Some(TaskStatus::Pending), 1).await.unwrap()),
        vec![queued_1]
    );
    assert_eq!(
        ids(store.list(None, 100).await.unwrap()),
        vec![failed, running, queued_1, queued_2, done_late, done_early]
    );
    assert_eq!(
        ids(store.list(None, 3).await.unwrap()),
        vec![failed, running, queued_1]
    );
}

pub async fn abc_scenario<S: TaskStore>(store: S) {
    let a = enqueue_with(&store, json!({"id": "A"})).await;
    let b = enqueue_with(&store, json!({"id": "B"})).await;
    let c = enqueue_with(&store, json!({"id": "C"})).await;
    let w = worker();

    for expected in [a, b, c] {
        let record = store.acquire_next(w, t0()).await.unwrap().unwrap();
        assert_eq!(record.task_id, expected);
    }
    assert!(store.acquire_next(w, t0()).await.unwrap().is_none());

    store
        .complete(b, w, json!({"score": 0.9}), at(5))
        .await
        .unwrap();
    let stats = store.stats().await.unwrap();
    assert_eq!((stats.pending, stats.in_flight, stats.success), (0, 2, 1));

    // C finishes in time; A's lease expires
    store.complete(c, w, json!({"score": 0.5}), at(20)).await.unwrap();
    let expired = store
        .expired_leases(expiry_cutoff(at(31), TIMEOUT))
        .await
        .unwrap();
    assert_eq!(expired.len(), 1);
    store.reclaim(expired[0], budget(1), at(31)).await.unwrap();

    let record = store.get(a).await.unwrap().unwrap();
    assert_eq!(record.status, TaskStatus::Pending);
    assert_eq!(record.retries, 1);

    store.acquire_next(w, at(32)).await.unwrap().unwrap();
    let expired = store
        .expired_leases(expiry_cutoff(at(63), TIMEOUT))
        .await
        .unwrap();
    store.reclaim(expired[0], budget(1), at(63)).await.unwrap();

    let record = store.get(a).await.unwrap().unwrap();
    assert_eq!(record.status, TaskStatus::Failure);
    assert_eq!(record.retries, 1);
}

async fn position_of<S: TaskStore>(store: &S, task_id: TaskId) -> Option<usize> {
    store.get_with_position(task_id).await.unwrap().unwrap().1
}

pub async fn queue_position_tracks_work_queue<S: TaskStore>(store: S) {
    let a = enqueue(&store).await;
    let _b = enqueue(&store).await;
    let c = enqueue(&store).await;
    let w = worker();

    assert_eq!(position_of(&store, a).await, Some(1));
    assert_eq!(position_of(&store, c).await, Some(3));

    store.acquire_next(w, t0()).await.unwrap().unwrap();
    assert_eq!(position_of(&store, a).await, None);
    assert_eq!(position_of(&store, c).await, Some(2));

    // rescued task rejoins at the tail
    let expired = store.expired_leases(t0()).await.unwrap();
    store.reclaim(expired[0], budget(1), at(31)).await.unwrap();
    assert_eq!(position_of(&store, a).await, Some(3));

    let unknown = TaskId::from_ulid(Ulid::new());
    assert!(store.get_with_position(unknown).await.unwrap().is_none());
}

/// `expired_leases` / `acquire_next` を指定回数だけ StoreUnavailable にするラッパー
#[derive(Clone, Default)]
pub struct OutageStore {
    inner: InMemoryTaskStore,
    expired_leases_failures: Arc<AtomicUsize>,
    acquire_failures: Arc<AtomicUsize>,
}

impl OutageStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fail_expired_leases(&self, times: usize) {
        self.expired_leases_failures.store(times, Ordering::SeqCst);
    }

    pub fn fail_acquires(&self, times: usize) {
        self.acquire_failures.store(times, Ordering::SeqCst);
    }

    pub fn remaining_acquire_failures(&self) -> usize {
        self.acquire_failures.load(Ordering::SeqCst)
    }

    fn outage(counter: &AtomicUsize, op: &str) -> Result<(), QueueError> {
        let down = counter
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if down {
            Err(QueueError::StoreUnavailable(format!("{op}: connection refused")))
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl TaskStore for OutageStore {
    async fn insert_pending(&self, record: TaskRecord) -> Result<(), QueueError> {
        self.inner.insert_pending(record).await
    }

    async fn acquire_next(
        &self,
        worker_id: WorkerId,
        now: DateTime<Utc>,
    ) -> Result<Option<TaskRecord>, QueueError> {
        Self::outage(&self.acquire_failures, "acquire_next")?;
        self.inner.acquire_next(worker_id, now).await
    }

    async fn complete(
        &self,
        task_id: TaskId,
        worker_id: WorkerId,
        result: serde_json::Value,
        now: DateTime<Utc>,
    ) -> Result<TaskRecord, QueueError> {
        self.inner.complete(task_id, worker_id, result, now).await
    }

    async fn fail(
        &self,
        task_id: TaskId,
        worker_id: WorkerId,
        error_message: String,
        now: DateTime<Utc>,
    ) -> Result<TaskRecord, QueueError> {
        self.inner.fail(task_id, worker_id, error_message, now).await
    }

    async fn retry_failed(&self, task_id: TaskId) -> Result<TaskRecord, QueueError> {
        self.inner.retry_failed(task_id).await
    }

    async fn retry_all_failed(&self) -> Result<Vec<TaskId>, QueueError> {
        self.inner.retry_all_failed().await
    }

    async fn expired_leases(&self, cutoff: DateTime<Utc>) -> Result<Vec<Lease>, QueueError> {
        Self::outage(&self.expired_leases_failures, "expired_leases")?;
        self.inner.expired_leases(cutoff).await
    }

    async fn reclaim(
        &self,
        expected: Lease,
        decider: Arc<dyn Decider>,
        now: DateTime<Utc>,
    ) -> Result<ReclaimOutcome, QueueError> {
        self.inner.reclaim(expected, decider, now).await
    }

    async fn get(&self, task_id: TaskId) -> Result<Option<TaskRecord>, QueueError> {
        self.inner.get(task_id).await
    }

    async fn get_with_position(
        &self,
        task_id: TaskId,
    ) -> Result<Option<(TaskRecord, Option<usize>)>, QueueError> {
        self.inner.get_with_position(task_id).await
    }

    async fn list(
        &self,
        status: Option<TaskStatus>,
        limit: usize,
    ) -> Result<Vec<TaskRecord>, QueueError> {
        self.inner.list(status, limit).await
    }

    async fn stats(&self) -> Result<QueueStats, QueueError> {
        self.inner.stats().await
    }
}

fn new_worker(name: &str, registered_at: DateTime<Utc>) -> WorkerRecord {
    WorkerRecord::new(worker(), name, registered_at)
}

pub async fn heartbeat_and_revoke<R: WorkerRegistry>(registry: R) {
    let gpu = new_worker("gpu-1", t0());
    registry.insert_worker(gpu.clone()).await.unwrap();

    let beat = registry.record_heartbeat(gpu.worker_id, at(10)).await.unwrap();
    assert_eq!(beat.last_heartbeat_at, Some(at(10)));

    let revoked = registry.revoke_worker(gpu.worker_id, at(20)).await.unwrap();
    assert!(!revoked.is_active());
    assert_eq!(revoked.revoked_at, Some(at(20)));

    // idempotent, first timestamp kept
    let again = registry.revoke_worker(gpu.worker_id, at(30)).await.unwrap();
    assert_eq!(again.revoked_at, Some(at(20)));

    let err = registry
        .record_heartbeat(gpu.worker_id, at(40))
        .await
        .unwrap_err();
    assert!(matches!(err, QueueError::WorkerRevoked(id) if id == gpu.worker_id));

    // never deleted
    let kept = registry.get_worker(gpu.worker_id).await.unwrap().unwrap();
    assert_eq!(kept.last_heartbeat_at, Some(at(10)));
}

pub async fn unknown_worker_is_not_found<R: WorkerRegistry>(registry: R) {
    let ghost = worker();
    assert!(registry.get_worker(ghost).await.unwrap().is_none());
    assert!(matches!(
        registry.record_heartbeat(ghost, t0()).await.unwrap_err(),
        QueueError::WorkerNotFound(id) if id == ghost
    ));
    assert!(matches!(
        registry.revoke_worker(ghost, t0()).await.unwrap_err(),
        QueueError::WorkerNotFound(_)
    ));
}

pub async fn workers_listed_in_registration_order<R: WorkerRegistry>(registry: R) {
    let second = new_worker("b", at(5));
    let first = new_worker("a", at(1));
    registry.insert_worker(second.clone()).await.unwrap();
    registry.insert_worker(first.clone()).await.unwrap();

    // re-inserting the same id keeps the original record
    let mut renamed = first.clone();
    renamed.name = "renamed".into();
    registry.insert_worker(renamed).await.unwrap();

    let names: Vec<String> = registry
        .list_workers()
        .await
        .unwrap()
        .into_iter()
        .map(|w| w.name)
        .collect();
    assert_eq!(names, vec!["a", "b"]);
}

macro_rules! worker_registry_contract {
    ($make:expr) => {
        #[tokio::test]
        async fn contract_heartbeat_and_revoke() {
            $crate::impls::contract::heartbeat_and_revoke($make).await;
        }

        #[tokio::test]
        async fn contract_unknown_worker_is_not_found() {
            $crate::impls::contract::unknown_worker_is_not_found($make).await;
        }

        #[tokio::test]
        async fn contract_workers_listed_in_registration_order() {
            $crate::impls::contract::workers_listed_in_registration_order($make).await;
        }
    };
}

pub(crate) use worker_registry_contract;

/// Expand the contract tests for a store constructor expression.
macro_rules! task_store_contract {
    ($make:expr) => {
        #[tokio::test]
        async fn contract_fifo_acquire_then_empty() {
            $crate::impls::contract::fifo_acquire_then_empty($make).await;
        }

        #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
        async fn contract_concurrent_acquire_is_exclusive() {
            $crate::impls::contract::concurrent_acquire_is_exclusive(::std::sync::Arc::new($make))
                .await;
        }

        #[tokio::test]
        async fn contract_resolution_requires_lease_owner() {
            $crate::impls::contract::resolution_requires_lease_owner($make).await;
        }

        #[tokio::test]
        async fn contract_second_completion_is_not_leased() {
            $crate::impls::contract::second_completion_is_not_leased($make).await;
        }

        #[tokio::test]
        async fn contract_worker_failure_is_terminal() {
            $crate::impls::contract::worker_failure_is_terminal($make).await;
        }

        #[tokio::test]
        async fn contract_reclaim_rescues_then_abandons() {
            $crate::impls::contract::reclaim_rescues_then_abandons($make).await;
        }

        #[tokio::test]
        async fn contract_reclaim_loses_to_worker_resolution() {
            $crate::impls::contract::reclaim_loses_to_worker_resolution($make).await;
        }

        #[tokio::test]
        async fn contract_stale_lease_cannot_be_reclaimed_twice() {
            $crate::impls::contract::stale_lease_cannot_be_reclaimed_twice($make).await;
        }

        #[tokio::test]
        async fn contract_late_completion_after_rescue_is_wrong_owner() {
            $crate::impls::contract::late_completion_after_rescue_is_wrong_owner($make).await;
        }

        #[tokio::test]
        async fn contract_operator_retry_ignores_budget() {
            $crate::impls::contract::operator_retry_ignores_budget($make).await;
        }

        #[tokio::test]
        async fn contract_retry_all_failed_keeps_failure_order() {
            $crate::impls::contract::retry_all_failed_keeps_failure_order($make).await;
        }

        #[tokio::test]
        async fn contract_list_orders_by_status() {
            $crate::impls::contract::list_orders_by_status($make).await;
        }

        #[tokio::test]
        async fn contract_queue_position_tracks_work_queue() {
            $crate::impls::contract::queue_position_tracks_work_queue($make).await;
        }

        #[tokio::test]
        async fn contract_abc_scenario() {
            $crate::impls::contract::abc_scenario($make).await;
        }
    };
}

pub(crate) use task_store_contract;
