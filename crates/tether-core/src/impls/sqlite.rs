//! SQLite-backed TaskStore + WorkerRegistry.
//!
//! 1 ファイルを複数プロセス（worker / janitor / CLI）で共有する前提。
//! 各操作は `BEGIN IMMEDIATE` トランザクション 1 つで完結し、
//! `spawn_blocking` 上で実行する。途中で失敗したトランザクションは drop でロールバックされる。
//!
//! # テーブル
//! - `tasks`: TaskRecord の正本
//! - `pending`: work queue（AUTOINCREMENT の seq が FIFO 順）
//! - `leases`: lease table
//! - `workers`: fleet registry

use std::path::Path;
use std::sync::{Arc, Mutex};
#[cfg(test)]
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use rusqlite::{Connection, OptionalExtension, Transaction, TransactionBehavior, params};

use crate::domain::ids::{Id, IdMarker};
use crate::domain::lease::{check_owner, check_unchanged};
use crate::domain::{
    Decider, Decision, Lease, QueueError, QueueStats, TaskId, TaskRecord, TaskStatus, WorkerId,
    WorkerRecord,
};
use crate::ports::{LIST_ORDER, ReclaimOutcome, TaskStore, WorkerRegistry};

const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS tasks (
  task_id TEXT PRIMARY KEY,
  status TEXT NOT NULL,
  payload TEXT NOT NULL,
  result TEXT,
  error_message TEXT,
  retries INTEGER NOT NULL DEFAULT 0,
  assigned_worker TEXT,
  created_at_ms INTEGER NOT NULL,
  started_at_ms INTEGER,
  completed_at_ms INTEGER
);
CREATE INDEX IF NOT EXISTS idx_tasks_status_completed ON tasks(status, completed_at_ms);

CREATE TABLE IF NOT EXISTS pending (
  seq INTEGER PRIMARY KEY AUTOINCREMENT,
  task_id TEXT NOT NULL UNIQUE
);

CREATE TABLE IF NOT EXISTS leases (
  task_id TEXT PRIMARY KEY,
  worker_id TEXT NOT NULL,
  lease_start_ms INTEGER NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_leases_start ON leases(lease_start_ms);

CREATE TABLE IF NOT EXISTS workers (
  worker_id TEXT PRIMARY KEY,
  name TEXT NOT NULL,
  registered_at_ms INTEGER NOT NULL,
  revoked_at_ms INTEGER,
  last_heartbeat_at_ms INTEGER
);
"#;

const TASK_SELECT: &str = "SELECT t.task_id, t.status, t.payload, t.result, t.error_message, \
     t.retries, t.assigned_worker, t.created_at_ms, t.started_at_ms, t.completed_at_ms \
     FROM tasks t";

const WORKER_SELECT: &str =
    "SELECT worker_id, name, registered_at_ms, revoked_at_ms, last_heartbeat_at_ms FROM workers";

/// rusqlite のエラーはすべてストア障害として扱う
impl From<rusqlite::Error> for QueueError {
    fn from(err: rusqlite::Error) -> Self {
        QueueError::StoreUnavailable(format!("sqlite: {err}"))
    }
}

#[derive(Clone)]
pub struct SqliteStore {
    conn: Arc<Mutex<Connection>>,

    #[cfg(test)]
    crash_after_pop: Arc<AtomicBool>,
}

impl SqliteStore {
    /// Open (or create) the database file and apply the schema.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, QueueError> {
        let conn = Connection::open(path.as_ref()).map_err(|e| {
            QueueError::StoreUnavailable(format!(
                "open sqlite store {}: {e}",
                path.as_ref().display()
            ))
        })?;
        Self::from_connection(conn)
    }

    /// Private in-memory database (tests, demo).
    pub fn open_in_memory() -> Result<Self, QueueError> {
        Self::from_connection(Connection::open_in_memory()?)
    }

    fn from_connection(conn: Connection) -> Result<Self, QueueError> {
        conn.busy_timeout(BUSY_TIMEOUT)?;
        conn.pragma_update_and_check(None, "journal_mode", "WAL", |_| Ok(()))?;
        conn.execute_batch(SCHEMA)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
            #[cfg(test)]
            crash_after_pop: Arc::new(AtomicBool::new(false)),
        })
    }

    #[cfg(test)]
    pub(crate) fn crash_next_acquire_after_pop(&self) {
        self.crash_after_pop.store(true, Ordering::SeqCst);
    }

    /// Run `op` on the blocking pool with the connection locked.
    async fn run<T, F>(&self, op: F) -> Result<T, QueueError>
    where
        T: Send + 'static,
        F: FnOnce(&mut Connection) -> Result<T, QueueError> + Send + 'static,
    {
        let conn = Arc::clone(&self.conn);
        tokio::task::spawn_blocking(move || {
            let mut conn = conn.lock().map_err(|_| {
                QueueError::StoreUnavailable("sqlite connection lock poisoned".to_string())
            })?;
            op(&mut conn)
        })
        .await
        .map_err(|e| QueueError::StoreUnavailable(format!("sqlite task join: {e}")))?
    }

    /// One IMMEDIATE transaction. Committed only if `op` succeeds.
    async fn write<T, F>(&self, op: F) -> Result<T, QueueError>
    where
        T: Send + 'static,
        F: FnOnce(&Transaction<'_>) -> Result<T, QueueError> + Send + 'static,
    {
        self.run(move |conn| {
            let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
            let out = op(&tx)?;
            tx.commit()?;
            Ok(out)
        })
        .await
    }

    /// Read-only snapshot (deferred transaction, rolled back on drop).
    async fn read<T, F>(&self, op: F) -> Result<T, QueueError>
    where
        T: Send + 'static,
        F: FnOnce(&Transaction<'_>) -> Result<T, QueueError> + Send + 'static,
    {
        self.run(move |conn| {
            let tx = conn.transaction()?;
            op(&tx)
        })
        .await
    }
}

#[async_trait]
impl TaskStore for SqliteStore {
    async fn insert_pending(&self, record: TaskRecord) -> Result<(), QueueError> {
        self.write(move |tx| {
            insert_task(tx, &record)?;
            push_pending(tx, record.task_id)
        })
        .await
    }

    async fn acquire_next(
        &self,
        worker_id: WorkerId,
        now: DateTime<Utc>,
    ) -> Result<Option<TaskRecord>, QueueError> {
        #[cfg(test)]
        let crash_after_pop = Arc::clone(&self.crash_after_pop);

        self.write(move |tx| {
            let head: Option<(i64, String)> = tx
                .query_row(
                    "SELECT seq, task_id FROM pending ORDER BY seq LIMIT 1",
                    [],
                    |r| Ok((r.get(0)?, r.get(1)?)),
                )
                .optional()?;
            let Some((seq, task_text)) = head else {
                return Ok(None);
            };
            let task_id: TaskId = parse_id(&task_text)?;

            let mut record = load_task(tx, task_id)?;
            record.start_processing(worker_id, now)?;

            tx.execute("DELETE FROM pending WHERE seq = ?1", params![seq])?;

            #[cfg(test)]
            if crash_after_pop.swap(false, Ordering::SeqCst) {
                return Err(QueueError::StoreUnavailable(
                    "simulated crash after pop".to_string(),
                ));
            }

            tx.execute(
                "INSERT INTO leases (task_id, worker_id, lease_start_ms) VALUES (?1, ?2, ?3)",
                params![id_text(task_id), id_text(worker_id), dt_to_ms(now)],
            )?;
            save_task(tx, &record)?;
            load_task(tx, task_id).map(Some)
        })
        .await
    }

    async fn complete(
        &self,
        task_id: TaskId,
        worker_id: WorkerId,
        result: serde_json::Value,
        now: DateTime<Utc>,
    ) -> Result<TaskRecord, QueueError> {
        self.write(move |tx| {
            check_owner(task_id, load_lease(tx, task_id)?.as_ref(), worker_id)?;
            let mut record = load_task(tx, task_id)?;
            record.mark_succeeded(result, now)?;
            delete_lease(tx, task_id)?;
            save_task(tx, &record)?;
            load_task(tx, task_id)
        })
        .await
    }

    async fn fail(
        &self,
        task_id: TaskId,
        worker_id: WorkerId,
        error_message: String,
        now: DateTime<Utc>,
    ) -> Result<TaskRecord, QueueError> {
        self.write(move |tx| {
            check_owner(task_id, load_lease(tx, task_id)?.as_ref(), worker_id)?;
            let mut record = load_task(tx, task_id)?;
            record.mark_failed(error_message, now)?;
            delete_lease(tx, task_id)?;
            save_task(tx, &record)?;
            load_task(tx, task_id)
        })
        .await
    }

    async fn retry_failed(&self, task_id: TaskId) -> Result<TaskRecord, QueueError> {
        self.write(move |tx| {
            let mut record = load_task(tx, task_id)?;
            record.reset_for_retry()?;
            save_task(tx, &record)?;
            push_pending(tx, task_id)?;
            load_task(tx, task_id)
        })
        .await
    }

    async fn retry_all_failed(&self) -> Result<Vec<TaskId>, QueueError> {
        self.write(move |tx| {
            let ids = {
                let mut stmt = tx.prepare(
                    "SELECT task_id FROM tasks WHERE status = ?1 \
                     ORDER BY completed_at_ms, task_id",
                )?;
                let rows = stmt.query_map(params![TaskStatus::Failure.as_str()], |r| {
                    r.get::<_, String>(0)
                })?;
                let mut ids = Vec::new();
                for row in rows {
                    ids.push(parse_id::<crate::domain::ids::Task>(&row?)?);
                }
                ids
            };

            for task_id in &ids {
                let mut record = load_task(tx, *task_id)?;
                record.reset_for_retry()?;
                save_task(tx, &record)?;
                push_pending(tx, *task_id)?;
            }
            Ok(ids)
        })
        .await
    }

    async fn expired_leases(&self, cutoff: DateTime<Utc>) -> Result<Vec<Lease>, QueueError> {
        self.read(move |tx| {
            let mut stmt = tx.prepare(
                "SELECT task_id, worker_id, lease_start_ms FROM leases \
                 WHERE lease_start_ms <= ?1 ORDER BY lease_start_ms, task_id",
            )?;
            let rows = stmt.query_map(params![dt_to_ms(cutoff)], map_lease_row)?;
            let mut leases = Vec::new();
            for row in rows {
                leases.push(row?.into_lease()?);
            }
            Ok(leases)
        })
        .await
    }

    async fn reclaim(
        &self,
        expected: Lease,
        decider: Arc<dyn Decider>,
        now: DateTime<Utc>,
    ) -> Result<ReclaimOutcome, QueueError> {
        self.write(move |tx| {
            let task_id = expected.task_id;
            if check_unchanged(&expected, load_lease(tx, task_id)?.as_ref()).is_err() {
                return Ok(ReclaimOutcome::Skipped);
            }

            let mut record = load_task(tx, task_id)?;
            match decider.decide_expired(&record) {
                Decision::Requeue { reason } => {
                    record.requeue_after_expiry()?;
                    delete_lease(tx, task_id)?;
                    save_task(tx, &record)?;
                    push_pending(tx, task_id)?;
                    Ok(ReclaimOutcome::Rescued {
                        record: load_task(tx, task_id)?,
                        reason,
                    })
                }
                Decision::MarkFailed { reason } => {
                    record.mark_failed(reason, now)?;
                    delete_lease(tx, task_id)?;
                    save_task(tx, &record)?;
                    Ok(ReclaimOutcome::Abandoned(load_task(tx, task_id)?))
                }
            }
        })
        .await
    }

    async fn get(&self, task_id: TaskId) -> Result<Option<TaskRecord>, QueueError> {
        self.read(move |tx| find_task(tx, task_id)).await
    }

    async fn get_with_position(
        &self,
        task_id: TaskId,
    ) -> Result<Option<(TaskRecord, Option<usize>)>, QueueError> {
        self.read(move |tx| {
            let Some(record) = find_task(tx, task_id)? else {
                return Ok(None);
            };
            let seq: Option<i64> = tx
                .query_row(
                    "SELECT seq FROM pending WHERE task_id = ?1",
                    params![id_text(task_id)],
                    |r| r.get(0),
                )
                .optional()?;
            let position = match seq {
                Some(seq) => {
                    let ahead: i64 = tx.query_row(
                        "SELECT COUNT(*) FROM pending WHERE seq <= ?1",
                        params![seq],
                        |r| r.get(0),
                    )?;
                    Some(ahead.max(0) as usize)
                }
                None => None,
            };
            Ok(Some((record, position)))
        })
        .await
    }

    async fn list(
        &self,
        status: Option<TaskStatus>,
        limit: usize,
    ) -> Result<Vec<TaskRecord>, QueueError> {
        self.read(move |tx| match status {
            Some(status) => list_status(tx, status, limit),
            None => {
                let mut tasks = Vec::new();
                for status in LIST_ORDER {
                    if tasks.len() >= limit {
                        break;
                    }
                    tasks.extend(list_status(tx, status, limit - tasks.len())?);
                }
                Ok(tasks)
            }
        })
        .await
    }

    async fn stats(&self) -> Result<QueueStats, QueueError> {
        self.read(|tx| {
            let count = |sql: &str, status: Option<TaskStatus>| -> Result<usize, QueueError> {
                let n: i64 = match status {
                    Some(status) => tx.query_row(sql, params![status.as_str()], |r| r.get(0))?,
                    None => tx.query_row(sql, [], |r| r.get(0))?,
                };
                Ok(n.max(0) as usize)
            };
            let by_status = "SELECT COUNT(*) FROM tasks WHERE status = ?1";
            Ok(QueueStats {
                pending: count("SELECT COUNT(*) FROM pending", None)?,
                in_flight: count("SELECT COUNT(*) FROM leases", None)?,
                success: count(by_status, Some(TaskStatus::Success))?,
                failure: count(by_status, Some(TaskStatus::Failure))?,
            })
        })
        .await
    }
}

#[async_trait]
impl WorkerRegistry for SqliteStore {
    async fn insert_worker(&self, record: WorkerRecord) -> Result<(), QueueError> {
        self.write(move |tx| {
            tx.execute(
                "INSERT OR IGNORE INTO workers \
                 (worker_id, name, registered_at_ms, revoked_at_ms, last_heartbeat_at_ms) \
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                params![
                    id_text(record.worker_id),
                    record.name,
                    dt_to_ms(record.registered_at),
                    record.revoked_at.map(dt_to_ms),
                    record.last_heartbeat_at.map(dt_to_ms),
                ],
            )?;
            Ok(())
        })
        .await
    }

    async fn get_worker(&self, worker_id: WorkerId) -> Result<Option<WorkerRecord>, QueueError> {
        self.read(move |tx| find_worker(tx, worker_id)).await
    }

    async fn record_heartbeat(
        &self,
        worker_id: WorkerId,
        now: DateTime<Utc>,
    ) -> Result<WorkerRecord, QueueError> {
        self.write(move |tx| {
            let mut worker =
                find_worker(tx, worker_id)?.ok_or(QueueError::WorkerNotFound(worker_id))?;
            if !worker.is_active() {
                return Err(QueueError::WorkerRevoked(worker_id));
            }
            worker.record_heartbeat(now);
            save_worker(tx, &worker)?;
            find_worker(tx, worker_id)?.ok_or(QueueError::WorkerNotFound(worker_id))
        })
        .await
    }

    async fn revoke_worker(
        &self,
        worker_id: WorkerId,
        now: DateTime<Utc>,
    ) -> Result<WorkerRecord, QueueError> {
        self.write(move |tx| {
            let mut worker =
                find_worker(tx, worker_id)?.ok_or(QueueError::WorkerNotFound(worker_id))?;
            worker.revoke(now);
            save_worker(tx, &worker)?;
            find_worker(tx, worker_id)?.ok_or(QueueError::WorkerNotFound(worker_id))
        })
        .await
    }

    async fn list_workers(&self) -> Result<Vec<WorkerRecord>, QueueError> {
        self.read(|tx| {
            let mut stmt =
                tx.prepare(&format!("{WORKER_SELECT} ORDER BY registered_at_ms, worker_id"))?;
            let rows = stmt.query_map([], map_worker_row)?;
            let mut workers = Vec::new();
            for row in rows {
                workers.push(row?.into_record()?);
            }
            Ok(workers)
        })
        .await
    }
}

// ========================================
// task / lease helpers (inside a transaction)
// ========================================

fn insert_task(tx: &Transaction<'_>, record: &TaskRecord) -> Result<(), QueueError> {
    tx.execute(
        "INSERT INTO tasks (task_id, status, payload, result, error_message, retries, \
         assigned_worker, created_at_ms, started_at_ms, completed_at_ms) \
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
        params![
            id_text(record.task_id),
            record.status.as_str(),
            json_text(&record.payload)?,
            record.result.as_ref().map(json_text).transpose()?,
            record.error_message,
            record.retries,
            record.assigned_worker.map(id_text),
            dt_to_ms(record.created_at),
            record.started_at.map(dt_to_ms),
            record.completed_at.map(dt_to_ms),
        ],
    )?;
    Ok(())
}

/// Write back every mutable column of an existing task.
fn save_task(tx: &Transaction<'_>, record: &TaskRecord) -> Result<(), QueueError> {
    let updated = tx.execute(
        "UPDATE tasks SET status = ?2, result = ?3, error_message = ?4, retries = ?5, \
         assigned_worker = ?6, started_at_ms = ?7, completed_at_ms = ?8 \
         WHERE task_id = ?1",
        params![
            id_text(record.task_id),
            record.status.as_str(),
            record.result.as_ref().map(json_text).transpose()?,
            record.error_message,
            record.retries,
            record.assigned_worker.map(id_text),
            record.started_at.map(dt_to_ms),
            record.completed_at.map(dt_to_ms),
        ],
    )?;
    if updated == 0 {
        return Err(QueueError::TaskNotFound(record.task_id));
    }
    Ok(())
}

fn find_task(tx: &Transaction<'_>, task_id: TaskId) -> Result<Option<TaskRecord>, QueueError> {
    tx.query_row(
        &format!("{TASK_SELECT} WHERE t.task_id = ?1"),
        params![id_text(task_id)],
        map_task_row,
    )
    .optional()?
    .map(TaskRow::into_record)
    .transpose()
}

fn load_task(tx: &Transaction<'_>, task_id: TaskId) -> Result<TaskRecord, QueueError> {
    find_task(tx, task_id)?.ok_or(QueueError::TaskNotFound(task_id))
}

fn push_pending(tx: &Transaction<'_>, task_id: TaskId) -> Result<(), QueueError> {
    tx.execute(
        "INSERT INTO pending (task_id) VALUES (?1)",
        params![id_text(task_id)],
    )?;
    Ok(())
}

fn load_lease(tx: &Transaction<'_>, task_id: TaskId) -> Result<Option<Lease>, QueueError> {
    tx.query_row(
        "SELECT task_id, worker_id, lease_start_ms FROM leases WHERE task_id = ?1",
        params![id_text(task_id)],
        map_lease_row,
    )
    .optional()?
    .map(LeaseRow::into_lease)
    .transpose()
}

fn delete_lease(tx: &Transaction<'_>, task_id: TaskId) -> Result<(), QueueError> {
    tx.execute(
        "DELETE FROM leases WHERE task_id = ?1",
        params![id_text(task_id)],
    )?;
    Ok(())
}

fn list_status(
    tx: &Transaction<'_>,
    status: TaskStatus,
    limit: usize,
) -> Result<Vec<TaskRecord>, QueueError> {
    let limit = i64::try_from(limit).unwrap_or(i64::MAX);
    let (sql, bind_status) = match status {
        TaskStatus::Pending => (
            format!(
                "{TASK_SELECT} JOIN pending p ON p.task_id = t.task_id ORDER BY p.seq LIMIT ?1"
            ),
            false,
        ),
        TaskStatus::Processing => (
            format!(
                "{TASK_SELECT} JOIN leases l ON l.task_id = t.task_id \
                 ORDER BY l.lease_start_ms, l.task_id LIMIT ?1"
            ),
            false,
        ),
        TaskStatus::Success | TaskStatus::Failure => (
            format!(
                "{TASK_SELECT} WHERE t.status = ?2 \
                 ORDER BY t.completed_at_ms DESC, t.task_id DESC LIMIT ?1"
            ),
            true,
        ),
    };

    let mut stmt = tx.prepare(&sql)?;
    let rows = if bind_status {
        stmt.query_map(params![limit, status.as_str()], map_task_row)?
            .collect::<Result<Vec<_>, _>>()?
    } else {
        stmt.query_map(params![limit], map_task_row)?
            .collect::<Result<Vec<_>, _>>()?
    };
    rows.into_iter().map(TaskRow::into_record).collect()
}

// ========================================
// worker helpers
// ========================================

fn find_worker(
    tx: &Transaction<'_>,
    worker_id: WorkerId,
) -> Result<Option<WorkerRecord>, QueueError> {
    tx.query_row(
        &format!("{WORKER_SELECT} WHERE worker_id = ?1"),
        params![id_text(worker_id)],
        map_worker_row,
    )
    .optional()?
    .map(WorkerRow::into_record)
    .transpose()
}

fn save_worker(tx: &Transaction<'_>, worker: &WorkerRecord) -> Result<(), QueueError> {
    tx.execute(
        "UPDATE workers SET revoked_at_ms = ?2, last_heartbeat_at_ms = ?3 WHERE worker_id = ?1",
        params![
            id_text(worker.worker_id),
            worker.revoked_at.map(dt_to_ms),
            worker.last_heartbeat_at.map(dt_to_ms),
        ],
    )?;
    Ok(())
}

// ========================================
// row mapping
// ========================================

struct TaskRow {
    task_id: String,
    status: String,
    payload: String,
    result: Option<String>,
    error_message: Option<String>,
    retries: i64,
    assigned_worker: Option<String>,
    created_at_ms: i64,
    started_at_ms: Option<i64>,
    completed_at_ms: Option<i64>,
}

fn map_task_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<TaskRow> {
    Ok(TaskRow {
        task_id: row.get(0)?,
        status: row.get(1)?,
        payload: row.get(2)?,
        result: row.get(3)?,
        error_message: row.get(4)?,
        retries: row.get(5)?,
        assigned_worker: row.get(6)?,
        created_at_ms: row.get(7)?,
        started_at_ms: row.get(8)?,
        completed_at_ms: row.get(9)?,
    })
}

impl TaskRow {
    fn into_record(self) -> Result<TaskRecord, QueueError> {
        Ok(TaskRecord {
            task_id: parse_id(&self.task_id)?,
            status: self
                .status
                .parse()
                .map_err(|e| corrupt(format!("task {}: {e}", self.task_id)))?,
            payload: parse_json(&self.payload)?,
            result: self.result.as_deref().map(parse_json).transpose()?,
            error_message: self.error_message,
            retries: u32::try_from(self.retries)
                .map_err(|_| corrupt(format!("task {}: retries {}", self.task_id, self.retries)))?,
            assigned_worker: self.assigned_worker.as_deref().map(parse_id).transpose()?,
            created_at: ms_to_dt(self.created_at_ms)?,
            started_at: self.started_at_ms.map(ms_to_dt).transpose()?,
            completed_at: self.completed_at_ms.map(ms_to_dt).transpose()?,
        })
    }
}

struct LeaseRow {
    task_id: String,
    worker_id: String,
    lease_start_ms: i64,
}

fn map_lease_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<LeaseRow> {
    Ok(LeaseRow {
        task_id: row.get(0)?,
        worker_id: row.get(1)?,
        lease_start_ms: row.get(2)?,
    })
}

impl LeaseRow {
    fn into_lease(self) -> Result<Lease, QueueError> {
        Ok(Lease::new(
            parse_id(&self.task_id)?,
            parse_id(&self.worker_id)?,
            ms_to_dt(self.lease_start_ms)?,
        ))
    }
}

struct WorkerRow {
    worker_id: String,
    name: String,
    registered_at_ms: i64,
    revoked_at_ms: Option<i64>,
    last_heartbeat_at_ms: Option<i64>,
}

fn map_worker_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<WorkerRow> {
    Ok(WorkerRow {
        worker_id: row.get(0)?,
        name: row.get(1)?,
        registered_at_ms: row.get(2)?,
        revoked_at_ms: row.get(3)?,
        last_heartbeat_at_ms: row.get(4)?,
    })
}

impl WorkerRow {
    fn into_record(self) -> Result<WorkerRecord, QueueError> {
        Ok(WorkerRecord {
            worker_id: parse_id(&self.worker_id)?,
            name: self.name,
            registered_at: ms_to_dt(self.registered_at_ms)?,
            revoked_at: self.revoked_at_ms.map(ms_to_dt).transpose()?,
            last_heartbeat_at: self.last_heartbeat_at_ms.map(ms_to_dt).transpose()?,
        })
    }
}

// ========================================
// column encodings
// ========================================

fn corrupt(detail: String) -> QueueError {
    QueueError::StoreUnavailable(format!("corrupt sqlite row: {detail}"))
}

/// IDs are stored as bare ULIDs.
fn id_text<T: IdMarker>(id: Id<T>) -> String {
    id.as_ulid().to_string()
}

fn parse_id<T: IdMarker>(text: &str) -> Result<Id<T>, QueueError> {
    text.parse().map_err(|e| corrupt(format!("{e}")))
}

fn json_text(value: &serde_json::Value) -> Result<String, QueueError> {
    serde_json::to_string(value).map_err(|e| QueueError::InvalidPayload(e.to_string()))
}

fn parse_json(text: &str) -> Result<serde_json::Value, QueueError> {
    serde_json::from_str(text).map_err(|e| corrupt(format!("json: {e}")))
}

fn dt_to_ms(dt: DateTime<Utc>) -> i64 {
    dt.timestamp_millis()
}

fn ms_to_dt(ms: i64) -> Result<DateTime<Utc>, QueueError> {
    Utc.timestamp_millis_opt(ms)
        .single()
        .ok_or_else(|| corrupt(format!("timestamp {ms}")))
}
