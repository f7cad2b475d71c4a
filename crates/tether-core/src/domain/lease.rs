//! Lease: a time-bounded exclusive claim by one worker on one task.

use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::errors::QueueError;
use super::ids::{TaskId, WorkerId};

/// Lease table entry. Exists only while the task is PROCESSING.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Lease {
    pub task_id: TaskId,
    pub worker_id: WorkerId,
    pub lease_start: DateTime<Utc>,
}

impl Lease {
    pub fn new(task_id: TaskId, worker_id: WorkerId, lease_start: DateTime<Utc>) -> Self {
        Self {
            task_id,
            worker_id,
            lease_start,
        }
    }

    /// `now - lease_start > timeout` (strictly greater).
    pub fn is_expired(&self, now: DateTime<Utc>, timeout: Duration) -> bool {
        match chrono::Duration::from_std(timeout) {
            Ok(timeout) => now - self.lease_start > timeout,
            // a timeout beyond chrono's range never expires
            Err(_) => false,
        }
    }
}

/// Ownership check shared by complete / fail / reclaim.
///
/// `lease` is the current lease table entry for `task_id`, if any.
pub fn check_owner(
    task_id: TaskId,
    lease: Option<&Lease>,
    worker_id: WorkerId,
) -> Result<(), QueueError> {
    match lease {
        None => Err(QueueError::NotLeased(task_id)),
        Some(lease) if lease.worker_id != worker_id => Err(QueueError::WrongOwner {
            task_id,
            holder: lease.worker_id,
            caller: worker_id,
        }),
        Some(_) => Ok(()),
    }
}

/// Janitor side of the ownership check.
///
/// `current` must still be exactly the lease that was found expired: same
/// holder and same start. A task that was resolved, or reclaimed and acquired
/// again, fails this check.
pub fn check_unchanged(expected: &Lease, current: Option<&Lease>) -> Result<(), QueueError> {
    check_owner(expected.task_id, current, expected.worker_id)?;
    match current {
        Some(current) if current.lease_start == expected.lease_start => Ok(()),
        _ => Err(QueueError::NotLeased(expected.task_id)),
    }
}

/// Latest lease start that counts as expired at `now`.
///
/// Stores use this to enumerate candidates with a single range query; the
/// strict comparison is re-checked per lease with [`Lease::is_expired`].
pub fn expiry_cutoff(now: DateTime<Utc>, timeout: Duration) -> DateTime<Utc> {
    chrono::Duration::from_std(timeout)
        .ok()
        .and_then(|timeout| now.checked_sub_signed(timeout))
        .unwrap_or(DateTime::<Utc>::MIN_UTC)
}
