//! Worker record: fleet membership + liveness bookkeeping.

use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::ids::WorkerId;

/// One registered worker identity.
///
/// Never deleted; revocation is a soft flag kept for audit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkerRecord {
    pub worker_id: WorkerId,
    pub name: String,
    pub registered_at: DateTime<Utc>,
    pub revoked_at: Option<DateTime<Utc>>,
    pub last_heartbeat_at: Option<DateTime<Utc>>,
}

impl WorkerRecord {
    pub fn new(worker_id: WorkerId, name: impl Into<String>, now: DateTime<Utc>) -> Self {
        Self {
            worker_id,
            name: name.into(),
            registered_at: now,
            revoked_at: None,
            last_heartbeat_at: None,
        }
    }

    pub fn is_active(&self) -> bool {
        self.revoked_at.is_none()
    }

    pub fn record_heartbeat(&mut self, now: DateTime<Utc>) {
        self.last_heartbeat_at = Some(now);
    }

    /// Idempotent: the first revocation time is kept.
    pub fn revoke(&mut self, now: DateTime<Utc>) {
        if self.revoked_at.is_none() {
            self.revoked_at = Some(now);
        }
    }

    /// Last sign of life: heartbeat, or registration if it never beat.
    pub fn last_seen(&self) -> DateTime<Utc> {
        self.last_heartbeat_at.unwrap_or(self.registered_at)
    }

    /// Informational only. Lease expiry never consults this.
    pub fn is_silent(&self, now: DateTime<Utc>, threshold: Duration) -> bool {
        match chrono::Duration::from_std(threshold) {
            Ok(threshold) => now - self.last_seen() > threshold,
            Err(_) => false,
        }
    }
}
