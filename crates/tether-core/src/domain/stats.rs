use serde::{Deserialize, Serialize};

/// Queue counts taken from one consistent snapshot.
///
/// `pending` is the work queue depth, `in_flight` the lease table size.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueueStats {
    pub pending: usize,
    pub in_flight: usize,
    pub success: usize,
    pub failure: usize,
}

impl QueueStats {
    pub fn total(&self) -> usize {
        self.pending + self.in_flight + self.success + self.failure
    }
}

/// Result of one janitor sweep.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SweepReport {
    /// Expired leases requeued with a retry consumed.
    pub rescued: usize,
    /// Expired leases failed terminally (budget exhausted).
    pub abandoned: usize,
    /// Candidates resolved by their worker before the janitor got to them.
    pub skipped: usize,
}

impl SweepReport {
    pub fn is_noop(&self) -> bool {
        self.rescued == 0 && self.abandoned == 0
    }
}
