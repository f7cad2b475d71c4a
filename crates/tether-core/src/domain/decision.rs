//! Decision model: what to do with a task whose lease expired.
//!
//! The Decider is consulted by the store inside the reclaim transaction, so
//! it sees the task's `retries` as of that instant.

use super::task::TaskRecord;

/// The next action for an abandoned (lease-expired) task.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decision {
    /// Put the task back at the tail of the work queue, consuming one retry.
    Requeue { reason: String },

    /// Terminal failure; `reason` becomes the task's `error_message`.
    MarkFailed { reason: String },
}

/// Trait for deciding how to resolve an expired lease.
///
/// Deciders are pure functions: no side effects, no state mutation. The store
/// applies the returned Decision atomically with the lease removal.
pub trait Decider: Send + Sync {
    fn decide_expired(&self, task: &TaskRecord) -> Decision;
}

/// Bounded automatic retry budget.
///
/// - Requeue while `retries < max_retries`
/// - Otherwise fail with `"lease expired after N retries"`
#[derive(Debug, Clone, Copy)]
pub struct RetryBudgetDecider {
    max_retries: u32,
}

impl RetryBudgetDecider {
    pub fn new(max_retries: u32) -> Self {
        Self { max_retries }
    }

    pub fn max_retries(&self) -> u32 {
        self.max_retries
    }
}

impl Decider for RetryBudgetDecider {
    fn decide_expired(&self, task: &TaskRecord) -> Decision {
        if task.retries < self.max_retries {
            Decision::Requeue {
                reason: format!(
                    "lease expired, retry {}/{}",
                    task.retries + 1,
                    self.max_retries
                ),
            }
        } else {
            Decision::MarkFailed {
                reason: abandon_message(task.retries),
            }
        }
    }
}

/// Error message recorded on a task abandoned by the janitor.
pub fn abandon_message(retries: u32) -> String {
    format!("lease expired after {retries} retries")
}
