//! IdGenerator port - ID 生成の抽象化
//!
//! 時刻は Clock から取るので、FixedClock を渡せば timestamp 部分が決定的になる。
//! 同じミリ秒内で生成した ID は単調増加（ulid::Generator）。

use std::sync::Mutex;
use std::time::SystemTime;

use ulid::{Generator, Ulid};

use crate::domain::ids::{TaskId, WorkerId};
use crate::ports::Clock;

pub trait IdGenerator: Send + Sync {
    fn generate_task_id(&self) -> TaskId;

    fn generate_worker_id(&self) -> WorkerId;
}

/// Clock-driven, monotonic ULIDs.
pub struct UlidGenerator<C> {
    clock: C,
    monotonic: Mutex<Generator>,
}

impl<C: Clock> UlidGenerator<C> {
    pub fn new(clock: C) -> Self {
        Self {
            clock,
            monotonic: Mutex::new(Generator::new()),
        }
    }

    fn next_ulid(&self) -> Ulid {
        let now = self.clock.now();
        let mut generator = self
            .monotonic
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());

        // random 部分が溢れたら単調性は諦めて素の ULID
        generator
            .generate_from_datetime(SystemTime::from(now))
            .unwrap_or_else(|_| {
                Ulid::from_parts(now.timestamp_millis().max(0) as u64, rand::random())
            })
    }
}

impl<C: Clock> IdGenerator for UlidGenerator<C> {
    fn generate_task_id(&self) -> TaskId {
        TaskId::from_ulid(self.next_ulid())
    }

    fn generate_worker_id(&self) -> WorkerId {
        WorkerId::from_ulid(self.next_ulid())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ports::{FixedClock, SystemClock};
    use chrono::{TimeZone, Utc};

    #[test]
    fn frozen_clock_still_yields_increasing_ids() {
        let at = Utc.with_ymd_and_hms(2024, 1, 1, 12, 0, 0).unwrap();
        let ids = UlidGenerator::new(FixedClock::new(at));

        let generated: Vec<TaskId> = (0..50).map(|_| ids.generate_task_id()).collect();
        assert!(generated.windows(2).all(|w| w[0] < w[1]));
        assert!(
            generated
                .iter()
                .all(|id| id.as_ulid().timestamp_ms() == at.timestamp_millis() as u64)
        );
    }

    #[test]
    fn task_and_worker_ids_render_with_their_prefix() {
        let ids = UlidGenerator::new(SystemClock);

        assert!(ids.generate_task_id().to_string().starts_with("task-"));
        assert!(ids.generate_worker_id().to_string().starts_with("worker-"));
    }
}
