//! Domain model (IDs, task / lease / worker records, errors, events).
//!
//! 副作用なし。状態遷移のルールはすべてここに置き、ストア実装はそれを呼ぶだけ。

pub mod decision;
pub mod errors;
pub mod events;
pub mod ids;
pub mod lease;
pub mod stats;
pub mod task;
pub mod worker;

pub use self::decision::{Decider, Decision, RetryBudgetDecider, abandon_message};
pub use self::errors::{ErrorKind, QueueError};
pub use self::events::DomainEvent;
pub use self::ids::{IdParseError, TaskId, WorkerId};
pub use self::lease::Lease;
pub use self::stats::{QueueStats, SweepReport};
pub use self::task::{TaskRecord, TaskStatus, UnknownStatus};
pub use self::worker::WorkerRecord;
