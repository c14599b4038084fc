//! Balance snapshots and the append-only closure log.

pub mod recorder;
pub mod types;

pub use recorder::{AuditRecorder, TransitionContext};
pub use types::{BalanceSnapshot, ClosureAction, ClosureRecord, ClosureScope};
