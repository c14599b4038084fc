//! Common types used across the workspace.

pub mod date_range;
pub mod id;
pub mod money;

pub use date_range::{DateRange, DateRangeError};
pub use id::*;
