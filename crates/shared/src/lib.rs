//! Shared types, configuration, and tracing bootstrap for Closebook.
//!
//! This crate provides common types used across all other crates:
//! - Typed IDs for type-safe entity references
//! - Inclusive fiscal date ranges
//! - Currency-precision helpers over `Decimal`
//! - Configuration management
//! - Tracing subscriber setup

pub mod config;
pub mod telemetry;
pub mod types;

pub use config::{AppConfig, ClosingConfig, DatabaseConfig, LoggingConfig};
pub use telemetry::init_tracing;
pub use types::{DateRange, DateRangeError};
