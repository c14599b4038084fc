//! Core business logic for Closebook.
//!
//! This crate contains the accounting period lifecycle and closing
//! validation with ZERO web or database dependencies. Persistence and the
//! external subsystems (invoicing, commissions, treasury) are reached
//! through the traits in [`store`] and [`collaborators`].
//!
//! # Modules
//!
//! - `ledger` - Double-entry entries, postings and account balances
//! - `fiscal` - Fiscal years, periods and the period state machine
//! - `documents` - Source-document posting status and commissions
//! - `treasury` - Bank/cash accounts and reconciliation against the ledger
//! - `audit` - Balance snapshots and the closure log
//! - `closing` - Closing validation and the engine facade
//! - `store` - Storage traits and the in-memory store

pub mod audit;
pub mod closing;
pub mod collaborators;
pub mod documents;
pub mod fiscal;
pub mod ledger;
pub mod store;
pub mod treasury;

pub use closing::{
    ClosedPeriodSummary, ClosingEngine, ClosingError, Collaborators, ValidationIssue,
    ValidationReport, ValidationRule,
};
pub use fiscal::{AccountingPeriod, FiscalYear, PeriodState};
pub use store::MemoryStore;
