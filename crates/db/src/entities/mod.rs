//! `SeaORM` entity definitions.
//!
//! State and kind columns are stored as their lowercase string form and
//! parsed by the store.

pub mod accounting_periods;
pub mod accounts;
pub mod balance_snapshots;
pub mod bank_accounts;
pub mod closure_records;
pub mod commissions;
pub mod entry_sequences;
pub mod fiscal_years;
pub mod ledger_entries;
pub mod postings;
pub mod source_documents;
pub mod treasury_movements;
