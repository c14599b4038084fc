//! Double-entry bookkeeping logic.
//!
//! This module implements the ledger store's business rules:
//! - Chart of accounts view and natural-sign balances
//! - Entry lifecycle (draft, confirm, void, update)
//! - Posting validation
//! - Account ledger listings with running balance

pub mod account;
pub mod balance;
pub mod error;
pub mod service;
pub mod types;
pub mod validation;

#[cfg(test)]
mod service_props;

pub use account::{Account, AccountType, NormalBalance};
pub use balance::{AccountBalance, AccountLedger, AccountLedgerLine, RunningBalance};
pub use error::LedgerError;
pub use service::LedgerService;
pub use types::{
    AccountPosting, CreateEntryInput, EntryPatch, EntryState, EntryTotals, LedgerEntry,
    NewLedgerEntry, Posting, PostingInput, entry_number,
};
