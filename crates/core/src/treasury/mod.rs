//! Bank and cash accounts and their reconciliation against the ledger.

pub mod reconciliation;
pub mod types;

pub use reconciliation::{
    AccountReconciliation, MovementIssue, ReconciliationReport, TreasuryReconciliationChecker,
    UnknownLedgerAccount,
};
pub use types::{BankAccount, TreasuryMovement};
