//! Treasury types.

use chrono::NaiveDate;
use closebook_shared::types::{AccountId, BankAccountId, CompanyId, LedgerEntryId, MovementId};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// A bank or cash account tracked by treasury.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BankAccount {
    /// Unique identifier.
    pub id: BankAccountId,
    /// Owning company.
    pub company_id: CompanyId,
    /// Display name.
    pub name: String,
    /// Ledger account mirroring this bank account.
    pub ledger_account_id: AccountId,
    /// Balance carried in before the ledger started.
    pub opening_balance: Decimal,
    /// Balance recorded by treasury (statement or cash count).
    pub recorded_balance: Decimal,
    /// Inactive accounts are not reconciled.
    pub is_active: bool,
}

/// A deposit, withdrawal or transfer on a bank/cash account.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TreasuryMovement {
    /// Unique identifier.
    pub id: MovementId,
    /// Account moved.
    pub bank_account_id: BankAccountId,
    /// Value date.
    pub date: NaiveDate,
    /// Signed amount (positive for deposits).
    pub amount: Decimal,
    /// Free-text description.
    pub description: String,
    /// Ledger entry recording the movement.
    pub linked_entry_id: Option<LedgerEntryId>,
}
