//! Chart of accounts types as seen by the ledger.
//!
//! Accounts are owned by master-data management; the ledger only reads them.

use closebook_shared::types::{AccountId, CompanyId};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Account classification following standard accounting principles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AccountType {
    /// What the business owns (cash, receivables, equipment).
    Asset,
    /// What the business owes (payables, loans, taxes).
    Liability,
    /// Owner's interest in the business.
    Equity,
    /// Revenue earned.
    Income,
    /// Costs incurred.
    Expense,
}

impl AccountType {
    /// Returns the side on which this account type naturally carries its balance.
    #[must_use]
    pub const fn normal_balance(self) -> NormalBalance {
        match self {
            Self::Asset | Self::Expense => NormalBalance::Debit,
            Self::Liability | Self::Equity | Self::Income => NormalBalance::Credit,
        }
    }

    /// Returns the string representation of the account type.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Asset => "asset",
            Self::Liability => "liability",
            Self::Equity => "equity",
            Self::Income => "income",
            Self::Expense => "expense",
        }
    }

    /// Parses an account type from a string.
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "asset" => Some(Self::Asset),
            "liability" => Some(Self::Liability),
            "equity" => Some(Self::Equity),
            "income" | "revenue" => Some(Self::Income),
            "expense" => Some(Self::Expense),
            _ => None,
        }
    }
}

/// Sign convention for account balances.
///
/// - Asset/Expense: balance += debit - credit (debit-normal)
/// - Liability/Equity/Income: balance += credit - debit (credit-normal)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum NormalBalance {
    /// Debit-normal accounts (Asset, Expense).
    Debit,
    /// Credit-normal accounts (Liability, Equity, Income).
    Credit,
}

impl NormalBalance {
    /// Calculates the balance change produced by one posting.
    #[must_use]
    pub fn balance_change(self, debit: Decimal, credit: Decimal) -> Decimal {
        match self {
            Self::Debit => debit - credit,
            Self::Credit => credit - debit,
        }
    }
}

/// A chart of accounts entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Account {
    /// Unique identifier.
    pub id: AccountId,
    /// Company owning the account.
    pub company_id: CompanyId,
    /// Hierarchical code, unique per company (e.g. "1.1.02").
    pub code: String,
    /// Display name.
    pub name: String,
    /// Classification.
    pub account_type: AccountType,
    /// Parent account in the hierarchy.
    pub parent_id: Option<AccountId>,
    /// Inactive accounts cannot receive postings.
    pub is_active: bool,
    /// Only leaf accounts can receive postings.
    pub is_leaf: bool,
}

impl Account {
    /// Returns true if postings may reference this account.
    #[must_use]
    pub fn accepts_postings(&self) -> bool {
        self.is_active && self.is_leaf
    }
}
