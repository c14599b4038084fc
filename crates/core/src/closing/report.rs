//! Itemized closing-validation results.

use closebook_shared::DateRange;
use closebook_shared::types::{AccountId, BankAccountId, DocumentId, LedgerEntryId, MovementId, PeriodId};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::documents::DocumentKind;
use crate::fiscal::PeriodTotals;
use crate::ledger::EntryState;
use crate::treasury::AccountReconciliation;

/// The check that produced an issue.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ValidationRule {
    /// Every source document is posted.
    PostingCompleteness,
    /// No draft entries remain.
    EntryConfirmation,
    /// Confirmed debits equal confirmed credits.
    DoubleEntryBalance,
    /// Partner commissions are billed, paid or approved, and booked.
    CommissionSettlement,
    /// Bank/cash accounts match the ledger.
    TreasuryReconciliation,
}

/// One reason a period cannot be closed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "code", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ValidationIssue {
    /// A document was never posted.
    DocumentUnposted {
        /// Document kind.
        kind: DocumentKind,
        /// Document id.
        document_id: DocumentId,
        /// Document number.
        number: String,
    },
    /// A document's posting attempt failed.
    DocumentPostingFailed {
        /// Document kind.
        kind: DocumentKind,
        /// Document id.
        document_id: DocumentId,
        /// Document number.
        number: String,
        /// Failure text.
        error: String,
    },
    /// An entry dated in the period is still a draft.
    DraftEntry {
        /// Entry id.
        entry_id: LedgerEntryId,
        /// Entry number.
        number: String,
    },
    /// Confirmed debits and credits differ.
    PeriodUnbalanced {
        /// Sum of confirmed debits.
        total_debits: Decimal,
        /// Sum of confirmed credits.
        total_credits: Decimal,
    },
    /// Commissions not yet billed.
    CommissionsUnbilled {
        /// How many.
        count: u64,
    },
    /// Billed commissions neither paid nor approved as payables.
    CommissionsUnpaid {
        /// How many.
        count: u64,
    },
    /// Billed commissions without a confirmed invoice entry.
    CommissionsMissingEntry {
        /// How many.
        count: u64,
    },
    /// Ledger and treasury disagree beyond tolerance.
    BalanceMismatch {
        /// Bank/cash account.
        bank_account_id: BankAccountId,
        /// Its name.
        name: String,
        /// Ledger-derived balance.
        computed_balance: Decimal,
        /// Treasury-recorded balance.
        recorded_balance: Decimal,
        /// `recorded - computed`.
        difference: Decimal,
    },
    /// A movement has no ledger entry.
    MovementWithoutEntry {
        /// Movement id.
        movement_id: MovementId,
        /// Account moved.
        bank_account_id: BankAccountId,
    },
    /// A movement's entry is missing or not confirmed.
    MovementEntryNotConfirmed {
        /// Movement id.
        movement_id: MovementId,
        /// Account moved.
        bank_account_id: BankAccountId,
        /// Linked entry.
        entry_id: LedgerEntryId,
        /// Its state, `None` if it does not exist.
        entry_state: Option<EntryState>,
    },
    /// A bank account points at a ledger account that does not exist.
    UnknownLedgerAccount {
        /// Bank/cash account.
        bank_account_id: BankAccountId,
        /// Missing ledger account.
        ledger_account_id: AccountId,
    },
}

impl ValidationIssue {
    /// The check that produced this issue.
    #[must_use]
    pub fn rule(&self) -> ValidationRule {
        match self {
            Self::DocumentUnposted { .. } | Self::DocumentPostingFailed { .. } => {
                ValidationRule::PostingCompleteness
            }
            Self::DraftEntry { .. } => ValidationRule::EntryConfirmation,
            Self::PeriodUnbalanced { .. } => ValidationRule::DoubleEntryBalance,
            Self::CommissionsUnbilled { .. }
            | Self::CommissionsUnpaid { .. }
            | Self::CommissionsMissingEntry { .. } => ValidationRule::CommissionSettlement,
            Self::BalanceMismatch { .. }
            | Self::MovementWithoutEntry { .. }
            | Self::MovementEntryNotConfirmed { .. }
            | Self::UnknownLedgerAccount { .. } => ValidationRule::TreasuryReconciliation,
        }
    }

    /// Stable machine-readable code.
    #[must_use]
    pub fn code(&self) -> &'static str {
        match self {
            Self::DocumentUnposted { .. } => "DOCUMENT_UNPOSTED",
            Self::DocumentPostingFailed { .. } => "DOCUMENT_POSTING_FAILED",
            Self::DraftEntry { .. } => "DRAFT_ENTRY",
            Self::PeriodUnbalanced { .. } => "PERIOD_UNBALANCED",
            Self::CommissionsUnbilled { .. } => "COMMISSIONS_UNBILLED",
            Self::CommissionsUnpaid { .. } => "COMMISSIONS_UNPAID",
            Self::CommissionsMissingEntry { .. } => "COMMISSIONS_MISSING_ENTRY",
            Self::BalanceMismatch { .. } => "BALANCE_MISMATCH",
            Self::MovementWithoutEntry { .. } => "MOVEMENT_WITHOUT_ENTRY",
            Self::MovementEntryNotConfirmed { .. } => "MOVEMENT_ENTRY_NOT_CONFIRMED",
            Self::UnknownLedgerAccount { .. } => "UNKNOWN_LEDGER_ACCOUNT",
        }
    }
}

impl std::fmt::Display for ValidationIssue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::DocumentUnposted { kind, number, .. } => {
                write!(f, "{kind} {number} is not posted")
            }
            Self::DocumentPostingFailed {
                kind,
                number,
                error,
                ..
            } => write!(f, "{kind} {number} failed to post: {error}"),
            Self::DraftEntry { number, .. } => write!(f, "Entry {number} is still a draft"),
            Self::PeriodUnbalanced {
                total_debits,
                total_credits,
            } => write!(
                f,
                "Confirmed debits {total_debits} do not equal credits {total_credits}"
            ),
            Self::CommissionsUnbilled { count } => write!(f, "{count} commission(s) not billed"),
            Self::CommissionsUnpaid { count } => {
                write!(f, "{count} billed commission(s) neither paid nor approved")
            }
            Self::CommissionsMissingEntry { count } => {
                write!(f, "{count} billed commission(s) without a confirmed entry")
            }
            Self::BalanceMismatch {
                name,
                computed_balance,
                recorded_balance,
                difference,
                ..
            } => write!(
                f,
                "{name}: recorded {recorded_balance} vs ledger {computed_balance} (difference {difference})"
            ),
            Self::MovementWithoutEntry { movement_id, .. } => {
                write!(f, "Movement {movement_id} has no ledger entry")
            }
            Self::MovementEntryNotConfirmed {
                movement_id,
                entry_id,
                ..
            } => write!(
                f,
                "Movement {movement_id} is linked to entry {entry_id}, which is not confirmed"
            ),
            Self::UnknownLedgerAccount {
                bank_account_id,
                ledger_account_id,
            } => write!(
                f,
                "Bank account {bank_account_id} points at unknown ledger account {ledger_account_id}"
            ),
        }
    }
}

/// Verdict of a closing validation run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationReport {
    /// Period validated.
    pub period_id: PeriodId,
    /// Its dates.
    pub range: DateRange,
    /// Every failure found; empty means the period may close.
    pub issues: Vec<ValidationIssue>,
    /// Confirmed totals in the period.
    pub totals: PeriodTotals,
    /// Per-account treasury results, reused for snapshots.
    pub reconciliations: Vec<AccountReconciliation>,
}

impl ValidationReport {
    /// Returns true if there are no issues.
    #[must_use]
    pub fn is_success(&self) -> bool {
        self.issues.is_empty()
    }

    /// Issues produced by one rule.
    pub fn issues_for(&self, rule: ValidationRule) -> impl Iterator<Item = &ValidationIssue> {
        self.issues.iter().filter(move |i| i.rule() == rule)
    }
}
