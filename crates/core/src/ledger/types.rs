//! Ledger domain types for entry creation and validation.
//!
//! This module defines the core types used for creating, confirming and
//! voiding journal entries in the double-entry bookkeeping system.

use chrono::{DateTime, NaiveDate, Utc};
use closebook_shared::types::{
    AccountId, ActorId, CompanyId, LedgerEntryId, PeriodId, PostingId,
};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Ledger entry state.
///
/// Entries start as `Draft`, become immutable once `Confirmed`, and are
/// never deleted: a confirmed entry is cancelled by marking it `Voided`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntryState {
    /// Entry is being drafted and can be modified.
    Draft,
    /// Entry counts toward balances (immutable).
    Confirmed,
    /// Entry has been voided (immutable, excluded from balances).
    Voided,
}

impl EntryState {
    /// Returns true if the entry can be modified.
    #[must_use]
    pub fn is_editable(self) -> bool {
        matches!(self, Self::Draft)
    }

    /// Returns the string representation of the state.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Draft => "draft",
            Self::Confirmed => "confirmed",
            Self::Voided => "voided",
        }
    }

    /// Parses a state from a string.
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "draft" => Some(Self::Draft),
            "confirmed" => Some(Self::Confirmed),
            "voided" => Some(Self::Voided),
            _ => None,
        }
    }
}

impl std::fmt::Display for EntryState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Input for a single posting line.
///
/// Exactly one of `debit` / `credit` must be non-zero and neither may be negative.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PostingInput {
    /// The account to post to.
    pub account_id: AccountId,
    /// Debit amount (zero if this is a credit line).
    pub debit: Decimal,
    /// Credit amount (zero if this is a debit line).
    pub credit: Decimal,
    /// Optional customer/vendor tag.
    pub counterparty: Option<String>,
    /// Optional cost-center tag.
    pub cost_center: Option<String>,
}

impl PostingInput {
    /// Creates a debit line.
    #[must_use]
    pub fn debit(account_id: AccountId, amount: Decimal) -> Self {
        Self {
            account_id,
            debit: amount,
            credit: Decimal::ZERO,
            counterparty: None,
            cost_center: None,
        }
    }

    /// Creates a credit line.
    #[must_use]
    pub fn credit(account_id: AccountId, amount: Decimal) -> Self {
        Self {
            account_id,
            debit: Decimal::ZERO,
            credit: amount,
            counterparty: None,
            cost_center: None,
        }
    }

    /// Tags the line with a counterparty.
    #[must_use]
    pub fn with_counterparty(mut self, counterparty: impl Into<String>) -> Self {
        self.counterparty = Some(counterparty.into());
        self
    }

    /// Tags the line with a cost center.
    #[must_use]
    pub fn with_cost_center(mut self, cost_center: impl Into<String>) -> Self {
        self.cost_center = Some(cost_center.into());
        self
    }
}

/// A persisted posting line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Posting {
    /// Unique identifier.
    pub id: PostingId,
    /// Owning entry.
    pub entry_id: LedgerEntryId,
    /// Account posted to.
    pub account_id: AccountId,
    /// Debit amount.
    pub debit: Decimal,
    /// Credit amount.
    pub credit: Decimal,
    /// Optional customer/vendor tag.
    pub counterparty: Option<String>,
    /// Optional cost-center tag.
    pub cost_center: Option<String>,
}

impl Posting {
    /// Materializes a posting line for `entry_id`.
    #[must_use]
    pub fn from_input(entry_id: LedgerEntryId, input: PostingInput) -> Self {
        Self {
            id: PostingId::new(),
            entry_id,
            account_id: input.account_id,
            debit: input.debit,
            credit: input.credit,
            counterparty: input.counterparty,
            cost_center: input.cost_center,
        }
    }
}

/// A journal entry with its postings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerEntry {
    /// Unique identifier.
    pub id: LedgerEntryId,
    /// Owning company.
    pub company_id: CompanyId,
    /// Period containing `date`.
    pub period_id: PeriodId,
    /// Sequence prefix (e.g. "JE").
    pub prefix: String,
    /// Gap-free number, unique per company and prefix.
    pub sequence: i64,
    /// Accounting date.
    pub date: NaiveDate,
    /// Free-text description.
    pub description: String,
    /// Optional external reference (invoice number, etc.).
    pub reference: Option<String>,
    /// Lifecycle state.
    pub state: EntryState,
    /// Posting lines.
    pub postings: Vec<Posting>,
    /// Optimistic-lock version.
    pub version: i64,
    /// Actor who created the entry.
    pub created_by: ActorId,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
    /// Last modification timestamp.
    pub updated_at: DateTime<Utc>,
    /// Actor who confirmed the entry.
    pub confirmed_by: Option<ActorId>,
    /// Confirmation timestamp.
    pub confirmed_at: Option<DateTime<Utc>>,
    /// Actor who voided the entry.
    pub voided_by: Option<ActorId>,
    /// Void timestamp.
    pub voided_at: Option<DateTime<Utc>>,
}

/// Formats an entry number from its prefix and sequence, e.g. `JE-000042`.
#[must_use]
pub fn entry_number(prefix: &str, sequence: i64) -> String {
    format!("{prefix}-{sequence:06}")
}

impl LedgerEntry {
    /// Human-readable entry number, e.g. `JE-000042`.
    #[must_use]
    pub fn number(&self) -> String {
        entry_number(&self.prefix, self.sequence)
    }

    /// Sums the posting lines.
    #[must_use]
    pub fn totals(&self) -> EntryTotals {
        EntryTotals::new(
            self.postings.iter().map(|p| p.debit).sum(),
            self.postings.iter().map(|p| p.credit).sum(),
        )
    }
}

/// An entry ready to be inserted; the store allocates the sequence.
#[derive(Debug, Clone)]
pub struct NewLedgerEntry {
    /// Pre-generated identifier.
    pub id: LedgerEntryId,
    /// Owning company.
    pub company_id: CompanyId,
    /// Period containing `date`.
    pub period_id: PeriodId,
    /// Sequence prefix.
    pub prefix: String,
    /// Accounting date.
    pub date: NaiveDate,
    /// Description.
    pub description: String,
    /// Optional external reference.
    pub reference: Option<String>,
    /// Validated posting lines.
    pub postings: Vec<Posting>,
    /// Creating actor.
    pub created_by: ActorId,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
}

impl NewLedgerEntry {
    /// Builds the stored entry once the store has allocated `sequence`.
    #[must_use]
    pub fn into_entry(self, sequence: i64) -> LedgerEntry {
        LedgerEntry {
            id: self.id,
            company_id: self.company_id,
            period_id: self.period_id,
            prefix: self.prefix,
            sequence,
            date: self.date,
            description: self.description,
            reference: self.reference,
            state: EntryState::Draft,
            postings: self.postings,
            version: 1,
            created_by: self.created_by,
            created_at: self.created_at,
            updated_at: self.created_at,
            confirmed_by: None,
            confirmed_at: None,
            voided_by: None,
            voided_at: None,
        }
    }
}

/// Input for creating a new draft entry.
#[derive(Debug, Clone)]
pub struct CreateEntryInput {
    /// The company this entry belongs to.
    pub company_id: CompanyId,
    /// Accounting date.
    pub date: NaiveDate,
    /// Description.
    pub description: String,
    /// Optional external reference.
    pub reference: Option<String>,
    /// Sequence prefix; the configured default is used when `None`.
    pub prefix: Option<String>,
    /// Posting lines (at least 2).
    pub postings: Vec<PostingInput>,
    /// The actor creating the entry.
    pub created_by: ActorId,
}

/// Changes applied to a draft entry. `None` fields are left untouched.
#[derive(Debug, Clone, Default)]
pub struct EntryPatch {
    /// New accounting date.
    pub date: Option<NaiveDate>,
    /// New description.
    pub description: Option<String>,
    /// New reference (`Some(None)` clears it).
    pub reference: Option<Option<String>>,
    /// Replacement posting lines.
    pub postings: Option<Vec<PostingInput>>,
}

impl EntryPatch {
    /// Returns true if the patch changes nothing.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.date.is_none()
            && self.description.is_none()
            && self.reference.is_none()
            && self.postings.is_none()
    }
}

/// Entry totals for validation and display.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntryTotals {
    /// Total debit amount.
    pub debit: Decimal,
    /// Total credit amount.
    pub credit: Decimal,
    /// Whether the entry is balanced (debits == credits).
    pub is_balanced: bool,
}

impl EntryTotals {
    /// Creates totals from debit and credit sums.
    #[must_use]
    pub fn new(debit: Decimal, credit: Decimal) -> Self {
        Self {
            debit,
            credit,
            is_balanced: debit == credit,
        }
    }

    /// Returns the difference between debits and credits.
    #[must_use]
    pub fn difference(&self) -> Decimal {
        self.debit - self.credit
    }
}

/// A confirmed posting as seen from one account, with its entry's header.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountPosting {
    /// Source entry.
    pub entry_id: LedgerEntryId,
    /// Entry number (`prefix-sequence`).
    pub entry_number: String,
    /// Entry date.
    pub date: NaiveDate,
    /// Entry description.
    pub description: String,
    /// Debit amount.
    pub debit: Decimal,
    /// Credit amount.
    pub credit: Decimal,
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_entry_state_editable() {
        assert!(EntryState::Draft.is_editable());
        assert!(!EntryState::Confirmed.is_editable());
        assert!(!EntryState::Voided.is_editable());
    }

    #[test]
    fn test_entry_state_parse() {
        assert_eq!(EntryState::parse("confirmed"), Some(EntryState::Confirmed));
        assert_eq!(EntryState::parse("posted"), None);
        assert_eq!(EntryState::Voided.to_string(), "voided");
    }

    #[test]
    fn test_entry_totals_balanced() {
        let totals = EntryTotals::new(dec!(100.00), dec!(100.00));
        assert!(totals.is_balanced);
        assert_eq!(totals.difference(), Decimal::ZERO);
    }

    #[test]
    fn test_entry_totals_unbalanced() {
        let totals = EntryTotals::new(dec!(100.00), dec!(50.00));
        assert!(!totals.is_balanced);
        assert_eq!(totals.difference(), dec!(50.00));
    }

    #[test]
    fn test_entry_number_is_zero_padded() {
        let new = NewLedgerEntry {
            id: LedgerEntryId::new(),
            company_id: CompanyId::new(),
            period_id: PeriodId::new(),
            prefix: "JE".to_string(),
            date: NaiveDate::from_ymd_opt(2025, 3, 14).unwrap(),
            description: "Rent".to_string(),
            reference: None,
            postings: vec![],
            created_by: ActorId::new(),
            created_at: Utc::now(),
        };
        let entry = new.into_entry(42);
        assert_eq!(entry.number(), "JE-000042");
        assert_eq!(entry.state, EntryState::Draft);
        assert_eq!(entry.version, 1);
    }

    #[test]
    fn test_empty_patch() {
        assert!(EntryPatch::default().is_empty());
        let patch = EntryPatch {
            reference: Some(None),
            ..EntryPatch::default()
        };
        assert!(!patch.is_empty());
    }
}
