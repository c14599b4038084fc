//! Document and commission types.

use chrono::NaiveDate;
use closebook_shared::types::{CommissionId, CompanyId, DocumentId, LedgerEntryId, PeriodId};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Kind of source document that must be posted to the ledger.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DocumentKind {
    /// Customer invoice.
    SalesInvoice,
    /// Vendor invoice.
    PurchaseInvoice,
    /// Invoice issued by a partner for earned commissions.
    CommissionInvoice,
}

impl DocumentKind {
    /// Returns the string representation of the kind.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::SalesInvoice => "sales_invoice",
            Self::PurchaseInvoice => "purchase_invoice",
            Self::CommissionInvoice => "commission_invoice",
        }
    }

    /// Parses a kind from a string.
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "sales_invoice" => Some(Self::SalesInvoice),
            "purchase_invoice" => Some(Self::PurchaseInvoice),
            "commission_invoice" => Some(Self::CommissionInvoice),
            _ => None,
        }
    }
}

impl std::fmt::Display for DocumentKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Whether a document has produced its ledger entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum PostingStatus {
    /// Not yet posted.
    Unposted,
    /// Posted successfully.
    Posted,
    /// The last posting attempt failed.
    PostingFailed {
        /// Error reported by the posting process.
        error: String,
    },
}

impl PostingStatus {
    /// Returns true unless the document is `Posted`.
    #[must_use]
    pub fn blocks_close(&self) -> bool {
        !matches!(self, Self::Posted)
    }

    /// Error text of a failed posting.
    #[must_use]
    pub fn error(&self) -> Option<&str> {
        match self {
            Self::PostingFailed { error } => Some(error),
            _ => None,
        }
    }

    /// Returns the string representation (without the error text).
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Unposted => "unposted",
            Self::Posted => "posted",
            Self::PostingFailed { .. } => "posting_failed",
        }
    }

    /// Rebuilds a status from its stored string and error column.
    pub fn parse(s: &str, error: Option<String>) -> Option<Self> {
        match s {
            "unposted" => Some(Self::Unposted),
            "posted" => Some(Self::Posted),
            "posting_failed" => Some(Self::PostingFailed {
                error: error.unwrap_or_default(),
            }),
            _ => None,
        }
    }
}

/// A source document owned by invoicing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceDocument {
    /// Unique identifier.
    pub id: DocumentId,
    /// Owning company.
    pub company_id: CompanyId,
    /// Document kind.
    pub kind: DocumentKind,
    /// Document number as printed.
    pub number: String,
    /// Issue date; decides the period it belongs to.
    pub issue_date: NaiveDate,
    /// Document total.
    pub total: Decimal,
    /// Ledger posting status.
    pub status: PostingStatus,
    /// Entry produced by posting, if any.
    pub entry_id: Option<LedgerEntryId>,
    /// Closed period hiding this document from editing screens.
    pub hidden_by_period: Option<PeriodId>,
}

/// Posting status of one document as reported by the invoicing collaborator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentPostingStatus {
    /// Document kind.
    pub kind: DocumentKind,
    /// Document id.
    pub id: DocumentId,
    /// Document number.
    pub number: String,
    /// Current status.
    pub status: PostingStatus,
}

impl From<&SourceDocument> for DocumentPostingStatus {
    fn from(doc: &SourceDocument) -> Self {
        Self {
            kind: doc.kind,
            id: doc.id,
            number: doc.number.clone(),
            status: doc.status.clone(),
        }
    }
}

/// Billing state of a commission.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BillingState {
    /// Earned but not yet invoiced by the partner.
    Pending,
    /// Invoiced.
    Billed,
}

impl BillingState {
    /// Returns the string representation.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Billed => "billed",
        }
    }

    /// Parses a billing state from a string.
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(Self::Pending),
            "billed" => Some(Self::Billed),
            _ => None,
        }
    }
}

/// A partner commission earned on a date.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommissionRecord {
    /// Unique identifier.
    pub id: CommissionId,
    /// Owning company.
    pub company_id: CompanyId,
    /// Partner earning the commission.
    pub partner: String,
    /// Date earned.
    pub date: NaiveDate,
    /// Commission amount.
    pub amount: Decimal,
    /// Billing state.
    pub billing: BillingState,
    /// Paid to the partner.
    pub paid: bool,
    /// Payment approved and recorded as a payable.
    pub approved_payable: bool,
    /// Entry recording the partner's invoice.
    pub invoice_entry_id: Option<LedgerEntryId>,
    /// Closed period hiding this record from editing screens.
    pub hidden_by_period: Option<PeriodId>,
}

/// Aggregated commission settlement state for a date range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct CommissionSettlement {
    /// Commissions not yet billed.
    pub pending_count: u64,
    /// Billed, unpaid, and without an approved payable.
    pub billed_unpaid_count: u64,
    /// Billed without a confirmed invoice entry.
    pub missing_entry_count: u64,
}

impl CommissionSettlement {
    /// Returns true if nothing blocks the close.
    #[must_use]
    pub fn is_settled(&self) -> bool {
        self.pending_count == 0 && self.billed_unpaid_count == 0 && self.missing_entry_count == 0
    }

    /// Tallies records; `entry_confirmed` tells whether a linked entry is confirmed.
    #[must_use]
    pub fn tally<'a>(
        records: impl IntoIterator<Item = &'a CommissionRecord>,
        entry_confirmed: impl Fn(LedgerEntryId) -> bool,
    ) -> Self {
        let mut settlement = Self::default();
        for record in records {
            match record.billing {
                BillingState::Pending => settlement.pending_count += 1,
                BillingState::Billed => {
                    if !record.paid && !record.approved_payable {
                        settlement.billed_unpaid_count += 1;
                    }
                    if !record.invoice_entry_id.is_some_and(&entry_confirmed) {
                        settlement.missing_entry_count += 1;
                    }
                }
            }
        }
        settlement
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn commission(
        billing: BillingState,
        paid: bool,
        approved_payable: bool,
        invoice_entry_id: Option<LedgerEntryId>,
    ) -> CommissionRecord {
        CommissionRecord {
            id: CommissionId::new(),
            company_id: CompanyId::new(),
            partner: "Partner A".to_string(),
            date: NaiveDate::from_ymd_opt(2025, 1, 20).unwrap(),
            amount: dec!(25.00),
            billing,
            paid,
            approved_payable,
            invoice_entry_id,
            hidden_by_period: None,
        }
    }

    #[test]
    fn test_posting_status_blocks_close() {
        assert!(PostingStatus::Unposted.blocks_close());
        assert!(!PostingStatus::Posted.blocks_close());
        let failed = PostingStatus::PostingFailed {
            error: "account 7.1 missing".to_string(),
        };
        assert!(failed.blocks_close());
        assert_eq!(failed.error(), Some("account 7.1 missing"));
    }

    #[test]
    fn test_posting_status_storage_round_trip() {
        let failed = PostingStatus::parse("posting_failed", Some("boom".to_string())).unwrap();
        assert_eq!(failed.error(), Some("boom"));
        assert_eq!(failed.as_str(), "posting_failed");
        assert_eq!(PostingStatus::parse("posted", None), Some(PostingStatus::Posted));
    }

    #[test]
    fn test_settlement_tally() {
        let confirmed = LedgerEntryId::new();
        let draft = LedgerEntryId::new();
        let records = [
            commission(BillingState::Pending, false, false, None),
            commission(BillingState::Billed, true, false, Some(confirmed)),
            commission(BillingState::Billed, false, true, Some(confirmed)),
            commission(BillingState::Billed, false, false, Some(draft)),
            commission(BillingState::Billed, true, false, None),
        ];

        let settlement = CommissionSettlement::tally(&records, |id| id == confirmed);

        assert_eq!(settlement.pending_count, 1);
        assert_eq!(settlement.billed_unpaid_count, 1);
        assert_eq!(settlement.missing_entry_count, 2);
        assert!(!settlement.is_settled());
    }

    #[test]
    fn test_empty_settlement_is_settled() {
        let settlement = CommissionSettlement::tally(&Vec::<CommissionRecord>::new(), |_| false);
        assert!(settlement.is_settled());
    }
}
