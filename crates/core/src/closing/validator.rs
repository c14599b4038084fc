//! Cross-entity checks gating a period close.

use std::sync::Arc;

use closebook_shared::DateRange;
use closebook_shared::types::CompanyId;
use tracing::debug;

use super::error::ClosingError;
use super::report::{ValidationIssue, ValidationReport};
use crate::collaborators::CommissionProvider;
use crate::documents::{CommissionSettlement, DocumentPostingRegistry, PostingStatus, UnpostedDocuments};
use crate::fiscal::{AccountingPeriod, PeriodTotals};
use crate::ledger::{EntryState, LedgerEntry};
use crate::store::LedgerStore;
use crate::treasury::{ReconciliationReport, TreasuryReconciliationChecker};

/// Runs every closing check over a period and accumulates the failures.
#[derive(Clone)]
pub struct ClosingValidator {
    documents: DocumentPostingRegistry,
    commissions: Arc<dyn CommissionProvider>,
    treasury: TreasuryReconciliationChecker,
    ledger: Arc<dyn LedgerStore>,
}

impl ClosingValidator {
    /// Creates a validator.
    #[must_use]
    pub fn new(
        documents: DocumentPostingRegistry,
        commissions: Arc<dyn CommissionProvider>,
        treasury: TreasuryReconciliationChecker,
        ledger: Arc<dyn LedgerStore>,
    ) -> Self {
        Self {
            documents,
            commissions,
            treasury,
            ledger,
        }
    }

    /// Validates `period` for closing. Reads run concurrently; an empty
    /// issue list means the period may close.
    ///
    /// # Errors
    ///
    /// Only infrastructure failures; rule violations are reported as issues.
    pub async fn validate(&self, period: &AccountingPeriod) -> Result<ValidationReport, ClosingError> {
        let company = period.company_id;
        let range = period.range();

        let (unposted, entries, settlement, treasury) = tokio::try_join!(
            self.read_documents(company, range),
            self.read_entries(company, range),
            self.read_commissions(company, range),
            self.read_treasury(company, range),
        )?;

        let mut issues = Vec::new();
        posting_completeness(&unposted, &mut issues);
        entry_confirmation(&entries, &mut issues);
        let totals = double_entry_balance(&entries, &mut issues);
        commission_settlement(settlement, &mut issues);
        treasury_reconciliation(&treasury, &mut issues);

        debug!(
            period_id = %period.id,
            issues = issues.len(),
            entries = entries.len(),
            total_debits = %totals.total_debits,
            total_credits = %totals.total_credits,
            "Closing validation finished"
        );

        Ok(ValidationReport {
            period_id: period.id,
            range,
            issues,
            totals,
            reconciliations: treasury.accounts,
        })
    }

    async fn read_documents(
        &self,
        company: CompanyId,
        range: DateRange,
    ) -> Result<UnpostedDocuments, ClosingError> {
        Ok(self.documents.unposted_or_failed(company, range).await?)
    }

    async fn read_entries(
        &self,
        company: CompanyId,
        range: DateRange,
    ) -> Result<Vec<LedgerEntry>, ClosingError> {
        Ok(self.ledger.entries_in_range(company, range).await?)
    }

    async fn read_commissions(
        &self,
        company: CompanyId,
        range: DateRange,
    ) -> Result<CommissionSettlement, ClosingError> {
        Ok(self.commissions.settlement_status(company, range).await?)
    }

    async fn read_treasury(
        &self,
        company: CompanyId,
        range: DateRange,
    ) -> Result<ReconciliationReport, ClosingError> {
        Ok(self.treasury.reconcile(company, range).await?)
    }
}

fn posting_completeness(unposted: &UnpostedDocuments, issues: &mut Vec<ValidationIssue>) {
    for doc in unposted.values().flatten() {
        issues.push(match &doc.status {
            PostingStatus::PostingFailed { error } => ValidationIssue::DocumentPostingFailed {
                kind: doc.kind,
                document_id: doc.id,
                number: doc.number.clone(),
                error: error.clone(),
            },
            _ => ValidationIssue::DocumentUnposted {
                kind: doc.kind,
                document_id: doc.id,
                number: doc.number.clone(),
            },
        });
    }
}

fn entry_confirmation(entries: &[LedgerEntry], issues: &mut Vec<ValidationIssue>) {
    issues.extend(
        entries
            .iter()
            .filter(|e| e.state == EntryState::Draft)
            .map(|e| ValidationIssue::DraftEntry {
                entry_id: e.id,
                number: e.number(),
            }),
    );
}

fn double_entry_balance(entries: &[LedgerEntry], issues: &mut Vec<ValidationIssue>) -> PeriodTotals {
    let totals = entries
        .iter()
        .filter(|e| e.state == EntryState::Confirmed)
        .fold(PeriodTotals::default(), |acc, e| {
            let t = e.totals();
            acc.combine(PeriodTotals {
                total_debits: t.debit,
                total_credits: t.credit,
                entry_count: 1,
            })
        });

    if !totals.is_balanced() {
        issues.push(ValidationIssue::PeriodUnbalanced {
            total_debits: totals.total_debits,
            total_credits: totals.total_credits,
        });
    }
    totals
}

fn commission_settlement(settlement: CommissionSettlement, issues: &mut Vec<ValidationIssue>) {
    if settlement.pending_count > 0 {
        issues.push(ValidationIssue::CommissionsUnbilled {
            count: settlement.pending_count,
        });
    }
    if settlement.billed_unpaid_count > 0 {
        issues.push(ValidationIssue::CommissionsUnpaid {
            count: settlement.billed_unpaid_count,
        });
    }
    if settlement.missing_entry_count > 0 {
        issues.push(ValidationIssue::CommissionsMissingEntry {
            count: settlement.missing_entry_count,
        });
    }
}

fn treasury_reconciliation(report: &ReconciliationReport, issues: &mut Vec<ValidationIssue>) {
    for movement in &report.movement_issues {
        issues.push(match movement.linked_entry_id {
            None => ValidationIssue::MovementWithoutEntry {
                movement_id: movement.movement_id,
                bank_account_id: movement.bank_account_id,
            },
            Some(entry_id) => ValidationIssue::MovementEntryNotConfirmed {
                movement_id: movement.movement_id,
                bank_account_id: movement.bank_account_id,
                entry_id,
                entry_state: movement.entry_state,
            },
        });
    }

    for unknown in &report.unknown_ledger_accounts {
        issues.push(ValidationIssue::UnknownLedgerAccount {
            bank_account_id: unknown.bank_account_id,
            ledger_account_id: unknown.ledger_account_id,
        });
    }

    issues.extend(
        report
            .accounts
            .iter()
            .filter(|a| !a.matches)
            .map(|a| ValidationIssue::BalanceMismatch {
                bank_account_id: a.bank_account_id,
                name: a.name.clone(),
                computed_balance: a.computed_balance,
                recorded_balance: a.recorded_balance,
                difference: a.difference,
            }),
    );
}
