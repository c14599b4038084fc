//! Ledger-derived vs recorded balances for bank and cash accounts.

use std::sync::Arc;

use closebook_shared::DateRange;
use closebook_shared::types::{AccountId, BankAccountId, CompanyId, LedgerEntryId, MovementId};
use closebook_shared::types::money::within_tolerance;
use futures::future::try_join_all;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::types::{BankAccount, TreasuryMovement};
use crate::collaborators::{BankAccountProvider, CollaboratorError, TreasuryMovementProvider};
use crate::ledger::{AccountBalance, EntryState};
use crate::store::LedgerStore;

/// Balance comparison for one bank/cash account.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountReconciliation {
    /// Bank/cash account.
    pub bank_account_id: BankAccountId,
    /// Its display name.
    pub name: String,
    /// Ledger account mirroring it.
    pub ledger_account_id: AccountId,
    /// Opening balance plus confirmed ledger balance through the range end.
    pub computed_balance: Decimal,
    /// Balance recorded by treasury.
    pub recorded_balance: Decimal,
    /// `recorded - computed`.
    pub difference: Decimal,
    /// `|difference| <= tolerance`.
    pub matches: bool,
}

/// A movement in range that is not backed by a confirmed entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MovementIssue {
    /// The movement.
    pub movement_id: MovementId,
    /// Account moved.
    pub bank_account_id: BankAccountId,
    /// Linked entry, if any.
    pub linked_entry_id: Option<LedgerEntryId>,
    /// State of the linked entry; `None` if missing or unlinked.
    pub entry_state: Option<EntryState>,
}

impl MovementIssue {
    /// Returns true if the movement has no linked entry at all.
    #[must_use]
    pub fn is_unlinked(&self) -> bool {
        self.linked_entry_id.is_none()
    }
}

/// A bank account whose ledger account does not exist.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnknownLedgerAccount {
    /// Bank/cash account.
    pub bank_account_id: BankAccountId,
    /// Missing ledger account.
    pub ledger_account_id: AccountId,
}

/// Result of reconciling every active account of a company.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReconciliationReport {
    /// One entry per active account with a known ledger account.
    pub accounts: Vec<AccountReconciliation>,
    /// Movements lacking a confirmed entry.
    pub movement_issues: Vec<MovementIssue>,
    /// Accounts that could not be reconciled.
    pub unknown_ledger_accounts: Vec<UnknownLedgerAccount>,
}

impl ReconciliationReport {
    /// Returns true if every account matches and every movement is backed.
    #[must_use]
    pub fn is_clean(&self) -> bool {
        self.accounts.iter().all(|a| a.matches)
            && self.movement_issues.is_empty()
            && self.unknown_ledger_accounts.is_empty()
    }
}

struct AccountOutcome {
    reconciliation: Result<AccountReconciliation, UnknownLedgerAccount>,
    movement_issues: Vec<MovementIssue>,
}

/// Compares treasury balances with the ledger.
#[derive(Clone)]
pub struct TreasuryReconciliationChecker {
    banks: Arc<dyn BankAccountProvider>,
    movements: Arc<dyn TreasuryMovementProvider>,
    ledger: Arc<dyn LedgerStore>,
    tolerance: Decimal,
}

impl TreasuryReconciliationChecker {
    /// Creates a checker accepting differences up to `tolerance` (inclusive).
    #[must_use]
    pub fn new(
        banks: Arc<dyn BankAccountProvider>,
        movements: Arc<dyn TreasuryMovementProvider>,
        ledger: Arc<dyn LedgerStore>,
        tolerance: Decimal,
    ) -> Self {
        Self {
            banks,
            movements,
            ledger,
            tolerance,
        }
    }

    /// Reconciles every active account of `company` as of `range.end` and
    /// checks the movements dated in `range`. Accounts are processed
    /// concurrently.
    ///
    /// # Errors
    ///
    /// Propagates collaborator and storage failures.
    pub async fn reconcile(
        &self,
        company: CompanyId,
        range: DateRange,
    ) -> Result<ReconciliationReport, CollaboratorError> {
        let accounts: Vec<BankAccount> = self
            .banks
            .active_accounts(company)
            .await?
            .into_iter()
            .filter(|a| a.is_active)
            .collect();

        let outcomes = try_join_all(
            accounts
                .iter()
                .map(|account| self.reconcile_account(company, account, range)),
        )
        .await?;

        let mut report = ReconciliationReport::default();
        for outcome in outcomes {
            match outcome.reconciliation {
                Ok(reconciliation) => report.accounts.push(reconciliation),
                Err(unknown) => report.unknown_ledger_accounts.push(unknown),
            }
            report.movement_issues.extend(outcome.movement_issues);
        }
        Ok(report)
    }

    async fn reconcile_account(
        &self,
        company: CompanyId,
        account: &BankAccount,
        range: DateRange,
    ) -> Result<AccountOutcome, CollaboratorError> {
        let reconciliation = match self.ledger.account(company, account.ledger_account_id).await? {
            Some(ledger_account) => {
                let postings = self
                    .ledger
                    .confirmed_postings(company, ledger_account.id, None, range.end)
                    .await?;
                let ledger_balance = AccountBalance::from_postings(
                    ledger_account.id,
                    ledger_account.account_type.normal_balance(),
                    &postings,
                );
                let computed_balance = account.opening_balance + ledger_balance.balance;
                let difference = account.recorded_balance - computed_balance;
                let matches =
                    within_tolerance(account.recorded_balance, computed_balance, self.tolerance);

                debug!(
                    bank_account_id = %account.id,
                    %computed_balance,
                    recorded_balance = %account.recorded_balance,
                    %difference,
                    matches,
                    "Bank account reconciled"
                );

                Ok(AccountReconciliation {
                    bank_account_id: account.id,
                    name: account.name.clone(),
                    ledger_account_id: ledger_account.id,
                    computed_balance,
                    recorded_balance: account.recorded_balance,
                    difference,
                    matches,
                })
            }
            None => Err(UnknownLedgerAccount {
                bank_account_id: account.id,
                ledger_account_id: account.ledger_account_id,
            }),
        };

        let movements = self.movements.movements(account.id, range).await?;
        let mut movement_issues = Vec::new();
        for movement in movements {
            if let Some(issue) = self.check_movement(company, movement).await? {
                movement_issues.push(issue);
            }
        }

        Ok(AccountOutcome {
            reconciliation,
            movement_issues,
        })
    }

    async fn check_movement(
        &self,
        company: CompanyId,
        movement: TreasuryMovement,
    ) -> Result<Option<MovementIssue>, CollaboratorError> {
        let entry_state = match movement.linked_entry_id {
            None => None,
            Some(entry_id) => self.ledger.entry(company, entry_id).await?.map(|e| e.state),
        };

        if entry_state == Some(EntryState::Confirmed) {
            return Ok(None);
        }

        Ok(Some(MovementIssue {
            movement_id: movement.id,
            bank_account_id: movement.bank_account_id,
            linked_entry_id: movement.linked_entry_id,
            entry_state,
        }))
    }
}
