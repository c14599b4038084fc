//! In-memory implementation of every storage and collaborator trait.
//!
//! Each write runs against a copy of the state that replaces the live state
//! only when the whole operation succeeded, so a failure part-way leaves
//! nothing behind. Used by tests and by embedders that do not need
//! persistence.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use chrono::NaiveDate;
use closebook_shared::DateRange;
use closebook_shared::types::{
    AccountId, BankAccountId, CommissionId, CompanyId, DocumentId, FiscalYearId, LedgerEntryId,
    MovementId, PeriodId,
};
use rust_decimal::Decimal;
use tokio::sync::RwLock;

use super::{
    ClosingStore, CommittedTransition, LedgerStore, PeriodLock, PeriodStore, PeriodTransition,
    StoreError, Visibility, YearTransition,
};
use crate::audit::{BalanceSnapshot, ClosureRecord};
use crate::collaborators::{
    BankAccountProvider, CollaboratorError, CommissionProvider, SourceDocumentProvider,
    TreasuryMovementProvider,
};
use crate::documents::{
    CommissionRecord, CommissionSettlement, DocumentKind, DocumentPostingStatus, PostingStatus,
    SourceDocument,
};
use crate::fiscal::{AccountingPeriod, FiscalYear, PeriodState};
use crate::ledger::{
    Account, AccountPosting, AccountType, EntryState, LedgerEntry, NewLedgerEntry,
};
use crate::treasury::{BankAccount, TreasuryMovement};

#[derive(Debug, Clone, Default)]
struct State {
    accounts: HashMap<AccountId, Account>,
    entries: HashMap<LedgerEntryId, LedgerEntry>,
    sequences: HashMap<(CompanyId, String), i64>,
    years: HashMap<FiscalYearId, FiscalYear>,
    periods: HashMap<PeriodId, AccountingPeriod>,
    snapshots: Vec<BalanceSnapshot>,
    records: Vec<ClosureRecord>,
    documents: HashMap<DocumentId, SourceDocument>,
    commissions: HashMap<CommissionId, CommissionRecord>,
    banks: HashMap<BankAccountId, BankAccount>,
    movements: Vec<TreasuryMovement>,
}

impl State {
    fn acquire(&mut self, lock: PeriodLock) -> Result<(), StoreError> {
        let period = self
            .periods
            .get_mut(&lock.period_id)
            .ok_or_else(|| StoreError::NotFound(format!("period {}", lock.period_id)))?;

        if !period.allows_entries {
            return Err(StoreError::Conflict(format!(
                "period {} is {}",
                period.id, period.state
            )));
        }
        if period.version != lock.version {
            return Err(StoreError::Conflict(format!(
                "period {} version {} != {}",
                period.id, period.version, lock.version
            )));
        }
        period.version += 1;
        Ok(())
    }

    fn apply_visibility(&mut self, period: &AccountingPeriod, visibility: Visibility) -> u64 {
        let target = match visibility {
            Visibility::Unchanged => return 0,
            Visibility::Hide => Some(period.id),
            Visibility::Show => None,
        };
        let in_scope = |company: CompanyId, date: NaiveDate, hidden: Option<PeriodId>| {
            company == period.company_id
                && match visibility {
                    Visibility::Hide => period.contains_date(date),
                    _ => hidden == Some(period.id),
                }
        };

        let mut changed = 0;
        for doc in self.documents.values_mut() {
            if in_scope(doc.company_id, doc.issue_date, doc.hidden_by_period)
                && doc.hidden_by_period != target
            {
                doc.hidden_by_period = target;
                changed += 1;
            }
        }
        for commission in self.commissions.values_mut() {
            if in_scope(commission.company_id, commission.date, commission.hidden_by_period)
                && commission.hidden_by_period != target
            {
                commission.hidden_by_period = target;
                changed += 1;
            }
        }
        changed
    }
}

/// Transactional in-memory store.
#[derive(Debug, Default)]
pub struct MemoryStore {
    state: RwLock<State>,
    fail_next_commit: AtomicBool,
}

impl MemoryStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes the next multi-row write fail with `Backend` after all its
    /// guards passed, as a crashed database transaction would.
    pub fn fail_next_commit(&self) {
        self.fail_next_commit.store(true, Ordering::SeqCst);
    }

    async fn transaction<T>(
        &self,
        f: impl FnOnce(&mut State) -> Result<T, StoreError>,
    ) -> Result<T, StoreError> {
        let mut live = self.state.write().await;
        let mut draft = live.clone();
        let value = f(&mut draft)?;
        if self.fail_next_commit.swap(false, Ordering::SeqCst) {
            return Err(StoreError::Backend("simulated commit failure".to_string()));
        }
        *live = draft;
        Ok(value)
    }

    // ----- seeding helpers (master data and collaborator-owned rows) -----

    /// Adds an active leaf account.
    pub async fn add_account(
        &self,
        company: CompanyId,
        code: &str,
        name: &str,
        account_type: AccountType,
    ) -> AccountId {
        let account = Account {
            id: AccountId::new(),
            company_id: company,
            code: code.to_string(),
            name: name.to_string(),
            account_type,
            parent_id: None,
            is_active: true,
            is_leaf: true,
        };
        let id = account.id;
        self.state.write().await.accounts.insert(id, account);
        id
    }

    /// Activates or deactivates an account.
    pub async fn set_account_active(&self, id: AccountId, active: bool) {
        if let Some(account) = self.state.write().await.accounts.get_mut(&id) {
            account.is_active = active;
        }
    }

    /// Adds a source document.
    pub async fn add_document(
        &self,
        company: CompanyId,
        kind: DocumentKind,
        number: &str,
        issue_date: NaiveDate,
        total: Decimal,
        status: PostingStatus,
    ) -> DocumentId {
        let doc = SourceDocument {
            id: DocumentId::new(),
            company_id: company,
            kind,
            number: number.to_string(),
            issue_date,
            total,
            status,
            entry_id: None,
            hidden_by_period: None,
        };
        let id = doc.id;
        self.state.write().await.documents.insert(id, doc);
        id
    }

    /// Updates a document's posting status and entry link.
    pub async fn set_document_status(
        &self,
        id: DocumentId,
        status: PostingStatus,
        entry_id: Option<LedgerEntryId>,
    ) {
        if let Some(doc) = self.state.write().await.documents.get_mut(&id) {
            doc.status = status;
            doc.entry_id = entry_id;
        }
    }

    /// Looks up a document.
    pub async fn document(&self, id: DocumentId) -> Option<SourceDocument> {
        self.state.read().await.documents.get(&id).cloned()
    }

    /// Adds a commission record.
    pub async fn add_commission(&self, record: CommissionRecord) -> CommissionId {
        let id = record.id;
        self.state.write().await.commissions.insert(id, record);
        id
    }

    /// Looks up a commission record.
    pub async fn commission(&self, id: CommissionId) -> Option<CommissionRecord> {
        self.state.read().await.commissions.get(&id).cloned()
    }

    /// Adds an active bank/cash account.
    pub async fn add_bank_account(
        &self,
        company: CompanyId,
        name: &str,
        ledger_account_id: AccountId,
        opening_balance: Decimal,
        recorded_balance: Decimal,
    ) -> BankAccountId {
        let account = BankAccount {
            id: BankAccountId::new(),
            company_id: company,
            name: name.to_string(),
            ledger_account_id,
            opening_balance,
            recorded_balance,
            is_active: true,
        };
        let id = account.id;
        self.state.write().await.banks.insert(id, account);
        id
    }

    /// Sets the treasury-recorded balance of an account.
    pub async fn set_recorded_balance(&self, id: BankAccountId, balance: Decimal) {
        if let Some(account) = self.state.write().await.banks.get_mut(&id) {
            account.recorded_balance = balance;
        }
    }

    /// Adds a treasury movement.
    pub async fn add_movement(
        &self,
        bank_account_id: BankAccountId,
        date: NaiveDate,
        amount: Decimal,
        linked_entry_id: Option<LedgerEntryId>,
    ) -> MovementId {
        let movement = TreasuryMovement {
            id: MovementId::new(),
            bank_account_id,
            date,
            amount,
            description: String::new(),
            linked_entry_id,
        };
        let id = movement.id;
        self.state.write().await.movements.push(movement);
        id
    }
}

#[async_trait]
impl LedgerStore for MemoryStore {
    async fn account(
        &self,
        company: CompanyId,
        id: AccountId,
    ) -> Result<Option<Account>, StoreError> {
        let state = self.state.read().await;
        Ok(state
            .accounts
            .get(&id)
            .filter(|a| a.company_id == company)
            .cloned())
    }

    async fn insert_entry(
        &self,
        entry: NewLedgerEntry,
        lock: PeriodLock,
    ) -> Result<LedgerEntry, StoreError> {
        self.transaction(|state| {
            state.acquire(lock)?;
            let sequence = state
                .sequences
                .entry((entry.company_id, entry.prefix.clone()))
                .or_insert(0);
            *sequence += 1;
            let stored = entry.into_entry(*sequence);
            state.entries.insert(stored.id, stored.clone());
            Ok(stored)
        })
        .await
    }

    async fn entry(
        &self,
        company: CompanyId,
        id: LedgerEntryId,
    ) -> Result<Option<LedgerEntry>, StoreError> {
        let state = self.state.read().await;
        Ok(state
            .entries
            .get(&id)
            .filter(|e| e.company_id == company)
            .cloned())
    }

    async fn update_entry(
        &self,
        mut entry: LedgerEntry,
        expected_version: i64,
        locks: &[PeriodLock],
    ) -> Result<LedgerEntry, StoreError> {
        self.transaction(|state| {
            let stored = state
                .entries
                .get(&entry.id)
                .ok_or_else(|| StoreError::NotFound(format!("entry {}", entry.id)))?;
            if stored.version != expected_version {
                return Err(StoreError::Conflict(format!(
                    "entry {} version {} != {expected_version}",
                    entry.id, stored.version
                )));
            }
            for lock in locks {
                state.acquire(*lock)?;
            }
            entry.version = expected_version + 1;
            state.entries.insert(entry.id, entry.clone());
            Ok(entry)
        })
        .await
    }

    async fn entries_in_range(
        &self,
        company: CompanyId,
        range: DateRange,
    ) -> Result<Vec<LedgerEntry>, StoreError> {
        let state = self.state.read().await;
        let mut entries: Vec<LedgerEntry> = state
            .entries
            .values()
            .filter(|e| e.company_id == company && range.contains(e.date))
            .cloned()
            .collect();
        entries.sort_by(|a, b| {
            (a.date, &a.prefix, a.sequence).cmp(&(b.date, &b.prefix, b.sequence))
        });
        Ok(entries)
    }

    async fn confirmed_postings(
        &self,
        company: CompanyId,
        account: AccountId,
        from: Option<NaiveDate>,
        through: NaiveDate,
    ) -> Result<Vec<AccountPosting>, StoreError> {
        let state = self.state.read().await;
        let mut entries: Vec<&LedgerEntry> = state
            .entries
            .values()
            .filter(|e| {
                e.company_id == company
                    && e.state == EntryState::Confirmed
                    && e.date <= through
                    && from.is_none_or(|f| e.date >= f)
            })
            .collect();
        entries.sort_by(|a, b| {
            (a.date, &a.prefix, a.sequence).cmp(&(b.date, &b.prefix, b.sequence))
        });

        Ok(entries
            .into_iter()
            .flat_map(|e| {
                e.postings
                    .iter()
                    .filter(|p| p.account_id == account)
                    .map(|p| AccountPosting {
                        entry_id: e.id,
                        entry_number: e.number(),
                        date: e.date,
                        description: e.description.clone(),
                        debit: p.debit,
                        credit: p.credit,
                    })
            })
            .collect())
    }
}

#[async_trait]
impl PeriodStore for MemoryStore {
    async fn insert_fiscal_year(
        &self,
        year: FiscalYear,
        periods: Vec<AccountingPeriod>,
    ) -> Result<(), StoreError> {
        self.transaction(|state| {
            if let Some(existing) = state
                .years
                .values()
                .find(|y| y.company_id == year.company_id && y.range().overlaps(&year.range()))
            {
                return Err(StoreError::Conflict(format!(
                    "fiscal year overlaps {}",
                    existing.id
                )));
            }
            for period in periods {
                state.periods.insert(period.id, period);
            }
            state.years.insert(year.id, year);
            Ok(())
        })
        .await
    }

    async fn fiscal_year(&self, id: FiscalYearId) -> Result<Option<FiscalYear>, StoreError> {
        Ok(self.state.read().await.years.get(&id).cloned())
    }

    async fn fiscal_years(&self, company: CompanyId) -> Result<Vec<FiscalYear>, StoreError> {
        let state = self.state.read().await;
        let mut years: Vec<FiscalYear> = state
            .years
            .values()
            .filter(|y| y.company_id == company)
            .cloned()
            .collect();
        years.sort_by_key(|y| y.start_date);
        Ok(years)
    }

    async fn period(&self, id: PeriodId) -> Result<Option<AccountingPeriod>, StoreError> {
        Ok(self.state.read().await.periods.get(&id).cloned())
    }

    async fn period_for_date(
        &self,
        company: CompanyId,
        date: NaiveDate,
    ) -> Result<Option<AccountingPeriod>, StoreError> {
        let state = self.state.read().await;
        Ok(state
            .periods
            .values()
            .find(|p| p.company_id == company && p.contains_date(date))
            .cloned())
    }

    async fn periods_for_year(
        &self,
        year: FiscalYearId,
    ) -> Result<Vec<AccountingPeriod>, StoreError> {
        let state = self.state.read().await;
        let mut periods: Vec<AccountingPeriod> = state
            .periods
            .values()
            .filter(|p| p.fiscal_year_id == year)
            .cloned()
            .collect();
        periods.sort_by_key(|p| p.number);
        Ok(periods)
    }
}

fn guard_period(
    state: &State,
    id: PeriodId,
    expected_state: PeriodState,
    expected_version: i64,
) -> Result<(), StoreError> {
    let stored = state
        .periods
        .get(&id)
        .ok_or_else(|| StoreError::NotFound(format!("period {id}")))?;
    if stored.state != expected_state || stored.version != expected_version {
        return Err(StoreError::Conflict(format!(
            "period {id} is {} v{}, expected {expected_state} v{expected_version}",
            stored.state, stored.version
        )));
    }
    Ok(())
}

#[async_trait]
impl ClosingStore for MemoryStore {
    async fn commit_period_transition(
        &self,
        transition: PeriodTransition,
    ) -> Result<CommittedTransition, StoreError> {
        self.transaction(|state| {
            let PeriodTransition {
                expected_state,
                expected_version,
                mut period,
                snapshots,
                record,
                visibility,
            } = transition;

            guard_period(state, period.id, expected_state, expected_version)?;
            period.version = expected_version + 1;
            let documents_affected = state.apply_visibility(&period, visibility);
            state.periods.insert(period.id, period.clone());
            state.snapshots.extend(snapshots);
            state.records.push(record);

            Ok(CommittedTransition {
                period,
                documents_affected,
            })
        })
        .await
    }

    async fn sync_document_visibility(
        &self,
        period_id: PeriodId,
        expected_state: PeriodState,
        expected_version: i64,
    ) -> Result<u64, StoreError> {
        self.transaction(|state| {
            guard_period(state, period_id, expected_state, expected_version)?;
            let period = state
                .periods
                .get(&period_id)
                .cloned()
                .ok_or_else(|| StoreError::NotFound(format!("period {period_id}")))?;
            let visibility = if period.allows_entries {
                Visibility::Show
            } else {
                Visibility::Hide
            };
            Ok(state.apply_visibility(&period, visibility))
        })
        .await
    }

    async fn commit_year_transition(
        &self,
        transition: YearTransition,
    ) -> Result<FiscalYear, StoreError> {
        self.transaction(|state| {
            let YearTransition {
                expected_state,
                expected_version,
                mut year,
                periods,
                record,
            } = transition;

            let stored = state
                .years
                .get(&year.id)
                .ok_or_else(|| StoreError::NotFound(format!("fiscal year {}", year.id)))?;
            if stored.state != expected_state || stored.version != expected_version {
                return Err(StoreError::Conflict(format!(
                    "fiscal year {} is {} v{}, expected {expected_state} v{expected_version}",
                    year.id, stored.state, stored.version
                )));
            }

            for update in periods {
                guard_period(
                    state,
                    update.period.id,
                    update.expected_state,
                    update.expected_version,
                )?;
                let mut period = update.period;
                period.version = update.expected_version + 1;
                state.periods.insert(period.id, period);
            }

            year.version = expected_version + 1;
            state.years.insert(year.id, year.clone());
            state.records.push(record);
            Ok(year)
        })
        .await
    }

    async fn closure_history(
        &self,
        company: CompanyId,
        period: Option<PeriodId>,
    ) -> Result<Vec<ClosureRecord>, StoreError> {
        let state = self.state.read().await;
        let mut records: Vec<ClosureRecord> = state
            .records
            .iter()
            .filter(|r| r.company_id == company && period.is_none_or(|p| r.is_for_period(p)))
            .cloned()
            .collect();
        records.sort_by_key(|r| r.at);
        Ok(records)
    }

    async fn snapshots_for_period(
        &self,
        period: PeriodId,
    ) -> Result<Vec<BalanceSnapshot>, StoreError> {
        let state = self.state.read().await;
        let mut snapshots: Vec<BalanceSnapshot> = state
            .snapshots
            .iter()
            .filter(|s| s.period_id == period)
            .cloned()
            .collect();
        snapshots.sort_by_key(|s| s.captured_at);
        Ok(snapshots)
    }
}

#[async_trait]
impl SourceDocumentProvider for MemoryStore {
    async fn posting_status(
        &self,
        company: CompanyId,
        range: DateRange,
    ) -> Result<Vec<DocumentPostingStatus>, CollaboratorError> {
        let state = self.state.read().await;
        let mut statuses: Vec<DocumentPostingStatus> = state
            .documents
            .values()
            .filter(|d| d.company_id == company && range.contains(d.issue_date))
            .map(DocumentPostingStatus::from)
            .collect();
        statuses.sort_by(|a, b| (a.kind, &a.number).cmp(&(b.kind, &b.number)));
        Ok(statuses)
    }
}

#[async_trait]
impl CommissionProvider for MemoryStore {
    async fn settlement_status(
        &self,
        company: CompanyId,
        range: DateRange,
    ) -> Result<CommissionSettlement, CollaboratorError> {
        let state = self.state.read().await;
        let records = state
            .commissions
            .values()
            .filter(|c| c.company_id == company && range.contains(c.date));
        Ok(CommissionSettlement::tally(records, |entry_id| {
            state
                .entries
                .get(&entry_id)
                .is_some_and(|e| e.state == EntryState::Confirmed)
        }))
    }
}

#[async_trait]
impl BankAccountProvider for MemoryStore {
    async fn active_accounts(
        &self,
        company: CompanyId,
    ) -> Result<Vec<BankAccount>, CollaboratorError> {
        let state = self.state.read().await;
        let mut accounts: Vec<BankAccount> = state
            .banks
            .values()
            .filter(|b| b.company_id == company && b.is_active)
            .cloned()
            .collect();
        accounts.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(accounts)
    }
}

#[async_trait]
impl TreasuryMovementProvider for MemoryStore {
    async fn movements(
        &self,
        account: BankAccountId,
        range: DateRange,
    ) -> Result<Vec<TreasuryMovement>, CollaboratorError> {
        let state = self.state.read().await;
        let mut movements: Vec<TreasuryMovement> = state
            .movements
            .iter()
            .filter(|m| m.bank_account_id == account && range.contains(m.date))
            .cloned()
            .collect();
        movements.sort_by_key(|m| m.date);
        Ok(movements)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audit::{ClosureAction, ClosureScope};
    use crate::fiscal::{PeriodTotals, plan_fiscal_year};
    use chrono::Utc;
    use closebook_shared::types::{ActorId, ClosureRecordId};

    fn date(m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, m, d).unwrap()
    }

    async fn seeded() -> (MemoryStore, CompanyId, AccountingPeriod) {
        let store = MemoryStore::new();
        let company = CompanyId::new();
        let (year, periods) =
            plan_fiscal_year(company, 2025, DateRange::new(date(1, 1), date(12, 31)).unwrap());
        let january = periods[0].clone();
        store.insert_fiscal_year(year, periods).await.unwrap();
        (store, company, january)
    }

    fn close_of(period: &AccountingPeriod) -> PeriodTransition {
        let actor = ActorId::new();
        PeriodTransition {
            expected_state: PeriodState::Open,
            expected_version: period.version,
            period: period.closed(actor, Utc::now(), PeriodTotals::default()),
            snapshots: vec![],
            record: ClosureRecord {
                id: ClosureRecordId::new(),
                company_id: period.company_id,
                scope: ClosureScope::Period,
                target_id: period.id.into_inner(),
                action: ClosureAction::Close,
                actor,
                at: Utc::now(),
                reason: None,
                notes: None,
                prior_state: PeriodState::Open,
                new_state: PeriodState::Closed,
                totals: None,
            },
            visibility: Visibility::Hide,
        }
    }

    #[tokio::test]
    async fn test_overlapping_fiscal_year_conflicts() {
        let (store, company, _) = seeded().await;
        let (year, periods) =
            plan_fiscal_year(company, 2025, DateRange::new(date(6, 1), date(12, 31)).unwrap());
        let err = store.insert_fiscal_year(year, periods).await.unwrap_err();
        assert!(err.is_conflict());
    }

    #[tokio::test]
    async fn test_stale_version_conflicts() {
        let (store, _, january) = seeded().await;
        let mut transition = close_of(&january);
        transition.expected_version += 1;
        assert!(store.commit_period_transition(transition).await.unwrap_err().is_conflict());
        let stored = store.period(january.id).await.unwrap().unwrap();
        assert_eq!(stored.state, PeriodState::Open);
    }

    #[tokio::test]
    async fn test_failed_commit_rolls_back_everything() {
        let (store, company, january) = seeded().await;
        let doc = store
            .add_document(
                company,
                DocumentKind::SalesInvoice,
                "F-1",
                date(1, 10),
                Decimal::ONE,
                PostingStatus::Posted,
            )
            .await;

        store.fail_next_commit();
        let err = store.commit_period_transition(close_of(&january)).await.unwrap_err();
        assert!(matches!(err, StoreError::Backend(_)));

        let stored = store.period(january.id).await.unwrap().unwrap();
        assert_eq!(stored.state, PeriodState::Open);
        assert_eq!(stored.version, january.version);
        assert_eq!(store.document(doc).await.unwrap().hidden_by_period, None);
        assert!(store.closure_history(company, None).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_hide_only_touches_documents_in_period() {
        let (store, company, january) = seeded().await;
        let inside = store
            .add_document(company, DocumentKind::SalesInvoice, "F-1", date(1, 31), Decimal::ONE, PostingStatus::Posted)
            .await;
        let outside = store
            .add_document(company, DocumentKind::SalesInvoice, "F-2", date(2, 1), Decimal::ONE, PostingStatus::Posted)
            .await;

        let committed = store.commit_period_transition(close_of(&january)).await.unwrap();

        assert_eq!(committed.documents_affected, 1);
        assert_eq!(committed.period.version, january.version + 1);
        assert_eq!(store.document(inside).await.unwrap().hidden_by_period, Some(january.id));
        assert_eq!(store.document(outside).await.unwrap().hidden_by_period, None);
    }

    #[tokio::test]
    async fn test_entry_insert_requires_open_period_at_version() {
        let (store, company, january) = seeded().await;
        let new_entry = || NewLedgerEntry {
            id: LedgerEntryId::new(),
            company_id: company,
            period_id: january.id,
            prefix: "JE".to_string(),
            date: date(1, 2),
            description: "x".to_string(),
            reference: None,
            postings: vec![],
            created_by: ActorId::new(),
            created_at: Utc::now(),
        };

        let lock = PeriodLock::from(&january);
        store.insert_entry(new_entry(), lock).await.unwrap();
        // The lock is now stale: the insert bumped the period version.
        assert!(store.insert_entry(new_entry(), lock).await.unwrap_err().is_conflict());
    }

    #[tokio::test]
    async fn test_visibility_sync_rejects_stale_period() {
        let (store, company, january) = seeded().await;
        let doc = store
            .add_document(company, DocumentKind::SalesInvoice, "F-1", date(1, 15), Decimal::ONE, PostingStatus::Posted)
            .await;

        // `january` was read while open; a close lands before the sync.
        store.commit_period_transition(close_of(&january)).await.unwrap();

        let err = store
            .sync_document_visibility(january.id, january.state, january.version)
            .await
            .unwrap_err();
        assert!(err.is_conflict());
        assert_eq!(store.document(doc).await.unwrap().hidden_by_period, Some(january.id));
    }

    #[tokio::test]
    async fn test_visibility_sync_follows_stored_state() {
        let (store, company, january) = seeded().await;
        let closed = store.commit_period_transition(close_of(&january)).await.unwrap().period;
        // Imported after the close, so it was never tagged.
        let doc = store
            .add_document(company, DocumentKind::SalesInvoice, "F-1", date(1, 15), Decimal::ONE, PostingStatus::Posted)
            .await;

        let changed = store
            .sync_document_visibility(closed.id, closed.state, closed.version)
            .await
            .unwrap();

        assert_eq!(changed, 1);
        assert_eq!(store.document(doc).await.unwrap().hidden_by_period, Some(january.id));
        let stored = store.period(january.id).await.unwrap().unwrap();
        assert_eq!(stored.version, closed.version);
    }
}
