//! Ledger service: entry lifecycle and account balances.
//!
//! Validation is pure (see [`super::validation`]); this service adds the
//! lookups (period, accounts) and hands the write to the store together
//! with the period lock that makes it safe against a concurrent close.

use std::collections::BTreeSet;
use std::sync::Arc;

use chrono::{NaiveDate, Utc};
use closebook_shared::DateRange;
use closebook_shared::types::{AccountId, ActorId, CompanyId, LedgerEntryId};
use tracing::{debug, info, warn};

use super::account::Account;
use super::balance::{AccountBalance, AccountLedger};
use super::error::LedgerError;
use super::types::{
    CreateEntryInput, EntryPatch, EntryState, LedgerEntry, NewLedgerEntry, Posting, PostingInput,
};
use super::validation::{validate_account, validate_can_modify, validate_can_void, validate_postings};
use crate::fiscal::AccountingPeriod;
use crate::store::{LedgerStore, PeriodLock, PeriodStore, StoreError};

/// Entry lifecycle over a [`LedgerStore`].
#[derive(Clone)]
pub struct LedgerService {
    ledger: Arc<dyn LedgerStore>,
    periods: Arc<dyn PeriodStore>,
    default_prefix: String,
}

impl LedgerService {
    /// Creates a service; entries without a prefix get `default_prefix`.
    #[must_use]
    pub fn new(
        ledger: Arc<dyn LedgerStore>,
        periods: Arc<dyn PeriodStore>,
        default_prefix: impl Into<String>,
    ) -> Self {
        Self {
            ledger,
            periods,
            default_prefix: default_prefix.into(),
        }
    }

    /// Creates a draft entry with a newly allocated sequence number.
    ///
    /// # Errors
    ///
    /// `NoPeriod` / `PeriodClosed` for the date, posting validation errors,
    /// account errors, and `ConcurrentModification` if the period changed
    /// while the entry was being validated.
    pub async fn create_entry(&self, input: CreateEntryInput) -> Result<LedgerEntry, LedgerError> {
        let period = self.open_period_for(input.company_id, input.date).await?;
        validate_postings(&input.postings)?;
        self.validate_accounts(input.company_id, &input.postings)
            .await?;

        let id = LedgerEntryId::new();
        let new_entry = NewLedgerEntry {
            id,
            company_id: input.company_id,
            period_id: period.id,
            prefix: input
                .prefix
                .unwrap_or_else(|| self.default_prefix.clone()),
            date: input.date,
            description: input.description,
            reference: input.reference,
            postings: materialize(id, input.postings),
            created_by: input.created_by,
            created_at: Utc::now(),
        };

        let entry = match self
            .ledger
            .insert_entry(new_entry, PeriodLock::from(&period))
            .await
        {
            Ok(entry) => entry,
            Err(err) => {
                return Err(self
                    .write_error(err, input.company_id, &[input.date])
                    .await);
            }
        };

        info!(
            entry_id = %entry.id,
            number = %entry.number(),
            period_id = %entry.period_id,
            actor = %entry.created_by,
            "Ledger entry created"
        );
        Ok(entry)
    }

    /// Moves a draft entry to `Confirmed`.
    ///
    /// # Errors
    ///
    /// `AlreadyConfirmed`, `InvalidEntryState` for voided entries,
    /// `PeriodClosed` if the entry's period no longer accepts entries.
    pub async fn confirm_entry(
        &self,
        company: CompanyId,
        id: LedgerEntryId,
        actor: ActorId,
    ) -> Result<LedgerEntry, LedgerError> {
        let entry = self.load(company, id).await?;
        validate_can_modify(entry.id, entry.state)?;
        let period = self.open_period_for(company, entry.date).await?;

        let totals = entry.totals();
        if !totals.is_balanced {
            return Err(LedgerError::UnbalancedEntry {
                debit: totals.debit,
                credit: totals.credit,
            });
        }

        let now = Utc::now();
        let mut confirmed = entry.clone();
        confirmed.state = EntryState::Confirmed;
        confirmed.confirmed_by = Some(actor);
        confirmed.confirmed_at = Some(now);
        confirmed.updated_at = now;

        let confirmed = self
            .write_update(confirmed, entry.version, &[&period], &[entry.date])
            .await?;

        info!(entry_id = %id, number = %confirmed.number(), actor = %actor, "Ledger entry confirmed");
        Ok(confirmed)
    }

    /// Marks a confirmed entry as `Voided`. Postings are kept unchanged.
    ///
    /// # Errors
    ///
    /// `InvalidEntryState` unless the entry is confirmed, `PeriodClosed`
    /// if its period is not open.
    pub async fn void_entry(
        &self,
        company: CompanyId,
        id: LedgerEntryId,
        actor: ActorId,
    ) -> Result<LedgerEntry, LedgerError> {
        let entry = self.load(company, id).await?;
        validate_can_void(entry.id, entry.state)?;
        let period = self.open_period_for(company, entry.date).await?;

        let now = Utc::now();
        let mut voided = entry.clone();
        voided.state = EntryState::Voided;
        voided.voided_by = Some(actor);
        voided.voided_at = Some(now);
        voided.updated_at = now;

        let voided = self
            .write_update(voided, entry.version, &[&period], &[entry.date])
            .await?;

        info!(entry_id = %id, number = %voided.number(), actor = %actor, "Ledger entry voided");
        Ok(voided)
    }

    /// Applies a patch to a draft entry.
    ///
    /// Replacement postings are re-validated. A date change requires both
    /// the period the entry leaves and the one it enters to be open.
    ///
    /// # Errors
    ///
    /// Entry state errors, period errors, posting and account validation errors.
    pub async fn update_entry(
        &self,
        company: CompanyId,
        id: LedgerEntryId,
        patch: EntryPatch,
        actor: ActorId,
    ) -> Result<LedgerEntry, LedgerError> {
        let entry = self.load(company, id).await?;
        validate_can_modify(entry.id, entry.state)?;
        if patch.is_empty() {
            return Ok(entry);
        }

        let current = self.open_period_for(company, entry.date).await?;
        let mut target = None;
        let mut updated = entry.clone();

        if let Some(date) = patch.date.filter(|d| *d != entry.date) {
            if !current.contains_date(date) {
                let period = self.open_period_for(company, date).await?;
                updated.period_id = period.id;
                target = Some(period);
            }
            updated.date = date;
        }

        if let Some(postings) = patch.postings {
            validate_postings(&postings)?;
            self.validate_accounts(company, &postings).await?;
            updated.postings = materialize(entry.id, postings);
        }
        if let Some(description) = patch.description {
            updated.description = description;
        }
        if let Some(reference) = patch.reference {
            updated.reference = reference;
        }
        updated.updated_at = Utc::now();

        let mut touched = vec![&current];
        touched.extend(target.as_ref());
        let dates = [entry.date, updated.date];
        let updated = self
            .write_update(updated, entry.version, &touched, &dates)
            .await?;

        info!(entry_id = %id, number = %updated.number(), actor = %actor, "Ledger entry updated");
        Ok(updated)
    }

    /// Looks up an entry.
    ///
    /// # Errors
    ///
    /// `EntryNotFound` or `Persistence`.
    pub async fn entry(&self, company: CompanyId, id: LedgerEntryId) -> Result<LedgerEntry, LedgerError> {
        self.load(company, id).await
    }

    /// Confirmed debit/credit totals of `account` inside `range`, with the
    /// balance under the account's natural sign.
    ///
    /// # Errors
    ///
    /// `AccountNotFound` or `Persistence`.
    pub async fn sum_postings_for_account_in_range(
        &self,
        company: CompanyId,
        account: AccountId,
        range: DateRange,
    ) -> Result<AccountBalance, LedgerError> {
        let account = self.require_account(company, account).await?;
        let postings = self
            .ledger
            .confirmed_postings(company, account.id, Some(range.start), range.end)
            .await?;
        Ok(AccountBalance::from_postings(
            account.id,
            account.account_type.normal_balance(),
            &postings,
        ))
    }

    /// Cumulative confirmed balance of `account` from the first posting
    /// through `date` inclusive.
    ///
    /// # Errors
    ///
    /// `AccountNotFound` or `Persistence`.
    pub async fn balance_through(
        &self,
        company: CompanyId,
        account: AccountId,
        date: NaiveDate,
    ) -> Result<AccountBalance, LedgerError> {
        let account = self.require_account(company, account).await?;
        let postings = self
            .ledger
            .confirmed_postings(company, account.id, None, date)
            .await?;
        Ok(AccountBalance::from_postings(
            account.id,
            account.account_type.normal_balance(),
            &postings,
        ))
    }

    /// General-ledger listing of `account` over `range` with running balance.
    ///
    /// # Errors
    ///
    /// `AccountNotFound` or `Persistence`.
    pub async fn account_ledger(
        &self,
        company: CompanyId,
        account: AccountId,
        range: DateRange,
    ) -> Result<AccountLedger, LedgerError> {
        let account = self.require_account(company, account).await?;
        let postings = self
            .ledger
            .confirmed_postings(company, account.id, None, range.end)
            .await?;
        Ok(AccountLedger::build(
            account.id,
            account.account_type.normal_balance(),
            range,
            postings,
        ))
    }

    async fn load(&self, company: CompanyId, id: LedgerEntryId) -> Result<LedgerEntry, LedgerError> {
        self.ledger
            .entry(company, id)
            .await?
            .ok_or(LedgerError::EntryNotFound(id))
    }

    async fn require_account(
        &self,
        company: CompanyId,
        id: AccountId,
    ) -> Result<Account, LedgerError> {
        self.ledger
            .account(company, id)
            .await?
            .ok_or(LedgerError::AccountNotFound(id))
    }

    async fn open_period_for(
        &self,
        company: CompanyId,
        date: NaiveDate,
    ) -> Result<AccountingPeriod, LedgerError> {
        let period = self
            .periods
            .period_for_date(company, date)
            .await?
            .ok_or(LedgerError::NoPeriod(date))?;

        if !period.allows_entries {
            debug!(period_id = %period.id, %date, state = %period.state, "Write rejected by closed period");
            return Err(LedgerError::PeriodClosed {
                date,
                period_id: period.id,
            });
        }
        Ok(period)
    }

    async fn validate_accounts(
        &self,
        company: CompanyId,
        postings: &[PostingInput],
    ) -> Result<(), LedgerError> {
        let ids: BTreeSet<AccountId> = postings.iter().map(|p| p.account_id).collect();
        for id in ids {
            let account = self.require_account(company, id).await?;
            validate_account(&account)?;
        }
        Ok(())
    }

    async fn write_update(
        &self,
        entry: LedgerEntry,
        expected_version: i64,
        periods: &[&AccountingPeriod],
        dates: &[NaiveDate],
    ) -> Result<LedgerEntry, LedgerError> {
        let company = entry.company_id;
        let locks: Vec<PeriodLock> = periods.iter().map(|p| PeriodLock::from(*p)).collect();
        match self.ledger.update_entry(entry, expected_version, &locks).await {
            Ok(entry) => Ok(entry),
            Err(err) => Err(self.write_error(err, company, dates).await),
        }
    }

    /// A conflicting write either raced a close (the period is no longer
    /// open) or another writer; tell the two apart for the caller.
    async fn write_error(&self, err: StoreError, company: CompanyId, dates: &[NaiveDate]) -> LedgerError {
        if !err.is_conflict() {
            warn!(error = %err, "Ledger write failed");
            return err.into();
        }

        for date in dates {
            if let Ok(Some(period)) = self.periods.period_for_date(company, *date).await
                && !period.allows_entries
            {
                return LedgerError::PeriodClosed {
                    date: *date,
                    period_id: period.id,
                };
            }
        }
        LedgerError::ConcurrentModification
    }
}

fn materialize(entry_id: LedgerEntryId, postings: Vec<PostingInput>) -> Vec<Posting> {
    postings
        .into_iter()
        .map(|p| Posting::from_input(entry_id, p))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fiscal::plan_fiscal_year;
    use crate::ledger::account::AccountType;
    use crate::store::{MemoryStore, PeriodStore};
    use rust_decimal::Decimal;
    use rust_decimal_macros::dec;

    struct Fixture {
        store: Arc<MemoryStore>,
        service: LedgerService,
        company: CompanyId,
        actor: ActorId,
        cash: AccountId,
        revenue: AccountId,
    }

    fn date(m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, m, d).unwrap()
    }

    async fn fixture() -> Fixture {
        let store = Arc::new(MemoryStore::new());
        let company = CompanyId::new();
        let range = DateRange::new(date(1, 1), date(12, 31)).unwrap();
        let (year, periods) = plan_fiscal_year(company, 2025, range);
        store.insert_fiscal_year(year, periods).await.unwrap();

        let cash = store
            .add_account(company, "1.1.01", "Cash", AccountType::Asset)
            .await;
        let revenue = store
            .add_account(company, "4.1.01", "Sales", AccountType::Income)
            .await;

        let service = LedgerService::new(store.clone(), store.clone(), "JE");
        Fixture {
            store,
            service,
            company,
            actor: ActorId::new(),
            cash,
            revenue,
        }
    }

    fn input(fx: &Fixture, on: NaiveDate, amount: Decimal) -> CreateEntryInput {
        CreateEntryInput {
            company_id: fx.company,
            date: on,
            description: "Cash sale".to_string(),
            reference: None,
            prefix: None,
            postings: vec![
                PostingInput::debit(fx.cash, amount),
                PostingInput::credit(fx.revenue, amount),
            ],
            created_by: fx.actor,
        }
    }

    #[tokio::test]
    async fn test_create_allocates_gap_free_sequence() {
        let fx = fixture().await;

        let first = fx.service.create_entry(input(&fx, date(1, 5), dec!(10))).await.unwrap();
        let second = fx.service.create_entry(input(&fx, date(1, 6), dec!(20))).await.unwrap();

        assert_eq!(first.state, EntryState::Draft);
        assert_eq!(first.number(), "JE-000001");
        assert_eq!(second.sequence, first.sequence + 1);
    }

    #[tokio::test]
    async fn test_create_rejects_unbalanced_entry() {
        let fx = fixture().await;
        let mut bad = input(&fx, date(1, 5), dec!(10));
        bad.postings[1].credit = dec!(9.99);

        let err = fx.service.create_entry(bad).await.unwrap_err();
        assert!(matches!(err, LedgerError::UnbalancedEntry { .. }));
    }

    #[tokio::test]
    async fn test_create_without_period() {
        let fx = fixture().await;
        let on = NaiveDate::from_ymd_opt(2026, 1, 2).unwrap();
        let err = fx.service.create_entry(input(&fx, on, dec!(10))).await.unwrap_err();
        assert!(matches!(err, LedgerError::NoPeriod(d) if d == on));
    }

    #[tokio::test]
    async fn test_create_rejects_unknown_and_inactive_accounts() {
        let fx = fixture().await;
        let mut unknown = input(&fx, date(1, 5), dec!(10));
        unknown.postings[0].account_id = AccountId::new();
        assert!(matches!(
            fx.service.create_entry(unknown).await,
            Err(LedgerError::AccountNotFound(_))
        ));

        fx.store.set_account_active(fx.revenue, false).await;
        assert!(matches!(
            fx.service.create_entry(input(&fx, date(1, 5), dec!(10))).await,
            Err(LedgerError::AccountInactive(id)) if id == fx.revenue
        ));
    }

    #[tokio::test]
    async fn test_confirm_and_void_lifecycle() {
        let fx = fixture().await;
        let entry = fx.service.create_entry(input(&fx, date(2, 1), dec!(50))).await.unwrap();

        let confirmed = fx.service.confirm_entry(fx.company, entry.id, fx.actor).await.unwrap();
        assert_eq!(confirmed.state, EntryState::Confirmed);
        assert_eq!(confirmed.confirmed_by, Some(fx.actor));

        assert!(matches!(
            fx.service.confirm_entry(fx.company, entry.id, fx.actor).await,
            Err(LedgerError::AlreadyConfirmed(_))
        ));

        let voided = fx.service.void_entry(fx.company, entry.id, fx.actor).await.unwrap();
        assert_eq!(voided.state, EntryState::Voided);
        assert_eq!(voided.postings, confirmed.postings);
    }

    #[tokio::test]
    async fn test_void_requires_confirmed() {
        let fx = fixture().await;
        let entry = fx.service.create_entry(input(&fx, date(2, 1), dec!(50))).await.unwrap();
        assert!(matches!(
            fx.service.void_entry(fx.company, entry.id, fx.actor).await,
            Err(LedgerError::InvalidEntryState { state: EntryState::Draft, .. })
        ));
    }

    #[tokio::test]
    async fn test_update_moves_entry_between_open_periods() {
        let fx = fixture().await;
        let entry = fx.service.create_entry(input(&fx, date(1, 31), dec!(10))).await.unwrap();

        let patch = EntryPatch {
            date: Some(date(2, 1)),
            postings: Some(vec![
                PostingInput::debit(fx.cash, dec!(12)),
                PostingInput::credit(fx.revenue, dec!(12)),
            ]),
            ..EntryPatch::default()
        };
        let updated = fx.service.update_entry(fx.company, entry.id, patch, fx.actor).await.unwrap();

        let february = fx.store.period_for_date(fx.company, date(2, 1)).await.unwrap().unwrap();
        assert_eq!(updated.period_id, february.id);
        assert_eq!(updated.totals().debit, dec!(12));
        assert_eq!(updated.version, entry.version + 1);
    }

    #[tokio::test]
    async fn test_update_rejects_unbalanced_replacement() {
        let fx = fixture().await;
        let entry = fx.service.create_entry(input(&fx, date(1, 10), dec!(10))).await.unwrap();
        let patch = EntryPatch {
            postings: Some(vec![
                PostingInput::debit(fx.cash, dec!(12)),
                PostingInput::credit(fx.revenue, dec!(10)),
            ]),
            ..EntryPatch::default()
        };
        assert!(matches!(
            fx.service.update_entry(fx.company, entry.id, patch, fx.actor).await,
            Err(LedgerError::UnbalancedEntry { .. })
        ));
    }

    #[tokio::test]
    async fn test_ledger_write_bumps_period_version() {
        let fx = fixture().await;
        let before = fx.store.period_for_date(fx.company, date(3, 3)).await.unwrap().unwrap();
        fx.service.create_entry(input(&fx, date(3, 3), dec!(1))).await.unwrap();
        let after = fx.store.period(before.id).await.unwrap().unwrap();
        assert_eq!(after.version, before.version + 1);
    }

    #[tokio::test]
    async fn test_balances_count_only_confirmed_entries() {
        let fx = fixture().await;
        let confirmed = fx.service.create_entry(input(&fx, date(1, 5), dec!(100.00))).await.unwrap();
        fx.service.confirm_entry(fx.company, confirmed.id, fx.actor).await.unwrap();
        fx.service.create_entry(input(&fx, date(1, 6), dec!(7.00))).await.unwrap();

        let range = DateRange::new(date(1, 1), date(1, 31)).unwrap();
        let cash = fx
            .service
            .sum_postings_for_account_in_range(fx.company, fx.cash, range)
            .await
            .unwrap();
        let revenue = fx
            .service
            .sum_postings_for_account_in_range(fx.company, fx.revenue, range)
            .await
            .unwrap();

        assert_eq!(cash.balance, dec!(100.00));
        assert_eq!(revenue.balance, dec!(100.00));
        assert_eq!(revenue.credit_total, dec!(100.00));
    }

    #[tokio::test]
    async fn test_account_ledger_opening_balance() {
        let fx = fixture().await;
        for (on, amount) in [(date(1, 10), dec!(40)), (date(2, 10), dec!(60))] {
            let entry = fx.service.create_entry(input(&fx, on, amount)).await.unwrap();
            fx.service.confirm_entry(fx.company, entry.id, fx.actor).await.unwrap();
        }

        let february = DateRange::new(date(2, 1), date(2, 28)).unwrap();
        let ledger = fx.service.account_ledger(fx.company, fx.cash, february).await.unwrap();

        assert_eq!(ledger.opening_balance, dec!(40));
        assert_eq!(ledger.lines.len(), 1);
        assert_eq!(ledger.closing_balance, dec!(100));

        let through = fx.service.balance_through(fx.company, fx.cash, date(1, 31)).await.unwrap();
        assert_eq!(through.balance, dec!(40));
    }
}
