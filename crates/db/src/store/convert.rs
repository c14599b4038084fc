//! Row <-> domain conversions.

use chrono::{DateTime, FixedOffset, Utc};
use closebook_core::audit::{BalanceSnapshot, ClosureAction, ClosureRecord, ClosureScope};
use closebook_core::documents::{
    BillingState, CommissionRecord, DocumentKind, DocumentPostingStatus, PostingStatus,
};
use closebook_core::fiscal::{AccountingPeriod, FiscalYear, LifecycleStamp, PeriodState, PeriodTotals};
use closebook_core::ledger::{Account, AccountType, EntryState, LedgerEntry, Posting};
use closebook_core::store::StoreError;
use closebook_core::treasury::{BankAccount, TreasuryMovement};
use closebook_shared::types::{
    AccountId, ActorId, BankAccountId, ClosureRecordId, CommissionId, CompanyId, DocumentId,
    FiscalYearId, LedgerEntryId, MovementId, PeriodId, PostingId, SnapshotId,
};
use rust_decimal::Decimal;
use sea_orm::{ActiveValue::Set, DbErr};

use crate::entities::{
    accounting_periods, accounts, balance_snapshots, bank_accounts, closure_records, commissions,
    fiscal_years, ledger_entries, postings, source_documents, treasury_movements,
};

pub(crate) fn db_err(err: DbErr) -> StoreError {
    StoreError::Backend(err.to_string())
}

fn parse<T>(value: &str, what: &str, f: impl FnOnce(&str) -> Option<T>) -> Result<T, StoreError> {
    f(value).ok_or_else(|| StoreError::Backend(format!("unknown {what} '{value}'")))
}

fn utc(ts: DateTime<FixedOffset>) -> DateTime<Utc> {
    ts.with_timezone(&Utc)
}

fn tz(ts: DateTime<Utc>) -> DateTime<FixedOffset> {
    ts.fixed_offset()
}

fn to_i64(value: u64) -> Result<i64, StoreError> {
    i64::try_from(value).map_err(|_| StoreError::Backend(format!("count {value} out of range")))
}

pub(crate) fn to_i32(value: u32) -> Result<i32, StoreError> {
    i32::try_from(value).map_err(|_| StoreError::Backend(format!("number {value} out of range")))
}

fn totals(
    debits: Option<Decimal>,
    credits: Option<Decimal>,
    count: Option<i64>,
) -> Result<Option<PeriodTotals>, StoreError> {
    match (debits, credits, count) {
        (Some(total_debits), Some(total_credits), Some(count)) => Ok(Some(PeriodTotals {
            total_debits,
            total_credits,
            entry_count: u64::try_from(count)
                .map_err(|_| StoreError::Backend(format!("negative entry count {count}")))?,
        })),
        _ => Ok(None),
    }
}

/// Totals split into their three nullable columns.
pub(crate) type TotalColumns = (Option<Decimal>, Option<Decimal>, Option<i64>);

pub(crate) fn total_columns(totals: Option<PeriodTotals>) -> Result<TotalColumns, StoreError> {
    match totals {
        Some(t) => Ok((
            Some(t.total_debits),
            Some(t.total_credits),
            Some(to_i64(t.entry_count)?),
        )),
        None => Ok((None, None, None)),
    }
}

// ========== Ledger ==========

pub(crate) fn account(m: accounts::Model) -> Result<Account, StoreError> {
    Ok(Account {
        id: AccountId::from_uuid(m.id),
        company_id: CompanyId::from_uuid(m.company_id),
        account_type: parse(&m.account_type, "account type", AccountType::parse)?,
        code: m.code,
        name: m.name,
        parent_id: m.parent_id.map(AccountId::from_uuid),
        is_active: m.is_active,
        is_leaf: m.is_leaf,
    })
}

pub(crate) fn posting(m: postings::Model) -> Posting {
    Posting {
        id: PostingId::from_uuid(m.id),
        entry_id: LedgerEntryId::from_uuid(m.entry_id),
        account_id: AccountId::from_uuid(m.account_id),
        debit: m.debit,
        credit: m.credit,
        counterparty: m.counterparty,
        cost_center: m.cost_center,
    }
}

pub(crate) fn posting_model(p: &Posting, line_number: usize) -> Result<postings::ActiveModel, StoreError> {
    let line = i32::try_from(line_number)
        .map_err(|_| StoreError::Backend(format!("line {line_number} out of range")))?;
    Ok(postings::ActiveModel {
        id: Set(p.id.into_inner()),
        entry_id: Set(p.entry_id.into_inner()),
        line_number: Set(line),
        account_id: Set(p.account_id.into_inner()),
        debit: Set(p.debit),
        credit: Set(p.credit),
        counterparty: Set(p.counterparty.clone()),
        cost_center: Set(p.cost_center.clone()),
    })
}

pub(crate) fn entry(m: ledger_entries::Model, postings: Vec<Posting>) -> Result<LedgerEntry, StoreError> {
    Ok(LedgerEntry {
        id: LedgerEntryId::from_uuid(m.id),
        company_id: CompanyId::from_uuid(m.company_id),
        period_id: PeriodId::from_uuid(m.period_id),
        state: parse(&m.state, "entry state", EntryState::parse)?,
        prefix: m.prefix,
        sequence: m.sequence,
        date: m.date,
        description: m.description,
        reference: m.reference,
        postings,
        version: m.version,
        created_by: ActorId::from_uuid(m.created_by),
        created_at: utc(m.created_at),
        updated_at: utc(m.updated_at),
        confirmed_by: m.confirmed_by.map(ActorId::from_uuid),
        confirmed_at: m.confirmed_at.map(utc),
        voided_by: m.voided_by.map(ActorId::from_uuid),
        voided_at: m.voided_at.map(utc),
    })
}

pub(crate) fn entry_model(e: &LedgerEntry) -> ledger_entries::ActiveModel {
    ledger_entries::ActiveModel {
        id: Set(e.id.into_inner()),
        company_id: Set(e.company_id.into_inner()),
        period_id: Set(e.period_id.into_inner()),
        prefix: Set(e.prefix.clone()),
        sequence: Set(e.sequence),
        date: Set(e.date),
        description: Set(e.description.clone()),
        reference: Set(e.reference.clone()),
        state: Set(e.state.as_str().to_string()),
        version: Set(e.version),
        created_by: Set(e.created_by.into_inner()),
        created_at: Set(tz(e.created_at)),
        updated_at: Set(tz(e.updated_at)),
        confirmed_by: Set(e.confirmed_by.map(ActorId::into_inner)),
        confirmed_at: Set(e.confirmed_at.map(tz)),
        voided_by: Set(e.voided_by.map(ActorId::into_inner)),
        voided_at: Set(e.voided_at.map(tz)),
    }
}

// ========== Fiscal calendar ==========

fn stamp(
    closed_at: Option<DateTime<FixedOffset>>,
    closed_by: Option<uuid::Uuid>,
    reopened_at: Option<DateTime<FixedOffset>>,
    reopened_by: Option<uuid::Uuid>,
    reopen_reason: Option<String>,
) -> LifecycleStamp {
    LifecycleStamp {
        closed_at: closed_at.map(utc),
        closed_by: closed_by.map(ActorId::from_uuid),
        reopened_at: reopened_at.map(utc),
        reopened_by: reopened_by.map(ActorId::from_uuid),
        reopen_reason,
    }
}

pub(crate) fn fiscal_year(m: fiscal_years::Model) -> Result<FiscalYear, StoreError> {
    Ok(FiscalYear {
        id: FiscalYearId::from_uuid(m.id),
        company_id: CompanyId::from_uuid(m.company_id),
        year: m.year,
        state: parse(&m.state, "fiscal year state", PeriodState::parse)?,
        totals: totals(m.total_debits, m.total_credits, m.entry_count)?,
        stamp: stamp(m.closed_at, m.closed_by, m.reopened_at, m.reopened_by, m.reopen_reason),
        name: m.name,
        start_date: m.start_date,
        end_date: m.end_date,
        version: m.version,
    })
}

pub(crate) fn fiscal_year_model(y: &FiscalYear) -> Result<fiscal_years::ActiveModel, StoreError> {
    let (total_debits, total_credits, entry_count) = total_columns(y.totals)?;
    Ok(fiscal_years::ActiveModel {
        id: Set(y.id.into_inner()),
        company_id: Set(y.company_id.into_inner()),
        year: Set(y.year),
        name: Set(y.name.clone()),
        start_date: Set(y.start_date),
        end_date: Set(y.end_date),
        state: Set(y.state.as_str().to_string()),
        total_debits: Set(total_debits),
        total_credits: Set(total_credits),
        entry_count: Set(entry_count),
        closed_at: Set(y.stamp.closed_at.map(tz)),
        closed_by: Set(y.stamp.closed_by.map(ActorId::into_inner)),
        reopened_at: Set(y.stamp.reopened_at.map(tz)),
        reopened_by: Set(y.stamp.reopened_by.map(ActorId::into_inner)),
        reopen_reason: Set(y.stamp.reopen_reason.clone()),
        version: Set(y.version),
    })
}

pub(crate) fn period(m: accounting_periods::Model) -> Result<AccountingPeriod, StoreError> {
    Ok(AccountingPeriod {
        id: PeriodId::from_uuid(m.id),
        fiscal_year_id: FiscalYearId::from_uuid(m.fiscal_year_id),
        company_id: CompanyId::from_uuid(m.company_id),
        number: u32::try_from(m.number)
            .map_err(|_| StoreError::Backend(format!("invalid period number {}", m.number)))?,
        state: parse(&m.state, "period state", PeriodState::parse)?,
        allows_entries: m.allows_entries,
        totals: totals(m.total_debits, m.total_credits, m.entry_count)?,
        stamp: stamp(m.closed_at, m.closed_by, m.reopened_at, m.reopened_by, m.reopen_reason),
        name: m.name,
        start_date: m.start_date,
        end_date: m.end_date,
        version: m.version,
    })
}

pub(crate) fn period_model(p: &AccountingPeriod) -> Result<accounting_periods::ActiveModel, StoreError> {
    let (total_debits, total_credits, entry_count) = total_columns(p.totals)?;
    Ok(accounting_periods::ActiveModel {
        id: Set(p.id.into_inner()),
        fiscal_year_id: Set(p.fiscal_year_id.into_inner()),
        company_id: Set(p.company_id.into_inner()),
        number: Set(to_i32(p.number)?),
        name: Set(p.name.clone()),
        start_date: Set(p.start_date),
        end_date: Set(p.end_date),
        state: Set(p.state.as_str().to_string()),
        allows_entries: Set(p.allows_entries),
        total_debits: Set(total_debits),
        total_credits: Set(total_credits),
        entry_count: Set(entry_count),
        closed_at: Set(p.stamp.closed_at.map(tz)),
        closed_by: Set(p.stamp.closed_by.map(ActorId::into_inner)),
        reopened_at: Set(p.stamp.reopened_at.map(tz)),
        reopened_by: Set(p.stamp.reopened_by.map(ActorId::into_inner)),
        reopen_reason: Set(p.stamp.reopen_reason.clone()),
        version: Set(p.version),
    })
}

// ========== Audit ==========

pub(crate) fn closure_record(m: closure_records::Model) -> Result<ClosureRecord, StoreError> {
    Ok(ClosureRecord {
        id: ClosureRecordId::from_uuid(m.id),
        company_id: CompanyId::from_uuid(m.company_id),
        scope: parse(&m.scope, "closure scope", ClosureScope::parse)?,
        target_id: m.target_id,
        action: parse(&m.action, "closure action", ClosureAction::parse)?,
        actor: ActorId::from_uuid(m.actor),
        at: utc(m.at),
        reason: m.reason,
        notes: m.notes,
        prior_state: parse(&m.prior_state, "period state", PeriodState::parse)?,
        new_state: parse(&m.new_state, "period state", PeriodState::parse)?,
        totals: totals(m.total_debits, m.total_credits, m.entry_count)?,
    })
}

pub(crate) fn closure_record_model(r: &ClosureRecord) -> Result<closure_records::ActiveModel, StoreError> {
    let (total_debits, total_credits, entry_count) = total_columns(r.totals)?;
    Ok(closure_records::ActiveModel {
        id: Set(r.id.into_inner()),
        company_id: Set(r.company_id.into_inner()),
        scope: Set(r.scope.as_str().to_string()),
        target_id: Set(r.target_id),
        action: Set(r.action.as_str().to_string()),
        actor: Set(r.actor.into_inner()),
        at: Set(tz(r.at)),
        reason: Set(r.reason.clone()),
        notes: Set(r.notes.clone()),
        prior_state: Set(r.prior_state.as_str().to_string()),
        new_state: Set(r.new_state.as_str().to_string()),
        total_debits: Set(total_debits),
        total_credits: Set(total_credits),
        entry_count: Set(entry_count),
    })
}

pub(crate) fn snapshot(m: balance_snapshots::Model) -> BalanceSnapshot {
    BalanceSnapshot {
        id: SnapshotId::from_uuid(m.id),
        period_id: PeriodId::from_uuid(m.period_id),
        closure_record_id: ClosureRecordId::from_uuid(m.closure_record_id),
        bank_account_id: BankAccountId::from_uuid(m.bank_account_id),
        computed_balance: m.computed_balance,
        recorded_balance: m.recorded_balance,
        difference: m.difference,
        captured_at: utc(m.captured_at),
    }
}

pub(crate) fn snapshot_model(s: &BalanceSnapshot) -> balance_snapshots::ActiveModel {
    balance_snapshots::ActiveModel {
        id: Set(s.id.into_inner()),
        period_id: Set(s.period_id.into_inner()),
        closure_record_id: Set(s.closure_record_id.into_inner()),
        bank_account_id: Set(s.bank_account_id.into_inner()),
        computed_balance: Set(s.computed_balance),
        recorded_balance: Set(s.recorded_balance),
        difference: Set(s.difference),
        captured_at: Set(tz(s.captured_at)),
    }
}

// ========== Collaborators ==========

pub(crate) fn document_status(m: source_documents::Model) -> Result<DocumentPostingStatus, StoreError> {
    let error = m.posting_error;
    Ok(DocumentPostingStatus {
        kind: parse(&m.kind, "document kind", DocumentKind::parse)?,
        id: DocumentId::from_uuid(m.id),
        number: m.number,
        status: parse(&m.posting_status, "posting status", |s| PostingStatus::parse(s, error))?,
    })
}

pub(crate) fn commission(m: commissions::Model) -> Result<CommissionRecord, StoreError> {
    Ok(CommissionRecord {
        id: CommissionId::from_uuid(m.id),
        company_id: CompanyId::from_uuid(m.company_id),
        billing: parse(&m.billing, "billing state", BillingState::parse)?,
        partner: m.partner,
        date: m.date,
        amount: m.amount,
        paid: m.paid,
        approved_payable: m.approved_payable,
        invoice_entry_id: m.invoice_entry_id.map(LedgerEntryId::from_uuid),
        hidden_by_period: m.hidden_by_period.map(PeriodId::from_uuid),
    })
}

pub(crate) fn bank_account(m: bank_accounts::Model) -> BankAccount {
    BankAccount {
        id: BankAccountId::from_uuid(m.id),
        company_id: CompanyId::from_uuid(m.company_id),
        name: m.name,
        ledger_account_id: AccountId::from_uuid(m.ledger_account_id),
        opening_balance: m.opening_balance,
        recorded_balance: m.recorded_balance,
        is_active: m.is_active,
    }
}

pub(crate) fn movement(m: treasury_movements::Model) -> TreasuryMovement {
    TreasuryMovement {
        id: MovementId::from_uuid(m.id),
        bank_account_id: BankAccountId::from_uuid(m.bank_account_id),
        date: m.date,
        amount: m.amount,
        description: m.description,
        linked_entry_id: m.linked_entry_id.map(LedgerEntryId::from_uuid),
    }
}
