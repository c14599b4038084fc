//! Initial database migration.
//!
//! Creates the ledger, fiscal calendar, closing audit, and collaborator
//! tables. States are stored as text and constrained with CHECKs.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        let db = manager.get_connection();

        // ============================================================
        // PART 1: CHART OF ACCOUNTS
        // ============================================================
        db.execute_unprepared(ACCOUNTS_SQL).await?;

        // ============================================================
        // PART 2: FISCAL CALENDAR
        // ============================================================
        db.execute_unprepared(FISCAL_YEARS_SQL).await?;
        db.execute_unprepared(ACCOUNTING_PERIODS_SQL).await?;

        // ============================================================
        // PART 3: LEDGER
        // ============================================================
        db.execute_unprepared(ENTRY_SEQUENCES_SQL).await?;
        db.execute_unprepared(LEDGER_ENTRIES_SQL).await?;
        db.execute_unprepared(POSTINGS_SQL).await?;

        // ============================================================
        // PART 4: CLOSING AUDIT (append-only)
        // ============================================================
        db.execute_unprepared(CLOSURE_RECORDS_SQL).await?;
        db.execute_unprepared(BALANCE_SNAPSHOTS_SQL).await?;
        db.execute_unprepared(APPEND_ONLY_SQL).await?;

        // ============================================================
        // PART 5: COLLABORATOR TABLES
        // ============================================================
        db.execute_unprepared(SOURCE_DOCUMENTS_SQL).await?;
        db.execute_unprepared(COMMISSIONS_SQL).await?;
        db.execute_unprepared(BANK_ACCOUNTS_SQL).await?;
        db.execute_unprepared(TREASURY_MOVEMENTS_SQL).await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        let db = manager.get_connection();
        db.execute_unprepared(DROP_ALL_SQL).await?;
        Ok(())
    }
}

// ============================================================
// SQL CONSTANTS
// ============================================================

const ACCOUNTS_SQL: &str = r"
CREATE TABLE accounts (
    id              UUID PRIMARY KEY,
    company_id      UUID NOT NULL,
    code            VARCHAR(50) NOT NULL,
    name            VARCHAR(255) NOT NULL,
    account_type    VARCHAR(20) NOT NULL
        CHECK (account_type IN ('asset', 'liability', 'equity', 'income', 'expense')),
    parent_id       UUID REFERENCES accounts(id),
    is_active       BOOLEAN NOT NULL DEFAULT TRUE,
    is_leaf         BOOLEAN NOT NULL DEFAULT TRUE,
    created_at      TIMESTAMPTZ NOT NULL DEFAULT NOW(),
    UNIQUE (company_id, code)
);
";

const FISCAL_YEARS_SQL: &str = r"
CREATE TABLE fiscal_years (
    id              UUID PRIMARY KEY,
    company_id      UUID NOT NULL,
    year            INTEGER NOT NULL,
    name            VARCHAR(100) NOT NULL,
    start_date      DATE NOT NULL,
    end_date        DATE NOT NULL,
    state           VARCHAR(20) NOT NULL DEFAULT 'open'
        CHECK (state IN ('open', 'closed', 'closed_final')),
    total_debits    NUMERIC(19, 4),
    total_credits   NUMERIC(19, 4),
    entry_count     BIGINT,
    closed_at       TIMESTAMPTZ,
    closed_by       UUID,
    reopened_at     TIMESTAMPTZ,
    reopened_by     UUID,
    reopen_reason   TEXT,
    version         BIGINT NOT NULL DEFAULT 1,
    CHECK (start_date <= end_date)
);

CREATE INDEX idx_fiscal_years_company ON fiscal_years(company_id, start_date);
";

const ACCOUNTING_PERIODS_SQL: &str = r"
CREATE TABLE accounting_periods (
    id              UUID PRIMARY KEY,
    fiscal_year_id  UUID NOT NULL REFERENCES fiscal_years(id),
    company_id      UUID NOT NULL,
    number          INTEGER NOT NULL,
    name            VARCHAR(100) NOT NULL,
    start_date      DATE NOT NULL,
    end_date        DATE NOT NULL,
    state           VARCHAR(20) NOT NULL DEFAULT 'open'
        CHECK (state IN ('open', 'closed', 'closed_final')),
    allows_entries  BOOLEAN NOT NULL DEFAULT TRUE,
    total_debits    NUMERIC(19, 4),
    total_credits   NUMERIC(19, 4),
    entry_count     BIGINT,
    closed_at       TIMESTAMPTZ,
    closed_by       UUID,
    reopened_at     TIMESTAMPTZ,
    reopened_by     UUID,
    reopen_reason   TEXT,
    version         BIGINT NOT NULL DEFAULT 1,
    UNIQUE (fiscal_year_id, number),
    CHECK (start_date <= end_date),
    CHECK (allows_entries = (state = 'open'))
);

CREATE INDEX idx_periods_company_dates ON accounting_periods(company_id, start_date, end_date);
";

const ENTRY_SEQUENCES_SQL: &str = r"
CREATE TABLE entry_sequences (
    company_id      UUID NOT NULL,
    prefix          VARCHAR(20) NOT NULL,
    last_value      BIGINT NOT NULL,
    PRIMARY KEY (company_id, prefix)
);
";

const LEDGER_ENTRIES_SQL: &str = r"
CREATE TABLE ledger_entries (
    id              UUID PRIMARY KEY,
    company_id      UUID NOT NULL,
    period_id       UUID NOT NULL REFERENCES accounting_periods(id),
    prefix          VARCHAR(20) NOT NULL,
    sequence        BIGINT NOT NULL,
    date            DATE NOT NULL,
    description     TEXT NOT NULL,
    reference       VARCHAR(100),
    state           VARCHAR(20) NOT NULL DEFAULT 'draft'
        CHECK (state IN ('draft', 'confirmed', 'voided')),
    version         BIGINT NOT NULL DEFAULT 1,
    created_by      UUID NOT NULL,
    created_at      TIMESTAMPTZ NOT NULL DEFAULT NOW(),
    updated_at      TIMESTAMPTZ NOT NULL DEFAULT NOW(),
    confirmed_by    UUID,
    confirmed_at    TIMESTAMPTZ,
    voided_by       UUID,
    voided_at       TIMESTAMPTZ,
    UNIQUE (company_id, prefix, sequence)
);

CREATE INDEX idx_entries_company_date ON ledger_entries(company_id, date);
CREATE INDEX idx_entries_period ON ledger_entries(period_id);
";

const POSTINGS_SQL: &str = r"
CREATE TABLE postings (
    id              UUID PRIMARY KEY,
    entry_id        UUID NOT NULL REFERENCES ledger_entries(id) ON DELETE CASCADE,
    line_number     INTEGER NOT NULL,
    account_id      UUID NOT NULL REFERENCES accounts(id),
    debit           NUMERIC(19, 4) NOT NULL DEFAULT 0 CHECK (debit >= 0),
    credit          NUMERIC(19, 4) NOT NULL DEFAULT 0 CHECK (credit >= 0),
    counterparty    VARCHAR(255),
    cost_center     VARCHAR(100),
    CHECK ((debit > 0 AND credit = 0) OR (credit > 0 AND debit = 0)),
    UNIQUE (entry_id, line_number)
);

CREATE INDEX idx_postings_account ON postings(account_id);
";

const CLOSURE_RECORDS_SQL: &str = r"
CREATE TABLE closure_records (
    id              UUID PRIMARY KEY,
    company_id      UUID NOT NULL,
    scope           VARCHAR(20) NOT NULL CHECK (scope IN ('period', 'fiscal_year')),
    target_id       UUID NOT NULL,
    action          VARCHAR(20) NOT NULL CHECK (action IN ('close', 'reopen', 'finalize')),
    actor           UUID NOT NULL,
    at              TIMESTAMPTZ NOT NULL,
    reason          TEXT,
    notes           TEXT,
    prior_state     VARCHAR(20) NOT NULL,
    new_state       VARCHAR(20) NOT NULL,
    total_debits    NUMERIC(19, 4),
    total_credits   NUMERIC(19, 4),
    entry_count     BIGINT,
    CHECK (action <> 'reopen' OR length(trim(reason)) > 0)
);

CREATE INDEX idx_closure_records_target ON closure_records(company_id, target_id, at);
";

const BALANCE_SNAPSHOTS_SQL: &str = r"
CREATE TABLE balance_snapshots (
    id                  UUID PRIMARY KEY,
    period_id           UUID NOT NULL REFERENCES accounting_periods(id),
    closure_record_id   UUID NOT NULL REFERENCES closure_records(id),
    bank_account_id     UUID NOT NULL,
    computed_balance    NUMERIC(19, 4) NOT NULL,
    recorded_balance    NUMERIC(19, 4) NOT NULL,
    difference          NUMERIC(19, 4) NOT NULL,
    captured_at         TIMESTAMPTZ NOT NULL
);

CREATE INDEX idx_snapshots_period ON balance_snapshots(period_id);
";

const APPEND_ONLY_SQL: &str = r"
CREATE OR REPLACE FUNCTION reject_audit_mutation() RETURNS TRIGGER AS $$
BEGIN
    RAISE EXCEPTION '% is append-only', TG_TABLE_NAME;
END;
$$ LANGUAGE plpgsql;

CREATE TRIGGER closure_records_append_only
    BEFORE UPDATE OR DELETE ON closure_records
    FOR EACH ROW EXECUTE FUNCTION reject_audit_mutation();

CREATE TRIGGER balance_snapshots_append_only
    BEFORE UPDATE OR DELETE ON balance_snapshots
    FOR EACH ROW EXECUTE FUNCTION reject_audit_mutation();
";

const SOURCE_DOCUMENTS_SQL: &str = r"
CREATE TABLE source_documents (
    id                  UUID PRIMARY KEY,
    company_id          UUID NOT NULL,
    kind                VARCHAR(30) NOT NULL
        CHECK (kind IN ('sales_invoice', 'purchase_invoice', 'commission_invoice')),
    number              VARCHAR(50) NOT NULL,
    issue_date          DATE NOT NULL,
    total               NUMERIC(19, 4) NOT NULL,
    posting_status      VARCHAR(20) NOT NULL DEFAULT 'unposted'
        CHECK (posting_status IN ('unposted', 'posted', 'posting_failed')),
    posting_error       TEXT,
    entry_id            UUID REFERENCES ledger_entries(id),
    hidden_by_period    UUID REFERENCES accounting_periods(id)
);

CREATE INDEX idx_documents_company_date ON source_documents(company_id, issue_date);
";

const COMMISSIONS_SQL: &str = r"
CREATE TABLE commissions (
    id                  UUID PRIMARY KEY,
    company_id          UUID NOT NULL,
    partner             VARCHAR(255) NOT NULL,
    date                DATE NOT NULL,
    amount              NUMERIC(19, 4) NOT NULL,
    billing             VARCHAR(20) NOT NULL DEFAULT 'pending'
        CHECK (billing IN ('pending', 'billed')),
    paid                BOOLEAN NOT NULL DEFAULT FALSE,
    approved_payable    BOOLEAN NOT NULL DEFAULT FALSE,
    invoice_entry_id    UUID REFERENCES ledger_entries(id),
    hidden_by_period    UUID REFERENCES accounting_periods(id)
);

CREATE INDEX idx_commissions_company_date ON commissions(company_id, date);
";

const BANK_ACCOUNTS_SQL: &str = r"
CREATE TABLE bank_accounts (
    id                  UUID PRIMARY KEY,
    company_id          UUID NOT NULL,
    name                VARCHAR(255) NOT NULL,
    ledger_account_id   UUID NOT NULL,
    opening_balance     NUMERIC(19, 4) NOT NULL DEFAULT 0,
    recorded_balance    NUMERIC(19, 4) NOT NULL DEFAULT 0,
    is_active           BOOLEAN NOT NULL DEFAULT TRUE
);
";

const TREASURY_MOVEMENTS_SQL: &str = r"
CREATE TABLE treasury_movements (
    id                  UUID PRIMARY KEY,
    bank_account_id     UUID NOT NULL REFERENCES bank_accounts(id),
    date                DATE NOT NULL,
    amount              NUMERIC(19, 4) NOT NULL,
    description         TEXT NOT NULL DEFAULT '',
    linked_entry_id     UUID
);

CREATE INDEX idx_movements_account_date ON treasury_movements(bank_account_id, date);
";

const DROP_ALL_SQL: &str = r"
DROP TABLE IF EXISTS treasury_movements CASCADE;
DROP TABLE IF EXISTS bank_accounts CASCADE;
DROP TABLE IF EXISTS commissions CASCADE;
DROP TABLE IF EXISTS source_documents CASCADE;
DROP TABLE IF EXISTS balance_snapshots CASCADE;
DROP TABLE IF EXISTS closure_records CASCADE;
DROP FUNCTION IF EXISTS reject_audit_mutation CASCADE;
DROP TABLE IF EXISTS postings CASCADE;
DROP TABLE IF EXISTS ledger_entries CASCADE;
DROP TABLE IF EXISTS entry_sequences CASCADE;
DROP TABLE IF EXISTS accounting_periods CASCADE;
DROP TABLE IF EXISTS fiscal_years CASCADE;
DROP TABLE IF EXISTS accounts CASCADE;
";
