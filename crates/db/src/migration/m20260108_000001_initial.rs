//! Initial database migration.
//!
//! Creates the ledger enums, the `accounts`, `transactions` and
//! `journal_entries` tables, the integrity triggers and the
//! `account_balances` view.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        let db = manager.get_connection();

        // ============================================================
        // PART 1: ENUMS
        // ============================================================
        db.execute_unprepared(ENUMS_SQL).await?;

        // ============================================================
        // PART 2: CHART OF ACCOUNTS
        // ============================================================
        db.execute_unprepared(ACCOUNTS_SQL).await?;

        // ============================================================
        // PART 3: TRANSACTIONS & JOURNAL ENTRIES
        // ============================================================
        db.execute_unprepared(TRANSACTIONS_SQL).await?;
        db.execute_unprepared(JOURNAL_ENTRIES_SQL).await?;

        // ============================================================
        // PART 4: TRIGGERS & FUNCTIONS
        // ============================================================
        db.execute_unprepared(TRIGGERS_SQL).await?;

        // ============================================================
        // PART 5: VIEWS
        // ============================================================
        db.execute_unprepared(VIEWS_SQL).await?;

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

const ENUMS_SQL: &str = r"
CREATE TYPE account_type AS ENUM (
    'asset',
    'liability',
    'equity',
    'revenue',
    'expense'
);

CREATE TYPE transaction_status AS ENUM (
    'draft',
    'posted',
    'reversed'
);
";

const ACCOUNTS_SQL: &str = r"
CREATE TABLE accounts (
    id UUID PRIMARY KEY,
    code VARCHAR(20) NOT NULL,
    name VARCHAR(255) NOT NULL,
    account_type account_type NOT NULL,
    parent_id UUID REFERENCES accounts(id),
    is_active BOOLEAN NOT NULL DEFAULT true,
    created_at TIMESTAMPTZ NOT NULL DEFAULT now(),
    updated_at TIMESTAMPTZ NOT NULL DEFAULT now(),
    CONSTRAINT uq_accounts_code UNIQUE (code),
    CONSTRAINT chk_accounts_not_own_parent CHECK (parent_id IS NULL OR parent_id <> id)
);

CREATE INDEX idx_accounts_parent ON accounts(parent_id) WHERE parent_id IS NOT NULL;
CREATE INDEX idx_accounts_type ON accounts(account_type);
";

const TRANSACTIONS_SQL: &str = r"
CREATE TABLE transactions (
    id UUID PRIMARY KEY,
    transaction_date DATE NOT NULL,
    description TEXT NOT NULL,
    reference VARCHAR(100),
    status transaction_status NOT NULL DEFAULT 'draft',
    created_by UUID NOT NULL,
    reverses_transaction_id UUID REFERENCES transactions(id),
    reversed_by_transaction_id UUID REFERENCES transactions(id),
    created_at TIMESTAMPTZ NOT NULL DEFAULT now(),
    updated_at TIMESTAMPTZ NOT NULL DEFAULT now(),
    posted_at TIMESTAMPTZ,
    reversed_at TIMESTAMPTZ,
    CONSTRAINT uq_transactions_reference UNIQUE (reference),
    CONSTRAINT chk_transactions_description CHECK (length(trim(description)) > 0),
    CONSTRAINT chk_transactions_posted_at CHECK (status = 'draft' OR posted_at IS NOT NULL),
    CONSTRAINT chk_transactions_reversed CHECK (
        (status = 'reversed') = (reversed_by_transaction_id IS NOT NULL)
    )
);

CREATE INDEX idx_transactions_date ON transactions(transaction_date DESC, created_at DESC);
CREATE INDEX idx_transactions_status ON transactions(status);
CREATE UNIQUE INDEX idx_transactions_reverses ON transactions(reverses_transaction_id)
    WHERE reverses_transaction_id IS NOT NULL;
";

const JOURNAL_ENTRIES_SQL: &str = r"
CREATE TABLE journal_entries (
    id UUID PRIMARY KEY,
    transaction_id UUID NOT NULL REFERENCES transactions(id) ON DELETE CASCADE,
    account_id UUID NOT NULL REFERENCES accounts(id),
    line_number INTEGER NOT NULL,
    debit_amount BIGINT NOT NULL DEFAULT 0,
    credit_amount BIGINT NOT NULL DEFAULT 0,
    description TEXT,
    CONSTRAINT uq_journal_entries_line UNIQUE (transaction_id, line_number),
    CONSTRAINT chk_journal_entries_one_sided CHECK (
        (debit_amount > 0 AND credit_amount = 0) OR
        (debit_amount = 0 AND credit_amount > 0)
    )
);

CREATE INDEX idx_journal_entries_account ON journal_entries(account_id);
CREATE INDEX idx_journal_entries_transaction ON journal_entries(transaction_id);
";

const TRIGGERS_SQL: &str = r"
-- ============================================================
-- FUNCTION: check_transaction_balance
-- Ensures debit = credit for every non-draft transaction at commit
-- ============================================================
CREATE OR REPLACE FUNCTION check_transaction_balance()
RETURNS TRIGGER AS $$
DECLARE
    txn_id UUID;
    txn_status transaction_status;
    entry_count BIGINT;
    total_debit NUMERIC;
    total_credit NUMERIC;
BEGIN
    IF TG_TABLE_NAME = 'transactions' THEN
        txn_id := NEW.id;
    ELSE
        txn_id := NEW.transaction_id;
    END IF;

    SELECT status INTO txn_status
    FROM transactions
    WHERE id = txn_id;

    IF txn_status IS NOT NULL AND txn_status <> 'draft' THEN
        SELECT
            COUNT(*),
            COALESCE(SUM(debit_amount), 0),
            COALESCE(SUM(credit_amount), 0)
        INTO entry_count, total_debit, total_credit
        FROM journal_entries
        WHERE transaction_id = txn_id;

        IF entry_count < 2 THEN
            RAISE EXCEPTION 'Transaction % must have at least 2 entries, got %',
                txn_id, entry_count;
        END IF;

        IF total_debit <> total_credit THEN
            RAISE EXCEPTION 'Transaction is not balanced. Debit: %, Credit: %, Difference: %',
                total_debit, total_credit, total_debit - total_credit;
        END IF;
    END IF;

    RETURN NULL;
END;
$$ LANGUAGE plpgsql;

CREATE CONSTRAINT TRIGGER trg_check_balance_entries
AFTER INSERT OR UPDATE ON journal_entries
DEFERRABLE INITIALLY DEFERRED
FOR EACH ROW
EXECUTE FUNCTION check_transaction_balance();

CREATE CONSTRAINT TRIGGER trg_check_balance_transactions
AFTER INSERT OR UPDATE OF status ON transactions
DEFERRABLE INITIALLY DEFERRED
FOR EACH ROW
EXECUTE FUNCTION check_transaction_balance();

-- ============================================================
-- FUNCTION: prevent_posted_modification
-- Posted and reversed transactions only change via posted -> reversed
-- ============================================================
CREATE OR REPLACE FUNCTION prevent_posted_modification()
RETURNS TRIGGER AS $$
BEGIN
    IF OLD.status = 'reversed' THEN
        RAISE EXCEPTION 'Cannot modify reversed transaction %', OLD.id;
    END IF;

    IF OLD.status = 'posted' AND (
        NEW.status <> 'reversed'
        OR NEW.transaction_date IS DISTINCT FROM OLD.transaction_date
        OR NEW.description IS DISTINCT FROM OLD.description
        OR NEW.reference IS DISTINCT FROM OLD.reference
    ) THEN
        RAISE EXCEPTION 'Cannot modify posted transaction %. Reverse it instead.', OLD.id;
    END IF;

    RETURN NEW;
END;
$$ LANGUAGE plpgsql;

CREATE TRIGGER trg_prevent_posted_mod
BEFORE UPDATE ON transactions
FOR EACH ROW
WHEN (OLD.status <> 'draft')
EXECUTE FUNCTION prevent_posted_modification();

-- ============================================================
-- FUNCTION: prevent_posted_entry_modification
-- Entries of non-draft transactions are frozen
-- ============================================================
CREATE OR REPLACE FUNCTION prevent_posted_entry_modification()
RETURNS TRIGGER AS $$
DECLARE
    txn_status transaction_status;
BEGIN
    SELECT status INTO txn_status
    FROM transactions
    WHERE id = OLD.transaction_id;

    IF txn_status IS NOT NULL AND txn_status <> 'draft' THEN
        RAISE EXCEPTION 'Cannot modify entries of % transaction %', txn_status, OLD.transaction_id;
    END IF;

    IF TG_OP = 'DELETE' THEN
        RETURN OLD;
    END IF;
    RETURN NEW;
END;
$$ LANGUAGE plpgsql;

CREATE TRIGGER trg_prevent_posted_entry_mod
BEFORE UPDATE OR DELETE ON journal_entries
FOR EACH ROW
EXECUTE FUNCTION prevent_posted_entry_modification();

-- ============================================================
-- FUNCTION: update_updated_at
-- ============================================================
CREATE OR REPLACE FUNCTION update_updated_at()
RETURNS TRIGGER AS $$
BEGIN
    NEW.updated_at := GREATEST(NEW.updated_at, now());
    RETURN NEW;
END;
$$ LANGUAGE plpgsql;

CREATE TRIGGER trg_accounts_updated_at
BEFORE UPDATE ON accounts
FOR EACH ROW
EXECUTE FUNCTION update_updated_at();
";

const VIEWS_SQL: &str = r"
-- ============================================================
-- VIEW: account_balances
-- Natural-sign balance per account over posted and reversed transactions.
-- A reversal is itself posted, so each reversed pair nets to zero.
-- ============================================================
CREATE VIEW account_balances AS
SELECT
    a.id AS account_id,
    a.code,
    a.name,
    a.account_type,
    a.is_active,
    COALESCE(SUM(je.debit_amount), 0)::BIGINT AS debit_total,
    COALESCE(SUM(je.credit_amount), 0)::BIGINT AS credit_total,
    (CASE
        WHEN a.account_type IN ('asset', 'expense')
            THEN COALESCE(SUM(je.debit_amount), 0) - COALESCE(SUM(je.credit_amount), 0)
        ELSE COALESCE(SUM(je.credit_amount), 0) - COALESCE(SUM(je.debit_amount), 0)
    END)::BIGINT AS balance
FROM accounts a
LEFT JOIN journal_entries je ON je.account_id = a.id
    AND EXISTS (
        SELECT 1 FROM transactions t
        WHERE t.id = je.transaction_id
          AND t.status IN ('posted', 'reversed')
    )
GROUP BY a.id, a.code, a.name, a.account_type, a.is_active;
";

const DROP_ALL_SQL: &str = r"
-- ============================================================
-- DROP ALL: Rollback migration
-- ============================================================
DROP VIEW IF EXISTS account_balances CASCADE;

DROP TRIGGER IF EXISTS trg_accounts_updated_at ON accounts;
DROP TRIGGER IF EXISTS trg_prevent_posted_entry_mod ON journal_entries;
DROP TRIGGER IF EXISTS trg_prevent_posted_mod ON transactions;
DROP TRIGGER IF EXISTS trg_check_balance_transactions ON transactions;
DROP TRIGGER IF EXISTS trg_check_balance_entries ON journal_entries;

DROP FUNCTION IF EXISTS update_updated_at() CASCADE;
DROP FUNCTION IF EXISTS prevent_posted_entry_modification() CASCADE;
DROP FUNCTION IF EXISTS prevent_posted_modification() CASCADE;
DROP FUNCTION IF EXISTS check_transaction_balance() CASCADE;

DROP TABLE IF EXISTS journal_entries CASCADE;
DROP TABLE IF EXISTS transactions CASCADE;
DROP TABLE IF EXISTS accounts CASCADE;

DROP TYPE IF EXISTS transaction_status;
DROP TYPE IF EXISTS account_type;
";
