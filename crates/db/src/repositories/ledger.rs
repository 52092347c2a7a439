//! Postgres implementation of the ledger repository.
//!
//! Multi-row writes run inside a single database transaction. Status changes
//! are conditional updates (or row-locked reads followed by updates) so a
//! concurrent writer can never move a transaction out of a state twice. The
//! deferred `check_transaction_balance` trigger is the last line of defense
//! for the balance invariant at commit.

use std::collections::HashMap;

use async_trait::async_trait;
use buku_core::ledger::{
    Account, BalanceLine, JournalEntry, LedgerError, LedgerRepository, LineFilter, Transaction,
    TransactionFilter, TransactionStatus,
};
use buku_shared::types::{AccountId, Amount, JournalEntryId, TransactionId, UserId};
use chrono::{DateTime, NaiveDate, Utc};
use sea_orm::sea_query::Query;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, DbErr, EntityTrait,
    FromQueryResult, JoinType, PaginatorTrait, QueryFilter, QueryOrder, QuerySelect,
    RelationTrait, Set, SqlErr, TransactionTrait,
};
use tracing::debug;
use uuid::Uuid;

use crate::entities::{
    accounts, journal_entries, sea_orm_active_enums, transactions,
};

// ============================================================================
// Error mapping
// ============================================================================

fn storage(err: DbErr) -> LedgerError {
    LedgerError::Storage(err.to_string())
}

fn is_unique_violation(err: &DbErr) -> bool {
    matches!(err.sql_err(), Some(SqlErr::UniqueConstraintViolation(_)))
}

/// Maps a failed transaction write, surfacing reference collisions.
fn transaction_write_error(err: DbErr, transaction: &Transaction) -> LedgerError {
    match &transaction.reference {
        Some(reference) if is_unique_violation(&err) => {
            LedgerError::DuplicateReference(reference.clone())
        }
        _ => storage(err),
    }
}

// ============================================================================
// Model conversions
// ============================================================================

fn account_from_model(model: accounts::Model) -> Account {
    Account {
        id: AccountId::from_uuid(model.id),
        code: model.code,
        name: model.name,
        account_type: model.account_type.into(),
        parent_id: model.parent_id.map(AccountId::from_uuid),
        is_active: model.is_active,
        created_at: model.created_at.with_timezone(&Utc),
        updated_at: model.updated_at.with_timezone(&Utc),
    }
}

fn entry_from_model(model: journal_entries::Model) -> JournalEntry {
    JournalEntry {
        id: JournalEntryId::from_uuid(model.id),
        transaction_id: TransactionId::from_uuid(model.transaction_id),
        account_id: AccountId::from_uuid(model.account_id),
        debit_amount: Amount::from_minor(model.debit_amount),
        credit_amount: Amount::from_minor(model.credit_amount),
        description: model.description,
    }
}

fn transaction_from_models(
    model: transactions::Model,
    entries: Vec<journal_entries::Model>,
) -> Transaction {
    Transaction {
        id: TransactionId::from_uuid(model.id),
        date: model.transaction_date,
        description: model.description,
        reference: model.reference,
        status: model.status.into(),
        created_by: UserId::from_uuid(model.created_by),
        reverses: model.reverses_transaction_id.map(TransactionId::from_uuid),
        reversed_by: model.reversed_by_transaction_id.map(TransactionId::from_uuid),
        entries: entries.into_iter().map(entry_from_model).collect(),
        created_at: model.created_at.with_timezone(&Utc),
        updated_at: model.updated_at.with_timezone(&Utc),
        posted_at: model.posted_at.map(|at| at.with_timezone(&Utc)),
        reversed_at: model.reversed_at.map(|at| at.with_timezone(&Utc)),
    }
}

fn transaction_active_model(transaction: &Transaction) -> transactions::ActiveModel {
    transactions::ActiveModel {
        id: Set(transaction.id.into_inner()),
        transaction_date: Set(transaction.date),
        description: Set(transaction.description.clone()),
        reference: Set(transaction.reference.clone()),
        status: Set(transaction.status.into()),
        created_by: Set(transaction.created_by.into_inner()),
        reverses_transaction_id: Set(transaction.reverses.map(TransactionId::into_inner)),
        reversed_by_transaction_id: Set(transaction.reversed_by.map(TransactionId::into_inner)),
        created_at: Set(transaction.created_at.into()),
        updated_at: Set(transaction.updated_at.into()),
        posted_at: Set(transaction.posted_at.map(Into::into)),
        reversed_at: Set(transaction.reversed_at.map(Into::into)),
    }
}

fn entry_active_models(transaction: &Transaction) -> Vec<journal_entries::ActiveModel> {
    (1_i32..)
        .zip(&transaction.entries)
        .map(|(line_number, entry)| journal_entries::ActiveModel {
            id: Set(entry.id.into_inner()),
            transaction_id: Set(transaction.id.into_inner()),
            account_id: Set(entry.account_id.into_inner()),
            line_number: Set(line_number),
            debit_amount: Set(entry.debit_amount.minor_units()),
            credit_amount: Set(entry.credit_amount.minor_units()),
            description: Set(entry.description.clone()),
        })
        .collect()
}

/// Row shape for balance queries.
#[derive(Debug, FromQueryResult)]
struct BalanceRow {
    account_id: Uuid,
    transaction_id: Uuid,
    transaction_date: NaiveDate,
    debit_amount: i64,
    credit_amount: i64,
}

// ============================================================================
// Repository
// ============================================================================

/// Ledger repository backed by Postgres through `SeaORM`.
#[derive(Debug, Clone)]
pub struct SeaOrmLedgerRepository {
    db: DatabaseConnection,
}

impl SeaOrmLedgerRepository {
    /// Creates a new ledger repository.
    #[must_use]
    pub const fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    /// Loads the entries of the given headers, preserving header order.
    async fn attach_entries<C: ConnectionTrait>(
        db: &C,
        headers: Vec<transactions::Model>,
    ) -> Result<Vec<Transaction>, LedgerError> {
        if headers.is_empty() {
            return Ok(Vec::new());
        }

        let ids: Vec<Uuid> = headers.iter().map(|h| h.id).collect();
        let entries = journal_entries::Entity::find()
            .filter(journal_entries::Column::TransactionId.is_in(ids))
            .order_by_asc(journal_entries::Column::TransactionId)
            .order_by_asc(journal_entries::Column::LineNumber)
            .all(db)
            .await
            .map_err(storage)?;

        let mut grouped: HashMap<Uuid, Vec<journal_entries::Model>> = HashMap::new();
        for entry in entries {
            grouped.entry(entry.transaction_id).or_default().push(entry);
        }

        Ok(headers
            .into_iter()
            .map(|header| {
                let entries = grouped.remove(&header.id).unwrap_or_default();
                transaction_from_models(header, entries)
            })
            .collect())
    }

    /// Inserts a header and its entries on an open connection or transaction.
    async fn write_transaction<C: ConnectionTrait>(
        db: &C,
        transaction: &Transaction,
    ) -> Result<(), LedgerError> {
        transaction_active_model(transaction)
            .insert(db)
            .await
            .map_err(|err| transaction_write_error(err, transaction))?;

        let entries = entry_active_models(transaction);
        if !entries.is_empty() {
            journal_entries::Entity::insert_many(entries)
                .exec(db)
                .await
                .map_err(storage)?;
        }
        Ok(())
    }

    async fn transaction_exists(&self, id: TransactionId) -> Result<bool, LedgerError> {
        let count = transactions::Entity::find_by_id(id.into_inner())
            .count(&self.db)
            .await
            .map_err(storage)?;
        Ok(count > 0)
    }
}

#[async_trait]
impl LedgerRepository for SeaOrmLedgerRepository {
    async fn insert_account(&self, account: &Account) -> Result<(), LedgerError> {
        let model = accounts::ActiveModel {
            id: Set(account.id.into_inner()),
            code: Set(account.code.clone()),
            name: Set(account.name.clone()),
            account_type: Set(account.account_type.into()),
            parent_id: Set(account.parent_id.map(AccountId::into_inner)),
            is_active: Set(account.is_active),
            created_at: Set(account.created_at.into()),
            updated_at: Set(account.updated_at.into()),
        };

        model.insert(&self.db).await.map_err(|err| {
            if is_unique_violation(&err) {
                LedgerError::DuplicateAccountCode(account.code.clone())
            } else {
                storage(err)
            }
        })?;
        Ok(())
    }

    async fn update_account(&self, account: &Account) -> Result<(), LedgerError> {
        let model = accounts::ActiveModel {
            id: Set(account.id.into_inner()),
            name: Set(account.name.clone()),
            is_active: Set(account.is_active),
            updated_at: Set(account.updated_at.into()),
            ..Default::default()
        };

        match model.update(&self.db).await {
            Ok(_) => Ok(()),
            Err(DbErr::RecordNotUpdated) => Err(LedgerError::AccountNotFound(account.id)),
            Err(err) => Err(storage(err)),
        }
    }

    async fn find_account(&self, id: AccountId) -> Result<Option<Account>, LedgerError> {
        let model = accounts::Entity::find_by_id(id.into_inner())
            .one(&self.db)
            .await
            .map_err(storage)?;
        Ok(model.map(account_from_model))
    }

    async fn find_account_by_code(&self, code: &str) -> Result<Option<Account>, LedgerError> {
        let model = accounts::Entity::find()
            .filter(accounts::Column::Code.eq(code))
            .one(&self.db)
            .await
            .map_err(storage)?;
        Ok(model.map(account_from_model))
    }

    async fn list_accounts(&self, include_inactive: bool) -> Result<Vec<Account>, LedgerError> {
        let mut query = accounts::Entity::find();
        if !include_inactive {
            query = query.filter(accounts::Column::IsActive.eq(true));
        }

        let models = query
            .order_by_asc(accounts::Column::Code)
            .all(&self.db)
            .await
            .map_err(storage)?;
        Ok(models.into_iter().map(account_from_model).collect())
    }

    async fn insert_transaction(&self, transaction: &Transaction) -> Result<(), LedgerError> {
        let txn = self.db.begin().await.map_err(storage)?;
        Self::write_transaction(&txn, transaction).await?;
        txn.commit().await.map_err(storage)?;

        debug!(
            transaction_id = %transaction.id,
            status = %transaction.status,
            entries = transaction.entries.len(),
            "Transaction inserted"
        );
        Ok(())
    }

    async fn replace_draft(&self, transaction: &Transaction) -> Result<bool, LedgerError> {
        let id = transaction.id.into_inner();
        let txn = self.db.begin().await.map_err(storage)?;

        let Some(current) = transactions::Entity::find_by_id(id)
            .lock_exclusive()
            .one(&txn)
            .await
            .map_err(storage)?
        else {
            return Err(LedgerError::TransactionNotFound(transaction.id));
        };
        if current.status != sea_orm_active_enums::TransactionStatus::Draft {
            return Ok(false);
        }

        let mut header: transactions::ActiveModel = current.into();
        header.transaction_date = Set(transaction.date);
        header.description = Set(transaction.description.clone());
        header.reference = Set(transaction.reference.clone());
        header.updated_at = Set(transaction.updated_at.into());
        header
            .update(&txn)
            .await
            .map_err(|err| transaction_write_error(err, transaction))?;

        journal_entries::Entity::delete_many()
            .filter(journal_entries::Column::TransactionId.eq(id))
            .exec(&txn)
            .await
            .map_err(storage)?;
        journal_entries::Entity::insert_many(entry_active_models(transaction))
            .exec(&txn)
            .await
            .map_err(storage)?;

        txn.commit().await.map_err(storage)?;
        Ok(true)
    }

    async fn delete_draft(&self, id: TransactionId) -> Result<bool, LedgerError> {
        let result = transactions::Entity::delete_many()
            .filter(transactions::Column::Id.eq(id.into_inner()))
            .filter(transactions::Column::Status.eq(sea_orm_active_enums::TransactionStatus::Draft))
            .exec(&self.db)
            .await
            .map_err(storage)?;

        if result.rows_affected > 0 {
            return Ok(true);
        }
        if self.transaction_exists(id).await? {
            Ok(false)
        } else {
            Err(LedgerError::TransactionNotFound(id))
        }
    }

    async fn transition_status(
        &self,
        id: TransactionId,
        from: TransactionStatus,
        to: TransactionStatus,
        at: DateTime<Utc>,
    ) -> Result<bool, LedgerError> {
        let mut changes = transactions::ActiveModel {
            status: Set(to.into()),
            updated_at: Set(at.into()),
            ..Default::default()
        };
        match to {
            TransactionStatus::Posted => changes.posted_at = Set(Some(at.into())),
            TransactionStatus::Reversed => changes.reversed_at = Set(Some(at.into())),
            TransactionStatus::Draft => {}
        }

        let result = transactions::Entity::update_many()
            .set(changes)
            .filter(transactions::Column::Id.eq(id.into_inner()))
            .filter(transactions::Column::Status.eq(sea_orm_active_enums::TransactionStatus::from(from)))
            .exec(&self.db)
            .await
            .map_err(storage)?;

        if result.rows_affected > 0 {
            return Ok(true);
        }
        if self.transaction_exists(id).await? {
            Ok(false)
        } else {
            Err(LedgerError::TransactionNotFound(id))
        }
    }

    async fn insert_reversal(
        &self,
        original: TransactionId,
        reversal: &Transaction,
        at: DateTime<Utc>,
    ) -> Result<bool, LedgerError> {
        let txn = self.db.begin().await.map_err(storage)?;

        let Some(current) = transactions::Entity::find_by_id(original.into_inner())
            .lock_exclusive()
            .one(&txn)
            .await
            .map_err(storage)?
        else {
            return Err(LedgerError::TransactionNotFound(original));
        };
        if current.status != sea_orm_active_enums::TransactionStatus::Posted {
            return Ok(false);
        }

        // The reversal row must exist before the original can point at it
        Self::write_transaction(&txn, reversal).await?;

        let mut header: transactions::ActiveModel = current.into();
        header.status = Set(sea_orm_active_enums::TransactionStatus::Reversed);
        header.reversed_by_transaction_id = Set(Some(reversal.id.into_inner()));
        header.reversed_at = Set(Some(at.into()));
        header.updated_at = Set(at.into());
        header.update(&txn).await.map_err(storage)?;

        txn.commit().await.map_err(storage)?;

        debug!(
            transaction_id = %original,
            reversal_id = %reversal.id,
            "Reversal inserted"
        );
        Ok(true)
    }

    async fn find_transaction(
        &self,
        id: TransactionId,
    ) -> Result<Option<Transaction>, LedgerError> {
        let Some(header) = transactions::Entity::find_by_id(id.into_inner())
            .one(&self.db)
            .await
            .map_err(storage)?
        else {
            return Ok(None);
        };
        Ok(Self::attach_entries(&self.db, vec![header]).await?.pop())
    }

    async fn find_transaction_by_reference(
        &self,
        reference: &str,
    ) -> Result<Option<Transaction>, LedgerError> {
        let Some(header) = transactions::Entity::find()
            .filter(transactions::Column::Reference.eq(reference))
            .one(&self.db)
            .await
            .map_err(storage)?
        else {
            return Ok(None);
        };
        Ok(Self::attach_entries(&self.db, vec![header]).await?.pop())
    }

    async fn list_transactions(
        &self,
        filter: &TransactionFilter,
    ) -> Result<Vec<Transaction>, LedgerError> {
        let mut query = transactions::Entity::find();

        if let Some(status) = filter.status {
            query = query.filter(
                transactions::Column::Status.eq(sea_orm_active_enums::TransactionStatus::from(status)),
            );
        }
        if let Some(date_from) = filter.date_from {
            query = query.filter(transactions::Column::TransactionDate.gte(date_from));
        }
        if let Some(date_to) = filter.date_to {
            query = query.filter(transactions::Column::TransactionDate.lte(date_to));
        }
        if let Some(account_id) = filter.account_id {
            query = query.filter(
                transactions::Column::Id.in_subquery(
                    Query::select()
                        .column(journal_entries::Column::TransactionId)
                        .from(journal_entries::Entity)
                        .and_where(journal_entries::Column::AccountId.eq(account_id.into_inner()))
                        .to_owned(),
                ),
            );
        }

        let headers = query
            .order_by_desc(transactions::Column::TransactionDate)
            .order_by_desc(transactions::Column::CreatedAt)
            .all(&self.db)
            .await
            .map_err(storage)?;

        Self::attach_entries(&self.db, headers).await
    }

    async fn count_draft_references(&self, account_id: AccountId) -> Result<u64, LedgerError> {
        journal_entries::Entity::find()
            .join(JoinType::InnerJoin, journal_entries::Relation::Transactions.def())
            .filter(journal_entries::Column::AccountId.eq(account_id.into_inner()))
            .filter(transactions::Column::Status.eq(sea_orm_active_enums::TransactionStatus::Draft))
            .select_only()
            .column(journal_entries::Column::TransactionId)
            .distinct()
            .count(&self.db)
            .await
            .map_err(storage)
    }

    async fn balance_lines(&self, filter: &LineFilter) -> Result<Vec<BalanceLine>, LedgerError> {
        let mut query = journal_entries::Entity::find()
            .select_only()
            .column(journal_entries::Column::AccountId)
            .column(journal_entries::Column::TransactionId)
            .column_as(transactions::Column::TransactionDate, "transaction_date")
            .column(journal_entries::Column::DebitAmount)
            .column(journal_entries::Column::CreditAmount)
            .join(JoinType::InnerJoin, journal_entries::Relation::Transactions.def())
            .filter(transactions::Column::Status.is_in([
                sea_orm_active_enums::TransactionStatus::Posted,
                sea_orm_active_enums::TransactionStatus::Reversed,
            ]));

        if let Some(account_id) = filter.account_id {
            query = query.filter(journal_entries::Column::AccountId.eq(account_id.into_inner()));
        }
        if let Some(date_from) = filter.date_from {
            query = query.filter(transactions::Column::TransactionDate.gte(date_from));
        }
        if let Some(date_to) = filter.date_to {
            query = query.filter(transactions::Column::TransactionDate.lte(date_to));
        }

        let rows = query
            .into_model::<BalanceRow>()
            .all(&self.db)
            .await
            .map_err(storage)?;

        Ok(rows
            .into_iter()
            .map(|row| BalanceLine {
                account_id: AccountId::from_uuid(row.account_id),
                transaction_id: TransactionId::from_uuid(row.transaction_id),
                date: row.transaction_date,
                debit_amount: Amount::from_minor(row.debit_amount),
                credit_amount: Amount::from_minor(row.credit_amount),
            })
            .collect())
    }
}
