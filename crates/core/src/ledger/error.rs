//! Ledger error types.
//!
//! Every rejected operation surfaces a specific variant naming the invariant
//! that failed. Variants are grouped into the coarse [`ErrorKind`]s callers
//! branch on; `Storage` is the only transport-level kind.

use buku_shared::AppError;
use buku_shared::types::{AccountId, Amount, AmountError, TransactionId};
use thiserror::Error;

use super::types::TransactionStatus;

/// Coarse classification of ledger errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Malformed input.
    Validation,
    /// Unknown id or code.
    NotFound,
    /// Editing a non-draft transaction.
    ImmutableState,
    /// Illegal state transition.
    InvalidState,
    /// Operation conflicts with existing ledger state.
    Conflict,
    /// Integration cannot resolve a required account.
    MissingControlAccount,
    /// Persistence or transport failure.
    Storage,
}

/// Errors that can occur during ledger operations.
#[derive(Debug, Error)]
pub enum LedgerError {
    // ========== Validation Errors ==========
    /// Transaction must have at least 2 entries.
    #[error("Transaction must have at least 2 entries, got {count}")]
    InsufficientEntries {
        /// Number of entries supplied.
        count: usize,
    },

    /// An entry references an account that does not exist.
    #[error("Entry {line} references unknown account {account_id}")]
    UnknownAccount {
        /// 1-based entry position.
        line: usize,
        /// The unresolved account.
        account_id: AccountId,
    },

    /// An entry references an inactive account.
    #[error("Entry {line} references inactive account {code}")]
    AccountInactive {
        /// 1-based entry position.
        line: usize,
        /// Code of the inactive account.
        code: String,
    },

    /// Entry must carry exactly one strictly positive side.
    #[error(
        "Entry {line} must have exactly one of debit or credit strictly positive and the other zero \
         (debit: {debit}, credit: {credit})"
    )]
    InvalidEntryAmounts {
        /// 1-based entry position.
        line: usize,
        /// Debit amount supplied.
        debit: Amount,
        /// Credit amount supplied.
        credit: Amount,
    },

    /// Transaction is not balanced (debits != credits).
    #[error(
        "Transaction is not balanced. Debit: {debit}, Credit: {credit}, Difference: {difference}"
    )]
    UnbalancedTransaction {
        /// Total debit amount.
        debit: Amount,
        /// Total credit amount.
        credit: Amount,
        /// Debit minus credit.
        difference: Amount,
    },

    /// Transaction description is empty.
    #[error("Transaction description must not be empty")]
    EmptyDescription,

    /// Amount arithmetic overflowed or a decimal was not representable.
    #[error("Invalid amount: {0}")]
    InvalidAmount(#[from] AmountError),

    /// Account code must not be empty.
    #[error("Account code must not be empty")]
    EmptyAccountCode,

    /// Account name must not be empty.
    #[error("Account name must not be empty")]
    EmptyAccountName,

    /// Account code already exists (active or not).
    #[error("Account code '{0}' already exists")]
    DuplicateAccountCode(String),

    /// Parent account does not exist.
    #[error("Parent account not found: {0}")]
    ParentAccountNotFound(AccountId),

    /// Domain event payload is malformed.
    #[error("Invalid event: {0}")]
    InvalidEvent(String),

    // ========== Not Found Errors ==========
    /// Account not found.
    #[error("Account not found: {0}")]
    AccountNotFound(AccountId),

    /// Account code not found.
    #[error("Account code not found: {0}")]
    AccountCodeNotFound(String),

    /// Transaction not found.
    #[error("Transaction not found: {0}")]
    TransactionNotFound(TransactionId),

    // ========== Transaction State Errors ==========
    /// Transaction is no longer editable.
    #[error("Cannot modify {status} transaction {id}; only drafts can be changed")]
    ImmutableTransaction {
        /// The transaction.
        id: TransactionId,
        /// Its current status.
        status: TransactionStatus,
    },

    /// Attempted an invalid status transition.
    #[error("Invalid status transition for transaction {id} from {from} to {to}")]
    InvalidTransition {
        /// The transaction.
        id: TransactionId,
        /// The current status.
        from: TransactionStatus,
        /// The attempted target status.
        to: TransactionStatus,
    },

    // ========== Conflict Errors ==========
    /// Account still carries a posted balance.
    #[error("Cannot deactivate account {code}: posted balance is {balance}, must be zero")]
    AccountHasBalance {
        /// Account code.
        code: String,
        /// Current posted balance.
        balance: Amount,
    },

    /// Account is referenced by draft transactions.
    #[error("Cannot deactivate account {code}: referenced by {drafts} draft transaction(s)")]
    AccountHasDraftReferences {
        /// Account code.
        code: String,
        /// Number of drafts referencing it.
        drafts: u64,
    },

    /// A transaction with this reference already exists.
    #[error("A transaction with reference '{0}' already exists")]
    DuplicateReference(String),

    // ========== Integration Errors ==========
    /// Control account does not exist.
    #[error("Control account {code} ({role}) does not exist")]
    MissingControlAccount {
        /// What the account is used for.
        role: &'static str,
        /// Configured account code.
        code: String,
    },

    /// Control account exists but is inactive.
    #[error("Control account {code} ({role}) is inactive")]
    InactiveControlAccount {
        /// What the account is used for.
        role: &'static str,
        /// Configured account code.
        code: String,
    },

    // ========== Storage Errors ==========
    /// Persistence layer failure.
    #[error("Storage error: {0}")]
    Storage(String),
}

impl LedgerError {
    /// Returns the coarse error kind.
    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::InsufficientEntries { .. }
            | Self::UnknownAccount { .. }
            | Self::AccountInactive { .. }
            | Self::InvalidEntryAmounts { .. }
            | Self::UnbalancedTransaction { .. }
            | Self::EmptyDescription
            | Self::InvalidAmount(_)
            | Self::EmptyAccountCode
            | Self::EmptyAccountName
            | Self::DuplicateAccountCode(_)
            | Self::ParentAccountNotFound(_)
            | Self::InvalidEvent(_) => ErrorKind::Validation,

            Self::AccountNotFound(_)
            | Self::AccountCodeNotFound(_)
            | Self::TransactionNotFound(_) => ErrorKind::NotFound,

            Self::ImmutableTransaction { .. } => ErrorKind::ImmutableState,

            Self::InvalidTransition { .. } => ErrorKind::InvalidState,

            Self::AccountHasBalance { .. }
            | Self::AccountHasDraftReferences { .. }
            | Self::DuplicateReference(_) => ErrorKind::Conflict,

            Self::MissingControlAccount { .. } | Self::InactiveControlAccount { .. } => {
                ErrorKind::MissingControlAccount
            }

            Self::Storage(_) => ErrorKind::Storage,
        }
    }

    /// Returns the error code for API responses.
    #[must_use]
    pub const fn error_code(&self) -> &'static str {
        match self {
            Self::InsufficientEntries { .. } => "INSUFFICIENT_ENTRIES",
            Self::UnknownAccount { .. } => "UNKNOWN_ACCOUNT",
            Self::AccountInactive { .. } => "ACCOUNT_INACTIVE",
            Self::InvalidEntryAmounts { .. } => "INVALID_ENTRY_AMOUNTS",
            Self::UnbalancedTransaction { .. } => "UNBALANCED_TRANSACTION",
            Self::EmptyDescription => "EMPTY_DESCRIPTION",
            Self::InvalidAmount(_) => "INVALID_AMOUNT",
            Self::EmptyAccountCode => "EMPTY_ACCOUNT_CODE",
            Self::EmptyAccountName => "EMPTY_ACCOUNT_NAME",
            Self::DuplicateAccountCode(_) => "DUPLICATE_ACCOUNT_CODE",
            Self::ParentAccountNotFound(_) => "PARENT_ACCOUNT_NOT_FOUND",
            Self::InvalidEvent(_) => "INVALID_EVENT",
            Self::AccountNotFound(_) => "ACCOUNT_NOT_FOUND",
            Self::AccountCodeNotFound(_) => "ACCOUNT_CODE_NOT_FOUND",
            Self::TransactionNotFound(_) => "TRANSACTION_NOT_FOUND",
            Self::ImmutableTransaction { .. } => "IMMUTABLE_TRANSACTION",
            Self::InvalidTransition { .. } => "INVALID_TRANSITION",
            Self::AccountHasBalance { .. } => "ACCOUNT_HAS_BALANCE",
            Self::AccountHasDraftReferences { .. } => "ACCOUNT_HAS_DRAFT_REFERENCES",
            Self::DuplicateReference(_) => "DUPLICATE_REFERENCE",
            Self::MissingControlAccount { .. } => "MISSING_CONTROL_ACCOUNT",
            Self::InactiveControlAccount { .. } => "INACTIVE_CONTROL_ACCOUNT",
            Self::Storage(_) => "STORAGE_ERROR",
        }
    }

    /// Returns the HTTP status code for this error.
    #[must_use]
    pub const fn http_status_code(&self) -> u16 {
        match self.kind() {
            ErrorKind::Validation => 400,
            ErrorKind::NotFound => 404,
            ErrorKind::ImmutableState | ErrorKind::InvalidState | ErrorKind::Conflict => 409,
            ErrorKind::MissingControlAccount => 422,
            ErrorKind::Storage => 500,
        }
    }

    /// Returns true if this error is retryable.
    ///
    /// Retrying belongs to the caller or transport; domain errors never are.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        matches!(self.kind(), ErrorKind::Storage)
    }
}

impl From<LedgerError> for AppError {
    fn from(err: LedgerError) -> Self {
        let message = err.to_string();
        match err.kind() {
            ErrorKind::Validation => Self::Validation(message),
            ErrorKind::NotFound => Self::NotFound(message),
            ErrorKind::ImmutableState => Self::ImmutableState(message),
            ErrorKind::InvalidState => Self::InvalidState(message),
            ErrorKind::Conflict => Self::Conflict(message),
            ErrorKind::MissingControlAccount => Self::MissingControlAccount(message),
            ErrorKind::Storage => Self::Database(message),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_kinds() {
        assert_eq!(
            LedgerError::InsufficientEntries { count: 1 }.kind(),
            ErrorKind::Validation
        );
        assert_eq!(
            LedgerError::TransactionNotFound(TransactionId::new()).kind(),
            ErrorKind::NotFound
        );
        assert_eq!(
            LedgerError::ImmutableTransaction {
                id: TransactionId::new(),
                status: TransactionStatus::Posted,
            }
            .kind(),
            ErrorKind::ImmutableState
        );
        assert_eq!(
            LedgerError::InvalidTransition {
                id: TransactionId::new(),
                from: TransactionStatus::Posted,
                to: TransactionStatus::Posted,
            }
            .kind(),
            ErrorKind::InvalidState
        );
        assert_eq!(
            LedgerError::AccountHasBalance {
                code: "1000".into(),
                balance: Amount::from_minor(1),
            }
            .kind(),
            ErrorKind::Conflict
        );
        assert_eq!(
            LedgerError::InactiveControlAccount {
                role: "cash",
                code: "1000".into(),
            }
            .kind(),
            ErrorKind::MissingControlAccount
        );
    }

    #[test]
    fn test_http_status_codes() {
        assert_eq!(LedgerError::EmptyDescription.http_status_code(), 400);
        assert_eq!(
            LedgerError::AccountNotFound(AccountId::new()).http_status_code(),
            404
        );
        assert_eq!(
            LedgerError::DuplicateReference("PAY-1".into()).http_status_code(),
            409
        );
        assert_eq!(
            LedgerError::Storage("connection refused".into()).http_status_code(),
            500
        );
    }

    #[test]
    fn test_retryable_errors() {
        assert!(LedgerError::Storage("timeout".into()).is_retryable());
        assert!(!LedgerError::EmptyDescription.is_retryable());
        assert!(!LedgerError::DuplicateReference("PAY-1".into()).is_retryable());
    }

    #[test]
    fn test_unbalanced_message_reports_amounts() {
        let err = LedgerError::UnbalancedTransaction {
            debit: Amount::from_minor(100),
            credit: Amount::from_minor(80),
            difference: Amount::from_minor(20),
        };
        assert_eq!(
            err.to_string(),
            "Transaction is not balanced. Debit: 100, Credit: 80, Difference: 20"
        );
    }

    #[test]
    fn test_into_app_error() {
        let app: AppError = LedgerError::AccountHasBalance {
            code: "1000".into(),
            balance: Amount::from_minor(500_000),
        }
        .into();
        assert_eq!(app.error_code(), "CONFLICT");
        assert!(app.to_string().contains("500000"));
    }
}
