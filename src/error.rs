use crate::domain::account::{AccountId, Balance};
use std::time::Duration;
use thiserror::Error;

/// Errors raised by the account and payment store backends.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum StoreError {
    /// The record is absent, or present but soft-deleted.
    #[error("record not found")]
    NotFound,
    #[error("record already exists")]
    AlreadyExists,
    #[error("refusing to persist an empty payment batch")]
    EmptyBatch,
    #[error("store call timed out after {0:?}")]
    Timeout(Duration),
    #[error("storage backend error: {0}")]
    Backend(String),
    #[error("serialization error: {0}")]
    Serialization(String),
}

#[cfg(feature = "storage-rocksdb")]
impl From<rocksdb::Error> for StoreError {
    fn from(err: rocksdb::Error) -> Self {
        StoreError::Backend(err.into_string())
    }
}

impl From<serde_json::Error> for StoreError {
    fn from(err: serde_json::Error) -> Self {
        StoreError::Serialization(err.to_string())
    }
}

/// Lock acquisition exceeded the configured bound.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
#[error("timed out after {0:?} waiting for account lock")]
pub struct LockTimeout(pub Duration);

/// Stage a transfer was in when it stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransferStage {
    Validating,
    LedgerWriting,
    BalanceWriting,
    Committed,
    Aborted,
}

impl std::fmt::Display for TransferStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            TransferStage::Validating => "validating",
            TransferStage::LedgerWriting => "ledger-writing",
            TransferStage::BalanceWriting => "balance-writing",
            TransferStage::Committed => "committed",
            TransferStage::Aborted => "aborted",
        };
        f.write_str(name)
    }
}

/// Failures of a single `transfer` call.
///
/// The first six variants are caller errors: nothing was mutated and
/// retrying the same request gives the same answer. The rest are
/// infrastructure failures that a caller may choose to retry.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum TransferError {
    #[error("source and target accounts are the same")]
    AccountsEqual,
    #[error("transfer amount must be positive")]
    InvalidAmount,
    #[error("unknown source account: {0}")]
    UnknownSourceAccount(AccountId),
    #[error("unknown target account: {0}")]
    UnknownTargetAccount(AccountId),
    #[error("insufficient funds in {account}: requested {requested}, available {available}")]
    InsufficientFunds {
        account: AccountId,
        requested: Balance,
        available: Balance,
    },
    #[error("balance of {0} would exceed the representable range")]
    BalanceOverflow(AccountId),
    #[error("failed to read account: {0}")]
    AccountReadFailed(#[source] StoreError),
    #[error("failed to store ledger entries: {0}")]
    StoreLedgerFailed(#[source] StoreError),
    #[error("failed to store account balances: {0}")]
    StoreAccountFailed(#[source] StoreError),
    #[error(transparent)]
    LockTimeout(#[from] LockTimeout),
    #[error("store timed out after {elapsed:?} while {stage}")]
    StoreTimeout {
        stage: TransferStage,
        elapsed: Duration,
    },
}

impl TransferError {
    /// Whether the failure came from infrastructure rather than the request.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            TransferError::AccountReadFailed(_)
                | TransferError::StoreLedgerFailed(_)
                | TransferError::StoreAccountFailed(_)
                | TransferError::LockTimeout(_)
                | TransferError::StoreTimeout { .. }
        )
    }
}

/// Failures of the account lifecycle operations.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum AccountError {
    #[error("account not found: {0}")]
    NotFound(AccountId),
    #[error("account already exists: {0}")]
    AlreadyExists(AccountId),
    #[error("initial balance must not be negative, got {0}")]
    NegativeBalance(Balance),
    #[error(transparent)]
    LockTimeout(#[from] LockTimeout),
    #[error("account store error: {0}")]
    Store(#[from] StoreError),
}

/// Errors surfaced by the batch driver and its CSV plumbing.
#[derive(Error, Debug)]
pub enum PaymentError {
    #[error("CSV error: {0}")]
    CsvError(#[from] csv::Error),
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),
    #[error("Invalid record: {0}")]
    InvalidRecord(String),
    #[error("Account error: {0}")]
    AccountError(#[from] AccountError),
    #[error("Transfer error: {0}")]
    TransferError(#[from] TransferError),
    #[error("Store error: {0}")]
    StoreError(#[from] StoreError),
}

pub type Result<T, E = PaymentError> = std::result::Result<T, E>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retryable_split() {
        assert!(!TransferError::AccountsEqual.is_retryable());
        assert!(!TransferError::InvalidAmount.is_retryable());
        assert!(!TransferError::UnknownSourceAccount(AccountId::new("a")).is_retryable());
        assert!(!TransferError::BalanceOverflow(AccountId::new("b")).is_retryable());
        assert!(TransferError::StoreLedgerFailed(StoreError::Backend("x".into())).is_retryable());
        assert!(TransferError::LockTimeout(LockTimeout(Duration::from_millis(1))).is_retryable());
        assert!(
            TransferError::StoreTimeout {
                stage: TransferStage::LedgerWriting,
                elapsed: Duration::from_millis(1),
            }
            .is_retryable()
        );
    }

    #[test]
    fn test_timeout_message_names_stage() {
        let err = TransferError::StoreTimeout {
            stage: TransferStage::BalanceWriting,
            elapsed: Duration::from_secs(2),
        };
        assert_eq!(err.to_string(), "store timed out after 2s while balance-writing");
    }
}
