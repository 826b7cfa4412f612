use super::account::{Account, AccountId};
use super::payment::{Payment, PaymentId};
use crate::error::StoreError;
use async_trait::async_trait;
use std::sync::Arc;

/// Keyed persistence for account records.
#[async_trait]
pub trait AccountStore: Send + Sync {
    /// Upserts by id.
    async fn store(&self, account: Account) -> Result<(), StoreError>;
    /// Creates a new row; `AlreadyExists` if any row, deleted or not, has the id.
    async fn insert(&self, account: Account) -> Result<(), StoreError>;
    /// `NotFound` for absent and soft-deleted accounts alike.
    async fn find(&self, id: &AccountId) -> Result<Account, StoreError>;
    /// Active accounts ordered by id.
    async fn find_all(&self) -> Result<Vec<Account>, StoreError>;
    async fn mark_deleted(&self, id: &AccountId) -> Result<(), StoreError>;
}

/// Append-mostly persistence for ledger entries.
#[async_trait]
pub trait PaymentStore: Send + Sync {
    /// Persists a non-empty batch. Either every entry becomes visible or none does.
    async fn store(&self, entries: Vec<Payment>) -> Result<(), StoreError>;
    /// Active entries owned by `account`, in insertion order.
    async fn find(&self, account: &AccountId) -> Result<Vec<Payment>, StoreError>;
    /// Active entries, in insertion order.
    async fn find_all(&self) -> Result<Vec<Payment>, StoreError>;
    /// Compensating soft-delete. Idempotent for already-deleted entries.
    async fn mark_deleted(&self, id: PaymentId) -> Result<(), StoreError>;
}

pub type AccountStoreRef = Arc<dyn AccountStore>;
pub type PaymentStoreRef = Arc<dyn PaymentStore>;
