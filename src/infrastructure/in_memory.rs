use crate::domain::account::{Account, AccountId, AccountStatus};
use crate::domain::payment::{EntryStatus, Payment, PaymentId};
use crate::domain::ports::{AccountStore, PaymentStore};
use crate::error::StoreError;
use async_trait::async_trait;
use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::Arc;
use tokio::sync::RwLock;

/// A thread-safe in-memory store for accounts.
///
/// Rows are kept in a `BTreeMap` so listings come out ordered by id.
/// Soft-deleted rows stay in the map and are filtered on read.
#[derive(Default, Clone)]
pub struct InMemoryAccountStore {
    accounts: Arc<RwLock<BTreeMap<AccountId, Account>>>,
}

impl InMemoryAccountStore {
    /// Creates a new, empty in-memory account store.
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl AccountStore for InMemoryAccountStore {
    async fn store(&self, account: Account) -> Result<(), StoreError> {
        let mut accounts = self.accounts.write().await;
        accounts.insert(account.id.clone(), account);
        Ok(())
    }

    async fn insert(&self, account: Account) -> Result<(), StoreError> {
        let mut accounts = self.accounts.write().await;
        if accounts.contains_key(&account.id) {
            return Err(StoreError::AlreadyExists);
        }
        accounts.insert(account.id.clone(), account);
        Ok(())
    }

    async fn find(&self, id: &AccountId) -> Result<Account, StoreError> {
        let accounts = self.accounts.read().await;
        accounts
            .get(id)
            .filter(|account| account.is_active())
            .cloned()
            .ok_or(StoreError::NotFound)
    }

    async fn find_all(&self) -> Result<Vec<Account>, StoreError> {
        let accounts = self.accounts.read().await;
        Ok(accounts
            .values()
            .filter(|account| account.is_active())
            .cloned()
            .collect())
    }

    async fn mark_deleted(&self, id: &AccountId) -> Result<(), StoreError> {
        let mut accounts = self.accounts.write().await;
        match accounts.get_mut(id) {
            Some(account) if account.is_active() => {
                account.status = AccountStatus::Deleted;
                Ok(())
            }
            _ => Err(StoreError::NotFound),
        }
    }
}

#[derive(Default)]
struct Ledger {
    entries: Vec<Payment>,
    index: HashMap<PaymentId, usize>,
}

/// A thread-safe in-memory store for ledger entries.
///
/// Entries live in insertion order with an id index on the side. A batch is
/// validated in full before anything is appended, which makes `store`
/// all-or-nothing.
#[derive(Default, Clone)]
pub struct InMemoryPaymentStore {
    ledger: Arc<RwLock<Ledger>>,
}

impl InMemoryPaymentStore {
    /// Creates a new, empty in-memory payment store.
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl PaymentStore for InMemoryPaymentStore {
    async fn store(&self, entries: Vec<Payment>) -> Result<(), StoreError> {
        if entries.is_empty() {
            return Err(StoreError::EmptyBatch);
        }

        let mut ledger = self.ledger.write().await;
        let mut seen = HashSet::with_capacity(entries.len());
        for entry in &entries {
            if ledger.index.contains_key(&entry.id) || !seen.insert(entry.id) {
                return Err(StoreError::AlreadyExists);
            }
        }

        for entry in entries {
            let position = ledger.entries.len();
            ledger.index.insert(entry.id, position);
            ledger.entries.push(entry);
        }
        Ok(())
    }

    async fn find(&self, account: &AccountId) -> Result<Vec<Payment>, StoreError> {
        let ledger = self.ledger.read().await;
        Ok(ledger
            .entries
            .iter()
            .filter(|entry| entry.is_active() && &entry.account == account)
            .cloned()
            .collect())
    }

    async fn find_all(&self) -> Result<Vec<Payment>, StoreError> {
        let ledger = self.ledger.read().await;
        Ok(ledger
            .entries
            .iter()
            .filter(|entry| entry.is_active())
            .cloned()
            .collect())
    }

    async fn mark_deleted(&self, id: PaymentId) -> Result<(), StoreError> {
        let mut ledger = self.ledger.write().await;
        let position = *ledger.index.get(&id).ok_or(StoreError::NotFound)?;
        ledger.entries[position].status = EntryStatus::Deleted;
        Ok(())
    }
}
