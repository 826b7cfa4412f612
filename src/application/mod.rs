//! Application layer: the transfer engine, the account lifecycle service and
//! the lock table they share.
//!
//! `Ledger` wires both services over one pair of stores. It is `Send + Sync`
//! and meant to be shared behind an `Arc` by concurrent request handlers.

pub mod account_service;
pub mod locks;
pub mod transfer;

use crate::config::LedgerConfig;
use crate::domain::ports::{AccountStoreRef, PaymentStoreRef};
use crate::error::StoreError;
use crate::infrastructure::in_memory::{InMemoryAccountStore, InMemoryPaymentStore};
use account_service::AccountService;
use locks::AccountLocks;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use transfer::TransferEngine;

pub struct Ledger {
    pub accounts: AccountService,
    pub transfers: TransferEngine,
}

impl Ledger {
    pub fn new(accounts: AccountStoreRef, payments: PaymentStoreRef, config: LedgerConfig) -> Self {
        let locks = Arc::new(AccountLocks::new());
        Self {
            accounts: AccountService::new(accounts.clone(), locks.clone(), config),
            transfers: TransferEngine::new(accounts, payments, locks, config),
        }
    }

    pub fn in_memory(config: LedgerConfig) -> Self {
        Self::new(
            Arc::new(InMemoryAccountStore::new()),
            Arc::new(InMemoryPaymentStore::new()),
            config,
        )
    }
}

/// Awaits a store call for at most `limit`.
pub(crate) async fn bounded<T>(
    limit: Duration,
    call: impl Future<Output = Result<T, StoreError>>,
) -> Result<T, StoreError> {
    tokio::time::timeout(limit, call)
        .await
        .unwrap_or(Err(StoreError::Timeout(limit)))
}
