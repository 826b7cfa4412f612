use super::bounded;
use super::locks::AccountLocks;
use crate::config::LedgerConfig;
use crate::domain::account::{Account, AccountId, Balance, Currency};
use crate::domain::ports::AccountStoreRef;
use crate::error::{AccountError, StoreError};
use rust_decimal::Decimal;
use std::sync::Arc;
use tracing::info;

/// Account lifecycle: create, load, list and soft-delete.
///
/// Balances are never changed here; that is the transfer engine's job.
pub struct AccountService {
    accounts: AccountStoreRef,
    locks: Arc<AccountLocks>,
    config: LedgerConfig,
}

impl AccountService {
    pub fn new(accounts: AccountStoreRef, locks: Arc<AccountLocks>, config: LedgerConfig) -> Self {
        Self {
            accounts,
            locks,
            config,
        }
    }

    /// Registers a new account. Ids of deleted accounts are not reusable.
    pub async fn create(
        &self,
        id: AccountId,
        currency: Currency,
        initial_balance: Decimal,
    ) -> Result<Account, AccountError> {
        let balance = Balance::new(initial_balance);
        if balance.is_negative() {
            return Err(AccountError::NegativeBalance(balance));
        }

        let account = Account::new(id, currency, balance);
        match bounded(self.config.store_timeout, self.accounts.insert(account.clone())).await {
            Ok(()) => {
                info!(account = %account.id, %currency, balance = %account.balance, "account created");
                Ok(account)
            }
            Err(StoreError::AlreadyExists) => Err(AccountError::AlreadyExists(account.id)),
            Err(err) => Err(err.into()),
        }
    }

    pub async fn load(&self, id: &AccountId) -> Result<Account, AccountError> {
        let _guard = self.locks.shared(id, self.config.lock_timeout).await?;
        bounded(self.config.store_timeout, self.accounts.find(id))
            .await
            .map_err(|err| not_found_as(err, id))
    }

    /// Active accounts ordered by id, taken while no transfer is in flight.
    pub async fn load_all(&self) -> Result<Vec<Account>, AccountError> {
        let _guard = self.locks.snapshot(self.config.lock_timeout).await?;
        Ok(bounded(self.config.store_timeout, self.accounts.find_all()).await?)
    }

    /// Soft-deletes the account. Waits for in-flight transfers on it.
    pub async fn delete(&self, id: &AccountId) -> Result<(), AccountError> {
        let _guard = self.locks.exclusive(&[id], self.config.lock_timeout).await?;
        bounded(self.config.store_timeout, self.accounts.mark_deleted(id))
            .await
            .map_err(|err| not_found_as(err, id))?;
        info!(account = %id, "account deleted");
        Ok(())
    }
}

fn not_found_as(err: StoreError, id: &AccountId) -> AccountError {
    match err {
        StoreError::NotFound => AccountError::NotFound(id.clone()),
        other => AccountError::Store(other),
    }
}
