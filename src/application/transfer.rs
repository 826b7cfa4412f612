use super::bounded;
use super::locks::AccountLocks;
use crate::config::LedgerConfig;
use crate::domain::account::{Account, AccountId, Amount};
use crate::domain::payment::{Payment, PaymentId};
use crate::domain::ports::{AccountStoreRef, PaymentStoreRef};
use crate::error::{StoreError, TransferError, TransferStage};
use rust_decimal::Decimal;
use std::sync::Arc;
use tracing::{debug, error, info, trace, warn};

/// Ids of the two ledger entries written by a committed transfer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransferReceipt {
    pub outgoing: PaymentId,
    pub incoming: PaymentId,
}

/// Moves money between accounts as double-entry ledger transfers.
///
/// A transfer holds exclusive locks on both accounts from the first balance
/// read until the last write, so concurrent transfers that share an account
/// are serialized while disjoint ones run in parallel. Every write after
/// validation is undone if a later write fails; callers only ever observe a
/// transfer as fully committed or as not having happened.
///
/// The engine keeps no state between calls beyond the lock table.
pub struct TransferEngine {
    accounts: AccountStoreRef,
    payments: PaymentStoreRef,
    locks: Arc<AccountLocks>,
    config: LedgerConfig,
}

fn enter(stage: &mut TransferStage, next: TransferStage) {
    trace!(from = %stage, to = %next, "transfer stage");
    *stage = next;
}

impl TransferEngine {
    pub fn new(
        accounts: AccountStoreRef,
        payments: PaymentStoreRef,
        locks: Arc<AccountLocks>,
        config: LedgerConfig,
    ) -> Self {
        Self {
            accounts,
            payments,
            locks,
            config,
        }
    }

    /// Transfers `amount` from `from` to `to`.
    ///
    /// Checks run in a fixed order: distinct accounts, positive amount,
    /// source exists, source covers the amount, target exists, and finally
    /// both new balances stay representable.
    #[tracing::instrument(
        name = "transfer",
        skip_all,
        fields(from = %from, to = %to, amount = %amount)
    )]
    pub async fn transfer(
        &self,
        from: &AccountId,
        amount: Decimal,
        to: &AccountId,
    ) -> Result<TransferReceipt, TransferError> {
        let mut stage = TransferStage::Validating;
        let result = self.run(from, amount, to, &mut stage).await;
        match &result {
            Ok(receipt) => {
                enter(&mut stage, TransferStage::Committed);
                info!(outgoing = %receipt.outgoing, incoming = %receipt.incoming, "transfer committed");
            }
            Err(err) => {
                let failed_at = stage;
                enter(&mut stage, TransferStage::Aborted);
                if err.is_retryable() {
                    warn!(error = %err, stage = %failed_at, "transfer aborted");
                } else {
                    debug!(error = %err, "transfer rejected");
                }
            }
        }
        result
    }

    async fn run(
        &self,
        from: &AccountId,
        amount: Decimal,
        to: &AccountId,
        stage: &mut TransferStage,
    ) -> Result<TransferReceipt, TransferError> {
        if from == to {
            return Err(TransferError::AccountsEqual);
        }
        let amount = Amount::new(amount)?;

        let _guard = self
            .locks
            .exclusive(&[from, to], self.config.lock_timeout)
            .await?;

        let source = self
            .find_account(from, TransferError::UnknownSourceAccount)
            .await?;
        if !source.can_cover(amount) {
            return Err(TransferError::InsufficientFunds {
                account: from.clone(),
                requested: amount.into(),
                available: source.balance,
            });
        }
        let target = self
            .find_account(to, TransferError::UnknownTargetAccount)
            .await?;

        // Both new balances are known before anything is written.
        let mut debited = source.clone();
        debited.debit(amount)?;
        let mut credited = target.clone();
        credited.credit(amount)?;

        enter(stage, TransferStage::LedgerWriting);
        let [outgoing, incoming] = Payment::pair(from, amount, to);
        let receipt = TransferReceipt {
            outgoing: outgoing.id,
            incoming: incoming.id,
        };
        let entry_ids = [outgoing.id, incoming.id];

        match bounded(self.config.store_timeout, self.payments.store(vec![outgoing, incoming])).await
        {
            Ok(()) => {}
            Err(StoreError::Timeout(elapsed)) => {
                // The batch may still have landed.
                self.compensate_ledger(&entry_ids).await;
                return Err(TransferError::StoreTimeout {
                    stage: *stage,
                    elapsed,
                });
            }
            Err(err) => return Err(TransferError::StoreLedgerFailed(err)),
        }

        enter(stage, TransferStage::BalanceWriting);

        if let Err(err) = self.write_balances(debited, credited).await {
            self.restore_accounts([source, target]).await;
            self.compensate_ledger(&entry_ids).await;
            return Err(match err {
                StoreError::Timeout(elapsed) => TransferError::StoreTimeout {
                    stage: *stage,
                    elapsed,
                },
                other => TransferError::StoreAccountFailed(other),
            });
        }

        Ok(receipt)
    }

    async fn find_account(
        &self,
        id: &AccountId,
        unknown: fn(AccountId) -> TransferError,
    ) -> Result<Account, TransferError> {
        match bounded(self.config.store_timeout, self.accounts.find(id)).await {
            Ok(account) => Ok(account),
            Err(StoreError::NotFound) => Err(unknown(id.clone())),
            Err(StoreError::Timeout(elapsed)) => Err(TransferError::StoreTimeout {
                stage: TransferStage::Validating,
                elapsed,
            }),
            Err(err) => Err(TransferError::AccountReadFailed(err)),
        }
    }

    async fn write_balances(&self, debited: Account, credited: Account) -> Result<(), StoreError> {
        let limit = self.config.store_timeout;
        bounded(limit, self.accounts.store(debited)).await?;
        bounded(limit, self.accounts.store(credited)).await
    }

    /// Writes back the pre-transfer rows. Upserts are idempotent, so this is
    /// safe whether or not the failed write reached the store.
    async fn restore_accounts(&self, originals: [Account; 2]) {
        for original in originals {
            let id = original.id.clone();
            if let Err(err) = bounded(self.config.store_timeout, self.accounts.store(original)).await
            {
                error!(account = %id, error = %err, "failed to restore account after aborted transfer");
            }
        }
    }

    async fn compensate_ledger(&self, entry_ids: &[PaymentId]) {
        for id in entry_ids {
            match bounded(self.config.store_timeout, self.payments.mark_deleted(*id)).await {
                Ok(()) | Err(StoreError::NotFound) => {}
                Err(err) => {
                    error!(payment = %id, error = %err, "failed to roll back ledger entry");
                }
            }
        }
    }

    /// Active ledger entries owned by `account`.
    pub async fn payments_for_account(
        &self,
        account: &AccountId,
    ) -> Result<Vec<Payment>, TransferError> {
        let _guard = self
            .locks
            .shared(account, self.config.lock_timeout)
            .await?;
        bounded(self.config.store_timeout, self.payments.find(account))
            .await
            .map_err(TransferError::AccountReadFailed)
    }

    /// Every active ledger entry, taken while no transfer is in flight.
    pub async fn payments_all(&self) -> Result<Vec<Payment>, TransferError> {
        let _guard = self.locks.snapshot(self.config.lock_timeout).await?;
        bounded(self.config.store_timeout, self.payments.find_all())
            .await
            .map_err(TransferError::AccountReadFailed)
    }
}
