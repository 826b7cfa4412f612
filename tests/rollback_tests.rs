mod common;

use common::{Fault, FaultyAccountStore, FaultyPaymentStore};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use std::sync::Arc;
use wallet_ledger::application::Ledger;
use wallet_ledger::config::LedgerConfig;
use wallet_ledger::domain::account::{AccountId, Currency};
use wallet_ledger::domain::ports::{AccountStore, PaymentStore};
use wallet_ledger::error::{StoreError, TransferError, TransferStage};
use wallet_ledger::infrastructure::in_memory::{InMemoryAccountStore, InMemoryPaymentStore};

struct Harness {
    ledger: Ledger,
    accounts: Arc<FaultyAccountStore>,
    payments: Arc<FaultyPaymentStore>,
}

async fn harness() -> Harness {
    let accounts = Arc::new(FaultyAccountStore::new(InMemoryAccountStore::new()));
    let payments = Arc::new(FaultyPaymentStore::new(InMemoryPaymentStore::new()));
    let config = LedgerConfig::from_millis(1_000, 50).unwrap();
    let ledger = Ledger::new(accounts.clone(), payments.clone(), config);

    ledger
        .accounts
        .create(AccountId::new("a"), Currency::Usd, dec!(1000.00))
        .await
        .unwrap();
    ledger
        .accounts
        .create(AccountId::new("b"), Currency::Usd, dec!(0.00))
        .await
        .unwrap();

    Harness {
        ledger,
        accounts,
        payments,
    }
}

impl Harness {
    async fn balance(&self, id: &str) -> Decimal {
        self.accounts
            .inner
            .find(&AccountId::new(id))
            .await
            .unwrap()
            .balance
            .value()
    }

    async fn transfer(&self) -> Result<(), TransferError> {
        self.ledger
            .transfers
            .transfer(&AccountId::new("a"), dec!(55.55), &AccountId::new("b"))
            .await
            .map(|_| ())
    }

    async fn assert_untouched(&self) {
        assert_eq!(self.balance("a").await, dec!(1000.00));
        assert_eq!(self.balance("b").await, dec!(0.00));
        assert!(self.payments.inner.find_all().await.unwrap().is_empty());
    }
}

#[tokio::test]
async fn test_ledger_failure_leaves_balances_untouched() {
    let h = harness().await;
    h.payments.set_fault(Fault::Fail);

    let result = h.transfer().await;

    assert!(matches!(
        result,
        Err(TransferError::StoreLedgerFailed(StoreError::Backend(_)))
    ));
    h.assert_untouched().await;
}

#[tokio::test]
async fn test_ledger_timeout_before_write() {
    let h = harness().await;
    h.payments.set_fault(Fault::StallBefore);

    let result = h.transfer().await;

    assert!(matches!(
        result,
        Err(TransferError::StoreTimeout {
            stage: TransferStage::LedgerWriting,
            ..
        })
    ));
    h.assert_untouched().await;
}

#[tokio::test]
async fn test_ledger_timeout_after_write_is_compensated() {
    let h = harness().await;
    h.payments.set_fault(Fault::StallAfter);

    let result = h.transfer().await;

    assert!(matches!(
        result,
        Err(TransferError::StoreTimeout {
            stage: TransferStage::LedgerWriting,
            ..
        })
    ));
    h.assert_untouched().await;
}

#[tokio::test]
async fn test_source_write_failure_rolls_back_ledger() {
    let h = harness().await;
    h.accounts.set_fault("a", Fault::Fail);

    let result = h.transfer().await;

    assert!(matches!(result, Err(TransferError::StoreAccountFailed(_))));
    h.assert_untouched().await;
}

#[tokio::test]
async fn test_target_write_failure_restores_source() {
    let h = harness().await;
    h.accounts.set_fault("b", Fault::Fail);

    let result = h.transfer().await;

    assert!(matches!(result, Err(TransferError::StoreAccountFailed(_))));
    h.assert_untouched().await;
}

#[tokio::test]
async fn test_target_write_timeout_restores_source() {
    let h = harness().await;
    h.accounts.set_fault("b", Fault::StallAfter);

    let result = h.transfer().await;

    assert!(matches!(
        result,
        Err(TransferError::StoreTimeout {
            stage: TransferStage::BalanceWriting,
            ..
        })
    ));
    // The stalled write landed, but the restore overwrote it and the restore
    // of "b" itself stalls after writing, so the original row is back.
    h.assert_untouched().await;
}

#[tokio::test]
async fn test_ledger_recovers_after_fault_cleared() {
    let h = harness().await;
    h.accounts.set_fault("b", Fault::Fail);
    assert!(h.transfer().await.unwrap_err().is_retryable());

    h.accounts.set_fault("b", Fault::None);
    h.transfer().await.unwrap();

    assert_eq!(h.balance("a").await, dec!(944.45));
    assert_eq!(h.balance("b").await, dec!(55.55));
    let entries = h.payments.inner.find_all().await.unwrap();
    assert_eq!(entries.len(), 2);
    assert!(entries[0].mirrors(&entries[1]));
}
