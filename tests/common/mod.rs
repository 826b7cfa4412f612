#![allow(dead_code)]

use async_trait::async_trait;
use std::collections::HashMap;
use std::fs::File;
use std::io::Error;
use std::path::Path;
use std::sync::Mutex;
use std::time::Duration;
use wallet_ledger::domain::account::{Account, AccountId};
use wallet_ledger::domain::payment::{Payment, PaymentId};
use wallet_ledger::domain::ports::{AccountStore, PaymentStore};
use wallet_ledger::error::StoreError;
use wallet_ledger::infrastructure::in_memory::{InMemoryAccountStore, InMemoryPaymentStore};

/// Far longer than any timeout the tests configure.
pub const STALL: Duration = Duration::from_secs(60);

/// How a faulty store treats a write.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Fault {
    #[default]
    None,
    /// Return a backend error without writing.
    Fail,
    /// Never finish; nothing is written.
    StallBefore,
    /// Write, then never finish.
    StallAfter,
}

async fn inject<F>(fault: Fault, write: F) -> Result<(), StoreError>
where
    F: std::future::Future<Output = Result<(), StoreError>>,
{
    match fault {
        Fault::None => write.await,
        Fault::Fail => Err(StoreError::Backend("injected failure".to_string())),
        Fault::StallBefore => {
            tokio::time::sleep(STALL).await;
            write.await
        }
        Fault::StallAfter => {
            write.await?;
            tokio::time::sleep(STALL).await;
            Ok(())
        }
    }
}

/// In-memory account store whose upserts can be made to fail per account.
#[derive(Default)]
pub struct FaultyAccountStore {
    pub inner: InMemoryAccountStore,
    faults: Mutex<HashMap<AccountId, Fault>>,
}

impl FaultyAccountStore {
    pub fn new(inner: InMemoryAccountStore) -> Self {
        Self {
            inner,
            faults: Mutex::default(),
        }
    }

    pub fn set_fault(&self, id: &str, fault: Fault) {
        self.faults
            .lock()
            .unwrap()
            .insert(AccountId::new(id), fault);
    }

    fn fault_for(&self, id: &AccountId) -> Fault {
        self.faults
            .lock()
            .unwrap()
            .get(id)
            .copied()
            .unwrap_or_default()
    }
}

#[async_trait]
impl AccountStore for FaultyAccountStore {
    async fn store(&self, account: Account) -> Result<(), StoreError> {
        let fault = self.fault_for(&account.id);
        inject(fault, self.inner.store(account)).await
    }

    async fn insert(&self, account: Account) -> Result<(), StoreError> {
        self.inner.insert(account).await
    }

    async fn find(&self, id: &AccountId) -> Result<Account, StoreError> {
        self.inner.find(id).await
    }

    async fn find_all(&self) -> Result<Vec<Account>, StoreError> {
        self.inner.find_all().await
    }

    async fn mark_deleted(&self, id: &AccountId) -> Result<(), StoreError> {
        self.inner.mark_deleted(id).await
    }
}

/// In-memory payment store whose batch writes can be made to fail.
#[derive(Default)]
pub struct FaultyPaymentStore {
    pub inner: InMemoryPaymentStore,
    fault: Mutex<Fault>,
}

impl FaultyPaymentStore {
    pub fn new(inner: InMemoryPaymentStore) -> Self {
        Self {
            inner,
            fault: Mutex::default(),
        }
    }

    pub fn set_fault(&self, fault: Fault) {
        *self.fault.lock().unwrap() = fault;
    }
}

#[async_trait]
impl PaymentStore for FaultyPaymentStore {
    async fn store(&self, entries: Vec<Payment>) -> Result<(), StoreError> {
        let fault = *self.fault.lock().unwrap();
        inject(fault, self.inner.store(entries)).await
    }

    async fn find(&self, account: &AccountId) -> Result<Vec<Payment>, StoreError> {
        self.inner.find(account).await
    }

    async fn find_all(&self) -> Result<Vec<Payment>, StoreError> {
        self.inner.find_all().await
    }

    async fn mark_deleted(&self, id: PaymentId) -> Result<(), StoreError> {
        self.inner.mark_deleted(id).await
    }
}

pub const HEADER: [&str; 5] = ["op", "account", "amount", "counterparty", "currency"];

/// Opens `accounts` accounts with 1000.00 each, then chains `transfers`
/// transfers of 1.00 around the ring.
pub fn generate_csv(path: &Path, accounts: usize, transfers: usize) -> Result<(), Error> {
    let file = File::create(path)?;
    let mut wtr = csv::WriterBuilder::new().from_writer(file);
    wtr.write_record(HEADER)?;

    for i in 0..accounts {
        wtr.write_record(["open", &format!("acc{}", i), "1000.00", "", "USD"])?;
    }
    for i in 0..transfers {
        let from = format!("acc{}", i % accounts);
        let to = format!("acc{}", (i + 1) % accounts);
        wtr.write_record(["transfer", &from, "1.00", &to, ""])?;
    }

    wtr.flush()?;
    Ok(())
}

/// Same as [`generate_csv`] but keeps appending transfers until the file
/// reaches `size_kb` kilobytes.
pub fn generate_large_csv(path: &Path, accounts: usize, size_kb: usize) -> Result<(), Error> {
    let file = File::create(path)?;
    let mut wtr = csv::WriterBuilder::new().from_writer(file);
    wtr.write_record(HEADER)?;
    for i in 0..accounts {
        wtr.write_record(["open", &format!("acc{}", i), "1000.00", "", "USD"])?;
    }

    let target_size = (size_kb * 1024) as u64;
    let mut i = 0;
    // Check size every 1000 rows to avoid syscall overhead
    loop {
        for _ in 0..1000 {
            let from = format!("acc{}", i % accounts);
            let to = format!("acc{}", (i + 1) % accounts);
            wtr.write_record(["transfer", &from, "0.01", &to, ""])?;
            i += 1;
        }
        wtr.flush()?;
        if std::fs::metadata(path)?.len() >= target_size {
            break;
        }
    }
    Ok(())
}
