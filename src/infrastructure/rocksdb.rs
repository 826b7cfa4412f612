use crate::domain::account::{Account, AccountId, AccountStatus};
use crate::domain::payment::{EntryStatus, Payment, PaymentId};
use crate::domain::ports::{AccountStore, PaymentStore};
use crate::error::StoreError;
use async_trait::async_trait;
use rocksdb::{ColumnFamilyDescriptor, DB, IteratorMode, Options, WriteBatch};
use std::collections::HashSet;
use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::Mutex;

/// Column Family for storing account rows, keyed by account id.
pub const CF_ACCOUNTS: &str = "accounts";
/// Column Family for storing ledger entries, keyed by a big-endian sequence
/// number so iteration yields insertion order.
pub const CF_PAYMENTS: &str = "payments";
/// Column Family mapping a payment id to its sequence key in `payments`.
pub const CF_PAYMENT_IDS: &str = "payment_ids";

/// A persistent store implementation using RocksDB.
///
/// Handles storage for both `Account` and `Payment` entities using separate
/// Column Families. Payment batches go through a `WriteBatch`, which RocksDB
/// applies atomically together with their id index.
///
/// Every RocksDB call runs on tokio's blocking pool, so callers can bound a
/// call with `tokio::time::timeout`. Writes are serialized by a lock that the
/// blocking task owns: a write whose caller gave up still finishes before the
/// next write (for example a compensating `mark_deleted`) starts.
///
/// This struct is thread-safe (`Clone` shares the underlying `Arc<DB>`).
#[derive(Clone)]
pub struct RocksDBStore {
    db: Arc<DB>,
    next_seq: Arc<AtomicU64>,
    write_lock: Arc<Mutex<()>>,
}

impl RocksDBStore {
    /// Opens or creates a RocksDB instance at the specified path.
    ///
    /// Ensures that the required column families exist and resumes the
    /// payment sequence after the last stored entry.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, StoreError> {
        let mut opts = Options::default();
        opts.create_if_missing(true);
        opts.create_missing_column_families(true);

        let descriptors = [CF_ACCOUNTS, CF_PAYMENTS, CF_PAYMENT_IDS]
            .into_iter()
            .map(|name| ColumnFamilyDescriptor::new(name, Options::default()))
            .collect::<Vec<_>>();

        let db = DB::open_cf_descriptors(&opts, path, descriptors)?;

        let next_seq = {
            let cf = db
                .cf_handle(CF_PAYMENTS)
                .ok_or_else(|| missing_cf(CF_PAYMENTS))?;
            match db.iterator_cf(cf, IteratorMode::End).next() {
                Some(item) => {
                    let (key, _) = item?;
                    decode_seq(&key)? + 1
                }
                None => 0,
            }
        };
        tracing::debug!(next_seq, "opened rocksdb store");

        Ok(Self {
            db: Arc::new(db),
            next_seq: Arc::new(AtomicU64::new(next_seq)),
            write_lock: Arc::new(Mutex::new(())),
        })
    }

    /// Runs a read on the blocking pool.
    async fn read<T, F>(&self, work: F) -> Result<T, StoreError>
    where
        T: Send + 'static,
        F: FnOnce(&RocksDBStore) -> Result<T, StoreError> + Send + 'static,
    {
        let store = self.clone();
        tokio::task::spawn_blocking(move || work(&store))
            .await
            .map_err(join_failed)?
    }

    /// Runs a write on the blocking pool while holding the write lock.
    async fn write<T, F>(&self, work: F) -> Result<T, StoreError>
    where
        T: Send + 'static,
        F: FnOnce(&RocksDBStore) -> Result<T, StoreError> + Send + 'static,
    {
        let guard = self.write_lock.clone().lock_owned().await;
        let store = self.clone();
        tokio::task::spawn_blocking(move || {
            let _guard = guard;
            work(&store)
        })
        .await
        .map_err(join_failed)?
    }

    fn cf(&self, name: &'static str) -> Result<&rocksdb::ColumnFamily, StoreError> {
        self.db.cf_handle(name).ok_or_else(|| missing_cf(name))
    }

    fn read_account(&self, id: &AccountId) -> Result<Option<Account>, StoreError> {
        let cf = self.cf(CF_ACCOUNTS)?;
        match self.db.get_cf(cf, id.as_str().as_bytes())? {
            Some(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
            None => Ok(None),
        }
    }

    fn write_account(&self, account: &Account) -> Result<(), StoreError> {
        let cf = self.cf(CF_ACCOUNTS)?;
        let value = serde_json::to_vec(account)?;
        self.db.put_cf(cf, account.id.as_str().as_bytes(), value)?;
        Ok(())
    }

    fn active_accounts(&self) -> Result<Vec<Account>, StoreError> {
        let cf = self.cf(CF_ACCOUNTS)?;
        let mut accounts = Vec::new();
        for item in self.db.iterator_cf(cf, IteratorMode::Start) {
            let (_key, value) = item?;
            let account: Account = serde_json::from_slice(&value)?;
            if account.is_active() {
                accounts.push(account);
            }
        }
        Ok(accounts)
    }

    fn scan_payments(&self) -> Result<Vec<Payment>, StoreError> {
        let cf = self.cf(CF_PAYMENTS)?;
        let mut entries = Vec::new();
        for item in self.db.iterator_cf(cf, IteratorMode::Start) {
            let (_key, value) = item?;
            entries.push(serde_json::from_slice(&value)?);
        }
        Ok(entries)
    }

    fn append_payments(&self, entries: &[Payment]) -> Result<(), StoreError> {
        let payments = self.cf(CF_PAYMENTS)?;
        let ids = self.cf(CF_PAYMENT_IDS)?;

        let mut seen = HashSet::with_capacity(entries.len());
        for entry in entries {
            if !seen.insert(entry.id) || self.db.get_cf(ids, id_key(entry.id))?.is_some() {
                return Err(StoreError::AlreadyExists);
            }
        }

        let mut batch = WriteBatch::default();
        for entry in entries {
            let seq = self.next_seq.fetch_add(1, Ordering::SeqCst).to_be_bytes();
            batch.put_cf(payments, seq, serde_json::to_vec(entry)?);
            batch.put_cf(ids, id_key(entry.id), seq);
        }
        self.db.write(batch)?;
        Ok(())
    }

    fn soft_delete_payment(&self, id: PaymentId) -> Result<(), StoreError> {
        let payments = self.cf(CF_PAYMENTS)?;
        let ids = self.cf(CF_PAYMENT_IDS)?;

        let seq = self
            .db
            .get_cf(ids, id_key(id))?
            .ok_or(StoreError::NotFound)?;
        let bytes = self
            .db
            .get_cf(payments, &seq)?
            .ok_or(StoreError::NotFound)?;
        let mut payment: Payment = serde_json::from_slice(&bytes)?;
        if payment.status == EntryStatus::Deleted {
            return Ok(());
        }
        payment.status = EntryStatus::Deleted;
        self.db.put_cf(payments, &seq, serde_json::to_vec(&payment)?)?;
        Ok(())
    }
}

fn missing_cf(name: &str) -> StoreError {
    StoreError::Backend(format!("column family {} not found", name))
}

fn join_failed(err: tokio::task::JoinError) -> StoreError {
    StoreError::Backend(format!("blocking task failed: {}", err))
}

fn id_key(id: PaymentId) -> String {
    id.to_string()
}

fn decode_seq(key: &[u8]) -> Result<u64, StoreError> {
    let bytes: [u8; 8] = key
        .try_into()
        .map_err(|_| StoreError::Serialization("malformed payment key".to_string()))?;
    Ok(u64::from_be_bytes(bytes))
}

#[async_trait]
impl AccountStore for RocksDBStore {
    async fn store(&self, account: Account) -> Result<(), StoreError> {
        self.write(move |store| store.write_account(&account)).await
    }

    async fn insert(&self, account: Account) -> Result<(), StoreError> {
        self.write(move |store| {
            if store.read_account(&account.id)?.is_some() {
                return Err(StoreError::AlreadyExists);
            }
            store.write_account(&account)
        })
        .await
    }

    async fn find(&self, id: &AccountId) -> Result<Account, StoreError> {
        let id = id.clone();
        self.read(move |store| {
            store
                .read_account(&id)?
                .filter(|account| account.is_active())
                .ok_or(StoreError::NotFound)
        })
        .await
    }

    async fn find_all(&self) -> Result<Vec<Account>, StoreError> {
        self.read(|store| store.active_accounts()).await
    }

    async fn mark_deleted(&self, id: &AccountId) -> Result<(), StoreError> {
        let id = id.clone();
        self.write(move |store| {
            let mut account = store
                .read_account(&id)?
                .filter(|account| account.is_active())
                .ok_or(StoreError::NotFound)?;
            account.status = AccountStatus::Deleted;
            store.write_account(&account)
        })
        .await
    }
}

#[async_trait]
impl PaymentStore for RocksDBStore {
    async fn store(&self, entries: Vec<Payment>) -> Result<(), StoreError> {
        if entries.is_empty() {
            return Err(StoreError::EmptyBatch);
        }
        self.write(move |store| store.append_payments(&entries))
            .await
    }

    async fn find(&self, account: &AccountId) -> Result<Vec<Payment>, StoreError> {
        let account = account.clone();
        let entries = self.read(|store| store.scan_payments()).await?;
        Ok(entries
            .into_iter()
            .filter(|payment| payment.is_active() && payment.account == account)
            .collect())
    }

    async fn find_all(&self) -> Result<Vec<Payment>, StoreError> {
        let entries = self.read(|store| store.scan_payments()).await?;
        Ok(entries.into_iter().filter(Payment::is_active).collect())
    }

    async fn mark_deleted(&self, id: PaymentId) -> Result<(), StoreError> {
        self.write(move |store| store.soft_delete_payment(id)).await
    }
}
