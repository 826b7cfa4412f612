use crate::domain::account::AccountId;
use crate::error::LockTimeout;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;
use tokio::sync::{OwnedRwLockReadGuard, OwnedRwLockWriteGuard, RwLock};
use tokio::time::{Instant, timeout_at};

type LockTable = Arc<Mutex<HashMap<AccountId, Arc<RwLock<()>>>>>;

/// Per-account lock table plus a snapshot gate.
///
/// Writers take the gate shared and then their accounts exclusively, always in
/// ascending `AccountId` order, so two writers that share an account serialize
/// on it and can never wait on each other in a cycle. Whole-store readers take
/// the gate exclusively and therefore only ever see fully committed writes.
///
/// A table entry lives only while some guard or waiter references it, so the
/// table never outgrows the set of accounts currently in use.
#[derive(Default)]
pub struct AccountLocks {
    gate: Arc<RwLock<()>>,
    table: LockTable,
}

/// One account's guard. Releases the lock, then drops the table entry if
/// nobody else is holding or waiting on it.
struct Entry<G> {
    guard: Option<G>,
    id: AccountId,
    table: LockTable,
}

impl<G> Drop for Entry<G> {
    fn drop(&mut self) {
        drop(self.guard.take());
        prune(&self.table, &self.id);
    }
}

fn prune(table: &LockTable, id: &AccountId) {
    // Handles are only cloned under this mutex, so a count of one cannot race
    // with a new waiter.
    let mut table = table.lock().unwrap_or_else(PoisonError::into_inner);
    if table
        .get(id)
        .is_some_and(|lock| Arc::strong_count(lock) == 1)
    {
        table.remove(id);
    }
}

/// Held for the duration of a write that touches one or more accounts.
pub struct ExclusiveGuard {
    _accounts: Vec<Entry<OwnedRwLockWriteGuard<()>>>,
    _gate: OwnedRwLockReadGuard<()>,
}

/// Held while reading a single account's state.
pub struct SharedGuard {
    _account: Entry<OwnedRwLockReadGuard<()>>,
}

/// Held while taking a snapshot of a whole store.
pub struct SnapshotGuard {
    _gate: OwnedRwLockWriteGuard<()>,
}

impl AccountLocks {
    pub fn new() -> Self {
        Self::default()
    }

    fn handle(&self, id: &AccountId) -> Arc<RwLock<()>> {
        // The table mutex is never held across an await point.
        let mut table = self.table.lock().unwrap_or_else(PoisonError::into_inner);
        table.entry(id.clone()).or_default().clone()
    }

    fn entry<G>(&self, id: &AccountId, guard: G) -> Entry<G> {
        Entry {
            guard: Some(guard),
            id: id.clone(),
            table: self.table.clone(),
        }
    }

    /// Locks every id in `ids` exclusively. Duplicates are collapsed.
    ///
    /// `wait` bounds the whole acquisition, not each lock.
    pub async fn exclusive(
        &self,
        ids: &[&AccountId],
        wait: Duration,
    ) -> Result<ExclusiveGuard, LockTimeout> {
        let mut ordered = ids.to_vec();
        ordered.sort();
        ordered.dedup();

        let deadline = Instant::now() + wait;
        let gate = timeout_at(deadline, self.gate.clone().read_owned())
            .await
            .map_err(|_| LockTimeout(wait))?;

        let mut accounts = Vec::with_capacity(ordered.len());
        for id in ordered {
            let acquired = timeout_at(deadline, self.handle(id).write_owned()).await;
            match acquired {
                Ok(guard) => accounts.push(self.entry(id, guard)),
                Err(_) => {
                    prune(&self.table, id);
                    return Err(LockTimeout(wait));
                }
            }
        }

        Ok(ExclusiveGuard {
            _accounts: accounts,
            _gate: gate,
        })
    }

    pub async fn shared(&self, id: &AccountId, wait: Duration) -> Result<SharedGuard, LockTimeout> {
        let acquired = tokio::time::timeout(wait, self.handle(id).read_owned()).await;
        match acquired {
            Ok(guard) => Ok(SharedGuard {
                _account: self.entry(id, guard),
            }),
            Err(_) => {
                prune(&self.table, id);
                Err(LockTimeout(wait))
            }
        }
    }

    pub async fn snapshot(&self, wait: Duration) -> Result<SnapshotGuard, LockTimeout> {
        let guard = tokio::time::timeout(wait, self.gate.clone().write_owned())
            .await
            .map_err(|_| LockTimeout(wait))?;
        Ok(SnapshotGuard { _gate: guard })
    }

    /// Number of accounts currently locked or waited on.
    pub fn tracked(&self) -> usize {
        self.table
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }
}
