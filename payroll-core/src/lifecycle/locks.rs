use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};

use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};

type LockMap = Mutex<HashMap<i64, Arc<AsyncMutex<()>>>>;

/// Per-entity async locks. Always taken account first, then employee.
///
/// An entry lives only while someone holds or waits for it.
#[derive(Default)]
pub(crate) struct EntityLocks {
    accounts: LockMap,
    employees: LockMap,
}

/// One held entity lock. Releasing it drops the map entry once nobody else
/// holds a handle to the same mutex.
struct Held<'a> {
    map: &'a LockMap,
    id: i64,
    guard: Option<OwnedMutexGuard<()>>,
}

impl<'a> Held<'a> {
    async fn acquire(map: &'a LockMap, id: i64) -> Self {
        let mutex = {
            let mut locks = map.lock().unwrap_or_else(PoisonError::into_inner);
            locks.entry(id).or_default().clone()
        };
        Held {
            map,
            id,
            guard: Some(mutex.lock_owned().await),
        }
    }
}

impl Drop for Held<'_> {
    fn drop(&mut self) {
        drop(self.guard.take());
        // Handles are cloned under this lock, so a count of one means the
        // map holds the last reference.
        let mut locks = self.map.lock().unwrap_or_else(PoisonError::into_inner);
        if locks
            .get(&self.id)
            .is_some_and(|mutex| Arc::strong_count(mutex) == 1)
        {
            locks.remove(&self.id);
        }
    }
}

/// Holds the locks until dropped. Fields drop in declaration order, so the
/// employee lock is released first.
pub(crate) struct EntityGuard<'a> {
    _employee: Option<Held<'a>>,
    _account: Held<'a>,
}

impl EntityLocks {
    pub(crate) async fn account(&self, account_id: i64) -> EntityGuard<'_> {
        let account = Held::acquire(&self.accounts, account_id).await;
        EntityGuard {
            _employee: None,
            _account: account,
        }
    }

    pub(crate) async fn account_and_employee(
        &self,
        account_id: i64,
        employee_id: i64,
    ) -> EntityGuard<'_> {
        let account = Held::acquire(&self.accounts, account_id).await;
        let employee = Held::acquire(&self.employees, employee_id).await;
        EntityGuard {
            _employee: Some(employee),
            _account: account,
        }
    }

    #[cfg(test)]
    fn tracked(&self) -> (usize, usize) {
        let count = |map: &LockMap| map.lock().unwrap_or_else(PoisonError::into_inner).len();
        (count(&self.accounts), count(&self.employees))
    }
}
