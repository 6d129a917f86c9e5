//! Per-key async locks whose entries are dropped once nobody holds or
//! waits on them.

use std::collections::HashMap;
use std::hash::Hash;
use std::sync::{Arc, Mutex, MutexGuard};

use tokio::sync::OwnedMutexGuard;

type Entry = Arc<tokio::sync::Mutex<()>>;
type Table<K> = Arc<Mutex<HashMap<K, Entry>>>;

pub(crate) struct KeyedLocks<K> {
    table: Table<K>,
}

impl<K> Clone for KeyedLocks<K> {
    fn clone(&self) -> Self {
        Self {
            table: self.table.clone(),
        }
    }
}

impl<K> Default for KeyedLocks<K> {
    fn default() -> Self {
        Self {
            table: Arc::new(Mutex::new(HashMap::new())),
        }
    }
}

fn table<K>(table: &Mutex<HashMap<K, Entry>>) -> MutexGuard<'_, HashMap<K, Entry>> {
    table.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

impl<K: Eq + Hash + Clone> KeyedLocks<K> {
    /// Wait for exclusive access to `key`.
    pub(crate) async fn lock(&self, key: &K) -> KeyedGuard<K> {
        let entry = table(&self.table).entry(key.clone()).or_default().clone();
        let guard = entry.clone().lock_owned().await;
        KeyedGuard {
            guard: Some(guard),
            entry,
            key: key.clone(),
            table: self.table.clone(),
        }
    }

    /// Keys currently held or waited on.
    #[cfg(test)]
    pub(crate) fn len(&self) -> usize {
        table(&self.table).len()
    }
}

pub(crate) struct KeyedGuard<K: Eq + Hash> {
    guard: Option<OwnedMutexGuard<()>>,
    entry: Entry,
    key: K,
    table: Table<K>,
}

impl<K: Eq + Hash> Drop for KeyedGuard<K> {
    fn drop(&mut self) {
        drop(self.guard.take());
        let mut table = table(&self.table);
        // The table and this guard are the only owners: no one is waiting.
        if Arc::strong_count(&self.entry) == 2
            && table.get(&self.key).is_some_and(|e| Arc::ptr_eq(e, &self.entry))
        {
            table.remove(&self.key);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn released_keys_are_evicted() {
        let locks = KeyedLocks::<String>::default();
        for i in 0..100 {
            let _guard = locks.lock(&format!("user-{i}")).await;
            assert_eq!(locks.len(), 1);
        }
        assert_eq!(locks.len(), 0);
    }

    #[tokio::test]
    async fn waiter_keeps_entry_alive() {
        let locks = KeyedLocks::<&str>::default();
        let first = locks.lock(&"k").await;

        let waiter = {
            let locks = locks.clone();
            tokio::spawn(async move {
                let _guard = locks.lock(&"k").await;
            })
        };
        tokio::task::yield_now().await;
        tokio::task::yield_now().await;

        drop(first);
        waiter.await.unwrap();
        assert_eq!(locks.len(), 0);
    }

    #[tokio::test]
    async fn same_key_is_exclusive() {
        let locks = KeyedLocks::<u32>::default();
        let counter = Arc::new(Mutex::new((0u32, 0u32)));

        let mut tasks = tokio::task::JoinSet::new();
        for _ in 0..8 {
            let locks = locks.clone();
            let counter = counter.clone();
            tasks.spawn(async move {
                let _guard = locks.lock(&1).await;
                {
                    let mut c = counter.lock().unwrap();
                    c.0 += 1;
                    c.1 = c.1.max(c.0);
                }
                tokio::task::yield_now().await;
                counter.lock().unwrap().0 -= 1;
            });
        }
        while tasks.join_next().await.is_some() {}

        assert_eq!(counter.lock().unwrap().1, 1);
        assert_eq!(locks.len(), 0);
    }
}
