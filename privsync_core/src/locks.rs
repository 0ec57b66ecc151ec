//! Per-principal serialization
//!
//! Two concurrent reconciliation calls may target the same principal (one
//! adjusting table privileges, another role membership). Every
//! read-diff-write sequence holds the lock for that principal's canonical
//! text so the sequences serialize.
//!
//! Contract: [`KeyedLocks::acquire`] waits for exclusivity and returns a
//! guard; release happens on guard drop, so releasing a lock that was never
//! acquired is unrepresentable. Locks are created lazily and retained for
//! the life of the process; principal cardinality is bounded by the
//! configuration, not by process lifetime.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use tokio::sync::OwnedMutexGuard;

/// A lazily-populated map of named async mutexes.
#[derive(Debug, Default)]
pub struct KeyedLocks {
    locks: Mutex<HashMap<String, Arc<tokio::sync::Mutex<()>>>>,
}

impl KeyedLocks {
    /// New, empty lock set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Wait for exclusive access to `key`. The returned guard releases the
    /// lock when dropped.
    pub async fn acquire(&self, key: &str) -> OwnedMutexGuard<()> {
        let lock = {
            let mut locks = self.locks.lock().unwrap();
            locks
                .entry(key.to_owned())
                .or_insert_with(|| Arc::new(tokio::sync::Mutex::new(())))
                .clone()
        };
        lock.lock_owned().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    #[tokio::test]
    async fn test_same_key_serializes() {
        let locks = Arc::new(KeyedLocks::new());
        let in_section = Arc::new(AtomicUsize::new(0));

        let mut handles = vec![];
        for _ in 0..4 {
            let locks = locks.clone();
            let in_section = in_section.clone();
            handles.push(tokio::spawn(async move {
                let _guard = locks.acquire("'u'@'h'").await;
                assert_eq!(in_section.fetch_add(1, Ordering::SeqCst), 0);
                tokio::time::sleep(Duration::from_millis(5)).await;
                in_section.fetch_sub(1, Ordering::SeqCst);
            }));
        }
        for handle in handles {
            handle.await.unwrap();
        }
    }

    #[tokio::test]
    async fn test_distinct_keys_do_not_contend() {
        let locks = KeyedLocks::new();
        let _a = locks.acquire("'a'@'%'").await;
        // Would deadlock if keys shared a mutex.
        let _b = locks.acquire("'b'@'%'").await;
    }

    #[tokio::test]
    async fn test_guard_drop_releases() {
        let locks = KeyedLocks::new();
        {
            let _guard = locks.acquire("'u'@'h'").await;
        }
        let _again = locks.acquire("'u'@'h'").await;
    }
}
