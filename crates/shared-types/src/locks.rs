//! Per-key exclusive sections.
//!
//! A map entry lives only while some caller holds or waits on its lock. The
//! last guard to drop evicts it, so the map stays bounded by the number of
//! keys in concurrent use rather than every key ever seen.

use dashmap::DashMap;
use parking_lot::lock_api::ArcMutexGuard;
use parking_lot::{Mutex, RawMutex};
use std::hash::Hash;
use std::sync::Arc;

pub struct KeyedLocks<K: Eq + Hash + Clone> {
    locks: DashMap<K, Arc<Mutex<()>>>,
}

impl<K: Eq + Hash + Clone> KeyedLocks<K> {
    pub fn new() -> Self {
        Self {
            locks: DashMap::new(),
        }
    }

    /// Block until the section for `key` is free and enter it.
    pub fn lock(&self, key: &K) -> KeyGuard<'_, K> {
        let mutex = self.locks.entry(key.clone()).or_default().value().clone();
        KeyGuard {
            locks: self,
            key: key.clone(),
            guard: Some(mutex.lock_arc()),
        }
    }

    /// Keys with a live section.
    pub fn len(&self) -> usize {
        self.locks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.locks.is_empty()
    }
}

impl<K: Eq + Hash + Clone> Default for KeyedLocks<K> {
    fn default() -> Self {
        Self::new()
    }
}

pub struct KeyGuard<'a, K: Eq + Hash + Clone> {
    locks: &'a KeyedLocks<K>,
    key: K,
    guard: Option<ArcMutexGuard<RawMutex, ()>>,
}

impl<K: Eq + Hash + Clone> Drop for KeyGuard<'_, K> {
    fn drop(&mut self) {
        drop(self.guard.take());
        // Clones are only handed out under the shard lock `remove_if` holds,
        // so a count of one means nobody else can reach this mutex.
        self.locks
            .locks
            .remove_if(&self.key, |_, mutex| Arc::strong_count(mutex) == 1);
    }
}
