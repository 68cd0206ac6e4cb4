//! # Key-Value Store Port
//!
//! The transactional key/value contract the ledger and the privacy mapper
//! persist through.
//!
//! Production: `RocksDbStore` (proxy-runtime/adapters/storage/rocksdb_adapter.rs)
//! Testing: `InMemoryKVStore` (below)
//!
//! Methods take `&self`: stores are shared behind `Arc` by several services
//! and synchronize internally.

use crate::errors::StoreError;
use parking_lot::RwLock;
use std::collections::BTreeMap;

/// Abstract interface for key-value database operations.
pub trait KeyValueStore: Send + Sync {
    /// Get a value by key.
    fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>, StoreError>;

    /// Put a single key-value pair.
    fn put(&self, key: &[u8], value: &[u8]) -> Result<(), StoreError>;

    /// Delete a key. Deleting a missing key is not an error.
    fn delete(&self, key: &[u8]) -> Result<(), StoreError>;

    /// Execute an atomic batch write.
    ///
    /// Either ALL operations in the batch are applied, or NONE are.
    fn atomic_batch_write(&self, operations: Vec<BatchOperation>) -> Result<(), StoreError>;

    /// Check if a key exists.
    fn exists(&self, key: &[u8]) -> Result<bool, StoreError> {
        Ok(self.get(key)?.is_some())
    }

    /// All entries whose key starts with `prefix`, in ascending key order.
    fn prefix_scan(&self, prefix: &[u8]) -> Result<Vec<(Vec<u8>, Vec<u8>)>, StoreError>;
}

/// Batch operation for atomic writes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BatchOperation {
    /// Put a key-value pair.
    Put { key: Vec<u8>, value: Vec<u8> },
    /// Delete a key.
    Delete { key: Vec<u8> },
}

impl BatchOperation {
    /// Create a Put operation.
    pub fn put(key: impl Into<Vec<u8>>, value: impl Into<Vec<u8>>) -> Self {
        BatchOperation::Put {
            key: key.into(),
            value: value.into(),
        }
    }

    /// Create a Delete operation.
    pub fn delete(key: impl Into<Vec<u8>>) -> Self {
        BatchOperation::Delete { key: key.into() }
    }
}

/// In-memory key-value store.
///
/// A single write lock covers a whole batch, which makes batches atomic with
/// respect to concurrent readers.
#[derive(Debug, Default)]
pub struct InMemoryKVStore {
    data: RwLock<BTreeMap<Vec<u8>, Vec<u8>>>,
}

impl InMemoryKVStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.data.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.read().is_empty()
    }
}

impl KeyValueStore for InMemoryKVStore {
    fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>, StoreError> {
        Ok(self.data.read().get(key).cloned())
    }

    fn put(&self, key: &[u8], value: &[u8]) -> Result<(), StoreError> {
        self.data.write().insert(key.to_vec(), value.to_vec());
        Ok(())
    }

    fn delete(&self, key: &[u8]) -> Result<(), StoreError> {
        self.data.write().remove(key);
        Ok(())
    }

    fn atomic_batch_write(&self, operations: Vec<BatchOperation>) -> Result<(), StoreError> {
        let mut data = self.data.write();
        for op in operations {
            match op {
                BatchOperation::Put { key, value } => {
                    data.insert(key, value);
                }
                BatchOperation::Delete { key } => {
                    data.remove(&key);
                }
            }
        }
        Ok(())
    }

    fn exists(&self, key: &[u8]) -> Result<bool, StoreError> {
        Ok(self.data.read().contains_key(key))
    }

    fn prefix_scan(&self, prefix: &[u8]) -> Result<Vec<(Vec<u8>, Vec<u8>)>, StoreError> {
        let data = self.data.read();
        let results = data
            .range(prefix.to_vec()..)
            .take_while(|(k, _)| k.starts_with(prefix))
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect();
        Ok(results)
    }
}

/// Store that fails every write, for exercising error propagation.
#[cfg(any(test, feature = "test-utils"))]
#[derive(Debug, Default)]
pub struct FailingKVStore {
    inner: InMemoryKVStore,
}

#[cfg(any(test, feature = "test-utils"))]
impl FailingKVStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn refuse() -> StoreError {
        StoreError::Io {
            message: "write refused".to_string(),
        }
    }
}

#[cfg(any(test, feature = "test-utils"))]
impl KeyValueStore for FailingKVStore {
    fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>, StoreError> {
        self.inner.get(key)
    }

    fn put(&self, _key: &[u8], _value: &[u8]) -> Result<(), StoreError> {
        Err(Self::refuse())
    }

    fn delete(&self, _key: &[u8]) -> Result<(), StoreError> {
        Err(Self::refuse())
    }

    fn atomic_batch_write(&self, _operations: Vec<BatchOperation>) -> Result<(), StoreError> {
        Err(Self::refuse())
    }

    fn prefix_scan(&self, prefix: &[u8]) -> Result<Vec<(Vec<u8>, Vec<u8>)>, StoreError> {
        self.inner.prefix_scan(prefix)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_put_get_delete() {
        let store = InMemoryKVStore::new();
        store.put(b"a", b"1").unwrap();
        assert_eq!(store.get(b"a").unwrap(), Some(b"1".to_vec()));
        assert!(store.exists(b"a").unwrap());
        store.delete(b"a").unwrap();
        assert_eq!(store.get(b"a").unwrap(), None);
        // deleting twice is fine
        store.delete(b"a").unwrap();
    }

    #[test]
    fn test_batch_applies_all_operations() {
        let store = InMemoryKVStore::new();
        store.put(b"gone", b"x").unwrap();
        store
            .atomic_batch_write(vec![
                BatchOperation::put(b"k1".to_vec(), b"v1".to_vec()),
                BatchOperation::put(b"k2".to_vec(), b"v2".to_vec()),
                BatchOperation::delete(b"gone".to_vec()),
            ])
            .unwrap();
        assert_eq!(store.len(), 2);
        assert!(!store.exists(b"gone").unwrap());
    }

    #[test]
    fn test_prefix_scan_is_ordered_and_bounded() {
        let store = InMemoryKVStore::new();
        store.put(&[1, 3], b"c").unwrap();
        store.put(&[1, 1], b"a").unwrap();
        store.put(&[2, 0], b"z").unwrap();
        store.put(&[0, 9], b"y").unwrap();
        store.put(&[1, 2], b"b").unwrap();

        let hits = store.prefix_scan(&[1]).unwrap();
        let values: Vec<_> = hits.into_iter().map(|(_, v)| v).collect();
        assert_eq!(values, vec![b"a".to_vec(), b"b".to_vec(), b"c".to_vec()]);
    }

    #[test]
    fn test_failing_store_refuses_writes() {
        let store = FailingKVStore::new();
        assert!(store.put(b"a", b"1").is_err());
        assert!(store.atomic_batch_write(vec![]).is_err());
        assert_eq!(store.get(b"a").unwrap(), None);
    }
}
