//! In-memory data access for testing.

use crate::access::DataAccess;
use crate::error::{StorageError, StorageResult};
use crate::record::Record;
use parking_lot::RwLock;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

/// An in-memory data access implementation.
///
/// Rows live in a key-ordered map, so by-parent and batch reads return a
/// deterministic order. Suitable for:
/// - Unit tests
/// - Integration tests
/// - Ephemeral metadata stores that don't need persistence
///
/// Every read and write call is counted, so tests can assert how many times
/// the transaction layer actually went to the store. Writes can be made to
/// fail on demand to exercise abort paths.
///
/// # Thread Safety
///
/// This implementation is thread-safe and can be shared across threads.
/// It does not simulate row locking; the transaction layer under test is
/// single-transaction anyway.
#[derive(Debug)]
pub struct InMemoryAccess<R: Record> {
    rows: RwLock<BTreeMap<R::Key, R>>,
    read_by_key_calls: AtomicU64,
    read_by_parent_calls: AtomicU64,
    read_by_key_batch_calls: AtomicU64,
    write_calls: AtomicU64,
    fail_writes: AtomicBool,
}

impl<R: Record> InMemoryAccess<R> {
    /// Creates a new empty in-memory access.
    #[must_use]
    pub fn new() -> Self {
        Self {
            rows: RwLock::new(BTreeMap::new()),
            read_by_key_calls: AtomicU64::new(0),
            read_by_parent_calls: AtomicU64::new(0),
            read_by_key_batch_calls: AtomicU64::new(0),
            write_calls: AtomicU64::new(0),
            fail_writes: AtomicBool::new(false),
        }
    }

    /// Inserts rows directly, bypassing the write path and its counters.
    ///
    /// Useful for arranging pre-existing store state in tests.
    pub fn seed(&self, records: impl IntoIterator<Item = R>) {
        let mut rows = self.rows.write();
        for record in records {
            rows.insert(record.key(), record);
        }
    }

    /// Returns a snapshot of all rows in key order.
    ///
    /// Useful for asserting post-flush store state.
    #[must_use]
    pub fn snapshot(&self) -> Vec<R> {
        self.rows.read().values().cloned().collect()
    }

    /// Returns whether a row exists for the given key.
    #[must_use]
    pub fn contains_key(&self, key: &R::Key) -> bool {
        self.rows.read().contains_key(key)
    }

    /// Makes all subsequent `write` calls fail.
    pub fn set_fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    /// Number of `read_by_key` calls issued so far.
    #[must_use]
    pub fn read_by_key_calls(&self) -> u64 {
        self.read_by_key_calls.load(Ordering::SeqCst)
    }

    /// Number of `read_by_parent` calls issued so far.
    #[must_use]
    pub fn read_by_parent_calls(&self) -> u64 {
        self.read_by_parent_calls.load(Ordering::SeqCst)
    }

    /// Number of `read_by_key_batch` calls issued so far.
    #[must_use]
    pub fn read_by_key_batch_calls(&self) -> u64 {
        self.read_by_key_batch_calls.load(Ordering::SeqCst)
    }

    /// Number of `write` calls issued so far, including failed ones.
    #[must_use]
    pub fn write_calls(&self) -> u64 {
        self.write_calls.load(Ordering::SeqCst)
    }

    /// Total number of read calls of any kind issued so far.
    #[must_use]
    pub fn total_read_calls(&self) -> u64 {
        self.read_by_key_calls() + self.read_by_parent_calls() + self.read_by_key_batch_calls()
    }
}

impl<R: Record> Default for InMemoryAccess<R> {
    fn default() -> Self {
        Self::new()
    }
}

impl<R: Record> DataAccess<R> for InMemoryAccess<R> {
    fn read_by_key(&self, key: &R::Key) -> StorageResult<Option<R>> {
        self.read_by_key_calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.rows.read().get(key).cloned())
    }

    fn read_by_parent(&self, parent: &R::ParentKey) -> StorageResult<Vec<R>> {
        self.read_by_parent_calls.fetch_add(1, Ordering::SeqCst);
        Ok(self
            .rows
            .read()
            .values()
            .filter(|r| &r.parent_key() == parent)
            .cloned()
            .collect())
    }

    fn read_by_key_batch(&self, keys: &[R::Key]) -> StorageResult<Vec<R>> {
        self.read_by_key_batch_calls.fetch_add(1, Ordering::SeqCst);
        let rows = self.rows.read();
        let mut wanted: Vec<&R::Key> = keys.iter().collect();
        wanted.sort();
        wanted.dedup();
        Ok(wanted
            .into_iter()
            .filter_map(|key| rows.get(key).cloned())
            .collect())
    }

    fn write(&self, removed: &[R::Key], added: &[R], modified: &[R]) -> StorageResult<()> {
        self.write_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(StorageError::write_failed("injected failure"));
        }

        // All three sets apply under one lock, so the write is all-or-nothing.
        let mut rows = self.rows.write();
        for key in removed {
            rows.remove(key);
        }
        for record in added.iter().chain(modified) {
            rows.insert(record.key(), record.clone());
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Clone, PartialEq, Eq)]
    struct Row {
        parent: u64,
        name: String,
        value: u32,
    }

    impl Record for Row {
        type Key = (u64, String);
        type ParentKey = u64;

        fn key(&self) -> Self::Key {
            (self.parent, self.name.clone())
        }

        fn parent_of(key: &Self::Key) -> Self::ParentKey {
            key.0
        }
    }

    fn row(parent: u64, name: &str, value: u32) -> Row {
        Row {
            parent,
            name: name.to_string(),
            value,
        }
    }

    #[test]
    fn read_by_key_counts_calls() {
        let access = InMemoryAccess::new();
        access.seed(vec![row(1, "a", 10)]);

        let found = access.read_by_key(&(1, "a".to_string())).unwrap();
        assert_eq!(found, Some(row(1, "a", 10)));

        let missing = access.read_by_key(&(1, "b".to_string())).unwrap();
        assert_eq!(missing, None);

        assert_eq!(access.read_by_key_calls(), 2);
    }

    #[test]
    fn read_by_parent_returns_key_order() {
        let access = InMemoryAccess::new();
        access.seed(vec![row(1, "b", 2), row(2, "c", 3), row(1, "a", 1)]);

        let rows = access.read_by_parent(&1).unwrap();
        assert_eq!(rows, vec![row(1, "a", 1), row(1, "b", 2)]);
        assert_eq!(access.read_by_parent_calls(), 1);
    }

    #[test]
    fn batch_skips_missing_keys() {
        let access = InMemoryAccess::new();
        access.seed(vec![row(1, "a", 1), row(1, "b", 2)]);

        let rows = access
            .read_by_key_batch(&[
                (1, "b".to_string()),
                (1, "missing".to_string()),
                (1, "a".to_string()),
            ])
            .unwrap();
        assert_eq!(rows, vec![row(1, "a", 1), row(1, "b", 2)]);
    }

    #[test]
    fn write_applies_all_sets() {
        let access = InMemoryAccess::new();
        access.seed(vec![row(1, "stale", 0), row(1, "kept", 5)]);

        access
            .write(
                &[(1, "stale".to_string())],
                &[row(1, "new", 7)],
                &[row(1, "kept", 6)],
            )
            .unwrap();

        assert_eq!(
            access.snapshot(),
            vec![row(1, "kept", 6), row(1, "new", 7)]
        );
        assert_eq!(access.write_calls(), 1);
    }

    #[test]
    fn injected_write_failure_changes_nothing() {
        let access = InMemoryAccess::new();
        access.seed(vec![row(1, "a", 1)]);
        access.set_fail_writes(true);

        let result = access.write(&[(1, "a".to_string())], &[], &[]);
        assert!(matches!(result, Err(StorageError::WriteFailed { .. })));
        assert!(access.contains_key(&(1, "a".to_string())));
    }
}
