//! Per-transaction, per-entity-type cache and staging area.

use crate::context::slot::{EntityState, Slot};
use crate::context::stats::ContextStats;
use crate::error::{TxError, TxResult};
use namedb_storage::{DataAccess, Record};
use std::collections::{HashMap, HashSet};
use tracing::{debug, trace};

/// A per-transaction cache over one entity type.
///
/// The context gives the transaction a private, consistent view of the
/// backing store: reads populate the cache (and, through the store's
/// pessimistic locking, pin the rows they touch), mutations are staged
/// locally, and `prepare` flushes everything in one bulk write at commit.
///
/// Within the transaction, reads observe all prior staged mutations
/// (read-your-writes) before any flush happens.
///
/// Contexts are confined to a single transaction and are not thread-safe;
/// cross-transaction consistency comes entirely from the backing store's
/// row locks.
#[derive(Debug)]
pub struct EntityContext<R: Record> {
    /// Exact-key cache, including cached not-found outcomes.
    slots: HashMap<R::Key, Slot<R>>,
    /// Fully-resolved by-parent queries. Presence of a parent key means the
    /// parent's complete record set is cached; an empty vec is a valid,
    /// cacheable answer distinct from "not yet queried".
    by_parent: HashMap<R::ParentKey, Vec<R::Key>>,
    stats: ContextStats,
    prepared: bool,
}

impl<R: Record> EntityContext<R> {
    /// Creates an empty context.
    #[must_use]
    pub fn new() -> Self {
        Self {
            slots: HashMap::new(),
            by_parent: HashMap::new(),
            stats: ContextStats::new(),
            prepared: false,
        }
    }

    /// Exact-key lookup.
    ///
    /// On a cache hit the backing store is not consulted. A miss issues a
    /// single-key read and caches the outcome either way, so a key that
    /// does not exist is only ever read once per transaction. A key whose
    /// parent has already been fully resolved is answered from the resolved
    /// set without a store read.
    ///
    /// # Errors
    ///
    /// Returns a storage error if the backing read fails.
    pub fn find(&mut self, da: &dyn DataAccess<R>, key: &R::Key) -> TxResult<Option<R>> {
        if let Some(slot) = self.slots.get(key) {
            self.stats.record_hit();
            trace!(?key, "entity cache hit");
            return Ok(slot.live().cloned());
        }

        let parent = R::parent_of(key);
        if self.by_parent.contains_key(&parent) {
            // The parent's full set is cached, so this key has no row.
            self.stats.record_hit();
            trace!(?key, "entity cache hit via resolved parent");
            self.slots.insert(key.clone(), Slot::Absent);
            return Ok(None);
        }

        self.stats.record_miss();
        self.stats.record_backing_read();
        trace!(?key, "entity cache miss");
        let fetched = da.read_by_key(key)?;
        match &fetched {
            Some(record) => {
                self.index_key(&record.parent_key(), key);
                self.slots.insert(key.clone(), Slot::clean(record.clone()));
            }
            None => {
                self.slots.insert(key.clone(), Slot::Absent);
            }
        }
        Ok(fetched)
    }

    /// Finder: all entities attached to one parent, in key order.
    ///
    /// The first call for a given parent reads the backing store and
    /// resolves the parent in full; every later call in the same
    /// transaction is served from cache, even when the set is empty, and
    /// reflects all mutations staged since.
    ///
    /// # Errors
    ///
    /// Returns a storage error if the backing read fails.
    pub fn find_by_parent(
        &mut self,
        da: &dyn DataAccess<R>,
        parent: &R::ParentKey,
    ) -> TxResult<Vec<R>> {
        if self.by_parent.contains_key(parent) {
            self.stats.record_hit();
            trace!(?parent, "by-parent cache hit");
        } else {
            self.stats.record_miss();
            self.stats.record_backing_read();
            trace!(?parent, "by-parent cache miss");
            let fetched = da.read_by_parent(parent)?;

            // Entities staged before the first by-parent query belong to
            // the resolved set as well.
            let mut keys: Vec<R::Key> = self
                .slots
                .keys()
                .filter(|key| &R::parent_of(key) == parent)
                .cloned()
                .collect();
            for record in fetched {
                let key = record.key();
                if !keys.contains(&key) {
                    keys.push(key.clone());
                }
                self.slots.entry(key).or_insert(Slot::clean(record));
            }
            keys.sort();
            self.by_parent.insert(parent.clone(), keys);
        }
        Ok(self.collect_live(parent))
    }

    /// Finder: an explicit batch of entities by primary key.
    ///
    /// Only keys not already cached are read from the store, in a single
    /// batch call; requested keys with no backing row are cached as
    /// not-found. Results follow the caller's key order.
    ///
    /// # Errors
    ///
    /// Returns a storage error if the backing read fails.
    pub fn find_by_key_batch(
        &mut self,
        da: &dyn DataAccess<R>,
        keys: &[R::Key],
    ) -> TxResult<Vec<R>> {
        let mut to_fetch: Vec<R::Key> = Vec::new();
        for key in keys {
            if self.slots.contains_key(key) {
                self.stats.record_hit();
                continue;
            }
            if self.by_parent.contains_key(&R::parent_of(key)) {
                self.stats.record_hit();
                self.slots.insert(key.clone(), Slot::Absent);
                continue;
            }
            self.stats.record_miss();
            to_fetch.push(key.clone());
        }

        if !to_fetch.is_empty() {
            self.stats.record_backing_read();
            trace!(count = to_fetch.len(), "batch cache miss");
            let fetched = da.read_by_key_batch(&to_fetch)?;
            let mut found: HashSet<R::Key> = HashSet::with_capacity(fetched.len());
            for record in fetched {
                let key = record.key();
                found.insert(key.clone());
                self.index_key(&record.parent_key(), &key);
                self.slots.insert(key, Slot::clean(record));
            }
            for key in to_fetch {
                if !found.contains(&key) {
                    self.slots.insert(key, Slot::Absent);
                }
            }
        }

        Ok(keys
            .iter()
            .filter_map(|key| self.slots.get(key).and_then(Slot::live).cloned())
            .collect())
    }

    /// Stages an entity for insertion.
    ///
    /// Adding over an existing live entity acts as an upsert and is staged
    /// as a modification. Adding over an entity removed earlier in the same
    /// transaction is a mutation conflict.
    ///
    /// # Errors
    ///
    /// Returns a mutation conflict or invalid-operation error as described.
    pub fn add(&mut self, record: R) -> TxResult<()> {
        self.ensure_not_prepared()?;
        let key = record.key();
        let parent = record.parent_key();
        match self.slots.get(&key).map(Slot::state) {
            Some(Some(EntityState::Removed)) => {
                return Err(TxError::mutation_conflict(format!(
                    "cannot add {key:?}: entity was removed in this transaction"
                )));
            }
            // Never seen, known absent, or re-staging a pending insert.
            None | Some(None) | Some(Some(EntityState::Added)) => {
                self.slots.insert(key.clone(), Slot::added(record));
            }
            Some(Some(EntityState::Clean | EntityState::Modified)) => {
                self.slots.insert(key.clone(), Slot::modified(record));
            }
        }
        self.index_key(&parent, &key);
        Ok(())
    }

    /// Stages an entity for removal.
    ///
    /// Removing an entity added earlier in the same transaction cancels
    /// both mutations: the key becomes a cached not-found and the flush
    /// carries neither a write nor a delete. Removing an entity already
    /// removed, or one known to be absent, is a mutation conflict.
    ///
    /// # Errors
    ///
    /// Returns a mutation conflict or invalid-operation error as described.
    pub fn remove(&mut self, record: R) -> TxResult<()> {
        self.ensure_not_prepared()?;
        let key = record.key();
        let parent = record.parent_key();
        match self.slots.get(&key).map(Slot::state) {
            Some(Some(EntityState::Added)) => {
                self.slots.insert(key.clone(), Slot::Absent);
            }
            Some(Some(EntityState::Removed)) => {
                return Err(TxError::mutation_conflict(format!(
                    "cannot remove {key:?}: entity was already removed in this transaction"
                )));
            }
            Some(None) => {
                return Err(TxError::mutation_conflict(format!(
                    "cannot remove {key:?}: entity does not exist"
                )));
            }
            Some(Some(EntityState::Clean | EntityState::Modified)) => {
                let current = self
                    .slots
                    .get(&key)
                    .and_then(Slot::live)
                    .cloned()
                    .unwrap_or(record);
                self.slots.insert(key.clone(), Slot::removed(current));
            }
            None => {
                if self.by_parent.contains_key(&parent) {
                    // The parent is fully resolved, so the key has no row.
                    return Err(TxError::mutation_conflict(format!(
                        "cannot remove {key:?}: entity does not exist"
                    )));
                }
                // Unread key: stage a blind delete; the store treats delete
                // of a missing row as a no-op.
                self.slots.insert(key.clone(), Slot::removed(record));
            }
        }
        self.index_key(&parent, &key);
        Ok(())
    }

    /// Stages an update to an entity already in cache.
    ///
    /// # Errors
    ///
    /// Returns a mutation conflict if the entity was never read, is known
    /// absent, or was removed in this transaction.
    pub fn modify(&mut self, record: R) -> TxResult<()> {
        self.ensure_not_prepared()?;
        let key = record.key();
        let parent = record.parent_key();
        match self.slots.get(&key).map(Slot::state) {
            None | Some(None) => {
                return Err(TxError::mutation_conflict(format!(
                    "cannot modify {key:?}: entity is not in this transaction's cache"
                )));
            }
            Some(Some(EntityState::Removed)) => {
                return Err(TxError::mutation_conflict(format!(
                    "cannot modify {key:?}: entity was removed in this transaction"
                )));
            }
            // A modified pending insert is still an insert at flush time.
            Some(Some(EntityState::Added)) => {
                self.slots.insert(key.clone(), Slot::added(record));
            }
            Some(Some(EntityState::Clean | EntityState::Modified)) => {
                self.slots.insert(key.clone(), Slot::modified(record));
            }
        }
        self.index_key(&parent, &key);
        Ok(())
    }

    /// Flushes all staged mutations to the backing store in one bulk write.
    ///
    /// Called at most once per transaction, at commit time, after all locks
    /// have been acquired and all mutations staged. Clean entities and
    /// cached not-founds are never flushed; if nothing is staged, the store
    /// is not called at all.
    ///
    /// # Errors
    ///
    /// Returns an invalid-operation error on a second call, a consistency
    /// violation if the cache invariants are broken, or the storage error
    /// from the failed write (which aborts the whole transaction).
    pub fn prepare(&mut self, da: &dyn DataAccess<R>) -> TxResult<()> {
        if self.prepared {
            return Err(TxError::invalid_operation("context already prepared"));
        }
        self.verify_consistency()?;
        self.prepared = true;

        let mut removed: Vec<R::Key> = Vec::new();
        let mut added: Vec<R> = Vec::new();
        let mut modified: Vec<R> = Vec::new();
        for slot in self.slots.values() {
            if let Slot::Present { record, state } = slot {
                match state {
                    EntityState::Clean => {}
                    EntityState::Added => added.push(record.clone()),
                    EntityState::Modified => modified.push(record.clone()),
                    EntityState::Removed => removed.push(record.key()),
                }
            }
        }
        if removed.is_empty() && added.is_empty() && modified.is_empty() {
            return Ok(());
        }

        // Deterministic flush order.
        removed.sort();
        added.sort_by_key(Record::key);
        modified.sort_by_key(Record::key);
        debug!(
            removed = removed.len(),
            added = added.len(),
            modified = modified.len(),
            "flushing staged mutations"
        );
        da.write(&removed, &added, &modified)?;
        Ok(())
    }

    /// Drops all caches and staged mutations.
    ///
    /// Called exactly once at transaction end, success or failure; the
    /// context afterwards is indistinguishable from a freshly constructed
    /// one, so nothing leaks into a transaction reusing the instance.
    pub fn clear(&mut self) {
        self.slots.clear();
        self.by_parent.clear();
        self.stats.reset();
        self.prepared = false;
    }

    /// Returns cache statistics for this context.
    #[must_use]
    pub fn stats(&self) -> &ContextStats {
        &self.stats
    }

    /// Returns whether any mutation is staged for flush.
    #[must_use]
    pub fn is_dirty(&self) -> bool {
        self.slots.values().any(|slot| {
            matches!(
                slot.state(),
                Some(EntityState::Added | EntityState::Removed | EntityState::Modified)
            )
        })
    }

    /// Number of keys with a cached outcome, not-founds included.
    #[must_use]
    pub fn cached_key_count(&self) -> usize {
        self.slots.len()
    }

    /// Central index maintenance: every code path that learns about or
    /// mutates a key for an already-resolved parent goes through here.
    fn index_key(&mut self, parent: &R::ParentKey, key: &R::Key) {
        if let Some(keys) = self.by_parent.get_mut(parent) {
            if !keys.contains(key) {
                keys.push(key.clone());
                keys.sort();
            }
        }
    }

    fn collect_live(&self, parent: &R::ParentKey) -> Vec<R> {
        self.by_parent
            .get(parent)
            .map(|keys| {
                keys.iter()
                    .filter_map(|key| self.slots.get(key).and_then(Slot::live).cloned())
                    .collect()
            })
            .unwrap_or_default()
    }

    fn ensure_not_prepared(&self) -> TxResult<()> {
        if self.prepared {
            Err(TxError::invalid_operation(
                "cannot stage mutations after prepare",
            ))
        } else {
            Ok(())
        }
    }

    /// Every indexed key must resolve to a cached slot under the right
    /// parent. Breakage here is a fatal internal invariant failure.
    fn verify_consistency(&self) -> TxResult<()> {
        for (parent, keys) in &self.by_parent {
            for key in keys {
                if !self.slots.contains_key(key) {
                    return Err(TxError::consistency_violation(format!(
                        "index entry {key:?} under parent {parent:?} has no cached slot"
                    )));
                }
                if &R::parent_of(key) != parent {
                    return Err(TxError::consistency_violation(format!(
                        "index entry {key:?} filed under wrong parent {parent:?}"
                    )));
                }
            }
        }
        Ok(())
    }
}

impl<R: Record> Default for EntityContext<R> {
    fn default() -> Self {
        Self::new()
    }
}
