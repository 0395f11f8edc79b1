//! Transaction-scoped entity context registry.

use crate::context::{ContextStats, EntityContext};
use crate::error::TxResult;
use crate::meta_log::MetaLogEntry;
use crate::types::InodeId;
use crate::xattr::{StoredXAttr, XAttrFeature, XAttrKey};
use namedb_storage::DataAccess;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

/// The registry of entity contexts for one in-flight transaction.
///
/// This is the explicit transaction handle every operation receives: it
/// routes find/add/remove calls to the entity context registered for the
/// relevant entity type, owns the transaction-scoped lifetime of all
/// contexts, and carries the per-transaction attachment cache for inode
/// features. The entity-type set is closed, so routing is a typed accessor
/// rather than dynamic dispatch.
///
/// Like the contexts it owns, a `TransactionContext` is confined to one
/// transaction and is not shared across threads.
pub struct TransactionContext {
    xattrs: EntityContext<StoredXAttr>,
    meta_log: EntityContext<MetaLogEntry>,
    xattr_access: Arc<dyn DataAccess<StoredXAttr>>,
    meta_log_access: Arc<dyn DataAccess<MetaLogEntry>>,
    features: HashMap<InodeId, XAttrFeature>,
}

impl TransactionContext {
    /// Creates a registry over the given data access handles.
    pub fn new(
        xattr_access: Arc<dyn DataAccess<StoredXAttr>>,
        meta_log_access: Arc<dyn DataAccess<MetaLogEntry>>,
    ) -> Self {
        Self {
            xattrs: EntityContext::new(),
            meta_log: EntityContext::new(),
            xattr_access,
            meta_log_access,
            features: HashMap::new(),
        }
    }

    /// Exact-key attribute lookup.
    ///
    /// # Errors
    ///
    /// Returns a storage error if a backing read fails.
    pub fn find_xattr(&mut self, key: &XAttrKey) -> TxResult<Option<StoredXAttr>> {
        self.xattrs.find(self.xattr_access.as_ref(), key)
    }

    /// All attributes of one inode, in key order.
    ///
    /// # Errors
    ///
    /// Returns a storage error if a backing read fails.
    pub fn xattrs_by_inode(&mut self, inode_id: InodeId) -> TxResult<Vec<StoredXAttr>> {
        self.xattrs
            .find_by_parent(self.xattr_access.as_ref(), &inode_id)
    }

    /// An explicit batch of attributes by primary key.
    ///
    /// # Errors
    ///
    /// Returns a storage error if a backing read fails.
    pub fn xattrs_by_keys(&mut self, keys: &[XAttrKey]) -> TxResult<Vec<StoredXAttr>> {
        self.xattrs
            .find_by_key_batch(self.xattr_access.as_ref(), keys)
    }

    /// Stages an attribute insert (or upsert over an existing row).
    ///
    /// # Errors
    ///
    /// Returns a mutation conflict as described on
    /// [`EntityContext::add`](crate::context::EntityContext::add).
    pub fn add_xattr(&mut self, stored: StoredXAttr) -> TxResult<()> {
        self.xattrs.add(stored)
    }

    /// Stages an attribute removal.
    ///
    /// # Errors
    ///
    /// Returns a mutation conflict as described on
    /// [`EntityContext::remove`](crate::context::EntityContext::remove).
    pub fn remove_xattr(&mut self, stored: StoredXAttr) -> TxResult<()> {
        self.xattrs.remove(stored)
    }

    /// Stages an update to a cached attribute.
    ///
    /// # Errors
    ///
    /// Returns a mutation conflict as described on
    /// [`EntityContext::modify`](crate::context::EntityContext::modify).
    pub fn modify_xattr(&mut self, stored: StoredXAttr) -> TxResult<()> {
        self.xattrs.modify(stored)
    }

    /// Stages a metadata log entry. The log is append-only.
    ///
    /// # Errors
    ///
    /// Returns a mutation conflict if an entry with the same key was
    /// already staged.
    pub fn add_log_entry(&mut self, entry: MetaLogEntry) -> TxResult<()> {
        self.meta_log.add(entry)
    }

    /// Returns the attribute feature attached to an inode, attaching it on
    /// first access.
    ///
    /// At most one feature instance exists per inode per transaction; a
    /// second call returns the instance attached by the first. The inode
    /// object itself is never touched.
    pub fn xattr_feature(&mut self, inode_id: InodeId) -> XAttrFeature {
        *self
            .features
            .entry(inode_id)
            .or_insert_with(|| XAttrFeature::new(inode_id))
    }

    /// Number of inodes with an attached feature in this transaction.
    #[must_use]
    pub fn attached_feature_count(&self) -> usize {
        self.features.len()
    }

    /// Cache statistics of the attribute context.
    #[must_use]
    pub fn xattr_stats(&self) -> &ContextStats {
        self.xattrs.stats()
    }

    /// Cache statistics of the metadata log context.
    #[must_use]
    pub fn meta_log_stats(&self) -> &ContextStats {
        self.meta_log.stats()
    }

    /// Returns whether any context has staged mutations.
    #[must_use]
    pub fn is_dirty(&self) -> bool {
        self.xattrs.is_dirty() || self.meta_log.is_dirty()
    }

    /// Flushes every context's staged mutations to the backing store.
    ///
    /// Called once, at commit time, after all locks are acquired and all
    /// mutations staged.
    ///
    /// # Errors
    ///
    /// Propagates the first flush failure; the enclosing transaction must
    /// then abort.
    pub fn prepare(&mut self) -> TxResult<()> {
        self.xattrs.prepare(self.xattr_access.as_ref())?;
        self.meta_log.prepare(self.meta_log_access.as_ref())?;
        Ok(())
    }

    #[cfg(test)]
    pub(crate) fn staged_meta_log_entries(
        &mut self,
        inode_id: InodeId,
    ) -> TxResult<Vec<MetaLogEntry>> {
        self.meta_log
            .find_by_parent(self.meta_log_access.as_ref(), &inode_id)
    }

    /// Drops all caches, staged mutations, and attached features.
    ///
    /// Called exactly once at transaction end, success or failure.
    pub fn clear(&mut self) {
        self.xattrs.clear();
        self.meta_log.clear();
        self.features.clear();
    }
}

// The access handles are trait objects without a `Debug` bound; render the
// contexts and the attachment count instead.
impl fmt::Debug for TransactionContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TransactionContext")
            .field("xattrs", &self.xattrs)
            .field("meta_log", &self.meta_log)
            .field("attached_features", &self.features.len())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::xattr::XAttrNamespace;
    use namedb_storage::{InMemoryAccess, Record};

    fn registry() -> (
        TransactionContext,
        Arc<InMemoryAccess<StoredXAttr>>,
        Arc<InMemoryAccess<MetaLogEntry>>,
    ) {
        let xattr_access = Arc::new(InMemoryAccess::new());
        let meta_log_access = Arc::new(InMemoryAccess::new());
        let ctx = TransactionContext::new(xattr_access.clone(), meta_log_access.clone());
        (ctx, xattr_access, meta_log_access)
    }

    fn stored(inode: u64, name: &str, value: &[u8]) -> StoredXAttr {
        StoredXAttr::new(
            InodeId::new(inode),
            XAttrNamespace::User,
            name,
            value.to_vec(),
        )
    }

    #[test]
    fn routes_finds_to_the_xattr_context() {
        let (mut ctx, xattr_access, _) = registry();
        xattr_access.seed(vec![stored(1, "a", b"1")]);

        let listed = ctx.xattrs_by_inode(InodeId::new(1)).unwrap();
        assert_eq!(listed, vec![stored(1, "a", b"1")]);
        assert_eq!(ctx.xattr_stats().misses(), 1);

        ctx.xattrs_by_inode(InodeId::new(1)).unwrap();
        assert_eq!(ctx.xattr_stats().hits(), 1);
        assert_eq!(xattr_access.read_by_parent_calls(), 1);
    }

    #[test]
    fn feature_attaches_once_per_inode() {
        let (mut ctx, _, _) = registry();

        let first = ctx.xattr_feature(InodeId::new(7));
        let second = ctx.xattr_feature(InodeId::new(7));
        assert_eq!(first, second);
        assert_eq!(ctx.attached_feature_count(), 1);

        ctx.xattr_feature(InodeId::new(8));
        assert_eq!(ctx.attached_feature_count(), 2);
    }

    #[test]
    fn prepare_flushes_every_dirty_context() {
        let (mut ctx, xattr_access, meta_log_access) = registry();

        ctx.add_xattr(stored(1, "a", b"1")).unwrap();
        ctx.add_log_entry(MetaLogEntry::new(
            crate::types::DatasetId::new(1),
            InodeId::new(1),
            crate::types::LogicalTime::new(1),
            XAttrNamespace::User,
            "a",
            crate::meta_log::LogOperation::AddXAttr,
        ))
        .unwrap();
        ctx.prepare().unwrap();

        assert_eq!(xattr_access.write_calls(), 1);
        assert_eq!(meta_log_access.write_calls(), 1);
        assert!(xattr_access.contains_key(&stored(1, "a", b"1").key()));
    }

    #[test]
    fn debug_output_skips_the_access_handles() {
        let (mut ctx, _, _) = registry();
        ctx.xattr_feature(InodeId::new(1));

        let rendered = format!("{ctx:?}");
        assert!(rendered.contains("TransactionContext"));
        assert!(rendered.contains("attached_features: 1"));
        assert!(!rendered.contains("access"));
    }

    #[test]
    fn clear_drops_features_and_caches() {
        let (mut ctx, xattr_access, _) = registry();
        xattr_access.seed(vec![stored(1, "a", b"1")]);

        ctx.xattrs_by_inode(InodeId::new(1)).unwrap();
        ctx.xattr_feature(InodeId::new(1));
        ctx.clear();

        assert_eq!(ctx.attached_feature_count(), 0);
        assert_eq!(ctx.xattr_stats().hits() + ctx.xattr_stats().misses(), 0);
        assert!(!ctx.is_dirty());
    }
}
