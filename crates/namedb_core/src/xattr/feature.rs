//! Per-inode extended attribute view.

use crate::error::TxResult;
use crate::transaction::TransactionContext;
use crate::types::InodeId;
use crate::xattr::{StoredXAttr, XAttr, XAttrKey};

/// A lazily attached, per-inode view over the inode's extended attributes.
///
/// Obtained through
/// [`TransactionContext::xattr_feature`], which attaches at most one
/// instance per inode per transaction. The feature owns the mapping
/// between the wire-facing [`XAttr`] shape and the stored row shape; all
/// access routes through the registry, so reads and writes land in the
/// attribute entity context like any other.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct XAttrFeature {
    inode_id: InodeId,
}

impl XAttrFeature {
    pub(crate) fn new(inode_id: InodeId) -> Self {
        Self { inode_id }
    }

    /// The inode this feature is attached to.
    #[must_use]
    pub fn inode_id(&self) -> InodeId {
        self.inode_id
    }

    /// Looks up one attribute by namespace and name.
    ///
    /// # Errors
    ///
    /// Returns a storage error if a backing read fails.
    pub fn get(&self, ctx: &mut TransactionContext, attr: &XAttr) -> TxResult<Option<XAttr>> {
        let found = ctx.find_xattr(&self.key_of(attr))?;
        Ok(found.map(|stored| stored.to_attr()))
    }

    /// Looks up an explicit list of attributes.
    ///
    /// # Errors
    ///
    /// Returns a storage error if a backing read fails.
    pub fn get_many(&self, ctx: &mut TransactionContext, attrs: &[XAttr]) -> TxResult<Vec<XAttr>> {
        let keys: Vec<XAttrKey> = attrs.iter().map(|attr| self.key_of(attr)).collect();
        let found = ctx.xattrs_by_keys(&keys)?;
        Ok(found.iter().map(StoredXAttr::to_attr).collect())
    }

    /// Returns all of the inode's attributes, in key order.
    ///
    /// # Errors
    ///
    /// Returns a storage error if a backing read fails.
    pub fn get_all(&self, ctx: &mut TransactionContext) -> TxResult<Vec<XAttr>> {
        let listed = ctx.xattrs_by_inode(self.inode_id)?;
        Ok(listed.iter().map(StoredXAttr::to_attr).collect())
    }

    /// Stages an attribute insert (or replace of an existing value).
    ///
    /// # Errors
    ///
    /// Returns a mutation conflict if the attribute was removed earlier in
    /// this transaction.
    pub fn add(&self, ctx: &mut TransactionContext, attr: &XAttr) -> TxResult<()> {
        ctx.add_xattr(StoredXAttr::from_attr(self.inode_id, attr))
    }

    /// Stages an attribute removal.
    ///
    /// # Errors
    ///
    /// Returns a mutation conflict if the attribute does not exist or was
    /// already removed in this transaction.
    pub fn remove(&self, ctx: &mut TransactionContext, attr: &XAttr) -> TxResult<()> {
        ctx.remove_xattr(StoredXAttr::from_attr(self.inode_id, attr))
    }

    fn key_of(&self, attr: &XAttr) -> XAttrKey {
        XAttrKey::new(self.inode_id, attr.namespace(), attr.name())
    }
}
