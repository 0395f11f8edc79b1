//! Append-only metadata change log entries.
//!
//! Inodes under a feed-enabled dataset report attribute changes to an
//! append-only log the replication/notification pipeline consumes. Entries
//! are staged in their own entity context and flushed with the rest of the
//! transaction, ordered per inode by the logical clock.

use crate::types::{DatasetId, InodeId, LogicalTime};
use crate::xattr::XAttrNamespace;
use namedb_storage::Record;

/// Kind of attribute change a log entry records.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogOperation {
    /// A new attribute was created.
    AddXAttr,
    /// An existing attribute's value was replaced.
    UpdateXAttr,
    /// An attribute was deleted.
    DeleteXAttr,
}

/// Primary key of a metadata log entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct MetaLogKey {
    /// Dataset the change is attributed to.
    pub dataset_id: DatasetId,
    /// Inode the change happened on.
    pub inode_id: InodeId,
    /// Per-inode logical clock value.
    pub logical_time: LogicalTime,
}

/// One metadata change log entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MetaLogEntry {
    /// Dataset the change is attributed to.
    pub dataset_id: DatasetId,
    /// Inode the change happened on.
    pub inode_id: InodeId,
    /// Per-inode logical clock value; totally orders this inode's entries.
    pub logical_time: LogicalTime,
    /// Namespace of the changed attribute.
    pub namespace: XAttrNamespace,
    /// Name of the changed attribute.
    pub name: String,
    /// Kind of change.
    pub operation: LogOperation,
}

impl MetaLogEntry {
    /// Creates a log entry.
    pub fn new(
        dataset_id: DatasetId,
        inode_id: InodeId,
        logical_time: LogicalTime,
        namespace: XAttrNamespace,
        name: impl Into<String>,
        operation: LogOperation,
    ) -> Self {
        Self {
            dataset_id,
            inode_id,
            logical_time,
            namespace,
            name: name.into(),
            operation,
        }
    }
}

impl Record for MetaLogEntry {
    type Key = MetaLogKey;
    type ParentKey = InodeId;

    fn key(&self) -> Self::Key {
        MetaLogKey {
            dataset_id: self.dataset_id,
            inode_id: self.inode_id,
            logical_time: self.logical_time,
        }
    }

    fn parent_of(key: &Self::Key) -> Self::ParentKey {
        key.inode_id
    }
}
