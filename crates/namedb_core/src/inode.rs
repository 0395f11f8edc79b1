//! Primary-node (inode) provider seam.

use crate::error::TxResult;
use crate::types::{DatasetId, InodeId, LogicalTime};

/// Read-mostly view of a primary node, owned by the filesystem tree layer.
///
/// The transaction layer never represents inodes itself; it consumes this
/// trait to learn about metadata-feed membership and to drive the per-inode
/// logical clock when staging metadata log entries.
///
/// `increment_logical_time` and `save` mutate the inode's persistent
/// counter as part of the surrounding transaction, so log entries for one
/// inode are totally ordered across transactions.
pub trait InodeProvider {
    /// The inode's ID.
    fn id(&self) -> InodeId;

    /// The dataset this inode reports change events to, if it participates
    /// in the metadata change feed.
    fn meta_feed_parent(&self) -> Option<DatasetId>;

    /// Increments and returns the inode's logical clock.
    ///
    /// # Errors
    ///
    /// Returns an error if the inode's state cannot be read.
    fn increment_logical_time(&mut self) -> TxResult<LogicalTime>;

    /// Persists the inode's updated counter within the current transaction.
    ///
    /// # Errors
    ///
    /// Returns an error if staging the inode update fails.
    fn save(&mut self) -> TxResult<()>;
}
