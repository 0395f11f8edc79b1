//! Core type definitions for namedb.

use std::fmt;

/// Unique identifier for a primary node (inode) in the filesystem tree.
///
/// Inode IDs are assigned by the tree layer and stable for the node's
/// lifetime.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct InodeId(pub u64);

impl InodeId {
    /// Creates a new inode ID.
    #[must_use]
    pub const fn new(id: u64) -> Self {
        Self(id)
    }

    /// Returns the raw ID value.
    #[must_use]
    pub const fn as_u64(self) -> u64 {
        self.0
    }
}

impl fmt::Display for InodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "inode:{}", self.0)
    }
}

/// Identifier for a dataset: the metadata-feed-enabled ancestor an inode's
/// change events are attributed to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct DatasetId(pub u64);

impl DatasetId {
    /// Creates a new dataset ID.
    #[must_use]
    pub const fn new(id: u64) -> Self {
        Self(id)
    }

    /// Returns the raw ID value.
    #[must_use]
    pub const fn as_u64(self) -> u64 {
        self.0
    }
}

impl fmt::Display for DatasetId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "dataset:{}", self.0)
    }
}

/// Per-inode logical clock value used to order metadata log entries.
///
/// Obtained by incrementing and persisting a counter on the inode itself,
/// inside the same transaction that stages the log entry, so entries for
/// one inode are totally ordered across transactions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct LogicalTime(pub u64);

impl LogicalTime {
    /// Creates a new logical time.
    #[must_use]
    pub const fn new(time: u64) -> Self {
        Self(time)
    }

    /// Returns the raw time value.
    #[must_use]
    pub const fn as_u64(self) -> u64 {
        self.0
    }

    /// Returns the next logical time.
    #[must_use]
    pub const fn next(self) -> Self {
        Self(self.0 + 1)
    }
}

impl fmt::Display for LogicalTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "lt:{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn inode_id_ordering() {
        let a = InodeId::new(1);
        let b = InodeId::new(2);
        assert!(a < b);
    }

    #[test]
    fn logical_time_next() {
        let t = LogicalTime::new(7);
        assert_eq!(t.next().as_u64(), 8);
    }

    #[test]
    fn display_formats() {
        assert_eq!(format!("{}", InodeId::new(42)), "inode:42");
        assert_eq!(format!("{}", DatasetId::new(3)), "dataset:3");
        assert_eq!(format!("{}", LogicalTime::new(9)), "lt:9");
    }
}
