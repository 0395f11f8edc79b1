//! Storable record trait definition.

use std::fmt;
use std::hash::Hash;

/// A storable metadata record.
///
/// Records are the unit the transaction layer caches, stages, and flushes.
/// Every record has a composite primary key, unique within its record type
/// and stable for the record's lifetime, and a parent key identifying the
/// primary node (inode) the record is attached to. By-parent finder queries
/// are served through the parent key.
///
/// # Invariants
///
/// - `key()` never changes for a given record
/// - `parent_of(&record.key()) == record.parent_key()` - the parent is
///   derivable from the primary key alone, so a fully-resolved parent query
///   can answer point lookups for keys under that parent without another
///   store read
pub trait Record: Clone + fmt::Debug + Send + Sync + 'static {
    /// Composite primary key type.
    type Key: Clone + Eq + Ord + Hash + fmt::Debug + Send + Sync;

    /// Parent (owning primary node) key type.
    type ParentKey: Clone + Eq + Ord + Hash + fmt::Debug + Send + Sync;

    /// Returns the record's primary key.
    fn key(&self) -> Self::Key;

    /// Returns the parent key embedded in a primary key.
    fn parent_of(key: &Self::Key) -> Self::ParentKey;

    /// Returns the record's parent key.
    fn parent_key(&self) -> Self::ParentKey {
        Self::parent_of(&self.key())
    }
}
