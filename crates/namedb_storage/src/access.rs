//! Data access trait definition.

use crate::error::StorageResult;
use crate::record::Record;

/// Bulk read and bulk write against the backing store for one record type.
///
/// Implementations execute the actual reads and writes against the external
/// database. The transaction layer consumes this trait; it never implements
/// retry or caching here.
///
/// # Locking contract
///
/// The backing store provides blocking row locks. Every read performed
/// through this trait acquires the row locks for the rows it touches on
/// behalf of the surrounding store transaction, and those locks are held
/// until that transaction commits or aborts. This is the primitive the
/// pessimistic lock-acquisition protocol above is built on.
///
/// # Invariants
///
/// - `read_by_parent` and `read_by_key_batch` return rows in a stable,
///   deterministic order
/// - `write` is atomic from the caller's perspective: either all of the
///   removed, added, and modified sets are applied or none are
pub trait DataAccess<R: Record>: Send + Sync {
    /// Reads a single record by primary key.
    ///
    /// # Errors
    ///
    /// Returns an error if the store is unreachable or the row lock cannot
    /// be obtained.
    fn read_by_key(&self, key: &R::Key) -> StorageResult<Option<R>>;

    /// Reads all records attached to one parent node.
    ///
    /// Returns an empty collection when the parent has no records; that is
    /// a successful outcome, not an error.
    ///
    /// # Errors
    ///
    /// Returns an error if the store is unreachable or a row lock cannot
    /// be obtained.
    fn read_by_parent(&self, parent: &R::ParentKey) -> StorageResult<Vec<R>>;

    /// Reads an explicit batch of records by primary key.
    ///
    /// Keys with no backing row are simply absent from the result; the
    /// result order follows the store's key order, not the argument order.
    ///
    /// # Errors
    ///
    /// Returns an error if the store is unreachable or a row lock cannot
    /// be obtained.
    fn read_by_key_batch(&self, keys: &[R::Key]) -> StorageResult<Vec<R>>;

    /// Applies one transaction's staged mutations in a single bulk write.
    ///
    /// Called exactly once per record type at transaction prepare time.
    ///
    /// # Errors
    ///
    /// Returns an error if the write is rejected; in that case nothing was
    /// applied and the enclosing transaction must abort.
    fn write(&self, removed: &[R::Key], added: &[R], modified: &[R]) -> StorageResult<()>;
}
