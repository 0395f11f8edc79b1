//! Error types for the namedb transaction layer.

use crate::transaction::LockType;
use namedb_storage::StorageError;
use thiserror::Error;

/// Result type for transaction-layer operations.
pub type TxResult<T> = Result<T, TxError>;

/// Errors that can occur in the transaction layer.
///
/// The taxonomy matters to callers:
///
/// - Backing-store failures ([`TxError::Storage`]) abort the enclosing
///   transaction; retry policy belongs to the transaction coordinator.
/// - Lock ordering errors are programming errors and surface immediately.
/// - Validation errors reject one mutation; the transaction continues and
///   the caller may retry with corrected input.
/// - Consistency violations are internal invariant failures and fatal for
///   the transaction.
#[derive(Debug, Error)]
pub enum TxError {
    /// The backing store failed; propagated unchanged.
    #[error("storage error: {0}")]
    Storage(#[from] StorageError),

    /// A lock was requested out of the fixed global type order.
    #[error("lock ordering violation: {acquiring} requested after {held}")]
    LockOrdering {
        /// The lock type being acquired.
        acquiring: LockType,
        /// The highest lock type already held.
        held: LockType,
    },

    /// A lock's prerequisite was never acquired in this transaction.
    #[error("lock not acquired in this transaction: {lock_type}")]
    LockNotAcquired {
        /// The missing lock type.
        lock_type: LockType,
    },

    /// Operation not permitted in the current transaction state.
    #[error("invalid operation: {message}")]
    InvalidOperation {
        /// Description of why the operation is invalid.
        message: String,
    },

    /// A staged mutation conflicts with an earlier one on the same entity.
    #[error("mutation conflict: {message}")]
    MutationConflict {
        /// Description of the conflict.
        message: String,
    },

    /// An extended attribute name exceeds the configured limit.
    #[error("xattr name is too big: maximum is {limit} bytes, got {len}")]
    NameTooLong {
        /// Actual name size in bytes.
        len: usize,
        /// Configured limit in bytes.
        limit: usize,
    },

    /// An extended attribute value exceeds the configured limit.
    #[error("xattr value is too big: maximum is {limit} bytes, got {len}")]
    ValueTooLong {
        /// Actual value size in bytes.
        len: usize,
        /// Configured limit in bytes.
        limit: usize,
    },

    /// An extended attribute's combined name and value size exceeds the
    /// configured limit.
    #[error("xattr is too big: maximum combined size of name and value is {limit} bytes, got {size}")]
    XAttrTooBig {
        /// Actual combined size in bytes.
        size: usize,
        /// Configured limit in bytes.
        limit: usize,
    },

    /// An inode already carries the maximum number of extended attributes.
    #[error("cannot add more than {limit} xattrs per inode, inode has {count}")]
    TooManyXAttrs {
        /// Current attribute count.
        count: usize,
        /// Configured per-inode cap.
        limit: usize,
    },

    /// An internal cache invariant was broken.
    ///
    /// Must never occur if the entity-context contract is honored.
    #[error("consistency violation: {message}")]
    ConsistencyViolation {
        /// Description of the broken invariant.
        message: String,
    },
}

impl TxError {
    /// Creates an invalid operation error.
    pub fn invalid_operation(message: impl Into<String>) -> Self {
        Self::InvalidOperation {
            message: message.into(),
        }
    }

    /// Creates a mutation conflict error.
    pub fn mutation_conflict(message: impl Into<String>) -> Self {
        Self::MutationConflict {
            message: message.into(),
        }
    }

    /// Creates a consistency violation error.
    pub fn consistency_violation(message: impl Into<String>) -> Self {
        Self::ConsistencyViolation {
            message: message.into(),
        }
    }

    /// Returns whether this is a validation error.
    ///
    /// Validation errors reject one mutation without aborting the
    /// transaction; everything else aborts.
    #[must_use]
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            Self::NameTooLong { .. }
                | Self::ValueTooLong { .. }
                | Self::XAttrTooBig { .. }
                | Self::TooManyXAttrs { .. }
        )
    }
}
