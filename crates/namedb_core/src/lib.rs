//! # Namedb Core
//!
//! Transaction-scoped metadata caching and lock acquisition for the namedb
//! filesystem metadata service.
//!
//! Every metadata operation runs as a short transaction against the backing
//! row store: acquire locks in a fixed global order, read what the operation
//! needs (each read takes the store's row lock), stage mutations in
//! per-entity-type caches, then flush everything in one bulk write at
//! commit. The pieces:
//!
//! - [`EntityContext`] - the per-transaction cache of one entity type, with
//!   cached not-found and read-your-writes semantics
//! - [`TransactionContext`] - the explicit per-transaction registry routing
//!   operations to their entity contexts
//! - [`Transaction`] - the driver enforcing the lock-then-read-then-stage
//!   lifecycle and the commit/abort contract
//! - [`InodeLock`](transaction::InodeLock), [`XAttrLock`](transaction::XAttrLock),
//!   [`MetaLogLock`](transaction::MetaLogLock) - lock requests acquired in
//!   ascending [`LockType`](transaction::LockType) order
//! - [`XAttrFeature`](xattr::XAttrFeature) - the lazily attached per-inode
//!   view over extended attributes
//! - [`MetaLogEntry`](meta_log::MetaLogEntry) - append-only change log
//!   entries for feed-member inodes, ordered by a per-inode logical clock
//!
//! ## Design Principles
//!
//! - A read result is authoritative for the rest of the transaction; later
//!   point reads under a resolved parent never touch the store
//! - One staged intent per key: add, remove, and modify resolve through a
//!   single slot state, so conflicting intents are rejected at staging time
//! - Validation failures surface before anything is staged; the transaction
//!   stays usable
//! - Nothing is written before commit, and an abort writes nothing at all
//!
//! ## Example
//!
//! ```rust,ignore
//! use namedb_core::transaction::{InodeLock, Lock, Transaction, XAttrLock};
//!
//! let mut txn = Transaction::begin(xattr_access, meta_log_access);
//! txn.acquire(Lock::Inode(InodeLock::new(vec![inode_id])))?;
//! txn.acquire(Lock::XAttr(XAttrLock::read_all()))?;
//! xattr::update_attr(txn.context_mut(), &config, &mut inode, &attr)?;
//! txn.commit()?;
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

pub mod config;
pub mod context;
pub mod error;
pub mod inode;
pub mod meta_log;
pub mod transaction;
pub mod types;
pub mod xattr;

pub use config::XAttrConfig;
pub use context::{ContextStats, EntityContext, EntityState};
pub use error::{TxError, TxResult};
pub use inode::InodeProvider;
pub use transaction::{Transaction, TransactionContext, TransactionState};
pub use types::{DatasetId, InodeId, LogicalTime};
