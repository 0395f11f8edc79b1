//! Transaction-scoped registry, locks, and the transaction driver.

mod locks;
mod registry;
mod txn;

pub use locks::{InodeLock, Lock, LockType, MetaLogLock, TransactionLocks, XAttrLock};
pub use registry::TransactionContext;
pub use txn::{Transaction, TransactionState};
