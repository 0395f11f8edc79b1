//! Pessimistic lock descriptors and the per-transaction lock set.
//!
//! Locks are never persisted and never shared: a lock descriptor is a plan
//! for which rows a transaction needs, and acquiring it is the same thing
//! as issuing the corresponding finder queries through the registry. The
//! backing store's row locks are taken as a side effect of those reads and
//! held until the store transaction ends.
//!
//! Deadlock avoidance is purely by ordering: every transaction acquires
//! lock types in the fixed global order [`LockType`] derives, so no cycle
//! can form among the row locks obtained transitively.

use crate::error::{TxError, TxResult};
use crate::transaction::registry::TransactionContext;
use crate::types::InodeId;
use crate::xattr::{XAttr, XAttrKey};
use std::collections::BTreeMap;
use std::fmt;
use tracing::debug;

/// Lock types in their fixed global acquisition order.
///
/// The declaration order is the total order: inode locks first, then
/// attribute locks, then metadata log locks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum LockType {
    /// Primary-node (inode) lock.
    Inode,
    /// Extended attribute lock.
    XAttr,
    /// Metadata log lock.
    MetaLog,
}

impl fmt::Display for LockType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Inode => write!(f, "inode"),
            Self::XAttr => write!(f, "xattr"),
            Self::MetaLog => write!(f, "meta-log"),
        }
    }
}

/// The resolved primary-node lock.
///
/// Target resolution (path lookup, row locking of the inode rows
/// themselves) belongs to the filesystem tree layer; by the time this lock
/// enters the transaction's lock set it simply carries the ordered target
/// inode IDs that later locks consult.
#[derive(Debug, Clone)]
pub struct InodeLock {
    targets: Vec<InodeId>,
}

impl InodeLock {
    /// Creates an inode lock over the given targets.
    #[must_use]
    pub fn new(mut targets: Vec<InodeId>) -> Self {
        targets.sort();
        targets.dedup();
        Self { targets }
    }

    /// The target inodes, in ascending ID order.
    #[must_use]
    pub fn targets(&self) -> &[InodeId] {
        &self.targets
    }
}

/// An extended attribute lock.
///
/// Two modes:
///
/// - **read-all** (no attribute list): pulls every attribute of every
///   target inode into cache, so later point reads are guaranteed cache
///   hits and per-inode count checks need no further store reads;
/// - **narrow** (explicit list): pulls only the named attributes, avoiding
///   a full per-inode read when the caller already knows what it wants.
#[derive(Debug, Clone)]
pub struct XAttrLock {
    attrs: Option<Vec<XAttr>>,
}

impl XAttrLock {
    /// Creates a lock that reads every attribute of the target inodes.
    #[must_use]
    pub fn read_all() -> Self {
        Self { attrs: None }
    }

    /// Creates a lock over an explicit list of attributes.
    #[must_use]
    pub fn for_attrs(attrs: Vec<XAttr>) -> Self {
        Self { attrs: Some(attrs) }
    }

    /// Creates a lock over a single attribute, or a read-all lock when no
    /// attribute is given.
    #[must_use]
    pub fn for_attr(attr: Option<XAttr>) -> Self {
        match attr {
            Some(attr) => Self::for_attrs(vec![attr]),
            None => Self::read_all(),
        }
    }

    fn populate(&self, ctx: &mut TransactionContext, inodes: &InodeLock) -> TxResult<()> {
        for inode_id in inodes.targets() {
            match &self.attrs {
                None => {
                    ctx.xattrs_by_inode(*inode_id)?;
                }
                Some(attrs) => {
                    let keys: Vec<XAttrKey> = attrs
                        .iter()
                        .map(|attr| XAttrKey::new(*inode_id, attr.namespace(), attr.name()))
                        .collect();
                    ctx.xattrs_by_keys(&keys)?;
                }
            }
        }
        Ok(())
    }
}

/// The metadata log lock.
///
/// The log is append-only: nothing is read at acquisition time, the
/// variant exists so the global lock order stays total when a transaction
/// intends to stage log entries.
#[derive(Debug, Clone, Default)]
pub struct MetaLogLock;

/// A lock descriptor of any type, ready for acquisition.
#[derive(Debug, Clone)]
pub enum Lock {
    /// A resolved primary-node lock.
    Inode(InodeLock),
    /// An extended attribute lock.
    XAttr(XAttrLock),
    /// A metadata log lock.
    MetaLog(MetaLogLock),
}

impl Lock {
    /// The lock's type, which fixes its position in the global order.
    #[must_use]
    pub fn lock_type(&self) -> LockType {
        match self {
            Self::Inode(_) => LockType::Inode,
            Self::XAttr(_) => LockType::XAttr,
            Self::MetaLog(_) => LockType::MetaLog,
        }
    }
}

/// The set of locks acquired so far in one transaction.
///
/// Append-only within the transaction: locks are acquired in ascending
/// [`LockType`] order and queried by type while later locks resolve their
/// targets.
#[derive(Debug, Default)]
pub struct TransactionLocks {
    acquired: BTreeMap<LockType, Lock>,
}

impl TransactionLocks {
    /// Creates an empty lock set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Acquires a lock: resolves its target keys against the locks already
    /// held and issues the finder queries that pull the targets into cache
    /// and under the store's row locks.
    ///
    /// # Errors
    ///
    /// Returns a lock-ordering error when the lock's type does not come
    /// strictly after every type already held, a lock-not-acquired error
    /// when a prerequisite lock is missing, or a storage error when a
    /// backing read fails.
    pub fn acquire(&mut self, ctx: &mut TransactionContext, lock: Lock) -> TxResult<()> {
        let lock_type = lock.lock_type();
        if let Some(held) = self.highest_acquired() {
            if lock_type <= held {
                return Err(TxError::LockOrdering {
                    acquiring: lock_type,
                    held,
                });
            }
        }
        match &lock {
            Lock::Inode(_) | Lock::MetaLog(_) => {}
            Lock::XAttr(xattr_lock) => {
                let inode_lock = self.inode_lock()?;
                xattr_lock.populate(ctx, inode_lock)?;
            }
        }
        debug!(%lock_type, "lock acquired");
        self.acquired.insert(lock_type, lock);
        Ok(())
    }

    /// Returns the acquired lock of the given type.
    ///
    /// # Errors
    ///
    /// Returns a lock-not-acquired error if the type was never acquired in
    /// this transaction.
    pub fn lock(&self, lock_type: LockType) -> TxResult<&Lock> {
        self.acquired
            .get(&lock_type)
            .ok_or(TxError::LockNotAcquired { lock_type })
    }

    /// Returns the acquired inode lock.
    ///
    /// # Errors
    ///
    /// Returns a lock-not-acquired error if no inode lock is held.
    pub fn inode_lock(&self) -> TxResult<&InodeLock> {
        match self.lock(LockType::Inode)? {
            Lock::Inode(inode_lock) => Ok(inode_lock),
            _ => Err(TxError::consistency_violation(
                "lock set holds a non-inode lock under the inode type",
            )),
        }
    }

    /// Returns whether a lock of the given type is held.
    #[must_use]
    pub fn is_acquired(&self, lock_type: LockType) -> bool {
        self.acquired.contains_key(&lock_type)
    }

    fn highest_acquired(&self) -> Option<LockType> {
        self.acquired.keys().next_back().copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::meta_log::MetaLogEntry;
    use crate::xattr::{StoredXAttr, XAttrNamespace};
    use namedb_storage::InMemoryAccess;
    use std::sync::Arc;

    fn setup() -> (TransactionContext, Arc<InMemoryAccess<StoredXAttr>>) {
        let xattr_access = Arc::new(InMemoryAccess::new());
        let meta_log_access = Arc::new(InMemoryAccess::<MetaLogEntry>::new());
        let ctx = TransactionContext::new(xattr_access.clone(), meta_log_access);
        (ctx, xattr_access)
    }

    fn stored(inode: u64, name: &str) -> StoredXAttr {
        StoredXAttr::new(InodeId::new(inode), XAttrNamespace::User, name, vec![])
    }

    fn attr(name: &str) -> XAttr {
        XAttr::new(XAttrNamespace::User, name, vec![])
    }

    #[test]
    fn lock_type_order_is_inode_then_xattr_then_meta_log() {
        assert!(LockType::Inode < LockType::XAttr);
        assert!(LockType::XAttr < LockType::MetaLog);
    }

    #[test]
    fn xattr_lock_requires_inode_lock_first() {
        let (mut ctx, _) = setup();
        let mut locks = TransactionLocks::new();

        let result = locks.acquire(&mut ctx, Lock::XAttr(XAttrLock::read_all()));
        assert!(matches!(
            result,
            Err(TxError::LockNotAcquired {
                lock_type: LockType::Inode
            })
        ));
    }

    #[test]
    fn out_of_order_acquisition_is_rejected() {
        let (mut ctx, _) = setup();
        let mut locks = TransactionLocks::new();

        locks
            .acquire(&mut ctx, Lock::MetaLog(MetaLogLock))
            .unwrap();
        let result = locks.acquire(&mut ctx, Lock::Inode(InodeLock::new(vec![])));
        assert!(matches!(
            result,
            Err(TxError::LockOrdering {
                acquiring: LockType::Inode,
                held: LockType::MetaLog
            })
        ));
    }

    #[test]
    fn same_type_twice_is_rejected() {
        let (mut ctx, _) = setup();
        let mut locks = TransactionLocks::new();

        locks
            .acquire(&mut ctx, Lock::Inode(InodeLock::new(vec![InodeId::new(1)])))
            .unwrap();
        let result = locks.acquire(&mut ctx, Lock::Inode(InodeLock::new(vec![InodeId::new(2)])));
        assert!(matches!(result, Err(TxError::LockOrdering { .. })));
    }

    #[test]
    fn read_all_mode_populates_the_cache_for_every_target() {
        let (mut ctx, xattr_access) = setup();
        xattr_access.seed(vec![stored(1, "a"), stored(2, "b"), stored(3, "c")]);
        let mut locks = TransactionLocks::new();

        locks
            .acquire(
                &mut ctx,
                Lock::Inode(InodeLock::new(vec![InodeId::new(1), InodeId::new(2)])),
            )
            .unwrap();
        locks
            .acquire(&mut ctx, Lock::XAttr(XAttrLock::read_all()))
            .unwrap();

        assert_eq!(xattr_access.read_by_parent_calls(), 2);

        // Later reads are cache hits, including negative point reads.
        ctx.xattrs_by_inode(InodeId::new(1)).unwrap();
        ctx.find_xattr(&XAttrKey::new(
            InodeId::new(2),
            XAttrNamespace::User,
            "ghost",
        ))
        .unwrap();
        assert_eq!(xattr_access.total_read_calls(), 2);
    }

    #[test]
    fn narrow_mode_reads_only_the_named_attributes() {
        let (mut ctx, xattr_access) = setup();
        xattr_access.seed(vec![stored(1, "wanted"), stored(1, "other")]);
        let mut locks = TransactionLocks::new();

        locks
            .acquire(&mut ctx, Lock::Inode(InodeLock::new(vec![InodeId::new(1)])))
            .unwrap();
        locks
            .acquire(
                &mut ctx,
                Lock::XAttr(XAttrLock::for_attrs(vec![attr("wanted")])),
            )
            .unwrap();

        assert_eq!(xattr_access.read_by_key_batch_calls(), 1);
        assert_eq!(xattr_access.read_by_parent_calls(), 0);

        let found = ctx
            .find_xattr(&XAttrKey::new(
                InodeId::new(1),
                XAttrNamespace::User,
                "wanted",
            ))
            .unwrap();
        assert_eq!(found, Some(stored(1, "wanted")));
        assert_eq!(xattr_access.total_read_calls(), 1);
    }

    #[test]
    fn for_attr_none_means_read_all() {
        let (mut ctx, xattr_access) = setup();
        xattr_access.seed(vec![stored(1, "a")]);
        let mut locks = TransactionLocks::new();

        locks
            .acquire(&mut ctx, Lock::Inode(InodeLock::new(vec![InodeId::new(1)])))
            .unwrap();
        locks
            .acquire(&mut ctx, Lock::XAttr(XAttrLock::for_attr(None)))
            .unwrap();

        assert_eq!(xattr_access.read_by_parent_calls(), 1);
    }

    #[test]
    fn lock_queries_by_type() {
        let (mut ctx, _) = setup();
        let mut locks = TransactionLocks::new();
        locks
            .acquire(&mut ctx, Lock::Inode(InodeLock::new(vec![InodeId::new(4)])))
            .unwrap();

        assert!(locks.is_acquired(LockType::Inode));
        assert!(!locks.is_acquired(LockType::XAttr));
        assert_eq!(locks.inode_lock().unwrap().targets(), &[InodeId::new(4)]);
        assert!(matches!(
            locks.lock(LockType::XAttr),
            Err(TxError::LockNotAcquired {
                lock_type: LockType::XAttr
            })
        ));
    }

    #[test]
    fn inode_targets_are_sorted_and_deduped() {
        let lock = InodeLock::new(vec![InodeId::new(3), InodeId::new(1), InodeId::new(3)]);
        assert_eq!(lock.targets(), &[InodeId::new(1), InodeId::new(3)]);
    }
}
