//! The transaction driver.

use crate::error::{TxError, TxResult};
use crate::meta_log::MetaLogEntry;
use crate::transaction::locks::{Lock, TransactionLocks};
use crate::transaction::registry::TransactionContext;
use crate::xattr::StoredXAttr;
use namedb_storage::DataAccess;
use std::sync::Arc;
use tracing::debug;

/// State of a transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransactionState {
    /// The transaction can acquire locks and stage mutations.
    Active,
    /// The transaction flushed successfully.
    Committed,
    /// The transaction was aborted; nothing was flushed.
    Aborted,
}

/// One in-flight metadata transaction.
///
/// Owns the registry and lock set for their whole lifetime and enforces
/// the end-of-transaction contract: commit prepares every dirtied context
/// and then clears them; abort clears without ever flushing, so no partial
/// staged mutation becomes visible. Retry on transient storage failures
/// belongs to the coordinator driving this type, not to the transaction
/// itself.
#[derive(Debug)]
pub struct Transaction {
    ctx: TransactionContext,
    locks: TransactionLocks,
    state: TransactionState,
}

impl Transaction {
    /// Begins a transaction over the given data access handles.
    pub fn begin(
        xattr_access: Arc<dyn DataAccess<StoredXAttr>>,
        meta_log_access: Arc<dyn DataAccess<MetaLogEntry>>,
    ) -> Self {
        Self {
            ctx: TransactionContext::new(xattr_access, meta_log_access),
            locks: TransactionLocks::new(),
            state: TransactionState::Active,
        }
    }

    /// Acquires a lock in this transaction.
    ///
    /// Locks must be acquired in ascending [`LockType`](super::LockType)
    /// order, all of them before mutations are staged.
    ///
    /// # Errors
    ///
    /// Returns lock-ordering, prerequisite, or storage errors from the
    /// acquisition, or an invalid-operation error if the transaction is no
    /// longer active.
    pub fn acquire(&mut self, lock: Lock) -> TxResult<()> {
        self.ensure_active()?;
        self.locks.acquire(&mut self.ctx, lock)
    }

    /// The transaction's registry handle.
    #[must_use]
    pub fn context(&self) -> &TransactionContext {
        &self.ctx
    }

    /// The transaction's registry handle, mutably.
    pub fn context_mut(&mut self) -> &mut TransactionContext {
        &mut self.ctx
    }

    /// The locks acquired so far.
    #[must_use]
    pub fn locks(&self) -> &TransactionLocks {
        &self.locks
    }

    /// The current state.
    #[must_use]
    pub fn state(&self) -> TransactionState {
        self.state
    }

    /// Whether the transaction is still active.
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.state == TransactionState::Active
    }

    /// Commits the transaction: flushes every dirtied context, then ends
    /// the contexts' lifetime.
    ///
    /// # Errors
    ///
    /// Propagates the flush failure; the transaction is then aborted and
    /// all staged state discarded, exactly as if `abort` had been called.
    pub fn commit(&mut self) -> TxResult<()> {
        self.ensure_active()?;
        let result = self.ctx.prepare();
        self.ctx.clear();
        match result {
            Ok(()) => {
                debug!("transaction committed");
                self.state = TransactionState::Committed;
                Ok(())
            }
            Err(err) => {
                debug!("transaction aborted on flush failure");
                self.state = TransactionState::Aborted;
                Err(err)
            }
        }
    }

    /// Aborts the transaction: discards every cache and staged mutation
    /// without flushing anything.
    ///
    /// Aborting a finished transaction is a no-op.
    pub fn abort(&mut self) {
        if self.is_active() {
            debug!("transaction aborted");
            self.ctx.clear();
            self.state = TransactionState::Aborted;
        }
    }

    fn ensure_active(&self) -> TxResult<()> {
        match self.state {
            TransactionState::Active => Ok(()),
            TransactionState::Committed => Err(TxError::invalid_operation(
                "transaction already committed",
            )),
            TransactionState::Aborted => {
                Err(TxError::invalid_operation("transaction already aborted"))
            }
        }
    }
}
