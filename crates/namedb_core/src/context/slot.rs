//! Cached entity slots and mutation states.

/// Mutation state of a cached entity within one transaction.
///
/// An entity holds exactly one state at a time; the slot representation
/// makes "added and removed at once" unrepresentable.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntityState {
    /// Read from the backing store and not mutated.
    Clean,
    /// Staged for insertion at flush time.
    Added,
    /// Staged for deletion at flush time.
    Removed,
    /// Staged for update at flush time.
    Modified,
}

/// Cached outcome for one primary key.
///
/// `Absent` is a cached "not found": the key was looked up (or covered by a
/// fully-resolved parent query) and has no backing row, so repeat lookups
/// never hit the store again. It is also the result of an add and a remove
/// of the same key cancelling out within one transaction.
#[derive(Debug, Clone)]
pub(crate) enum Slot<R> {
    /// The key is known to have no live entity.
    Absent,
    /// A cached entity and its mutation state.
    Present {
        /// The cached record.
        record: R,
        /// The record's mutation state.
        state: EntityState,
    },
}

impl<R> Slot<R> {
    pub(crate) fn clean(record: R) -> Self {
        Self::Present {
            record,
            state: EntityState::Clean,
        }
    }

    pub(crate) fn added(record: R) -> Self {
        Self::Present {
            record,
            state: EntityState::Added,
        }
    }

    pub(crate) fn modified(record: R) -> Self {
        Self::Present {
            record,
            state: EntityState::Modified,
        }
    }

    pub(crate) fn removed(record: R) -> Self {
        Self::Present {
            record,
            state: EntityState::Removed,
        }
    }

    /// The record, if it is live from this transaction's point of view.
    ///
    /// Removed entities and cached not-founds are not live.
    pub(crate) fn live(&self) -> Option<&R> {
        match self {
            Self::Present { record, state } if *state != EntityState::Removed => Some(record),
            _ => None,
        }
    }

    /// The mutation state, or `None` for a cached not-found.
    pub(crate) fn state(&self) -> Option<EntityState> {
        match self {
            Self::Absent => None,
            Self::Present { state, .. } => Some(*state),
        }
    }
}
