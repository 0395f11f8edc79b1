//! # Namedb Storage
//!
//! Backing-store data access abstraction for the namedb metadata service.
//!
//! Filesystem metadata lives in an external, horizontally-scalable store
//! rather than in process memory. This crate defines the interface the
//! transaction layer uses to talk to that store, one entity type at a time:
//!
//! - [`Record`] - the storable entity shape (composite primary key plus a
//!   parent key for by-parent queries)
//! - [`DataAccess`] - bulk read and bulk write against the store for one
//!   record type
//! - [`InMemoryAccess`] - an in-memory implementation for tests and
//!   ephemeral use
//!
//! ## Design Principles
//!
//! - Data access implementations are **row stores**, not caches; all
//!   transaction-scoped caching happens above this crate
//! - Reads acquire the store's row locks on behalf of the surrounding
//!   transaction (pessimistic locking: read implies lock)
//! - Writes are atomic from the caller's perspective within the surrounding
//!   transaction boundary
//! - No wire or file format is owned here; persistence framing belongs to
//!   the concrete driver
//!
//! ## Example
//!
//! ```rust,ignore
//! use namedb_storage::{DataAccess, InMemoryAccess};
//!
//! let access = InMemoryAccess::new();
//! access.seed(vec![row1, row2]);
//! let rows = access.read_by_parent(&parent)?;
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod access;
mod error;
mod memory;
mod record;

pub use access::DataAccess;
pub use error::{StorageError, StorageResult};
pub use memory::InMemoryAccess;
pub use record::Record;
