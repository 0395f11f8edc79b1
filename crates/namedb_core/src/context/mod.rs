//! Per-transaction entity caching.

mod entity_context;
mod slot;
mod stats;

pub use entity_context::EntityContext;
pub use slot::EntityState;
pub use stats::ContextStats;
