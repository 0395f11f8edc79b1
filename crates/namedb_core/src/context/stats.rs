//! Cache statistics for entity contexts.

/// Cache hit/miss statistics for one entity context.
///
/// Counters are diagnostics only; tests also use them as the call spy to
/// verify a second finder call never re-reads the backing store.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ContextStats {
    hits: u64,
    misses: u64,
    backing_reads: u64,
}

impl ContextStats {
    /// Creates zeroed statistics.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of finder calls answered entirely from cache.
    #[must_use]
    pub fn hits(&self) -> u64 {
        self.hits
    }

    /// Number of finder calls that missed the cache.
    #[must_use]
    pub fn misses(&self) -> u64 {
        self.misses
    }

    /// Number of reads actually issued to the backing store.
    #[must_use]
    pub fn backing_reads(&self) -> u64 {
        self.backing_reads
    }

    pub(crate) fn record_hit(&mut self) {
        self.hits += 1;
    }

    pub(crate) fn record_miss(&mut self) {
        self.misses += 1;
    }

    pub(crate) fn record_backing_read(&mut self) {
        self.backing_reads += 1;
    }

    pub(crate) fn reset(&mut self) {
        *self = Self::default();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counters_accumulate_and_reset() {
        let mut stats = ContextStats::new();
        stats.record_hit();
        stats.record_miss();
        stats.record_backing_read();
        stats.record_hit();

        assert_eq!(stats.hits(), 2);
        assert_eq!(stats.misses(), 1);
        assert_eq!(stats.backing_reads(), 1);

        stats.reset();
        assert_eq!(stats, ContextStats::new());
    }
}
