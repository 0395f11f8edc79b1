//! Extended attribute limits configuration.

/// Configured limits for extended attributes.
///
/// Violations surface as validation errors, never storage errors, and are
/// checked before anything is staged in an entity context.
#[derive(Debug, Clone)]
pub struct XAttrConfig {
    /// Maximum attribute name size in bytes.
    pub max_name_len: usize,

    /// Maximum attribute value size in bytes.
    pub max_value_len: usize,

    /// Maximum combined size of name and value in bytes.
    pub size_limit: usize,

    /// Maximum number of attributes one inode may carry.
    pub max_xattrs_per_inode: usize,
}

impl Default for XAttrConfig {
    fn default() -> Self {
        Self {
            max_name_len: 255,
            max_value_len: 13755,
            size_limit: 16384,
            max_xattrs_per_inode: 32,
        }
    }
}

impl XAttrConfig {
    /// Creates a configuration with default limits.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the maximum name size.
    #[must_use]
    pub const fn max_name_len(mut self, len: usize) -> Self {
        self.max_name_len = len;
        self
    }

    /// Sets the maximum value size.
    #[must_use]
    pub const fn max_value_len(mut self, len: usize) -> Self {
        self.max_value_len = len;
        self
    }

    /// Sets the combined name-plus-value size limit.
    #[must_use]
    pub const fn size_limit(mut self, limit: usize) -> Self {
        self.size_limit = limit;
        self
    }

    /// Sets the per-inode attribute cap.
    #[must_use]
    pub const fn max_xattrs_per_inode(mut self, limit: usize) -> Self {
        self.max_xattrs_per_inode = limit;
        self
    }
}
