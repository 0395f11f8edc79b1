//! Extended attribute domain types.
//!
//! An extended attribute is the running example of a secondary record
//! attached to a primary node: a namespaced name/value pair stored row-wise
//! in the backing store, keyed by `(inode, namespace, name)`.

mod feature;
mod store;

pub use feature::XAttrFeature;
pub use store::{check_attr_size, read_attr, read_attrs, remove_attr, update_attr};

use crate::types::InodeId;
use namedb_storage::Record;

/// Namespace of an extended attribute.
///
/// The byte encoding is stable: it is what the backing store persists and
/// what metadata log entries carry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum XAttrNamespace {
    /// User-visible attributes.
    User,
    /// Attributes visible to privileged processes only.
    Trusted,
    /// Attributes maintained by the filesystem itself.
    System,
    /// Security-module attributes.
    Security,
    /// Raw namespace, reserved for internal tooling.
    Raw,
}

impl XAttrNamespace {
    /// Returns the stable byte encoding of this namespace.
    #[must_use]
    pub const fn as_byte(self) -> u8 {
        match self {
            Self::User => 0,
            Self::Trusted => 1,
            Self::System => 2,
            Self::Security => 3,
            Self::Raw => 4,
        }
    }

    /// Decodes a namespace from its stable byte encoding.
    #[must_use]
    pub const fn from_byte(byte: u8) -> Option<Self> {
        match byte {
            0 => Some(Self::User),
            1 => Some(Self::Trusted),
            2 => Some(Self::System),
            3 => Some(Self::Security),
            4 => Some(Self::Raw),
            _ => None,
        }
    }
}

/// A wire-facing extended attribute: namespace, name, value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct XAttr {
    namespace: XAttrNamespace,
    name: String,
    value: Vec<u8>,
}

impl XAttr {
    /// Creates a new attribute.
    pub fn new(namespace: XAttrNamespace, name: impl Into<String>, value: Vec<u8>) -> Self {
        Self {
            namespace,
            name: name.into(),
            value,
        }
    }

    /// The attribute's namespace.
    #[must_use]
    pub fn namespace(&self) -> XAttrNamespace {
        self.namespace
    }

    /// The attribute's name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The attribute's value bytes (possibly empty).
    #[must_use]
    pub fn value(&self) -> &[u8] {
        &self.value
    }
}

/// Composite primary key of a stored attribute row.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct XAttrKey {
    /// Owning inode.
    pub inode_id: InodeId,
    /// Attribute namespace.
    pub namespace: XAttrNamespace,
    /// Attribute name.
    pub name: String,
}

impl XAttrKey {
    /// Creates a key for an attribute of the given inode.
    pub fn new(inode_id: InodeId, namespace: XAttrNamespace, name: impl Into<String>) -> Self {
        Self {
            inode_id,
            namespace,
            name: name.into(),
        }
    }
}

/// An extended attribute as stored in the backing store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredXAttr {
    /// Owning inode.
    pub inode_id: InodeId,
    /// Attribute namespace.
    pub namespace: XAttrNamespace,
    /// Attribute name.
    pub name: String,
    /// Attribute value bytes.
    pub value: Vec<u8>,
}

impl StoredXAttr {
    /// Creates a stored attribute row.
    pub fn new(
        inode_id: InodeId,
        namespace: XAttrNamespace,
        name: impl Into<String>,
        value: Vec<u8>,
    ) -> Self {
        Self {
            inode_id,
            namespace,
            name: name.into(),
            value,
        }
    }

    /// Converts a domain attribute into its stored shape for an inode.
    #[must_use]
    pub fn from_attr(inode_id: InodeId, attr: &XAttr) -> Self {
        Self::new(
            inode_id,
            attr.namespace(),
            attr.name(),
            attr.value().to_vec(),
        )
    }

    /// Converts the stored row back into the domain shape.
    #[must_use]
    pub fn to_attr(&self) -> XAttr {
        XAttr::new(self.namespace, self.name.clone(), self.value.clone())
    }
}

impl Record for StoredXAttr {
    type Key = XAttrKey;
    type ParentKey = InodeId;

    fn key(&self) -> Self::Key {
        XAttrKey::new(self.inode_id, self.namespace, self.name.clone())
    }

    fn parent_of(key: &Self::Key) -> Self::ParentKey {
        key.inode_id
    }
}
