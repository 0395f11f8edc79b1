//! Read and set extended attributes on an inode.
//!
//! These operations sit between the RPC surface and the per-inode feature:
//! they validate limits before anything is staged, route reads and writes
//! through the feature, and stage a metadata log entry when the inode
//! participates in the change feed.

use crate::config::XAttrConfig;
use crate::error::{TxError, TxResult};
use crate::inode::InodeProvider;
use crate::meta_log::{LogOperation, MetaLogEntry};
use crate::transaction::TransactionContext;
use crate::types::InodeId;
use crate::xattr::XAttr;

/// Reads one existing attribute of an inode.
///
/// # Errors
///
/// Returns a storage error if a backing read fails.
pub fn read_attr(
    ctx: &mut TransactionContext,
    inode_id: InodeId,
    attr: &XAttr,
) -> TxResult<Option<XAttr>> {
    let feature = ctx.xattr_feature(inode_id);
    feature.get(ctx, attr)
}

/// Reads existing attributes of an inode.
///
/// An empty request list means "all attributes".
///
/// # Errors
///
/// Returns a storage error if a backing read fails.
pub fn read_attrs(
    ctx: &mut TransactionContext,
    inode_id: InodeId,
    attrs: &[XAttr],
) -> TxResult<Vec<XAttr>> {
    let feature = ctx.xattr_feature(inode_id);
    if attrs.is_empty() {
        feature.get_all(ctx)
    } else {
        feature.get_many(ctx, attrs)
    }
}

/// Creates or replaces an attribute on an inode.
///
/// Limits are checked first; on a validation error nothing is staged and
/// the transaction continues. A successful update stages the attribute and,
/// for feed-member inodes, a metadata log entry ordered by the inode's
/// logical clock.
///
/// # Errors
///
/// Returns a validation error when the attribute exceeds the configured
/// size limits or the inode's attribute cap, a mutation conflict from the
/// staging itself, or a storage error if a backing read fails.
pub fn update_attr(
    ctx: &mut TransactionContext,
    config: &XAttrConfig,
    inode: &mut dyn InodeProvider,
    attr: &XAttr,
) -> TxResult<()> {
    check_attr_size(config, attr)?;

    let feature = ctx.xattr_feature(inode.id());
    let existing = feature.get(ctx, attr)?;
    if existing.is_none() {
        let count = feature.get_all(ctx)?.len();
        if count >= config.max_xattrs_per_inode {
            return Err(TxError::TooManyXAttrs {
                count,
                limit: config.max_xattrs_per_inode,
            });
        }
    }

    feature.add(ctx, attr)?;
    let operation = if existing.is_some() {
        LogOperation::UpdateXAttr
    } else {
        LogOperation::AddXAttr
    };
    log_metadata_event(ctx, inode, attr, operation)
}

/// Removes an attribute from an inode.
///
/// # Errors
///
/// Returns a mutation conflict if the attribute does not exist, or a
/// storage error if a backing read fails.
pub fn remove_attr(
    ctx: &mut TransactionContext,
    inode: &mut dyn InodeProvider,
    attr: &XAttr,
) -> TxResult<()> {
    let feature = ctx.xattr_feature(inode.id());
    feature.remove(ctx, attr)?;
    log_metadata_event(ctx, inode, attr, LogOperation::DeleteXAttr)
}

/// Verifies that an attribute's name and value sizes are within the
/// configured limits.
///
/// # Errors
///
/// Returns the matching validation error; the caller's transaction
/// continues, nothing has been staged.
pub fn check_attr_size(config: &XAttrConfig, attr: &XAttr) -> TxResult<()> {
    let name_len = attr.name().len();
    if name_len > config.max_name_len {
        return Err(TxError::NameTooLong {
            len: name_len,
            limit: config.max_name_len,
        });
    }

    let value_len = attr.value().len();
    if value_len > config.max_value_len {
        return Err(TxError::ValueTooLong {
            len: value_len,
            limit: config.max_value_len,
        });
    }

    let size = name_len + value_len;
    if size > config.size_limit {
        return Err(TxError::XAttrTooBig {
            size,
            limit: config.size_limit,
        });
    }
    Ok(())
}

fn log_metadata_event(
    ctx: &mut TransactionContext,
    inode: &mut dyn InodeProvider,
    attr: &XAttr,
    operation: LogOperation,
) -> TxResult<()> {
    let Some(dataset_id) = inode.meta_feed_parent() else {
        return Ok(());
    };

    // The clock bump rides in the same transaction as the log entry.
    let logical_time = inode.increment_logical_time()?;
    inode.save()?;

    ctx.add_log_entry(MetaLogEntry::new(
        dataset_id,
        inode.id(),
        logical_time,
        attr.namespace(),
        attr.name(),
        operation,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{DatasetId, LogicalTime};
    use crate::xattr::{StoredXAttr, XAttrNamespace};
    use namedb_storage::InMemoryAccess;
    use std::sync::Arc;

    struct TestInode {
        id: InodeId,
        feed_parent: Option<DatasetId>,
        logical_time: LogicalTime,
        saves: u32,
    }

    impl TestInode {
        fn new(id: u64, feed_parent: Option<u64>) -> Self {
            Self {
                id: InodeId::new(id),
                feed_parent: feed_parent.map(DatasetId::new),
                logical_time: LogicalTime::new(0),
                saves: 0,
            }
        }
    }

    impl InodeProvider for TestInode {
        fn id(&self) -> InodeId {
            self.id
        }

        fn meta_feed_parent(&self) -> Option<DatasetId> {
            self.feed_parent
        }

        fn increment_logical_time(&mut self) -> TxResult<LogicalTime> {
            self.logical_time = self.logical_time.next();
            Ok(self.logical_time)
        }

        fn save(&mut self) -> TxResult<()> {
            self.saves += 1;
            Ok(())
        }
    }

    fn setup() -> (
        TransactionContext,
        Arc<InMemoryAccess<StoredXAttr>>,
        Arc<InMemoryAccess<MetaLogEntry>>,
    ) {
        let xattr_access = Arc::new(InMemoryAccess::new());
        let meta_log_access = Arc::new(InMemoryAccess::new());
        let ctx = TransactionContext::new(xattr_access.clone(), meta_log_access.clone());
        (ctx, xattr_access, meta_log_access)
    }

    fn attr(name: &str, value: &[u8]) -> XAttr {
        XAttr::new(XAttrNamespace::User, name, value.to_vec())
    }

    #[test]
    fn oversized_attr_fails_validation_before_staging() {
        let (mut ctx, _, _) = setup();
        let config = XAttrConfig::new().size_limit(256);
        let mut inode = TestInode::new(1, None);

        // 100-byte name plus 200-byte value: 300 bytes against a 256 limit.
        let big = attr(&"n".repeat(100), &vec![0u8; 200]);
        let result = update_attr(&mut ctx, &config, &mut inode, &big);

        assert!(matches!(result, Err(TxError::XAttrTooBig { size: 300, limit: 256 })));
        assert!(result.unwrap_err().is_validation());
        assert!(!ctx.is_dirty());
    }

    #[test]
    fn name_and_value_limits_are_checked_separately() {
        let config = XAttrConfig::new().max_name_len(8).max_value_len(8);

        assert!(matches!(
            check_attr_size(&config, &attr("too-long-name", b"")),
            Err(TxError::NameTooLong { .. })
        ));
        assert!(matches!(
            check_attr_size(&config, &attr("ok", &vec![0u8; 9])),
            Err(TxError::ValueTooLong { .. })
        ));
        assert!(check_attr_size(&config, &attr("ok", b"small")).is_ok());
    }

    #[test]
    fn per_inode_cap_rejects_the_next_create() {
        let (mut ctx, _, _) = setup();
        let config = XAttrConfig::new().max_xattrs_per_inode(2);
        let mut inode = TestInode::new(1, None);

        update_attr(&mut ctx, &config, &mut inode, &attr("a", b"1")).unwrap();
        update_attr(&mut ctx, &config, &mut inode, &attr("b", b"2")).unwrap();

        let result = update_attr(&mut ctx, &config, &mut inode, &attr("c", b"3"));
        assert!(matches!(
            result,
            Err(TxError::TooManyXAttrs { count: 2, limit: 2 })
        ));

        // Replacing an existing attribute is not a create and stays legal.
        update_attr(&mut ctx, &config, &mut inode, &attr("a", b"9")).unwrap();
    }

    #[test]
    fn feed_member_updates_stage_ordered_log_entries() {
        let (mut ctx, _, _) = setup();
        let config = XAttrConfig::default();
        let mut inode = TestInode::new(5, Some(42));

        update_attr(&mut ctx, &config, &mut inode, &attr("a", b"1")).unwrap();
        update_attr(&mut ctx, &config, &mut inode, &attr("a", b"2")).unwrap();
        remove_attr(&mut ctx, &mut inode, &attr("a", b"")).unwrap();

        assert_eq!(inode.logical_time, LogicalTime::new(3));
        assert_eq!(inode.saves, 3);

        let entries = ctx.staged_meta_log_entries(InodeId::new(5)).unwrap();
        let ops: Vec<LogOperation> = entries.iter().map(|e| e.operation).collect();
        assert_eq!(
            ops,
            vec![
                LogOperation::AddXAttr,
                LogOperation::UpdateXAttr,
                LogOperation::DeleteXAttr
            ]
        );
        assert!(entries.iter().all(|e| e.dataset_id == DatasetId::new(42)));
    }

    #[test]
    fn non_feed_inodes_log_nothing() {
        let (mut ctx, _, _) = setup();
        let config = XAttrConfig::default();
        let mut inode = TestInode::new(6, None);

        update_attr(&mut ctx, &config, &mut inode, &attr("a", b"1")).unwrap();

        assert_eq!(inode.saves, 0);
        assert!(ctx.staged_meta_log_entries(inode.id()).unwrap().is_empty());
    }

    #[test]
    fn read_attrs_empty_list_means_all() {
        let (mut ctx, xattr_access, _) = setup();
        xattr_access.seed(vec![
            StoredXAttr::from_attr(InodeId::new(7), &attr("a", b"1")),
            StoredXAttr::from_attr(InodeId::new(7), &attr("b", b"2")),
        ]);

        let all = read_attrs(&mut ctx, InodeId::new(7), &[]).unwrap();
        assert_eq!(all.len(), 2);

        let some = read_attrs(&mut ctx, InodeId::new(7), &[attr("b", b"")]).unwrap();
        assert_eq!(some, vec![attr("b", b"2")]);
    }

    #[test]
    fn remove_of_missing_attr_is_a_conflict() {
        let (mut ctx, _, _) = setup();
        let mut inode = TestInode::new(8, None);

        // Resolve the inode's (empty) attribute set first.
        read_attrs(&mut ctx, InodeId::new(8), &[]).unwrap();

        let result = remove_attr(&mut ctx, &mut inode, &attr("ghost", b""));
        assert!(matches!(result, Err(TxError::MutationConflict { .. })));
    }
}
