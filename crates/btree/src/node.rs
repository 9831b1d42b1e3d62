//! B+Tree node definitions and their exact on-page byte layout.
//!
//! Every node lives in exactly one page and is encoded with raw
//! little-endian slice writes rather than a generic serialization crate,
//! since the corpus's `bincode`-based node format does not produce this
//! fixed-offset shape. See the module-level layout table below.
//!
//! ```text
//! is_leaf flag          offset 0    1 byte
//! size                  offset 1    4 bytes
//! parent page id        offset 5    4 bytes
//! leaf:  prev page id   offset 9    4 bytes
//! leaf:  next page id   offset 13   4 bytes
//! leaf:  size * (key:4, page_id:4, slot_id:4)   offset 17
//! internal: size+1 child page ids               offset 9
//! internal: size keys                           offset 9 + 4*(size+1)
//! ```

use common::{DbError, DbResult, PageId, RecordId};
use storage::PAGE_SIZE;

const IS_LEAF_OFFSET: usize = 0;
const SIZE_OFFSET: usize = 1;
const PARENT_OFFSET: usize = 5;
const LEAF_PREV_OFFSET: usize = 9;
const LEAF_NEXT_OFFSET: usize = 13;
const LEAF_ENTRIES_OFFSET: usize = 17;
const LEAF_ENTRY_BYTES: usize = 12;
const INTERNAL_CHILDREN_OFFSET: usize = 9;

fn read_i32(data: &[u8], offset: usize) -> i32 {
    i32::from_le_bytes(data[offset..offset + 4].try_into().unwrap())
}

fn write_i32(data: &mut [u8], offset: usize, value: i32) {
    data[offset..offset + 4].copy_from_slice(&value.to_le_bytes());
}

/// A leaf node: sorted `(key, RID)` entries plus doubly linked sibling
/// pointers.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LeafNode {
    pub page_id: PageId,
    pub parent: PageId,
    pub prev: PageId,
    pub next: PageId,
    pub entries: Vec<(i32, RecordId)>,
}

/// An internal node: `size` separator keys and `size + 1` child page ids.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct InternalNode {
    pub page_id: PageId,
    pub parent: PageId,
    pub keys: Vec<i32>,
    pub children: Vec<PageId>,
}

/// Either variant of a B+Tree node.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum BTreeNode {
    Leaf(LeafNode),
    Internal(InternalNode),
}

impl BTreeNode {
    pub fn page_id(&self) -> PageId {
        match self {
            BTreeNode::Leaf(l) => l.page_id,
            BTreeNode::Internal(i) => i.page_id,
        }
    }

    pub fn parent(&self) -> PageId {
        match self {
            BTreeNode::Leaf(l) => l.parent,
            BTreeNode::Internal(i) => i.parent,
        }
    }

    pub fn set_parent(&mut self, parent: PageId) {
        match self {
            BTreeNode::Leaf(l) => l.parent = parent,
            BTreeNode::Internal(i) => i.parent = parent,
        }
    }

    pub fn size(&self) -> usize {
        match self {
            BTreeNode::Leaf(l) => l.entries.len(),
            BTreeNode::Internal(i) => i.keys.len(),
        }
    }

    pub fn is_leaf(&self) -> bool {
        matches!(self, BTreeNode::Leaf(_))
    }

    pub fn as_leaf(&self) -> Option<&LeafNode> {
        match self {
            BTreeNode::Leaf(l) => Some(l),
            BTreeNode::Internal(_) => None,
        }
    }

    pub fn as_leaf_mut(&mut self) -> Option<&mut LeafNode> {
        match self {
            BTreeNode::Leaf(l) => Some(l),
            BTreeNode::Internal(_) => None,
        }
    }

    pub fn as_internal(&self) -> Option<&InternalNode> {
        match self {
            BTreeNode::Internal(i) => Some(i),
            BTreeNode::Leaf(_) => None,
        }
    }

    pub fn as_internal_mut(&mut self) -> Option<&mut InternalNode> {
        match self {
            BTreeNode::Internal(i) => Some(i),
            BTreeNode::Leaf(_) => None,
        }
    }

    /// Encode this node into a page's 4096-byte payload.
    pub fn encode(&self, dest: &mut [u8; PAGE_SIZE]) -> DbResult<()> {
        match self {
            BTreeNode::Leaf(leaf) => {
                dest[IS_LEAF_OFFSET] = 1;
                write_i32(dest, SIZE_OFFSET, leaf.entries.len() as i32);
                write_i32(dest, PARENT_OFFSET, leaf.parent.0);
                write_i32(dest, LEAF_PREV_OFFSET, leaf.prev.0);
                write_i32(dest, LEAF_NEXT_OFFSET, leaf.next.0);

                let end = LEAF_ENTRIES_OFFSET + leaf.entries.len() * LEAF_ENTRY_BYTES;
                if end > PAGE_SIZE {
                    return Err(DbError::Storage("leaf node overflows page".into()));
                }
                for (i, (key, rid)) in leaf.entries.iter().enumerate() {
                    let base = LEAF_ENTRIES_OFFSET + i * LEAF_ENTRY_BYTES;
                    write_i32(dest, base, *key);
                    write_i32(dest, base + 4, rid.page_id.0);
                    write_i32(dest, base + 8, rid.slot);
                }
            }
            BTreeNode::Internal(internal) => {
                dest[IS_LEAF_OFFSET] = 0;
                write_i32(dest, SIZE_OFFSET, internal.keys.len() as i32);
                write_i32(dest, PARENT_OFFSET, internal.parent.0);

                let keys_offset =
                    INTERNAL_CHILDREN_OFFSET + internal.children.len() * 4;
                let end = keys_offset + internal.keys.len() * 4;
                if end > PAGE_SIZE {
                    return Err(DbError::Storage("internal node overflows page".into()));
                }
                for (i, child) in internal.children.iter().enumerate() {
                    write_i32(dest, INTERNAL_CHILDREN_OFFSET + i * 4, child.0);
                }
                for (i, key) in internal.keys.iter().enumerate() {
                    write_i32(dest, keys_offset + i * 4, *key);
                }
            }
        }
        Ok(())
    }

    /// Decode a node previously written to `page_id`'s payload.
    pub fn decode(page_id: PageId, data: &[u8; PAGE_SIZE]) -> DbResult<Self> {
        let is_leaf = data[IS_LEAF_OFFSET] == 1;
        let size = read_i32(data, SIZE_OFFSET) as usize;
        let parent = PageId(read_i32(data, PARENT_OFFSET));

        if is_leaf {
            let prev = PageId(read_i32(data, LEAF_PREV_OFFSET));
            let next = PageId(read_i32(data, LEAF_NEXT_OFFSET));
            let mut entries = Vec::with_capacity(size);
            for i in 0..size {
                let base = LEAF_ENTRIES_OFFSET + i * LEAF_ENTRY_BYTES;
                let key = read_i32(data, base);
                let rid = RecordId::new(PageId(read_i32(data, base + 4)), read_i32(data, base + 8));
                entries.push((key, rid));
            }
            Ok(BTreeNode::Leaf(LeafNode {
                page_id,
                parent,
                prev,
                next,
                entries,
            }))
        } else {
            let mut children = Vec::with_capacity(size + 1);
            for i in 0..size + 1 {
                children.push(PageId(read_i32(
                    data,
                    INTERNAL_CHILDREN_OFFSET + i * 4,
                )));
            }
            let keys_offset = INTERNAL_CHILDREN_OFFSET + (size + 1) * 4;
            let mut keys = Vec::with_capacity(size);
            for i in 0..size {
                keys.push(read_i32(data, keys_offset + i * 4));
            }
            Ok(BTreeNode::Internal(InternalNode {
                page_id,
                parent,
                keys,
                children,
            }))
        }
    }
}
