//! Disk-resident B+Tree index mapping `i32` keys to [`RecordId`]s.
//!
//! Every node is persisted as a single page through a private
//! [`buffer::BufferPool`]; see [`node`] for the exact byte layout. Splits are
//! threaded back up the recursive insert call as an `Option<(split_key,
//! new_page_id)>` rather than located through each node's stored `parent`
//! pointer — the recursion already has the descent path on the call stack.
//! Deletes do not rebalance or merge underfull nodes; this is a known,
//! documented limitation inherited from the system this was modeled on.

mod node;

pub use node::{BTreeNode, InternalNode, LeafNode};


use buffer::BufferPool;
use common::{DbError, DbResult, PageId, RecordId};
use tracing::{debug, warn};

/// A disk-resident B+Tree mapping 32-bit integer keys to [`RecordId`]s.
pub struct BTreeIndex {
    pool: BufferPool,
    next_page_id: i32,
    root: PageId,
    order: usize,
}

impl BTreeIndex {
    /// Construct a new, empty tree: allocates a page, writes an empty leaf
    /// there, and records it as the root.
    pub fn new(order: usize, max_frames: usize) -> DbResult<Self> {
        let mut tree = Self {
            pool: BufferPool::new(max_frames),
            next_page_id: 0,
            root: PageId::INVALID,
            order,
        };
        let root_id = tree.allocate_page();
        let root = BTreeNode::Leaf(LeafNode {
            page_id: root_id,
            parent: PageId::INVALID,
            prev: PageId::INVALID,
            next: PageId::INVALID,
            entries: Vec::new(),
        });
        tree.save_node(&root)?;
        tree.root = root_id;
        Ok(tree)
    }

    fn allocate_page(&mut self) -> PageId {
        let id = PageId(self.next_page_id);
        self.next_page_id += 1;
        id
    }

    fn fetch_node(&mut self, page_id: PageId) -> DbResult<BTreeNode> {
        let page = self.pool.fetch_page(page_id)?;
        let node = BTreeNode::decode(page_id, page.data())?;
        self.pool.unpin_page(page_id, false)?;
        Ok(node)
    }

    fn save_node(&mut self, node: &BTreeNode) -> DbResult<()> {
        let page_id = node.page_id();
        let page = self.pool.fetch_page(page_id)?;
        node.encode(page.data_mut())?;
        self.pool.unpin_page(page_id, true)?;
        Ok(())
    }

    /// Position of the first child subtree that may contain `key`:
    /// `while pos < size && key > keys[pos] { pos += 1 }`.
    fn child_position(keys: &[i32], key: i32) -> usize {
        let mut pos = 0;
        while pos < keys.len() && key > keys[pos] {
            pos += 1;
        }
        pos
    }

    /// Insert `key -> rid`. Returns `Ok(false)` if the key already exists
    /// (a duplicate insert is a no-op, never an error).
    pub fn insert(&mut self, key: i32, rid: RecordId) -> DbResult<bool> {
        match self.insert_into(self.root, key, rid)? {
            InsertOutcome::Inserted => Ok(true),
            InsertOutcome::Duplicate => Ok(false),
            InsertOutcome::Split {
                split_key,
                new_page_id,
            } => {
                let new_root_id = self.allocate_page();
                let new_root = BTreeNode::Internal(InternalNode {
                    page_id: new_root_id,
                    parent: PageId::INVALID,
                    keys: vec![split_key],
                    children: vec![self.root, new_page_id],
                });

                let mut old_root = self.fetch_node(self.root)?;
                old_root.set_parent(new_root_id);
                self.save_node(&old_root)?;

                let mut new_child = self.fetch_node(new_page_id)?;
                new_child.set_parent(new_root_id);
                self.save_node(&new_child)?;

                self.save_node(&new_root)?;
                self.root = new_root_id;
                Ok(true)
            }
        }
    }

    fn insert_into(&mut self, page_id: PageId, key: i32, rid: RecordId) -> DbResult<InsertOutcome> {
        let node = self.fetch_node(page_id)?;
        match node {
            BTreeNode::Leaf(mut leaf) => {
                let pos = leaf.entries.partition_point(|(k, _)| *k < key);
                if pos < leaf.entries.len() && leaf.entries[pos].0 == key {
                    warn!(key, "duplicate key insertion");
                    return Ok(InsertOutcome::Duplicate);
                }
                leaf.entries.insert(pos, (key, rid));
                self.save_node(&BTreeNode::Leaf(leaf.clone()))?;

                if leaf.entries.len() >= self.order - 1 {
                    let split_key = self.split_leaf(leaf)?;
                    Ok(InsertOutcome::Split {
                        split_key: split_key.0,
                        new_page_id: split_key.1,
                    })
                } else {
                    Ok(InsertOutcome::Inserted)
                }
            }
            BTreeNode::Internal(mut internal) => {
                let pos = Self::child_position(&internal.keys, key);
                let child = internal.children[pos];
                match self.insert_into(child, key, rid)? {
                    InsertOutcome::Duplicate => Ok(InsertOutcome::Duplicate),
                    InsertOutcome::Inserted => Ok(InsertOutcome::Inserted),
                    InsertOutcome::Split {
                        split_key,
                        new_page_id,
                    } => {
                        internal.keys.insert(pos, split_key);
                        internal.children.insert(pos + 1, new_page_id);
                        self.save_node(&BTreeNode::Internal(internal.clone()))?;

                        if internal.keys.len() >= self.order - 1 {
                            let (promoted_key, new_internal_id) = self.split_internal(internal)?;
                            Ok(InsertOutcome::Split {
                                split_key: promoted_key,
                                new_page_id: new_internal_id,
                            })
                        } else {
                            Ok(InsertOutcome::Inserted)
                        }
                    }
                }
            }
        }
    }

    /// `mid = size / 2`. Entries `[mid, end)` move to a new leaf spliced in
    /// after the original; the promoted split key is the new leaf's first
    /// key.
    fn split_leaf(&mut self, mut leaf: LeafNode) -> DbResult<(i32, PageId)> {
        let mid = leaf.entries.len() / 2;
        let right_entries = leaf.entries.split_off(mid);
        let split_key = right_entries[0].0;

        let new_page_id = self.allocate_page();
        let former_next = leaf.next;

        let new_leaf = LeafNode {
            page_id: new_page_id,
            parent: leaf.parent,
            prev: leaf.page_id,
            next: former_next,
            entries: right_entries,
        };

        leaf.next = new_page_id;
        self.save_node(&BTreeNode::Leaf(leaf))?;
        self.save_node(&BTreeNode::Leaf(new_leaf))?;

        if former_next.is_valid() {
            let mut next_leaf = self.fetch_node(former_next)?;
            if let Some(l) = next_leaf.as_leaf_mut() {
                l.prev = new_page_id;
            }
            self.save_node(&next_leaf)?;
        }

        debug!(split_key, new_page_id = new_page_id.0, "leaf split");
        Ok((split_key, new_page_id))
    }

    /// `mid = size / 2`. The split key is `keys[mid]`; `keys[mid+1..]` and
    /// `children[mid+1..]` move to a new internal node.
    fn split_internal(&mut self, mut internal: InternalNode) -> DbResult<(i32, PageId)> {
        let mid = internal.keys.len() / 2;
        let split_key = internal.keys[mid];

        let new_keys = internal.keys.split_off(mid + 1);
        internal.keys.truncate(mid);
        let new_children = internal.children.split_off(mid + 1);

        let new_page_id = self.allocate_page();
        let new_internal = InternalNode {
            page_id: new_page_id,
            parent: internal.parent,
            keys: new_keys,
            children: new_children,
        };

        self.save_node(&BTreeNode::Internal(internal))?;

        for &child_id in &new_internal.children {
            let mut child = self.fetch_node(child_id)?;
            child.set_parent(new_page_id);
            self.save_node(&child)?;
        }
        self.save_node(&BTreeNode::Internal(new_internal))?;

        debug!(split_key, new_page_id = new_page_id.0, "internal split");
        Ok((split_key, new_page_id))
    }

    /// Descend to the leaf that would contain `key` and binary-search it.
    pub fn search(&mut self, key: i32) -> DbResult<Option<RecordId>> {
        let mut current = self.root;
        loop {
            let node = self.fetch_node(current)?;
            match node {
                BTreeNode::Leaf(leaf) => {
                    return Ok(leaf
                        .entries
                        .binary_search_by_key(&key, |(k, _)| *k)
                        .ok()
                        .map(|idx| leaf.entries[idx].1));
                }
                BTreeNode::Internal(internal) => {
                    let pos = Self::child_position(&internal.keys, key);
                    current = internal.children[pos];
                }
            }
        }
    }

    fn find_first_leaf(&mut self, key: i32) -> DbResult<PageId> {
        let mut current = self.root;
        loop {
            let node = self.fetch_node(current)?;
            match node {
                BTreeNode::Leaf(_) => return Ok(current),
                BTreeNode::Internal(internal) => {
                    let pos = Self::child_position(&internal.keys, key);
                    current = internal.children[pos];
                }
            }
        }
    }

    /// Both bounds inclusive. Returns an empty vector if `start > end`.
    pub fn range_scan(&mut self, start: i32, end: i32) -> DbResult<Vec<RecordId>> {
        if start > end {
            return Ok(Vec::new());
        }
        let mut results = Vec::new();
        let mut current = self.find_first_leaf(start)?;
        loop {
            if !current.is_valid() {
                break;
            }
            let node = self.fetch_node(current)?;
            let Some(leaf) = node.as_leaf() else {
                return Err(DbError::Storage("range scan reached a non-leaf".into()));
            };
            let mut stop = false;
            for &(key, rid) in &leaf.entries {
                if key > end {
                    stop = true;
                    break;
                }
                if key >= start {
                    results.push(rid);
                }
            }
            if stop {
                break;
            }
            current = leaf.next;
        }
        Ok(results)
    }

    /// Locate and remove `key` from its leaf if present. Does not rebalance
    /// or merge underfull nodes.
    pub fn delete(&mut self, key: i32) -> DbResult<bool> {
        let leaf_id = self.find_first_leaf(key)?;
        let node = self.fetch_node(leaf_id)?;
        let Some(mut leaf) = node.as_leaf().cloned() else {
            return Err(DbError::Storage("delete reached a non-leaf".into()));
        };
        match leaf.entries.binary_search_by_key(&key, |(k, _)| *k) {
            Ok(idx) => {
                leaf.entries.remove(idx);
                self.save_node(&BTreeNode::Leaf(leaf))?;
                Ok(true)
            }
            Err(_) => Ok(false),
        }
    }
}

enum InsertOutcome {
    Inserted,
    Duplicate,
    Split { split_key: i32, new_page_id: PageId },
}
