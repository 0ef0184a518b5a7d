//! Clustered B-tree keyed by `u64` row id, with leaves holding [`Row`]s
//! directly rather than indirecting through a separate heap file.
//!
//! Operations take the backing [`Pager`] as an explicit argument rather than
//! owning it: a `storage::Table` owns the tree's root page id, while the
//! `storage::StorageEngine` that contains it owns the single shared `Pager`
//! all of its tables' trees read and write through.

mod node;
mod page;

pub use node::Node;

#[cfg(test)]
mod tests;

use buffer::Pager;
use common::{DbResult, Row};
use page::{decode_node, encode_node};

/// Default tree order (`N`): a node holds at most `N-1` keys.
pub const DEFAULT_ORDER: usize = 64;

/// A clustered B-tree. Holds only the tree's shape (root page, order); all
/// node bytes live in the caller-supplied [`Pager`].
#[derive(Clone, Debug)]
pub struct BTree {
    root_page_id: u32,
    order: usize,
}

impl BTree {
    /// Allocates a fresh empty leaf as the root and returns a tree over it.
    pub fn create(pager: &mut dyn Pager, order: usize) -> DbResult<Self> {
        let root_page_id = pager.allocate()?;
        write_node(pager, root_page_id, &Node::new_leaf(), order)?;
        Ok(Self { root_page_id, order })
    }

    /// Wraps an existing root page id as a tree handle (e.g. when reopening
    /// a table whose root page was recorded elsewhere).
    pub fn open(root_page_id: u32, order: usize) -> Self {
        Self { root_page_id, order }
    }

    pub fn root_page_id(&self) -> u32 {
        self.root_page_id
    }

    pub fn order(&self) -> usize {
        self.order
    }

    /// Returns the row stored under `key`, if any.
    pub fn search(&self, pager: &mut dyn Pager, key: u64) -> DbResult<Option<Row>> {
        let mut page_id = self.root_page_id;
        loop {
            match read_node(pager, page_id, self.order)? {
                Node::Internal { keys, children } => {
                    let idx = keys.partition_point(|&k| k <= key);
                    page_id = children[idx];
                }
                Node::Leaf { keys, rows } => {
                    return Ok(keys.iter().position(|&k| k == key).map(|i| rows[i].clone()));
                }
            }
        }
    }

    /// Inserts `row` under `key`, splitting nodes on the way down as needed.
    /// Inserting an already-present key overwrites its row.
    pub fn insert(&mut self, pager: &mut dyn Pager, key: u64, row: Row) -> DbResult<()> {
        let root = read_node(pager, self.root_page_id, self.order)?;
        if root.is_full(self.order) {
            let old_root_id = self.root_page_id;
            let new_root_id = pager.allocate()?;
            let (median_key, right_id) = self.split_child(pager, old_root_id, root)?;
            let new_root = Node::Internal {
                keys: vec![median_key],
                children: vec![old_root_id, right_id],
            };
            write_node(pager, new_root_id, &new_root, self.order)?;
            self.root_page_id = new_root_id;
        }
        self.insert_non_full(pager, self.root_page_id, key, row)
    }

    fn insert_non_full(&mut self, pager: &mut dyn Pager, page_id: u32, key: u64, row: Row) -> DbResult<()> {
        match read_node(pager, page_id, self.order)? {
            Node::Leaf { mut keys, mut rows } => {
                let idx = keys.partition_point(|&k| k < key);
                if idx < keys.len() && keys[idx] == key {
                    rows[idx] = row;
                } else {
                    keys.insert(idx, key);
                    rows.insert(idx, row);
                }
                write_node(pager, page_id, &Node::Leaf { keys, rows }, self.order)
            }
            Node::Internal { mut keys, mut children } => {
                let mut idx = keys.partition_point(|&k| k <= key);
                let child_id = children[idx];
                let child = read_node(pager, child_id, self.order)?;
                let mut next_child = child_id;
                if child.is_full(self.order) {
                    let (median_key, right_id) = self.split_child(pager, child_id, child)?;
                    keys.insert(idx, median_key);
                    children.insert(idx + 1, right_id);
                    if key > median_key {
                        idx += 1;
                    }
                    next_child = children[idx];
                    write_node(pager, page_id, &Node::Internal { keys, children }, self.order)?;
                }
                self.insert_non_full(pager, next_child, key, row)
            }
        }
    }

    /// Splits a full node currently resident at `page_id`, writing the left
    /// half back in place and the right half to a newly allocated page.
    /// Returns the key promoted to the parent and the right page's id.
    ///
    /// A leaf's promoted key is a copy of the right half's first key (the
    /// row that key owns stays in the right leaf); an internal node's
    /// promoted key is removed from both halves, since only leaves carry
    /// row data.
    fn split_child(&mut self, pager: &mut dyn Pager, page_id: u32, node: Node) -> DbResult<(u64, u32)> {
        let mid = self.order / 2;
        match node {
            Node::Leaf { keys, rows } => {
                let (left_keys, right_keys) = keys.split_at(mid);
                let (left_rows, right_rows) = rows.split_at(mid);
                let median_key = right_keys[0];
                let left = Node::Leaf {
                    keys: left_keys.to_vec(),
                    rows: left_rows.to_vec(),
                };
                let right = Node::Leaf {
                    keys: right_keys.to_vec(),
                    rows: right_rows.to_vec(),
                };
                let right_id = pager.allocate()?;
                write_node(pager, page_id, &left, self.order)?;
                write_node(pager, right_id, &right, self.order)?;
                Ok((median_key, right_id))
            }
            Node::Internal { keys, children } => {
                let median_key = keys[mid];
                let left = Node::Internal {
                    keys: keys[..mid].to_vec(),
                    children: children[..=mid].to_vec(),
                };
                let right = Node::Internal {
                    keys: keys[mid + 1..].to_vec(),
                    children: children[mid + 1..].to_vec(),
                };
                let right_id = pager.allocate()?;
                write_node(pager, page_id, &left, self.order)?;
                write_node(pager, right_id, &right, self.order)?;
                Ok((median_key, right_id))
            }
        }
    }

    /// Replaces the row stored under `key`. Returns `false` if `key` is absent.
    pub fn update(&mut self, pager: &mut dyn Pager, key: u64, row: Row) -> DbResult<bool> {
        let mut page_id = self.root_page_id;
        loop {
            match read_node(pager, page_id, self.order)? {
                Node::Internal { keys, children } => {
                    let idx = keys.partition_point(|&k| k <= key);
                    page_id = children[idx];
                }
                Node::Leaf { keys, mut rows } => {
                    return match keys.iter().position(|&k| k == key) {
                        Some(idx) => {
                            rows[idx] = row;
                            write_node(pager, page_id, &Node::Leaf { keys, rows }, self.order)?;
                            Ok(true)
                        }
                        None => Ok(false),
                    };
                }
            }
        }
    }

    /// Removes the entry for `key`, shifting remaining keys/rows left.
    /// Returns `false` if `key` is absent. Underflowing nodes are left as-is
    /// (no rebalancing).
    pub fn delete(&mut self, pager: &mut dyn Pager, key: u64) -> DbResult<bool> {
        let mut page_id = self.root_page_id;
        loop {
            match read_node(pager, page_id, self.order)? {
                Node::Internal { keys, children } => {
                    let idx = keys.partition_point(|&k| k <= key);
                    page_id = children[idx];
                }
                Node::Leaf { mut keys, mut rows } => {
                    return match keys.iter().position(|&k| k == key) {
                        Some(idx) => {
                            keys.remove(idx);
                            rows.remove(idx);
                            write_node(pager, page_id, &Node::Leaf { keys, rows }, self.order)?;
                            Ok(true)
                        }
                        None => Ok(false),
                    };
                }
            }
        }
    }

    /// Returns every `(key, row)` pair in ascending key order.
    pub fn scan_all(&self, pager: &mut dyn Pager) -> DbResult<Vec<(u64, Row)>> {
        let mut out = Vec::new();
        self.scan_recursive(pager, self.root_page_id, &mut out)?;
        Ok(out)
    }

    fn scan_recursive(&self, pager: &mut dyn Pager, page_id: u32, out: &mut Vec<(u64, Row)>) -> DbResult<()> {
        match read_node(pager, page_id, self.order)? {
            Node::Leaf { keys, rows } => {
                out.extend(keys.into_iter().zip(rows));
            }
            Node::Internal { children, .. } => {
                for child in children {
                    self.scan_recursive(pager, child, out)?;
                }
            }
        }
        Ok(())
    }
}

fn read_node(pager: &mut dyn Pager, page_id: u32, order: usize) -> DbResult<Node> {
    let page = pager.get(page_id)?;
    decode_node(&page.bytes, order as u32)
}

fn write_node(pager: &mut dyn Pager, page_id: u32, node: &Node, order: usize) -> DbResult<()> {
    let page_size = pager.page_size();
    let bytes = encode_node(node, order as u32, page_size)?;
    let page = pager.get_mut(page_id)?;
    page.bytes.copy_from_slice(&bytes);
    pager.mark_dirty(page_id)
}
