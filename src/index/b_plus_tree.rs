use std::sync::Arc;

use parking_lot::RwLock;

use crate::buffer::{BufferPoolManager, Frame};
use crate::common::{PageId, RecordId, Result, StrataError, HEADER_PAGE_ID};
use crate::storage::page::{HeaderPage, HeaderPageMut};

use super::generic_key::{GenericKey, KeyComparator};
use super::node_page::{
    adopt_child, internal_capacity, internal_scratch_len, internal_used_len, leaf_capacity,
    InternalPage, InternalPageMut, LeafPage, LeafPageMut, NodeHeader,
};
use super::index_iterator::IndexIterator;
use super::transaction::{ReadLatchedPage, Transaction, WriteLatchedPage};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TreeOp {
    Insert,
    Delete,
}

#[derive(Clone, Copy)]
enum LeafTarget<'a> {
    Key(&'a [u8]),
    LeftMost,
    RightMost,
}

/// A concurrent B+Tree index over fixed-width keys, backed entirely by
/// buffer-pool pages. Keys are unique and sorted by the comparator;
/// values are record ids.
///
/// Concurrency follows latch crabbing: reads couple shared latches down
/// the tree, writes hold exclusive latches from the root-id cell until
/// a node proven safe for the operation lets the ancestors go. The
/// root-id cell is an `RwLock<PageId>` shared with any iterators, and
/// every root change is written through to the header page.
pub struct BPlusTree<const N: usize> {
    index_name: String,
    root_page_id: Arc<RwLock<PageId>>,
    bpm: Arc<BufferPoolManager>,
    comparator: Arc<dyn KeyComparator>,
    leaf_max_size: usize,
    internal_max_size: usize,
}

impl<const N: usize> BPlusTree<N> {
    /// Opens (or registers) the index called `name` in the header page.
    /// An existing root id is picked up, so an index survives reopening
    /// the same database file.
    pub fn new(
        name: impl Into<String>,
        bpm: Arc<BufferPoolManager>,
        comparator: Arc<dyn KeyComparator>,
        leaf_max_size: usize,
        internal_max_size: usize,
    ) -> Result<Self> {
        let name = name.into();
        assert!(
            (3..=leaf_capacity(N)).contains(&leaf_max_size),
            "leaf max size {leaf_max_size} does not fit a page"
        );
        assert!(
            (3..=internal_capacity(N)).contains(&internal_max_size),
            "internal max size {internal_max_size} does not fit a page"
        );

        let frame = bpm.fetch_page(HEADER_PAGE_ID)?;
        let (header_valid, existing) = {
            let data = frame.read_data();
            let header = HeaderPage::new(&data[..]);
            (header.is_valid(), header.get_root_id(&name))
        };
        if !header_valid {
            bpm.unpin_page(HEADER_PAGE_ID, false);
            return Err(StrataError::CorruptPage("header page magic mismatch"));
        }

        let root_id = match existing {
            Some(root_id) => {
                bpm.unpin_page(HEADER_PAGE_ID, false);
                root_id
            }
            None => {
                let inserted = {
                    let mut data = frame.write_data();
                    HeaderPageMut::new(&mut data[..]).insert_record(&name, PageId::INVALID)
                };
                bpm.unpin_page(HEADER_PAGE_ID, true);
                if !inserted {
                    return Err(StrataError::HeaderPageFull);
                }
                PageId::INVALID
            }
        };

        Ok(Self {
            index_name: name,
            root_page_id: Arc::new(RwLock::new(root_id)),
            bpm,
            comparator,
            leaf_max_size,
            internal_max_size,
        })
    }

    pub fn is_empty(&self) -> bool {
        !self.root_page_id.read().is_valid()
    }

    pub fn get_root_page_id(&self) -> PageId {
        *self.root_page_id.read()
    }

    pub fn name(&self) -> &str {
        &self.index_name
    }

    /*****************************************************************
     * SEARCH
     *****************************************************************/

    /// Point lookup. Pushes the value for `key` onto `result` and
    /// returns true when the key exists.
    pub fn get_value(
        &self,
        key: &GenericKey<N>,
        result: &mut Vec<RecordId>,
        _txn: &mut Transaction,
    ) -> Result<bool> {
        let Some(leaf) = self.find_leaf_read(LeafTarget::Key(key.as_bytes()))? else {
            return Ok(false);
        };
        let found = {
            let data = leaf.frame().read_data();
            LeafPage::<N>::new(&data[..]).lookup(key.as_bytes(), self.comparator.as_ref())
        };
        drop(leaf);
        match found {
            Some(value) => {
                result.push(value);
                Ok(true)
            }
            None => Ok(false),
        }
    }

    /// Shared-latch coupling descent. Returns None for an empty tree;
    /// otherwise the returned page is the target leaf, latched and
    /// pinned.
    fn find_leaf_read(&self, target: LeafTarget<'_>) -> Result<Option<ReadLatchedPage>> {
        let root_cell = self.root_page_id.read();
        let root_id = *root_cell;
        if !root_id.is_valid() {
            return Ok(None);
        }
        let frame = self.bpm.fetch_page(root_id)?;
        let mut current = ReadLatchedPage::latch(Arc::clone(&self.bpm), root_id, frame);
        // The cell is only needed until the root page itself is latched.
        drop(root_cell);

        loop {
            let child_id = {
                let data = current.frame().read_data();
                let header = NodeHeader::new(&data[..]);
                if header.is_leaf() {
                    None
                } else {
                    let node = InternalPage::<N>::new(&data[..]);
                    Some(match target {
                        LeafTarget::Key(key) => node.lookup(key, self.comparator.as_ref()),
                        LeafTarget::LeftMost => node.child_at(0),
                        LeafTarget::RightMost => node.child_at(node.size() - 1),
                    })
                }
            };
            match child_id {
                None => return Ok(Some(current)),
                Some(child_id) => {
                    let child_frame = self.bpm.fetch_page(child_id)?;
                    let child = ReadLatchedPage::latch(Arc::clone(&self.bpm), child_id, child_frame);
                    // Assigning drops the parent after the child latch is held.
                    current = child;
                }
            }
        }
    }

    /*****************************************************************
     * INSERT
     *****************************************************************/

    /// Inserts a unique key. Returns false (with no side effects) when
    /// the key already exists.
    pub fn insert(
        &self,
        key: &GenericKey<N>,
        value: RecordId,
        txn: &mut Transaction,
    ) -> Result<bool> {
        let result = self.insert_inner(key, value, txn);
        if result.is_err() {
            txn.release_all();
            txn.take_deleted_pages();
        }
        result
    }

    fn insert_inner(
        &self,
        key: &GenericKey<N>,
        value: RecordId,
        txn: &mut Transaction,
    ) -> Result<bool> {
        let mut root_guard = self.root_page_id.write_arc();
        if !root_guard.is_valid() {
            *root_guard = self.start_new_tree(key, value)?;
            return Ok(true);
        }
        let root_id = *root_guard;
        txn.add_root_cell(root_guard);

        let leaf_id = self.find_leaf_write(root_id, key.as_bytes(), TreeOp::Insert, txn)?;
        let leaf_frame = txn.frame_of(leaf_id).expect("leaf latched by descent");

        let (old_size, new_size) = {
            let mut data = leaf_frame.write_data();
            let mut leaf = LeafPageMut::<N>::new(&mut data[..]);
            let old = leaf.size();
            let new = leaf.insert(key.as_bytes(), value, self.comparator.as_ref());
            (old, new)
        };
        if new_size == old_size {
            // Duplicate key.
            txn.release_all();
            return Ok(false);
        }
        txn.mark_dirty(leaf_id);
        if new_size < self.leaf_max_size {
            txn.release_all();
            return Ok(true);
        }

        // The leaf is at max_size: split it and push a separator up.
        tracing::trace!(target: "strata::btree", page = leaf_id.as_u32(), "splitting leaf");
        let (sibling_id, sibling_frame) = self.bpm.new_page()?;
        let leaf_parent_id;
        let sep_key;
        {
            let mut leaf_data = leaf_frame.write_data();
            let mut leaf = LeafPageMut::<N>::new(&mut leaf_data[..]);
            leaf_parent_id = leaf.parent_page_id();

            let mut sib_data = sibling_frame.write_data();
            let mut sibling = LeafPageMut::<N>::new(&mut sib_data[..]);
            sibling.init(sibling_id, leaf_parent_id, self.leaf_max_size);

            leaf.move_half_to(&mut sibling);
            sibling.set_next_page_id(leaf.next_page_id());
            leaf.set_next_page_id(sibling_id);
            sep_key = GenericKey::<N>::from_bytes(sibling.key_at(0));
        }

        let result = self.insert_into_parent(txn, leaf_id, leaf_parent_id, &sep_key, sibling_id);
        self.bpm.unpin_page(sibling_id, true);
        result?;
        Ok(true)
    }

    /// First insert into an empty tree: a single root leaf.
    fn start_new_tree(&self, key: &GenericKey<N>, value: RecordId) -> Result<PageId> {
        let (root_id, frame) = self.bpm.new_page()?;
        {
            let mut data = frame.write_data();
            let mut leaf = LeafPageMut::<N>::new(&mut data[..]);
            leaf.init(root_id, PageId::INVALID, self.leaf_max_size);
            leaf.insert(key.as_bytes(), value, self.comparator.as_ref());
        }
        self.bpm.unpin_page(root_id, true);
        self.update_root_record(root_id)?;
        tracing::debug!(target: "strata::btree", root = root_id.as_u32(), "started new tree");
        Ok(root_id)
    }

    /// Hooks a freshly split-off `right_id` into `left_id`'s parent
    /// under `sep_key`, growing a new root or splitting the parent
    /// through the oversized scratch buffer as needed.
    fn insert_into_parent(
        &self,
        txn: &mut Transaction,
        left_id: PageId,
        parent_id: PageId,
        sep_key: &GenericKey<N>,
        right_id: PageId,
    ) -> Result<()> {
        if !parent_id.is_valid() {
            // `left_id` was the root: grow the tree by one level.
            let (new_root_id, root_frame) = self.bpm.new_page()?;
            {
                let mut data = root_frame.write_data();
                let mut root = InternalPageMut::<N>::new(&mut data[..]);
                root.init(new_root_id, PageId::INVALID, self.internal_max_size);
                root.populate_root(left_id, sep_key.as_bytes(), right_id);
            }
            self.bpm.unpin_page(new_root_id, true);
            adopt_child(&self.bpm, left_id, new_root_id)?;
            adopt_child(&self.bpm, right_id, new_root_id)?;

            txn.set_root_id(new_root_id);
            self.update_root_record(new_root_id)?;
            tracing::debug!(target: "strata::btree", root = new_root_id.as_u32(), "tree grew a level");
            txn.release_all();
            return Ok(());
        }

        let parent_frame = txn
            .frame_of(parent_id)
            .expect("parent latched while a child splits");
        let parent_size = {
            let data = parent_frame.read_data();
            InternalPage::<N>::new(&data[..]).size()
        };

        if parent_size < self.internal_max_size {
            {
                let mut data = parent_frame.write_data();
                let mut parent = InternalPageMut::<N>::new(&mut data[..]);
                parent.insert(sep_key.as_bytes(), right_id, self.comparator.as_ref());
            }
            txn.mark_dirty(parent_id);
            txn.release_all();
            return Ok(());
        }

        // The parent is full: insert into an oversized copy, split that,
        // and write the surviving left half back over the parent page.
        tracing::trace!(target: "strata::btree", page = parent_id.as_u32(), "splitting internal node");
        let mut scratch = vec![0u8; internal_scratch_len(N, self.internal_max_size)];
        let grandparent_id;
        {
            let data = parent_frame.read_data();
            let used = internal_used_len(N, self.internal_max_size);
            scratch[..used].copy_from_slice(&data[..used]);
            grandparent_id = InternalPage::<N>::new(&data[..]).parent_page_id();
        }
        let mut scratch_node = InternalPageMut::<N>::new(&mut scratch[..]);
        scratch_node.insert(sep_key.as_bytes(), right_id, self.comparator.as_ref());

        let (sib_id, sib_frame) = self.bpm.new_page()?;
        let sep_up;
        {
            let mut sib_data = sib_frame.write_data();
            let mut sibling = InternalPageMut::<N>::new(&mut sib_data[..]);
            sibling.init(sib_id, grandparent_id, self.internal_max_size);
            scratch_node.move_half_to(&mut sibling, &self.bpm)?;
            sep_up = GenericKey::<N>::from_bytes(sibling.key_at(0));
        }
        {
            let mut data = parent_frame.write_data();
            let keep = scratch_node.size();
            InternalPageMut::<N>::new(&mut data[..]).restore_prefix_from(scratch_node.raw_bytes(), keep);
        }
        txn.mark_dirty(parent_id);

        let result = self.insert_into_parent(txn, parent_id, grandparent_id, &sep_up, sib_id);
        self.bpm.unpin_page(sib_id, true);
        result
    }

    /*****************************************************************
     * REMOVE
     *****************************************************************/

    /// Removes `key` if present; removing an absent key is a no-op.
    pub fn remove(&self, key: &GenericKey<N>, txn: &mut Transaction) -> Result<()> {
        let result = self.remove_inner(key, txn);
        if result.is_err() {
            txn.release_all();
            txn.take_deleted_pages();
        }
        result
    }

    fn remove_inner(&self, key: &GenericKey<N>, txn: &mut Transaction) -> Result<()> {
        let root_guard = self.root_page_id.write_arc();
        if !root_guard.is_valid() {
            return Ok(());
        }
        let root_id = *root_guard;
        txn.add_root_cell(root_guard);

        let leaf_id = self.find_leaf_write(root_id, key.as_bytes(), TreeOp::Delete, txn)?;
        let leaf_frame = txn.frame_of(leaf_id).expect("leaf latched by descent");

        let (old_size, new_size) = {
            let mut data = leaf_frame.write_data();
            let mut leaf = LeafPageMut::<N>::new(&mut data[..]);
            let old = leaf.size();
            let new = leaf.remove(key.as_bytes(), self.comparator.as_ref());
            (old, new)
        };
        if new_size == old_size {
            // Key was absent.
            txn.release_all();
            return Ok(());
        }
        txn.mark_dirty(leaf_id);

        let leaf_deleted = self.coalesce_or_redistribute(leaf_id, txn)?;
        if leaf_deleted {
            txn.add_deleted_page(leaf_id);
        }
        txn.release_all();

        for page_id in txn.take_deleted_pages() {
            if !self.bpm.delete_page(page_id)? {
                tracing::debug!(
                    target: "strata::btree",
                    page = page_id.as_u32(),
                    "deferred page delete skipped: still pinned"
                );
            }
        }
        Ok(())
    }

    /// Fixes up `page_id` after an underflow. Returns true when the
    /// node was merged away and the caller must schedule its deletion.
    fn coalesce_or_redistribute(&self, page_id: PageId, txn: &mut Transaction) -> Result<bool> {
        let frame = txn.frame_of(page_id).expect("node latched");
        let (is_root, is_leaf, size, min_size, parent_id) = {
            let data = frame.read_data();
            let header = NodeHeader::new(&data[..]);
            (
                header.is_root(),
                header.is_leaf(),
                header.size(),
                header.min_size(),
                header.parent_page_id(),
            )
        };

        if is_root {
            let root_deleted = self.adjust_root(&frame, txn)?;
            txn.release_all();
            return Ok(root_deleted);
        }
        if size >= min_size {
            txn.release_all();
            return Ok(false);
        }

        let parent_frame = txn
            .frame_of(parent_id)
            .expect("parent latched while a child underflows");
        let (node_idx, sibling_id, sibling_is_left) = {
            let data = parent_frame.read_data();
            let parent = InternalPage::<N>::new(&data[..]);
            let idx = parent
                .value_index(page_id)
                .expect("underflowed node registered in its parent");
            if idx > 0 {
                (idx, parent.child_at(idx - 1), true)
            } else {
                (idx, parent.child_at(idx + 1), false)
            }
        };

        let sib_frame = self.bpm.fetch_page(sibling_id)?;
        let mut sibling = WriteLatchedPage::latch(Arc::clone(&self.bpm), sibling_id, sib_frame);
        let (sib_size, sib_min) = {
            let data = sibling.frame().read_data();
            let header = NodeHeader::new(&data[..]);
            (header.size(), header.min_size())
        };

        if sib_size > sib_min {
            tracing::trace!(
                target: "strata::btree",
                page = page_id.as_u32(),
                sibling = sibling_id.as_u32(),
                "redistributing"
            );
            self.redistribute(&frame, &mut sibling, &parent_frame, node_idx, sibling_is_left)?;
            txn.mark_dirty(page_id);
            txn.mark_dirty(parent_id);
            txn.release_all();
            return Ok(false);
        }

        tracing::trace!(
            target: "strata::btree",
            page = page_id.as_u32(),
            sibling = sibling_id.as_u32(),
            "coalescing"
        );
        if sibling_is_left {
            // This node drains into its left sibling and dies.
            self.merge_into_left(sibling.frame(), &frame, &parent_frame, node_idx, is_leaf)?;
            sibling.mark_dirty();
            txn.mark_dirty(page_id);
            txn.mark_dirty(parent_id);
            drop(sibling);

            let parent_deleted = self.coalesce_or_redistribute(parent_id, txn)?;
            if parent_deleted {
                txn.add_deleted_page(parent_id);
            }
            Ok(true)
        } else {
            // The right sibling drains into this node and dies.
            let sibling_slot = node_idx + 1;
            self.merge_into_left(&frame, sibling.frame(), &parent_frame, sibling_slot, is_leaf)?;
            sibling.mark_dirty();
            txn.mark_dirty(page_id);
            txn.mark_dirty(parent_id);
            txn.add_deleted_page(sibling_id);
            drop(sibling);

            let parent_deleted = self.coalesce_or_redistribute(parent_id, txn)?;
            if parent_deleted {
                txn.add_deleted_page(parent_id);
            }
            Ok(false)
        }
    }

    /// Merges the node at parent slot `right_slot` into its left
    /// neighbor and drops the parent's separator entry.
    fn merge_into_left(
        &self,
        left_frame: &Frame,
        right_frame: &Frame,
        parent_frame: &Frame,
        right_slot: usize,
        is_leaf: bool,
    ) -> Result<()> {
        let middle_key = {
            let data = parent_frame.read_data();
            InternalPage::<N>::new(&data[..]).key_at(right_slot).to_vec()
        };
        {
            let mut right_data = right_frame.write_data();
            let mut left_data = left_frame.write_data();
            if is_leaf {
                let mut right = LeafPageMut::<N>::new(&mut right_data[..]);
                let mut left = LeafPageMut::<N>::new(&mut left_data[..]);
                right.move_all_to(&mut left);
            } else {
                let mut right = InternalPageMut::<N>::new(&mut right_data[..]);
                let mut left = InternalPageMut::<N>::new(&mut left_data[..]);
                right.move_all_to(&mut left, &middle_key, &self.bpm)?;
            }
        }
        {
            let mut data = parent_frame.write_data();
            InternalPageMut::<N>::new(&mut data[..]).remove_at(right_slot);
        }
        Ok(())
    }

    /// Borrows one entry from a sibling with spare capacity, rotating
    /// the parent separator.
    fn redistribute(
        &self,
        node_frame: &Frame,
        sibling: &mut WriteLatchedPage,
        parent_frame: &Frame,
        node_idx: usize,
        sibling_is_left: bool,
    ) -> Result<()> {
        let is_leaf = {
            let data = node_frame.read_data();
            NodeHeader::new(&data[..]).is_leaf()
        };

        let (parent_slot, new_separator) = if is_leaf {
            let mut sib_data = sibling.frame().write_data();
            let mut node_data = node_frame.write_data();
            let mut sib = LeafPageMut::<N>::new(&mut sib_data[..]);
            let mut node = LeafPageMut::<N>::new(&mut node_data[..]);
            if sibling_is_left {
                sib.move_last_to_front_of(&mut node);
                (node_idx, node.key_at(0).to_vec())
            } else {
                sib.move_first_to_end_of(&mut node);
                (node_idx + 1, sib.key_at(0).to_vec())
            }
        } else if sibling_is_left {
            let middle_key = {
                let data = parent_frame.read_data();
                InternalPage::<N>::new(&data[..]).key_at(node_idx).to_vec()
            };
            let mut sib_data = sibling.frame().write_data();
            let mut node_data = node_frame.write_data();
            let mut sib = InternalPageMut::<N>::new(&mut sib_data[..]);
            let mut node = InternalPageMut::<N>::new(&mut node_data[..]);
            sib.move_last_to_front_of(&mut node, &middle_key, &self.bpm)?;
            (node_idx, node.key_at(0).to_vec())
        } else {
            let middle_key = {
                let data = parent_frame.read_data();
                InternalPage::<N>::new(&data[..]).key_at(node_idx + 1).to_vec()
            };
            let mut sib_data = sibling.frame().write_data();
            let mut node_data = node_frame.write_data();
            let mut sib = InternalPageMut::<N>::new(&mut sib_data[..]);
            let mut node = InternalPageMut::<N>::new(&mut node_data[..]);
            sib.move_first_to_end_of(&mut node, &middle_key, &self.bpm)?;
            (node_idx + 1, sib.key_at(0).to_vec())
        };

        {
            let mut data = parent_frame.write_data();
            InternalPageMut::<N>::new(&mut data[..]).set_key_at(parent_slot, &new_separator);
        }
        sibling.mark_dirty();
        Ok(())
    }

    /// Shrinks the root: promotes a lone child, or empties the tree
    /// when the root leaf has no entries. Returns true when the old
    /// root page should be deleted.
    fn adjust_root(&self, root_frame: &Frame, txn: &mut Transaction) -> Result<bool> {
        let (is_leaf, size) = {
            let data = root_frame.read_data();
            let header = NodeHeader::new(&data[..]);
            (header.is_leaf(), header.size())
        };

        if !is_leaf && size == 1 {
            let only_child = {
                let data = root_frame.read_data();
                InternalPage::<N>::new(&data[..]).child_at(0)
            };
            adopt_child(&self.bpm, only_child, PageId::INVALID)?;
            txn.set_root_id(only_child);
            self.update_root_record(only_child)?;
            tracing::debug!(
                target: "strata::btree",
                root = only_child.as_u32(),
                "promoted lone child to root"
            );
            return Ok(true);
        }
        if is_leaf && size == 0 {
            txn.set_root_id(PageId::INVALID);
            self.update_root_record(PageId::INVALID)?;
            tracing::debug!(target: "strata::btree", "tree emptied");
            return Ok(true);
        }
        Ok(false)
    }

    /*****************************************************************
     * DESCENT (write side)
     *****************************************************************/

    /// Exclusive-latch crabbing descent. Every visited page joins the
    /// transaction's page set; ancestors are released as soon as a
    /// child proves safe for `op`. Returns the target leaf's id, whose
    /// latch entry is the last in the page set.
    fn find_leaf_write(
        &self,
        root_id: PageId,
        key: &[u8],
        op: TreeOp,
        txn: &mut Transaction,
    ) -> Result<PageId> {
        let frame = self.bpm.fetch_page(root_id)?;
        let mut current = WriteLatchedPage::latch(Arc::clone(&self.bpm), root_id, frame);
        if self.is_safe(current.frame(), op) {
            txn.release_all();
        }

        loop {
            let child_id = {
                let data = current.frame().read_data();
                let header = NodeHeader::new(&data[..]);
                if header.is_leaf() {
                    None
                } else {
                    Some(InternalPage::<N>::new(&data[..]).lookup(key, self.comparator.as_ref()))
                }
            };
            match child_id {
                None => {
                    let leaf_id = current.page_id();
                    txn.add_page(current);
                    return Ok(leaf_id);
                }
                Some(child_id) => {
                    let child_frame = self.bpm.fetch_page(child_id)?;
                    let child =
                        WriteLatchedPage::latch(Arc::clone(&self.bpm), child_id, child_frame);
                    txn.add_page(current);
                    if self.is_safe(child.frame(), op) {
                        txn.release_all();
                    }
                    current = child;
                }
            }
        }
    }

    /// A node is safe when the pending operation cannot propagate a
    /// structural change above it.
    fn is_safe(&self, frame: &Frame, op: TreeOp) -> bool {
        let data = frame.read_data();
        let header = NodeHeader::new(&data[..]);
        match op {
            TreeOp::Insert => {
                if header.is_leaf() {
                    header.size() < header.max_size() - 1
                } else {
                    header.size() < header.max_size()
                }
            }
            TreeOp::Delete => {
                if header.is_root() {
                    // Safe as long as a removal cannot change the root id.
                    if header.is_leaf() {
                        header.size() > 1
                    } else {
                        header.size() > 2
                    }
                } else {
                    header.size() > header.min_size()
                }
            }
        }
    }

    /*****************************************************************
     * ITERATORS
     *****************************************************************/

    /// Iterator over the whole tree in key order.
    pub fn begin(&self) -> Result<IndexIterator<N>> {
        let leaf = self.find_leaf_read(LeafTarget::LeftMost)?;
        Ok(IndexIterator::new(Arc::clone(&self.bpm), leaf, 0))
    }

    /// Iterator starting at the first key not less than `key`.
    pub fn begin_at(&self, key: &GenericKey<N>) -> Result<IndexIterator<N>> {
        let leaf = self.find_leaf_read(LeafTarget::Key(key.as_bytes()))?;
        let index = match &leaf {
            Some(page) => {
                let data = page.frame().read_data();
                LeafPage::<N>::new(&data[..]).find_pos(key.as_bytes(), self.comparator.as_ref())
            }
            None => 0,
        };
        Ok(IndexIterator::new(Arc::clone(&self.bpm), leaf, index))
    }

    /// The past-the-end iterator: parked after the right-most leaf's
    /// last entry, or the empty iterator for an empty tree.
    pub fn end(&self) -> Result<IndexIterator<N>> {
        let leaf = self.find_leaf_read(LeafTarget::RightMost)?;
        let index = match &leaf {
            Some(page) => {
                let data = page.frame().read_data();
                LeafPage::<N>::new(&data[..]).size()
            }
            None => 0,
        };
        Ok(IndexIterator::new(Arc::clone(&self.bpm), leaf, index))
    }

    /*****************************************************************
     * ROOT-ID RECORD
     *****************************************************************/

    /// Writes the current root id through to this index's header-page
    /// record and flushes it, so a reopened instance finds the root.
    fn update_root_record(&self, root_id: PageId) -> Result<()> {
        let frame = self.bpm.fetch_page(HEADER_PAGE_ID)?;
        let updated = {
            let mut data = frame.write_data();
            HeaderPageMut::new(&mut data[..]).update_record(&self.index_name, root_id)
        };
        self.bpm.unpin_page(HEADER_PAGE_ID, true);
        if !updated {
            return Err(StrataError::IndexNameNotFound(self.index_name.clone()));
        }
        self.bpm.flush_page(HEADER_PAGE_ID)?;
        Ok(())
    }
}
