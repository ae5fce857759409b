use std::sync::Arc;

use crate::buffer::BufferPoolManager;
use crate::common::{RecordId, Result};

use super::generic_key::GenericKey;
use super::node_page::LeafPage;
use super::transaction::ReadLatchedPage;

/// Forward iterator over the leaf chain. Owns the current leaf's pin
/// and shared latch, and advances hand-over-hand: the next leaf is
/// latched before the current one is let go.
///
/// An iterator over an empty tree holds no leaf and compares equal to
/// `end()` of an empty tree. A forward scan that runs off the last leaf
/// parks at that leaf's `size`, which is exactly `end()`.
pub struct IndexIterator<const N: usize> {
    bpm: Arc<BufferPoolManager>,
    leaf: Option<ReadLatchedPage>,
    index: usize,
}

impl<const N: usize> IndexIterator<N> {
    pub(crate) fn new(
        bpm: Arc<BufferPoolManager>,
        leaf: Option<ReadLatchedPage>,
        index: usize,
    ) -> Self {
        Self { bpm, leaf, index }
    }

    /// Yields the entry under the cursor and steps forward, following
    /// `next_page_id` across leaves. None once the chain is exhausted.
    pub fn advance(&mut self) -> Result<Option<(GenericKey<N>, RecordId)>> {
        loop {
            let Some(leaf) = &self.leaf else {
                return Ok(None);
            };

            let (item, next_id) = {
                let data = leaf.frame().read_data();
                let node = LeafPage::<N>::new(&data[..]);
                if self.index < node.size() {
                    let key = GenericKey::<N>::from_bytes(node.key_at(self.index));
                    (Some((key, node.value_at(self.index))), node.next_page_id())
                } else {
                    (None, node.next_page_id())
                }
            };

            if let Some(item) = item {
                self.index += 1;
                return Ok(Some(item));
            }
            if !next_id.is_valid() {
                // Parked at end(): right-most leaf, index == size.
                return Ok(None);
            }

            // Hand over hand: latch the successor before dropping the
            // current leaf.
            let next_frame = self.bpm.fetch_page(next_id)?;
            let next_leaf = ReadLatchedPage::latch(Arc::clone(&self.bpm), next_id, next_frame);
            self.leaf = Some(next_leaf);
            self.index = 0;
        }
    }

    /// True when this iterator sits at (or is) the end position.
    pub fn is_end(&self) -> bool {
        match &self.leaf {
            None => true,
            Some(leaf) => {
                let data = leaf.frame().read_data();
                let node = LeafPage::<N>::new(&data[..]);
                self.index >= node.size() && !node.next_page_id().is_valid()
            }
        }
    }
}

impl<const N: usize> PartialEq for IndexIterator<N> {
    fn eq(&self, other: &Self) -> bool {
        match (&self.leaf, &other.leaf) {
            (None, None) => true,
            (Some(a), Some(b)) => a.page_id() == b.page_id() && self.index == other.index,
            _ => false,
        }
    }
}

impl<const N: usize> Iterator for IndexIterator<N> {
    type Item = Result<(GenericKey<N>, RecordId)>;

    fn next(&mut self) -> Option<Self::Item> {
        match self.advance() {
            Ok(Some(item)) => Some(Ok(item)),
            Ok(None) => None,
            Err(e) => Some(Err(e)),
        }
    }
}
