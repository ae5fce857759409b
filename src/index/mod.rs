mod b_plus_tree;
mod generic_key;
mod index_iterator;
mod node_page;
mod transaction;

pub use b_plus_tree::BPlusTree;
pub use generic_key::{BytewiseComparator, GenericKey, IntegerComparator, KeyComparator};
pub use index_iterator::IndexIterator;
pub use node_page::{
    internal_capacity, leaf_capacity, InternalPage, InternalPageMut, LeafPage, LeafPageMut,
    NodeHeader,
};
pub use transaction::Transaction;
