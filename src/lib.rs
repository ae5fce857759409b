//! Strata - the storage-engine core of a disk-oriented database.
//!
//! The crate provides the three subsystems that sit between raw disk
//! blocks and a query engine:
//!
//! - **Storage** (`storage`): page-granular disk I/O
//!   - `DiskManager`: blocking single-file page store and page-id allocator
//!   - `DiskScheduler`: background worker funneling page I/O
//!   - `HeaderPage`: reserved page 0, mapping index names to root page ids
//!
//! - **Buffer pool** (`buffer`): a fixed set of in-memory frames
//!   - `BufferPoolManager`: pin/unpin/flush/delete over N frames
//!   - `LruKReplacer`: LRU-K eviction by backward k-distance
//!   - `Frame`: page bytes plus pin count, dirty bit and the tree latch
//!
//! - **Index** (`index`): a concurrent B+Tree over fixed-width keys
//!   - `BPlusTree`: insert/remove/get with latch crabbing
//!   - `IndexIterator`: in-order scans over the leaf chain
//!   - `GenericKey` / `KeyComparator`: pluggable key ordering
//!
//! # Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use strata::buffer::BufferPoolManager;
//! use strata::index::{BPlusTree, GenericKey, IntegerComparator, Transaction};
//! use strata::storage::disk::DiskManager;
//! use strata::{PageId, RecordId, SlotId};
//!
//! let disk_manager = Arc::new(DiskManager::new("test.db").unwrap());
//! let bpm = Arc::new(BufferPoolManager::new(64, 2, disk_manager));
//!
//! let tree = BPlusTree::<8>::new(
//!     "orders_pk",
//!     Arc::clone(&bpm),
//!     Arc::new(IntegerComparator),
//!     32,
//!     32,
//! )
//! .unwrap();
//!
//! let mut txn = Transaction::new();
//! let key = GenericKey::from_integer(42);
//! let rid = RecordId::new(PageId::new(7), SlotId::new(0));
//! assert!(tree.insert(&key, rid, &mut txn).unwrap());
//!
//! let mut found = Vec::new();
//! assert!(tree.get_value(&key, &mut found, &mut txn).unwrap());
//! assert_eq!(found[0], rid);
//! ```

pub mod buffer;
pub mod common;
pub mod index;
pub mod storage;

// Re-export commonly used types at the crate root
pub use common::{PageId, RecordId, Result, SlotId, StrataError};
