use std::sync::Arc;

use strata::buffer::BufferPoolManager;
use strata::index::{BPlusTree, GenericKey, IntegerComparator, Transaction};
use strata::storage::disk::DiskManager;
use strata::{PageId, RecordId, SlotId};

fn main() {
    println!("Strata - a disk-oriented storage engine in Rust");
    println!("===============================================\n");

    let db_path = "demo.db";

    let disk_manager = Arc::new(DiskManager::new(db_path).expect("failed to create disk manager"));
    println!("Created disk manager for: {db_path}");

    // 16 frames, LRU-2 replacement.
    let bpm = Arc::new(BufferPoolManager::new(16, 2, disk_manager));
    println!("Created buffer pool with 16 frames\n");

    // Small fan-out so a handful of keys already exercises splits.
    let tree = BPlusTree::<8>::new("demo_pk", Arc::clone(&bpm), Arc::new(IntegerComparator), 4, 3)
        .expect("failed to create index");

    let mut txn = Transaction::new();
    for k in 1..=20u32 {
        let key = GenericKey::from_integer(k);
        let rid = RecordId::new(PageId::new(100 + k), SlotId::new(0));
        tree.insert(&key, rid, &mut txn).expect("insert failed");
    }
    println!("Inserted keys 1..=20, root is {}", tree.get_root_page_id());

    let probe = GenericKey::from_integer(13);
    let mut found = Vec::new();
    tree.get_value(&probe, &mut found, &mut txn)
        .expect("lookup failed");
    println!("get(13) = {:?}", found);

    for k in [2u32, 4, 6, 8, 10] {
        tree.remove(&GenericKey::from_integer(k), &mut txn)
            .expect("remove failed");
    }
    println!("Removed the even keys up to 10\n");

    print!("Remaining keys in order:");
    for item in tree.begin().expect("iterator failed") {
        let (key, _rid) = item.expect("scan failed");
        print!(" {}", key.to_integer());
    }
    println!();

    bpm.flush_all_pages().expect("flush failed");
    println!("\nFlushed all pages; demo complete.");

    std::fs::remove_file(db_path).ok();
}
