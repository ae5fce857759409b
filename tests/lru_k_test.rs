//! Integration tests for the LRU-K replacer

use strata::buffer::LruKReplacer;
use strata::common::FrameId;

#[test]
fn test_under_k_frames_evict_by_first_access() {
    let replacer = LruKReplacer::new(2, 10);

    // Every frame has a single access, so every k-distance is +inf and
    // the earliest first access loses.
    for i in 0..5 {
        replacer.record_access(FrameId::new(i));
    }
    assert_eq!(replacer.size(), 5);

    for i in 0..5 {
        assert_eq!(replacer.evict(), Some(FrameId::new(i)));
    }
    assert_eq!(replacer.size(), 0);
    assert_eq!(replacer.evict(), None);
}

#[test]
fn test_infinite_distance_beats_finite() {
    let replacer = LruKReplacer::new(2, 10);

    // Frame 0: one access (+inf). Frames 1, 2: two accesses each.
    replacer.record_access(FrameId::new(0));
    replacer.record_access(FrameId::new(1));
    replacer.record_access(FrameId::new(1));
    replacer.record_access(FrameId::new(2));
    replacer.record_access(FrameId::new(2));

    assert_eq!(replacer.evict(), Some(FrameId::new(0)));
    // Among finite distances the earlier kth-most-recent access wins.
    assert_eq!(replacer.evict(), Some(FrameId::new(1)));
    assert_eq!(replacer.evict(), Some(FrameId::new(2)));
}

#[test]
fn test_scan_pattern_scenario() {
    // K = 2, accesses 1,2,3,1,2,1: frame 3 is the only under-K frame,
    // so it goes first no matter how stale frame 1's history is.
    let replacer = LruKReplacer::new(2, 8);

    for frame in [1u32, 2, 3, 1, 2, 1] {
        replacer.record_access(FrameId::new(frame));
    }
    assert_eq!(replacer.size(), 3);

    assert_eq!(replacer.evict(), Some(FrameId::new(3)));
    // Frame 2's 2nd-most-recent access (t=2) predates frame 1's (t=4).
    assert_eq!(replacer.evict(), Some(FrameId::new(2)));
    assert_eq!(replacer.evict(), Some(FrameId::new(1)));
}

#[test]
fn test_non_evictable_frames_are_skipped() {
    let replacer = LruKReplacer::new(2, 10);

    replacer.record_access(FrameId::new(0));
    replacer.record_access(FrameId::new(1));
    replacer.record_access(FrameId::new(2));
    replacer.set_evictable(FrameId::new(0), false);

    assert_eq!(replacer.size(), 2);
    assert_eq!(replacer.evict(), Some(FrameId::new(1)));
    assert_eq!(replacer.evict(), Some(FrameId::new(2)));
    assert_eq!(replacer.evict(), None, "frame 0 is pinned");
}

#[test]
fn test_size_tracks_evictable_transitions() {
    let replacer = LruKReplacer::new(2, 10);

    replacer.record_access(FrameId::new(0));
    replacer.record_access(FrameId::new(1));
    assert_eq!(replacer.size(), 2);

    replacer.set_evictable(FrameId::new(0), false);
    assert_eq!(replacer.size(), 1);

    // Toggling an already-false flag changes nothing.
    replacer.set_evictable(FrameId::new(0), false);
    assert_eq!(replacer.size(), 1);

    replacer.set_evictable(FrameId::new(0), true);
    assert_eq!(replacer.size(), 2);

    replacer.remove(FrameId::new(1));
    assert_eq!(replacer.size(), 1);
}

#[test]
fn test_remove_unknown_frame_is_noop() {
    let replacer = LruKReplacer::new(2, 10);
    replacer.remove(FrameId::new(7));
    assert_eq!(replacer.size(), 0);
}

#[test]
fn test_eviction_restores_priority_after_reaccess() {
    let replacer = LruKReplacer::new(2, 10);

    replacer.record_access(FrameId::new(0));
    replacer.record_access(FrameId::new(0));
    replacer.record_access(FrameId::new(1));
    replacer.record_access(FrameId::new(1));

    // Two fresh accesses push frame 0's kth-most-recent access past
    // frame 1's, flipping the eviction order.
    replacer.record_access(FrameId::new(0));
    replacer.record_access(FrameId::new(0));
    assert_eq!(replacer.evict(), Some(FrameId::new(1)));
    assert_eq!(replacer.evict(), Some(FrameId::new(0)));
}

#[test]
fn test_concurrent_record_and_evict() {
    use std::sync::Arc;
    use std::thread;

    let replacer = Arc::new(LruKReplacer::new(2, 100));

    let handles: Vec<_> = (0..4)
        .map(|t| {
            let replacer = Arc::clone(&replacer);
            thread::spawn(move || {
                for i in 0..25 {
                    replacer.record_access(FrameId::new(t * 25 + i));
                }
            })
        })
        .collect();
    for handle in handles {
        handle.join().unwrap();
    }

    assert_eq!(replacer.size(), 100);
    for _ in 0..100 {
        assert!(replacer.evict().is_some());
    }
    assert_eq!(replacer.size(), 0);
}
