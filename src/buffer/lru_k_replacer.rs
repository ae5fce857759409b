use std::collections::{HashMap, VecDeque};

use parking_lot::Mutex;

use crate::common::{FrameId, Timestamp};

/// Access history for a single frame.
#[derive(Debug)]
struct FrameRecord {
    /// Up to k access timestamps, most recent at the back. Once the
    /// history is full, the front entry is the kth most recent access.
    history: VecDeque<Timestamp>,
    is_evictable: bool,
}

impl FrameRecord {
    fn new(is_evictable: bool) -> Self {
        Self {
            history: VecDeque::new(),
            is_evictable,
        }
    }

    fn record_access(&mut self, timestamp: Timestamp, k: usize) {
        self.history.push_back(timestamp);
        while self.history.len() > k {
            self.history.pop_front();
        }
    }

    /// Backward k-distance; None means +inf (fewer than k accesses).
    fn k_distance(&self, now: Timestamp, k: usize) -> Option<Timestamp> {
        if self.history.len() < k {
            None
        } else {
            Some(now - self.history[self.history.len() - k])
        }
    }

    /// Oldest timestamp still in the history. For a full history this
    /// is the kth most recent access; for an under-k frame it is the
    /// earliest access overall.
    fn oldest(&self) -> Option<Timestamp> {
        self.history.front().copied()
    }
}

struct ReplacerState {
    records: HashMap<FrameId, FrameRecord>,
    clock: Timestamp,
    num_evictable: usize,
}

/// LRU-K replacement policy.
///
/// The victim is the evictable frame with the greatest backward
/// k-distance: `now - timestamp of the kth most recent access`, or
/// +inf for frames with fewer than k recorded accesses. Ties among
/// +inf frames go to the earliest first access; ties among finite
/// distances go to the earliest kth-most-recent access. Both rules
/// reduce to "smallest oldest retained timestamp wins" because the
/// history is trimmed to k entries.
pub struct LruKReplacer {
    k: usize,
    max_frames: usize,
    state: Mutex<ReplacerState>,
}

impl LruKReplacer {
    pub fn new(k: usize, max_frames: usize) -> Self {
        assert!(k > 0, "LRU-K needs k >= 1");
        Self {
            k,
            max_frames,
            state: Mutex::new(ReplacerState {
                records: HashMap::new(),
                clock: 0,
                num_evictable: 0,
            }),
        }
    }

    /// Picks and removes the eviction victim, or None when no frame is
    /// evictable.
    pub fn evict(&self) -> Option<FrameId> {
        let mut state = self.state.lock();
        let victim = self.pick_victim(&state)?;
        let record = state.records.remove(&victim).unwrap();
        debug_assert!(record.is_evictable);
        state.num_evictable -= 1;
        tracing::trace!(target: "strata::replacer", frame = victim.0, "evicted frame");
        Some(victim)
    }

    fn pick_victim(&self, state: &ReplacerState) -> Option<FrameId> {
        let mut victim: Option<FrameId> = None;
        let mut victim_under_k = false;
        let mut victim_oldest: Timestamp = Timestamp::MAX;

        for (&frame_id, record) in &state.records {
            if !record.is_evictable {
                continue;
            }
            let under_k = record.history.len() < self.k;
            let oldest = record.oldest().unwrap_or(0);

            let better = match (victim_under_k, under_k) {
                (true, false) => false,
                (false, true) => true,
                _ => oldest < victim_oldest,
            };
            if victim.is_none() || better {
                victim = Some(frame_id);
                victim_under_k = under_k;
                victim_oldest = oldest;
            }
        }
        victim
    }

    /// Stamps an access for `frame_id`, admitting the frame (evictable)
    /// if it is unknown. Admission at capacity first evicts a victim.
    pub fn record_access(&self, frame_id: FrameId) {
        assert!(
            frame_id.as_usize() < self.max_frames,
            "{frame_id} outside replacer capacity"
        );

        let mut state = self.state.lock();
        if !state.records.contains_key(&frame_id) && state.records.len() == self.max_frames {
            if let Some(victim) = self.pick_victim(&state) {
                state.records.remove(&victim);
                state.num_evictable -= 1;
            }
        }

        state.clock += 1;
        let now = state.clock;
        let k = self.k;
        match state.records.get_mut(&frame_id) {
            Some(record) => record.record_access(now, k),
            None => {
                let mut record = FrameRecord::new(true);
                record.record_access(now, k);
                state.records.insert(frame_id, record);
                state.num_evictable += 1;
            }
        }
    }

    /// Toggles eviction eligibility for a known frame.
    pub fn set_evictable(&self, frame_id: FrameId, is_evictable: bool) {
        let mut state = self.state.lock();
        let Some(record) = state.records.get_mut(&frame_id) else {
            return;
        };
        if record.is_evictable != is_evictable {
            record.is_evictable = is_evictable;
            if is_evictable {
                state.num_evictable += 1;
            } else {
                state.num_evictable -= 1;
            }
        }
    }

    /// Forgets a frame. No-op for unknown frames; removing a pinned
    /// (non-evictable) frame is a caller bug.
    pub fn remove(&self, frame_id: FrameId) {
        let mut state = self.state.lock();
        if let Some(record) = state.records.remove(&frame_id) {
            assert!(
                record.is_evictable,
                "{frame_id} removed from replacer while not evictable"
            );
            state.num_evictable -= 1;
        }
    }

    /// Number of currently evictable frames.
    pub fn size(&self) -> usize {
        self.state.lock().num_evictable
    }

    pub fn k(&self) -> usize {
        self.k
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_replacer_starts_empty() {
        let replacer = LruKReplacer::new(2, 10);
        assert_eq!(replacer.size(), 0);
        assert_eq!(replacer.evict(), None);
    }

    #[test]
    fn test_under_k_frames_evicted_fifo() {
        let replacer = LruKReplacer::new(2, 10);
        for i in 0..3 {
            replacer.record_access(FrameId::new(i));
        }
        assert_eq!(replacer.size(), 3);

        assert_eq!(replacer.evict(), Some(FrameId::new(0)));
        assert_eq!(replacer.evict(), Some(FrameId::new(1)));
        assert_eq!(replacer.evict(), Some(FrameId::new(2)));
        assert_eq!(replacer.evict(), None);
    }

    #[test]
    fn test_under_k_preferred_over_full_history() {
        let replacer = LruKReplacer::new(2, 10);

        // Frame 0 reaches k accesses, frame 1 does not.
        replacer.record_access(FrameId::new(0));
        replacer.record_access(FrameId::new(0));
        replacer.record_access(FrameId::new(1));

        assert_eq!(replacer.evict(), Some(FrameId::new(1)));
        assert_eq!(replacer.evict(), Some(FrameId::new(0)));
    }

    #[test]
    fn test_finite_distances_ranked_by_kth_recent() {
        let replacer = LruKReplacer::new(2, 10);

        // Timestamps: f0 at 1,2; f1 at 3,4; f2 at 5,6.
        for i in 0..3 {
            replacer.record_access(FrameId::new(i));
            replacer.record_access(FrameId::new(i));
        }

        // f0 has the earliest kth-most-recent access, hence the
        // greatest backward k-distance.
        assert_eq!(replacer.evict(), Some(FrameId::new(0)));
        assert_eq!(replacer.evict(), Some(FrameId::new(1)));
        assert_eq!(replacer.evict(), Some(FrameId::new(2)));
    }

    #[test]
    fn test_history_trimmed_to_k() {
        let replacer = LruKReplacer::new(2, 10);

        for _ in 0..10 {
            replacer.record_access(FrameId::new(0));
        }
        replacer.record_access(FrameId::new(1));
        replacer.record_access(FrameId::new(1));

        // Frame 0's kth most recent access (t=9) predates frame 1's
        // (t=11), so frame 0 goes first despite its long history.
        assert_eq!(replacer.evict(), Some(FrameId::new(0)));
        assert_eq!(replacer.evict(), Some(FrameId::new(1)));
    }

    #[test]
    fn test_non_evictable_frames_skipped() {
        let replacer = LruKReplacer::new(2, 10);
        replacer.record_access(FrameId::new(0));
        replacer.record_access(FrameId::new(1));
        replacer.set_evictable(FrameId::new(0), false);

        assert_eq!(replacer.size(), 1);
        assert_eq!(replacer.evict(), Some(FrameId::new(1)));
        assert_eq!(replacer.evict(), None);

        replacer.set_evictable(FrameId::new(0), true);
        assert_eq!(replacer.evict(), Some(FrameId::new(0)));
    }

    #[test]
    fn test_remove_forgets_frame() {
        let replacer = LruKReplacer::new(2, 10);
        replacer.record_access(FrameId::new(0));
        replacer.remove(FrameId::new(0));
        assert_eq!(replacer.size(), 0);
        assert_eq!(replacer.evict(), None);

        // Unknown frames are a silent no-op.
        replacer.remove(FrameId::new(5));
    }

    #[test]
    #[should_panic]
    fn test_remove_non_evictable_asserts() {
        let replacer = LruKReplacer::new(2, 10);
        replacer.record_access(FrameId::new(0));
        replacer.set_evictable(FrameId::new(0), false);
        replacer.remove(FrameId::new(0));
    }

    #[test]
    #[should_panic]
    fn test_out_of_range_frame_asserts() {
        let replacer = LruKReplacer::new(2, 2);
        replacer.record_access(FrameId::new(2));
    }
}
