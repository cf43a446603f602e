//! Time-ordered delta queue over a fixed arena.
//!
//! Slots live in a fixed arena and are threaded into a singly-linked list
//! sorted by due time. A free slot is marked by the sentinel `TIME_FREE`;
//! a permanent fencepost entry at `TIME_FENCE` terminates the list so it
//! is never empty. The producer (message parser) enqueues under the
//! engine's queue lock; the per-block drain consumes due entries and
//! returns their slots to free.

use heapless::Vec as FixedVec;
use mm_ir::{Delta, QUEUE_CAP, TIME_FENCE, TIME_FREE};

const NIL: u16 = u16::MAX;
/// Arena index of the fencepost entry.
const FENCE: usize = QUEUE_CAP;

#[derive(Clone, Copy)]
struct Slot {
    delta: Delta,
    next: u16,
}

/// Fixed-capacity scheduler for pending parameter changes.
pub struct DeltaQueue {
    slots: Vec<Slot>,
    head: u16,
    /// Free-slot scan resumes here; keeps allocation O(1) amortized.
    last_write: usize,
    live: usize,
}

impl Default for DeltaQueue {
    fn default() -> Self {
        Self::new()
    }
}

impl DeltaQueue {
    pub fn new() -> Self {
        let free = Slot {
            delta: Delta::new(TIME_FREE, 0, mm_ir::ParamTag::Freq, 0.0),
            next: NIL,
        };
        let mut slots = vec![free; QUEUE_CAP + 1];
        slots[FENCE].delta.time = TIME_FENCE;
        Self { slots, head: FENCE as u16, last_write: 0, live: 0 }
    }

    /// Schedule a delta. Returns false when the arena is exhausted; the
    /// delta is dropped silently.
    pub fn enqueue(&mut self, delta: Delta) -> bool {
        let mut slot = None;
        for k in 0..QUEUE_CAP {
            let i = (self.last_write + k) % QUEUE_CAP;
            if self.slots[i].delta.time == TIME_FREE {
                slot = Some(i);
                break;
            }
        }
        let Some(i) = slot else {
            tracing::debug!(live = self.live, "delta queue full, dropping");
            return false;
        };
        self.last_write = i;
        self.slots[i].delta = delta;

        // Sorted insert. Equal times land after existing entries, so ties
        // drain in insertion order. The fencepost bounds the walk.
        if delta.time < self.slots[self.head as usize].delta.time {
            self.slots[i].next = self.head;
            self.head = i as u16;
        } else {
            let mut cur = self.head as usize;
            loop {
                let next = self.slots[cur].next;
                if next == NIL || self.slots[next as usize].delta.time > delta.time {
                    break;
                }
                cur = next as usize;
            }
            self.slots[i].next = self.slots[cur].next;
            self.slots[cur].next = i as u16;
        }
        self.live += 1;
        true
    }

    /// Pop every entry with `time <= now_ms` into `out`, oldest first.
    ///
    /// Stops early if `out` fills; the remainder drains next block.
    pub fn drain_due<const N: usize>(&mut self, now_ms: u64, out: &mut FixedVec<Delta, N>) {
        while (self.head as usize) != FENCE {
            let h = self.head as usize;
            if self.slots[h].delta.time > now_ms {
                break;
            }
            if out.push(self.slots[h].delta).is_err() {
                break;
            }
            self.head = self.slots[h].next;
            self.slots[h].delta.time = TIME_FREE;
            self.slots[h].next = NIL;
            self.live -= 1;
        }
    }

    /// Number of live (scheduled, undrained) deltas.
    pub fn len(&self) -> usize {
        self.live
    }

    pub fn is_empty(&self) -> bool {
        self.live == 0
    }

    pub const fn capacity(&self) -> usize {
        QUEUE_CAP
    }

    /// Count arena slots not marked free (excludes the fencepost).
    /// The queue invariant is `occupied() == len()` at all times.
    pub fn occupied(&self) -> usize {
        self.slots[..QUEUE_CAP]
            .iter()
            .filter(|s| s.delta.time != TIME_FREE)
            .count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mm_ir::ParamTag;

    fn d(time: u64, osc: u8, value: f32) -> Delta {
        Delta::new(time, osc, ParamTag::Freq, value)
    }

    fn drain_all(q: &mut DeltaQueue, now: u64) -> Vec<Delta> {
        let mut out: FixedVec<Delta, 64> = FixedVec::new();
        q.drain_due(now, &mut out);
        out.iter().copied().collect()
    }

    #[test]
    fn drains_in_time_order() {
        let mut q = DeltaQueue::new();
        q.enqueue(d(30, 0, 0.0));
        q.enqueue(d(10, 1, 0.0));
        q.enqueue(d(20, 2, 0.0));
        let out = drain_all(&mut q, 100);
        let times: Vec<u64> = out.iter().map(|d| d.time).collect();
        assert_eq!(times, [10, 20, 30]);
        assert!(q.is_empty());
    }

    #[test]
    fn equal_times_keep_insertion_order() {
        let mut q = DeltaQueue::new();
        q.enqueue(d(5, 0, 1.0));
        q.enqueue(d(5, 0, 2.0));
        q.enqueue(d(1, 0, 0.0));
        q.enqueue(d(5, 0, 3.0));
        let out = drain_all(&mut q, 10);
        let values: Vec<f32> = out.iter().map(|d| d.value).collect();
        assert_eq!(values, [0.0, 1.0, 2.0, 3.0]);
    }

    #[test]
    fn undue_entries_stay() {
        let mut q = DeltaQueue::new();
        q.enqueue(d(100, 0, 0.0));
        q.enqueue(d(50, 0, 0.0));
        let out = drain_all(&mut q, 60);
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].time, 50);
        assert_eq!(q.len(), 1);
    }

    #[test]
    fn capacity_exhaustion_drops() {
        let mut q = DeltaQueue::new();
        for i in 0..QUEUE_CAP {
            assert!(q.enqueue(d(i as u64, 0, 0.0)));
        }
        assert!(!q.enqueue(d(9999, 0, 0.0)));
        assert_eq!(q.len(), QUEUE_CAP);
    }

    #[test]
    fn size_counter_matches_occupied_slots() {
        let mut q = DeltaQueue::new();
        for i in 0..40u64 {
            q.enqueue(d(i * 3, 0, 0.0));
            assert_eq!(q.len(), q.occupied());
        }
        drain_all(&mut q, 60);
        assert_eq!(q.len(), q.occupied());
        for i in 0..10u64 {
            q.enqueue(d(500 + i, 0, 0.0));
        }
        assert_eq!(q.len(), q.occupied());
    }

    #[test]
    fn slots_are_reused_after_drain() {
        let mut q = DeltaQueue::new();
        for round in 0..5u64 {
            for i in 0..QUEUE_CAP {
                assert!(q.enqueue(d(round * 1000 + i as u64, 0, 0.0)), "round {}", round);
            }
            let mut out: FixedVec<Delta, QUEUE_CAP> = FixedVec::new();
            q.drain_due(round * 1000 + QUEUE_CAP as u64, &mut out);
            assert_eq!(out.len(), QUEUE_CAP);
            assert!(q.is_empty());
        }
    }

    #[test]
    fn drain_resumes_when_out_fills() {
        let mut q = DeltaQueue::new();
        for i in 0..20u64 {
            q.enqueue(d(i, 0, i as f32));
        }
        let mut out: FixedVec<Delta, 8> = FixedVec::new();
        q.drain_due(100, &mut out);
        assert_eq!(out.len(), 8);
        assert_eq!(q.len(), 12);

        let mut rest: FixedVec<Delta, 64> = FixedVec::new();
        q.drain_due(100, &mut rest);
        assert_eq!(rest.len(), 12);
        assert_eq!(rest[0].value, 8.0);
    }
}
