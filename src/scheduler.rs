use std::cmp::Ordering;
use std::collections::BinaryHeap;
use std::time::{Duration, Instant};
use tracing::debug;

/// An item waiting in the scheduler until its fire time passes
struct ScheduledEntry<T> {
    fire_time: Instant,
    seq: u64,
    item: T,
}

impl<T> PartialEq for ScheduledEntry<T> {
    fn eq(&self, other: &Self) -> bool {
        self.fire_time == other.fire_time && self.seq == other.seq
    }
}

impl<T> Eq for ScheduledEntry<T> {}

impl<T> PartialOrd for ScheduledEntry<T> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl<T> Ord for ScheduledEntry<T> {
    // Reversed so the max-heap yields the earliest fire time first
    fn cmp(&self, other: &Self) -> Ordering {
        other
            .fire_time
            .cmp(&self.fire_time)
            .then_with(|| other.seq.cmp(&self.seq))
    }
}

/// Time-ordered queue of one-shot deferred items
///
/// There is no timer thread: the owner calls `drain` (or `pop_due`) at its
/// own cooperative checkpoints. An item never runs before its fire time, and
/// is removed the first time it is drained.
pub struct Scheduler<T> {
    queue: BinaryHeap<ScheduledEntry<T>>,
    next_seq: u64,
}

impl<T> Scheduler<T> {
    pub fn new() -> Self {
        Self {
            queue: BinaryHeap::new(),
            next_seq: 0,
        }
    }

    /// Schedule `item` to become due at least `min_delay` from now
    pub fn schedule(&mut self, min_delay: Duration, item: T) -> Instant {
        let fire_time = Instant::now() + min_delay;
        self.schedule_at(fire_time, item);
        fire_time
    }

    /// Schedule `item` to become due once `fire_time` has passed
    pub fn schedule_at(&mut self, fire_time: Instant, item: T) {
        let seq = self.next_seq;
        self.next_seq += 1;
        self.queue.push(ScheduledEntry {
            fire_time,
            seq,
            item,
        });
        debug!(pending = self.queue.len(), "Scheduled delayed event");
    }

    /// Remove and return the earliest item whose fire time is strictly before `now`
    pub fn pop_due(&mut self, now: Instant) -> Option<T> {
        match self.queue.peek() {
            Some(entry) if entry.fire_time < now => self.queue.pop().map(|entry| entry.item),
            _ => None,
        }
    }

    /// Hand every due item to `run`, earliest first
    ///
    /// Returns the number of items that were due.
    pub fn drain(&mut self, now: Instant, mut run: impl FnMut(T)) -> usize {
        let mut count = 0;
        while let Some(item) = self.pop_due(now) {
            run(item);
            count += 1;
        }
        count
    }

    /// Fire time of the next pending item, if any
    pub fn next_fire_time(&self) -> Option<Instant> {
        self.queue.peek().map(|entry| entry.fire_time)
    }

    pub fn len(&self) -> usize {
        self.queue.len()
    }

    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }
}

impl<T> Default for Scheduler<T> {
    fn default() -> Self {
        Self::new()
    }
}
