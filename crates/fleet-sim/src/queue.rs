//! The event queue and the replication clock.
//!
//! A binary min-heap keyed by `(time, seq)`.  `seq` is a per-queue counter
//! incremented on every insertion, so events at the same instant pop in
//! the order they were scheduled, independent of heap internals.

use std::cmp::Ordering;
use std::collections::BinaryHeap;

use fleet_core::{SimClock, SimTime};

use crate::event::{Event, EventKind};
use crate::{SimError, SimResult};

/// Heap entry with the ordering reversed, turning `BinaryHeap` into a
/// min-heap on `(time, seq)`.
#[derive(Debug)]
struct Scheduled(Event);

impl PartialEq for Scheduled {
    fn eq(&self, other: &Self) -> bool {
        self.0.time == other.0.time && self.0.seq == other.0.seq
    }
}

impl Eq for Scheduled {}

impl PartialOrd for Scheduled {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Scheduled {
    fn cmp(&self, other: &Self) -> Ordering {
        other
            .0
            .time
            .cmp(&self.0.time)
            .then_with(|| other.0.seq.cmp(&self.0.seq))
    }
}

// ── EventQueue ────────────────────────────────────────────────────────────────

pub struct EventQueue {
    heap:     BinaryHeap<Scheduled>,
    next_seq: u64,
    clock:    SimClock,
}

impl EventQueue {
    pub fn new(horizon: SimTime) -> Self {
        Self {
            heap:     BinaryHeap::new(),
            next_seq: 0,
            clock:    SimClock::new(horizon),
        }
    }

    /// Enqueue `kind` at `at`.  Scheduling strictly before the current time
    /// is an engine bug and is refused.
    pub fn schedule(&mut self, at: SimTime, kind: EventKind) -> SimResult<u64> {
        let now = self.clock.now();
        if at < now {
            return Err(SimError::PastEvent { now, at });
        }
        let seq = self.next_seq;
        self.next_seq += 1;
        self.heap.push(Scheduled(Event { time: at, seq, kind }));
        Ok(seq)
    }

    /// Remove the earliest event and move the clock to its time.
    pub fn pop(&mut self) -> Option<Event> {
        let Scheduled(event) = self.heap.pop()?;
        self.clock.advance_to(event.time);
        Some(event)
    }

    /// [`pop`](Self::pop), unless the earliest event lies past the horizon.
    pub fn pop_due(&mut self) -> Option<Event> {
        let t = self.peek_time()?;
        if self.clock.is_beyond_horizon(t) {
            log::debug!("{} next event at {t} lies past the horizon", self.clock.now());
            return None;
        }
        self.pop()
    }

    pub fn peek_time(&self) -> Option<SimTime> {
        self.heap.peek().map(|s| s.0.time)
    }

    #[inline]
    pub fn now(&self) -> SimTime {
        self.clock.now()
    }

    #[inline]
    pub fn clock(&self) -> &SimClock {
        &self.clock
    }

    pub fn len(&self) -> usize {
        self.heap.len()
    }

    pub fn is_empty(&self) -> bool {
        self.heap.is_empty()
    }
}
