//! One-shot deferred messages keyed to a scene generation.

use crate::scene::Generation;

/// Handle for cancelling a pending message.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TimerId(u64);

#[derive(Debug)]
struct Pending<M> {
    id: TimerId,
    due: f32,
    generation: Generation,
    message: M,
}

/// Staggered spawns, delayed state changes and similar one-shot callbacks.
///
/// Each entry records the generation that scheduled it. [`due`](Self::due)
/// drops entries from any other generation, so a message can never reach a
/// scene instance other than the one that asked for it.
#[derive(Debug)]
pub struct Scheduler<M> {
    generation: Generation,
    pending: Vec<Pending<M>>,
    next_id: u64,
}

impl<M> Scheduler<M> {
    pub fn new(generation: Generation) -> Self {
        Self {
            generation,
            pending: Vec::new(),
            next_id: 0,
        }
    }

    /// Deliver `message` once scene time reaches `now + delay`.
    pub fn after(&mut self, now: f32, delay: f32, message: M) -> TimerId {
        let id = TimerId(self.next_id);
        self.next_id += 1;
        self.pending.push(Pending {
            id,
            due: now + delay.max(0.0),
            generation: self.generation,
            message,
        });
        id
    }

    pub fn cancel(&mut self, id: TimerId) -> bool {
        let before = self.pending.len();
        self.pending.retain(|p| p.id != id);
        self.pending.len() != before
    }

    /// Drop everything pending. Returns how many were cancelled.
    pub fn cancel_all(&mut self) -> usize {
        let count = self.pending.len();
        self.pending.clear();
        count
    }

    /// Take the messages due at `now`, earliest first.
    ///
    /// `current` is the generation of the live scene; `None` means no scene
    /// is live and every pending entry is discarded.
    pub fn due(&mut self, now: f32, current: Option<Generation>) -> Vec<M> {
        let (stale, live): (Vec<_>, Vec<_>) = self
            .pending
            .drain(..)
            .partition(|p| Some(p.generation) != current);
        if !stale.is_empty() {
            tracing::trace!(count = stale.len(), "dropped stale deferred messages");
        }

        let (mut ready, waiting): (Vec<_>, Vec<_>) = live.into_iter().partition(|p| p.due <= now);
        self.pending = waiting;
        ready.sort_by(|a, b| a.due.total_cmp(&b.due).then(a.id.cmp(&b.id)));
        ready.into_iter().map(|p| p.message).collect()
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }
}
