//! Deadline-based deferred events.
//!
//! Delayed state changes (e.g. clearing the one-way fall-through flag) are
//! stored as `(deadline, event)` pairs and drained once per tick by their
//! owner. Nothing suspends; an event simply fires on the first tick whose
//! clock has reached its deadline.

/// Tolerance when comparing a tick clock built from repeated `dt` steps
/// against a deadline built from `now + delay`.
pub const TIME_EPSILON: f64 = 1e-6;

#[derive(Clone, Debug, PartialEq)]
pub struct Scheduler<E> {
    pending: Vec<(f64, E)>,
}

impl<E> Default for Scheduler<E> {
    fn default() -> Self {
        Self { pending: Vec::new() }
    }
}

impl<E> Scheduler<E> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn schedule(&mut self, deadline: f64, event: E) {
        self.pending.push((deadline, event));
    }

    /// Remove and return every event due at `now`, in scheduling order.
    pub fn drain_due(&mut self, now: f64) -> Vec<E> {
        let mut due = Vec::new();
        let mut i = 0;
        while i < self.pending.len() {
            if self.pending[i].0 <= now + TIME_EPSILON {
                due.push(self.pending.remove(i).1);
            } else {
                i += 1;
            }
        }
        due
    }
}
