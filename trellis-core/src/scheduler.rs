use std::cell::Cell;

use tracing::{debug, warn};

/// Identifies one scheduled render pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Ticket(u64);

/// Coalesces render requests into deferred passes.
///
/// Scheduling while a pass is pending cancels it and issues a new ticket.
/// Requests made while a pass runs are queued and picked up by the
/// enclosing [`RenderQueue::flush`] rather than recursing.
#[derive(Debug, Default)]
pub struct RenderQueue {
    next: Cell<u64>,
    pending: Cell<Option<Ticket>>,
    running: Cell<bool>,
    superseded: Cell<u64>,
    completed: Cell<u64>,
}

/// Marks a pass as in progress until dropped.
pub struct PassGuard<'a> {
    queue: &'a RenderQueue,
}

impl Drop for PassGuard<'_> {
    fn drop(&mut self) {
        self.queue.running.set(false);
        self.queue.completed.set(self.queue.completed.get() + 1);
    }
}

impl RenderQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn schedule(&self) -> Ticket {
        if self.pending.get().is_some() {
            self.superseded.set(self.superseded.get() + 1);
        }
        let ticket = Ticket(self.next.get());
        self.next.set(ticket.0 + 1);
        self.pending.set(Some(ticket));
        ticket
    }

    /// Drops the pending pass, if any.
    pub fn cancel(&self) -> bool {
        self.pending.take().is_some()
    }

    pub fn is_pending(&self) -> bool {
        self.pending.get().is_some()
    }

    pub fn in_pass(&self) -> bool {
        self.running.get()
    }

    /// Number of pending passes that were replaced before they ran.
    pub fn superseded(&self) -> u64 {
        self.superseded.get()
    }

    pub fn completed(&self) -> u64 {
        self.completed.get()
    }

    /// Enters a pass; `None` while another pass is running.
    pub fn begin(&self) -> Option<PassGuard<'_>> {
        if self.running.replace(true) {
            return None;
        }
        Some(PassGuard { queue: self })
    }

    /// Runs pending passes until the queue is empty or `max_passes` ran.
    ///
    /// A nested call from inside a pass returns `Ok(0)` immediately; the
    /// outer loop sees whatever the pass scheduled.
    pub fn flush<E, F>(&self, max_passes: usize, mut run: F) -> Result<usize, E>
    where
        F: FnMut() -> Result<(), E>,
    {
        if self.in_pass() {
            return Ok(0);
        }
        let mut ran = 0;
        while self.pending.take().is_some() {
            if ran == max_passes {
                warn!(max_passes, "render queue did not settle; dropping further passes");
                break;
            }
            let Some(_guard) = self.begin() else { break };
            run()?;
            ran += 1;
        }
        if ran > 0 {
            debug!(passes = ran, "render queue flushed");
        }
        Ok(ran)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rescheduling_supersedes_pending_ticket() {
        let q = RenderQueue::new();
        let a = q.schedule();
        let b = q.schedule();
        assert_ne!(a, b);
        assert_eq!(q.superseded(), 1);
        assert!(q.cancel());
        assert!(!q.is_pending());
    }

    #[test]
    fn begin_rejects_reentry() {
        let q = RenderQueue::new();
        let guard = q.begin();
        assert!(guard.is_some());
        assert!(q.begin().is_none());
        drop(guard);
        assert!(!q.in_pass());
        assert_eq!(q.completed(), 1);
    }
}
