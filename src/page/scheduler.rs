//! Cooperative timer scheduler with a virtual clock.
//!
//! The page runs single-threaded on the host's event loop; the only form
//! of suspension is a bounded timer. The scheduler models that with a
//! millisecond clock that embedders (and tests) advance explicitly, which
//! makes every debounce, poll and keystroke yield deterministic.

use std::cell::{Cell, RefCell};
use std::rc::Rc;

/// Identifier for a scheduled timer
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TimerId(u64);

struct TimerEntry {
    id: TimerId,
    deadline: u64,
    callback: Box<dyn FnOnce()>,
}

struct SchedulerInner {
    now_ms: Cell<u64>,
    next_id: Cell<u64>,
    pending: RefCell<Vec<TimerEntry>>,
}

/// Single-threaded timer scheduler. Cloning yields a handle to the same
/// underlying clock and timer queue.
#[derive(Clone)]
pub struct Scheduler {
    inner: Rc<SchedulerInner>,
}

impl Default for Scheduler {
    fn default() -> Self {
        Self::new()
    }
}

impl Scheduler {
    pub fn new() -> Self {
        Self {
            inner: Rc::new(SchedulerInner {
                now_ms: Cell::new(0),
                next_id: Cell::new(1),
                pending: RefCell::new(Vec::new()),
            }),
        }
    }

    /// Current virtual time in milliseconds
    pub fn now_ms(&self) -> u64 {
        self.inner.now_ms.get()
    }

    /// Schedule a one-shot callback `delay_ms` from now
    pub fn schedule(&self, delay_ms: u64, callback: impl FnOnce() + 'static) -> TimerId {
        let id = TimerId(self.inner.next_id.get());
        self.inner.next_id.set(id.0 + 1);
        self.inner.pending.borrow_mut().push(TimerEntry {
            id,
            deadline: self.inner.now_ms.get() + delay_ms,
            callback: Box::new(callback),
        });
        id
    }

    /// Cancel a pending timer. Returns false if it already fired or was
    /// cancelled before.
    pub fn cancel(&self, id: TimerId) -> bool {
        let mut pending = self.inner.pending.borrow_mut();
        let before = pending.len();
        pending.retain(|entry| entry.id != id);
        pending.len() != before
    }

    /// Number of timers that have not fired yet
    pub fn pending_count(&self) -> usize {
        self.inner.pending.borrow().len()
    }

    /// Advance the clock by `ms`, firing due timers in deadline order.
    ///
    /// Callbacks run with the clock set to their own deadline, so a
    /// callback that schedules a follow-up timer inside the advanced
    /// window gets fired within the same call.
    pub fn advance(&self, ms: u64) {
        let target = self.inner.now_ms.get() + ms;
        loop {
            let next = {
                let pending = self.inner.pending.borrow();
                pending
                    .iter()
                    .filter(|entry| entry.deadline <= target)
                    .map(|entry| (entry.deadline, entry.id))
                    .min()
            };
            let Some((deadline, id)) = next else {
                break;
            };
            let entry = {
                let mut pending = self.inner.pending.borrow_mut();
                let idx = pending
                    .iter()
                    .position(|entry| entry.id == id)
                    .expect("timer vanished between lookup and removal");
                pending.remove(idx)
            };
            self.inner.now_ms.set(deadline);
            (entry.callback)();
        }
        self.inner.now_ms.set(target);
    }

    /// Fire all pending timers regardless of deadline (tests only care
    /// that "eventually" work drains).
    pub fn drain(&self) {
        while let Some(deadline) = {
            let pending = self.inner.pending.borrow();
            pending.iter().map(|entry| entry.deadline).max()
        } {
            let now = self.inner.now_ms.get();
            self.advance(deadline.saturating_sub(now).max(1));
        }
    }
}

/// A single-slot timer: restarting always cancels the previous pending
/// timer for the same logical operation, so no two ticks of that
/// operation can ever race.
pub struct TimerSlot {
    scheduler: Scheduler,
    active: Rc<Cell<Option<TimerId>>>,
}

impl TimerSlot {
    pub fn new(scheduler: Scheduler) -> Self {
        Self {
            scheduler,
            active: Rc::new(Cell::new(None)),
        }
    }

    /// Cancel any pending tick and schedule a fresh one
    pub fn restart(&self, delay_ms: u64, callback: impl FnOnce() + 'static) {
        self.clear();
        let active = Rc::clone(&self.active);
        let id = self.scheduler.schedule(delay_ms, move || {
            active.set(None);
            callback();
        });
        self.active.set(Some(id));
    }

    /// Cancel the pending tick, if any
    pub fn clear(&self) {
        if let Some(id) = self.active.take() {
            self.scheduler.cancel(id);
        }
    }

    pub fn is_pending(&self) -> bool {
        self.active.get().is_some()
    }
}

impl Drop for TimerSlot {
    fn drop(&mut self) {
        self.clear();
    }
}
