//! Cooperative event scheduler.
//!
//! A routine is a closure resumed once per runnable evaluation; each
//! resumption runs one synchronous segment and returns the next
//! suspension point (a timer or an event). Everything runs on the one
//! driver thread, so shared state needs no locking.
//!
//! Events raised from inside a running segment wake waiters within the
//! same tick; that is how an attach cascades through address resolution
//! into node binding without waiting a full cycle.

use std::cmp::Reverse;
use std::time::Duration;

use tracing::debug;

use crate::events::CoreEvent;

/// A suspension point.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Wait {
    /// Resume no earlier than this long after suspension, evaluated once
    /// per external tick.
    Timer(Duration),
    /// Resume when the event is raised.
    Event(CoreEvent),
}

/// Outcome of one routine segment.
pub enum Step {
    Yield(Wait),
    Done,
}

/// One resumable unit of work.
pub type RoutineFn<C> = Box<dyn FnMut(&mut C, &mut Signals<C>) -> Step>;

/// Cancellation handle returned by [`EventScheduler::start`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RoutineHandle(u64);

/// Events raised and routines spawned from inside a running segment.
///
/// Both take effect within the current tick.
pub struct Signals<C> {
    raised: Vec<CoreEvent>,
    spawned: Vec<Pending<C>>,
}

struct Pending<C> {
    name: String,
    priority: i32,
    routine: RoutineFn<C>,
}

impl<C> Signals<C> {
    fn new() -> Self {
        Self {
            raised: Vec::new(),
            spawned: Vec::new(),
        }
    }

    /// Raise an event; waiters resume later in the current tick.
    pub fn raise(&mut self, event: CoreEvent) {
        self.raised.push(event);
    }

    /// Start a routine; its first segment runs within the current tick.
    pub fn start(&mut self, name: impl Into<String>, priority: i32, routine: RoutineFn<C>) {
        self.spawned.push(Pending {
            name: name.into(),
            priority,
            routine,
        });
    }
}

enum State {
    Runnable,
    Timer(Duration),
    Event(CoreEvent),
    Terminated,
}

struct Slot<C> {
    id: u64,
    name: String,
    priority: i32,
    state: State,
    routine: RoutineFn<C>,
}

/// Single-threaded cooperative scheduler driven by an external tick.
pub struct EventScheduler<C> {
    slots: Vec<Slot<C>>,
    pending_events: Vec<CoreEvent>,
    next_id: u64,
}

impl<C> Default for EventScheduler<C> {
    fn default() -> Self {
        Self::new()
    }
}

impl<C> EventScheduler<C> {
    pub fn new() -> Self {
        Self {
            slots: Vec::new(),
            pending_events: Vec::new(),
            next_id: 0,
        }
    }

    /// Register a routine as runnable at the given priority.
    pub fn start(
        &mut self,
        name: impl Into<String>,
        priority: i32,
        routine: RoutineFn<C>,
    ) -> RoutineHandle {
        self.push(name.into(), priority, State::Runnable, routine)
    }

    /// Register a routine initially suspended on `event`.
    ///
    /// The usual shape for event loops: the body runs on each signal and
    /// re-yields the same event.
    pub fn start_on(
        &mut self,
        name: impl Into<String>,
        priority: i32,
        event: CoreEvent,
        routine: RoutineFn<C>,
    ) -> RoutineHandle {
        self.push(name.into(), priority, State::Event(event), routine)
    }

    fn push(
        &mut self,
        name: String,
        priority: i32,
        state: State,
        routine: RoutineFn<C>,
    ) -> RoutineHandle {
        let id = self.next_id;
        self.next_id += 1;
        debug!("Starting routine '{}' (priority {})", name, priority);
        self.slots.push(Slot {
            id,
            name,
            priority,
            state,
            routine,
        });
        RoutineHandle(id)
    }

    /// Mark a routine terminated; it is skipped from the next evaluation
    /// on. Side effects of already-run segments stay.
    pub fn cancel(&mut self, handle: RoutineHandle) {
        if let Some(slot) = self.slots.iter_mut().find(|slot| slot.id == handle.0) {
            debug!("Cancelling routine '{}'", slot.name);
            slot.state = State::Terminated;
        }
    }

    /// Queue an event for delivery at the next tick.
    pub fn signal(&mut self, event: CoreEvent) {
        self.pending_events.push(event);
    }

    /// Number of live routines.
    pub fn len(&self) -> usize {
        self.slots
            .iter()
            .filter(|slot| !matches!(slot.state, State::Terminated))
            .count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Names of live routines, for diagnostics.
    pub fn routine_names(&self) -> Vec<&str> {
        self.slots
            .iter()
            .filter(|slot| !matches!(slot.state, State::Terminated))
            .map(|slot| slot.name.as_str())
            .collect()
    }

    /// Advance timers by `elapsed`, deliver queued events, then run every
    /// runnable routine to its next suspension in descending priority
    /// order (ties: registration order).
    pub fn tick(&mut self, ctx: &mut C, elapsed: Duration) {
        for slot in &mut self.slots {
            if let State::Timer(remaining) = &mut slot.state {
                *remaining = remaining.saturating_sub(elapsed);
                if remaining.is_zero() {
                    slot.state = State::Runnable;
                }
            }
        }

        for event in std::mem::take(&mut self.pending_events) {
            self.wake(event);
        }

        while let Some(index) = self.next_runnable() {
            let mut signals = Signals::new();
            let slot = &mut self.slots[index];
            let step = (slot.routine)(ctx, &mut signals);
            slot.state = match step {
                Step::Yield(Wait::Timer(duration)) => State::Timer(duration),
                Step::Yield(Wait::Event(event)) => State::Event(event),
                Step::Done => {
                    debug!("Routine '{}' finished", slot.name);
                    State::Terminated
                }
            };

            for pending in signals.spawned {
                self.push(pending.name, pending.priority, State::Runnable, pending.routine);
            }
            for event in signals.raised {
                self.wake(event);
            }
        }

        self.slots.retain(|slot| !matches!(slot.state, State::Terminated));
    }

    fn wake(&mut self, event: CoreEvent) {
        for slot in &mut self.slots {
            if matches!(slot.state, State::Event(waiting) if waiting == event) {
                slot.state = State::Runnable;
            }
        }
    }

    fn next_runnable(&self) -> Option<usize> {
        self.slots
            .iter()
            .enumerate()
            .filter(|(_, slot)| matches!(slot.state, State::Runnable))
            .min_by_key(|(_, slot)| (Reverse(slot.priority), slot.id))
            .map(|(index, _)| index)
    }
}
