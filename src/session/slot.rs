//! The active-run slot shared by both engines.
//!
//! All run state lives behind one mutex. `start()`, `stop()` and every timer
//! callback take that lock, so a run is either fully installed or fully torn
//! down whenever anyone else looks at it.
//!
//! Events are queued on the slot and handed to the sink once the slot lock
//! is released, so a sink may call back into the engine. Mutating
//! operations are serialized by a delivery gate held until their events are
//! out; a `stop()` from another thread therefore waits for an in-flight
//! delivery, and nothing of the stopped run reaches the sink after it
//! returns. A call made by the sink itself runs on the thread that already
//! holds the gate and skips it. If such a call replaces or ends the run,
//! whatever the outer operation had not delivered yet is dropped.
//!
//! Lock order: gate, slot, scheduler. Schedulers never call back into the
//! engine synchronously, so arming timers under the slot lock is safe.

use std::cell::RefCell;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};

use tracing::{debug, info, trace};

use super::breathing::CycleState;
use super::events::{EventSink, RunEvent, SessionEvent};
use super::meditation::CountdownState;
use super::run::{RunHandle, RunId, RunKind, RunOutcome};
use crate::config::EngineOptions;
use crate::observability::metrics;
use crate::timer::{Scheduler, TimerHandle, TimerTask};

/// Per-run state, reached by callbacks through the slot.
pub(crate) enum RunBody {
    Breathing(CycleState),
    Meditation(CountdownState),
}

pub(crate) struct ActiveRun {
    handle: RunHandle,
    timers: Vec<TimerHandle>,
    body: RunBody,
}

#[derive(Default)]
pub(crate) struct SlotState {
    last_run: u64,
    /// Bumped whenever the slot changes owner.
    generation: u64,
    active: Option<ActiveRun>,
    pending: Vec<RunEvent>,
}

impl SlotState {
    /// Mints the token for a new run.
    pub(crate) const fn mint(&mut self, kind: RunKind) -> RunHandle {
        self.last_run += 1;
        self.generation += 1;
        RunHandle::new(RunId::new(self.last_run), kind)
    }

    /// Queues an event for delivery once the slot is unlocked.
    pub(crate) fn emit(&mut self, run: RunId, event: SessionEvent) {
        self.pending.push(RunEvent { run, event });
    }

    pub(crate) fn current(&self) -> Option<RunHandle> {
        self.active.as_ref().map(|run| run.handle)
    }

    pub(crate) fn is_current(&self, handle: RunHandle) -> bool {
        self.current() == Some(handle)
    }

    pub(crate) fn body(&self, handle: RunHandle) -> Option<&RunBody> {
        self.active
            .as_ref()
            .filter(|run| run.handle == handle)
            .map(|run| &run.body)
    }

    pub(crate) fn body_mut(&mut self, handle: RunHandle) -> Option<&mut RunBody> {
        self.active
            .as_mut()
            .filter(|run| run.handle == handle)
            .map(|run| &mut run.body)
    }
}

/// Events queued by one operation, and the slot generation they belong to.
struct Batch {
    generation: u64,
    events: Vec<RunEvent>,
}

thread_local! {
    /// Engines whose delivery gate is held by this thread.
    static DELIVERING: RefCell<Vec<usize>> = const { RefCell::new(Vec::new()) };
}

/// Holds an engine's delivery gate, unless this thread already does.
struct DeliveryGate<'a> {
    key: usize,
    lock: Option<MutexGuard<'a, ()>>,
}

impl<'a> DeliveryGate<'a> {
    fn enter(shared: &'a Shared) -> Self {
        let key = std::ptr::from_ref(shared).addr();
        if DELIVERING.with_borrow(|held| held.contains(&key)) {
            return Self { key, lock: None };
        }
        let lock = shared.gate.lock().unwrap_or_else(PoisonError::into_inner);
        DELIVERING.with_borrow_mut(|held| held.push(key));
        Self {
            key,
            lock: Some(lock),
        }
    }
}

impl Drop for DeliveryGate<'_> {
    fn drop(&mut self) {
        if self.lock.is_some() {
            DELIVERING.with_borrow_mut(|held| {
                if let Some(at) = held.iter().rposition(|key| *key == self.key) {
                    held.remove(at);
                }
            });
        }
    }
}

pub(crate) struct Shared {
    gate: Mutex<()>,
    slot: Mutex<SlotState>,
    scheduler: Arc<dyn Scheduler>,
    sink: Arc<dyn EventSink>,
    options: EngineOptions,
}

impl Shared {
    pub(crate) fn new(
        scheduler: Arc<dyn Scheduler>,
        sink: Arc<dyn EventSink>,
        options: EngineOptions,
    ) -> Self {
        Self {
            gate: Mutex::default(),
            slot: Mutex::default(),
            scheduler,
            sink,
            options,
        }
    }

    pub(crate) fn lock(&self) -> MutexGuard<'_, SlotState> {
        self.slot.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub(crate) fn scheduler(&self) -> &dyn Scheduler {
        self.scheduler.as_ref()
    }

    pub(crate) const fn options(&self) -> &EngineOptions {
        &self.options
    }

    /// Runs `f` against the slot, then delivers the events it queued with
    /// the slot unlocked.
    pub(crate) fn transact<R>(&self, f: impl FnOnce(&mut SlotState) -> R) -> R {
        let _gate = DeliveryGate::enter(self);
        let (result, batch) = {
            let mut slot = self.lock();
            let result = f(&mut slot);
            let batch = Batch {
                generation: slot.generation,
                events: std::mem::take(&mut slot.pending),
            };
            (result, batch)
        };
        self.deliver(batch);
        result
    }

    /// Hands a batch to the sink. Callers hold the delivery gate.
    fn deliver(&self, batch: Batch) {
        for event in batch.events {
            if self.lock().generation != batch.generation {
                debug!(run = %event.run, "slot changed during delivery, dropping queued events");
                return;
            }
            trace!(run = %event.run, event = event.event.name(), "event");
            metrics::record_event(event.event.name());
            self.sink.emit(event);
        }
    }

    /// Puts a freshly started run into the empty slot.
    pub(crate) fn install(
        &self,
        slot: &mut SlotState,
        handle: RunHandle,
        timers: Vec<TimerHandle>,
        body: RunBody,
    ) {
        debug_assert!(slot.active.is_none(), "slot must be vacated before install");
        slot.active = Some(ActiveRun {
            handle,
            timers,
            body,
        });
        metrics::record_run_started(handle.kind());
        metrics::set_active_run(Some(handle.kind()));
    }

    /// Empties the slot: cancels every timer the run armed, then drops its
    /// state so the run id stops matching. Returns the run that was removed.
    pub(crate) fn teardown(&self, slot: &mut SlotState, outcome: RunOutcome) -> Option<RunHandle> {
        let run = slot.active.take()?;
        slot.generation += 1;
        for timer in &run.timers {
            timer.cancel();
        }
        metrics::record_run_ended(run.handle.kind(), outcome);
        metrics::set_active_run(None);
        info!(
            run = %run.handle.id(),
            kind = %run.handle.kind(),
            outcome = %outcome,
            "run ended"
        );
        Some(run.handle)
    }

    /// Stops `handle` if it is still the active run of the `kind` engine.
    pub(crate) fn stop(&self, handle: RunHandle, kind: RunKind) -> bool {
        self.transact(|slot| {
            if handle.kind() != kind || !slot.is_current(handle) {
                debug!(run = %handle.id(), kind = %kind, "stop ignored, run not active");
                return false;
            }
            self.teardown(slot, RunOutcome::Stopped).is_some()
        })
    }

    /// Wraps a timer callback so it only runs while `handle` owns the slot.
    ///
    /// The callback holds a weak reference: dropping the engine turns every
    /// outstanding callback into a no-op.
    pub(crate) fn callback<F>(self: &Arc<Self>, handle: RunHandle, mut on_fire: F) -> TimerTask
    where
        F: FnMut(&Self, &mut SlotState) + Send + 'static,
    {
        let shared: Weak<Self> = Arc::downgrade(self);
        Box::new(move || {
            let Some(shared) = shared.upgrade() else {
                return;
            };
            shared.transact(|slot| {
                if !slot.is_current(handle) {
                    metrics::record_stale_callback(handle.kind());
                    debug!(run = %handle.id(), kind = %handle.kind(), "stale timer callback ignored");
                    return;
                }
                on_fire(&shared, slot);
            });
        })
    }
}

impl Drop for Shared {
    fn drop(&mut self) {
        let slot = self.slot.get_mut().unwrap_or_else(PoisonError::into_inner);
        if let Some(run) = slot.active.take() {
            for timer in &run.timers {
                timer.cancel();
            }
            metrics::set_active_run(None);
        }
    }
}
