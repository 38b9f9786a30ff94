use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};
use std::time::Duration;

use serde_json::Value;
use tokio::task::JoinHandle;
use tokio::time::{Instant, interval_at};
use tracing::{debug, info, warn};

use crate::channel::EventChannel;
use crate::options::{TransitionName, TransitionSet};
use crate::record::ToastRecord;
use crate::registry::Registry;
use crate::transition::{TransitionPart, TransitionRunner, TransitionStatus, TransitionTarget};
use crate::types::{CloseReason, Role, StackState};

use super::role::Placement;

/// Progress values this close to 100 count as complete.
const PROGRESS_EPSILON: f64 = 1e-9;

/// Reserved values a mounted toast receives from its container.
#[derive(Clone, Debug)]
pub struct ToastProps {
    pub placement: Placement,
    pub channel: EventChannel,
    pub transitions: Arc<TransitionSet>,
}

/// Shared collaborators every controller of a container needs.
#[derive(Clone)]
pub struct ControllerDeps {
    pub registry: Arc<Registry>,
    pub runner: Arc<dyn TransitionRunner>,
    pub tick: Duration,
}

#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub enum Phase {
    #[default]
    Entering,
    Active,
    Closing,
    Removed,
}

/// Point-in-time copy of a controller's transient state.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ToastState {
    pub phase: Phase,
    pub role: Role,
    pub loaded: bool,
    pub paused: bool,
    pub closing: bool,
    pub loading: bool,
    pub progress: f64,
}

#[derive(Debug, Default)]
struct LifeState {
    phase: Phase,
    placement: Placement,
    loaded: bool,
    paused: bool,
    closing: bool,
    loading: bool,
    progress: f64,
    torn_down: bool,
}

struct Inner {
    record: Arc<ToastRecord>,
    channel: EventChannel,
    transitions: Arc<TransitionSet>,
    deps: ControllerDeps,
    state: Mutex<LifeState>,
    tasks: Mutex<Vec<JoinHandle<()>>>,
}

impl Drop for Inner {
    fn drop(&mut self) {
        let tasks = self.tasks.get_mut().unwrap_or_else(PoisonError::into_inner);
        for task in tasks.drain(..) {
            task.abort();
        }
    }
}

/// Drives one toast from mount to removal.
///
/// Background work (progress tick, directive listener, transitions) holds
/// only weak references, so dropping the last handle tears everything down.
#[derive(Clone)]
pub struct ToastController {
    inner: Arc<Inner>,
}

impl ToastController {
    /// Mount a toast: start its enter transition, directive listener and,
    /// for auto-dismissing toasts, the progress tick.
    ///
    /// Must be called from within a tokio runtime.
    pub fn mount(record: Arc<ToastRecord>, props: ToastProps, deps: ControllerDeps) -> Self {
        let inner = Arc::new(Inner {
            record,
            channel: props.channel,
            transitions: props.transitions,
            deps,
            state: Mutex::new(LifeState {
                placement: props.placement,
                ..LifeState::default()
            }),
            tasks: Mutex::new(Vec::new()),
        });
        let controller = Self { inner };
        controller.start();
        controller
    }

    fn start(&self) {
        let record = &self.inner.record;
        let collapsed = self.lock().placement.collapsed;
        debug!(container = %record.container, toast = %record.identifier, collapsed, "mounting toast");

        // Subscribe before announcing so no directive can slip past.
        let mut directives = self.inner.channel.directives_for(&record.identifier);
        let weak = self.downgrade();
        self.spawn(async move {
            while let Some(state) = directives.recv().await {
                let Some(controller) = upgrade(&weak) else {
                    return;
                };
                controller.directive(state);
            }
        });

        self.inner.channel.added(&record.identifier);

        let name = if collapsed {
            TransitionName::StackEnter
        } else {
            TransitionName::Enter
        };
        let run = self.transition(TransitionPart::Body, name);
        let weak = self.downgrade();
        self.spawn(async move {
            let status = run.await;
            if let Some(controller) = upgrade(&weak) {
                controller.entered(status);
            }
        });

        if record.auto_dismiss() {
            self.start_tick();
        }
    }

    fn entered(&self, status: TransitionStatus) {
        let record = &self.inner.record;
        if status == TransitionStatus::Error {
            warn!(container = %record.container, toast = %record.identifier, "enter transition failed");
        }
        {
            let mut state = self.lock();
            if state.torn_down || state.closing {
                return;
            }
            state.loaded = true;
            state.phase = Phase::Active;
        }
        info!(container = %record.container, toast = %record.identifier, mode = %record.mode, "toast opened");
        record.handlers.opened();
    }

    fn start_tick(&self) {
        let period = self.inner.deps.tick;
        let step = 100.0 * period.as_secs_f64() / self.inner.record.duration.as_secs_f64();
        let weak = self.downgrade();
        self.spawn(async move {
            let mut ticker = interval_at(Instant::now() + period, period);
            loop {
                ticker.tick().await;
                let Some(controller) = upgrade(&weak) else {
                    return;
                };
                if controller.advance(step) {
                    controller.close(CloseReason::Timer);
                    return;
                }
            }
        });
    }

    /// One tick of progress. Returns `true` once the timer expired.
    fn advance(&self, step: f64) -> bool {
        let mut state = self.lock();
        if !state.loaded || state.closing || state.loading || state.paused || state.torn_down {
            return false;
        }
        state.progress += step;
        if state.progress >= 100.0 - PROGRESS_EPSILON {
            state.progress = 100.0;
            return true;
        }
        false
    }

    pub fn pause(&self) {
        self.lock().paused = true;
        debug!(toast = %self.inner.record.identifier, "toast paused");
    }

    pub fn resume(&self) {
        self.lock().paused = false;
        debug!(toast = %self.inner.record.identifier, "toast resumed");
    }

    /// Handle a click. Returns `true` when the click closed the toast.
    pub async fn click(&self) -> bool {
        let record = Arc::clone(&self.inner.record);
        {
            let mut state = self.lock();
            if state.loading || state.closing {
                return false;
            }
            if record.handlers.has_click() {
                state.loading = true;
            }
        }
        match record.handlers.click() {
            Some(pending) => {
                let outcome = pending.await;
                self.settle_handler(outcome, CloseReason::Manual, "click")
            }
            None if record.closable => self.close(CloseReason::Manual),
            None => false,
        }
    }

    /// Handle a named action. Returns `true` when the action closed the toast.
    pub async fn action(&self, key: &str, data: Option<Value>) -> bool {
        let record = Arc::clone(&self.inner.record);
        {
            let mut state = self.lock();
            if state.loading || state.closing {
                return false;
            }
            if record.handlers.has_action() {
                state.loading = true;
            }
        }
        match record.handlers.action(key.to_string(), data) {
            Some(pending) => {
                let outcome = pending.await;
                self.settle_handler(outcome, CloseReason::Action, "action")
            }
            None if record.closable => self.close(CloseReason::Action),
            None => false,
        }
    }

    fn settle_handler(
        &self,
        outcome: Result<bool, crate::error::HandlerError>,
        reason: CloseReason,
        kind: &'static str,
    ) -> bool {
        let closed = match outcome {
            Ok(true) => self.close(reason),
            Ok(false) => false,
            Err(err) => {
                warn!(toast = %self.inner.record.identifier, handler = kind, error = %err, "handler failed; toast stays open");
                false
            }
        };
        self.lock().loading = false;
        closed
    }

    /// Start closing. Returns `false` when already closing or torn down.
    pub fn close(&self, reason: CloseReason) -> bool {
        let record = &self.inner.record;
        let collapsed = {
            let mut state = self.lock();
            if state.closing || state.torn_down {
                return false;
            }
            state.closing = true;
            state.phase = Phase::Closing;
            state.placement.collapsed
        };
        info!(container = %record.container, toast = %record.identifier, %reason, "closing toast");

        // Siblings reshuffle while the leave transition plays.
        self.inner.channel.removing(&record.identifier);

        let name = if collapsed {
            TransitionName::StackLeave
        } else {
            TransitionName::Leave
        };
        let run = self.transition(TransitionPart::Body, name);
        let weak = self.downgrade();
        self.spawn(async move {
            let status = run.await;
            if let Some(controller) = upgrade(&weak) {
                controller.finish(reason, status);
            }
        });
        true
    }

    fn finish(&self, reason: CloseReason, status: TransitionStatus) {
        let record = &self.inner.record;
        if status == TransitionStatus::Error {
            warn!(container = %record.container, toast = %record.identifier, "leave transition failed");
        }
        self.lock().phase = Phase::Removed;
        record.handlers.closed(reason);
        if !self.inner.deps.registry.remove_record(record) {
            debug!(container = %record.container, toast = %record.identifier, "record already replaced or gone");
        }
    }

    /// Apply a container directive.
    pub fn directive(&self, state: StackState) {
        let Some(name) = TransitionName::for_state(state) else {
            self.close(CloseReason::Manual);
            return;
        };
        {
            let life = self.lock();
            if life.closing || life.torn_down {
                return;
            }
        }
        debug!(toast = %self.inner.record.identifier, %state, "stack directive");
        let run = self.transition(TransitionPart::Slot, name);
        self.spawn(async move {
            run.await;
        });
    }

    /// Update the position supplied by the container.
    pub fn set_placement(&self, placement: Placement) {
        self.lock().placement = placement;
    }

    /// Stop the tick, the directive listener and pending transitions.
    pub fn teardown(&self) {
        // Lock order is tasks, then state (same as `spawn`).
        let tasks = {
            let mut tasks = self.inner.tasks.lock().unwrap_or_else(PoisonError::into_inner);
            let mut state = self.lock();
            if state.torn_down {
                return;
            }
            state.torn_down = true;
            std::mem::take(&mut *tasks)
        };
        for task in tasks {
            task.abort();
        }
        debug!(toast = %self.inner.record.identifier, "toast torn down");
    }

    pub fn record(&self) -> &Arc<ToastRecord> {
        &self.inner.record
    }

    pub fn id(&self) -> &str {
        &self.inner.record.identifier
    }

    pub fn state(&self) -> ToastState {
        let state = self.lock();
        ToastState {
            phase: state.phase,
            role: state.placement.role(),
            loaded: state.loaded,
            paused: state.paused,
            closing: state.closing,
            loading: state.loading,
            progress: state.progress,
        }
    }

    /// Number of background tasks still running.
    pub fn live_tasks(&self) -> usize {
        self.inner
            .tasks
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .filter(|task| !task.is_finished())
            .count()
    }

    fn transition(
        &self,
        part: TransitionPart,
        name: TransitionName,
    ) -> impl std::future::Future<Output = TransitionStatus> + Send + 'static {
        let runner = Arc::clone(&self.inner.deps.runner);
        let descriptor = self.inner.transitions.get(name).clone();
        let target = TransitionTarget {
            container: self.inner.record.container.clone(),
            toast: self.inner.record.identifier.clone(),
            part,
            name,
        };
        async move { runner.run(target, descriptor).await }
    }

    fn spawn(&self, task: impl std::future::Future<Output = ()> + Send + 'static) {
        let mut tasks = self.inner.tasks.lock().unwrap_or_else(PoisonError::into_inner);
        if self.lock().torn_down {
            return;
        }
        tasks.retain(|task| !task.is_finished());
        tasks.push(tokio::spawn(task));
    }

    fn downgrade(&self) -> Weak<Inner> {
        Arc::downgrade(&self.inner)
    }

    fn lock(&self) -> MutexGuard<'_, LifeState> {
        self.inner.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

fn upgrade(weak: &Weak<Inner>) -> Option<ToastController> {
    weak.upgrade().map(|inner| ToastController { inner })
}

impl std::fmt::Debug for ToastController {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ToastController")
            .field("key", &self.inner.record.key)
            .field("state", &self.state())
            .finish_non_exhaustive()
    }
}
