use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};

use indexmap::IndexMap;
use serde::Serialize;
use tokio::task::JoinHandle;
use tokio::time::sleep;
use tracing::{debug, info, warn};

use crate::channel::{ChannelEvent, EventChannel};
use crate::options::ToastOptions;
use crate::record::ToastRecord;
use crate::store::KeyValueStore;
use crate::toast::{ControllerDeps, Placement, ToastController, ToastProps};
use crate::types::StackState;

use super::ContainerDeps;
use super::stacking::{self, Plan};

/// Snapshot of what a container currently shows.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct ContainerView {
    pub name: String,
    pub count: usize,
    pub sticky_count: usize,
    /// Key of the newest toast.
    pub active_id: Option<String>,
    pub keys: Vec<String>,
    pub collapsed: bool,
}

#[derive(Debug, Default)]
struct CoordinatorState {
    collapsed: bool,
    controllers: IndexMap<String, ToastController>,
    /// Root class currently applied on behalf of this container.
    marker: Option<String>,
    closed: bool,
}

struct Inner {
    name: String,
    channel: EventChannel,
    deps: ContainerDeps,
    state: Mutex<CoordinatorState>,
    tasks: Mutex<Vec<JoinHandle<()>>>,
}

impl Drop for Inner {
    fn drop(&mut self) {
        let tasks = self.tasks.get_mut().unwrap_or_else(PoisonError::into_inner);
        for task in tasks.drain(..) {
            task.abort();
        }
        let state = self.state.get_mut().unwrap_or_else(PoisonError::into_inner);
        for (_, controller) in state.controllers.drain(..) {
            controller.teardown();
        }
        if let Some(class) = state.marker.take() {
            self.deps.root.remove_class(&class);
        }
    }
}

/// A named stack of toasts.
///
/// Keeps one mounted [`ToastController`] per record the registry holds for
/// this container, and owns the collapse state and its persistence.
#[derive(Clone)]
pub struct Container {
    inner: Arc<Inner>,
}

impl Container {
    /// Open a container and mount whatever the registry already holds.
    ///
    /// Must be called from within a tokio runtime.
    pub fn open(name: &str, deps: ContainerDeps) -> Self {
        let channel = EventChannel::new(name, deps.engine.channel_capacity);
        let collapsed = restore_collapsed(name, deps.store.as_ref(), deps.viewport.is_constrained());
        let inner = Arc::new(Inner {
            name: name.to_string(),
            channel,
            deps,
            state: Mutex::new(CoordinatorState {
                collapsed,
                ..CoordinatorState::default()
            }),
            tasks: Mutex::new(Vec::new()),
        });
        let container = Self { inner };
        container.start();
        info!(container = name, collapsed, "container opened");
        container
    }

    fn start(&self) {
        let mut toasts = self.inner.deps.registry.watch(&self.inner.name);
        let mut events = self.inner.channel.lifecycle();
        let mut viewport = self.inner.deps.viewport.subscribe();
        self.sync(&toasts.current());

        let weak = self.downgrade();
        self.spawn(async move {
            let mut viewport_open = true;
            loop {
                tokio::select! {
                    changed = toasts.changed() => {
                        if !changed {
                            return;
                        }
                        let Some(container) = upgrade(&weak) else {
                            return;
                        };
                        container.sync(&toasts.current());
                    }
                    event = events.recv() => {
                        let Some(event) = event else {
                            return;
                        };
                        let Some(container) = upgrade(&weak) else {
                            return;
                        };
                        container.on_event(event);
                    }
                    changed = viewport.changed(), if viewport_open => {
                        if changed.is_err() {
                            viewport_open = false;
                            continue;
                        }
                        let constrained = *viewport.borrow_and_update();
                        let Some(container) = upgrade(&weak) else {
                            return;
                        };
                        container.on_viewport(constrained);
                    }
                }
            }
        });
    }

    /// Reconcile mounted controllers with the registry contents.
    fn sync(&self, records: &[Arc<ToastRecord>]) {
        let options = self.options();
        let count = records.len();
        let mut stale = Vec::new();
        {
            let mut state = self.lock();
            if state.closed {
                return;
            }
            let collapsed = state.collapsed;
            let mut previous = std::mem::take(&mut state.controllers);
            let mut transitions = None;
            for (index, record) in records.iter().enumerate() {
                let placement = Placement::new(index, count, collapsed);
                let controller = match previous.shift_remove(&record.identifier) {
                    Some(existing) if Arc::ptr_eq(existing.record(), record) => {
                        existing.set_placement(placement);
                        existing
                    }
                    replaced => {
                        stale.extend(replaced);
                        let transitions = transitions
                            .get_or_insert_with(|| Arc::new(options.transitions.clone()));
                        self.mount(Arc::clone(record), placement, Arc::clone(transitions))
                    }
                };
                state.controllers.insert(record.identifier.clone(), controller);
            }
            stale.extend(previous.into_values());
            self.update_marker(&mut state, count > 0, options.body_class);
        }
        for controller in stale {
            debug!(container = %self.inner.name, toast = %controller.id(), "unmounting toast");
            controller.teardown();
        }
    }

    fn mount(
        &self,
        record: Arc<ToastRecord>,
        placement: Placement,
        transitions: Arc<crate::options::TransitionSet>,
    ) -> ToastController {
        let deps = &self.inner.deps;
        ToastController::mount(
            record,
            ToastProps {
                placement,
                channel: self.inner.channel.clone(),
                transitions,
            },
            ControllerDeps {
                registry: Arc::clone(&deps.registry),
                runner: Arc::clone(&deps.runner),
                tick: deps.engine.tick,
            },
        )
    }

    fn update_marker(&self, state: &mut CoordinatorState, populated: bool, class: Option<String>) {
        let wanted = class.filter(|_| populated);
        if state.marker == wanted {
            return;
        }
        if let Some(previous) = state.marker.take() {
            self.inner.deps.root.remove_class(&previous);
        }
        if let Some(class) = &wanted {
            self.inner.deps.root.add_class(class);
        }
        state.marker = wanted;
    }

    fn on_event(&self, event: ChannelEvent) {
        match event {
            ChannelEvent::Added { id } => {
                if !self.collapsed() {
                    return;
                }
                let records = self.records();
                debug!(container = %self.inner.name, toast = %id, "restacking after add");
                self.broadcast(&records, &stacking::added(records.len()));
            }
            ChannelEvent::Removing { id } => {
                if !self.collapsed() {
                    return;
                }
                let remaining: Vec<_> = self
                    .records()
                    .into_iter()
                    .filter(|record| record.identifier != id)
                    .collect();
                debug!(container = %self.inner.name, toast = %id, "restacking after removal");
                self.broadcast(&remaining, &stacking::removed(remaining.len()));
            }
            ChannelEvent::Directive { .. } => {}
        }
    }

    fn on_viewport(&self, constrained: bool) {
        if !constrained {
            return;
        }
        info!(container = %self.inner.name, "viewport constrained; forcing collapse");
        self.inner.deps.store.remove(&self.inner.name);
        self.set_collapsed(true);
    }

    fn broadcast(&self, records: &[Arc<ToastRecord>], plan: &Plan) {
        for &(index, state) in plan {
            if let Some(record) = records.get(index) {
                self.inner.channel.direct(&record.identifier, state);
            }
        }
    }

    pub fn collapsed(&self) -> bool {
        self.lock().collapsed
    }

    /// Flip the collapse state; returns the new value.
    pub fn toggle_collapse(&self) -> bool {
        let next = !self.collapsed();
        self.set_collapsed(next);
        next
    }

    /// Set the collapse state, persist it and tell every toast its new slot.
    pub fn set_collapsed(&self, collapsed: bool) {
        {
            let mut state = self.lock();
            if state.closed || state.collapsed == collapsed {
                return;
            }
            state.collapsed = collapsed;
            let count = state.controllers.len();
            for (index, controller) in state.controllers.values().enumerate() {
                controller.set_placement(Placement::new(index, count, collapsed));
            }
        }
        self.persist(collapsed);

        let records = self.records();
        let plan = if collapsed {
            stacking::collapse(records.len())
        } else {
            stacking::expand(records.len())
        };
        info!(container = %self.inner.name, collapsed, toasts = records.len(), "stack layout changed");
        self.broadcast(&records, &plan);
    }

    fn persist(&self, collapsed: bool) {
        let store = &self.inner.deps.store;
        if self.inner.deps.viewport.is_constrained() {
            store.remove(&self.inner.name);
        } else {
            store.set(&self.inner.name, if collapsed { "true" } else { "false" });
        }
    }

    /// Close every non-sticky toast, one at a time. Returns how many were
    /// scheduled.
    pub fn clear(&self) -> usize {
        let targets: Vec<String> = self
            .records()
            .iter()
            .filter(|record| !record.is_sticky())
            .map(|record| record.identifier.clone())
            .collect();
        let stagger = self.inner.deps.engine.clear_stagger;
        for (ordinal, id) in (0_u32..).zip(targets.iter().cloned()) {
            let channel = self.inner.channel.clone();
            let delay = stagger.saturating_mul(ordinal);
            self.spawn(async move {
                sleep(delay).await;
                channel.direct(&id, StackState::Remove);
            });
        }
        info!(container = %self.inner.name, toasts = targets.len(), "clearing toasts");

        if self.inner.deps.viewport.is_constrained() {
            self.set_collapsed(true);
        }
        targets.len()
    }

    /// Force one toast closed. Returns `false` when it is not in this
    /// container.
    pub fn dismiss(&self, id: &str) -> bool {
        if self.inner.deps.registry.get_toast(&self.inner.name, id).is_none() {
            warn!(container = %self.inner.name, toast = id, "dismiss of unknown toast");
            return false;
        }
        self.inner.channel.direct(id, StackState::Remove);
        true
    }

    /// Mounted controller for a toast.
    pub fn toast(&self, id: &str) -> Option<ToastController> {
        self.lock().controllers.get(id).cloned()
    }

    pub fn view(&self) -> ContainerView {
        let records = self.records();
        ContainerView {
            name: self.inner.name.clone(),
            count: records.len(),
            sticky_count: records.iter().filter(|record| record.is_sticky()).count(),
            active_id: records.last().map(|record| record.key.clone()),
            keys: records.iter().map(|record| record.key.clone()).collect(),
            collapsed: self.collapsed(),
        }
    }

    /// Defaults with this container's override applied.
    pub fn options(&self) -> ToastOptions {
        let deps = &self.inner.deps;
        deps.defaults
            .get()
            .merged(&deps.registry.get_options(&self.inner.name))
    }

    pub fn name(&self) -> &str {
        &self.inner.name
    }

    pub fn channel(&self) -> &EventChannel {
        &self.inner.channel
    }

    /// Stop coordinating and unmount every toast. Records stay in the
    /// registry.
    pub fn close(&self) {
        let tasks = {
            let mut tasks = self.inner.tasks.lock().unwrap_or_else(PoisonError::into_inner);
            let mut state = self.lock();
            if state.closed {
                return;
            }
            state.closed = true;
            let controllers = std::mem::take(&mut state.controllers);
            self.update_marker(&mut state, false, None);
            drop(state);
            for controller in controllers.into_values() {
                controller.teardown();
            }
            std::mem::take(&mut *tasks)
        };
        for task in tasks {
            task.abort();
        }
        info!(container = %self.inner.name, "container closed");
    }

    fn records(&self) -> Vec<Arc<ToastRecord>> {
        self.inner.deps.registry.container_toasts(&self.inner.name)
    }

    fn spawn(&self, task: impl std::future::Future<Output = ()> + Send + 'static) {
        // Lock order is tasks, then state (same as `close`).
        let mut tasks = self.inner.tasks.lock().unwrap_or_else(PoisonError::into_inner);
        if self.lock().closed {
            return;
        }
        tasks.retain(|task| !task.is_finished());
        tasks.push(tokio::spawn(task));
    }

    fn downgrade(&self) -> Weak<Inner> {
        Arc::downgrade(&self.inner)
    }

    fn lock(&self) -> MutexGuard<'_, CoordinatorState> {
        self.inner.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

fn upgrade(weak: &Weak<Inner>) -> Option<Container> {
    weak.upgrade().map(|inner| Container { inner })
}

/// Constrained viewports always start collapsed and forget the stored
/// preference. Otherwise only an explicit `"false"` starts expanded.
fn restore_collapsed(name: &str, store: &dyn KeyValueStore, constrained: bool) -> bool {
    if constrained {
        store.remove(name);
        return true;
    }
    match store.get(name).as_deref() {
        None | Some("true") => true,
        Some("false") => false,
        Some(other) => {
            warn!(container = name, value = other, "ignoring unreadable collapse preference");
            true
        }
    }
}

impl std::fmt::Debug for Container {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.lock();
        f.debug_struct("Container")
            .field("name", &self.inner.name)
            .field("collapsed", &state.collapsed)
            .field("mounted", &state.controllers.len())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::Container;
    use crate::channel::ChannelEvent;
    use crate::config::EngineSettings;
    use crate::container::{ClassList, ContainerDeps};
    use crate::options::{Defaults, OptionsPatch};
    use crate::record::{Handlers, Presentation, ToastRecord};
    use crate::registry::Registry;
    use crate::store::{KeyValueStore, MemoryStore};
    use crate::options::{Transition, TransitionName};
    use crate::transition::{
        NoopTransitions, TransitionPart, TransitionRunner, TransitionStatus, TransitionTarget,
    };
    use crate::types::{CloseReason, StackState, ToastMode};
    use crate::viewport::Viewport;
    use async_trait::async_trait;
    use std::sync::{Arc, Mutex, PoisonError};
    use std::time::Duration;
    use tokio::time::sleep;

    /// Remembers every slot transition it was asked to play.
    #[derive(Default)]
    struct SlotLog {
        played: Mutex<Vec<(String, TransitionName)>>,
    }

    impl SlotLog {
        fn count(&self, name: TransitionName) -> usize {
            self.played
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .iter()
                .filter(|(_, played)| *played == name)
                .count()
        }
    }

    #[async_trait]
    impl TransitionRunner for SlotLog {
        async fn run(&self, target: TransitionTarget, _transition: Transition) -> TransitionStatus {
            if target.part == TransitionPart::Slot {
                self.played
                    .lock()
                    .unwrap_or_else(PoisonError::into_inner)
                    .push((target.toast, target.name));
            }
            TransitionStatus::Ignored
        }
    }

    struct Fixture {
        registry: Arc<Registry>,
        store: Arc<MemoryStore>,
        viewport: Arc<Viewport>,
        root: Arc<ClassList>,
    }

    impl Fixture {
        fn new() -> Self {
            Self {
                registry: Arc::new(Registry::new()),
                store: Arc::new(MemoryStore::new()),
                viewport: Arc::new(Viewport::new(false)),
                root: Arc::new(ClassList::new()),
            }
        }

        fn push(&self, id: &str, mode: ToastMode) {
            self.registry.add_toast(ToastRecord {
                key: format!("main-{id}"),
                identifier: id.to_string(),
                container: "main".into(),
                mode,
                duration: Duration::from_secs(60),
                closable: true,
                handlers: Handlers::default(),
                presentation: Presentation::default(),
            });
        }

        fn open(&self) -> Container {
            self.open_with(Arc::new(NoopTransitions))
        }

        fn open_with(&self, runner: Arc<dyn TransitionRunner>) -> Container {
            Container::open(
                "main",
                ContainerDeps {
                    registry: Arc::clone(&self.registry),
                    defaults: Arc::new(Defaults::default()),
                    runner,
                    store: Arc::clone(&self.store) as Arc<dyn KeyValueStore>,
                    viewport: Arc::clone(&self.viewport),
                    root: Arc::clone(&self.root) as Arc<dyn crate::container::RootMarker>,
                    engine: EngineSettings::default(),
                },
            )
        }
    }

    fn directives(events: Vec<ChannelEvent>) -> Vec<(String, StackState)> {
        events
            .into_iter()
            .filter_map(|event| match event {
                ChannelEvent::Directive { id, state } => Some((id, state)),
                _ => None,
            })
            .collect()
    }

    async fn settle() {
        sleep(Duration::from_millis(1)).await;
    }

    #[tokio::test(start_paused = true)]
    async fn collapse_preference_is_restored() {
        let fx = Fixture::new();
        assert!(fx.open().collapsed());

        fx.store.set("main", "false");
        assert!(!fx.open().collapsed());

        fx.viewport.set_constrained(true);
        assert!(fx.open().collapsed());
        assert_eq!(fx.store.get("main"), None);
    }

    #[tokio::test(start_paused = true)]
    async fn collapsing_broadcasts_slots_newest_first() {
        let fx = Fixture::new();
        fx.store.set("main", "false");
        for id in ["a", "b", "c", "d"] {
            fx.push(id, ToastMode::Default);
        }
        let container = fx.open();
        settle().await;

        let mut events = container.channel().subscribe();
        assert!(container.toggle_collapse());
        assert_eq!(
            directives(events.drain()),
            vec![
                ("c".into(), StackState::Secondary),
                ("b".into(), StackState::Tertiary),
                ("a".into(), StackState::Hide),
            ]
        );
        assert_eq!(fx.store.get("main").as_deref(), Some("true"));

        assert!(!container.toggle_collapse());
        assert_eq!(directives(events.drain()).len(), 4);
        assert_eq!(fx.store.get("main").as_deref(), Some("false"));
    }

    #[tokio::test(start_paused = true)]
    async fn collapsing_five_leaves_the_top_alone() {
        let fx = Fixture::new();
        fx.store.set("main", "false");
        for id in ["a", "b", "c", "d", "e"] {
            fx.push(id, ToastMode::Default);
        }
        let container = fx.open();
        settle().await;

        let mut events = container.channel().subscribe();
        container.set_collapsed(true);
        let sent = directives(events.drain());
        assert_eq!(
            sent,
            vec![
                ("d".into(), StackState::Secondary),
                ("c".into(), StackState::Tertiary),
                ("b".into(), StackState::Hide),
                ("a".into(), StackState::Hide),
            ]
        );
        assert!(sent.iter().all(|(id, _)| id != "e"));
    }

    #[tokio::test(start_paused = true)]
    async fn pushing_onto_a_collapsed_stack_shifts_three_slots() {
        let fx = Fixture::new();
        for id in ["a", "b", "c", "d"] {
            fx.push(id, ToastMode::Sticky);
        }
        let container = fx.open();
        assert!(container.collapsed());
        settle().await;

        let mut events = container.channel().subscribe();
        fx.push("e", ToastMode::Sticky);
        settle().await;
        assert_eq!(
            directives(events.drain()),
            vec![
                ("d".into(), StackState::Secondary),
                ("c".into(), StackState::Tertiary),
                ("b".into(), StackState::Hide),
            ]
        );
        assert_eq!(container.view().active_id.as_deref(), Some("main-e"));
    }

    #[tokio::test(start_paused = true)]
    async fn large_stacks_lose_no_directives() {
        let fx = Fixture::new();
        fx.store.set("main", "false");
        let ids: Vec<String> = (0..70).map(|n| format!("t{n}")).collect();
        for id in &ids {
            fx.push(id, ToastMode::Sticky);
        }
        let log = Arc::new(SlotLog::default());
        let container = fx.open_with(Arc::clone(&log) as Arc<dyn TransitionRunner>);
        settle().await;

        assert!(container.dismiss("t0"));
        assert!(container.toggle_collapse());
        settle().await;
        assert_eq!(container.view().count, 69);
        assert!(container.toast("t0").is_none());

        let before = log.count(TransitionName::Activate);
        assert!(!container.toggle_collapse());
        settle().await;
        assert_eq!(log.count(TransitionName::Activate) - before, 69);
    }

    #[tokio::test(start_paused = true)]
    async fn closing_the_top_promotes_survivors() {
        let fx = Fixture::new();
        for id in ["a", "b", "c", "d"] {
            fx.push(id, ToastMode::Sticky);
        }
        let container = fx.open();
        settle().await;

        let mut events = container.channel().subscribe();
        let top = container.toast("d").unwrap_or_else(|| panic!("top toast not mounted"));
        assert!(top.close(CloseReason::Manual));
        settle().await;

        assert_eq!(
            directives(events.drain()),
            vec![
                ("c".into(), StackState::Activate),
                ("b".into(), StackState::Secondary),
                ("a".into(), StackState::Tertiary),
            ]
        );
        assert_eq!(container.view().count, 3);
        assert!(container.toast("d").is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn clear_staggers_removal_and_spares_sticky() {
        let fx = Fixture::new();
        fx.store.set("main", "false");
        fx.push("a", ToastMode::Default);
        fx.push("pinned", ToastMode::Sticky);
        fx.push("b", ToastMode::Default);
        let container = fx.open();
        settle().await;

        assert_eq!(container.clear(), 2);
        settle().await;
        assert_eq!(container.view().count, 2);

        sleep(Duration::from_millis(80)).await;
        let view = container.view();
        assert_eq!(view.count, 1);
        assert_eq!(view.sticky_count, 1);
        assert_eq!(view.active_id.as_deref(), Some("main-pinned"));
    }

    #[tokio::test(start_paused = true)]
    async fn root_marker_tracks_population() {
        let fx = Fixture::new();
        fx.registry
            .set_options("main", Some(OptionsPatch::default().with_body_class("has-toasts")));
        let container = fx.open();
        assert!(!fx.root.contains("has-toasts"));

        fx.push("a", ToastMode::Sticky);
        settle().await;
        assert!(fx.root.contains("has-toasts"));

        assert!(container.dismiss("a"));
        settle().await;
        assert!(!fx.root.contains("has-toasts"));
        assert!(!container.dismiss("a"));
    }

    #[tokio::test(start_paused = true)]
    async fn constrained_viewport_forces_collapse() {
        let fx = Fixture::new();
        fx.store.set("main", "false");
        let container = fx.open();
        assert!(!container.collapsed());

        fx.viewport.set_constrained(true);
        settle().await;
        assert!(container.collapsed());
        assert_eq!(fx.store.get("main"), None);
    }

    #[tokio::test(start_paused = true)]
    async fn close_unmounts_but_keeps_records() {
        let fx = Fixture::new();
        fx.push("a", ToastMode::Default);
        let container = fx.open();
        let toast = container.toast("a").unwrap_or_else(|| panic!("toast not mounted"));
        container.close();
        assert!(container.toast("a").is_none());
        assert_eq!(toast.live_tasks(), 0);
        assert_eq!(fx.registry.container_toasts("main").len(), 1);
    }
}
