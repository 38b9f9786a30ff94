use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use indexmap::IndexMap;
use tokio::sync::watch;
use tracing::debug;

use crate::options::OptionsPatch;
use crate::record::ToastRecord;

/// Monotonic counter bumped after every toast mutation.
pub type Revision = u64;

/// Process-wide store of container overrides and toast records.
///
/// Mutations are synchronous and complete before change subscribers are
/// notified, so readers never observe a half-applied update.
#[derive(Debug)]
pub struct Registry {
    state: Mutex<RegistryState>,
    revision: watch::Sender<Revision>,
}

#[derive(Debug, Default)]
struct RegistryState {
    options: HashMap<String, OptionsPatch>,
    toasts: HashMap<String, IndexMap<String, Arc<ToastRecord>>>,
}

impl Default for Registry {
    fn default() -> Self {
        Self::new()
    }
}

impl Registry {
    pub fn new() -> Self {
        let (revision, _) = watch::channel(0);
        Self {
            state: Mutex::new(RegistryState::default()),
            revision,
        }
    }

    fn lock(&self) -> MutexGuard<'_, RegistryState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn bump(&self) {
        self.revision.send_modify(|rev| *rev += 1);
    }

    /// Replace the container override; `None` clears it.
    pub fn set_options(&self, container: &str, options: Option<OptionsPatch>) {
        let mut state = self.lock();
        match options {
            Some(options) => {
                state.options.insert(container.to_string(), options);
            }
            None => {
                state.options.remove(container);
            }
        }
    }

    pub fn get_options(&self, container: &str) -> OptionsPatch {
        self.lock().options.get(container).cloned().unwrap_or_default()
    }

    /// Insert a record, overwriting any record with the same identifier in
    /// place (its position in the container order is kept).
    pub fn add_toast(&self, record: ToastRecord) -> Arc<ToastRecord> {
        let record = Arc::new(record);
        {
            let mut state = self.lock();
            state
                .toasts
                .entry(record.container.clone())
                .or_default()
                .insert(record.identifier.clone(), Arc::clone(&record));
        }
        debug!(container = %record.container, toast = %record.identifier, "toast stored");
        self.bump();
        record
    }

    /// Delete a record. Unknown containers or identifiers are ignored.
    pub fn remove_toast(&self, container: &str, identifier: &str) -> Option<Arc<ToastRecord>> {
        let removed = {
            let mut state = self.lock();
            let Some(toasts) = state.toasts.get_mut(container) else {
                return None;
            };
            let removed = toasts.shift_remove(identifier);
            if toasts.is_empty() {
                state.toasts.remove(container);
            }
            removed
        };
        if removed.is_some() {
            debug!(container, toast = identifier, "toast deleted");
            self.bump();
        }
        removed
    }

    /// Delete `record` only if it is still the one stored under its
    /// identifier. Returns whether it was removed.
    pub fn remove_record(&self, record: &Arc<ToastRecord>) -> bool {
        {
            let mut state = self.lock();
            let Some(toasts) = state.toasts.get_mut(&record.container) else {
                return false;
            };
            if !toasts
                .get(&record.identifier)
                .is_some_and(|stored| Arc::ptr_eq(stored, record))
            {
                return false;
            }
            toasts.shift_remove(&record.identifier);
            if toasts.is_empty() {
                state.toasts.remove(&record.container);
            }
        }
        debug!(container = %record.container, toast = %record.identifier, "toast deleted");
        self.bump();
        true
    }

    pub fn get_toast(&self, container: &str, identifier: &str) -> Option<Arc<ToastRecord>> {
        self.lock()
            .toasts
            .get(container)
            .and_then(|toasts| toasts.get(identifier))
            .cloned()
    }

    /// Insertion-ordered snapshot of a container; empty when unknown.
    pub fn container_toasts(&self, container: &str) -> Vec<Arc<ToastRecord>> {
        self.lock()
            .toasts
            .get(container)
            .map(|toasts| toasts.values().cloned().collect())
            .unwrap_or_default()
    }

    pub fn subscribe(&self) -> watch::Receiver<Revision> {
        self.revision.subscribe()
    }

    /// Live view over one container.
    pub fn watch(self: &Arc<Self>, container: &str) -> ContainerToasts {
        ContainerToasts {
            registry: Arc::clone(self),
            container: container.to_string(),
            revision: self.subscribe(),
        }
    }
}

/// Reactive, insertion-ordered view of one container's toasts.
#[derive(Debug)]
pub struct ContainerToasts {
    registry: Arc<Registry>,
    container: String,
    revision: watch::Receiver<Revision>,
}

impl ContainerToasts {
    pub fn container(&self) -> &str {
        &self.container
    }

    /// Current contents; also acknowledges any pending change.
    pub fn current(&mut self) -> Vec<Arc<ToastRecord>> {
        drop(self.revision.borrow_and_update());
        self.registry.container_toasts(&self.container)
    }

    /// Wait until the registry changes after the last `current` call.
    pub async fn changed(&mut self) -> bool {
        self.revision.changed().await.is_ok()
    }
}

#[cfg(test)]
mod tests {
    use super::Registry;
    use crate::options::OptionsPatch;
    use crate::record::{Handlers, Presentation, ToastRecord};
    use crate::types::ToastMode;
    use std::sync::Arc;
    use std::time::Duration;

    fn record(container: &str, id: &str) -> ToastRecord {
        ToastRecord {
            key: format!("{container}-{id}"),
            identifier: id.to_string(),
            container: container.to_string(),
            mode: ToastMode::Default,
            duration: Duration::from_secs(5),
            closable: true,
            handlers: Handlers::default(),
            presentation: Presentation::default(),
        }
    }

    fn ids(registry: &Registry, container: &str) -> Vec<String> {
        registry
            .container_toasts(container)
            .iter()
            .map(|t| t.identifier.clone())
            .collect()
    }

    #[test]
    fn preserves_insertion_order_across_removals() {
        let registry = Registry::new();
        for id in ["a", "b", "c", "d"] {
            registry.add_toast(record("main", id));
        }
        registry.remove_toast("main", "b");
        registry.add_toast(record("main", "e"));
        registry.add_toast(record("main", "a"));
        assert_eq!(ids(&registry, "main"), ["a", "c", "d", "e"]);
    }

    #[test]
    fn unknown_keys_are_no_ops() {
        let registry = Registry::new();
        assert!(registry.remove_toast("ghost", "1").is_none());
        registry.add_toast(record("main", "1"));
        assert!(registry.remove_toast("main", "2").is_none());
        assert!(registry.container_toasts("ghost").is_empty());
        assert_eq!(ids(&registry, "main"), ["1"]);
    }

    #[test]
    fn remove_record_spares_a_replacement() {
        let registry = Registry::new();
        let original = registry.add_toast(record("main", "1"));
        let replacement = registry.add_toast(record("main", "1"));
        assert!(!registry.remove_record(&original));
        assert_eq!(ids(&registry, "main"), ["1"]);

        assert!(registry.remove_record(&replacement));
        assert!(registry.container_toasts("main").is_empty());
        assert!(!registry.remove_record(&replacement));
    }

    #[test]
    fn set_options_replaces_and_clears() {
        let registry = Registry::new();
        registry.set_options(
            "main",
            Some(OptionsPatch::default().with_duration(Duration::from_secs(8))),
        );
        registry.set_options("main", Some(OptionsPatch::default().with_closable(false)));
        let stored = registry.get_options("main");
        assert_eq!(stored.duration, None);
        assert_eq!(stored.closable, Some(false));

        registry.set_options("main", None);
        assert_eq!(registry.get_options("main"), OptionsPatch::default());
    }

    #[tokio::test]
    async fn watchers_observe_mutations() {
        let registry = Arc::new(Registry::new());
        let mut view = registry.watch("main");
        assert!(view.current().is_empty());

        registry.add_toast(record("main", "1"));
        assert!(view.changed().await);
        assert_eq!(view.current().len(), 1);
        assert_eq!(view.container(), "main");
    }
}
