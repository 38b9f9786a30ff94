use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use serde_json::{Value, json};
use tracing::{debug, info};
use uuid::Uuid;

use crate::Result;
use crate::config::EngineSettings;
use crate::container::{Container, ContainerDeps, NullRoot, RootMarker};
use crate::error::Error;
use crate::options::{Defaults, OptionsPatch, ToastOptions};
use crate::record::{Handlers, Presentation, SIMPLE_COMPONENT, ToastRecord};
use crate::registry::Registry;
use crate::store::{KeyValueStore, MemoryStore};
use crate::transition::{NoopTransitions, TransitionRunner};
use crate::types::ToastMode;
use crate::viewport::Viewport;

/// Container used when neither the call site nor `install` names one.
pub const FALLBACK_CONTAINER: &str = "toasts";

/// Host services the engine drives but does not implement.
#[derive(Clone)]
pub struct Collaborators {
    pub transitions: Arc<dyn TransitionRunner>,
    pub store: Arc<dyn KeyValueStore>,
    pub viewport: Arc<Viewport>,
    pub root: Arc<dyn RootMarker>,
}

impl Default for Collaborators {
    fn default() -> Self {
        Self {
            transitions: Arc::new(NoopTransitions),
            store: Arc::new(MemoryStore::new()),
            viewport: Arc::new(Viewport::default()),
            root: Arc::new(NullRoot),
        }
    }
}

impl std::fmt::Debug for Collaborators {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Collaborators")
            .field("store", &self.store)
            .field("viewport", &self.viewport)
            .field("root", &self.root)
            .finish_non_exhaustive()
    }
}

/// Call-site options for [`Toaster::create`].
#[derive(Clone, Debug, Default)]
pub struct CreateOptions {
    pub container: Option<String>,
    pub mode: ToastMode,
    /// Reusing an identifier replaces that toast in place.
    pub identifier: Option<String>,
    pub overrides: OptionsPatch,
    pub handlers: Handlers,
}

impl CreateOptions {
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn container(mut self, name: impl Into<String>) -> Self {
        self.container = Some(name.into());
        self
    }

    #[must_use]
    pub fn sticky(mut self) -> Self {
        self.mode = ToastMode::Sticky;
        self
    }

    #[must_use]
    pub fn identifier(mut self, id: impl Into<String>) -> Self {
        self.identifier = Some(id.into());
        self
    }

    #[must_use]
    pub fn duration(mut self, duration: Duration) -> Self {
        self.overrides.duration = Some(duration);
        self
    }

    #[must_use]
    pub fn closable(mut self, closable: bool) -> Self {
        self.overrides.closable = Some(closable);
        self
    }

    #[must_use]
    pub fn handlers(mut self, handlers: Handlers) -> Self {
        self.handlers = handlers;
        self
    }
}

struct ToasterInner {
    registry: Arc<Registry>,
    defaults: Arc<Defaults>,
    collaborators: Collaborators,
    engine: EngineSettings,
    default_container: String,
    containers: Mutex<HashMap<String, Container>>,
}

/// Public entry point: creates toasts and opens containers.
#[derive(Clone)]
pub struct Toaster {
    inner: Arc<ToasterInner>,
}

impl Toaster {
    pub fn new(
        registry: Arc<Registry>,
        defaults: Arc<Defaults>,
        collaborators: Collaborators,
        engine: EngineSettings,
    ) -> Self {
        Self {
            inner: Arc::new(ToasterInner {
                registry,
                defaults,
                collaborators,
                engine,
                default_container: FALLBACK_CONTAINER.to_string(),
                containers: Mutex::new(HashMap::new()),
            }),
        }
    }

    /// Same toaster with another default container. Only meaningful
    /// before the handle is shared.
    #[must_use]
    pub fn with_default_container(self, name: impl Into<String>) -> Self {
        let inner = match Arc::try_unwrap(self.inner) {
            Ok(mut inner) => {
                inner.default_container = name.into();
                inner
            }
            Err(shared) => ToasterInner {
                registry: Arc::clone(&shared.registry),
                defaults: Arc::clone(&shared.defaults),
                collaborators: shared.collaborators.clone(),
                engine: shared.engine,
                default_container: name.into(),
                containers: Mutex::new(
                    shared
                        .containers
                        .lock()
                        .unwrap_or_else(PoisonError::into_inner)
                        .clone(),
                ),
            },
        };
        Self {
            inner: Arc::new(inner),
        }
    }

    /// Store a new toast and return its record.
    ///
    /// Options resolve as global defaults, then the container override,
    /// then `options.overrides`, leaf by leaf.
    pub fn create(
        &self,
        component: impl Into<String>,
        props: Value,
        options: CreateOptions,
    ) -> Arc<ToastRecord> {
        let container = options
            .container
            .unwrap_or_else(|| self.inner.default_container.clone());
        let resolved = self.resolve(&container, &options.overrides);
        let identifier = options
            .identifier
            .unwrap_or_else(|| Uuid::now_v7().simple().to_string());

        let record = self.inner.registry.add_toast(ToastRecord {
            key: format!("{container}-{identifier}"),
            identifier,
            container,
            mode: options.mode,
            duration: resolved.duration,
            closable: resolved.closable,
            handlers: options.handlers,
            presentation: Presentation::new(component, props),
        });
        info!(
            container = %record.container,
            toast = %record.identifier,
            mode = %record.mode,
            duration = ?record.duration,
            "toast created"
        );
        record
    }

    /// Plain-text toast rendered by the bundled component.
    pub fn simple(&self, message: impl Into<String>, options: CreateOptions) -> Arc<ToastRecord> {
        let message = message.into();
        self.create(SIMPLE_COMPONENT, json!({ "message": message }), options)
    }

    fn resolve(&self, container: &str, overrides: &OptionsPatch) -> ToastOptions {
        self.inner
            .defaults
            .get()
            .merged(&self.inner.registry.get_options(container))
            .merged(overrides)
    }

    /// Replace a container's override wholesale; `None` clears it.
    pub fn set_options(&self, container: &str, options: Option<OptionsPatch>) {
        debug!(container, cleared = options.is_none(), "container options replaced");
        self.inner.registry.set_options(container, options);
    }

    /// Merge into the global defaults.
    pub fn set_default_options(&self, patch: &OptionsPatch) {
        self.inner.defaults.set_default_options(patch);
    }

    /// Open a container, or return the one already open under `name`.
    ///
    /// Must be called from within a tokio runtime.
    pub fn open(&self, name: &str) -> Container {
        let mut containers = self.lock();
        if let Some(existing) = containers.get(name) {
            return existing.clone();
        }
        let collaborators = &self.inner.collaborators;
        let container = Container::open(
            name,
            ContainerDeps {
                registry: Arc::clone(&self.inner.registry),
                defaults: Arc::clone(&self.inner.defaults),
                runner: Arc::clone(&collaborators.transitions),
                store: Arc::clone(&collaborators.store),
                viewport: Arc::clone(&collaborators.viewport),
                root: Arc::clone(&collaborators.root),
                engine: self.inner.engine,
            },
        );
        containers.insert(name.to_string(), container.clone());
        container
    }

    /// An already opened container.
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnknownContainer`] when `name` was never opened.
    pub fn container(&self, name: &str) -> Result<Container> {
        self.lock()
            .get(name)
            .cloned()
            .ok_or_else(|| Error::UnknownContainer {
                name: name.to_string(),
            })
    }

    /// Names of the open containers, sorted.
    pub fn containers(&self) -> Vec<String> {
        let mut names: Vec<_> = self.lock().keys().cloned().collect();
        names.sort();
        names
    }

    /// Close every container. Stored records are kept.
    pub fn close_all(&self) {
        let containers: Vec<_> = self.lock().drain().map(|(_, container)| container).collect();
        for container in containers {
            container.close();
        }
    }

    pub fn registry(&self) -> &Arc<Registry> {
        &self.inner.registry
    }

    pub fn defaults(&self) -> &Arc<Defaults> {
        &self.inner.defaults
    }

    pub fn default_container(&self) -> &str {
        &self.inner.default_container
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<String, Container>> {
        self.inner
            .containers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }
}

impl std::fmt::Debug for Toaster {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Toaster")
            .field("default_container", &self.inner.default_container)
            .field("containers", &self.containers())
            .finish_non_exhaustive()
    }
}
