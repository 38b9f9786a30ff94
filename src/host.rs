//! Wiring the engine into a host application.
//!
//! A [`Host`] is a keyed service map the application owns. [`install`]
//! seeds the global defaults, registers the shared registry and toaster
//! under fixed keys and opens the default container.

use std::any::Any;
use std::collections::HashMap;
use std::sync::Arc;

use tracing::info;

use crate::Result;
use crate::config::{EngineSettings, Settings};
use crate::error::Error;
use crate::options::{Defaults, OptionsPatch, ToastOptions};
use crate::registry::Registry;
use crate::toaster::{Collaborators, FALLBACK_CONTAINER, Toaster};
use crate::types::Direction;

/// Key the shared [`Registry`] is provided under.
pub const REGISTRY_KEY: &str = "toasts.registry";
/// Key the installed [`Toaster`] is provided under.
pub const TOASTER_KEY: &str = "toasts.toaster";

type Service = Arc<dyn Any + Send + Sync>;

#[derive(Default)]
pub struct Host {
    services: HashMap<&'static str, Service>,
}

impl Host {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a service; later registrations replace earlier ones.
    pub fn provide<T: Any + Send + Sync>(&mut self, key: &'static str, service: Arc<T>) {
        self.services.insert(key, service);
    }

    /// `None` when nothing is registered under `key` or it has another type.
    pub fn resolve<T: Any + Send + Sync>(&self, key: &str) -> Option<Arc<T>> {
        self.services
            .get(key)
            .and_then(|service| Arc::clone(service).downcast::<T>().ok())
    }

    pub fn contains(&self, key: &str) -> bool {
        self.services.contains_key(key)
    }
}

impl std::fmt::Debug for Host {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut keys: Vec<_> = self.services.keys().collect();
        keys.sort();
        f.debug_struct("Host").field("services", &keys).finish()
    }
}

#[derive(Clone, Debug, Default)]
pub struct InstallOptions {
    /// Container opened right away and used when `create` names none.
    pub default_container: Option<String>,
    /// Mirror directional transitions for right-to-left layouts.
    pub direction: Direction,
    pub defaults: ToastOptions,
    /// Per-container overrides registered at install time.
    pub containers: Vec<(String, OptionsPatch)>,
    pub engine: EngineSettings,
    pub collaborators: Collaborators,
}

impl InstallOptions {
    /// Options derived from loaded settings. The default container picks up
    /// the configured root class unless its own override sets one.
    pub fn from_settings(settings: &Settings, collaborators: Collaborators) -> Self {
        let mut containers: Vec<(String, OptionsPatch)> = settings
            .containers
            .iter()
            .map(|(name, patch)| (name.clone(), patch.clone()))
            .collect();
        if let (Some(name), Some(class)) = (&settings.default_container, &settings.body_class) {
            match containers.iter_mut().find(|(existing, _)| existing == name) {
                Some((_, patch)) => {
                    if patch.body_class.is_none() {
                        patch.body_class = Some(class.clone());
                    }
                }
                None => containers.push((name.clone(), OptionsPatch::default().with_body_class(class))),
            }
        }
        Self {
            default_container: settings.default_container.clone(),
            direction: settings.direction,
            defaults: settings.toast_options(),
            containers,
            engine: settings.engine,
            collaborators,
        }
    }
}

/// Install the engine into `host` and return the toaster.
///
/// Opening the default container spawns tasks, so this must run inside a
/// tokio runtime when one is configured.
pub fn install(host: &mut Host, options: InstallOptions) -> Toaster {
    let mut defaults = options.defaults;
    defaults.direction = options.direction;
    if options.direction == Direction::Rtl {
        defaults.transitions = defaults.transitions.mirrored();
    }

    let registry = Arc::new(Registry::new());
    for (name, patch) in options.containers {
        registry.set_options(&name, Some(patch));
    }

    let mut toaster = Toaster::new(
        Arc::clone(&registry),
        Arc::new(Defaults::new(defaults)),
        options.collaborators,
        options.engine,
    );
    if let Some(name) = &options.default_container {
        toaster = toaster.with_default_container(name.clone());
        toaster.open(name);
    }

    host.provide(REGISTRY_KEY, registry);
    host.provide(TOASTER_KEY, Arc::new(toaster.clone()));
    info!(
        default_container = options.default_container.as_deref().unwrap_or(FALLBACK_CONTAINER),
        direction = %options.direction,
        "toast engine installed"
    );
    toaster
}

/// The shared registry of an installed engine.
///
/// # Errors
///
/// Returns [`Error::NotInstalled`] when [`install`] never ran on `host`.
pub fn registry(host: &Host) -> Result<Arc<Registry>> {
    host.resolve::<Registry>(REGISTRY_KEY)
        .ok_or(Error::NotInstalled { key: REGISTRY_KEY })
}

impl Toaster {
    /// The toaster an earlier [`install`] registered.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotInstalled`] when [`install`] never ran on `host`.
    pub fn from_host(host: &Host) -> Result<Self> {
        host.resolve::<Self>(TOASTER_KEY)
            .map(|toaster| (*toaster).clone())
            .ok_or(Error::NotInstalled { key: TOASTER_KEY })
    }
}
