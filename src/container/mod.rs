//! Container coordination: mounting controllers for the toasts a registry
//! holds, stacking/collapse directives and the root marker.

mod coordinator;
mod root;
pub mod stacking;

use std::sync::Arc;

use crate::config::EngineSettings;
use crate::options::Defaults;
use crate::registry::Registry;
use crate::store::KeyValueStore;
use crate::transition::TransitionRunner;
use crate::viewport::Viewport;

pub use coordinator::{Container, ContainerView};
pub use root::{ClassList, NullRoot, RootMarker};

/// Everything a container needs from its surroundings.
#[derive(Clone)]
pub struct ContainerDeps {
    pub registry: Arc<Registry>,
    pub defaults: Arc<Defaults>,
    pub runner: Arc<dyn TransitionRunner>,
    pub store: Arc<dyn KeyValueStore>,
    pub viewport: Arc<Viewport>,
    pub root: Arc<dyn RootMarker>,
    pub engine: EngineSettings,
}
