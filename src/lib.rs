#![forbid(unsafe_code)]
#![deny(clippy::unwrap_used, clippy::expect_used)]

pub mod channel;
pub mod config;
pub mod container;
pub mod error;
pub mod host;
pub mod options;
pub mod record;
pub mod registry;
pub mod store;
pub mod telemetry;
pub mod toast;
pub mod toaster;
pub mod transition;
pub mod types;
pub mod viewport;

pub use container::{Container, ContainerView};
pub use host::{Host, InstallOptions, REGISTRY_KEY, TOASTER_KEY, install};
pub use registry::Registry;
pub use toast::ToastController;
pub use toaster::{Collaborators, CreateOptions, Toaster};

pub type Result<T> = std::result::Result<T, error::Error>;
