use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use serde::Deserialize;
use serde_with::serde_as;

use crate::Result;
use crate::error::ConfigError;
use crate::options::OptionsPatch;
use crate::types::Direction;

use super::defaults::{
    default_channel_capacity, default_clear_stagger, default_closable, default_container_name,
    default_duration, default_tick,
};
use super::env::{env_duration, env_parse, env_path, env_string};
use super::{EngineSettings, HumantimeDuration, Settings};

pub(super) fn load(path: impl AsRef<Path>) -> std::result::Result<RawSettings, ConfigError> {
    let mut builder = ::config::Config::builder();
    builder = builder.add_source(::config::File::from(path.as_ref()).required(false));
    builder = builder.add_source(
        // Nested keys only (`TOASTS__ENGINE__TICK`); flat `TOASTS_*` names are
        // the explicit overrides below.
        ::config::Environment::with_prefix("TOASTS")
            .prefix_separator("__")
            .separator("__")
            .try_parsing(true),
    );

    builder
        .build()
        .map_err(|err| ConfigError::Other(err.to_string()))?
        .try_deserialize()
        .map_err(|err| ConfigError::Parse(err.to_string()))
}

#[derive(Debug, Default, Deserialize)]
pub(super) struct RawSettings {
    #[serde(default)]
    pub(super) engine: RawEngine,
    #[serde(default)]
    pub(super) defaults: RawDefaults,
    #[serde(default)]
    pub(super) container: RawContainer,
    #[serde(default)]
    pub(super) containers: BTreeMap<String, OptionsPatch>,
    #[serde(default)]
    pub(super) store: RawStore,
    #[serde(default)]
    pub(super) viewport: RawViewport,
}

#[serde_as]
#[derive(Debug, Deserialize)]
pub(super) struct RawEngine {
    #[serde(default = "default_tick")]
    #[serde_as(as = "HumantimeDuration")]
    pub(super) tick: Duration,
    #[serde(default = "default_clear_stagger")]
    #[serde_as(as = "HumantimeDuration")]
    pub(super) clear_stagger: Duration,
    #[serde(default = "default_channel_capacity")]
    pub(super) channel_capacity: usize,
}

#[serde_as]
#[derive(Debug, Deserialize)]
pub(super) struct RawDefaults {
    #[serde(default = "default_duration")]
    #[serde_as(as = "HumantimeDuration")]
    pub(super) duration: Duration,
    #[serde(default = "default_closable")]
    pub(super) closable: bool,
    #[serde(default)]
    pub(super) direction: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(super) struct RawContainer {
    #[serde(default)]
    pub(super) name: Option<String>,
    #[serde(default)]
    pub(super) body_class: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub(super) struct RawStore {
    #[serde(default)]
    pub(super) path: Option<PathBuf>,
}

#[derive(Debug, Default, Deserialize)]
pub(super) struct RawViewport {
    #[serde(default)]
    pub(super) constrained: bool,
}

impl RawSettings {
    pub(super) fn apply_env_overrides(&mut self) -> std::result::Result<(), ConfigError> {
        if let Some(duration) = env_duration("TOASTS_DURATION")? {
            self.defaults.duration = duration;
        }
        if let Some(closable) = env_parse::<bool>("TOASTS_CLOSABLE")? {
            self.defaults.closable = closable;
        }
        if let Some(direction) = env_string("TOASTS_DIRECTION")? {
            self.defaults.direction = Some(direction);
        }
        if let Some(tick) = env_duration("TOASTS_TICK")? {
            self.engine.tick = tick;
        }
        if let Some(stagger) = env_duration("TOASTS_CLEAR_STAGGER")? {
            self.engine.clear_stagger = stagger;
        }
        if let Some(name) = env_string("TOASTS_CONTAINER")? {
            self.container.name = Some(name);
        }
        if let Some(path) = env_path("TOASTS_STORE")? {
            self.store.path = Some(path);
        }
        if let Some(constrained) = env_parse::<bool>("TOASTS_CONSTRAINED")? {
            self.viewport.constrained = constrained;
        }
        Ok(())
    }

    pub(super) fn validate_and_build(self) -> Result<Settings> {
        if self.engine.tick.is_zero() {
            return Err(ConfigError::InvalidField {
                field: "engine.tick",
                message: "tick interval must be greater than zero".to_string(),
            }
            .into());
        }
        if self.engine.channel_capacity == 0 {
            return Err(ConfigError::InvalidField {
                field: "engine.channel_capacity",
                message: "channel capacity must be greater than zero".to_string(),
            }
            .into());
        }

        let direction = match self.defaults.direction.as_deref() {
            Some(raw) => Direction::from_str(raw).map_err(|message| ConfigError::InvalidField {
                field: "defaults.direction",
                message,
            })?,
            None => Direction::Ltr,
        };

        let default_container = match self.container.name {
            Some(name) if name.trim().is_empty() => None,
            Some(name) => Some(name.trim().to_string()),
            None => Some(default_container_name()),
        };

        if self.containers.keys().any(|name| name.trim().is_empty()) {
            return Err(ConfigError::InvalidField {
                field: "containers",
                message: "container names cannot be empty".to_string(),
            }
            .into());
        }

        Ok(Settings {
            engine: EngineSettings {
                tick: self.engine.tick,
                clear_stagger: self.engine.clear_stagger,
                channel_capacity: self.engine.channel_capacity,
            },
            duration: self.defaults.duration,
            closable: self.defaults.closable,
            direction,
            default_container,
            body_class: self.container.body_class,
            containers: self.containers,
            store_path: self.store.path,
            constrained: self.viewport.constrained,
        })
    }
}

impl Default for RawEngine {
    fn default() -> Self {
        Self {
            tick: default_tick(),
            clear_stagger: default_clear_stagger(),
            channel_capacity: default_channel_capacity(),
        }
    }
}

impl Default for RawDefaults {
    fn default() -> Self {
        Self {
            duration: default_duration(),
            closable: default_closable(),
            direction: None,
        }
    }
}

impl Default for RawContainer {
    fn default() -> Self {
        Self {
            name: Some(default_container_name()),
            body_class: None,
        }
    }
}
