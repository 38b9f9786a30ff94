use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::Result;
use crate::error::Error as EngineError;
use crate::options::{OptionsPatch, ToastOptions};
use crate::types::Direction;

mod defaults;
mod env;
mod raw;
mod serde;

pub(crate) use self::serde::HumantimeDuration;

/// Timing and sizing knobs shared by every container.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EngineSettings {
    /// Interval of the per-toast progress tick.
    pub tick: Duration,
    /// Delay between successive forced removals issued by `clear`.
    pub clear_stagger: Duration,
    /// Buffer of each container's event channel.
    pub channel_capacity: usize,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            tick: defaults::default_tick(),
            clear_stagger: defaults::default_clear_stagger(),
            channel_capacity: defaults::default_channel_capacity(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Settings {
    pub engine: EngineSettings,
    pub duration: Duration,
    pub closable: bool,
    pub direction: Direction,
    pub default_container: Option<String>,
    pub body_class: Option<String>,
    pub containers: BTreeMap<String, OptionsPatch>,
    pub store_path: Option<PathBuf>,
    pub constrained: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            engine: EngineSettings::default(),
            duration: defaults::default_duration(),
            closable: true,
            direction: Direction::Ltr,
            default_container: Some(defaults::default_container_name()),
            body_class: None,
            containers: BTreeMap::new(),
            store_path: None,
            constrained: false,
        }
    }
}

impl Settings {
    /// Load settings from an optional TOML file and the environment.
    ///
    /// # Errors
    ///
    /// Returns an error when the file cannot be parsed, when an environment
    /// override is malformed, or when the resulting values fail validation.
    pub fn from_env_and_file(path: impl AsRef<Path>) -> Result<Self> {
        let mut raw = raw::load(path).map_err(EngineError::from)?;
        raw.apply_env_overrides().map_err(EngineError::from)?;
        raw.validate_and_build()
    }

    /// Global defaults seeded into the options holder at install time.
    pub fn toast_options(&self) -> ToastOptions {
        ToastOptions {
            duration: self.duration,
            closable: self.closable,
            direction: self.direction,
            body_class: None,
            ..ToastOptions::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::Settings;
    use std::io::Write;
    use std::time::Duration;

    #[test]
    fn missing_file_yields_defaults() {
        let settings = match Settings::from_env_and_file("/nonexistent/toasts.toml") {
            Ok(settings) => settings,
            Err(err) => panic!("defaults should load: {err}"),
        };
        assert_eq!(settings.engine.tick, Duration::from_millis(10));
        assert_eq!(settings.engine.clear_stagger, Duration::from_millis(75));
        assert_eq!(settings.default_container.as_deref(), Some("toasts"));
    }

    #[test]
    fn file_sections_are_applied() {
        let mut file = match tempfile::Builder::new().suffix(".toml").tempfile() {
            Ok(file) => file,
            Err(err) => panic!("tempfile: {err}"),
        };
        let body = r#"
[engine]
tick = "20ms"

[defaults]
duration = "8s"
direction = "rtl"

[containers.alerts]
duration = "3s"
closable = false
"#;
        if let Err(err) = file.write_all(body.as_bytes()) {
            panic!("write: {err}");
        }

        let settings = match Settings::from_env_and_file(file.path()) {
            Ok(settings) => settings,
            Err(err) => panic!("settings should load: {err}"),
        };
        assert_eq!(settings.engine.tick, Duration::from_millis(20));
        assert_eq!(settings.duration, Duration::from_secs(8));
        assert_eq!(settings.direction, crate::types::Direction::Rtl);
        let alerts = settings.containers.get("alerts").cloned().unwrap_or_default();
        assert_eq!(alerts.duration, Some(Duration::from_secs(3)));
        assert_eq!(alerts.closable, Some(false));
    }

    #[test]
    fn zero_tick_is_rejected() {
        let mut file = match tempfile::Builder::new().suffix(".toml").tempfile() {
            Ok(file) => file,
            Err(err) => panic!("tempfile: {err}"),
        };
        if let Err(err) = file.write_all(b"[engine]\ntick = \"0s\"\n") {
            panic!("write: {err}");
        }
        assert!(Settings::from_env_and_file(file.path()).is_err());
    }
}
