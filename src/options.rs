use std::fmt::{self, Display};
use std::sync::{Arc, PoisonError, RwLock};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use serde_with::serde_as;

use crate::config::HumantimeDuration;
use crate::types::{Direction, StackState};

const DEFAULT_DURATION: Duration = Duration::from_secs(5);

/// Opaque transition descriptor forwarded verbatim to the runner.
#[derive(Clone, Debug, Default, Deserialize, PartialEq, Serialize)]
pub struct Transition {
    #[serde(default)]
    pub params: Value,
    #[serde(default)]
    pub options: Value,
}

impl Transition {
    pub const fn new(params: Value, options: Value) -> Self {
        Self { params, options }
    }

    /// Playback length declared in `options.duration` (milliseconds).
    pub fn duration(&self) -> Option<Duration> {
        self.options
            .get("duration")
            .and_then(Value::as_u64)
            .map(Duration::from_millis)
    }

    fn mirror_horizontal(&mut self) {
        let Some(x) = self.params.get_mut("x") else {
            return;
        };
        match x {
            Value::Array(values) => values.iter_mut().for_each(negate),
            other => negate(other),
        }
    }
}

fn negate(value: &mut Value) {
    if let Some(n) = value.as_i64() {
        *value = json!(-n);
    } else if let Some(n) = value.as_f64() {
        *value = json!(-n);
    }
}

#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum TransitionName {
    Enter,
    Leave,
    StackEnter,
    StackLeave,
    Activate,
    Secondary,
    Tertiary,
    Hide,
}

impl TransitionName {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Enter => "enter",
            Self::Leave => "leave",
            Self::StackEnter => "stack_enter",
            Self::StackLeave => "stack_leave",
            Self::Activate => "activate",
            Self::Secondary => "secondary",
            Self::Tertiary => "tertiary",
            Self::Hide => "hide",
        }
    }

    /// Slot transition for a stacking directive; `remove` has none.
    pub const fn for_state(state: StackState) -> Option<Self> {
        match state {
            StackState::Activate => Some(Self::Activate),
            StackState::Secondary => Some(Self::Secondary),
            StackState::Tertiary => Some(Self::Tertiary),
            StackState::Hide => Some(Self::Hide),
            StackState::Remove => None,
        }
    }
}

impl Display for TransitionName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
pub struct TransitionSet {
    pub enter: Transition,
    pub leave: Transition,
    pub stack_enter: Transition,
    pub stack_leave: Transition,
    pub activate: Transition,
    pub secondary: Transition,
    pub tertiary: Transition,
    pub hide: Transition,
}

impl TransitionSet {
    pub const fn get(&self, name: TransitionName) -> &Transition {
        match name {
            TransitionName::Enter => &self.enter,
            TransitionName::Leave => &self.leave,
            TransitionName::StackEnter => &self.stack_enter,
            TransitionName::StackLeave => &self.stack_leave,
            TransitionName::Activate => &self.activate,
            TransitionName::Secondary => &self.secondary,
            TransitionName::Tertiary => &self.tertiary,
            TransitionName::Hide => &self.hide,
        }
    }

    /// Flip the horizontal offsets of the directional transitions.
    #[must_use]
    pub fn mirrored(mut self) -> Self {
        for transition in [
            &mut self.enter,
            &mut self.leave,
            &mut self.stack_enter,
            &mut self.stack_leave,
        ] {
            transition.mirror_horizontal();
        }
        self
    }
}

impl Default for TransitionSet {
    fn default() -> Self {
        let timing = |duration: u64, easing: &str| json!({ "duration": duration, "easing": easing });
        Self {
            enter: Transition::new(
                json!({ "opacity": [0, 1], "x": [40, 0] }),
                timing(300, "ease-out"),
            ),
            leave: Transition::new(
                json!({ "opacity": [1, 0], "x": [0, 40] }),
                timing(250, "ease-in"),
            ),
            stack_enter: Transition::new(
                json!({ "opacity": [0, 1], "y": [-20, 0], "scale": [0.9, 1] }),
                timing(300, "ease-out"),
            ),
            stack_leave: Transition::new(
                json!({ "opacity": [1, 0], "x": [0, 40] }),
                timing(250, "ease-in"),
            ),
            activate: Transition::new(
                json!({ "y": 0, "scale": 1, "opacity": 1 }),
                timing(200, "ease-out"),
            ),
            secondary: Transition::new(
                json!({ "y": -8, "scale": 0.95, "opacity": 1 }),
                timing(200, "ease-out"),
            ),
            tertiary: Transition::new(
                json!({ "y": -16, "scale": 0.9, "opacity": 1 }),
                timing(200, "ease-out"),
            ),
            hide: Transition::new(
                json!({ "y": -16, "scale": 0.9, "opacity": 0 }),
                timing(200, "ease-out"),
            ),
        }
    }
}

/// Per-transition overrides. A present entry replaces the whole descriptor.
#[derive(Clone, Debug, Default, Deserialize, PartialEq, Serialize)]
#[serde(default)]
pub struct TransitionPatch {
    pub enter: Option<Transition>,
    pub leave: Option<Transition>,
    pub stack_enter: Option<Transition>,
    pub stack_leave: Option<Transition>,
    pub activate: Option<Transition>,
    pub secondary: Option<Transition>,
    pub tertiary: Option<Transition>,
    pub hide: Option<Transition>,
}

impl TransitionPatch {
    fn apply_to(&self, set: &mut TransitionSet) {
        let pairs = [
            (&self.enter, &mut set.enter),
            (&self.leave, &mut set.leave),
            (&self.stack_enter, &mut set.stack_enter),
            (&self.stack_leave, &mut set.stack_leave),
            (&self.activate, &mut set.activate),
            (&self.secondary, &mut set.secondary),
            (&self.tertiary, &mut set.tertiary),
            (&self.hide, &mut set.hide),
        ];
        for (patch, slot) in pairs {
            if let Some(replacement) = patch {
                slot.clone_from(replacement);
            }
        }
    }
}

/// Partial options: container overrides, call-site options and
/// `set_default_options` patches all use this shape.
#[serde_as]
#[derive(Clone, Debug, Default, Deserialize, PartialEq, Serialize)]
#[serde(default)]
pub struct OptionsPatch {
    #[serde_as(as = "Option<HumantimeDuration>")]
    pub duration: Option<Duration>,
    pub closable: Option<bool>,
    pub direction: Option<Direction>,
    pub body_class: Option<String>,
    pub transitions: TransitionPatch,
}

impl OptionsPatch {
    #[must_use]
    pub fn with_duration(mut self, duration: Duration) -> Self {
        self.duration = Some(duration);
        self
    }

    #[must_use]
    pub fn with_closable(mut self, closable: bool) -> Self {
        self.closable = Some(closable);
        self
    }

    #[must_use]
    pub fn with_body_class(mut self, class: impl Into<String>) -> Self {
        self.body_class = Some(class.into());
        self
    }
}

/// Fully resolved options.
#[derive(Clone, Debug, PartialEq)]
pub struct ToastOptions {
    pub duration: Duration,
    pub closable: bool,
    pub direction: Direction,
    pub body_class: Option<String>,
    pub transitions: TransitionSet,
}

impl Default for ToastOptions {
    fn default() -> Self {
        Self {
            duration: DEFAULT_DURATION,
            closable: true,
            direction: Direction::Ltr,
            body_class: None,
            transitions: TransitionSet::default(),
        }
    }
}

impl ToastOptions {
    /// Overlay `patch` leaf by leaf; absent leaves keep their current value.
    #[must_use]
    pub fn merged(&self, patch: &OptionsPatch) -> Self {
        let mut next = self.clone();
        if let Some(duration) = patch.duration {
            next.duration = duration;
        }
        if let Some(closable) = patch.closable {
            next.closable = closable;
        }
        if let Some(direction) = patch.direction {
            next.direction = direction;
        }
        if let Some(class) = &patch.body_class {
            next.body_class = Some(class.clone());
        }
        patch.transitions.apply_to(&mut next.transitions);
        next
    }
}

/// Holder for the global default options.
///
/// Seeded once by `install`; readers receive an immutable snapshot and
/// `set_default_options` swaps in a new one.
#[derive(Debug, Default)]
pub struct Defaults {
    current: RwLock<Arc<ToastOptions>>,
}

impl Defaults {
    pub fn new(options: ToastOptions) -> Self {
        Self {
            current: RwLock::new(Arc::new(options)),
        }
    }

    pub fn get(&self) -> Arc<ToastOptions> {
        Arc::clone(&self.current.read().unwrap_or_else(PoisonError::into_inner))
    }

    pub fn set_default_options(&self, patch: &OptionsPatch) {
        let mut guard = self.current.write().unwrap_or_else(PoisonError::into_inner);
        let next = guard.merged(patch);
        *guard = Arc::new(next);
    }
}

#[cfg(test)]
mod tests {
    use super::{Defaults, OptionsPatch, ToastOptions, Transition, TransitionPatch, TransitionSet};
    use serde_json::json;
    use std::time::Duration;

    #[test]
    fn transition_leaves_are_replaced_not_merged() {
        let defaults = Defaults::new(ToastOptions::default());
        let replacement = Transition::new(json!({ "opacity": [0, 1] }), json!({ "duration": 50 }));
        defaults.set_default_options(&OptionsPatch {
            transitions: TransitionPatch {
                enter: Some(replacement.clone()),
                ..TransitionPatch::default()
            },
            ..OptionsPatch::default()
        });

        let current = defaults.get();
        assert_eq!(current.transitions.enter, replacement);
        assert!(current.transitions.enter.params.get("x").is_none());
        assert_eq!(current.transitions.leave, TransitionSet::default().leave);
        assert_eq!(current.duration, Duration::from_secs(5));
    }

    #[test]
    fn scalar_leaves_merge_individually() {
        let base = ToastOptions::default();
        let merged = base.merged(&OptionsPatch::default().with_closable(false));
        assert!(!merged.closable);
        assert_eq!(merged.duration, base.duration);
    }

    #[test]
    fn mirrored_flips_horizontal_offsets_only() {
        let set = TransitionSet::default().mirrored();
        assert_eq!(set.enter.params["x"], json!([-40, 0]));
        assert_eq!(set.stack_leave.params["x"], json!([0, -40]));
        assert_eq!(set.secondary, TransitionSet::default().secondary);
    }

    #[test]
    fn descriptor_duration_reads_milliseconds() {
        let set = TransitionSet::default();
        assert_eq!(set.leave.duration(), Some(Duration::from_millis(250)));
        assert_eq!(Transition::default().duration(), None);
    }

    #[test]
    fn patch_deserializes_humantime_durations() {
        let patch: OptionsPatch = match serde_json::from_value(json!({ "duration": "8s" })) {
            Ok(patch) => patch,
            Err(err) => panic!("patch should parse: {err}"),
        };
        assert_eq!(patch.duration, Some(Duration::from_secs(8)));
        assert_eq!(patch.closable, None);
    }
}
