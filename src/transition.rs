use std::fmt::{self, Display};

use async_trait::async_trait;
use tokio::time::sleep;
use tracing::trace;

use crate::options::{Transition, TransitionName};

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum TransitionStatus {
    Done,
    /// Playback failed; the caller proceeds as if it had settled.
    Error,
    /// Nothing to animate.
    Ignored,
}

/// Which element a transition animates.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum TransitionPart {
    /// The toast itself (enter/leave).
    Body,
    /// The stack slot wrapping the toast (stacking roles).
    Slot,
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct TransitionTarget {
    pub container: String,
    pub toast: String,
    pub part: TransitionPart,
    pub name: TransitionName,
}

impl Display for TransitionTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let part = match self.part {
            TransitionPart::Body => "body",
            TransitionPart::Slot => "slot",
        };
        write!(f, "{}/{}:{part}:{}", self.container, self.toast, self.name)
    }
}

/// Plays named transitions. Implementations must not panic; failures are
/// reported as [`TransitionStatus::Error`].
#[async_trait]
pub trait TransitionRunner: Send + Sync {
    async fn run(&self, target: TransitionTarget, transition: Transition) -> TransitionStatus;
}

/// Settles every transition immediately as ignored.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoopTransitions;

#[async_trait]
impl TransitionRunner for NoopTransitions {
    async fn run(&self, _target: TransitionTarget, _transition: Transition) -> TransitionStatus {
        TransitionStatus::Ignored
    }
}

/// Waits out the descriptor's declared duration, for hosts with no
/// animation layer of their own.
#[derive(Clone, Copy, Debug, Default)]
pub struct TimedTransitions;

#[async_trait]
impl TransitionRunner for TimedTransitions {
    async fn run(&self, target: TransitionTarget, transition: Transition) -> TransitionStatus {
        let Some(duration) = transition.duration() else {
            return TransitionStatus::Ignored;
        };
        trace!(%target, ?duration, "playing transition");
        sleep(duration).await;
        TransitionStatus::Done
    }
}

#[cfg(test)]
mod tests {
    use super::{
        NoopTransitions, TimedTransitions, TransitionPart, TransitionRunner, TransitionStatus,
        TransitionTarget,
    };
    use crate::options::{Transition, TransitionName, TransitionSet};
    use std::time::Duration;
    use tokio::time::Instant;

    fn target(name: TransitionName) -> TransitionTarget {
        TransitionTarget {
            container: "main".into(),
            toast: "1".into(),
            part: TransitionPart::Body,
            name,
        }
    }

    #[tokio::test(start_paused = true)]
    async fn timed_runner_waits_declared_duration() {
        let started = Instant::now();
        let status = TimedTransitions
            .run(target(TransitionName::Leave), TransitionSet::default().leave)
            .await;
        assert_eq!(status, TransitionStatus::Done);
        assert!(started.elapsed() >= Duration::from_millis(250));
    }

    #[tokio::test]
    async fn descriptors_without_duration_are_ignored() {
        let status = TimedTransitions
            .run(target(TransitionName::Hide), Transition::default())
            .await;
        assert_eq!(status, TransitionStatus::Ignored);
        let status = NoopTransitions
            .run(target(TransitionName::Enter), Transition::default())
            .await;
        assert_eq!(status, TransitionStatus::Ignored);
    }

    #[test]
    fn target_display_names_the_part() {
        let mut t = target(TransitionName::Secondary);
        t.part = TransitionPart::Slot;
        assert_eq!(t.to_string(), "main/1:slot:secondary");
    }
}
