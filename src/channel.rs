use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tokio::sync::broadcast::{self, error::RecvError, error::TryRecvError};
use tokio::sync::mpsc;
use tracing::{trace, warn};

use crate::types::StackState;

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ChannelEvent {
    /// A toast finished mounting.
    Added { id: String },
    /// A toast started closing; emitted before its leave transition.
    Removing { id: String },
    /// Container-to-toast command.
    Directive { id: String, state: StackState },
}

impl ChannelEvent {
    pub fn id(&self) -> &str {
        match self {
            Self::Added { id } | Self::Removing { id } | Self::Directive { id, .. } => id,
        }
    }
}

#[derive(Debug, Default)]
struct Routes {
    directives: HashMap<String, mpsc::UnboundedSender<StackState>>,
    lifecycle: Vec<mpsc::UnboundedSender<ChannelEvent>>,
}

/// Per-container publish/subscribe bus.
///
/// Directives reach their toast and lifecycle events reach the coordinator
/// through unbounded queues, so a burst never drops one. Observers attached
/// with [`EventChannel::subscribe`] see every event on a bounded broadcast
/// and may lag.
#[derive(Clone, Debug)]
pub struct EventChannel {
    container: Arc<str>,
    tx: broadcast::Sender<ChannelEvent>,
    routes: Arc<Mutex<Routes>>,
}

impl EventChannel {
    pub fn new(container: &str, capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity.max(1));
        Self {
            container: Arc::from(container),
            tx,
            routes: Arc::default(),
        }
    }

    pub fn container(&self) -> &str {
        &self.container
    }

    pub fn added(&self, id: &str) {
        self.send(ChannelEvent::Added { id: id.to_string() });
    }

    pub fn removing(&self, id: &str) {
        self.send(ChannelEvent::Removing { id: id.to_string() });
    }

    /// Deliver a directive. Returns `false` when no toast with `id` is
    /// listening.
    pub fn direct(&self, id: &str, state: StackState) -> bool {
        let delivered = self
            .routes()
            .directives
            .get(id)
            .is_some_and(|tx| tx.send(state).is_ok());
        if !delivered {
            trace!(container = %self.container, toast = id, %state, "directive without listener");
        }
        self.send(ChannelEvent::Directive {
            id: id.to_string(),
            state,
        });
        delivered
    }

    fn send(&self, event: ChannelEvent) {
        trace!(container = %self.container, ?event, "channel event");
        if !matches!(event, ChannelEvent::Directive { .. }) {
            self.routes()
                .lifecycle
                .retain(|tx| tx.send(event.clone()).is_ok());
        }
        // No observers is not an error: nothing is listening yet.
        let _ = self.tx.send(event);
    }

    /// Observer stream of every event. Slow observers skip events.
    pub fn subscribe(&self) -> EventStream {
        EventStream {
            container: Arc::clone(&self.container),
            rx: self.tx.subscribe(),
        }
    }

    /// Lossless stream of `Added` and `Removing` events.
    pub fn lifecycle(&self) -> LifecycleStream {
        let (tx, rx) = mpsc::unbounded_channel();
        self.routes().lifecycle.push(tx);
        LifecycleStream { rx }
    }

    /// Directives addressed to a single toast. A later call for the same id
    /// takes over delivery.
    pub fn directives_for(&self, id: &str) -> DirectiveStream {
        let (tx, rx) = mpsc::unbounded_channel();
        self.routes().directives.insert(id.to_string(), tx);
        DirectiveStream {
            id: id.to_string(),
            routes: Arc::clone(&self.routes),
            rx,
        }
    }

    fn routes(&self) -> MutexGuard<'_, Routes> {
        self.routes.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[derive(Debug)]
pub struct EventStream {
    container: Arc<str>,
    rx: broadcast::Receiver<ChannelEvent>,
}

impl EventStream {
    /// Next event, or `None` once every sender is gone.
    pub async fn recv(&mut self) -> Option<ChannelEvent> {
        loop {
            match self.rx.recv().await {
                Ok(event) => return Some(event),
                Err(RecvError::Lagged(skipped)) => {
                    warn!(container = %self.container, skipped, "event subscriber lagged");
                }
                Err(RecvError::Closed) => return None,
            }
        }
    }

    /// Non-blocking variant; `None` when nothing is queued.
    pub fn try_recv(&mut self) -> Option<ChannelEvent> {
        loop {
            match self.rx.try_recv() {
                Ok(event) => return Some(event),
                Err(TryRecvError::Lagged(skipped)) => {
                    warn!(container = %self.container, skipped, "event subscriber lagged");
                }
                Err(TryRecvError::Empty | TryRecvError::Closed) => return None,
            }
        }
    }

    /// Drain everything queued right now.
    pub fn drain(&mut self) -> Vec<ChannelEvent> {
        std::iter::from_fn(|| self.try_recv()).collect()
    }
}

#[derive(Debug)]
pub struct LifecycleStream {
    rx: mpsc::UnboundedReceiver<ChannelEvent>,
}

impl LifecycleStream {
    pub async fn recv(&mut self) -> Option<ChannelEvent> {
        self.rx.recv().await
    }
}

#[derive(Debug)]
pub struct DirectiveStream {
    id: String,
    routes: Arc<Mutex<Routes>>,
    rx: mpsc::UnboundedReceiver<StackState>,
}

impl DirectiveStream {
    pub async fn recv(&mut self) -> Option<StackState> {
        self.rx.recv().await
    }
}

impl Drop for DirectiveStream {
    fn drop(&mut self) {
        self.rx.close();
        let mut routes = self.routes.lock().unwrap_or_else(PoisonError::into_inner);
        // Only unregister our own route; a remount may have replaced it.
        if routes.directives.get(&self.id).is_some_and(mpsc::UnboundedSender::is_closed) {
            routes.directives.remove(&self.id);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{ChannelEvent, EventChannel};
    use crate::types::StackState;

    #[tokio::test]
    async fn directive_stream_filters_by_id() {
        let channel = EventChannel::new("main", 8);
        let mut directives = channel.directives_for("b");
        assert!(!channel.direct("a", StackState::Hide));
        channel.added("b");
        assert!(channel.direct("b", StackState::Secondary));
        assert_eq!(directives.recv().await, Some(StackState::Secondary));
    }

    #[tokio::test]
    async fn directives_survive_a_burst_past_capacity() {
        let channel = EventChannel::new("main", 4);
        let mut observer = channel.subscribe();
        let mut directives = channel.directives_for("a");
        let mut lifecycle = channel.lifecycle();
        for _ in 0..20 {
            channel.direct("a", StackState::Hide);
            channel.added("b");
        }
        channel.direct("a", StackState::Remove);

        let mut seen = Vec::new();
        for _ in 0..21 {
            seen.push(directives.recv().await);
        }
        assert_eq!(seen.last(), Some(&Some(StackState::Remove)));
        assert!(seen.iter().all(Option::is_some));
        for _ in 0..20 {
            assert_eq!(lifecycle.recv().await, Some(ChannelEvent::Added { id: "b".into() }));
        }
        assert_eq!(observer.drain().len(), 4);
    }

    #[tokio::test]
    async fn remount_keeps_the_newer_route() {
        let channel = EventChannel::new("main", 8);
        let old = channel.directives_for("a");
        let mut new = channel.directives_for("a");
        drop(old);
        assert!(channel.direct("a", StackState::Activate));
        assert_eq!(new.recv().await, Some(StackState::Activate));
        drop(new);
        assert!(!channel.direct("a", StackState::Activate));
    }

    #[test]
    fn drain_returns_events_in_emission_order() {
        let channel = EventChannel::new("main", 8);
        let mut events = channel.subscribe();
        channel.added("a");
        channel.removing("a");
        assert_eq!(
            events.drain(),
            vec![
                ChannelEvent::Added { id: "a".into() },
                ChannelEvent::Removing { id: "a".into() },
            ]
        );
        assert!(events.try_recv().is_none());
        assert_eq!(channel.container(), "main");
    }
}
