use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::HandlerError;
use crate::types::{CloseReason, ToastMode};

/// Component name of the bundled plain-text presentation.
pub const SIMPLE_COMPONENT: &str = "simple-message";

pub type HandlerFuture = Pin<Box<dyn Future<Output = Result<bool, HandlerError>> + Send>>;

type OpenFn = dyn Fn() + Send + Sync;
type CloseFn = dyn Fn(CloseReason) + Send + Sync;
type ClickFn = dyn Fn() -> HandlerFuture + Send + Sync;
type ActionFn = dyn Fn(String, Option<Value>) -> HandlerFuture + Send + Sync;

/// Opaque payload the host renders; the engine never looks inside `props`.
#[derive(Clone, Debug, Default, Deserialize, PartialEq, Serialize)]
pub struct Presentation {
    pub component: String,
    #[serde(default)]
    pub props: Value,
}

impl Presentation {
    pub fn new(component: impl Into<String>, props: Value) -> Self {
        Self {
            component: component.into(),
            props,
        }
    }
}

/// Lifecycle callbacks attached to a toast.
///
/// Click and action handlers resolve to `Ok(true)` to close the toast;
/// `Ok(false)` or an error leaves it open.
#[derive(Clone, Default)]
pub struct Handlers {
    on_open: Option<Arc<OpenFn>>,
    on_close: Option<Arc<CloseFn>>,
    on_click: Option<Arc<ClickFn>>,
    on_action: Option<Arc<ActionFn>>,
}

impl Handlers {
    #[must_use]
    pub fn on_open(mut self, f: impl Fn() + Send + Sync + 'static) -> Self {
        self.on_open = Some(Arc::new(f));
        self
    }

    #[must_use]
    pub fn on_close(mut self, f: impl Fn(CloseReason) + Send + Sync + 'static) -> Self {
        self.on_close = Some(Arc::new(f));
        self
    }

    #[must_use]
    pub fn on_click<F, Fut>(mut self, f: F) -> Self
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<bool, HandlerError>> + Send + 'static,
    {
        self.on_click = Some(Arc::new(move || Box::pin(f()) as HandlerFuture));
        self
    }

    #[must_use]
    pub fn on_action<F, Fut>(mut self, f: F) -> Self
    where
        F: Fn(String, Option<Value>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<bool, HandlerError>> + Send + 'static,
    {
        self.on_action = Some(Arc::new(move |key, data| Box::pin(f(key, data)) as HandlerFuture));
        self
    }

    pub const fn has_click(&self) -> bool {
        self.on_click.is_some()
    }

    pub const fn has_action(&self) -> bool {
        self.on_action.is_some()
    }

    pub(crate) fn opened(&self) {
        if let Some(f) = &self.on_open {
            f();
        }
    }

    pub(crate) fn closed(&self, reason: CloseReason) {
        if let Some(f) = &self.on_close {
            f(reason);
        }
    }

    pub(crate) fn click(&self) -> Option<HandlerFuture> {
        self.on_click.as_ref().map(|f| f())
    }

    pub(crate) fn action(&self, key: String, data: Option<Value>) -> Option<HandlerFuture> {
        self.on_action.as_ref().map(|f| f(key, data))
    }
}

impl fmt::Debug for Handlers {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Handlers")
            .field("on_open", &self.on_open.is_some())
            .field("on_close", &self.on_close.is_some())
            .field("on_click", &self.on_click.is_some())
            .field("on_action", &self.on_action.is_some())
            .finish()
    }
}

/// A stored notification. Never mutated after creation.
#[derive(Debug)]
pub struct ToastRecord {
    /// `container-identifier`, unique process-wide.
    pub key: String,
    /// Unique within the container.
    pub identifier: String,
    pub container: String,
    pub mode: ToastMode,
    pub duration: Duration,
    pub closable: bool,
    pub handlers: Handlers,
    pub presentation: Presentation,
}

impl ToastRecord {
    pub fn is_sticky(&self) -> bool {
        self.mode == ToastMode::Sticky
    }

    /// Whether the progress timer runs for this toast.
    pub fn auto_dismiss(&self) -> bool {
        !self.is_sticky() && !self.duration.is_zero()
    }
}

#[cfg(test)]
mod tests {
    use super::{Handlers, Presentation, ToastRecord};
    use crate::types::{CloseReason, ToastMode};
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    fn record(mode: ToastMode, duration: Duration) -> ToastRecord {
        ToastRecord {
            key: "main-1".into(),
            identifier: "1".into(),
            container: "main".into(),
            mode,
            duration,
            closable: true,
            handlers: Handlers::default(),
            presentation: Presentation::default(),
        }
    }

    #[test]
    fn sticky_and_zero_duration_never_auto_dismiss() {
        assert!(record(ToastMode::Default, Duration::from_secs(5)).auto_dismiss());
        assert!(!record(ToastMode::Sticky, Duration::from_secs(5)).auto_dismiss());
        assert!(!record(ToastMode::Default, Duration::ZERO).auto_dismiss());
    }

    #[tokio::test]
    async fn handlers_dispatch_to_closures() {
        let closes = Arc::new(AtomicUsize::new(0));
        let seen = Arc::clone(&closes);
        let handlers = Handlers::default()
            .on_close(move |reason| {
                assert_eq!(reason, CloseReason::Timer);
                seen.fetch_add(1, Ordering::SeqCst);
            })
            .on_click(|| async { Ok(true) });

        handlers.closed(CloseReason::Timer);
        assert_eq!(closes.load(Ordering::SeqCst), 1);
        assert!(handlers.has_click());
        let outcome = match handlers.click() {
            Some(fut) => fut.await,
            None => panic!("click handler missing"),
        };
        assert_eq!(outcome, Ok(true));
        assert!(handlers.action("open".into(), None).is_none());
    }
}
