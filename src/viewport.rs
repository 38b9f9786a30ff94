use tokio::sync::watch;

/// Publishes whether the host viewport is "constrained" (small screens).
#[derive(Debug)]
pub struct Viewport {
    tx: watch::Sender<bool>,
}

impl Viewport {
    pub fn new(constrained: bool) -> Self {
        let (tx, _) = watch::channel(constrained);
        Self { tx }
    }

    pub fn set_constrained(&self, constrained: bool) {
        self.tx.send_if_modified(|current| {
            let changed = *current != constrained;
            *current = constrained;
            changed
        });
    }

    pub fn is_constrained(&self) -> bool {
        *self.tx.borrow()
    }

    pub fn subscribe(&self) -> watch::Receiver<bool> {
        self.tx.subscribe()
    }
}

impl Default for Viewport {
    fn default() -> Self {
        Self::new(false)
    }
}
