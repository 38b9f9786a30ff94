use std::collections::BTreeMap;
use std::fmt;
use std::sync::{Mutex, PoisonError};

use tracing::trace;

/// The host's document root, which carries a marker class while a
/// container shows toasts.
pub trait RootMarker: Send + Sync + fmt::Debug {
    fn add_class(&self, class: &str);
    fn remove_class(&self, class: &str);
}

/// Root that ignores markers, for hosts without a document.
#[derive(Clone, Copy, Debug, Default)]
pub struct NullRoot;

impl RootMarker for NullRoot {
    fn add_class(&self, _class: &str) {}

    fn remove_class(&self, _class: &str) {}
}

/// In-memory class list. Counted, so containers sharing a class keep it
/// applied until the last of them empties.
#[derive(Debug, Default)]
pub struct ClassList {
    classes: Mutex<BTreeMap<String, usize>>,
}

impl ClassList {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contains(&self, class: &str) -> bool {
        self.classes
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .contains_key(class)
    }

    /// Applied classes in name order.
    pub fn classes(&self) -> Vec<String> {
        self.classes
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .keys()
            .cloned()
            .collect()
    }
}

impl RootMarker for ClassList {
    fn add_class(&self, class: &str) {
        trace!(class, "root class added");
        *self
            .classes
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .entry(class.to_string())
            .or_default() += 1;
    }

    fn remove_class(&self, class: &str) {
        let mut classes = self.classes.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(count) = classes.get_mut(class) {
            *count -= 1;
            if *count == 0 {
                classes.remove(class);
                trace!(class, "root class removed");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{ClassList, RootMarker};

    #[test]
    fn shared_class_survives_until_last_release() {
        let root = ClassList::new();
        root.add_class("has-toasts");
        root.add_class("has-toasts");
        root.remove_class("has-toasts");
        assert!(root.contains("has-toasts"));
        root.remove_class("has-toasts");
        assert!(root.classes().is_empty());
        root.remove_class("never-added");
    }
}
