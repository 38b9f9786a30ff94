use std::time::Duration;

pub(super) const fn default_tick() -> Duration {
    Duration::from_millis(10)
}

pub(super) const fn default_clear_stagger() -> Duration {
    Duration::from_millis(75)
}

pub(super) const fn default_channel_capacity() -> usize {
    64
}

pub(super) const fn default_duration() -> Duration {
    Duration::from_secs(5)
}

pub(super) const fn default_closable() -> bool {
    true
}

pub(super) fn default_container_name() -> String {
    "toasts".to_string()
}
