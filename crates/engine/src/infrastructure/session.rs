//! Session adapters: a fixed authority and a log-backed notifier.

use std::sync::atomic::{AtomicBool, Ordering};

use super::ports::{AuthorityPort, NotificationPort};

/// Authority held by the local user; toggled when the arbiter role changes hands.
pub struct SessionAuthority {
    elevated: AtomicBool,
}

impl SessionAuthority {
    pub fn new(elevated: bool) -> Self {
        Self {
            elevated: AtomicBool::new(elevated),
        }
    }

    pub fn set_elevated(&self, elevated: bool) {
        self.elevated.store(elevated, Ordering::SeqCst);
    }
}

impl AuthorityPort for SessionAuthority {
    fn has_elevated_authority(&self) -> bool {
        self.elevated.load(Ordering::SeqCst)
    }
}

/// Notifier that writes user-facing messages to the log.
#[derive(Debug, Default)]
pub struct TracingNotifier;

impl NotificationPort for TracingNotifier {
    fn warn(&self, message: &str) {
        tracing::warn!(target: "spellbind_engine::notifications", "{}", message);
    }

    fn error(&self, message: &str) {
        tracing::error!(target: "spellbind_engine::notifications", "{}", message);
    }
}

/// Notifier that keeps every message, for assertions.
#[cfg(test)]
#[derive(Debug, Default)]
pub struct RecordingNotifier {
    pub warnings: std::sync::Mutex<Vec<String>>,
    pub errors: std::sync::Mutex<Vec<String>>,
}

#[cfg(test)]
impl NotificationPort for RecordingNotifier {
    fn warn(&self, message: &str) {
        self.warnings
            .lock()
            .expect("notifier lock")
            .push(message.to_string());
    }

    fn error(&self, message: &str) {
        self.errors
            .lock()
            .expect("notifier lock")
            .push(message.to_string());
    }
}
