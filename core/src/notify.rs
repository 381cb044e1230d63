//! Blocking-notification capability.
//!
//! The controller never shows a dialog itself; it calls `notify` on
//! whatever was injected. Front ends print or pop up, tests record.

use std::sync::Mutex;

use tracing::warn;

pub trait Notifier: Send + Sync {
    fn notify(&self, message: &str);
}

/// Emits each notification as a `warn` event.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingNotifier;

impl Notifier for TracingNotifier {
    fn notify(&self, message: &str) {
        warn!(target: "probe::notify", "{message}");
    }
}

/// Keeps every message it is given, in order.
#[derive(Debug, Default)]
pub struct RecordingNotifier {
    messages: Mutex<Vec<String>>,
}

impl RecordingNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn messages(&self) -> Vec<String> {
        self.messages
            .lock()
            .map(|m| m.clone())
            .unwrap_or_default()
    }

    pub fn len(&self) -> usize {
        self.messages.lock().map(|m| m.len()).unwrap_or_default()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Notifier for RecordingNotifier {
    fn notify(&self, message: &str) {
        if let Ok(mut messages) = self.messages.lock() {
            messages.push(message.to_string());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn recording_notifier_keeps_order() {
        let notifier = RecordingNotifier::new();
        assert!(notifier.is_empty());
        notifier.notify("first");
        notifier.notify("second");
        assert_eq!(notifier.messages(), vec!["first", "second"]);
        assert_eq!(notifier.len(), 2);
    }

    #[test]
    fn notifier_is_object_safe() {
        let notifier: Box<dyn Notifier> = Box::new(TracingNotifier);
        notifier.notify("logged, not shown");
    }
}
