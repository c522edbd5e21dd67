//! Outward user notifications
//!
//! Everything that pops up on the desktop goes through the
//! `NotificationCenter`, which applies the per-code cooldown and the user's
//! on/off switch before handing off to the platform backend.

pub mod cooldown;
pub mod notifier;

pub use cooldown::{CooldownGate, NotifyKind};
pub use notifier::{platform_notifier, LogNotifier, Notifier};

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::{debug, warn};

pub struct NotificationCenter {
    notifier: Arc<dyn Notifier>,
    gate: CooldownGate,
    enabled: AtomicBool,
}

impl NotificationCenter {
    pub fn new(notifier: Arc<dyn Notifier>, enabled: bool) -> Self {
        Self {
            notifier,
            gate: CooldownGate::new(),
            enabled: AtomicBool::new(enabled),
        }
    }

    pub fn set_enabled(&self, enabled: bool) {
        let was = self.enabled.swap(enabled, Ordering::Relaxed);
        if enabled && !was {
            self.gate.reset();
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled.load(Ordering::Relaxed)
    }

    /// Notify unless disabled or still cooling down. Returns whether the
    /// notification was handed to the backend successfully; a failed send
    /// does not start a cooldown window.
    pub async fn send(&self, code: &str, kind: NotifyKind, title: &str, body: &str) -> bool {
        if !self.is_enabled() {
            return false;
        }

        if !self.gate.try_acquire(code, kind) {
            debug!("Notification for {} ({:?}) suppressed by cooldown", code, kind);
            return false;
        }

        match self.notifier.notify(title, body).await {
            Ok(()) => true,
            Err(e) => {
                warn!("{} notification failed: {}", self.notifier.id(), e);
                self.gate.release(code, kind);
                false
            }
        }
    }
}


#[cfg(test)]
mod tests {
    use super::testing::{FlakyNotifier, RecordingNotifier};
    use super::*;
    use std::sync::atomic::AtomicUsize;

    #[tokio::test]
    async fn test_cooldown_applies_per_code_and_kind() {
        let recorder = Arc::new(RecordingNotifier::default());
        let center = NotificationCenter::new(recorder.clone(), true);

        assert!(center.send("sh600000", NotifyKind::ChangeRate, "t", "b").await);
        assert!(!center.send("sh600000", NotifyKind::ChangeRate, "t", "b").await);
        assert!(center.send("sh600000", NotifyKind::Price, "t", "b").await);
        assert_eq!(recorder.sent.lock().len(), 2);
    }

    #[tokio::test]
    async fn test_disabled_center_sends_nothing() {
        let recorder = Arc::new(RecordingNotifier::default());
        let center = NotificationCenter::new(recorder.clone(), false);

        assert!(!center.send("sh600000", NotifyKind::Cost, "t", "b").await);
        assert!(recorder.sent.lock().is_empty());

        center.set_enabled(true);
        assert!(center.send("sh600000", NotifyKind::Cost, "t", "b").await);
    }

    #[tokio::test]
    async fn test_failed_send_does_not_start_cooldown() {
        let flaky = Arc::new(FlakyNotifier {
            failures: AtomicUsize::new(1),
            attempts: AtomicUsize::new(0),
        });
        let center = NotificationCenter::new(flaky.clone(), true);

        assert!(!center.send("hk00700", NotifyKind::Price, "t", "b").await);
        assert!(center.send("hk00700", NotifyKind::Price, "t", "b").await);
        assert!(!center.send("hk00700", NotifyKind::Price, "t", "b").await);
        assert_eq!(flaky.attempts.load(Ordering::SeqCst), 2);
    }
}
