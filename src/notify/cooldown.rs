//! Per-stock notification cooldown

use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};

/// What a notification is about; each kind has its own cooldown
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotifyKind {
    ChangeRate,
    Price,
    Cost,
}

impl NotifyKind {
    pub fn cooldown(&self) -> Duration {
        match self {
            NotifyKind::ChangeRate => Duration::from_secs(5 * 60),
            NotifyKind::Price | NotifyKind::Cost => Duration::from_secs(30 * 60),
        }
    }
}

/// Suppresses repeat notifications for the same (code, kind)
#[derive(Default)]
pub struct CooldownGate {
    last_sent: DashMap<(String, NotifyKind), Instant>,
}

impl CooldownGate {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns true and starts a new window if a notification may go out now
    pub fn try_acquire(&self, code: &str, kind: NotifyKind) -> bool {
        self.try_acquire_at(code, kind, Instant::now())
    }

    pub(crate) fn try_acquire_at(&self, code: &str, kind: NotifyKind, now: Instant) -> bool {
        let key = (code.to_string(), kind);
        let mut allowed = false;

        self.last_sent
            .entry(key)
            .and_modify(|last| {
                if now.saturating_duration_since(*last) >= kind.cooldown() {
                    *last = now;
                    allowed = true;
                }
            })
            .or_insert_with(|| {
                allowed = true;
                now
            });

        allowed
    }

    /// Give back a window acquired for a notification that never showed
    pub fn release(&self, code: &str, kind: NotifyKind) {
        self.last_sent.remove(&(code.to_string(), kind));
    }

    /// Forget every window, e.g. when notifications are re-enabled
    pub fn reset(&self) {
        self.last_sent.clear();
    }
}
