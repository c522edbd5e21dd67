//! Application events

use crate::db::sqlite::AlertType;
use crate::services::metrics::DerivedStockView;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Event discriminant used for handler registration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    PriceChanged,
    TotalProfit,
    AlertTriggered,
}

impl EventKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            EventKind::PriceChanged => "price_changed",
            EventKind::TotalProfit => "total_profit",
            EventKind::AlertTriggered => "alert_triggered",
        }
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Something the UI or a notifier wants to hear about
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AppEvent {
    /// A followed stock's resolved price moved since the last tick
    PriceChanged {
        code: String,
        old_price: f64,
        new_price: f64,
        view: Box<DerivedStockView>,
        timestamp: DateTime<Utc>,
    },
    /// Sum of today's profit across the watch list
    TotalProfit {
        total: f64,
        timestamp: DateTime<Utc>,
    },
    AlertTriggered {
        alert_id: i64,
        code: String,
        alert_type: AlertType,
        threshold: f64,
        price: f64,
        change_percent: f64,
        timestamp: DateTime<Utc>,
    },
}

impl AppEvent {
    pub fn kind(&self) -> EventKind {
        match self {
            AppEvent::PriceChanged { .. } => EventKind::PriceChanged,
            AppEvent::TotalProfit { .. } => EventKind::TotalProfit,
            AppEvent::AlertTriggered { .. } => EventKind::AlertTriggered,
        }
    }

    pub fn timestamp(&self) -> DateTime<Utc> {
        match self {
            AppEvent::PriceChanged { timestamp, .. }
            | AppEvent::TotalProfit { timestamp, .. }
            | AppEvent::AlertTriggered { timestamp, .. } => *timestamp,
        }
    }
}
