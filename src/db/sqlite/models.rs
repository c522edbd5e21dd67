//! SQLite database models

use crate::error::AppError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// A stock on the user's watch list
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FollowedStock {
    pub id: i64,
    /// Canonical feed code, e.g. `sh600000`
    pub code: String,
    pub name: String,
    /// Shares held
    pub volume: i64,
    pub cost_price: f64,
    /// Last observed price
    pub price: f64,
    pub sort: i64,
    pub alarm_change_percent: f64,
    pub alarm_price: f64,
    pub is_deleted: bool,
    pub followed_at: String,
}

impl FollowedStock {
    /// Blank follow for the given code, used where only a quote is known
    pub fn unheld(code: &str) -> Self {
        Self {
            id: 0,
            code: code.to_string(),
            name: String::new(),
            volume: 0,
            cost_price: 0.0,
            price: 0.0,
            sort: 0,
            alarm_change_percent: 0.0,
            alarm_price: 0.0,
            is_deleted: false,
            followed_at: String::new(),
        }
    }
}

/// One listed security in the searchable directory
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StockBasic {
    /// Canonical feed code
    pub code: String,
    pub name: String,
    /// `CN`, `HK` or `US`
    #[serde(default)]
    pub market: String,
    #[serde(default)]
    pub fullname: String,
}

/// Condition a stock alert watches for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AlertType {
    PriceAbove,
    PriceBelow,
    ChangeRateAbove,
    ChangeRateBelow,
}

impl AlertType {
    pub fn as_str(&self) -> &'static str {
        match self {
            AlertType::PriceAbove => "PRICE_ABOVE",
            AlertType::PriceBelow => "PRICE_BELOW",
            AlertType::ChangeRateAbove => "CHANGE_RATE_ABOVE",
            AlertType::ChangeRateBelow => "CHANGE_RATE_BELOW",
        }
    }

    pub fn is_change_rate(&self) -> bool {
        matches!(self, AlertType::ChangeRateAbove | AlertType::ChangeRateBelow)
    }
}

impl fmt::Display for AlertType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AlertType {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "PRICE_ABOVE" => Ok(AlertType::PriceAbove),
            "PRICE_BELOW" => Ok(AlertType::PriceBelow),
            "CHANGE_RATE_ABOVE" => Ok(AlertType::ChangeRateAbove),
            "CHANGE_RATE_BELOW" => Ok(AlertType::ChangeRateBelow),
            other => Err(AppError::Validation(format!("Unknown alert type: {}", other))),
        }
    }
}

/// User-defined price alert
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StockAlert {
    pub id: i64,
    pub stock_code: String,
    pub alert_type: AlertType,
    pub threshold: f64,
    pub active: bool,
    pub triggered: bool,
    pub last_triggered: Option<String>,
    pub created_at: String,
}

/// Latest stored snapshot of a code
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuoteHistoryEntry {
    pub code: String,
    pub quote: crate::quotes::QuoteRecord,
    pub updated_at: String,
}

/// Settings model
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Settings {
    pub id: i64,
    /// Seconds between price monitor ticks
    pub refresh_interval: i64,
    /// Seconds between alert evaluation passes
    pub alert_interval: i64,
    pub request_timeout_secs: i64,
    pub quote_feed_url: Option<String>,
    pub browser_path: Option<String>,
    pub enable_notifications: bool,
    // Local API
    pub api_enabled: bool,
    pub api_host: String,
    pub api_port: u16,
}

/// Partial settings update; `None` leaves a field unchanged
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SettingsUpdate {
    pub refresh_interval: Option<i64>,
    pub alert_interval: Option<i64>,
    pub request_timeout_secs: Option<i64>,
    pub quote_feed_url: Option<String>,
    pub browser_path: Option<String>,
    pub enable_notifications: Option<bool>,
    pub api_enabled: Option<bool>,
    pub api_host: Option<String>,
    pub api_port: Option<u16>,
}

/// Local API server configuration (subset of Settings)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    pub enabled: bool,
    pub host: String,
    pub port: u16,
}

impl From<&Settings> for ApiConfig {
    fn from(s: &Settings) -> Self {
        Self {
            enabled: s.api_enabled,
            host: s.api_host.clone(),
            port: s.api_port,
        }
    }
}
