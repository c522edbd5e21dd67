//! Services Layer
//!
//! Business logic shared between the monitor loops and the local API
//! handlers.
//!
//! # Architecture
//!
//! ```text
//! Scheduler loops ──┐
//!                   ├──> Services --> QuoteFeed / SQLite / WriteQueue
//! Local API ────────┘
//! ```
//!
//! # Services
//!
//! - `StockService` - Watch list, live stock views
//! - `AlertService` - Alert create/delete/enable/disable/list
//! - `SettingsService` - Settings read/update
//! - `metrics` - Pure derived-metric computation

pub mod alert_service;
pub mod metrics;
pub mod settings_service;
pub mod stock_service;

pub use alert_service::AlertService;
pub use metrics::{DerivedStockView, PriceSource};
pub use settings_service::SettingsService;
pub use stock_service::StockService;
