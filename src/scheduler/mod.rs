//! Scheduler module for QuoteWatch Desktop
//!
//! Handles the periodic tasks:
//! - Price monitor (quotes, derived metrics, change events) during trading hours
//! - Alert evaluator (edge-triggered user alerts)

pub mod alert_evaluator;
pub mod price_monitor;
pub mod trading_hours;

pub use alert_evaluator::AlertEvaluator;
pub use price_monitor::{PriceMonitor, TickSummary};
