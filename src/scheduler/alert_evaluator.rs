//! Alert evaluation loop
//!
//! Alerts are edge-triggered: an alert fires once when its condition
//! becomes true and re-arms silently when the condition clears. Prices
//! come from the latest stored quote snapshot of each code.

use crate::db::sqlite::{AlertType, StockAlert};
use crate::error::Result;
use crate::events::AppEvent;
use crate::notify::NotifyKind;
use crate::services::metrics::price_snapshot;
use crate::state::AppState;
use chrono::Utc;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

/// What an evaluation pass should do with one alert
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    /// Condition just became true
    Fire,
    /// Condition cleared on a triggered alert
    Reset,
    Hold,
}

/// Whether the alert condition holds for the given price and change rate
pub fn is_alert_triggered(
    alert_type: AlertType,
    threshold: f64,
    price: f64,
    change_rate: f64,
) -> bool {
    match alert_type {
        AlertType::PriceAbove => price > threshold,
        AlertType::PriceBelow => price < threshold,
        AlertType::ChangeRateAbove => change_rate > threshold,
        AlertType::ChangeRateBelow => change_rate < threshold,
    }
}

pub fn transition(was_triggered: bool, now_triggered: bool) -> Transition {
    match (was_triggered, now_triggered) {
        (false, true) => Transition::Fire,
        (true, false) => Transition::Reset,
        _ => Transition::Hold,
    }
}

pub struct AlertEvaluator {
    state: Arc<AppState>,
}

impl AlertEvaluator {
    pub fn new(state: Arc<AppState>) -> Self {
        Self { state }
    }

    /// Seconds between passes; anything not positive means 60
    fn interval_secs(&self) -> u64 {
        match self.state.sqlite.get_settings() {
            Ok(s) if s.alert_interval > 0 => s.alert_interval as u64,
            Ok(_) => 60,
            Err(e) => {
                warn!("Failed to read alert interval, using 60s: {}", e);
                60
            }
        }
    }

    pub fn start(self, mut shutdown: watch::Receiver<bool>) -> JoinHandle<()> {
        tokio::spawn(async move {
            let secs = self.interval_secs();
            let mut ticker = tokio::time::interval(Duration::from_secs(secs));
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
            info!("Alert evaluator started ({}s interval)", secs);

            loop {
                tokio::select! {
                    _ = ticker.tick() => {}
                    _ = shutdown.changed() => break,
                }
                if *shutdown.borrow() {
                    break;
                }

                match self.evaluate_all().await {
                    Ok(fired) if fired > 0 => debug!("{} alerts fired", fired),
                    Ok(_) => {}
                    Err(e) => warn!("Alert evaluation failed: {}", e),
                }
            }

            info!("Alert evaluator stopped");
        })
    }

    /// One pass over all active alerts. Returns how many fired.
    pub async fn evaluate_all(&self) -> Result<usize> {
        let alerts = self.state.sqlite.list_active_alerts()?;
        let mut fired = 0;

        for alert in &alerts {
            match self.evaluate(alert).await {
                Ok(Transition::Fire) => fired += 1,
                Ok(_) => {}
                Err(e) => warn!("Skipping alert {} on {}: {}", alert.id, alert.stock_code, e),
            }
        }

        Ok(fired)
    }

    async fn evaluate(&self, alert: &StockAlert) -> Result<Transition> {
        let Some(entry) = self.state.sqlite.get_latest_quote(&alert.stock_code)? else {
            debug!("No snapshot yet for {}", alert.stock_code);
            return Ok(Transition::Hold);
        };
        let Some((price, change_rate)) = price_snapshot(&entry.quote) else {
            debug!("Snapshot for {} has no usable price", alert.stock_code);
            return Ok(Transition::Hold);
        };

        let now_triggered =
            is_alert_triggered(alert.alert_type, alert.threshold, price, change_rate);
        let step = transition(alert.triggered, now_triggered);

        match step {
            Transition::Fire => {
                let now = Utc::now();
                let stamp = now.format("%Y-%m-%d %H:%M:%S").to_string();
                self.state.sqlite.set_alert_triggered(alert.id, true, Some(&stamp))?;

                self.state.events.dispatch(AppEvent::AlertTriggered {
                    alert_id: alert.id,
                    code: alert.stock_code.clone(),
                    alert_type: alert.alert_type,
                    threshold: alert.threshold,
                    price,
                    change_percent: change_rate,
                    timestamp: now,
                });

                let kind = if alert.alert_type.is_change_rate() {
                    NotifyKind::ChangeRate
                } else {
                    NotifyKind::Price
                };
                let title = format!("{} {}", entry.quote.name, alert.stock_code);
                let body = format!(
                    "{} {} hit: price {}, change {:+.2}%",
                    alert.alert_type, alert.threshold, price, change_rate
                );
                self.state
                    .notifications
                    .send(&alert.stock_code, kind, &title, &body)
                    .await;
            }
            Transition::Reset => {
                self.state.sqlite.set_alert_triggered(alert.id, false, None)?;
            }
            Transition::Hold => {}
        }

        Ok(step)
    }
}
