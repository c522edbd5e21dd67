//! Price monitor loop
//!
//! On every tick during trading hours:
//! 1. Reads the watch list and fetches all quotes in one request
//! 2. Computes live views and queues changed prices for storage
//! 3. Emits `PriceChanged` per moved stock and one `TotalProfit`
//! 4. Pops desktop notifications for follow alarms

use crate::db::sqlite::FollowedStock;
use crate::error::Result;
use crate::events::AppEvent;
use crate::notify::NotifyKind;
use crate::quotes::Market;
use crate::scheduler::trading_hours::any_market_open;
use crate::services::metrics::{round_to, DerivedStockView};
use crate::services::StockService;
use crate::state::AppState;
use chrono::{DateTime, Utc};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, trace, warn};

/// Outcome of one monitor tick
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TickSummary {
    pub quotes: usize,
    pub price_changes: usize,
    pub total_profit_today: f64,
    pub notifications: usize,
}

pub struct PriceMonitor {
    state: Arc<AppState>,
}

impl PriceMonitor {
    pub fn new(state: Arc<AppState>) -> Self {
        Self { state }
    }

    /// Tick interval from settings; anything not positive means 1s
    fn interval_secs(&self) -> u64 {
        match self.state.sqlite.get_settings() {
            Ok(s) if s.refresh_interval > 0 => s.refresh_interval as u64,
            Ok(_) => 1,
            Err(e) => {
                warn!("Failed to read refresh interval, using 1s: {}", e);
                1
            }
        }
    }

    /// Spawn the monitor loop; it exits when `shutdown` flips to true
    pub fn start(self, mut shutdown: watch::Receiver<bool>) -> JoinHandle<()> {
        tokio::spawn(async move {
            let mut secs = self.interval_secs();
            let mut ticker = tokio::time::interval(Duration::from_secs(secs));
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
            info!("Price monitor started ({}s interval)", secs);

            loop {
                tokio::select! {
                    _ = ticker.tick() => {}
                    _ = shutdown.changed() => break,
                }
                if *shutdown.borrow() {
                    break;
                }

                // an in-flight fetch is abandoned on shutdown
                tokio::select! {
                    result = self.tick_if_trading(Utc::now()) => {
                        if let Err(e) = result {
                            warn!("Price monitor tick failed: {}", e);
                        }
                    }
                    _ = shutdown.changed() => break,
                }

                let next = self.interval_secs();
                if next != secs {
                    info!("Price monitor interval changed {}s -> {}s", secs, next);
                    secs = next;
                    ticker = tokio::time::interval(Duration::from_secs(secs));
                    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
                    ticker.reset();
                }
            }

            info!("Price monitor stopped");
        })
    }

    /// Tick only when at least one followed market is in session
    pub async fn tick_if_trading(&self, now: DateTime<Utc>) -> Result<Option<TickSummary>> {
        let follows = self.state.sqlite.list_follows()?;
        if follows.is_empty() {
            trace!("Watch list empty, skipping tick");
            return Ok(None);
        }

        let markets = follows.iter().filter_map(|f| Market::from_code(&f.code));
        if !any_market_open(markets, now) {
            trace!("No followed market in session");
            return Ok(None);
        }

        self.process(&follows).await.map(Some)
    }

    /// Tick regardless of trading hours. `None` when the watch list is empty.
    pub async fn tick(&self) -> Result<Option<TickSummary>> {
        let follows = self.state.sqlite.list_follows()?;
        if follows.is_empty() {
            return Ok(None);
        }
        self.process(&follows).await.map(Some)
    }

    async fn process(&self, follows: &[FollowedStock]) -> Result<TickSummary> {
        let codes: Vec<String> = follows.iter().map(|f| f.code.clone()).collect();
        let views = StockService::views_for(&self.state, follows, &codes).await?;

        let mut summary = TickSummary {
            quotes: views.len(),
            ..Default::default()
        };
        let mut total = 0.0;

        for view in &views {
            total += view.profit_amount_today;

            if view.price_changed() {
                summary.price_changes += 1;
                self.state.events.dispatch(AppEvent::PriceChanged {
                    code: view.quote.code.clone(),
                    old_price: view.pre_price,
                    new_price: view.current_price,
                    view: Box::new(view.clone()),
                    timestamp: Utc::now(),
                });
            }

            summary.notifications += self.check_alarms(view).await;
        }

        summary.total_profit_today = round_to(total, 2);
        self.state.events.dispatch(AppEvent::TotalProfit {
            total: summary.total_profit_today,
            timestamp: Utc::now(),
        });

        debug!(
            "Tick: {} quotes, {} moved, today {:.2}",
            summary.quotes, summary.price_changes, summary.total_profit_today
        );
        Ok(summary)
    }

    /// Desktop notifications for the follow's alarm settings
    async fn check_alarms(&self, view: &DerivedStockView) -> usize {
        if view.current_price <= 0.0 {
            return 0;
        }

        let code = view.quote.code.as_str();
        let title = format!("{} {}", view.quote.name, code);
        let mut sent = 0;

        if view.alarm_change_percent > 0.0
            && view.change_percent.abs() >= view.alarm_change_percent
        {
            let body = format!(
                "Price {} ({:+.2}%), alarm at ±{}%",
                view.current_price, view.change_percent, view.alarm_change_percent
            );
            if self
                .state
                .notifications
                .send(code, NotifyKind::ChangeRate, &title, &body)
                .await
            {
                sent += 1;
            }
        }

        if view.alarm_price > 0.0 && view.current_price >= view.alarm_price {
            let body = format!(
                "Price {} reached alarm price {}",
                view.current_price, view.alarm_price
            );
            if self.state.notifications.send(code, NotifyKind::Price, &title, &body).await {
                sent += 1;
            }
        }

        if view.cost_price > 0.0 && view.current_price >= view.cost_price {
            let body = format!(
                "Price {} at or above cost {} (profit {:.2})",
                view.current_price, view.cost_price, view.profit_amount
            );
            if self.state.notifications.send(code, NotifyKind::Cost, &title, &body).await {
                sent += 1;
            }
        }

        sent
    }
}
