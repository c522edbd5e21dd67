//! Stock Service
//!
//! Watch-list actions and live stock views. Called by the price monitor
//! and the local API.

use crate::db::sqlite::{FollowedStock, StockBasic};
use crate::error::{AppError, Result};
use crate::quotes::{from_listing_code, normalize_code, Market};
use crate::services::metrics::{self, DerivedStockView};
use crate::state::AppState;
use std::collections::HashMap;
use tracing::{debug, info};

/// Sort rank given to newly followed stocks
pub const DEFAULT_SORT: i64 = 999;

/// Most directory hits returned by one search
pub const SEARCH_LIMIT: usize = 50;

pub struct StockService;

impl StockService {
    /// Live views for the given codes, or for the whole watch list when
    /// `codes` is empty. Quotes for codes that are not followed are dropped.
    pub async fn get_stock_infos(
        state: &AppState,
        codes: &[String],
    ) -> Result<Vec<DerivedStockView>> {
        let follows = state.sqlite.list_follows()?;

        let codes: Vec<String> = if codes.is_empty() {
            follows.iter().map(|f| f.code.clone()).collect()
        } else {
            codes.iter().map(|c| normalize_code(c)).collect()
        };

        if codes.is_empty() {
            return Ok(Vec::new());
        }

        Self::views_for(state, &follows, &codes).await
    }

    /// Fetch `codes` and join each quote with its follow, in feed order.
    ///
    /// A view whose resolved price differs from the stored one queues a
    /// price update.
    pub(crate) async fn views_for(
        state: &AppState,
        follows: &[FollowedStock],
        codes: &[String],
    ) -> Result<Vec<DerivedStockView>> {
        let quotes = state.feed().fetch_batch(codes).await?;
        let by_code: HashMap<&str, &FollowedStock> =
            follows.iter().map(|f| (f.code.as_str(), f)).collect();

        let mut views = Vec::with_capacity(quotes.len());
        for quote in &quotes {
            let Some(follow) = by_code.get(quote.code.as_str()) else {
                debug!("Dropping quote for unfollowed {}", quote.code);
                continue;
            };

            let view = metrics::compute(quote, follow);
            if view.price_changed() {
                state.writes.update_follow_price(&follow.code, view.current_price);
            }
            views.push(view);
        }

        Ok(views)
    }

    /// Add a code to the watch list
    pub async fn follow(state: &AppState, code: &str) -> Result<FollowedStock> {
        let code = Self::canonical(code)?;

        if state.sqlite.get_follow(&code)?.is_some() {
            return Err(AppError::Duplicate(format!("{} is already followed", code)));
        }

        let quotes = state.feed().fetch_batch(std::slice::from_ref(&code)).await?;
        let quote = quotes
            .into_iter()
            .find(|q| q.code == code)
            .ok_or_else(|| AppError::NotFound(format!("Stock code {} does not exist", code)))?;

        let (price, _) = metrics::resolve_price(&quote);
        let follow = state.sqlite.insert_follow(&code, &quote.name, price, DEFAULT_SORT)?;

        info!("Followed {} ({})", follow.code, follow.name);
        Ok(follow)
    }

    /// Remove a code from the watch list and switch off its alerts
    pub fn unfollow(state: &AppState, code: &str) -> Result<()> {
        let code = normalize_code(code);
        if !state.sqlite.delete_follow(&code)? {
            return Err(AppError::NotFound(format!("{} is not followed", code)));
        }
        let disabled = state.sqlite.deactivate_alerts_for_code(&code)?;
        info!("Unfollowed {} ({} alerts disabled)", code, disabled);
        Ok(())
    }

    pub fn set_cost_price_and_volume(
        state: &AppState,
        code: &str,
        cost_price: f64,
        volume: i64,
    ) -> Result<FollowedStock> {
        Self::non_negative("cost price", cost_price)?;
        if volume < 0 {
            return Err(AppError::Validation("volume must not be negative".to_string()));
        }

        let code = normalize_code(code);
        if !state.sqlite.update_follow_cost(&code, cost_price, volume)? {
            return Err(AppError::NotFound(format!("{} is not followed", code)));
        }
        Self::reload(state, &code)
    }

    pub fn set_alarm_change_percent(
        state: &AppState,
        code: &str,
        change_percent: f64,
        alarm_price: f64,
    ) -> Result<FollowedStock> {
        Self::non_negative("alarm change percent", change_percent)?;
        Self::non_negative("alarm price", alarm_price)?;

        let code = normalize_code(code);
        if !state.sqlite.update_follow_alarm(&code, change_percent, alarm_price)? {
            return Err(AppError::NotFound(format!("{} is not followed", code)));
        }
        Self::reload(state, &code)
    }

    pub fn set_stock_sort(state: &AppState, code: &str, sort: i64) -> Result<FollowedStock> {
        if sort < 0 {
            return Err(AppError::Validation("sort must not be negative".to_string()));
        }

        let code = normalize_code(code);
        if !state.sqlite.update_follow_sort(&code, sort)? {
            return Err(AppError::NotFound(format!("{} is not followed", code)));
        }
        Self::reload(state, &code)
    }

    pub fn get_follow_list(state: &AppState) -> Result<Vec<FollowedStock>> {
        state.sqlite.list_follows()
    }

    /// Look up codes by name, code or full name fragment
    pub fn search_stocks(state: &AppState, keyword: &str) -> Result<Vec<StockBasic>> {
        let keyword = keyword.trim();
        if keyword.is_empty() {
            return Ok(Vec::new());
        }
        // codes are stored lowercased; names are matched as typed
        let mut hits = state.sqlite.search_stock_basics(keyword, SEARCH_LIMIT)?;
        let lowered = normalize_code(keyword);
        if hits.is_empty() && lowered != keyword {
            hits = state.sqlite.search_stock_basics(&lowered, SEARCH_LIMIT)?;
        }
        Ok(hits)
    }

    /// Load directory entries, converting listing codes to feed codes.
    ///
    /// Entries with an unsupported market or a blank name are skipped.
    pub fn import_stock_basics(state: &AppState, stocks: Vec<StockBasic>) -> Result<usize> {
        let total = stocks.len();
        let accepted: Vec<StockBasic> = stocks
            .into_iter()
            .filter_map(|s| {
                let code = from_listing_code(&s.code);
                let market = Market::from_code(&code)?;
                if s.name.trim().is_empty() {
                    return None;
                }
                Some(StockBasic {
                    code,
                    name: s.name.trim().to_string(),
                    market: market.as_str().to_string(),
                    fullname: s.fullname,
                })
            })
            .collect();

        if accepted.len() < total {
            debug!("Skipped {} of {} directory entries", total - accepted.len(), total);
        }
        if accepted.is_empty() {
            return Ok(0);
        }
        let written = state.sqlite.import_stock_basics(&accepted)?;
        info!(
            "Imported {} directory entries ({} total)",
            written,
            state.sqlite.count_stock_basics()?
        );
        Ok(written)
    }

    fn canonical(code: &str) -> Result<String> {
        let code = normalize_code(code);
        if code.is_empty() {
            return Err(AppError::Validation("stock code is required".to_string()));
        }
        if Market::from_code(&code).is_none() {
            return Err(AppError::Validation(format!("Unsupported stock code: {}", code)));
        }
        Ok(code)
    }

    fn non_negative(what: &str, value: f64) -> Result<()> {
        if !value.is_finite() || value < 0.0 {
            return Err(AppError::Validation(format!("{} must be a non-negative number", what)));
        }
        Ok(())
    }

    fn reload(state: &AppState, code: &str) -> Result<FollowedStock> {
        state
            .sqlite
            .get_follow(code)?
            .ok_or_else(|| AppError::NotFound(format!("{} is not followed", code)))
    }
}
