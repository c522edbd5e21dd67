//! Derived stock metrics
//!
//! Joins one quote with the user's position in that stock. Pure and
//! synchronous; persistence of the observed price is the caller's job.

use crate::db::sqlite::FollowedStock;
use crate::quotes::QuoteRecord;
use serde::{Deserialize, Serialize};

/// Where the current price was taken from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PriceSource {
    /// Last traded price
    Live,
    /// Best ask, used before the first trade of the session
    Ask,
    /// Best bid
    Bid,
    /// Nothing traded or quoted; prior close stands in
    PriorClose,
    None,
}

impl PriceSource {
    /// Whether the price reflects today's trading
    pub fn is_live(&self) -> bool {
        matches!(self, PriceSource::Live | PriceSource::Ask | PriceSource::Bid)
    }
}

/// Quote plus everything computed from it for display
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DerivedStockView {
    #[serde(flatten)]
    pub quote: QuoteRecord,

    /// Resolved current price
    pub current_price: f64,
    pub price_source: PriceSource,
    pub high_price: f64,
    pub low_price: f64,
    pub pre_close_price: f64,

    pub change_price: f64,
    pub change_percent: f64,
    pub high_rate: f64,
    pub low_rate: f64,

    pub profit: f64,
    pub profit_amount: f64,
    pub profit_amount_today: f64,

    /// Price stored on the follow before this quote
    pub pre_price: f64,
    pub cost_price: f64,
    pub cost_volume: i64,
    pub alarm_change_percent: f64,
    pub alarm_price: f64,
    pub sort: i64,
}

impl DerivedStockView {
    /// Whether the stored follow price should be refreshed from this view
    pub fn price_changed(&self) -> bool {
        self.current_price > 0.0 && self.current_price != self.pre_price
    }
}

/// Round half away from zero to `places` decimals
pub fn round_to(value: f64, places: i32) -> f64 {
    let factor = 10f64.powi(places);
    (value * factor).round() / factor
}

/// Feed numbers are text; anything blank or malformed reads as zero
pub fn parse_num(s: &str) -> f64 {
    s.trim().parse::<f64>().ok().filter(|v| v.is_finite()).unwrap_or(0.0)
}

/// Pick the first usable current price: last trade, ask 1, bid 1, prior close
pub fn resolve_price(quote: &QuoteRecord) -> (f64, PriceSource) {
    let candidates = [
        (quote.price.as_str(), PriceSource::Live),
        (quote.ask1_price(), PriceSource::Ask),
        (quote.bid1_price(), PriceSource::Bid),
        (quote.pre_close.as_str(), PriceSource::PriorClose),
    ];

    candidates
        .into_iter()
        .map(|(raw, source)| (parse_num(raw), source))
        .find(|(price, _)| *price > 0.0)
        .unwrap_or((0.0, PriceSource::None))
}

/// Percent move from `base` to `value`, 0 when `base` is not positive
fn rate(value: f64, base: f64) -> f64 {
    if value > 0.0 && base > 0.0 {
        round_to((value - base) / base * 100.0, 3)
    } else {
        0.0
    }
}

/// Compute the display view of `quote` for the given follow
pub fn compute(quote: &QuoteRecord, follow: &FollowedStock) -> DerivedStockView {
    let (current, source) = resolve_price(quote);
    let open = parse_num(&quote.open);
    let pre_close = parse_num(&quote.pre_close);

    let high = match parse_num(&quote.high) {
        h if h > 0.0 => h,
        _ => open,
    };
    let low = match parse_num(&quote.low) {
        l if l > 0.0 => l,
        _ => open,
    };

    let mut view = DerivedStockView {
        quote: quote.clone(),
        current_price: current,
        price_source: source,
        high_price: high,
        low_price: low,
        pre_close_price: pre_close,
        change_price: 0.0,
        change_percent: 0.0,
        high_rate: rate(high, pre_close),
        low_rate: rate(low, pre_close),
        profit: 0.0,
        profit_amount: 0.0,
        profit_amount_today: 0.0,
        pre_price: follow.price,
        cost_price: follow.cost_price,
        cost_volume: follow.volume,
        alarm_change_percent: follow.alarm_change_percent,
        alarm_price: follow.alarm_price,
        sort: follow.sort,
    };

    if current > 0.0 && pre_close > 0.0 {
        view.change_price = round_to(current - pre_close, 2);
        view.change_percent = rate(current, pre_close);
    }

    // no usable price at all: position figures stay at zero
    if current > 0.0 && follow.cost_price > 0.0 && follow.volume > 0 {
        let volume = follow.volume as f64;
        // prior close already stands in for `current` in the fallback branch
        view.profit = rate(current, follow.cost_price);
        view.profit_amount = round_to((current - follow.cost_price) * volume, 2);
        view.profit_amount_today = if source.is_live() && pre_close > 0.0 {
            round_to((current - pre_close) * volume, 2)
        } else {
            0.0
        };
    }

    view
}

/// Current price and change rate of a stored snapshot, for alert checks.
///
/// `None` when the snapshot carries no usable price.
pub fn price_snapshot(quote: &QuoteRecord) -> Option<(f64, f64)> {
    let (price, source) = resolve_price(quote);
    if source == PriceSource::None {
        return None;
    }
    Some((price, rate(price, parse_num(&quote.pre_close))))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn quote(price: &str, pre_close: &str) -> QuoteRecord {
        QuoteRecord {
            code: "sh600000".to_string(),
            price: price.to_string(),
            pre_close: pre_close.to_string(),
            open: "10.00".to_string(),
            high: "10.80".to_string(),
            low: "9.90".to_string(),
            ..Default::default()
        }
    }

    fn held(cost: f64, volume: i64, price: f64) -> FollowedStock {
        FollowedStock {
            cost_price: cost,
            volume,
            price,
            ..FollowedStock::unheld("sh600000")
        }
    }

    #[test]
    fn test_change_rate_matches_definition() {
        for (price, pre) in [("10.5", "10"), ("9.37", "10.12"), ("3.333", "3.001")] {
            let v = compute(&quote(price, pre), &held(0.0, 0, 0.0));
            let (c, p) = (parse_num(price), parse_num(pre));
            assert_eq!(v.change_percent, round_to((c - p) / p * 100.0, 3));
            assert_eq!(v.change_percent.signum(), (c - p).signum());
            assert_eq!(v.change_price.signum(), (c - p).signum());
        }
    }

    #[test]
    fn test_zero_prior_close_leaves_rates_at_zero() {
        let v = compute(&quote("10.5", "0"), &held(10.0, 100, 10.0));
        assert_eq!(v.change_percent, 0.0);
        assert_eq!(v.change_price, 0.0);
        assert_eq!(v.high_rate, 0.0);
        assert_eq!(v.low_rate, 0.0);
        assert_eq!(v.profit_amount_today, 0.0);
        assert_eq!(v.profit_amount, 50.0);

        let v = compute(&quote("", "abc"), &held(10.0, 100, 10.0));
        assert_eq!(v.current_price, 0.0);
        assert_eq!(v.price_source, PriceSource::None);
        assert_eq!(v.profit, 0.0);
        assert_eq!(v.profit_amount, 0.0);
        assert_eq!(v.profit_amount_today, 0.0);
    }

    #[test]
    fn test_blank_quote_reports_no_loss() {
        let blank = QuoteRecord {
            code: "sh600000".to_string(),
            ..Default::default()
        };
        let v = compute(&blank, &held(10.0, 100, 10.0));
        assert_eq!(v.price_source, PriceSource::None);
        assert_eq!(v.current_price, 0.0);
        assert_eq!(v.profit, 0.0);
        assert_eq!(v.profit_amount, 0.0);
        assert_eq!(v.profit_amount_today, 0.0);
        assert!(!v.price_changed());
    }

    #[test]
    fn test_fallback_to_prior_close() {
        let mut q = quote("0.000", "150.00");
        q.asks = vec![crate::quotes::DepthLevel { price: "0.000".into(), volume: "0".into() }];
        q.bids = vec![crate::quotes::DepthLevel { price: "0".into(), volume: "0".into() }];

        let v = compute(&q, &held(100.0, 10, 140.0));
        assert_eq!(v.current_price, 150.0);
        assert_eq!(v.price_source, PriceSource::PriorClose);
        assert_eq!(v.profit_amount, 500.0);
        assert_eq!(v.profit, 50.0);
        assert_eq!(v.profit_amount_today, 0.0);
    }

    #[test]
    fn test_fallback_prefers_ask_then_bid() {
        let mut q = quote("0", "10.00");
        q.asks = vec![crate::quotes::DepthLevel { price: "10.20".into(), volume: "100".into() }];
        q.bids = vec![crate::quotes::DepthLevel { price: "10.10".into(), volume: "100".into() }];
        let v = compute(&q, &held(10.0, 100, 0.0));
        assert_eq!(v.current_price, 10.2);
        assert_eq!(v.price_source, PriceSource::Ask);
        assert_eq!(v.profit_amount_today, 20.0);

        q.asks[0].price = "0".into();
        let (price, source) = resolve_price(&q);
        assert_eq!((price, source), (10.1, PriceSource::Bid));
    }

    #[test]
    fn test_profit_increases_with_price() {
        let follow = held(10.0, 300, 10.0);
        let mut last = f64::MIN;
        for price in ["9.5", "9.99", "10.0", "10.01", "12.3"] {
            let v = compute(&quote(price, "10.0"), &follow);
            assert!(v.profit_amount > last);
            last = v.profit_amount;
        }
    }

    #[test]
    fn test_no_position_no_profit() {
        let v = compute(&quote("10.5", "10"), &held(0.0, 100, 10.0));
        assert_eq!(v.profit_amount, 0.0);
        assert_eq!(v.profit_amount_today, 0.0);
        let v = compute(&quote("10.5", "10"), &held(10.0, 0, 10.0));
        assert_eq!(v.profit, 0.0);
    }

    #[test]
    fn test_high_low_default_to_open() {
        let mut q = quote("10.5", "10");
        q.high = "0".into();
        q.low = String::new();
        let v = compute(&q, &held(0.0, 0, 0.0));
        assert_eq!(v.high_price, 10.0);
        assert_eq!(v.low_price, 10.0);
        assert_eq!(v.high_rate, 0.0);
    }

    #[test]
    fn test_reference_scenario() {
        let v = compute(&quote("10.5", "10.0"), &held(10.0, 100, 10.0));
        assert_eq!(v.change_price, 0.5);
        assert_eq!(v.change_percent, 5.0);
        assert_eq!(v.profit_amount, 50.0);
        assert_eq!(v.profit, 5.0);
        assert_eq!(v.profit_amount_today, 50.0);
        assert_eq!(v.high_rate, 8.0);
        assert_eq!(v.low_rate, -1.0);
        assert!(v.price_changed());
    }

    #[test]
    fn test_price_snapshot() {
        assert_eq!(price_snapshot(&quote("10.5", "10")), Some((10.5, 5.0)));
        assert_eq!(price_snapshot(&quote("0", "0")), None);
    }
}
