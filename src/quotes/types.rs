//! Quote snapshot types

use serde::{Deserialize, Serialize};
use std::fmt;

/// Exchange convention a feed line follows
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Market {
    /// Shanghai, Shenzhen, Beijing
    Cn,
    Hk,
    Us,
}

impl Market {
    /// Detect the market from a canonical feed code (`sh600000`, `hk00700`, `gb_aapl`)
    pub fn from_code(code: &str) -> Option<Self> {
        if code.starts_with("gb_") {
            Some(Market::Us)
        } else if code.starts_with("hk") {
            Some(Market::Hk)
        } else if ["sh", "sz", "bj", "sb"].iter().any(|p| code.starts_with(p)) {
            Some(Market::Cn)
        } else {
            None
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Market::Cn => "CN",
            Market::Hk => "HK",
            Market::Us => "US",
        }
    }
}

impl fmt::Display for Market {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One level of the order book ladder
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DepthLevel {
    pub price: String,
    pub volume: String,
}

/// Pre/post-market session figures (US only)
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ExtendedSession {
    pub price: String,
    pub change_percent: String,
}

/// One snapshot of one stock as delivered by the feed.
///
/// Numeric fields are kept verbatim as text; conversion happens in the
/// metrics calculator where a blank or malformed value reads as zero.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct QuoteRecord {
    pub code: String,
    pub market: Option<Market>,
    pub name: String,
    pub date: String,
    pub time: String,
    pub price: String,
    pub open: String,
    pub pre_close: String,
    pub high: String,
    pub low: String,
    /// Best bid / ask
    pub bid: String,
    pub ask: String,
    /// Five-level ladders, CN only
    pub bids: Vec<DepthLevel>,
    pub asks: Vec<DepthLevel>,
    pub extended: Option<ExtendedSession>,
    pub volume: String,
    pub amount: String,
}

impl QuoteRecord {
    /// Best ask price (level 1), or "" when the feed has no ladder
    pub fn ask1_price(&self) -> &str {
        self.asks.first().map(|l| l.price.as_str()).unwrap_or("")
    }

    /// Best bid price (level 1), or "" when the feed has no ladder
    pub fn bid1_price(&self) -> &str {
        self.bids.first().map(|l| l.price.as_str()).unwrap_or("")
    }
}

/// Outcome of parsing a whole feed response
#[derive(Debug, Default)]
pub struct ParsedBatch {
    pub quotes: Vec<QuoteRecord>,
    pub rejected: usize,
}

/// Canonical feed form of a user-entered code.
///
/// Lowercases and trims, and maps the `us`/`us_` prefixes onto the feed's
/// `gb_` marker. Codes already carrying `gb_` are left alone.
pub fn normalize_code(code: &str) -> String {
    let lower = code.trim().to_lowercase();
    if lower.starts_with("gb_") {
        lower
    } else if let Some(rest) = lower.strip_prefix("us_") {
        format!("gb_{}", rest)
    } else if let Some(rest) = lower.strip_prefix("us") {
        format!("gb_{}", rest)
    } else {
        lower
    }
}

/// Canonical feed form of an exchange listing code such as `600000.SH`,
/// `00700.HK` or `AAPL.US`. Codes without a suffix go through
/// [`normalize_code`] unchanged.
pub fn from_listing_code(code: &str) -> String {
    match code.trim().rsplit_once('.') {
        Some((symbol, suffix)) if !symbol.is_empty() && !suffix.is_empty() => {
            normalize_code(&format!("{}{}", suffix, symbol))
        }
        _ => normalize_code(code),
    }
}
