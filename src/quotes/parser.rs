//! Feed line parser
//!
//! The upstream feed answers with one JavaScript assignment per stock:
//!
//! ```text
//! var hq_str_sh600000="浦发银行,10.000,9.980,10.050,...,2024-05-10,15:00:00,00";
//! ```
//!
//! Each market packs a different positional CSV layout into the quoted
//! payload. Fields are copied straight from their offset into the typed
//! record.

use crate::error::QuoteParseError;
use crate::quotes::types::{DepthLevel, ExtendedSession, Market, ParsedBatch, QuoteRecord};
use tracing::warn;

const CODE_MARKER: &str = "hq_str_";

const CN_MIN_FIELDS: usize = 32;
const HK_MIN_FIELDS: usize = 19;
const US_MIN_FIELDS: usize = 35;

/// Number of ladder levels the CN layout carries
const CN_DEPTH_LEVELS: usize = 5;

fn trim_token(s: &str) -> &str {
    s.trim_matches(|c: char| c.is_whitespace() || c == '"' || c == ';')
}

/// Parse one raw feed line into a quote
pub fn parse_line(raw: &str) -> Result<QuoteRecord, QuoteParseError> {
    let line = raw.trim();
    let (target, payload) = line
        .split_once('=')
        .ok_or_else(|| QuoteParseError::InvalidFormat(truncate(line)))?;

    let target = trim_token(target);
    let payload = trim_token(payload);

    let code = match target.find(CODE_MARKER) {
        Some(idx) => target[idx + CODE_MARKER.len()..].to_string(),
        None => return Err(QuoteParseError::InvalidFormat(truncate(target))),
    };

    if payload.is_empty() {
        return Err(QuoteParseError::EmptyPayload(code));
    }

    let fields: Vec<&str> = payload.split(',').map(trim_token).collect();

    match Market::from_code(&code) {
        Some(Market::Cn) => parse_cn(code, &fields),
        Some(Market::Hk) => parse_hk(code, &fields),
        Some(Market::Us) => parse_us(code, &fields),
        None => Err(QuoteParseError::UnknownMarket(code)),
    }
}

/// Parse a whole response body, skipping lines that do not parse
pub fn parse_batch(text: &str) -> ParsedBatch {
    let mut batch = ParsedBatch::default();

    for line in text.lines().filter(|l| !l.trim().is_empty()) {
        match parse_line(line) {
            Ok(quote) => batch.quotes.push(quote),
            Err(e) => {
                warn!("Skipping quote line: {}", e);
                batch.rejected += 1;
            }
        }
    }

    batch
}

fn ensure_len(code: &str, fields: &[&str], expected: usize) -> Result<(), QuoteParseError> {
    if fields.len() < expected {
        return Err(QuoteParseError::InsufficientFields {
            code: code.to_string(),
            expected,
            actual: fields.len(),
        });
    }
    Ok(())
}

fn truncate(s: &str) -> String {
    s.chars().take(48).collect()
}

// ============================================================================
// Per-market layouts
// ============================================================================

fn parse_cn(code: String, f: &[&str]) -> Result<QuoteRecord, QuoteParseError> {
    ensure_len(&code, f, CN_MIN_FIELDS)?;

    let ladder = |start: usize| -> Vec<DepthLevel> {
        (0..CN_DEPTH_LEVELS)
            .map(|n| DepthLevel {
                volume: f[start + 2 * n].to_string(),
                price: f[start + 2 * n + 1].to_string(),
            })
            .collect()
    };

    Ok(QuoteRecord {
        market: Some(Market::Cn),
        name: f[0].to_string(),
        open: f[1].to_string(),
        pre_close: f[2].to_string(),
        price: f[3].to_string(),
        high: f[4].to_string(),
        low: f[5].to_string(),
        bid: f[6].to_string(),
        ask: f[7].to_string(),
        volume: f[8].to_string(),
        amount: f[9].to_string(),
        bids: ladder(10),
        asks: ladder(20),
        date: f[30].to_string(),
        time: f[31].to_string(),
        extended: None,
        code,
    })
}

fn parse_hk(code: String, f: &[&str]) -> Result<QuoteRecord, QuoteParseError> {
    ensure_len(&code, f, HK_MIN_FIELDS)?;

    let mut time = f[18].to_string();
    // the HK feed reports HH:MM during the session
    if time.len() == 5 && time.as_bytes()[2] == b':' {
        time.push_str(":00");
    }

    Ok(QuoteRecord {
        market: Some(Market::Hk),
        name: f[1].to_string(),
        open: f[2].to_string(),
        pre_close: f[3].to_string(),
        high: f[4].to_string(),
        low: f[5].to_string(),
        price: f[6].to_string(),
        amount: f[11].to_string(),
        volume: f[12].to_string(),
        date: f[17].replace('/', "-"),
        time,
        code,
        ..Default::default()
    })
}

fn parse_us(code: String, f: &[&str]) -> Result<QuoteRecord, QuoteParseError> {
    ensure_len(&code, f, US_MIN_FIELDS)?;

    let (date, time) = match f[3].split_once(' ') {
        Some((d, t)) => (d.to_string(), t.trim().to_string()),
        None => (f[3].to_string(), String::new()),
    };

    let pre_close = if f.len() >= 36 { f[26] } else { f[f.len() - 1] };

    Ok(QuoteRecord {
        market: Some(Market::Us),
        name: f[0].to_string(),
        price: f[1].to_string(),
        open: f[5].to_string(),
        high: f[6].to_string(),
        low: f[7].to_string(),
        volume: f[10].to_string(),
        pre_close: pre_close.to_string(),
        extended: Some(ExtendedSession {
            price: f[21].to_string(),
            change_percent: f[22].to_string(),
        }),
        date,
        time,
        code,
        ..Default::default()
    })
}


#[cfg(test)]
mod tests {
    use super::fixtures::*;
    use super::*;

    #[test]
    fn test_parse_cn_line() {
        let q = parse_line(&cn_line("sh600000", "10.500", "10.000")).unwrap();
        assert_eq!(q.code, "sh600000");
        assert_eq!(q.market, Some(Market::Cn));
        assert_eq!(q.name, "浦发银行");
        assert_eq!(q.price, "10.500");
        assert_eq!(q.pre_close, "10.000");
        assert_eq!(q.bids.len(), 5);
        assert_eq!(q.bids[0].volume, "100");
        assert_eq!(q.bids[0].price, "10.49");
        assert_eq!(q.asks[4].volume, "1000");
        assert_eq!(q.asks[4].price, "10.54");
        assert_eq!(q.date, "2024-05-10");
        assert_eq!(q.time, "15:00:00");
    }

    #[test]
    fn test_parse_hk_line() {
        let q = parse_line(&hk_line()).unwrap();
        assert_eq!(q.market, Some(Market::Hk));
        assert_eq!(q.name, "腾讯控股");
        assert_eq!(q.price, "372.600");
        assert_eq!(q.pre_close, "368.200");
        assert_eq!(q.amount, "6523871234");
        assert_eq!(q.volume, "17534000");
        assert_eq!(q.date, "2024-05-10");
        assert_eq!(q.time, "16:08:00");
        assert!(q.bids.is_empty());
    }

    #[test]
    fn test_parse_us_line() {
        let q = parse_line(&us_line(36)).unwrap();
        assert_eq!(q.market, Some(Market::Us));
        assert_eq!(q.code, "gb_goog");
        assert_eq!(q.price, "170.2100");
        assert_eq!(q.date, "2025-02-28");
        assert_eq!(q.time, "09:38:50");
        assert_eq!(q.pre_close, "174.7000");
        let ext = q.extended.unwrap();
        assert_eq!(ext.price, "170.2000");
        assert_eq!(ext.change_percent, "-0.01");
    }

    #[test]
    fn test_us_prior_close_falls_back_to_last_field() {
        let q = parse_line(&us_line(35)).unwrap();
        assert_eq!(q.pre_close, "34.00");
    }

    #[test]
    fn test_one_field_short_is_rejected() {
        let cn = cn_line("sz000001", "10.5", "10.0");
        // drop the trailing filler and the time field
        let short = cn.replace(",15:00:00,00", "");
        assert!(matches!(
            parse_line(&short),
            Err(QuoteParseError::InsufficientFields { expected: 32, actual: 31, .. })
        ));

        let hk = hk_line().replace(",16:08", "");
        assert!(matches!(
            parse_line(&hk),
            Err(QuoteParseError::InsufficientFields { expected: 19, .. })
        ));

        assert!(matches!(
            parse_line(&us_line(34)),
            Err(QuoteParseError::InsufficientFields { expected: 35, actual: 34, .. })
        ));
    }

    #[test]
    fn test_bad_lines() {
        assert!(matches!(parse_line("garbage"), Err(QuoteParseError::InvalidFormat(_))));
        assert!(matches!(
            parse_line("var hq_str_sh600000=\"\";"),
            Err(QuoteParseError::EmptyPayload(_))
        ));
        assert!(matches!(
            parse_line("var hq_str_xx1=\"a,b\";"),
            Err(QuoteParseError::UnknownMarket(_))
        ));
    }

    #[test]
    fn test_batch_skips_malformed_line() {
        let text = format!(
            "{}\nvar hq_str_sz000001=\"平安银行,1,2\";\n{}\n",
            cn_line("sh600000", "10.5", "10.0"),
            hk_line()
        );
        let batch = parse_batch(&text);
        assert_eq!(batch.quotes.len(), 2);
        assert_eq!(batch.rejected, 1);
        assert_eq!(batch.quotes[0].code, "sh600000");
        assert_eq!(batch.quotes[1].code, "hk00700");
    }
}
