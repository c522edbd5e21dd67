//! Trading session calendar
//!
//! All sessions are expressed in Beijing wall time (Asia/Shanghai) at
//! minute granularity, end minute inclusive. Holidays are not modelled:
//! every Monday to Friday is a trading day.

use crate::quotes::Market;
use chrono::{DateTime, Datelike, TimeZone, Timelike, Utc, Weekday};
use chrono_tz::Asia::Shanghai;
use chrono_tz::Tz;

/// One continuous session, minutes since midnight.
///
/// `start > end` means the session runs past midnight.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Session {
    pub start: u32,
    pub end: u32,
}

const fn hm(hour: u32, minute: u32) -> u32 {
    hour * 60 + minute
}

const CN_SESSIONS: [Session; 2] = [
    Session { start: hm(9, 15), end: hm(11, 30) },
    Session { start: hm(13, 0), end: hm(15, 0) },
];

const HK_SESSIONS: [Session; 1] = [Session { start: hm(9, 30), end: hm(16, 0) }];

/// US regular hours as seen from Beijing
const US_SESSIONS: [Session; 1] = [Session { start: hm(21, 30), end: hm(4, 0) }];

pub fn sessions(market: Market) -> &'static [Session] {
    match market {
        Market::Cn => &CN_SESSIONS,
        Market::Hk => &HK_SESSIONS,
        Market::Us => &US_SESSIONS,
    }
}

fn is_weekday(day: Weekday) -> bool {
    !matches!(day, Weekday::Sat | Weekday::Sun)
}

/// Whether `market` is in session at the given Beijing time
pub fn is_trading_time(market: Market, at: &DateTime<Tz>) -> bool {
    let minute = at.hour() * 60 + at.minute();
    let today = at.weekday();

    sessions(market).iter().any(|s| {
        if s.start <= s.end {
            is_weekday(today) && minute >= s.start && minute <= s.end
        } else if minute >= s.start {
            is_weekday(today)
        } else if minute <= s.end {
            // the early-morning tail belongs to the previous day's session
            is_weekday(today.pred())
        } else {
            false
        }
    })
}

/// Whether `market` is in session at the given instant
pub fn is_market_open(market: Market, now: DateTime<Utc>) -> bool {
    is_trading_time(market, &now.with_timezone(&Shanghai))
}

/// Whether any of `markets` is in session right now
pub fn any_market_open<I>(markets: I, now: DateTime<Utc>) -> bool
where
    I: IntoIterator<Item = Market>,
{
    markets.into_iter().any(|m| is_market_open(m, now))
}

/// Beijing wall time helper for callers and tests
pub fn beijing(year: i32, month: u32, day: u32, hour: u32, minute: u32) -> Option<DateTime<Tz>> {
    Shanghai
        .with_ymd_and_hms(year, month, day, hour, minute, 0)
        .single()
}

#[cfg(test)]
mod tests {
    use super::*;

    // 2024-05-10 is a Friday
    fn at(day: u32, hour: u32, minute: u32) -> DateTime<Tz> {
        beijing(2024, 5, day, hour, minute).unwrap()
    }

    #[test]
    fn test_cn_sessions() {
        assert!(!is_trading_time(Market::Cn, &at(10, 9, 14)));
        assert!(is_trading_time(Market::Cn, &at(10, 9, 15)));
        assert!(is_trading_time(Market::Cn, &at(10, 11, 30)));
        assert!(!is_trading_time(Market::Cn, &at(10, 11, 31)));
        assert!(!is_trading_time(Market::Cn, &at(10, 12, 30)));
        assert!(is_trading_time(Market::Cn, &at(10, 13, 0)));
        assert!(is_trading_time(Market::Cn, &at(10, 15, 0)));
        assert!(!is_trading_time(Market::Cn, &at(10, 15, 1)));
    }

    #[test]
    fn test_weekend_closed() {
        // Saturday and Sunday
        assert!(!is_trading_time(Market::Cn, &at(11, 10, 0)));
        assert!(!is_trading_time(Market::Hk, &at(12, 10, 0)));
        assert!(!is_trading_time(Market::Us, &at(11, 22, 0)));
    }

    #[test]
    fn test_hk_session() {
        assert!(!is_trading_time(Market::Hk, &at(10, 9, 29)));
        assert!(is_trading_time(Market::Hk, &at(10, 12, 0)));
        assert!(is_trading_time(Market::Hk, &at(10, 16, 0)));
        assert!(!is_trading_time(Market::Hk, &at(10, 16, 1)));
    }

    #[test]
    fn test_us_session_wraps_midnight() {
        assert!(!is_trading_time(Market::Us, &at(10, 21, 29)));
        assert!(is_trading_time(Market::Us, &at(10, 21, 30)));
        assert!(is_trading_time(Market::Us, &at(10, 23, 59)));
        // Friday night session continues into Saturday morning
        assert!(is_trading_time(Market::Us, &at(11, 0, 0)));
        assert!(is_trading_time(Market::Us, &at(11, 4, 0)));
        assert!(!is_trading_time(Market::Us, &at(11, 4, 1)));
        // Monday early morning follows a Sunday with no session
        assert!(!is_trading_time(Market::Us, &at(13, 2, 0)));
        // Tuesday early morning follows Monday's session
        assert!(is_trading_time(Market::Us, &at(14, 2, 0)));
        assert!(!is_trading_time(Market::Us, &at(14, 12, 0)));
    }

    #[test]
    fn test_utc_conversion() {
        // 02:00 UTC == 10:00 Beijing on a Friday
        let now = Utc.with_ymd_and_hms(2024, 5, 10, 2, 0, 0).unwrap();
        assert!(is_market_open(Market::Cn, now));
        assert!(!is_market_open(Market::Us, now));
        assert!(any_market_open([Market::Us, Market::Hk], now));
        assert!(!any_market_open(Vec::<Market>::new(), now));
    }
}
