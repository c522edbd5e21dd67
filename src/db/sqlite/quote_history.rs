//! Latest quote snapshot per code

use crate::db::sqlite::models::QuoteHistoryEntry;
use crate::error::Result;
use crate::quotes::{DepthLevel, ExtendedSession, Market, QuoteRecord};
use rusqlite::{params, Connection, OptionalExtension};
use serde::{Deserialize, Serialize};

#[derive(Serialize, Deserialize, Default)]
struct StoredDepth {
    bids: Vec<DepthLevel>,
    asks: Vec<DepthLevel>,
}

/// Insert or replace the stored snapshot for `quote.code`
pub fn upsert_quote(conn: &Connection, quote: &QuoteRecord) -> Result<()> {
    let depth_json = serde_json::to_string(&StoredDepth {
        bids: quote.bids.clone(),
        asks: quote.asks.clone(),
    })?;
    let extended_json = quote
        .extended
        .as_ref()
        .map(serde_json::to_string)
        .transpose()?;

    conn.execute(
        r#"
        INSERT INTO quote_history (
            code, market, name, quote_date, quote_time, price, open, pre_close,
            high, low, bid, ask, volume, amount, depth_json, extended_json, updated_at
        ) VALUES (
            ?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8,
            ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16, datetime('now')
        )
        ON CONFLICT(code) DO UPDATE SET
            market = excluded.market,
            name = excluded.name,
            quote_date = excluded.quote_date,
            quote_time = excluded.quote_time,
            price = excluded.price,
            open = excluded.open,
            pre_close = excluded.pre_close,
            high = excluded.high,
            low = excluded.low,
            bid = excluded.bid,
            ask = excluded.ask,
            volume = excluded.volume,
            amount = excluded.amount,
            depth_json = excluded.depth_json,
            extended_json = excluded.extended_json,
            updated_at = excluded.updated_at
        "#,
        params![
            quote.code,
            quote.market.map(|m| m.as_str()),
            quote.name,
            quote.date,
            quote.time,
            quote.price,
            quote.open,
            quote.pre_close,
            quote.high,
            quote.low,
            quote.bid,
            quote.ask,
            quote.volume,
            quote.amount,
            depth_json,
            extended_json,
        ],
    )?;

    Ok(())
}

pub fn get_latest_quote(conn: &Connection, code: &str) -> Result<Option<QuoteHistoryEntry>> {
    let row = conn
        .query_row(
            r#"
            SELECT code, name, quote_date, quote_time, price, open, pre_close,
                   high, low, bid, ask, volume, amount, depth_json, extended_json, updated_at
            FROM quote_history WHERE code = ?1
            "#,
            [code],
            |row| {
                Ok((
                    QuoteRecord {
                        code: row.get(0)?,
                        name: row.get(1)?,
                        date: row.get(2)?,
                        time: row.get(3)?,
                        price: row.get(4)?,
                        open: row.get(5)?,
                        pre_close: row.get(6)?,
                        high: row.get(7)?,
                        low: row.get(8)?,
                        bid: row.get(9)?,
                        ask: row.get(10)?,
                        volume: row.get(11)?,
                        amount: row.get(12)?,
                        ..Default::default()
                    },
                    row.get::<_, String>(13)?,
                    row.get::<_, Option<String>>(14)?,
                    row.get::<_, String>(15)?,
                ))
            },
        )
        .optional()?;

    let Some((mut quote, depth_json, extended_json, updated_at)) = row else {
        return Ok(None);
    };

    let depth: StoredDepth = serde_json::from_str(&depth_json)?;
    quote.bids = depth.bids;
    quote.asks = depth.asks;
    quote.extended = extended_json
        .as_deref()
        .map(serde_json::from_str::<ExtendedSession>)
        .transpose()?;
    quote.market = Market::from_code(&quote.code);

    Ok(Some(QuoteHistoryEntry {
        code: quote.code.clone(),
        quote,
        updated_at,
    }))
}
