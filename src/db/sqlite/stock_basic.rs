//! Stock directory used for code lookup by name

use crate::db::sqlite::models::StockBasic;
use crate::error::Result;
use rusqlite::{params, Connection, Row};

fn row_to_stock(row: &Row) -> rusqlite::Result<StockBasic> {
    Ok(StockBasic {
        code: row.get(0)?,
        name: row.get(1)?,
        market: row.get(2)?,
        fullname: row.get(3)?,
    })
}

/// Insert or refresh directory entries in one transaction
pub fn upsert_stock_basics(conn: &mut Connection, stocks: &[StockBasic]) -> Result<usize> {
    let tx = conn.transaction()?;

    let mut stmt = tx.prepare(
        "INSERT INTO stock_basic (code, name, market, fullname)
         VALUES (?1, ?2, ?3, ?4)
         ON CONFLICT(code) DO UPDATE SET
            name = excluded.name,
            market = excluded.market,
            fullname = excluded.fullname,
            updated_at = datetime('now')",
    )?;

    for stock in stocks {
        stmt.execute(params![stock.code, stock.name, stock.market, stock.fullname])?;
    }

    drop(stmt);
    tx.commit()?;

    tracing::info!("Stored {} stock directory entries", stocks.len());
    Ok(stocks.len())
}

/// `%`, `_` and the escape char itself match literally
fn like_pattern(keyword: &str) -> String {
    let mut escaped = String::with_capacity(keyword.len() + 2);
    escaped.push('%');
    for c in keyword.chars() {
        if matches!(c, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped.push('%');
    escaped
}

/// Entries whose code, name or full name contains `keyword`.
///
/// Exact code matches come first, then shorter codes.
pub fn search(conn: &Connection, keyword: &str, limit: usize) -> Result<Vec<StockBasic>> {
    let pattern = like_pattern(keyword);
    let mut stmt = conn.prepare(
        "SELECT code, name, market, fullname
         FROM stock_basic
         WHERE code LIKE ?1 ESCAPE '\\'
            OR name LIKE ?1 ESCAPE '\\'
            OR fullname LIKE ?1 ESCAPE '\\'
         ORDER BY (code = ?2) DESC, length(code), code
         LIMIT ?3",
    )?;

    let stocks = stmt
        .query_map(params![pattern, keyword, limit as i64], row_to_stock)?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(stocks)
}

pub fn count(conn: &Connection) -> Result<i64> {
    let count: i64 = conn.query_row("SELECT COUNT(*) FROM stock_basic", [], |row| row.get(0))?;
    Ok(count)
}
