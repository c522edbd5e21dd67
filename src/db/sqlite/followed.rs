//! Followed stock (watch list) storage

use crate::db::sqlite::models::FollowedStock;
use crate::error::{AppError, Result};
use rusqlite::{params, Connection, OptionalExtension, Row};

const FOLLOW_COLUMNS: &str = "id, code, name, volume, cost_price, price, sort,
     alarm_change_percent, alarm_price, is_del, followed_at";

fn row_to_follow(row: &Row) -> rusqlite::Result<FollowedStock> {
    Ok(FollowedStock {
        id: row.get(0)?,
        code: row.get(1)?,
        name: row.get(2)?,
        volume: row.get(3)?,
        cost_price: row.get(4)?,
        price: row.get(5)?,
        sort: row.get(6)?,
        alarm_change_percent: row.get(7)?,
        alarm_price: row.get(8)?,
        is_deleted: row.get::<_, i32>(9)? == 1,
        followed_at: row.get(10)?,
    })
}

/// Active follows, lowest sort rank first, newest first within a rank
pub fn list_follows(conn: &Connection) -> Result<Vec<FollowedStock>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {} FROM followed_stock WHERE is_del = 0
         ORDER BY sort ASC, followed_at DESC, id DESC",
        FOLLOW_COLUMNS
    ))?;

    let follows = stmt
        .query_map([], row_to_follow)?
        .collect::<std::result::Result<Vec<_>, _>>()?;

    Ok(follows)
}

/// Active follow for a code
pub fn get_follow(conn: &Connection, code: &str) -> Result<Option<FollowedStock>> {
    let follow = conn
        .query_row(
            &format!(
                "SELECT {} FROM followed_stock WHERE code = ?1 AND is_del = 0",
                FOLLOW_COLUMNS
            ),
            [code],
            row_to_follow,
        )
        .optional()?;

    Ok(follow)
}

/// Insert a new follow, or revive a soft-deleted one with fresh settings
pub fn insert_follow(
    conn: &Connection,
    code: &str,
    name: &str,
    price: f64,
    sort: i64,
) -> Result<FollowedStock> {
    let existing: Option<bool> = conn
        .query_row(
            "SELECT is_del FROM followed_stock WHERE code = ?1",
            [code],
            |row| Ok(row.get::<_, i32>(0)? == 1),
        )
        .optional()?;

    match existing {
        Some(false) => {
            return Err(AppError::Duplicate(format!("{} is already followed", code)));
        }
        Some(true) => {
            conn.execute(
                "UPDATE followed_stock
                 SET name = ?2, price = ?3, sort = ?4, volume = 0, cost_price = 0,
                     alarm_change_percent = 0, alarm_price = 0, is_del = 0,
                     followed_at = strftime('%Y-%m-%d %H:%M:%f', 'now'),
                     updated_at = datetime('now')
                 WHERE code = ?1",
                params![code, name, price, sort],
            )?;
        }
        None => {
            conn.execute(
                "INSERT INTO followed_stock (code, name, price, sort, followed_at)
                 VALUES (?1, ?2, ?3, ?4, strftime('%Y-%m-%d %H:%M:%f', 'now'))",
                params![code, name, price, sort],
            )?;
        }
    }

    get_follow(conn, code)?
        .ok_or_else(|| AppError::Internal(format!("Follow for {} vanished after insert", code)))
}

/// Soft delete. Returns false if the code was not actively followed.
pub fn soft_delete_follow(conn: &Connection, code: &str) -> Result<bool> {
    let rows = conn.execute(
        "UPDATE followed_stock SET is_del = 1, updated_at = datetime('now')
         WHERE code = ?1 AND is_del = 0",
        [code],
    )?;
    Ok(rows > 0)
}

pub fn update_price(conn: &Connection, code: &str, price: f64) -> Result<bool> {
    let rows = conn.execute(
        "UPDATE followed_stock SET price = ?2, updated_at = datetime('now')
         WHERE code = ?1 AND is_del = 0",
        params![code, price],
    )?;
    Ok(rows > 0)
}

pub fn update_cost_and_volume(
    conn: &Connection,
    code: &str,
    cost_price: f64,
    volume: i64,
) -> Result<bool> {
    let rows = conn.execute(
        "UPDATE followed_stock SET cost_price = ?2, volume = ?3, updated_at = datetime('now')
         WHERE code = ?1 AND is_del = 0",
        params![code, cost_price, volume],
    )?;
    Ok(rows > 0)
}

pub fn update_alarm(
    conn: &Connection,
    code: &str,
    change_percent: f64,
    alarm_price: f64,
) -> Result<bool> {
    let rows = conn.execute(
        "UPDATE followed_stock
         SET alarm_change_percent = ?2, alarm_price = ?3, updated_at = datetime('now')
         WHERE code = ?1 AND is_del = 0",
        params![code, change_percent, alarm_price],
    )?;
    Ok(rows > 0)
}

pub fn update_sort(conn: &Connection, code: &str, sort: i64) -> Result<bool> {
    let rows = conn.execute(
        "UPDATE followed_stock SET sort = ?2, updated_at = datetime('now')
         WHERE code = ?1 AND is_del = 0",
        params![code, sort],
    )?;
    Ok(rows > 0)
}
