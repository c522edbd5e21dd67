//! Stock alert storage

use crate::db::sqlite::models::{AlertType, StockAlert};
use crate::error::{AppError, Result};
use rusqlite::{params, Connection, OptionalExtension, Row};

const ALERT_COLUMNS: &str =
    "id, stock_code, alert_type, threshold, active, triggered, last_triggered, created_at";

fn row_to_alert(row: &Row) -> rusqlite::Result<StockAlert> {
    let alert_type: String = row.get(2)?;
    let alert_type = alert_type.parse::<AlertType>().map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(2, rusqlite::types::Type::Text, Box::new(e))
    })?;

    Ok(StockAlert {
        id: row.get(0)?,
        stock_code: row.get(1)?,
        alert_type,
        threshold: row.get(3)?,
        active: row.get::<_, i32>(4)? == 1,
        triggered: row.get::<_, i32>(5)? == 1,
        last_triggered: row.get(6)?,
        created_at: row.get(7)?,
    })
}

pub fn create_alert(
    conn: &Connection,
    stock_code: &str,
    alert_type: AlertType,
    threshold: f64,
) -> Result<StockAlert> {
    conn.execute(
        "INSERT INTO stock_alerts (stock_code, alert_type, threshold) VALUES (?1, ?2, ?3)",
        params![stock_code, alert_type.as_str(), threshold],
    )?;

    let id = conn.last_insert_rowid();
    get_alert(conn, id)?
        .ok_or_else(|| AppError::Internal(format!("Alert {} vanished after insert", id)))
}

pub fn get_alert(conn: &Connection, id: i64) -> Result<Option<StockAlert>> {
    let alert = conn
        .query_row(
            &format!("SELECT {} FROM stock_alerts WHERE id = ?1", ALERT_COLUMNS),
            [id],
            row_to_alert,
        )
        .optional()?;
    Ok(alert)
}

/// Alerts for one code, or every alert when `code` is `None`
pub fn list_alerts(conn: &Connection, code: Option<&str>) -> Result<Vec<StockAlert>> {
    let alerts = match code {
        Some(code) => {
            let mut stmt = conn.prepare(&format!(
                "SELECT {} FROM stock_alerts WHERE stock_code = ?1 ORDER BY id",
                ALERT_COLUMNS
            ))?;
            let rows = stmt.query_map([code], row_to_alert)?;
            rows.collect::<std::result::Result<Vec<_>, _>>()?
        }
        None => {
            let mut stmt = conn.prepare(&format!(
                "SELECT {} FROM stock_alerts ORDER BY id",
                ALERT_COLUMNS
            ))?;
            let rows = stmt.query_map([], row_to_alert)?;
            rows.collect::<std::result::Result<Vec<_>, _>>()?
        }
    };
    Ok(alerts)
}

pub fn list_active_alerts(conn: &Connection) -> Result<Vec<StockAlert>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {} FROM stock_alerts WHERE active = 1 ORDER BY id",
        ALERT_COLUMNS
    ))?;
    let alerts = stmt
        .query_map([], row_to_alert)?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(alerts)
}

pub fn delete_alert(conn: &Connection, id: i64) -> Result<bool> {
    let rows = conn.execute("DELETE FROM stock_alerts WHERE id = ?1", [id])?;
    Ok(rows > 0)
}

pub fn set_alert_active(conn: &Connection, id: i64, active: bool) -> Result<bool> {
    let rows = conn.execute(
        "UPDATE stock_alerts SET active = ?2 WHERE id = ?1",
        params![id, active as i32],
    )?;
    Ok(rows > 0)
}

/// Switch off every active alert on `code`, returning how many changed
pub fn deactivate_alerts_for_code(conn: &Connection, code: &str) -> Result<usize> {
    let rows = conn.execute(
        "UPDATE stock_alerts SET active = 0 WHERE stock_code = ?1 AND active = 1",
        [code],
    )?;
    Ok(rows)
}

/// Record a trigger state change. `last_triggered` is only touched when
/// the alert fires.
pub fn set_alert_triggered(
    conn: &Connection,
    id: i64,
    triggered: bool,
    at: Option<&str>,
) -> Result<bool> {
    let rows = match at {
        Some(ts) => conn.execute(
            "UPDATE stock_alerts SET triggered = ?2, last_triggered = ?3 WHERE id = ?1",
            params![id, triggered as i32, ts],
        )?,
        None => conn.execute(
            "UPDATE stock_alerts SET triggered = ?2 WHERE id = ?1",
            params![id, triggered as i32],
        )?,
    };
    Ok(rows > 0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::sqlite::migrations::run_migrations;

    fn create_test_db() -> Connection {
        let conn = Connection::open_in_memory().unwrap();
        run_migrations(&conn).unwrap();
        conn
    }

    #[test]
    fn test_create_and_list_alerts() {
        let conn = create_test_db();
        let a = create_alert(&conn, "sh600000", AlertType::PriceAbove, 11.0).unwrap();
        create_alert(&conn, "sz000001", AlertType::ChangeRateBelow, -3.0).unwrap();

        assert!(a.active);
        assert!(!a.triggered);
        assert!(a.last_triggered.is_none());
        assert_eq!(a.alert_type, AlertType::PriceAbove);

        assert_eq!(list_alerts(&conn, None).unwrap().len(), 2);
        let for_code = list_alerts(&conn, Some("sz000001")).unwrap();
        assert_eq!(for_code.len(), 1);
        assert_eq!(for_code[0].threshold, -3.0);
    }

    #[test]
    fn test_disable_hides_from_active() {
        let conn = create_test_db();
        let a = create_alert(&conn, "sh600000", AlertType::PriceBelow, 9.0).unwrap();

        assert!(set_alert_active(&conn, a.id, false).unwrap());
        assert!(list_active_alerts(&conn).unwrap().is_empty());

        assert!(set_alert_active(&conn, a.id, true).unwrap());
        assert_eq!(list_active_alerts(&conn).unwrap().len(), 1);
    }

    #[test]
    fn test_trigger_bookkeeping() {
        let conn = create_test_db();
        let a = create_alert(&conn, "sh600000", AlertType::PriceAbove, 10.0).unwrap();

        set_alert_triggered(&conn, a.id, true, Some("2024-05-10 10:00:00")).unwrap();
        let fired = get_alert(&conn, a.id).unwrap().unwrap();
        assert!(fired.triggered);
        assert_eq!(fired.last_triggered.as_deref(), Some("2024-05-10 10:00:00"));

        set_alert_triggered(&conn, a.id, false, None).unwrap();
        let reset = get_alert(&conn, a.id).unwrap().unwrap();
        assert!(!reset.triggered);
        assert_eq!(reset.last_triggered.as_deref(), Some("2024-05-10 10:00:00"));
    }

    #[test]
    fn test_delete_alert() {
        let conn = create_test_db();
        let a = create_alert(&conn, "sh600000", AlertType::PriceAbove, 10.0).unwrap();
        assert!(delete_alert(&conn, a.id).unwrap());
        assert!(!delete_alert(&conn, a.id).unwrap());
        assert!(get_alert(&conn, a.id).unwrap().is_none());
    }

    #[test]
    fn test_deactivate_alerts_for_code() {
        let conn = create_test_db();
        create_alert(&conn, "sh600000", AlertType::PriceAbove, 11.0).unwrap();
        create_alert(&conn, "sh600000", AlertType::PriceBelow, 9.0).unwrap();
        let other = create_alert(&conn, "sz000001", AlertType::PriceAbove, 12.0).unwrap();

        assert_eq!(deactivate_alerts_for_code(&conn, "sh600000").unwrap(), 2);
        assert_eq!(deactivate_alerts_for_code(&conn, "sh600000").unwrap(), 0);

        let active = list_active_alerts(&conn).unwrap();
        assert_eq!(active.len(), 1);
        assert_eq!(active[0].id, other.id);
        assert_eq!(list_alerts(&conn, Some("sh600000")).unwrap().len(), 2);
    }
}
