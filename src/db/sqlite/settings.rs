//! Settings management

use crate::db::sqlite::models::{Settings, SettingsUpdate};
use crate::error::{AppError, Result};
use rusqlite::Connection;

/// Get settings
pub fn get_settings(conn: &Connection) -> Result<Settings> {
    let settings = conn.query_row(
        "SELECT id, refresh_interval, alert_interval, request_timeout_secs, quote_feed_url,
                browser_path, enable_notifications, api_enabled, api_host, api_port
         FROM settings WHERE id = 1",
        [],
        |row| {
            Ok(Settings {
                id: row.get(0)?,
                refresh_interval: row.get(1)?,
                alert_interval: row.get(2)?,
                request_timeout_secs: row.get(3)?,
                quote_feed_url: row.get(4)?,
                browser_path: row.get(5)?,
                enable_notifications: row.get::<_, i32>(6)? == 1,
                api_enabled: row.get::<_, i32>(7)? == 1,
                api_host: row.get(8)?,
                api_port: row.get(9)?,
            })
        },
    )?;

    Ok(settings)
}

/// Update settings
pub fn update_settings(conn: &Connection, update: SettingsUpdate) -> Result<Settings> {
    let mut updates = Vec::new();
    let mut params: Vec<Box<dyn rusqlite::ToSql>> = Vec::new();

    if let Some(v) = update.refresh_interval {
        updates.push("refresh_interval = ?");
        params.push(Box::new(v));
    }
    if let Some(v) = update.alert_interval {
        updates.push("alert_interval = ?");
        params.push(Box::new(v));
    }
    if let Some(v) = update.request_timeout_secs {
        if v <= 0 {
            return Err(AppError::Validation(
                "request_timeout_secs must be positive".to_string(),
            ));
        }
        updates.push("request_timeout_secs = ?");
        params.push(Box::new(v));
    }
    if let Some(v) = update.quote_feed_url {
        // empty string clears the override
        if v.trim().is_empty() {
            updates.push("quote_feed_url = NULL");
        } else {
            url::Url::parse(&v)
                .map_err(|e| AppError::Validation(format!("Invalid quote feed URL: {}", e)))?;
            updates.push("quote_feed_url = ?");
            params.push(Box::new(v));
        }
    }
    if let Some(v) = update.browser_path {
        if v.trim().is_empty() {
            updates.push("browser_path = NULL");
        } else {
            updates.push("browser_path = ?");
            params.push(Box::new(v));
        }
    }
    if let Some(v) = update.enable_notifications {
        updates.push("enable_notifications = ?");
        params.push(Box::new(v as i32));
    }
    if let Some(v) = update.api_enabled {
        updates.push("api_enabled = ?");
        params.push(Box::new(v as i32));
    }
    if let Some(v) = update.api_host {
        updates.push("api_host = ?");
        params.push(Box::new(v));
    }
    if let Some(v) = update.api_port {
        updates.push("api_port = ?");
        params.push(Box::new(v));
    }

    if !updates.is_empty() {
        updates.push("updated_at = datetime('now')");

        let sql = format!("UPDATE settings SET {} WHERE id = 1", updates.join(", "));

        let params_refs: Vec<&dyn rusqlite::ToSql> = params.iter().map(|p| p.as_ref()).collect();
        conn.execute(&sql, params_refs.as_slice())?;
    }

    get_settings(conn)
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
    fn test_defaults() {
        let conn = create_test_db();
        let s = get_settings(&conn).unwrap();
        assert_eq!(s.refresh_interval, 1);
        assert_eq!(s.alert_interval, 60);
        assert_eq!(s.request_timeout_secs, 10);
        assert!(s.quote_feed_url.is_none());
        assert!(s.enable_notifications);
        assert!(!s.api_enabled);
        assert_eq!(s.api_host, "127.0.0.1");
        assert_eq!(s.api_port, 8899);
    }

    #[test]
    fn test_partial_update() {
        let conn = create_test_db();
        let s = update_settings(
            &conn,
            SettingsUpdate {
                refresh_interval: Some(5),
                quote_feed_url: Some("http://127.0.0.1:9000".to_string()),
                ..Default::default()
            },
        )
        .unwrap();
        assert_eq!(s.refresh_interval, 5);
        assert_eq!(s.alert_interval, 60);
        assert_eq!(s.quote_feed_url.as_deref(), Some("http://127.0.0.1:9000"));

        let cleared = update_settings(
            &conn,
            SettingsUpdate {
                quote_feed_url: Some(String::new()),
                ..Default::default()
            },
        )
        .unwrap();
        assert!(cleared.quote_feed_url.is_none());
    }

    #[test]
    fn test_invalid_feed_url_rejected() {
        let conn = create_test_db();
        let result = update_settings(
            &conn,
            SettingsUpdate {
                quote_feed_url: Some("not a url".to_string()),
                ..Default::default()
            },
        );
        assert!(matches!(result, Err(AppError::Validation(_))));
    }
}
