//! SQLite database migrations

use crate::error::Result;
use rusqlite::Connection;

/// Run all database migrations
pub fn run_migrations(conn: &Connection) -> Result<()> {
    conn.execute(
        "CREATE TABLE IF NOT EXISTS migrations (
            id INTEGER PRIMARY KEY,
            name TEXT NOT NULL UNIQUE,
            applied_at TEXT NOT NULL DEFAULT (datetime('now'))
        )",
        [],
    )?;

    run_migration(conn, "001_followed_stock", CREATE_FOLLOWED_STOCK_TABLE)?;
    run_migration(conn, "002_stock_alerts", CREATE_STOCK_ALERTS_TABLE)?;
    run_migration(conn, "003_quote_history", CREATE_QUOTE_HISTORY_TABLE)?;
    run_migration(conn, "004_settings", CREATE_SETTINGS_TABLE)?;
    run_migration(conn, "005_local_api_settings", ADD_LOCAL_API_SETTINGS)?;
    run_migration(conn, "006_stock_basic", CREATE_STOCK_BASIC_TABLE)?;

    tracing::info!("Database migrations completed");
    Ok(())
}

fn run_migration(conn: &Connection, name: &str, sql: &str) -> Result<()> {
    let exists: bool = conn.query_row(
        "SELECT EXISTS(SELECT 1 FROM migrations WHERE name = ?)",
        [name],
        |row| row.get(0),
    )?;

    if !exists {
        tracing::info!("Running migration: {}", name);
        conn.execute_batch(sql)?;
        conn.execute("INSERT INTO migrations (name) VALUES (?)", [name])?;
    }

    Ok(())
}

const CREATE_FOLLOWED_STOCK_TABLE: &str = r#"
CREATE TABLE followed_stock (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    code TEXT NOT NULL UNIQUE,
    name TEXT NOT NULL DEFAULT '',
    volume INTEGER NOT NULL DEFAULT 0,
    cost_price REAL NOT NULL DEFAULT 0,
    price REAL NOT NULL DEFAULT 0,
    sort INTEGER NOT NULL DEFAULT 999,
    alarm_change_percent REAL NOT NULL DEFAULT 0,
    alarm_price REAL NOT NULL DEFAULT 0,
    is_del INTEGER NOT NULL DEFAULT 0,
    followed_at TEXT NOT NULL DEFAULT (datetime('now')),
    updated_at TEXT NOT NULL DEFAULT (datetime('now'))
);
CREATE INDEX idx_followed_stock_order ON followed_stock(is_del, sort, followed_at);
"#;

const CREATE_STOCK_ALERTS_TABLE: &str = r#"
CREATE TABLE stock_alerts (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    stock_code TEXT NOT NULL,
    alert_type TEXT NOT NULL,
    threshold REAL NOT NULL,
    active INTEGER NOT NULL DEFAULT 1,
    triggered INTEGER NOT NULL DEFAULT 0,
    last_triggered TEXT,
    created_at TEXT NOT NULL DEFAULT (datetime('now'))
);
CREATE INDEX idx_stock_alerts_code ON stock_alerts(stock_code);
"#;

/// Latest snapshot per code; ladders are stored as JSON
const CREATE_QUOTE_HISTORY_TABLE: &str = r#"
CREATE TABLE quote_history (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    code TEXT NOT NULL UNIQUE,
    market TEXT,
    name TEXT NOT NULL DEFAULT '',
    quote_date TEXT NOT NULL DEFAULT '',
    quote_time TEXT NOT NULL DEFAULT '',
    price TEXT NOT NULL DEFAULT '',
    open TEXT NOT NULL DEFAULT '',
    pre_close TEXT NOT NULL DEFAULT '',
    high TEXT NOT NULL DEFAULT '',
    low TEXT NOT NULL DEFAULT '',
    bid TEXT NOT NULL DEFAULT '',
    ask TEXT NOT NULL DEFAULT '',
    volume TEXT NOT NULL DEFAULT '',
    amount TEXT NOT NULL DEFAULT '',
    depth_json TEXT NOT NULL DEFAULT '{}',
    extended_json TEXT,
    updated_at TEXT NOT NULL DEFAULT (datetime('now'))
);
"#;

const CREATE_SETTINGS_TABLE: &str = r#"
CREATE TABLE settings (
    id INTEGER PRIMARY KEY CHECK (id = 1),
    refresh_interval INTEGER NOT NULL DEFAULT 1,
    alert_interval INTEGER NOT NULL DEFAULT 60,
    request_timeout_secs INTEGER NOT NULL DEFAULT 10,
    quote_feed_url TEXT,
    browser_path TEXT,
    enable_notifications INTEGER NOT NULL DEFAULT 1,
    updated_at TEXT NOT NULL DEFAULT (datetime('now'))
);
INSERT OR IGNORE INTO settings (id) VALUES (1);
"#;

/// Loopback API used by the webview shell; off until the user enables it
const ADD_LOCAL_API_SETTINGS: &str = r#"
ALTER TABLE settings ADD COLUMN api_enabled INTEGER NOT NULL DEFAULT 0;
ALTER TABLE settings ADD COLUMN api_host TEXT NOT NULL DEFAULT '127.0.0.1';
ALTER TABLE settings ADD COLUMN api_port INTEGER NOT NULL DEFAULT 8899;
"#;

/// Searchable directory of listed codes, filled by bulk import
const CREATE_STOCK_BASIC_TABLE: &str = r#"
CREATE TABLE stock_basic (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    code TEXT NOT NULL UNIQUE,
    name TEXT NOT NULL DEFAULT '',
    market TEXT NOT NULL DEFAULT '',
    fullname TEXT NOT NULL DEFAULT '',
    updated_at TEXT NOT NULL DEFAULT (datetime('now'))
);
CREATE INDEX idx_stock_basic_name ON stock_basic(name);
"#;
