//! SQLite database module

pub mod models;
mod migrations;
mod followed;
mod alerts;
mod quote_history;
mod settings;
mod stock_basic;

use crate::error::Result;
use crate::quotes::QuoteRecord;
pub use models::{
    AlertType, ApiConfig, FollowedStock, QuoteHistoryEntry, Settings, SettingsUpdate, StockAlert,
    StockBasic,
};
use parking_lot::Mutex;
use rusqlite::Connection;
use std::path::Path;

/// SQLite database wrapper
pub struct SqliteDb {
    conn: Mutex<Connection>,
}

impl SqliteDb {
    /// Create new SQLite database connection
    pub fn new(path: &Path) -> Result<Self> {
        let conn = Connection::open(path)?;

        // Enable WAL mode for better concurrent access
        conn.execute_batch("PRAGMA journal_mode=WAL; PRAGMA synchronous=NORMAL;")?;

        Self::with_connection(conn)
    }

    /// Fresh database that lives only as long as this value
    pub fn new_in_memory() -> Result<Self> {
        Self::with_connection(Connection::open_in_memory()?)
    }

    fn with_connection(conn: Connection) -> Result<Self> {
        let db = Self {
            conn: Mutex::new(conn),
        };
        db.run_migrations()?;
        Ok(db)
    }

    /// Run database migrations
    fn run_migrations(&self) -> Result<()> {
        let conn = self.conn.lock();
        migrations::run_migrations(&conn)
    }

    // ========== Follow List Methods ==========

    /// Active follows in display order
    pub fn list_follows(&self) -> Result<Vec<FollowedStock>> {
        let conn = self.conn.lock();
        followed::list_follows(&conn)
    }

    pub fn get_follow(&self, code: &str) -> Result<Option<FollowedStock>> {
        let conn = self.conn.lock();
        followed::get_follow(&conn, code)
    }

    /// Add a code to the watch list (fails with `Duplicate` if already there)
    pub fn insert_follow(
        &self,
        code: &str,
        name: &str,
        price: f64,
        sort: i64,
    ) -> Result<FollowedStock> {
        let conn = self.conn.lock();
        followed::insert_follow(&conn, code, name, price, sort)
    }

    pub fn delete_follow(&self, code: &str) -> Result<bool> {
        let conn = self.conn.lock();
        followed::soft_delete_follow(&conn, code)
    }

    pub fn update_follow_price(&self, code: &str, price: f64) -> Result<bool> {
        let conn = self.conn.lock();
        followed::update_price(&conn, code, price)
    }

    pub fn update_follow_cost(&self, code: &str, cost_price: f64, volume: i64) -> Result<bool> {
        let conn = self.conn.lock();
        followed::update_cost_and_volume(&conn, code, cost_price, volume)
    }

    pub fn update_follow_alarm(&self, code: &str, change_percent: f64, price: f64) -> Result<bool> {
        let conn = self.conn.lock();
        followed::update_alarm(&conn, code, change_percent, price)
    }

    pub fn update_follow_sort(&self, code: &str, sort: i64) -> Result<bool> {
        let conn = self.conn.lock();
        followed::update_sort(&conn, code, sort)
    }

    // ========== Alert Methods ==========

    pub fn create_alert(
        &self,
        code: &str,
        alert_type: AlertType,
        threshold: f64,
    ) -> Result<StockAlert> {
        let conn = self.conn.lock();
        alerts::create_alert(&conn, code, alert_type, threshold)
    }

    pub fn get_alert(&self, id: i64) -> Result<Option<StockAlert>> {
        let conn = self.conn.lock();
        alerts::get_alert(&conn, id)
    }

    pub fn list_alerts(&self, code: Option<&str>) -> Result<Vec<StockAlert>> {
        let conn = self.conn.lock();
        alerts::list_alerts(&conn, code)
    }

    pub fn list_active_alerts(&self) -> Result<Vec<StockAlert>> {
        let conn = self.conn.lock();
        alerts::list_active_alerts(&conn)
    }

    pub fn delete_alert(&self, id: i64) -> Result<bool> {
        let conn = self.conn.lock();
        alerts::delete_alert(&conn, id)
    }

    pub fn set_alert_active(&self, id: i64, active: bool) -> Result<bool> {
        let conn = self.conn.lock();
        alerts::set_alert_active(&conn, id, active)
    }

    pub fn set_alert_triggered(
        &self,
        id: i64,
        triggered: bool,
        at: Option<&str>,
    ) -> Result<bool> {
        let conn = self.conn.lock();
        alerts::set_alert_triggered(&conn, id, triggered, at)
    }

    pub fn deactivate_alerts_for_code(&self, code: &str) -> Result<usize> {
        let conn = self.conn.lock();
        alerts::deactivate_alerts_for_code(&conn, code)
    }

    // ========== Quote History Methods ==========

    pub fn upsert_quote_history(&self, quote: &QuoteRecord) -> Result<()> {
        let conn = self.conn.lock();
        quote_history::upsert_quote(&conn, quote)
    }

    pub fn get_latest_quote(&self, code: &str) -> Result<Option<QuoteHistoryEntry>> {
        let conn = self.conn.lock();
        quote_history::get_latest_quote(&conn, code)
    }

    // ========== Stock Directory Methods ==========

    /// Insert or refresh directory entries, returning how many were written
    pub fn import_stock_basics(&self, stocks: &[StockBasic]) -> Result<usize> {
        let mut conn = self.conn.lock();
        stock_basic::upsert_stock_basics(&mut conn, stocks)
    }

    pub fn search_stock_basics(&self, keyword: &str, limit: usize) -> Result<Vec<StockBasic>> {
        let conn = self.conn.lock();
        stock_basic::search(&conn, keyword, limit)
    }

    pub fn count_stock_basics(&self) -> Result<i64> {
        let conn = self.conn.lock();
        stock_basic::count(&conn)
    }

    // ========== Settings Methods ==========

    /// Get application settings
    pub fn get_settings(&self) -> Result<Settings> {
        let conn = self.conn.lock();
        settings::get_settings(&conn)
    }

    /// Apply a partial settings update and return the result
    pub fn update_settings(&self, update: SettingsUpdate) -> Result<Settings> {
        let conn = self.conn.lock();
        settings::update_settings(&conn, update)
    }

    /// Get local API server configuration
    pub fn get_api_config(&self) -> Result<ApiConfig> {
        let settings = self.get_settings()?;
        Ok(ApiConfig::from(&settings))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_on_disk_database_survives_reopen() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("quotewatch.db");

        {
            let db = SqliteDb::new(&path).unwrap();
            db.insert_follow("sh600000", "浦发银行", 10.0, 999).unwrap();
            db.update_follow_cost("sh600000", 9.5, 200).unwrap();
        }

        // migrations are idempotent on reopen
        let db = SqliteDb::new(&path).unwrap();
        let follow = db.get_follow("sh600000").unwrap().unwrap();
        assert_eq!(follow.cost_price, 9.5);
        assert_eq!(follow.volume, 200);
    }
}
