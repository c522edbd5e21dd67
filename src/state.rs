//! Application state management

use crate::db::sqlite::{Settings, SqliteDb};
use crate::db::WriteQueue;
use crate::error::Result;
use crate::events::EventDispatcher;
use crate::notify::{platform_notifier, NotificationCenter, Notifier};
use crate::quotes::{FeedConfig, QuoteFeed, SinaQuoteClient};
use parking_lot::RwLock;
use std::path::PathBuf;
use std::sync::Arc;

/// Environment variable overriding the data directory
pub const DATA_DIR_ENV: &str = "QUOTEWATCH_DATA_DIR";

const DB_FILE: &str = "quotewatch.db";

/// Application state shared by the monitor loops and the local API
pub struct AppState {
    /// SQLite database connection
    pub sqlite: Arc<SqliteDb>,

    /// Current quote source; swapped when feed settings change
    feed: RwLock<Arc<dyn QuoteFeed>>,

    pub events: Arc<EventDispatcher>,

    pub notifications: Arc<NotificationCenter>,

    /// Background writes (follow prices, quote history)
    pub writes: WriteQueue,

    /// Application data directory
    pub data_dir: PathBuf,
}

impl AppState {
    /// Open the database under `data_dir` and wire up the production feed
    /// and notifier. Must be called from within a Tokio runtime.
    pub fn new(data_dir: PathBuf) -> Result<Self> {
        std::fs::create_dir_all(&data_dir)?;
        tracing::info!("Data directory: {:?}", data_dir);

        let sqlite = Arc::new(SqliteDb::new(&data_dir.join(DB_FILE))?);
        let settings = sqlite.get_settings()?;

        let (writes, _worker) = WriteQueue::start(sqlite.clone());
        let feed = build_feed(&settings, &writes)?;

        Ok(Self::assemble(sqlite, feed, platform_notifier(), writes, &settings, data_dir))
    }

    /// State around caller-supplied parts. Must be called from within a
    /// Tokio runtime.
    pub fn with_parts(
        sqlite: Arc<SqliteDb>,
        feed: Arc<dyn QuoteFeed>,
        notifier: Arc<dyn Notifier>,
    ) -> Result<Self> {
        let settings = sqlite.get_settings()?;
        let (writes, _worker) = WriteQueue::start(sqlite.clone());
        Ok(Self::assemble(sqlite, feed, notifier, writes, &settings, PathBuf::new()))
    }

    fn assemble(
        sqlite: Arc<SqliteDb>,
        feed: Arc<dyn QuoteFeed>,
        notifier: Arc<dyn Notifier>,
        writes: WriteQueue,
        settings: &Settings,
        data_dir: PathBuf,
    ) -> Self {
        Self {
            sqlite,
            feed: RwLock::new(feed),
            events: Arc::new(EventDispatcher::new()),
            notifications: Arc::new(NotificationCenter::new(
                notifier,
                settings.enable_notifications,
            )),
            writes,
            data_dir,
        }
    }

    /// Current quote feed
    pub fn feed(&self) -> Arc<dyn QuoteFeed> {
        self.feed.read().clone()
    }

    pub fn set_feed(&self, feed: Arc<dyn QuoteFeed>) {
        *self.feed.write() = feed;
    }

    /// Push changed settings into the live components
    pub fn apply_settings(&self, settings: &Settings, rebuild_feed: bool) -> Result<()> {
        self.notifications.set_enabled(settings.enable_notifications);
        if rebuild_feed {
            self.set_feed(build_feed(settings, &self.writes)?);
            tracing::info!("Quote feed reconfigured");
        }
        Ok(())
    }
}

fn build_feed(settings: &Settings, writes: &WriteQueue) -> Result<Arc<dyn QuoteFeed>> {
    let client = SinaQuoteClient::new(FeedConfig::from_settings(settings)?)?
        .with_history(writes.clone());
    Ok(Arc::new(client))
}

/// Data directory from the environment, `./data` by default
pub fn resolve_data_dir() -> PathBuf {
    std::env::var_os(DATA_DIR_ENV)
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("data"))
}

#[cfg(test)]
pub(crate) mod testing {
    use super::*;
    use crate::error::AppError;
    use crate::notify::notifier::LogNotifier;
    use crate::notify::testing::RecordingNotifier;
    use crate::quotes::{parse_batch, QuoteRecord};
    use async_trait::async_trait;
    use parking_lot::Mutex;

    /// Feed answering from a canned response body
    #[derive(Default)]
    pub struct StubFeed {
        pub body: Mutex<String>,
        pub fail: Mutex<bool>,
        pub calls: Mutex<Vec<Vec<String>>>,
    }

    impl StubFeed {
        pub fn with_body(body: impl Into<String>) -> Arc<Self> {
            let feed = Self::default();
            *feed.body.lock() = body.into();
            Arc::new(feed)
        }

        pub fn set_body(&self, body: impl Into<String>) {
            *self.body.lock() = body.into();
        }
    }

    #[async_trait]
    impl QuoteFeed for StubFeed {
        fn id(&self) -> &'static str {
            "stub"
        }

        async fn fetch_batch(&self, codes: &[String]) -> Result<Vec<QuoteRecord>> {
            self.calls.lock().push(codes.to_vec());
            if *self.fail.lock() {
                return Err(AppError::Feed("stub feed down".to_string()));
            }
            let body = self.body.lock().clone();
            Ok(parse_batch(&body)
                .quotes
                .into_iter()
                .filter(|q| codes.contains(&q.code))
                .collect())
        }
    }

    pub fn test_state(feed: Arc<StubFeed>) -> Arc<AppState> {
        let db = Arc::new(SqliteDb::new_in_memory().unwrap());
        Arc::new(AppState::with_parts(db, feed, Arc::new(LogNotifier)).unwrap())
    }

    pub fn test_state_recording(feed: Arc<StubFeed>) -> (Arc<AppState>, Arc<RecordingNotifier>) {
        let db = Arc::new(SqliteDb::new_in_memory().unwrap());
        let recorder = Arc::new(RecordingNotifier::default());
        let state = AppState::with_parts(db, feed, recorder.clone()).unwrap();
        (Arc::new(state), recorder)
    }
}
