//! Sina real-time quote feed client

use crate::db::WriteQueue;
use crate::db::sqlite::Settings;
use crate::error::{AppError, Result};
use crate::quotes::{normalize_code, parse_batch, QuoteFeed, QuoteRecord};
use async_trait::async_trait;
use reqwest::Client;
use std::time::Duration;
use tracing::{debug, warn};

pub const DEFAULT_BASE_URL: &str = "http://hq.sinajs.cn";
const DEFAULT_TIMEOUT_SECS: u64 = 10;

const REFERER: &str = "https://finance.sina.com.cn/";
const USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 \
     (KHTML, like Gecko) Chrome/124.0.0.0 Safari/537.36";

/// Where and how long to wait for the feed
#[derive(Debug, Clone)]
pub struct FeedConfig {
    pub base_url: String,
    pub timeout: Duration,
}

impl Default for FeedConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
        }
    }
}

impl FeedConfig {
    pub fn from_settings(settings: &Settings) -> Result<Self> {
        let base_url = match settings.quote_feed_url.as_deref() {
            Some(u) if !u.trim().is_empty() => {
                url::Url::parse(u)
                    .map_err(|e| AppError::Config(format!("Invalid quote feed URL {}: {}", u, e)))?;
                u.trim_end_matches('/').to_string()
            }
            _ => DEFAULT_BASE_URL.to_string(),
        };

        let timeout = if settings.request_timeout_secs > 0 {
            Duration::from_secs(settings.request_timeout_secs as u64)
        } else {
            Duration::from_secs(DEFAULT_TIMEOUT_SECS)
        };

        Ok(Self { base_url, timeout })
    }
}

/// Fetches `var hq_str_<code>="...";` lines from hq.sinajs.cn
pub struct SinaQuoteClient {
    client: Client,
    base_url: String,
    history: Option<WriteQueue>,
}

impl SinaQuoteClient {
    pub fn new(config: FeedConfig) -> Result<Self> {
        let client = Client::builder().timeout(config.timeout).build()?;

        Ok(Self {
            client,
            base_url: config.base_url,
            history: None,
        })
    }

    /// Also record every parsed snapshot through the write queue
    pub fn with_history(mut self, queue: WriteQueue) -> Self {
        self.history = Some(queue);
        self
    }

    fn batch_url(&self, codes: &[String]) -> String {
        format!(
            "{}/rn={}&list={}",
            self.base_url,
            chrono::Utc::now().timestamp(),
            codes.join(",")
        )
    }
}

#[async_trait]
impl QuoteFeed for SinaQuoteClient {
    fn id(&self) -> &'static str {
        "sina"
    }

    async fn fetch_batch(&self, codes: &[String]) -> Result<Vec<QuoteRecord>> {
        if codes.is_empty() {
            return Err(AppError::Validation("No stock codes to fetch".to_string()));
        }

        let codes: Vec<String> = codes.iter().map(|c| normalize_code(c)).collect();
        let url = self.batch_url(&codes);
        debug!("Fetching {} quotes: {}", codes.len(), url);

        let response = self
            .client
            .get(&url)
            .header("Referer", REFERER)
            .header("User-Agent", USER_AGENT)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(AppError::Feed(format!(
                "Quote feed returned {}",
                response.status()
            )));
        }

        let bytes = response.bytes().await?;
        let (text, _, had_errors) = encoding_rs::GB18030.decode(&bytes);
        if had_errors {
            warn!("Quote feed body contained undecodable bytes");
        }

        if text.lines().all(|l| l.trim().is_empty()) {
            return Err(AppError::Feed("Quote feed returned an empty body".to_string()));
        }

        let batch = parse_batch(&text);
        if batch.rejected > 0 {
            debug!("{} of {} quote lines rejected", batch.rejected, codes.len());
        }

        if let Some(queue) = &self.history {
            for quote in &batch.quotes {
                queue.record_quote(quote.clone());
            }
        }

        Ok(batch.quotes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::sqlite::SqliteDb;
    use crate::quotes::parser::fixtures::{cn_line, hk_line};
    use axum::http::{HeaderMap, StatusCode, Uri};
    use axum::Router;
    use std::sync::Arc;

    async fn serve(router: Router) -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, router).await.unwrap();
        });
        format!("http://{}", addr)
    }

    fn client_for(base_url: String) -> SinaQuoteClient {
        SinaQuoteClient::new(FeedConfig {
            base_url,
            timeout: Duration::from_secs(5),
        })
        .unwrap()
    }

    #[tokio::test]
    async fn test_fetch_decodes_gb18030_batch() {
        let router = Router::new().fallback(|uri: Uri, headers: HeaderMap| async move {
            assert!(uri.path().contains("list=sh600000,hk00700,sz000001"));
            assert_eq!(headers.get("referer").unwrap(), REFERER);
            let body = format!(
                "{}\n{}\nvar hq_str_sz000001=\"\";\n",
                cn_line("sh600000", "10.500", "10.000"),
                hk_line()
            );
            let (bytes, _, _) = encoding_rs::GB18030.encode(&body);
            bytes.into_owned()
        });
        let client = client_for(serve(router).await);

        let codes = vec!["SH600000".to_string(), "hk00700".to_string(), "sz000001".to_string()];
        let quotes = client.fetch_batch(&codes).await.unwrap();

        assert_eq!(quotes.len(), 2);
        assert_eq!(quotes[0].name, "浦发银行");
        assert_eq!(quotes[1].name, "腾讯控股");
    }

    #[tokio::test]
    async fn test_fetch_records_history() {
        let router = Router::new().fallback(|| async {
            let body = cn_line("sh600000", "10.500", "10.000");
            let (bytes, _, _) = encoding_rs::GB18030.encode(&body);
            bytes.into_owned()
        });
        let db = Arc::new(SqliteDb::new_in_memory().unwrap());
        let (queue, _worker) = WriteQueue::start(db.clone());
        let client = client_for(serve(router).await).with_history(queue.clone());

        client.fetch_batch(&["sh600000".to_string()]).await.unwrap();
        assert!(queue.flush().await);

        let stored = db.get_latest_quote("sh600000").unwrap().unwrap();
        assert_eq!(stored.quote.price, "10.500");
    }

    #[tokio::test]
    async fn test_non_success_status_is_an_error() {
        let router =
            Router::new().fallback(|| async { (StatusCode::FORBIDDEN, "Kinsoku jikou desu!") });
        let client = client_for(serve(router).await);

        let result = client.fetch_batch(&["sh600000".to_string()]).await;
        assert!(matches!(result, Err(AppError::Feed(_))));
    }

    #[tokio::test]
    async fn test_empty_body_and_empty_input() {
        let router = Router::new().fallback(|| async { "\n" });
        let client = client_for(serve(router).await);

        assert!(matches!(
            client.fetch_batch(&["sh600000".to_string()]).await,
            Err(AppError::Feed(_))
        ));
        assert!(matches!(client.fetch_batch(&[]).await, Err(AppError::Validation(_))));
    }

    #[test]
    fn test_config_from_settings() {
        let db = SqliteDb::new_in_memory().unwrap();
        let mut settings = db.get_settings().unwrap();
        let config = FeedConfig::from_settings(&settings).unwrap();
        assert_eq!(config.base_url, DEFAULT_BASE_URL);
        assert_eq!(config.timeout, Duration::from_secs(10));

        settings.quote_feed_url = Some("http://127.0.0.1:9000/".to_string());
        settings.request_timeout_secs = 0;
        let config = FeedConfig::from_settings(&settings).unwrap();
        assert_eq!(config.base_url, "http://127.0.0.1:9000");
        assert_eq!(config.timeout, Duration::from_secs(DEFAULT_TIMEOUT_SECS));
    }
}
