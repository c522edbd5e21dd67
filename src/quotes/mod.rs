//! Quote feed module
//!
//! A `QuoteFeed` turns a list of codes into parsed `QuoteRecord`s. The only
//! production implementation talks to the Sina text feed; tests plug in
//! canned feeds.

pub mod parser;
pub mod sina;
pub mod types;

use crate::error::Result;
use async_trait::async_trait;

pub use parser::{parse_batch, parse_line};
pub use sina::{FeedConfig, SinaQuoteClient};
pub use types::{
    from_listing_code, normalize_code, DepthLevel, ExtendedSession, Market, ParsedBatch,
    QuoteRecord,
};

/// Source of quote snapshots
#[async_trait]
pub trait QuoteFeed: Send + Sync {
    /// Feed ID (e.g., "sina")
    fn id(&self) -> &'static str;

    /// Fetch one snapshot per resolvable code in a single request.
    ///
    /// Codes the upstream does not know are silently absent from the result;
    /// lines that fail to parse are skipped.
    async fn fetch_batch(&self, codes: &[String]) -> Result<Vec<QuoteRecord>>;
}
