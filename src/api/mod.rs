//! Local HTTP API module
//!
//! Provides:
//! - Watch-list and stock view endpoints (/api/stocks, /api/follows)
//! - Alert management (/api/alerts)
//! - Settings (/api/settings)
//! - Live event stream over SSE (/api/events)
//!
//! Usage:
//! 1. Enable the API in settings (`api_enabled`)
//! 2. Point the webview shell at `http://<api_host>:<api_port>`

pub mod handlers;
mod server;
mod types;

pub use server::{router, ApiServer};
pub use types::{ApiError, ApiResponse, ApiResult, Empty};
