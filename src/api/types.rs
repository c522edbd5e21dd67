//! Local API request/response types
//!
//! Webview front-ends sometimes send numbers as strings, so numeric request
//! fields accept both.

use crate::db::sqlite::{AlertType, StockBasic};
use crate::error::{AppError, ErrorResponse};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::{Deserialize, Deserializer, Serialize};

// ============================================================================
// Custom Deserializers
// ============================================================================

fn deserialize_flexible_i64<'de, D>(deserializer: D) -> Result<i64, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum FlexibleInt {
        Int(i64),
        Float(f64),
        Str(String),
    }

    match FlexibleInt::deserialize(deserializer)? {
        FlexibleInt::Int(i) => Ok(i),
        FlexibleInt::Float(f) => Ok(f as i64),
        FlexibleInt::Str(s) => s.trim().parse().map_err(serde::de::Error::custom),
    }
}

fn deserialize_flexible_f64<'de, D>(deserializer: D) -> Result<f64, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum FlexibleFloat {
        Float(f64),
        Int(i64),
        Str(String),
    }

    match FlexibleFloat::deserialize(deserializer)? {
        FlexibleFloat::Float(f) => Ok(f),
        FlexibleFloat::Int(i) => Ok(i as f64),
        FlexibleFloat::Str(s) => s.trim().parse().map_err(serde::de::Error::custom),
    }
}

// ============================================================================
// Responses
// ============================================================================

/// Standard response envelope
#[derive(Debug, Serialize)]
pub struct ApiResponse<T: Serialize> {
    pub status: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
}

impl<T: Serialize> ApiResponse<T> {
    pub fn success_with_message(message: &str) -> Self {
        Self {
            status: "success".to_string(),
            message: Some(message.to_string()),
            data: None,
        }
    }

    pub fn success_with_data(data: T) -> Self {
        Self {
            status: "success".to_string(),
            message: None,
            data: Some(data),
        }
    }
}

/// Empty payload for message-only responses
#[derive(Debug, Serialize)]
pub struct Empty {}

/// `AppError` rendered as an HTTP error
pub struct ApiError(pub AppError);

impl From<AppError> for ApiError {
    fn from(err: AppError) -> Self {
        Self(err)
    }
}

impl ApiError {
    fn status(&self) -> StatusCode {
        match &self.0 {
            AppError::Validation(_) | AppError::QuoteParse(_) => StatusCode::BAD_REQUEST,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Duplicate(_) => StatusCode::CONFLICT,
            AppError::Http(_) | AppError::Feed(_) => StatusCode::BAD_GATEWAY,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

#[derive(Serialize)]
struct ErrorBody {
    status: &'static str,
    message: String,
    error: ErrorResponse,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!("API error: {}", self.0);
        }
        let body = ErrorBody {
            status: "error",
            message: self.0.to_string(),
            error: ErrorResponse::from(&self.0),
        };
        (status, Json(body)).into_response()
    }
}

pub type ApiResult<T> = std::result::Result<Json<ApiResponse<T>>, ApiError>;

// ============================================================================
// Requests
// ============================================================================

/// POST /api/stocks
#[derive(Debug, Deserialize)]
pub struct StockInfosRequest {
    #[serde(default)]
    pub codes: Vec<String>,
}

/// POST /api/follows
#[derive(Debug, Deserialize)]
pub struct FollowRequest {
    pub code: String,
}

/// PUT /api/follows/:code/cost
#[derive(Debug, Deserialize)]
pub struct CostRequest {
    #[serde(deserialize_with = "deserialize_flexible_f64")]
    pub price: f64,
    #[serde(deserialize_with = "deserialize_flexible_i64")]
    pub volume: i64,
}

/// PUT /api/follows/:code/alarm
#[derive(Debug, Deserialize)]
pub struct AlarmRequest {
    #[serde(deserialize_with = "deserialize_flexible_f64")]
    pub change_percent: f64,
    #[serde(default, deserialize_with = "deserialize_flexible_f64")]
    pub price: f64,
}

/// PUT /api/follows/:code/sort
#[derive(Debug, Deserialize)]
pub struct SortRequest {
    #[serde(deserialize_with = "deserialize_flexible_i64")]
    pub sort: i64,
}

/// POST /api/alerts
#[derive(Debug, Deserialize)]
pub struct CreateAlertRequest {
    pub code: String,
    pub alert_type: AlertType,
    #[serde(deserialize_with = "deserialize_flexible_f64")]
    pub threshold: f64,
}

/// PUT /api/alerts/:id/active
#[derive(Debug, Deserialize)]
pub struct AlertActiveRequest {
    pub active: bool,
}

/// GET /api/alerts?code=
#[derive(Debug, Deserialize)]
pub struct AlertQuery {
    pub code: Option<String>,
}

/// GET /api/stocks/search?q=
#[derive(Debug, Deserialize)]
pub struct StockSearchQuery {
    #[serde(default)]
    pub q: String,
}

/// POST /api/stocks/directory
#[derive(Debug, Deserialize)]
pub struct StockDirectoryImport {
    pub stocks: Vec<StockBasic>,
}

/// Result of a directory import
#[derive(Debug, Serialize)]
pub struct ImportSummary {
    pub imported: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flexible_numbers() {
        let req: CostRequest = serde_json::from_str(r#"{"price":"10.25","volume":"300"}"#).unwrap();
        assert_eq!(req.price, 10.25);
        assert_eq!(req.volume, 300);

        let req: CostRequest = serde_json::from_str(r#"{"price":10,"volume":200.0}"#).unwrap();
        assert_eq!(req.price, 10.0);
        assert_eq!(req.volume, 200);

        let req: AlarmRequest = serde_json::from_str(r#"{"change_percent":"2.5"}"#).unwrap();
        assert_eq!(req.price, 0.0);
    }

    #[test]
    fn test_error_status_mapping() {
        assert_eq!(ApiError(AppError::Duplicate("x".into())).status(), StatusCode::CONFLICT);
        assert_eq!(ApiError(AppError::NotFound("x".into())).status(), StatusCode::NOT_FOUND);
        assert_eq!(ApiError(AppError::Validation("x".into())).status(), StatusCode::BAD_REQUEST);
        assert_eq!(ApiError(AppError::Feed("x".into())).status(), StatusCode::BAD_GATEWAY);
    }

    #[test]
    fn test_alert_type_wire_format() {
        let body = r#"{"code":"sh600000","alert_type":"PRICE_ABOVE","threshold":"11"}"#;
        let req: CreateAlertRequest = serde_json::from_str(body).unwrap();
        assert_eq!(req.alert_type, AlertType::PriceAbove);
        assert_eq!(req.threshold, 11.0);
    }
}
