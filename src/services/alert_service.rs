//! Alert Service
//!
//! User-side management of stock alerts. Trigger state is owned by the
//! alert evaluator and never written here.

use crate::db::sqlite::{AlertType, StockAlert};
use crate::error::{AppError, Result};
use crate::quotes::normalize_code;
use crate::state::AppState;
use tracing::info;

pub struct AlertService;

impl AlertService {
    /// Create an alert on a followed stock
    pub fn create_alert(
        state: &AppState,
        code: &str,
        alert_type: AlertType,
        threshold: f64,
    ) -> Result<StockAlert> {
        let code = normalize_code(code);
        if code.is_empty() {
            return Err(AppError::Validation("stock code is required".to_string()));
        }
        if !threshold.is_finite() {
            return Err(AppError::Validation("threshold must be a number".to_string()));
        }
        if !alert_type.is_change_rate() && threshold <= 0.0 {
            return Err(AppError::Validation(
                "price threshold must be positive".to_string(),
            ));
        }
        if state.sqlite.get_follow(&code)?.is_none() {
            return Err(AppError::NotFound(format!("{} is not followed", code)));
        }

        let alert = state.sqlite.create_alert(&code, alert_type, threshold)?;
        info!("Created {} alert {} on {} at {}", alert_type, alert.id, code, threshold);
        Ok(alert)
    }

    pub fn delete_alert(state: &AppState, id: i64) -> Result<()> {
        if !state.sqlite.delete_alert(id)? {
            return Err(AppError::NotFound(format!("Alert {} not found", id)));
        }
        Ok(())
    }

    pub fn enable_alert(state: &AppState, id: i64) -> Result<StockAlert> {
        Self::set_active(state, id, true)
    }

    pub fn disable_alert(state: &AppState, id: i64) -> Result<StockAlert> {
        Self::set_active(state, id, false)
    }

    /// Alerts for one code, or all alerts
    pub fn get_alerts(state: &AppState, code: Option<&str>) -> Result<Vec<StockAlert>> {
        let code = code.map(normalize_code);
        state.sqlite.list_alerts(code.as_deref())
    }

    fn set_active(state: &AppState, id: i64, active: bool) -> Result<StockAlert> {
        if !state.sqlite.set_alert_active(id, active)? {
            return Err(AppError::NotFound(format!("Alert {} not found", id)));
        }
        state
            .sqlite
            .get_alert(id)?
            .ok_or_else(|| AppError::NotFound(format!("Alert {} not found", id)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::quotes::parser::fixtures::cn_line;
    use crate::services::StockService;
    use crate::state::testing::{test_state, StubFeed};

    #[tokio::test]
    async fn test_alert_lifecycle() {
        let state = test_state(StubFeed::with_body(cn_line("sh600000", "10.5", "10.0")));
        StockService::follow(&state, "sh600000").await.unwrap();

        let alert = AlertService::create_alert(&state, "SH600000", AlertType::ChangeRateBelow, -2.0)
            .unwrap();
        assert_eq!(alert.stock_code, "sh600000");

        let disabled = AlertService::disable_alert(&state, alert.id).unwrap();
        assert!(!disabled.active);
        let enabled = AlertService::enable_alert(&state, alert.id).unwrap();
        assert!(enabled.active);

        assert_eq!(AlertService::get_alerts(&state, Some("sh600000")).unwrap().len(), 1);
        AlertService::delete_alert(&state, alert.id).unwrap();
        assert!(AlertService::get_alerts(&state, None).unwrap().is_empty());
        assert!(matches!(
            AlertService::delete_alert(&state, alert.id),
            Err(AppError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_create_alert_validation() {
        let state = test_state(StubFeed::with_body(cn_line("sh600000", "10.5", "10.0")));
        StockService::follow(&state, "sh600000").await.unwrap();

        assert!(matches!(
            AlertService::create_alert(&state, "sh600000", AlertType::PriceAbove, 0.0),
            Err(AppError::Validation(_))
        ));
        assert!(matches!(
            AlertService::create_alert(&state, "sz000001", AlertType::PriceAbove, 10.0),
            Err(AppError::NotFound(_))
        ));
        assert!(matches!(
            AlertService::create_alert(&state, "sh600000", AlertType::PriceBelow, f64::NAN),
            Err(AppError::Validation(_))
        ));
    }
}
