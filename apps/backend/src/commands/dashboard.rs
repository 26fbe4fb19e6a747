//! # Dashboard Commands

use chrono::{Local, NaiveDate};
use serde::Deserialize;

use crate::error::ApiError;
use crate::state::AppState;
use gestion_core::{DashboardSummary, TopProduct};

/// Inclusive day range. Both ends default to today.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RangeArgs {
    pub from: Option<NaiveDate>,
    pub to: Option<NaiveDate>,
    pub limit: Option<u32>,
}

impl RangeArgs {
    fn bounds(&self) -> Result<(NaiveDate, NaiveDate), ApiError> {
        let today = Local::now().date_naive();
        let from = self.from.unwrap_or(today);
        let to = self.to.unwrap_or(today);
        if from > to {
            return Err(ApiError::validation(format!(
                "from ({}) is after to ({})",
                from, to
            )));
        }
        Ok((from, to))
    }
}

pub async fn summary(state: &AppState, args: RangeArgs) -> Result<DashboardSummary, ApiError> {
    let (from, to) = args.bounds()?;
    Ok(state.db().dashboard().summary(from, to).await?)
}

pub async fn top_products(state: &AppState, args: RangeArgs) -> Result<Vec<TopProduct>, ApiError> {
    let (from, to) = args.bounds()?;
    let limit = args.limit.unwrap_or(10).clamp(1, 100);
    Ok(state.db().dashboard().top_products(from, to, limit).await?)
}

pub async fn outstanding_credit(state: &AppState) -> Result<i64, ApiError> {
    Ok(state.db().dashboard().outstanding_credit().await?)
}

#[cfg(test)]
mod tests {
    use crate::commands::{dispatch, testing};
    use crate::error::ErrorCode;
    use serde_json::json;

    #[tokio::test]
    async fn test_today_by_default() {
        let state = testing::state().await;
        let summary = dispatch(&state, "dashboard.summary", json!(null)).await.unwrap();
        assert_eq!(summary["saleCount"], 0);
        assert_eq!(summary["revenueCents"], 0);

        let credit = dispatch(&state, "dashboard.outstandingCredit", json!(null))
            .await
            .unwrap();
        assert_eq!(credit, 0);
    }

    #[tokio::test]
    async fn test_inverted_range() {
        let state = testing::state().await;
        let err = dispatch(
            &state,
            "dashboard.topProducts",
            json!({ "from": "2026-10-17", "to": "2026-10-01" }),
        )
        .await
        .unwrap_err();
        assert_eq!(err.code, ErrorCode::ValidationError);
    }
}
