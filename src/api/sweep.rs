use axum::extract::State;
use axum::Json;
use serde::Deserialize;

use crate::api::AppState;
use crate::domain::TimeMs;
use crate::error::AppError;
use crate::orchestration::SettlementReport;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SweepRequest {
    /// Settlement clock override, for cron callers that batch by window.
    pub now_ms: Option<i64>,
}

/// External settlement trigger. Safe to call on any schedule; settled
/// listings are skipped, so concurrent or repeated calls converge.
pub async fn run_sweep(
    State(state): State<AppState>,
    body: Option<Json<SweepRequest>>,
) -> Result<Json<SettlementReport>, AppError> {
    let now = body
        .and_then(|Json(req)| req.now_ms)
        .map(TimeMs::new)
        .unwrap_or_else(TimeMs::now);

    let report = state.sweeper.sweep(now).await?;
    Ok(Json(report))
}
