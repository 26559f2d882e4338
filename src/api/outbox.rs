//! Polling interface for the notification delivery worker.

use axum::extract::{Path, Query, State};
use axum::Json;
use serde::{Deserialize, Serialize};

use crate::api::AppState;
use crate::db::OutboxRow;
use crate::domain::{TimeMs, UserId};
use crate::error::AppError;

const DEFAULT_LIMIT: i64 = 50;
const MAX_LIMIT: i64 = 500;

#[derive(Debug, Deserialize)]
pub struct OutboxQuery {
    pub limit: Option<i64>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OutboxEntryDto {
    pub id: i64,
    pub user_id: UserId,
    pub kind: String,
    pub message: String,
    pub metadata: serde_json::Value,
    pub created_at_ms: i64,
}

impl From<OutboxRow> for OutboxEntryDto {
    fn from(row: OutboxRow) -> Self {
        let metadata = serde_json::from_str(&row.metadata).unwrap_or_else(|e| {
            tracing::warn!(id = row.id, error = %e, "stored outbox metadata is not valid JSON");
            serde_json::Value::Null
        });
        OutboxEntryDto {
            id: row.id,
            user_id: row.user_id,
            kind: row.kind,
            message: row.message,
            metadata,
            created_at_ms: row.created_at.as_ms(),
        }
    }
}

pub async fn get_unsent(
    State(state): State<AppState>,
    Query(params): Query<OutboxQuery>,
) -> Result<Json<Vec<OutboxEntryDto>>, AppError> {
    let limit = params.limit.unwrap_or(DEFAULT_LIMIT).clamp(1, MAX_LIMIT);
    let rows = state.repo.unsent_notifications(limit).await?;
    Ok(Json(rows.into_iter().map(OutboxEntryDto::from).collect()))
}

pub async fn mark_sent(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<serde_json::Value>, AppError> {
    let acknowledged = state.repo.mark_notification_sent(id, TimeMs::now()).await?;
    if !acknowledged {
        return Err(AppError::NotFound(format!(
            "Notification {} not found or already acknowledged",
            id
        )));
    }
    Ok(Json(serde_json::json!({"acknowledged": true})))
}
