use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::Json,
    routing::get,
    Router,
};
use serde::Deserialize;

use crate::database::executions;
use crate::AppState;

const DEFAULT_LIMIT: u64 = 50;

pub fn routes() -> Router<AppState> {
    Router::new().route("/", get(list_executions))
}

#[derive(Debug, Deserialize)]
struct ExecutionQuery {
    workflow_id: Option<String>,
    limit: Option<u64>,
}

async fn list_executions(
    State(state): State<AppState>,
    Query(query): Query<ExecutionQuery>,
) -> Result<Json<Vec<executions::Model>>, StatusCode> {
    let rows = state
        .executions
        .list(
            query.workflow_id.as_deref(),
            query.limit.unwrap_or(DEFAULT_LIMIT),
        )
        .await
        .map_err(|e| {
            tracing::error!(error = %e, "failed to list executions");
            StatusCode::INTERNAL_SERVER_ERROR
        })?;

    Ok(Json(rows))
}
