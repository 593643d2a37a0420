use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::Json,
    routing::{get, post},
    Router,
};
use chrono::Utc;
use sea_orm::{ActiveModelTrait, EntityTrait, IntoActiveModel, Set};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::sync::Arc;
use uuid::Uuid;

use crate::database::workflows;
use crate::workflow::{
    errors::FluoError,
    models::{Node, Workflow},
    validation::WorkflowValidator,
};
use crate::AppState;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/", post(create_workflow).get(list_workflows))
        .route(
            "/:id",
            get(get_workflow).put(update_workflow).delete(delete_workflow),
        )
        .route("/:id/run", post(run_workflow))
}

#[derive(Debug, Deserialize)]
pub struct WorkflowRequest {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    pub nodes: Vec<Node>,
    #[serde(default)]
    pub connections: HashMap<String, Vec<String>>,
    #[serde(default)]
    pub triggers: Vec<String>,
    #[serde(default = "default_active")]
    pub is_active: bool,
}

fn default_active() -> bool {
    true
}

#[derive(Debug, Serialize)]
pub struct RunResponse {
    pub execution_id: String,
    pub status: String,
    pub data: Map<String, Value>,
    pub history: Vec<String>,
    pub errors: Vec<String>,
}

type ApiError = (StatusCode, Json<Value>);

fn api_error(status: StatusCode, message: impl std::fmt::Display) -> ApiError {
    (status, Json(serde_json::json!({"detail": message.to_string()})))
}

fn registration_error(error: FluoError) -> ApiError {
    let status = match &error {
        FluoError::Validation(_) => StatusCode::UNPROCESSABLE_ENTITY,
        FluoError::Scheduler(_) => StatusCode::CONFLICT,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    };
    api_error(status, error)
}

async fn create_workflow(
    State(state): State<AppState>,
    Json(request): Json<WorkflowRequest>,
) -> Result<(StatusCode, Json<workflows::Model>), ApiError> {
    let workflow = Workflow {
        id: Uuid::new_v4().to_string(),
        name: request.name.clone(),
        nodes: request.nodes,
        connections: request.connections,
        triggers: request.triggers,
    };

    WorkflowValidator::validate(&workflow)
        .map_err(|e| api_error(StatusCode::UNPROCESSABLE_ENTITY, e))?;

    // Schedule triggers become visible to the scheduler only when the
    // registration (including its own validation pass) succeeds.
    if request.is_active {
        state
            .scheduler
            .register_workflow(Arc::new(workflow.clone()))
            .await
            .map_err(registration_error)?;
    }

    let definition = serde_json::to_string(&workflow)
        .map_err(|e| api_error(StatusCode::INTERNAL_SERVER_ERROR, e))?;

    let now = Utc::now().timestamp_micros();
    let model = workflows::ActiveModel {
        id: Set(workflow.id.clone()),
        name: Set(workflow.name.clone()),
        description: Set(request.description),
        definition: Set(definition),
        is_active: Set(request.is_active),
        created_at: Set(now),
        updated_at: Set(now),
    };

    let stored = model.insert(&*state.db).await.map_err(|e| {
        tracing::error!(error = %e, "failed to store workflow");
        api_error(StatusCode::INTERNAL_SERVER_ERROR, e)
    })?;

    tracing::info!(workflow_id = %stored.id, name = %stored.name, "workflow created");
    Ok((StatusCode::CREATED, Json(stored)))
}

async fn list_workflows(
    State(state): State<AppState>,
) -> Result<Json<Vec<workflows::Model>>, ApiError> {
    let rows = workflows::Entity::find()
        .all(&*state.db)
        .await
        .map_err(|e| api_error(StatusCode::INTERNAL_SERVER_ERROR, e))?;
    Ok(Json(rows))
}

async fn get_workflow(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<workflows::Model>, ApiError> {
    let row = find_workflow(&state, &id).await?;
    Ok(Json(row))
}

async fn update_workflow(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(request): Json<WorkflowRequest>,
) -> Result<Json<workflows::Model>, ApiError> {
    let existing = find_workflow(&state, &id).await?;

    let workflow = Workflow {
        id: id.clone(),
        name: request.name.clone(),
        nodes: request.nodes,
        connections: request.connections,
        triggers: request.triggers,
    };

    WorkflowValidator::validate(&workflow)
        .map_err(|e| api_error(StatusCode::UNPROCESSABLE_ENTITY, e))?;

    // Swap the scheduler registration over to the new definition.
    state.scheduler.unregister_workflow(&existing.name).await;
    if request.is_active {
        state
            .scheduler
            .register_workflow(Arc::new(workflow.clone()))
            .await
            .map_err(registration_error)?;
    }

    let definition = serde_json::to_string(&workflow)
        .map_err(|e| api_error(StatusCode::INTERNAL_SERVER_ERROR, e))?;

    let mut model = existing.into_active_model();
    model.name = Set(workflow.name.clone());
    model.description = Set(request.description);
    model.definition = Set(definition);
    model.is_active = Set(request.is_active);
    model.updated_at = Set(Utc::now().timestamp_micros());

    let updated = model
        .update(&*state.db)
        .await
        .map_err(|e| api_error(StatusCode::INTERNAL_SERVER_ERROR, e))?;

    tracing::info!(workflow_id = %updated.id, "workflow updated");
    Ok(Json(updated))
}

async fn delete_workflow(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<StatusCode, ApiError> {
    let existing = find_workflow(&state, &id).await?;

    state.scheduler.unregister_workflow(&existing.name).await;

    workflows::Entity::delete_by_id(&id)
        .exec(&*state.db)
        .await
        .map_err(|e| api_error(StatusCode::INTERNAL_SERVER_ERROR, e))?;

    tracing::info!(workflow_id = %id, "workflow deleted");
    Ok(StatusCode::NO_CONTENT)
}

#[derive(Debug, Deserialize)]
struct RunQuery {
    trigger: Option<String>,
}

async fn run_workflow(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Query(query): Query<RunQuery>,
) -> Result<Json<RunResponse>, ApiError> {
    let row = find_workflow(&state, &id).await?;
    let workflow = row
        .to_workflow()
        .map_err(|e| api_error(StatusCode::INTERNAL_SERVER_ERROR, e))?;

    let (context, record) = state
        .engine
        .run_recorded(&workflow, query.trigger.as_deref())
        .await;

    if let Err(e) = state.executions.insert(&record).await {
        tracing::error!(workflow_id = %id, error = %e, "failed to store execution record");
    }

    Ok(Json(RunResponse {
        execution_id: record.id,
        status: record.status.as_str().to_string(),
        data: context.data,
        history: context.history,
        errors: context.errors,
    }))
}

async fn find_workflow(state: &AppState, id: &str) -> Result<workflows::Model, ApiError> {
    workflows::Entity::find_by_id(id)
        .one(&*state.db)
        .await
        .map_err(|e| api_error(StatusCode::INTERNAL_SERVER_ERROR, e))?
        .ok_or_else(|| api_error(StatusCode::NOT_FOUND, format!("Workflow not found: {id}")))
}
