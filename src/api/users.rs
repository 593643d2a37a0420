use axum::{
    extract::{Request, State},
    http::{header::AUTHORIZATION, StatusCode},
    response::Json,
    routing::{get, post},
    Router,
};
use chrono::Utc;
use sea_orm::{ActiveModelTrait, ColumnTrait, EntityTrait, QueryFilter, Set};
use serde::Deserialize;
use uuid::Uuid;

use crate::database::users;
use crate::AppState;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/", post(create_user))
        .route("/me", get(read_users_me))
}

#[derive(Debug, Deserialize)]
pub struct UserCreate {
    pub username: String,
    pub email: String,
    pub password: String,
}

async fn create_user(
    State(state): State<AppState>,
    Json(request): Json<UserCreate>,
) -> Result<(StatusCode, Json<users::Model>), StatusCode> {
    let existing = users::Entity::find()
        .filter(users::Column::Username.eq(&request.username))
        .one(&*state.db)
        .await
        .map_err(|e| {
            tracing::error!(error = %e, "user lookup failed");
            StatusCode::INTERNAL_SERVER_ERROR
        })?;
    if existing.is_some() {
        return Err(StatusCode::BAD_REQUEST);
    }

    let password_hash = state.auth.hash_password(&request.password).map_err(|e| {
        tracing::error!(error = %e, "password hashing failed");
        StatusCode::INTERNAL_SERVER_ERROR
    })?;

    let model = users::ActiveModel {
        id: Set(Uuid::new_v4().to_string()),
        username: Set(request.username),
        email: Set(request.email),
        password_hash: Set(password_hash),
        is_active: Set(true),
        created_at: Set(Utc::now().timestamp_micros()),
    };

    let user = model.insert(&*state.db).await.map_err(|e| {
        tracing::error!(error = %e, "failed to store user");
        StatusCode::INTERNAL_SERVER_ERROR
    })?;

    tracing::info!(username = %user.username, "user created");
    Ok((StatusCode::CREATED, Json(user)))
}

async fn read_users_me(
    State(state): State<AppState>,
    request: Request,
) -> Result<Json<users::Model>, StatusCode> {
    let token = request
        .headers()
        .get(AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .and_then(|h| h.strip_prefix("Bearer "))
        .ok_or(StatusCode::UNAUTHORIZED)?;

    let user = state
        .auth
        .current_user(token)
        .await
        .map_err(|_| StatusCode::UNAUTHORIZED)?;

    Ok(Json(user))
}
