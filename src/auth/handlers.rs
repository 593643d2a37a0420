use axum::{extract::State, http::StatusCode, response::Json, routing::post, Form, Router};
use serde::{Deserialize, Serialize};

use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct TokenRequest {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct TokenResponse {
    pub access_token: String,
    pub token_type: String,
}

pub fn routes() -> Router<AppState> {
    Router::new().route("/", post(login_for_access_token))
}

async fn login_for_access_token(
    State(state): State<AppState>,
    Form(form): Form<TokenRequest>,
) -> Result<Json<TokenResponse>, StatusCode> {
    let user = state
        .auth
        .authenticate(&form.username, &form.password)
        .await
        .map_err(|e| {
            tracing::error!(error = %e, "authentication lookup failed");
            StatusCode::INTERNAL_SERVER_ERROR
        })?
        .ok_or(StatusCode::UNAUTHORIZED)?;

    let access_token = state.auth.create_access_token(&user.username).map_err(|e| {
        tracing::error!(error = %e, "token signing failed");
        StatusCode::INTERNAL_SERVER_ERROR
    })?;

    Ok(Json(TokenResponse {
        access_token,
        token_type: "bearer".to_string(),
    }))
}
