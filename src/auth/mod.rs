pub mod handlers;

use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use axum::{
    extract::{Request, State},
    http::{header::AUTHORIZATION, Method, StatusCode},
    middleware::Next,
    response::Response,
};
use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use sea_orm::{ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::config::Config;
use crate::database::users;
use crate::workflow::errors::{FluoError, Result};
use crate::AppState;

#[derive(Debug, Serialize, Deserialize)]
struct Claims {
    sub: String,
    exp: i64,
}

/// Authentication collaborator: credential checks, bearer-token minting and
/// token-to-user resolution. The engine itself never touches auth.
pub struct AuthService {
    db: Arc<DatabaseConnection>,
    secret_key: String,
    algorithm: Algorithm,
    access_token_expire_minutes: i64,
}

impl AuthService {
    pub fn new(db: Arc<DatabaseConnection>, config: &Config) -> Self {
        Self {
            db,
            secret_key: config.secret_key.clone(),
            algorithm: config.algorithm,
            access_token_expire_minutes: config.access_token_expire_minutes,
        }
    }

    pub fn hash_password(&self, password: &str) -> Result<String> {
        let salt = SaltString::generate(&mut OsRng);
        Argon2::default()
            .hash_password(password.as_bytes(), &salt)
            .map(|hash| hash.to_string())
            .map_err(|e| FluoError::Config(format!("Password hashing failed: {e}")))
    }

    fn verify_password(&self, password: &str, password_hash: &str) -> bool {
        PasswordHash::new(password_hash)
            .map(|parsed| {
                Argon2::default()
                    .verify_password(password.as_bytes(), &parsed)
                    .is_ok()
            })
            .unwrap_or(false)
    }

    /// `None` on unknown username, bad password, or inactive account.
    pub async fn authenticate(
        &self,
        username: &str,
        password: &str,
    ) -> Result<Option<users::Model>> {
        let user = users::Entity::find()
            .filter(users::Column::Username.eq(username))
            .one(&*self.db)
            .await?;

        Ok(user.filter(|u| u.is_active && self.verify_password(password, &u.password_hash)))
    }

    pub fn create_access_token(&self, username: &str) -> Result<String> {
        let expires_at = Utc::now() + Duration::minutes(self.access_token_expire_minutes);
        let claims = Claims {
            sub: username.to_string(),
            exp: expires_at.timestamp(),
        };
        encode(
            &Header::new(self.algorithm),
            &claims,
            &EncodingKey::from_secret(self.secret_key.as_bytes()),
        )
        .map_err(|e| FluoError::Config(format!("Token signing failed: {e}")))
    }

    /// Resolve a bearer token to its user, or fail.
    pub async fn current_user(&self, token: &str) -> Result<users::Model> {
        let validation = Validation::new(self.algorithm);
        let data = decode::<Claims>(
            token,
            &DecodingKey::from_secret(self.secret_key.as_bytes()),
            &validation,
        )
        .map_err(|_| FluoError::Validation("Could not validate credentials".to_string()))?;

        let user = users::Entity::find()
            .filter(users::Column::Username.eq(&data.claims.sub))
            .one(&*self.db)
            .await?
            .ok_or_else(|| FluoError::Validation("Could not validate credentials".to_string()))?;

        if !user.is_active {
            return Err(FluoError::Validation("Inactive user".to_string()));
        }
        Ok(user)
    }
}

pub async fn auth_middleware(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> std::result::Result<Response, StatusCode> {
    let path = request.uri().path();

    // Health, login, and signup stay reachable without a token
    if path == "/health"
        || path == "/token"
        || (path == "/users" && request.method() == Method::POST)
    {
        return Ok(next.run(request).await);
    }

    let token = request
        .headers()
        .get(AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .and_then(|h| h.strip_prefix("Bearer "))
        .ok_or(StatusCode::UNAUTHORIZED)?;

    state
        .auth
        .current_user(token)
        .await
        .map_err(|_| StatusCode::UNAUTHORIZED)?;

    Ok(next.run(request).await)
}
