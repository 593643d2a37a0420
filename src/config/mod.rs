use crate::workflow::errors::FluoError;
use jsonwebtoken::Algorithm;
use std::env;

#[derive(Clone, Debug)]
pub struct Config {
    pub database_url: String,
    pub port: u16,
    pub secret_key: String,
    pub algorithm: Algorithm,
    pub access_token_expire_minutes: i64,
}

impl Config {
    pub fn from_env() -> Result<Self, FluoError> {
        let database_url = env::var("DATABASE_URL").map_err(|_| {
            FluoError::Config("DATABASE_URL environment variable is required".to_string())
        })?;
        let secret_key = env::var("SECRET_KEY").map_err(|_| {
            FluoError::Config("SECRET_KEY environment variable is required".to_string())
        })?;

        let algorithm = match env::var("ALGORITHM")
            .map_err(|_| FluoError::Config("ALGORITHM environment variable is required".to_string()))?
            .as_str()
        {
            "HS256" => Algorithm::HS256,
            "HS384" => Algorithm::HS384,
            "HS512" => Algorithm::HS512,
            other => {
                return Err(FluoError::Config(format!(
                    "Unsupported ALGORITHM value: {other} (expected HS256, HS384 or HS512)"
                )))
            }
        };

        let access_token_expire_minutes = env::var("ACCESS_TOKEN_EXPIRE_MINUTES")
            .map_err(|_| {
                FluoError::Config(
                    "ACCESS_TOKEN_EXPIRE_MINUTES environment variable is required".to_string(),
                )
            })?
            .parse()
            .map_err(|_| {
                FluoError::Config("Invalid ACCESS_TOKEN_EXPIRE_MINUTES value".to_string())
            })?;

        let port = env::var("PORT")
            .unwrap_or_else(|_| "8000".to_string())
            .parse()
            .map_err(|_| FluoError::Config("Invalid PORT value".to_string()))?;

        // Ensure the data directory exists for file-backed sqlite URLs
        if let Some(db_path_str) = database_url.strip_prefix("sqlite:") {
            if let Some(db_path) = db_path_str.split('?').next() {
                if let Some(parent) = std::path::Path::new(db_path).parent() {
                    std::fs::create_dir_all(parent).map_err(|e| {
                        FluoError::Config(format!("Failed to create data directory: {e}"))
                    })?;
                }
            }
        }

        Ok(Config {
            database_url,
            port,
            secret_key,
            algorithm,
            access_token_expire_minutes,
        })
    }
}
