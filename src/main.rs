use axum::middleware;
use sea_orm::{ColumnTrait, EntityTrait, QueryFilter};
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::cors::{Any, CorsLayer};

use autofluo::config::Config;
use autofluo::database::{self, establish_connection};
use autofluo::schedule::WorkflowScheduler;
use autofluo::workflow::engine::WorkflowEngine;
use autofluo::{api, auth, AppState};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables from .env file
    dotenvy::dotenv().ok();

    // Initialize tracing
    tracing_subscriber::fmt::init();

    // Load configuration
    let config = Config::from_env()?;

    tracing::info!("Starting Autofluo on port {}", config.port);

    // Connect to database (runs migrations)
    let db = Arc::new(establish_connection(&config.database_url).await?);

    let engine = Arc::new(WorkflowEngine::new());
    let executions = Arc::new(database::executions::ExecutionRepo::new(db.clone()));
    let auth_service = Arc::new(auth::AuthService::new(db.clone(), &config));
    let scheduler = Arc::new(WorkflowScheduler::new(
        engine.clone(),
        Some(executions.clone()),
    ));

    // Register stored active workflows with the scheduler before it starts
    let stored = database::workflows::Entity::find()
        .filter(database::workflows::Column::IsActive.eq(true))
        .all(&*db)
        .await?;
    for row in stored {
        match row.to_workflow() {
            Ok(workflow) => {
                if let Err(e) = scheduler.register_workflow(Arc::new(workflow)).await {
                    tracing::error!(workflow_id = %row.id, error = %e, "failed to register stored workflow");
                }
            }
            Err(e) => {
                tracing::error!(workflow_id = %row.id, error = %e, "stored workflow definition is invalid");
            }
        }
    }

    scheduler.start().await;

    // Store port before moving config into the state
    let port = config.port;

    let state = AppState {
        db,
        engine,
        scheduler: scheduler.clone(),
        auth: auth_service,
        executions,
        config: Arc::new(config),
    };

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([
            axum::http::Method::GET,
            axum::http::Method::POST,
            axum::http::Method::PUT,
            axum::http::Method::DELETE,
            axum::http::Method::OPTIONS,
        ])
        .allow_headers([
            axum::http::header::AUTHORIZATION,
            axum::http::header::CONTENT_TYPE,
            axum::http::header::ACCEPT,
        ]);

    let app = api::create_router()
        .layer(middleware::from_fn_with_state(
            state.clone(),
            auth::auth_middleware,
        ))
        .layer(cors)
        .with_state(state);

    let listener = TcpListener::bind(&format!("0.0.0.0:{port}")).await?;

    println!("Autofluo server listening on http://0.0.0.0:{port}");

    let shutdown_signal = async {
        if tokio::signal::ctrl_c().await.is_err() {
            tracing::error!("Failed to install Ctrl+C handler");
        }
        tracing::info!("Received shutdown signal");
    };

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal)
        .await?;

    // Stop firing and let in-flight runs drain
    tracing::info!("Shutting down scheduler...");
    scheduler.shutdown().await;

    tracing::info!("Application shutdown complete");
    Ok(())
}
