use std::sync::Arc;

pub mod api;
pub mod auth;
pub mod config;
pub mod database;
pub mod schedule;
pub mod workflow;

pub use database::establish_connection;

#[derive(Clone)]
pub struct AppState {
    pub db: Arc<sea_orm::DatabaseConnection>,
    pub engine: Arc<workflow::engine::WorkflowEngine>,
    pub scheduler: Arc<schedule::WorkflowScheduler>,
    pub auth: Arc<auth::AuthService>,
    pub executions: Arc<database::executions::ExecutionRepo>,
    pub config: Arc<config::Config>,
}
