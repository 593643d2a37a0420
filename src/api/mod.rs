pub mod executions;
pub mod health;
pub mod users;
pub mod workflows;

use axum::Router;

use crate::{auth::handlers as auth_handlers, AppState};

pub fn create_router() -> Router<AppState> {
    Router::new()
        .merge(health::routes())
        .nest("/api/v1/workflows", workflows::routes())
        .nest("/api/v1/executions", executions::routes())
        .nest("/users", users::routes())
        .nest("/token", auth_handlers::routes())
}
