// Library exports for the API binary, the plan-week tool and tests
pub mod config;
pub mod db;
pub mod middleware;
pub mod models;
pub mod planner;
pub mod routes;
pub mod services;

use std::sync::Arc;

use sqlx::PgPool;

use config::Config;
use planner::MenuPlanner;

/// Application state shared across all handlers.
#[derive(Clone)]
pub struct AppState {
    pub db: PgPool,
    pub redis: redis::aio::MultiplexedConnection,
    pub config: Arc<Config>,
    pub planner: Arc<MenuPlanner>,
}
