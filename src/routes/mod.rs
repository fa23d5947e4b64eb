pub mod auth;
pub mod health;
pub mod menu;
pub mod metrics;
pub mod preferences;

use axum::{
    http::{header, HeaderValue, Method},
    routing::{get, post},
    Router,
};
use tower_http::cors::{AllowHeaders, AllowOrigin, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::{config::Config, middleware::auth::JwtSecret, AppState};

/// CORS for the configured frontend origins. Unparseable entries are skipped.
pub fn cors_layer(config: &Config) -> CorsLayer {
    let origins: Vec<HeaderValue> = config
        .cors_origins
        .iter()
        .filter_map(|o| match o.parse() {
            Ok(v) => Some(v),
            Err(_) => {
                tracing::warn!("Ignoring invalid CORS origin {:?}", o);
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers(AllowHeaders::list([
            header::AUTHORIZATION,
            header::CONTENT_TYPE,
            header::ACCEPT,
        ]))
        .allow_credentials(true)
        .allow_origin(AllowOrigin::list(origins))
}

pub fn router(state: AppState) -> Router {
    let jwt_secret = JwtSecret(state.config.jwt_secret.clone());
    let cors = cors_layer(&state.config);

    Router::new()
        .route("/health", get(health::health_check))
        .route("/metrics", get(metrics::metrics_handler))
        // Auth
        .route("/register", post(auth::register))
        .route("/login", post(auth::login))
        .route("/me", get(auth::me))
        // Preferences
        .route(
            "/preferences",
            get(preferences::get_preferences).post(preferences::save_preferences),
        )
        // Menus
        .route("/generate-menu", post(menu::generate_menu))
        .route("/current-menu", get(menu::current_menu))
        .route("/regenerate-meal", post(menu::regenerate_meal))
        .route("/menu-history", get(menu::menu_history))
        .route("/menus/{id}/grocery-list", get(menu::grocery_list))
        .route("/menus/{id}/activate", post(menu::activate_menu))
        .layer(axum::Extension(jwt_secret))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}
