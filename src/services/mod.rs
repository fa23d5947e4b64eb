pub mod auth;
pub mod menu;
pub mod metrics;
pub mod preferences;
