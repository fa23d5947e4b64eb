pub mod auth;
pub mod menu;
pub mod preference;
pub mod user;
