//! Starter HTTP service with email/password registration and JWT login.

pub mod app;
pub mod auth;
pub mod config;
pub mod cookies;
pub mod db;
pub mod error;
pub mod layers;
pub mod rate_limit;
pub mod state;

pub use app::{build_app, serve};
pub use config::AppConfig;
pub use state::AppState;
