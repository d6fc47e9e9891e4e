use std::time::Duration;

use anyhow::Context;
use serde::Deserialize;

/// Lifetime of an issued auth token.
pub const TOKEN_TTL: Duration = Duration::from_secs(60 * 60);

#[derive(Debug, Clone, Deserialize)]
pub struct JwtConfig {
    pub secret: String,
    pub ttl: Duration,
}

/// Fixed-window rate limit applied to every route.
#[derive(Debug, Clone, Deserialize)]
pub struct RateLimitConfig {
    pub window: Duration,
    pub max_requests: usize,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            window: Duration::from_secs(15 * 60),
            max_requests: 100,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub database_url: String,
    pub host: String,
    pub port: u16,
    /// Deployment environment name, e.g. `development` or `production`.
    pub env: Option<String>,
    pub jwt: JwtConfig,
    pub rate_limit: RateLimitConfig,
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        let database_url = std::env::var("DATABASE_URL").context("DATABASE_URL is not set")?;
        let jwt = JwtConfig {
            secret: std::env::var("JWT_SECRET").context("JWT_SECRET is not set")?,
            ttl: TOKEN_TTL,
        };
        let port = match std::env::var("APP_PORT") {
            Ok(v) => v.parse::<u16>().context("APP_PORT is not a valid port")?,
            Err(_) => 8080,
        };
        Ok(Self {
            database_url,
            host: std::env::var("APP_HOST").unwrap_or_else(|_| "0.0.0.0".into()),
            port,
            env: std::env::var("APP_ENV").ok(),
            jwt,
            rate_limit: RateLimitConfig::default(),
        })
    }

    /// Request logging is on unless the environment is `development`.
    // Inherited condition; an unset environment also logs.
    pub fn request_logging_enabled(&self) -> bool {
        self.env.as_deref() != Some("development")
    }
}
