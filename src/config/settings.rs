//! Application settings loaded from environment variables.

use std::env;
use std::str::FromStr;

use super::constants::{
    DEFAULT_ACCESS_TOKEN_MINUTES, DEFAULT_ALLOWED_ORIGINS, DEFAULT_CACHE_TTL_SECONDS,
    DEFAULT_DATABASE_MAX_CONNECTIONS, DEFAULT_DATABASE_URL, DEFAULT_LOAN_MAX_AMOUNT,
    DEFAULT_LOAN_MIN_AMOUNT, DEFAULT_REDIS_URL, DEFAULT_REFRESH_TOKEN_DAYS, DEFAULT_SERVER_HOST,
    DEFAULT_SERVER_PORT, DEFAULT_STATEMENT_TIMEOUT_SECS, MIN_JWT_SECRET_LENGTH,
};

/// Application configuration
#[derive(Clone)]
pub struct Config {
    pub database_url: String,
    pub database_max_connections: u32,
    pub statement_timeout_secs: u64,
    pub redis_url: String,
    jwt_secret: String,
    pub access_token_minutes: i64,
    pub refresh_token_days: i64,
    admin_register_secret: Option<String>,
    pub allowed_origins: Vec<String>,
    pub loan_min_amount: f64,
    pub loan_max_amount: f64,
    pub stats_cache_ttl_seconds: u64,
    pub server_host: String,
    pub server_port: u16,
}

impl std::fmt::Debug for Config {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Config")
            .field("database_url", &"[REDACTED]")
            .field("database_max_connections", &self.database_max_connections)
            .field("statement_timeout_secs", &self.statement_timeout_secs)
            .field("redis_url", &"[REDACTED]")
            .field("jwt_secret", &"[REDACTED]")
            .field("access_token_minutes", &self.access_token_minutes)
            .field("refresh_token_days", &self.refresh_token_days)
            .field("admin_register_secret", &"[REDACTED]")
            .field("allowed_origins", &self.allowed_origins)
            .field("loan_min_amount", &self.loan_min_amount)
            .field("loan_max_amount", &self.loan_max_amount)
            .field("stats_cache_ttl_seconds", &self.stats_cache_ttl_seconds)
            .field("server_host", &self.server_host)
            .field("server_port", &self.server_port)
            .finish()
    }
}

impl Config {
    /// Build a configuration with default tunables around the three required values.
    pub fn new(
        database_url: impl Into<String>,
        redis_url: impl Into<String>,
        jwt_secret: impl Into<String>,
    ) -> Self {
        Self {
            database_url: database_url.into(),
            database_max_connections: DEFAULT_DATABASE_MAX_CONNECTIONS,
            statement_timeout_secs: DEFAULT_STATEMENT_TIMEOUT_SECS,
            redis_url: redis_url.into(),
            jwt_secret: jwt_secret.into(),
            access_token_minutes: DEFAULT_ACCESS_TOKEN_MINUTES,
            refresh_token_days: DEFAULT_REFRESH_TOKEN_DAYS,
            admin_register_secret: None,
            allowed_origins: split_origins(DEFAULT_ALLOWED_ORIGINS),
            loan_min_amount: DEFAULT_LOAN_MIN_AMOUNT,
            loan_max_amount: DEFAULT_LOAN_MAX_AMOUNT,
            stats_cache_ttl_seconds: DEFAULT_CACHE_TTL_SECONDS,
            server_host: DEFAULT_SERVER_HOST.to_string(),
            server_port: DEFAULT_SERVER_PORT,
        }
    }

    /// Load configuration from environment variables.
    ///
    /// # Panics
    /// Panics if JWT_SECRET is not set in release builds or is too short.
    pub fn from_env() -> Self {
        dotenvy::dotenv().ok();

        let jwt_secret = env::var("JWT_SECRET").unwrap_or_else(|_| {
            if cfg!(debug_assertions) {
                tracing::warn!("JWT_SECRET not set, using insecure default for development");
                "dev-secret-key-minimum-32-chars!!".to_string()
            } else {
                panic!("JWT_SECRET environment variable must be set in production");
            }
        });

        if jwt_secret.len() < MIN_JWT_SECRET_LENGTH {
            panic!(
                "JWT_SECRET must be at least {} characters long",
                MIN_JWT_SECRET_LENGTH
            );
        }

        let mut config = Self::new(
            env::var("DATABASE_URL").unwrap_or_else(|_| DEFAULT_DATABASE_URL.to_string()),
            env::var("REDIS_URL").unwrap_or_else(|_| DEFAULT_REDIS_URL.to_string()),
            jwt_secret,
        );

        config.database_max_connections =
            env_or("DATABASE_MAX_CONNECTIONS", DEFAULT_DATABASE_MAX_CONNECTIONS);
        config.statement_timeout_secs =
            env_or("DATABASE_STATEMENT_TIMEOUT_SECS", DEFAULT_STATEMENT_TIMEOUT_SECS);
        config.access_token_minutes =
            env_or("JWT_ACCESS_EXPIRATION_MINUTES", DEFAULT_ACCESS_TOKEN_MINUTES);
        config.refresh_token_days = env_or("JWT_REFRESH_EXPIRATION_DAYS", DEFAULT_REFRESH_TOKEN_DAYS);
        config.admin_register_secret = env::var("ADMIN_REGISTER_SECRET")
            .ok()
            .filter(|secret| !secret.is_empty());
        config.allowed_origins = split_origins(
            &env::var("ALLOWED_ORIGINS").unwrap_or_else(|_| DEFAULT_ALLOWED_ORIGINS.to_string()),
        );
        config.loan_min_amount = env_or("LOAN_MIN_AMOUNT", DEFAULT_LOAN_MIN_AMOUNT);
        config.loan_max_amount = env_or("LOAN_MAX_AMOUNT", DEFAULT_LOAN_MAX_AMOUNT);
        config.stats_cache_ttl_seconds = env_or("STATS_CACHE_TTL_SECONDS", DEFAULT_CACHE_TTL_SECONDS);
        config.server_host =
            env::var("SERVER_HOST").unwrap_or_else(|_| DEFAULT_SERVER_HOST.to_string());
        config.server_port = env_or("SERVER_PORT", DEFAULT_SERVER_PORT);

        config
    }

    /// Set the shared secret that unlocks admin registration.
    pub fn with_admin_register_secret(mut self, secret: impl Into<String>) -> Self {
        self.admin_register_secret = Some(secret.into());
        self
    }

    /// Get JWT secret bytes for token signing/verification.
    pub fn jwt_secret_bytes(&self) -> &[u8] {
        self.jwt_secret.as_bytes()
    }

    /// Shared secret required by admin registration, if configured.
    pub fn admin_register_secret(&self) -> Option<&str> {
        self.admin_register_secret.as_deref()
    }

    /// Get the full server address.
    pub fn server_addr(&self) -> String {
        format!("{}:{}", self.server_host, self.server_port)
    }
}

fn env_or<T: FromStr>(key: &str, default: T) -> T {
    env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

fn split_origins(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|origin| !origin.is_empty())
        .map(String::from)
        .collect()
}
