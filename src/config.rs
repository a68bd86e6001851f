use anyhow::{ensure, Context};
use serde::Deserialize;

/// Upper bound for `JWT_TTL_MINUTES`: one year.
pub const MAX_JWT_TTL_MINUTES: i64 = 60 * 24 * 365;

pub const DEFAULT_FRONTEND_URL: &str = "http://localhost:3000";

#[derive(Debug, Clone, Deserialize)]
pub struct JwtConfig {
    pub secret: String,
    pub issuer: String,
    pub audience: String,
    pub ttl_minutes: i64,
}

/// Argon2 work factor.
#[derive(Debug, Clone, Copy, Deserialize)]
pub struct HashConfig {
    pub time_cost: u32,
    pub memory_kib: u32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DbConfig {
    pub url: String,
    pub max_connections: u32,
    pub acquire_timeout_secs: u64,
    pub statement_timeout_ms: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub host: String,
    pub port: u16,
    pub frontend_url: String,
    pub db: DbConfig,
    pub jwt: JwtConfig,
    pub hash: HashConfig,
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        let db = DbConfig {
            url: std::env::var("DATABASE_URL").context("DATABASE_URL must be set")?,
            max_connections: env_or("DB_MAX_CONNECTIONS", 10),
            acquire_timeout_secs: env_or("DB_ACQUIRE_TIMEOUT_SECS", 5),
            statement_timeout_ms: env_or("DB_STATEMENT_TIMEOUT_MS", 5_000),
        };
        let jwt = JwtConfig {
            secret: std::env::var("JWT_SECRET").context("JWT_SECRET must be set")?,
            issuer: std::env::var("JWT_ISSUER").unwrap_or_else(|_| "tasktrack".into()),
            audience: std::env::var("JWT_AUDIENCE").unwrap_or_else(|_| "tasktrack-users".into()),
            ttl_minutes: env_or("JWT_TTL_MINUTES", 60 * 24 * 7),
        };
        jwt.validate()?;
        let hash = HashConfig {
            time_cost: env_or("HASH_TIME_COST", 2),
            memory_kib: env_or("HASH_MEMORY_KIB", 19_456),
        };
        Ok(Self {
            host: std::env::var("APP_HOST").unwrap_or_else(|_| "0.0.0.0".into()),
            port: env_or("APP_PORT", 3001),
            frontend_url: frontend_origin(std::env::var("FRONTEND_URL").ok()),
            db,
            jwt,
            hash,
        })
    }
}

impl JwtConfig {
    pub fn validate(&self) -> anyhow::Result<()> {
        ensure!(
            (1..=MAX_JWT_TTL_MINUTES).contains(&self.ttl_minutes),
            "JWT_TTL_MINUTES must be between 1 and {MAX_JWT_TTL_MINUTES}, got {}",
            self.ttl_minutes
        );
        Ok(())
    }
}

fn frontend_origin(raw: Option<String>) -> String {
    raw.map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .unwrap_or_else(|| DEFAULT_FRONTEND_URL.to_string())
}

/// Reads and parses an env var, falling back to `default` when absent or unparsable.
fn env_or<T: std::str::FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|v| v.trim().parse::<T>().ok())
        .unwrap_or(default)
}
