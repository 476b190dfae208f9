//! Runtime configuration read from the environment (and `.env` in development).

use std::net::SocketAddr;
use std::path::PathBuf;
use std::str::FromStr;

use chrono::Duration;
use thiserror::Error;
use tracing::warn;

use tourbook_auth::password::DEFAULT_BCRYPT_COST;

const DEV_JWT_SECRET: &str = "dev-secret-change-me";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Environment {
    #[default]
    Development,
    Production,
}

impl Environment {
    pub fn is_production(&self) -> bool {
        matches!(self, Self::Production)
    }
}

impl FromStr for Environment {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "development" | "dev" => Ok(Self::Development),
            "production" | "prod" => Ok(Self::Production),
            other => Err(format!("unknown environment {other:?}")),
        }
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("invalid {key}={value:?}: {reason}")]
    Invalid {
        key: &'static str,
        value: String,
        reason: String,
    },

    #[error("JWT_SECRET must be set in production")]
    MissingSecret,
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub environment: Environment,
    pub bind_addr: SocketAddr,
    pub jwt_secret: String,
    pub jwt_expires_in: Duration,
    pub jwt_cookie_expires_in: Duration,
    /// Postgres store when set; in-memory otherwise.
    pub database_url: Option<String>,
    pub public_dir: PathBuf,
    pub seed_dir: Option<PathBuf>,
    pub rate_limit_per_minute: u32,
    pub body_limit_bytes: usize,
    pub bcrypt_cost: u32,
    pub mail_from: String,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            environment: Environment::Development,
            bind_addr: SocketAddr::from(([0, 0, 0, 0], 8000)),
            jwt_secret: DEV_JWT_SECRET.to_string(),
            jwt_expires_in: Duration::days(90),
            jwt_cookie_expires_in: Duration::days(90),
            database_url: None,
            public_dir: PathBuf::from("public"),
            seed_dir: None,
            rate_limit_per_minute: 100,
            body_limit_bytes: 10 * 1024,
            bcrypt_cost: DEFAULT_BCRYPT_COST,
            mail_from: "Tourbook <hello@tourbook.io>".to_string(),
        }
    }
}

impl AppConfig {
    /// Load `.env` if present, then read the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        let _ = dotenvy::dotenv();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let defaults = Self::default();
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let environment = parse_or(&get, "APP_ENV", defaults.environment)?;
        let jwt_secret = match get("JWT_SECRET") {
            Some(secret) => secret,
            None if environment.is_production() => return Err(ConfigError::MissingSecret),
            None => {
                warn!("JWT_SECRET not set; using insecure dev default");
                defaults.jwt_secret
            }
        };

        Ok(Self {
            environment,
            bind_addr: parse_or(&get, "BIND_ADDR", defaults.bind_addr)?,
            jwt_secret,
            jwt_expires_in: Duration::days(parse_or(&get, "JWT_EXPIRES_IN", 90_i64)?),
            jwt_cookie_expires_in: Duration::days(parse_or(&get, "JWT_COOKIE_EXPIRES_IN", 90_i64)?),
            database_url: get("DATABASE_URL"),
            public_dir: get("PUBLIC_DIR").map(PathBuf::from).unwrap_or(defaults.public_dir),
            seed_dir: get("SEED_DIR").map(PathBuf::from),
            rate_limit_per_minute: parse_or(&get, "RATE_LIMIT_PER_MINUTE", defaults.rate_limit_per_minute)?,
            body_limit_bytes: parse_or(&get, "BODY_LIMIT_BYTES", defaults.body_limit_bytes)?,
            bcrypt_cost: parse_or(&get, "BCRYPT_COST", defaults.bcrypt_cost)?,
            mail_from: get("MAIL_FROM").unwrap_or(defaults.mail_from),
        })
    }
}

fn parse_or<T>(
    get: &impl Fn(&str) -> Option<String>,
    key: &'static str,
    default: T,
) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match get(key) {
        None => Ok(default),
        Some(raw) => raw.trim().parse().map_err(|e: T::Err| ConfigError::Invalid {
            key,
            value: raw.clone(),
            reason: e.to_string(),
        }),
    }
}
