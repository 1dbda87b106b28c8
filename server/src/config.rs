//! Configuration management for the raffle server.
//!
//! Loads configuration from environment variables with sensible defaults.
//! `main` calls [`dotenvy::dotenv`] first, so a `.env` file works too.
//!
//! # Variables
//!
//! | Variable | Default |
//! |---|---|
//! | `DATABASE_URL` | built from `DB_HOST`, `DB_PORT`, `DB_USER`, `DB_PASSWORD`, `DB_NAME`, `DB_SSLMODE` |
//! | `DATABASE_MAX_CONNECTIONS` / `DATABASE_MIN_CONNECTIONS` | 10 / 1 |
//! | `DATABASE_ACQUIRE_TIMEOUT` / `DATABASE_IDLE_TIMEOUT` (s) | 30 / 600 |
//! | `RUN_MIGRATIONS` | `true` |
//! | `HOST` | `0.0.0.0` |
//! | `API_PORT` (or `PORT`) | 8080 |
//! | `METRICS_HOST` / `METRICS_PORT` | `0.0.0.0` / 9090 |
//! | `SHUTDOWN_TIMEOUT` (s) | 30 |
//! | `CORS_ALLOWED_ORIGINS` | `*` (comma-separated list) |
//! | `JWT_SECRET` | required, at least 32 bytes |
//! | `JWT_TTL` (s) | 86400 |
//! | `JWT_ISSUER` | `raffle-api` |

use std::env;
use std::net::SocketAddr;
use std::time::Duration;

use raffle_auth::token::{DEFAULT_ISSUER, DEFAULT_TOKEN_TTL};
use raffle_postgres::DatabaseSettings;
use thiserror::Error;

/// Shortest accepted signing secret.
pub const MIN_JWT_SECRET_LEN: usize = 32;

/// Configuration errors.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    /// A required variable is not set.
    #[error("missing required environment variable {0}")]
    Missing(&'static str),

    /// A variable is set but unusable.
    #[error("invalid value for {name}: {reason}")]
    Invalid {
        /// Variable name
        name: &'static str,
        /// What is wrong with it
        reason: String,
    },
}

/// Application configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    /// `PostgreSQL` configuration
    pub database: DatabaseConfig,
    /// HTTP server configuration
    pub server: ServerConfig,
    /// Token configuration
    pub auth: AuthConfig,
}

/// `PostgreSQL` configuration
#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    /// Connection URL
    pub url: String,
    /// Maximum number of connections in the pool
    pub max_connections: u32,
    /// Minimum number of idle connections in the pool
    pub min_connections: u32,
    /// Connection acquire timeout in seconds
    pub acquire_timeout: u64,
    /// Idle timeout in seconds
    pub idle_timeout: u64,
    /// Apply embedded migrations at startup
    pub run_migrations: bool,
}

impl DatabaseConfig {
    /// Pool settings for [`raffle_postgres::PostgresStore::connect`].
    #[must_use]
    pub fn settings(&self) -> DatabaseSettings {
        DatabaseSettings {
            url: self.url.clone(),
            max_connections: self.max_connections,
            min_connections: self.min_connections,
            acquire_timeout: Duration::from_secs(self.acquire_timeout),
            idle_timeout: Duration::from_secs(self.idle_timeout),
        }
    }
}

/// Server configuration
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Host to bind to
    pub host: String,
    /// Port to bind to
    pub port: u16,
    /// Log filter used when `RUST_LOG` is unset
    pub log_level: String,
    /// Metrics server host (for Prometheus scraping)
    pub metrics_host: String,
    /// Metrics server port
    pub metrics_port: u16,
    /// Graceful shutdown timeout in seconds
    pub shutdown_timeout: u64,
    /// Allowed CORS origins; empty means any origin
    pub cors_allowed_origins: Vec<String>,
}

impl ServerConfig {
    /// API listen address.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] if `host:port` is not a socket address.
    pub fn bind_addr(&self) -> Result<SocketAddr, ConfigError> {
        socket_addr("HOST", &self.host, self.port)
    }

    /// Prometheus listen address.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] if `host:port` is not a socket address.
    pub fn metrics_addr(&self) -> Result<SocketAddr, ConfigError> {
        socket_addr("METRICS_HOST", &self.metrics_host, self.metrics_port)
    }
}

/// Token configuration
#[derive(Clone)]
pub struct AuthConfig {
    /// HS256 signing secret
    pub jwt_secret: String,
    /// Token lifetime in seconds
    pub token_ttl: i64,
    /// `iss` claim
    pub issuer: String,
}

impl std::fmt::Debug for AuthConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthConfig")
            .field("jwt_secret", &"<redacted>")
            .field("token_ttl", &self.token_ttl)
            .field("issuer", &self.issuer)
            .finish()
    }
}

impl Config {
    /// Load configuration from the process environment.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if `JWT_SECRET` is missing or too short, or a
    /// numeric variable does not parse.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Load configuration through `lookup`, which maps a variable name to its value.
    ///
    /// # Errors
    ///
    /// See [`Config::from_env`].
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let vars = Vars(&lookup);

        let jwt_secret = vars.get("JWT_SECRET").ok_or(ConfigError::Missing("JWT_SECRET"))?;
        if jwt_secret.len() < MIN_JWT_SECRET_LEN {
            return Err(ConfigError::Invalid {
                name: "JWT_SECRET",
                reason: format!("must be at least {MIN_JWT_SECRET_LEN} bytes"),
            });
        }

        let port = match vars.get("API_PORT") {
            Some(_) => vars.parse("API_PORT", 8080)?,
            None => vars.parse("PORT", 8080)?,
        };

        Ok(Self {
            database: DatabaseConfig {
                url: vars.get("DATABASE_URL").unwrap_or_else(|| database_url_from_parts(&vars)),
                max_connections: vars.parse("DATABASE_MAX_CONNECTIONS", 10)?,
                min_connections: vars.parse("DATABASE_MIN_CONNECTIONS", 1)?,
                acquire_timeout: vars.parse("DATABASE_ACQUIRE_TIMEOUT", 30)?,
                idle_timeout: vars.parse("DATABASE_IDLE_TIMEOUT", 600)?,
                run_migrations: vars.parse("RUN_MIGRATIONS", true)?,
            },
            server: ServerConfig {
                host: vars.get("HOST").unwrap_or_else(|| "0.0.0.0".to_string()),
                port,
                log_level: vars
                    .get("RUST_LOG")
                    .unwrap_or_else(|| "raffle_server=info,tower_http=debug".to_string()),
                metrics_host: vars.get("METRICS_HOST").unwrap_or_else(|| "0.0.0.0".to_string()),
                metrics_port: vars.parse("METRICS_PORT", 9090)?,
                shutdown_timeout: vars.parse("SHUTDOWN_TIMEOUT", 30)?,
                cors_allowed_origins: vars
                    .get("CORS_ALLOWED_ORIGINS")
                    .map(|origins| parse_origins(&origins))
                    .unwrap_or_default(),
            },
            auth: AuthConfig {
                jwt_secret,
                token_ttl: vars.parse("JWT_TTL", DEFAULT_TOKEN_TTL.num_seconds())?,
                issuer: vars.get("JWT_ISSUER").unwrap_or_else(|| DEFAULT_ISSUER.to_string()),
            },
        })
    }
}

struct Vars<'a, F>(&'a F);

impl<F: Fn(&str) -> Option<String>> Vars<'_, F> {
    fn get(&self, name: &str) -> Option<String> {
        (self.0)(name).filter(|value| !value.trim().is_empty())
    }

    fn parse<T>(&self, name: &'static str, default: T) -> Result<T, ConfigError>
    where
        T: std::str::FromStr,
        T::Err: std::fmt::Display,
    {
        self.get(name).map_or(Ok(default), |raw| {
            raw.trim().parse().map_err(|err: T::Err| ConfigError::Invalid {
                name,
                reason: err.to_string(),
            })
        })
    }
}

fn database_url_from_parts<F: Fn(&str) -> Option<String>>(vars: &Vars<'_, F>) -> String {
    let host = vars.get("DB_HOST").unwrap_or_else(|| "localhost".to_string());
    let port = vars.get("DB_PORT").unwrap_or_else(|| "5432".to_string());
    let user = vars.get("DB_USER").unwrap_or_else(|| "postgres".to_string());
    let password = vars.get("DB_PASSWORD").unwrap_or_else(|| "postgres".to_string());
    let name = vars.get("DB_NAME").unwrap_or_else(|| "raffle".to_string());
    let sslmode = vars.get("DB_SSLMODE").unwrap_or_else(|| "disable".to_string());
    format!(
        "postgres://{}:{}@{host}:{port}/{}?sslmode={}",
        urlencoding::encode(&user),
        urlencoding::encode(&password),
        urlencoding::encode(&name),
        urlencoding::encode(&sslmode),
    )
}

fn parse_origins(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|origin| !origin.is_empty() && *origin != "*")
        .map(str::to_string)
        .collect()
}

fn socket_addr(name: &'static str, host: &str, port: u16) -> Result<SocketAddr, ConfigError> {
    format!("{host}:{port}")
        .parse()
        .map_err(|err: std::net::AddrParseError| ConfigError::Invalid {
            name,
            reason: err.to_string(),
        })
}
