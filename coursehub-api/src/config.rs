/// Configuration management for the API server
///
/// This module loads configuration from environment variables and provides
/// a type-safe configuration struct.
///
/// # Environment Variables
///
/// - `API_HOST`: Host to bind to (default: 0.0.0.0)
/// - `API_PORT`: Port to bind to (default: 8080)
/// - `CORS_ORIGINS`: Comma-separated allowed origins (default: *)
/// - `PRODUCTION`: Production mode flag (default: false)
/// - `DATABASE_URL`: PostgreSQL connection string (optional, in-memory store when unset)
/// - `DATABASE_MAX_CONNECTIONS`: Pool size (default: 10)
/// - `JWT_SECRET`: Secret key for JWT validation (required, at least 32 characters)
/// - `ASSET_ROOT`: Directory for uploaded files (default: ./data/assets)
/// - `ASSET_PUBLIC_URL`: Public URL prefix for uploaded files (default: /assets)
/// - `STORE_TIMEOUT_MS`: Per-call store timeout (default: 10000)
/// - `MAX_UPLOAD_BYTES`: Request body limit for uploads (default: 10 MiB)
/// - `RUST_LOG`: Log level (default: coursehub_api=debug,coursehub_shared=info,tower_http=debug)
///
/// # Example
///
/// ```no_run
/// use coursehub_api::config::Config;
///
/// # async fn example() -> anyhow::Result<()> {
/// let config = Config::from_env()?;
/// println!("Server will listen on {}:{}", config.api.host, config.api.port);
/// # Ok(())
/// # }
/// ```

use serde::{Deserialize, Serialize};
use std::env;
use std::str::FromStr;

/// Default request body limit for multipart uploads
pub const DEFAULT_MAX_UPLOAD_BYTES: usize = 10 * 1024 * 1024;

/// Minimum accepted JWT secret length
pub const MIN_JWT_SECRET_LENGTH: usize = 32;

/// Complete application configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// API server configuration
    pub api: ApiConfig,

    /// Database configuration (None runs on the in-memory store)
    pub database: Option<DatabaseConfig>,

    /// JWT configuration
    pub jwt: JwtConfig,

    /// Uploaded file storage
    pub assets: AssetConfig,

    /// Per-call store timeout in milliseconds
    pub store_timeout_ms: u64,
}

/// API server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    /// Host to bind to
    pub host: String,

    /// Port to bind to
    pub port: u16,

    /// Allowed CORS origins ("*" allows any)
    pub cors_origins: Vec<String>,

    /// Production mode (restricts CORS methods and credentials)
    pub production: bool,

    /// Maximum request body size in bytes
    pub max_upload_bytes: usize,
}

/// Database configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    /// PostgreSQL connection URL
    pub url: String,

    /// Maximum number of connections in pool
    pub max_connections: u32,
}

/// JWT configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JwtConfig {
    /// Secret key for JWT validation
    ///
    /// Generate with: `openssl rand -hex 32`
    pub secret: String,
}

/// Asset storage configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AssetConfig {
    /// Directory uploaded files are written under
    pub root: String,

    /// URL prefix files are served from
    pub public_url: String,
}

fn parse_var<T>(name: &str, default: T) -> anyhow::Result<T>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match env::var(name) {
        Ok(raw) => raw
            .trim()
            .parse::<T>()
            .map_err(|e| anyhow::anyhow!("{} has an invalid value '{}': {}", name, raw, e)),
        Err(_) => Ok(default),
    }
}

/// Splits a comma-separated origin list, ignoring blanks
fn parse_origins(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|origin| !origin.is_empty())
        .map(str::to_string)
        .collect()
}

impl Config {
    /// Loads configuration from environment variables
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - `JWT_SECRET` is missing or shorter than 32 characters
    /// - Environment variables have invalid values
    pub fn from_env() -> anyhow::Result<Self> {
        // Load .env file if present (for development)
        dotenvy::dotenv().ok();

        let host = env::var("API_HOST").unwrap_or_else(|_| "0.0.0.0".to_string());
        let port = parse_var("API_PORT", 8080u16)?;
        let cors_origins = parse_origins(&env::var("CORS_ORIGINS").unwrap_or_else(|_| "*".to_string()));
        let production = parse_var("PRODUCTION", false)?;
        let max_upload_bytes = parse_var("MAX_UPLOAD_BYTES", DEFAULT_MAX_UPLOAD_BYTES)?;

        let database = match env::var("DATABASE_URL") {
            Ok(url) if !url.trim().is_empty() => Some(DatabaseConfig {
                url,
                max_connections: parse_var("DATABASE_MAX_CONNECTIONS", 10u32)?,
            }),
            _ => None,
        };

        let jwt_secret = env::var("JWT_SECRET")
            .map_err(|_| anyhow::anyhow!("JWT_SECRET environment variable is required"))?;

        if jwt_secret.len() < MIN_JWT_SECRET_LENGTH {
            anyhow::bail!(
                "JWT_SECRET must be at least {} characters long",
                MIN_JWT_SECRET_LENGTH
            );
        }

        Ok(Self {
            api: ApiConfig {
                host,
                port,
                cors_origins,
                production,
                max_upload_bytes,
            },
            database,
            jwt: JwtConfig { secret: jwt_secret },
            assets: AssetConfig {
                root: env::var("ASSET_ROOT").unwrap_or_else(|_| "./data/assets".to_string()),
                public_url: env::var("ASSET_PUBLIC_URL").unwrap_or_else(|_| "/assets".to_string()),
            },
            store_timeout_ms: parse_var("STORE_TIMEOUT_MS", 10_000u64)?,
        })
    }

    /// Configuration for tests and local tooling
    pub fn for_testing(jwt_secret: impl Into<String>) -> Self {
        Self {
            api: ApiConfig {
                host: "127.0.0.1".to_string(),
                port: 0,
                cors_origins: vec!["*".to_string()],
                production: false,
                max_upload_bytes: DEFAULT_MAX_UPLOAD_BYTES,
            },
            database: None,
            jwt: JwtConfig {
                secret: jwt_secret.into(),
            },
            assets: AssetConfig {
                root: "./data/assets".to_string(),
                public_url: "/assets".to_string(),
            },
            store_timeout_ms: 10_000,
        }
    }

    /// Returns the server bind address
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.api.host, self.api.port)
    }
}
