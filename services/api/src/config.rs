//! Service configuration read from the environment at startup

use std::env;
use todo_auth::{HasherConfig, JwtConfig};
use todo_common::{DatabaseConfig, DatabaseResult};

/// Browser origins allowed during local frontend development
pub const DEFAULT_CORS_ORIGINS: &[&str] = &[
    "http://localhost:3000",
    "http://localhost:3001",
    "http://localhost:3002",
    "http://localhost:3003",
    "http://localhost:5173",
    "http://127.0.0.1:3000",
    "http://127.0.0.1:3001",
    "http://127.0.0.1:3002",
    "http://127.0.0.1:3003",
    "http://127.0.0.1:5173",
];

/// Everything the binary needs to start serving
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub host: String,
    pub port: u16,
    pub database: DatabaseConfig,
    pub jwt: JwtConfig,
    pub hasher: HasherConfig,
    pub cors_origins: Vec<String>,
}

impl AppConfig {
    /// Create a new AppConfig from environment variables
    ///
    /// # Environment Variables
    /// - `HOST`: Listen address (default: "0.0.0.0")
    /// - `PORT`: Listen port (default: 8001)
    /// - `CORS_ORIGINS`: Comma-separated origins added to the development defaults
    ///
    /// Database, token and hasher settings are read by their own configs.
    pub fn from_env() -> DatabaseResult<Self> {
        let host = env::var("HOST")
            .ok()
            .filter(|h| !h.trim().is_empty())
            .unwrap_or_else(|| "0.0.0.0".to_string());

        let port = env::var("PORT")
            .ok()
            .and_then(|p| p.parse().ok())
            .unwrap_or(8001);

        let extra_origins = env::var("CORS_ORIGINS").ok();

        Ok(Self {
            host,
            port,
            database: DatabaseConfig::from_env()?,
            jwt: JwtConfig::from_env(),
            hasher: HasherConfig::from_env(),
            cors_origins: build_allowed_origins(extra_origins.as_deref()),
        })
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// Development origins followed by the comma-separated `extra` ones
///
/// Blank entries are dropped and duplicates keep their first position.
pub fn build_allowed_origins(extra: Option<&str>) -> Vec<String> {
    let mut origins: Vec<String> = Vec::new();

    let configured = extra.unwrap_or_default().split(',').map(str::trim);
    for origin in DEFAULT_CORS_ORIGINS.iter().copied().chain(configured) {
        if origin.is_empty() || origins.iter().any(|o| o == origin) {
            continue;
        }
        origins.push(origin.to_string());
    }

    origins
}
