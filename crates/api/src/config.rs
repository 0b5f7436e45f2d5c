//! Environment-driven configuration.

/// Process configuration, resolved once at startup.
#[derive(Debug, Clone)]
pub struct Config {
    /// Listen address for the HTTP server.
    pub bind_addr: String,
    /// Postgres connection string. When absent the process runs on the
    /// in-memory store (dev/test mode).
    pub database_url: Option<String>,
}

impl Config {
    pub fn from_env() -> Self {
        let bind_addr = std::env::var("BIND_ADDR").unwrap_or_else(|_| "0.0.0.0:8080".to_string());
        let database_url = std::env::var("DATABASE_URL").ok();
        if database_url.is_none() {
            tracing::warn!("DATABASE_URL not set; falling back to the in-memory store");
        }
        Self {
            bind_addr,
            database_url,
        }
    }
}
