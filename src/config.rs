//! Environment-driven configuration.
//!
//! Every value has a development default so the service starts with no
//! environment set. Use a strong `JWT_SECRET` in production.

/// Runtime configuration, read once at startup.
#[derive(Debug, Clone)]
pub struct Config {
    /// Bind address for the HTTP server.
    pub host: String,
    pub port: u16,
    /// Path to the SQLite database file.
    pub database_path: String,
    /// Shared secret for verifying user-service JWTs (HS256).
    pub jwt_secret: String,
    /// Base URL of the user service that issues tokens. Kept for deployment
    /// wiring; tokens are verified locally with the shared secret.
    pub user_service_url: String,
}

impl Config {
    /// Load configuration from the environment.
    ///
    /// - `HOST` / `PORT` - listen address (defaults `0.0.0.0:5000`)
    /// - `DATABASE_PATH` - SQLite file path (defaults `tasks.db`)
    /// - `JWT_SECRET` - shared token-signing secret
    /// - `USER_SERVICE_URL` - address of the identity service
    pub fn from_env() -> Self {
        Self {
            host: env_or("HOST", "0.0.0.0"),
            port: std::env::var("PORT")
                .ok()
                .and_then(|p| p.parse().ok())
                .unwrap_or(5000),
            database_path: env_or("DATABASE_PATH", "tasks.db"),
            jwt_secret: env_or("JWT_SECRET", "your-secret-key"),
            user_service_url: env_or("USER_SERVICE_URL", "http://user-service"),
        }
    }
}

fn env_or(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}
