use std::env;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{0} must be set in environment")]
    Missing(&'static str),

    #[error("PORT must be a number, got '{0}'")]
    InvalidPort(String),
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub host: String,
    pub port: u16,
    pub database_url: String,
    pub backend_url: String,
    pub backend_anon_key: String,
    pub password_reset_redirect: String,
    pub review_photo_bucket: String,
}

impl AppConfig {
    /// Reads the process environment; call `dotenv::dotenv()` first to pick up `.env`.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let required = |key: &'static str| {
            lookup(key)
                .filter(|value| !value.trim().is_empty())
                .ok_or(ConfigError::Missing(key))
        };

        let port = match lookup("PORT") {
            Some(raw) => raw
                .parse::<u16>()
                .map_err(|_| ConfigError::InvalidPort(raw))?,
            None => 8082,
        };

        Ok(Self {
            host: lookup("HOST").unwrap_or_else(|| "127.0.0.1".to_string()),
            port,
            database_url: required("DATABASE_URL")?,
            backend_url: required("BACKEND_URL")?,
            backend_anon_key: required("BACKEND_ANON_KEY")?,
            password_reset_redirect: lookup("PASSWORD_RESET_REDIRECT")
                .unwrap_or_else(|| "directory://reset-password".to_string()),
            review_photo_bucket: lookup("REVIEW_PHOTO_BUCKET")
                .unwrap_or_else(|| "review-photos".to_string()),
        })
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}
