use std::path::PathBuf;
use std::time::Duration;

use crate::error::{ClientError, Result};

pub const DEFAULT_API_BASE: &str = "http://localhost:5000/api";
pub const DEFAULT_TOKEN_PATH: &str = ".ecoaction/session.json";
const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Where the API lives and where the session token is kept.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub api_base: String,
    pub token_path: PathBuf,
    pub timeout: Duration,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            api_base: DEFAULT_API_BASE.to_string(),
            token_path: PathBuf::from(DEFAULT_TOKEN_PATH),
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
        }
    }
}

impl ClientConfig {
    /// Read configuration from the environment, loading `.env` if present.
    pub fn from_env() -> Result<Self> {
        let _ = dotenvy::dotenv();

        let api_base =
            std::env::var("ECOACTION_API_BASE").unwrap_or_else(|_| DEFAULT_API_BASE.into());
        let token_path: PathBuf = std::env::var("ECOACTION_TOKEN_PATH")
            .unwrap_or_else(|_| DEFAULT_TOKEN_PATH.into())
            .into();
        let timeout_secs: u64 = match std::env::var("ECOACTION_HTTP_TIMEOUT_SECS") {
            Ok(raw) => raw.parse().map_err(|_| {
                ClientError::Config(format!("ECOACTION_HTTP_TIMEOUT_SECS is not a number: {}", raw))
            })?,
            Err(_) => DEFAULT_TIMEOUT_SECS,
        };

        Ok(Self::new(api_base)
            .with_token_path(token_path)
            .with_timeout(Duration::from_secs(timeout_secs)))
    }

    pub fn new(api_base: impl Into<String>) -> Self {
        Self {
            api_base: normalize_base(&api_base.into()),
            ..Self::default()
        }
    }

    pub fn with_token_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.token_path = path.into();
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

fn normalize_base(raw: &str) -> String {
    raw.trim().trim_end_matches('/').to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn trailing_slashes_are_trimmed() {
        let config = ClientConfig::new("https://api.example.org/api//");
        assert_eq!(config.api_base, "https://api.example.org/api");
    }

    #[test]
    fn defaults_point_at_local_backend() {
        let config = ClientConfig::default();
        assert_eq!(config.api_base, DEFAULT_API_BASE);
        assert_eq!(config.timeout, Duration::from_secs(30));
    }
}
