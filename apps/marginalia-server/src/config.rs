//! Configuration management for the Marginalia server

use serde::Deserialize;
use std::env;
use std::path::PathBuf;
use uuid::Uuid;

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub server: ServerConfig,
    pub review: ReviewConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ReviewConfig {
    /// Users with edit authority
    pub editors: Vec<Uuid>,
    /// JSON file with the initial content blocks
    pub seed_path: Option<PathBuf>,
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("invalid SERVER_PORT: {0}")]
    Port(String),

    #[error("invalid editor id in REVIEW_EDITORS: {0}")]
    Editor(String),
}

impl Default for Config {
    fn default() -> Self {
        Config {
            server: ServerConfig {
                host: "0.0.0.0".to_string(),
                port: 3000,
            },
            review: ReviewConfig {
                editors: Vec::new(),
                seed_path: None,
            },
        }
    }
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        let port = match env::var("SERVER_PORT") {
            Ok(raw) => raw.parse().map_err(|_| ConfigError::Port(raw))?,
            Err(_) => 3000,
        };

        Ok(Config {
            server: ServerConfig {
                host: env::var("SERVER_HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
                port,
            },
            review: ReviewConfig {
                editors: parse_editors(&env::var("REVIEW_EDITORS").unwrap_or_default())?,
                seed_path: env::var("CONTENT_SEED").ok().map(PathBuf::from),
            },
        })
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }
}

/// Comma-separated user ids; blanks are skipped
fn parse_editors(raw: &str) -> Result<Vec<Uuid>, ConfigError> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|s| Uuid::parse_str(s).map_err(|_| ConfigError::Editor(s.to_string())))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_editors() {
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();
        let parsed = parse_editors(&format!(" {}, ,{} ", a, b)).unwrap();
        assert_eq!(parsed, vec![a, b]);
        assert!(parse_editors("").unwrap().is_empty());
        assert!(matches!(parse_editors("nope"), Err(ConfigError::Editor(_))));
    }

    #[test]
    fn test_default_bind_address() {
        assert_eq!(Config::default().bind_address(), "0.0.0.0:3000");
    }
}
