use std::collections::HashMap;
use thiserror::Error;

#[derive(Debug, Clone)]
pub struct Config {
    pub port: u16,
    pub database_path: String,
    /// Days between invoice date and due date for AR/AP invoices.
    pub invoice_net_terms_days: i64,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingEnv(String),
    #[error("Invalid value for {0}: {1}")]
    InvalidValue(String, String),
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_env_map(std::env::vars().collect())
    }

    pub fn from_env_map(env_map: HashMap<String, String>) -> Result<Self, ConfigError> {
        let port = env_map
            .get("PORT")
            .map(|s| s.as_str())
            .unwrap_or("8080")
            .parse::<u16>()
            .map_err(|_| {
                ConfigError::InvalidValue("PORT".to_string(), "must be a valid u16".to_string())
            })?;

        let database_path = env_map
            .get("DATABASE_PATH")
            .cloned()
            .ok_or_else(|| ConfigError::MissingEnv("DATABASE_PATH".to_string()))?;

        let invoice_net_terms_days = env_map
            .get("INVOICE_NET_TERMS_DAYS")
            .map(|s| s.as_str())
            .unwrap_or("30")
            .parse::<i64>()
            .map_err(|_| {
                ConfigError::InvalidValue(
                    "INVOICE_NET_TERMS_DAYS".to_string(),
                    "must be a valid i64".to_string(),
                )
            })?;
        if invoice_net_terms_days < 0 {
            return Err(ConfigError::InvalidValue(
                "INVOICE_NET_TERMS_DAYS".to_string(),
                "must be non-negative".to_string(),
            ));
        }

        Ok(Config {
            port,
            database_path,
            invoice_net_terms_days,
        })
    }
}
