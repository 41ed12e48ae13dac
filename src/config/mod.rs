use anyhow::{bail, Result};
use dotenvy::dotenv;
use serde::Deserialize;

/// Configuration for the application
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    /// Database connection URL
    pub database_url: String,

    /// HMAC secret used to sign bearer tokens
    pub jwt_secret: String,

    /// Address the HTTP server listens on
    #[serde(default = "default_bind_addr")]
    pub bind_addr: String,

    /// Token lifetime in seconds
    #[serde(default = "default_jwt_expire_secs")]
    pub jwt_expire_secs: i64,

    #[serde(default = "default_db_max_connections")]
    pub db_max_connections: u32,

    /// Origins the browser frontend is served from
    #[serde(default = "default_allowed_origins")]
    pub allowed_origins: Vec<String>,

    /// Requests one client may send per rate-limit window
    #[serde(default = "default_rate_limit_max")]
    pub rate_limit_max: u32,

    #[serde(default = "default_rate_limit_window_secs")]
    pub rate_limit_window_secs: u64,
}

fn default_bind_addr() -> String {
    "0.0.0.0:3001".to_string()
}

fn default_jwt_expire_secs() -> i64 {
    24 * 60 * 60
}

fn default_db_max_connections() -> u32 {
    5
}

fn default_allowed_origins() -> Vec<String> {
    vec!["http://localhost:3000".to_string()]
}

fn default_rate_limit_max() -> u32 {
    100
}

fn default_rate_limit_window_secs() -> u64 {
    15 * 60
}

impl Config {
    /// Load configuration from environment variables
    ///
    /// This function will:
    /// 1. Load variables from .env file if it exists
    /// 2. Deserialize environment variables into Config struct
    /// 3. Reject values the server cannot run with
    pub fn load() -> Result<Self> {
        // Load .env file if it exists
        dotenv().ok();

        // Parse environment variables into Config struct
        let config = envy::from_env::<Config>()?;
        config.validate()?;

        Ok(config)
    }

    /// Build a configuration from explicit key/value pairs
    pub fn from_vars<I>(vars: I) -> Result<Self>
    where
        I: IntoIterator<Item = (String, String)>,
    {
        let config = envy::from_iter::<_, Config>(vars)?;
        config.validate()?;

        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.database_url.trim().is_empty() {
            bail!("DATABASE_URL is empty");
        }
        if self.jwt_secret.trim().is_empty() {
            bail!("JWT_SECRET is empty");
        }
        if self.jwt_expire_secs <= 0 {
            bail!("JWT_EXPIRE_SECS must be positive");
        }
        if self.db_max_connections == 0 {
            bail!("DB_MAX_CONNECTIONS must be at least 1");
        }
        if self.rate_limit_max == 0 || self.rate_limit_window_secs == 0 {
            bail!("RATE_LIMIT_MAX and RATE_LIMIT_WINDOW_SECS must be positive");
        }

        Ok(())
    }

    /// Get a direct reference to the database URL
    pub fn database_url(&self) -> &str {
        &self.database_url
    }
}

/// Initialize environment variables and load configuration
pub fn init() -> Result<Config> {
    Config::load()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vars(pairs: &[(&str, &str)]) -> Vec<(String, String)> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn defaults_apply_when_optional_vars_are_missing() {
        let config = Config::from_vars(vars(&[
            ("DATABASE_URL", "postgres://localhost/tracker"),
            ("JWT_SECRET", "s3cret"),
        ]))
        .unwrap();

        assert_eq!(config.database_url(), "postgres://localhost/tracker");
        assert_eq!(config.bind_addr, "0.0.0.0:3001");
        assert_eq!(config.jwt_expire_secs, 86400);
        assert_eq!(config.db_max_connections, 5);
        assert_eq!(config.allowed_origins, vec!["http://localhost:3000"]);
        assert_eq!(config.rate_limit_max, 100);
        assert_eq!(config.rate_limit_window_secs, 900);
    }

    #[test]
    fn allowed_origins_split_on_commas() {
        let config = Config::from_vars(vars(&[
            ("DATABASE_URL", "postgres://localhost/tracker"),
            ("JWT_SECRET", "s3cret"),
            ("ALLOWED_ORIGINS", "http://a.test,http://b.test"),
        ]))
        .unwrap();

        assert_eq!(config.allowed_origins, vec!["http://a.test", "http://b.test"]);
    }

    #[test]
    fn missing_secret_is_an_error() {
        let err = Config::from_vars(vars(&[("DATABASE_URL", "postgres://localhost/tracker")]));
        assert!(err.is_err());
    }

    #[test]
    fn blank_secret_is_rejected() {
        let err = Config::from_vars(vars(&[
            ("DATABASE_URL", "postgres://localhost/tracker"),
            ("JWT_SECRET", "   "),
        ]));
        assert!(err.is_err());
    }

    #[test]
    fn zero_pool_size_is_rejected() {
        let err = Config::from_vars(vars(&[
            ("DATABASE_URL", "postgres://localhost/tracker"),
            ("JWT_SECRET", "s3cret"),
            ("DB_MAX_CONNECTIONS", "0"),
        ]));
        assert!(err.is_err());
    }

    #[test]
    fn zero_rate_limit_is_rejected() {
        let err = Config::from_vars(vars(&[
            ("DATABASE_URL", "postgres://localhost/tracker"),
            ("JWT_SECRET", "s3cret"),
            ("RATE_LIMIT_MAX", "0"),
        ]));
        assert!(err.is_err());
    }
}
