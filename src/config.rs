// ABOUTME: Runtime configuration loaded from environment variables and an optional .env file
// ABOUTME: Covers bind address, database location, and session cookie behaviour

use anyhow::{Context, Result, bail};
use std::env;
use std::str::FromStr;

const DEFAULT_DATABASE_URL: &str = "sqlite:postboard.db?mode=rwc";
const DEFAULT_SESSION_MAX_AGE: i64 = 7 * 24 * 60 * 60; // 7 days
const DEFAULT_SWEEP_INTERVAL: u64 = 60 * 60;

#[derive(Debug, Clone)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub database_url: String,
    pub secure_cookies: bool,
    pub session_max_age_secs: i64,
    pub session_sweep_interval_secs: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 3000,
            database_url: DEFAULT_DATABASE_URL.to_string(),
            secure_cookies: false,
            session_max_age_secs: DEFAULT_SESSION_MAX_AGE,
            session_sweep_interval_secs: DEFAULT_SWEEP_INTERVAL,
        }
    }
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();
        let defaults = Self::default();

        let config = Self {
            host: env::var("HOST").unwrap_or(defaults.host),
            port: parse_var("PORT", defaults.port)?,
            database_url: env::var("DATABASE_URL").unwrap_or(defaults.database_url),
            secure_cookies: parse_var("SECURE_COOKIES", defaults.secure_cookies)?,
            session_max_age_secs: parse_var("SESSION_MAX_AGE_SECS", defaults.session_max_age_secs)?,
            session_sweep_interval_secs: parse_var(
                "SESSION_SWEEP_INTERVAL_SECS",
                defaults.session_sweep_interval_secs,
            )?,
        };
        config.validate()?;
        Ok(config)
    }

    /// Rejects values that parse but cannot work at runtime.
    pub fn validate(&self) -> Result<()> {
        if self.session_max_age_secs <= 0 {
            bail!(
                "SESSION_MAX_AGE_SECS must be positive, got {}",
                self.session_max_age_secs
            );
        }
        // tokio::time::interval panics on a zero period
        if self.session_sweep_interval_secs == 0 {
            bail!("SESSION_SWEEP_INTERVAL_SECS must be at least 1");
        }
        Ok(())
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

fn parse_var<T>(name: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match env::var(name) {
        Ok(raw) => raw
            .trim()
            .parse()
            .with_context(|| format!("invalid value for {}: {:?}", name, raw)),
        Err(_) => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_sane() {
        let config = Config::default();
        assert_eq!(config.bind_address(), "0.0.0.0:3000");
        assert!(!config.secure_cookies);
        assert_eq!(config.session_max_age_secs, 604800);
    }

    #[test]
    fn default_config_validates() {
        assert!(Config::default().validate().is_ok());
    }

    #[test]
    fn zero_sweep_interval_is_rejected() {
        let config = Config {
            session_sweep_interval_secs: 0,
            ..Config::default()
        };
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("SESSION_SWEEP_INTERVAL_SECS"));
    }

    #[test]
    fn negative_session_max_age_is_rejected() {
        let config = Config {
            session_max_age_secs: -5,
            ..Config::default()
        };
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("SESSION_MAX_AGE_SECS"));
    }

    #[test]
    fn parse_var_falls_back_when_unset() {
        let port: u16 = parse_var("POSTBOARD_TEST_UNSET_VAR", 8080).unwrap();
        assert_eq!(port, 8080);
    }
}
