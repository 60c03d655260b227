use std::env;
use std::str::FromStr;
use std::time::Duration;

use anyhow::{Context, Result};
use dotenvy::dotenv;

use crate::leave::LeaveSettings;

#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub jwt_secret: String,
    pub server_addr: String,
    pub db_max_connections: u32,

    // Rate limiting
    pub rate_protected_per_min: u32,

    pub api_prefix: String,

    // Logging
    pub log_dir: String,
    pub log_level: tracing::Level,

    pub leave_type_cache_ttl_secs: u64,
    pub substitute_leave_code: String,
}

fn required(key: &str) -> Result<String> {
    env::var(key).with_context(|| format!("{key} must be set"))
}

fn or_default<T>(key: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse()
            .with_context(|| format!("{key} has an invalid value: '{raw}'")),
        Err(_) => Ok(default),
    }
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenv().ok();

        let log_level: String = or_default("LOG_LEVEL", "debug".to_string())?;

        Ok(Self {
            server_addr: required("SERVER_ADDR")?,
            database_url: required("DATABASE_URL")?,
            jwt_secret: required("JWT_SECRET")?,
            db_max_connections: or_default("DB_MAX_CONNECTIONS", 10)?,

            rate_protected_per_min: or_default("RATE_PROTECTED_PER_MIN", 1000)?,

            api_prefix: or_default("API_PREFIX", "/api".to_string())?,

            log_dir: or_default("LOG_DIR", "logs".to_string())?,
            log_level: tracing::Level::from_str(&log_level)
                .map_err(|_| anyhow::anyhow!("LOG_LEVEL has an invalid value: '{log_level}'"))?,

            leave_type_cache_ttl_secs: or_default("LEAVE_TYPE_CACHE_TTL_SECS", 300)?,
            substitute_leave_code: or_default("SUBSTITUTE_LEAVE_CODE", "substitute".to_string())?,
        })
    }

    pub fn leave_settings(&self) -> LeaveSettings {
        LeaveSettings {
            substitute_code: self.substitute_leave_code.clone(),
            leave_type_cache_ttl: Duration::from_secs(self.leave_type_cache_ttl_secs),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_or_default_falls_back_when_unset() {
        let value: u32 = or_default("HRM_LEAVE_TEST_UNSET_VARIABLE", 42).unwrap();
        assert_eq!(value, 42);
    }

    #[test]
    fn test_required_names_the_variable() {
        let err = required("HRM_LEAVE_TEST_MISSING_VARIABLE").unwrap_err();
        assert!(err.to_string().contains("HRM_LEAVE_TEST_MISSING_VARIABLE"));
    }
}
