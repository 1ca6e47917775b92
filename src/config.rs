use std::str::FromStr;

use anyhow::Context;

const DEFAULT_DATABASE_URL: &str = "sqlite://rallypoint.db";
const DEFAULT_BIND_ADDR: &str = "0.0.0.0:8080";

/// Runtime settings, read from the environment (and `.env` when present).
#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub bind_addr: String,
    pub db_max_connections: u32,
    pub session_inactivity_minutes: i64,
    pub session_secure: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            database_url: DEFAULT_DATABASE_URL.to_owned(),
            bind_addr: DEFAULT_BIND_ADDR.to_owned(),
            db_max_connections: 16,
            session_inactivity_minutes: 60,
            session_secure: false,
        }
    }
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        dotenv::dotenv().ok();

        let defaults = Self::default();
        Ok(Self {
            database_url: dotenv::var("DATABASE_URL").unwrap_or(defaults.database_url),
            bind_addr: dotenv::var("BIND_ADDR").unwrap_or(defaults.bind_addr),
            db_max_connections: parsed("DB_MAX_CONNECTIONS", defaults.db_max_connections)?,
            session_inactivity_minutes: parsed(
                "SESSION_INACTIVITY_MINUTES",
                defaults.session_inactivity_minutes,
            )?,
            session_secure: parsed("SESSION_SECURE", defaults.session_secure)?,
        })
    }
}

fn parsed<T>(key: &str, default: T) -> anyhow::Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match dotenv::var(key) {
        Ok(raw) => raw
            .trim()
            .parse()
            .with_context(|| format!("{key} has an invalid value: {raw:?}")),
        Err(_) => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_usable_for_local_development() {
        let config = Config::default();
        assert_eq!(config.bind_addr, "0.0.0.0:8080");
        assert!(config.database_url.starts_with("sqlite://"));
        assert!(!config.session_secure);
    }

    #[test]
    fn unset_keys_fall_back() {
        let value: u32 = parsed("RALLYPOINT_SURELY_UNSET_KEY", 7).unwrap();
        assert_eq!(value, 7);
    }
}
