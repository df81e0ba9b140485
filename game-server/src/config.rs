use std::env;
use std::str::FromStr;
use std::time::Duration;

/// `DATABASE_URL` value that selects the process-local store.
pub const MEMORY_DATABASE: &str = "memory";

#[derive(Debug, thiserror::Error, PartialEq)]
pub enum ConfigError {
    #[error("Invalid {name}: {value:?}")]
    Invalid { name: &'static str, value: String },
    #[error("{name} must be greater than zero")]
    Zero { name: &'static str },
}

#[derive(Debug, Clone)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub database_url: String,
    pub poll_interval_ms: u64,
    pub keepalive_seconds: u64,
    pub offer_count: usize,
    pub create_attempts: u32,
    pub game_idle_timeout_minutes: u64,
    pub cleanup_interval_seconds: u64,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Builds a config from an arbitrary variable source. Unset variables
    /// take their defaults; set but malformed ones are an error.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();

        let config = Self {
            host: lookup("HOST").unwrap_or(defaults.host),
            port: parse_var(&lookup, "PORT", defaults.port)?,
            database_url: lookup("DATABASE_URL").unwrap_or(defaults.database_url),
            poll_interval_ms: parse_positive(&lookup, "POLL_INTERVAL_MS", defaults.poll_interval_ms)?,
            keepalive_seconds: parse_positive(
                &lookup,
                "KEEPALIVE_SECONDS",
                defaults.keepalive_seconds,
            )?,
            offer_count: parse_var(&lookup, "OFFER_COUNT", defaults.offer_count)?,
            create_attempts: parse_positive(&lookup, "CREATE_ATTEMPTS", defaults.create_attempts)?,
            game_idle_timeout_minutes: parse_var(
                &lookup,
                "GAME_IDLE_TIMEOUT_MINUTES",
                defaults.game_idle_timeout_minutes,
            )?,
            cleanup_interval_seconds: parse_positive(
                &lookup,
                "CLEANUP_INTERVAL_SECONDS",
                defaults.cleanup_interval_seconds,
            )?,
        };

        if config.game_idle_timeout_minutes.checked_mul(60).is_none() {
            return Err(ConfigError::Invalid {
                name: "GAME_IDLE_TIMEOUT_MINUTES",
                value: config.game_idle_timeout_minutes.to_string(),
            });
        }

        Ok(config)
    }

    pub fn uses_memory_store(&self) -> bool {
        self.database_url == MEMORY_DATABASE
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn keepalive_interval(&self) -> Duration {
        Duration::from_secs(self.keepalive_seconds)
    }

    pub fn game_idle_timeout(&self) -> Duration {
        Duration::from_secs(self.game_idle_timeout_minutes.saturating_mul(60))
    }

    pub fn cleanup_interval(&self) -> Duration {
        Duration::from_secs(self.cleanup_interval_seconds)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8080,
            database_url: "sqlite://stamp_arena.db?mode=rwc".to_string(),
            poll_interval_ms: 1000,
            keepalive_seconds: 30,
            offer_count: 5,
            create_attempts: 5,
            game_idle_timeout_minutes: 120,
            cleanup_interval_seconds: 30,
        }
    }
}

fn parse_var<F, T>(lookup: &F, name: &'static str, default: T) -> Result<T, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
{
    match lookup(name) {
        Some(value) => value
            .trim()
            .parse()
            .map_err(|_| ConfigError::Invalid { name, value }),
        None => Ok(default),
    }
}

/// Intervals and attempt counts of zero would stall the server.
fn parse_positive<F, T>(lookup: &F, name: &'static str, default: T) -> Result<T, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr + PartialEq + Default,
{
    let value = parse_var(lookup, name, default)?;
    if value == T::default() {
        return Err(ConfigError::Zero { name });
    }
    Ok(value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(name, value)| (name.to_string(), value.to_string()))
            .collect();
        move |name| vars.get(name).cloned()
    }

    #[test]
    fn test_defaults_when_unset() {
        let config = Config::from_lookup(lookup_from(&[])).unwrap();

        assert_eq!(config.port, 8080);
        assert_eq!(config.poll_interval(), Duration::from_secs(1));
        assert_eq!(config.keepalive_interval(), Duration::from_secs(30));
        assert_eq!(config.offer_count, 5);
        assert_eq!(config.create_attempts, 5);
        assert_eq!(config.game_idle_timeout(), Duration::from_secs(7200));
        assert!(!config.uses_memory_store());
    }

    #[test]
    fn test_overrides() {
        let config = Config::from_lookup(lookup_from(&[
            ("HOST", "0.0.0.0"),
            ("PORT", "9000"),
            ("DATABASE_URL", "memory"),
            ("POLL_INTERVAL_MS", "250"),
        ]))
        .unwrap();

        assert_eq!(config.host, "0.0.0.0");
        assert_eq!(config.port, 9000);
        assert!(config.uses_memory_store());
        assert_eq!(config.poll_interval(), Duration::from_millis(250));
    }

    #[test]
    fn test_malformed_value_is_rejected() {
        let result = Config::from_lookup(lookup_from(&[("PORT", "eighty")]));
        assert_eq!(
            result.unwrap_err(),
            ConfigError::Invalid {
                name: "PORT",
                value: "eighty".to_string()
            }
        );
    }

    #[test]
    fn test_zero_interval_is_rejected() {
        let result = Config::from_lookup(lookup_from(&[("KEEPALIVE_SECONDS", "0")]));
        assert_eq!(
            result.unwrap_err(),
            ConfigError::Zero {
                name: "KEEPALIVE_SECONDS"
            }
        );
    }

    #[test]
    fn test_idle_timeout_overflow_is_rejected() {
        let huge = u64::MAX.to_string();
        let result = Config::from_lookup(lookup_from(&[("GAME_IDLE_TIMEOUT_MINUTES", huge.as_str())]));
        assert_eq!(
            result.unwrap_err(),
            ConfigError::Invalid {
                name: "GAME_IDLE_TIMEOUT_MINUTES",
                value: huge
            }
        );

        let config = Config {
            game_idle_timeout_minutes: u64::MAX,
            ..Config::default()
        };
        assert_eq!(config.game_idle_timeout(), Duration::from_secs(u64::MAX));
    }
}
