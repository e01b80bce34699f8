//! Configuration module - environment variable parsing

use std::env;
use std::net::SocketAddr;
use std::str::FromStr;
use std::time::Duration;

/// Application configuration loaded from environment variables
#[derive(Clone, Debug)]
pub struct Config {
    /// Server binding address
    pub server_addr: SocketAddr,
    /// Log level (trace, debug, info, warn, error)
    pub log_level: String,
    /// Allowed client origins for CORS; any origin when empty
    pub client_origins: Vec<String>,
    /// Game timing and generation knobs
    pub game: GameSettings,
}

/// Per-session timing and map generation settings
#[derive(Clone, Debug, PartialEq)]
pub struct GameSettings {
    /// Delay between the start announcement and activation
    pub countdown: Duration,
    /// Period of the `GameUpdate` broadcast
    pub game_update: Duration,
    /// Period of each control point evaluation
    pub objective_tick: Duration,
    /// Time before a collected pickup reappears
    pub pickup_respawn: Duration,
    /// Draws allowed per control point before placement gives up
    pub max_placement_attempts: usize,
    /// Fixed seed for reproducible maps and team assignment
    pub rng_seed: Option<u64>,
}

impl Default for GameSettings {
    fn default() -> Self {
        Self {
            countdown: Duration::from_secs(5),
            game_update: Duration::from_millis(1000),
            objective_tick: Duration::from_millis(1000),
            pickup_respawn: Duration::from_secs(30),
            max_placement_attempts: 500,
            rng_seed: None,
        }
    }
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self, ConfigError> {
        // Render provides PORT env var, fall back to SERVER_ADDR or default
        let server_addr = if let Ok(port) = env::var("PORT") {
            format!("0.0.0.0:{}", port)
        } else {
            env::var("SERVER_ADDR").unwrap_or_else(|_| "0.0.0.0:8080".to_string())
        };

        let client_origins = env::var("CLIENT_ORIGIN")
            .map(|origins| {
                origins
                    .split(',')
                    .map(str::trim)
                    .filter(|o| !o.is_empty())
                    .map(String::from)
                    .collect()
            })
            .unwrap_or_default();

        Ok(Self {
            server_addr: server_addr
                .parse()
                .map_err(|_| ConfigError::InvalidAddress)?,

            log_level: env::var("LOG_LEVEL").unwrap_or_else(|_| "info".to_string()),

            client_origins,

            game: GameSettings::from_env()?,
        })
    }
}

impl GameSettings {
    pub fn from_env() -> Result<Self, ConfigError> {
        let defaults = Self::default();
        Ok(Self {
            countdown: Duration::from_secs(parse_var("COUNTDOWN_SECS", defaults.countdown.as_secs())?),
            game_update: Duration::from_millis(parse_var(
                "GAME_UPDATE_MS",
                defaults.game_update.as_millis() as u64,
            )?),
            objective_tick: Duration::from_millis(parse_var(
                "OBJECTIVE_TICK_MS",
                defaults.objective_tick.as_millis() as u64,
            )?),
            pickup_respawn: Duration::from_secs(parse_var(
                "PICKUP_RESPAWN_SECS",
                defaults.pickup_respawn.as_secs(),
            )?),
            max_placement_attempts: parse_var(
                "MAX_PLACEMENT_ATTEMPTS",
                defaults.max_placement_attempts,
            )?,
            rng_seed: env::var("RNG_SEED")
                .ok()
                .map(|v| v.parse().map_err(|_| ConfigError::Invalid("RNG_SEED")))
                .transpose()?,
        }
        .validated()?)
    }

    fn validated(self) -> Result<Self, ConfigError> {
        // Zero periods would make tokio intervals panic
        if self.game_update.is_zero() {
            return Err(ConfigError::Invalid("GAME_UPDATE_MS"));
        }
        if self.objective_tick.is_zero() {
            return Err(ConfigError::Invalid("OBJECTIVE_TICK_MS"));
        }
        if self.max_placement_attempts == 0 {
            return Err(ConfigError::Invalid("MAX_PLACEMENT_ATTEMPTS"));
        }
        Ok(self)
    }
}

/// Read `name`, falling back to `default` when unset
fn parse_var<T: FromStr>(name: &'static str, default: T) -> Result<T, ConfigError> {
    match env::var(name) {
        Ok(raw) => raw.trim().parse().map_err(|_| ConfigError::Invalid(name)),
        Err(_) => Ok(default),
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid value for environment variable: {0}")]
    Invalid(&'static str),

    #[error("Invalid server address format")]
    InvalidAddress,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        let settings = GameSettings::default().validated().unwrap();
        assert_eq!(settings.countdown, Duration::from_secs(5));
        assert_eq!(settings.max_placement_attempts, 500);
        assert_eq!(settings.rng_seed, None);
    }

    #[test]
    fn zero_periods_are_rejected() {
        let settings = GameSettings {
            objective_tick: Duration::ZERO,
            ..GameSettings::default()
        };
        assert!(matches!(
            settings.validated(),
            Err(ConfigError::Invalid("OBJECTIVE_TICK_MS"))
        ));
    }

    #[test]
    fn parse_var_falls_back_and_rejects_garbage() {
        // Names unique to this test so parallel tests do not interfere
        assert_eq!(parse_var("GGS_TEST_UNSET_VAR", 7u64).unwrap(), 7);

        env::set_var("GGS_TEST_BAD_VAR", "seven");
        assert!(matches!(
            parse_var("GGS_TEST_BAD_VAR", 7u64),
            Err(ConfigError::Invalid("GGS_TEST_BAD_VAR"))
        ));

        env::set_var("GGS_TEST_GOOD_VAR", " 42 ");
        assert_eq!(parse_var("GGS_TEST_GOOD_VAR", 7u64).unwrap(), 42);
    }
}
