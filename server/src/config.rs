//! Host configuration: defaults, environment overrides and validation.

use hockey_shared::config::{GameSize, PhysicsOptions};
use std::str::FromStr;

/// Server configuration
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub listen_addr: String,
    /// Heartbeats per second; each heartbeat advances every match one tick.
    pub tick_rate_hz: u32,
    pub max_sub_steps: usize,
    pub goals_to_win: u32,
    pub game_size: GameSize,
    pub physics: PhysicsOptions,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen_addr: "0.0.0.0:9001".to_string(),
            tick_rate_hz: 60,
            max_sub_steps: 10,
            goals_to_win: 5,
            game_size: GameSize::default(),
            physics: PhysicsOptions::default(),
        }
    }
}

impl ServerConfig {
    /// Defaults overridden by environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Defaults overridden by whatever `lookup` returns for each known key.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(port) = lookup("PORT") {
            let port: u16 = parse("PORT", &port)?;
            config.listen_addr = format!("0.0.0.0:{}", port);
        } else if let Some(addr) = lookup("HOCKEY_LISTEN_ADDR") {
            config.listen_addr = addr;
        }
        if let Some(v) = lookup("HOCKEY_TICK_RATE_HZ") {
            config.tick_rate_hz = parse("HOCKEY_TICK_RATE_HZ", &v)?;
        }
        if let Some(v) = lookup("HOCKEY_MAX_SUB_STEPS") {
            config.max_sub_steps = parse("HOCKEY_MAX_SUB_STEPS", &v)?;
        }
        if let Some(v) = lookup("HOCKEY_GOALS_TO_WIN") {
            config.goals_to_win = parse("HOCKEY_GOALS_TO_WIN", &v)?;
        }
        if let Some(v) = lookup("HOCKEY_ARENA_WIDTH") {
            config.game_size.width = parse("HOCKEY_ARENA_WIDTH", &v)?;
        }
        if let Some(v) = lookup("HOCKEY_ARENA_HEIGHT") {
            config.game_size.height = parse("HOCKEY_ARENA_HEIGHT", &v)?;
        }

        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.listen_addr.parse::<std::net::SocketAddr>().is_err() {
            return Err(ConfigError::InvalidAddress(self.listen_addr.clone()));
        }
        if self.tick_rate_hz == 0 || self.tick_rate_hz > 1000 {
            return Err(ConfigError::Invalid(
                "tick_rate_hz must be within 1..=1000".to_string(),
            ));
        }
        if self.max_sub_steps == 0 {
            return Err(ConfigError::Invalid("max_sub_steps must be > 0".to_string()));
        }
        if self.goals_to_win == 0 {
            return Err(ConfigError::Invalid("goals_to_win must be > 0".to_string()));
        }
        self.game_size.validate().map_err(ConfigError::Invalid)?;
        crate::game::check_arena(&self.game_size).map_err(ConfigError::Invalid)?;
        self.physics.validate().map_err(ConfigError::Invalid)?;
        Ok(())
    }

    /// Fixed timestep in seconds
    pub fn fixed_dt(&self) -> f64 {
        1.0 / self.tick_rate_hz as f64
    }
}

fn parse<T: FromStr>(name: &'static str, value: &str) -> Result<T, ConfigError> {
    value.trim().parse().map_err(|_| ConfigError::Parse {
        name,
        value: value.to_string(),
    })
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Cannot parse {name}={value:?}")]
    Parse { name: &'static str, value: String },

    #[error("Invalid listen address: {0}")]
    InvalidAddress(String),

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}
