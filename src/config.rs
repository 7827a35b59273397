use serde::Deserialize;
use std::fs;
use std::path::Path;
use tracing::{info, warn};

#[derive(Debug, Deserialize, Clone)]
pub struct AppConfig {
    pub api: ApiConfig,
    pub game: GameConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ApiConfig {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Deserialize, Clone)]
pub struct GameConfig {
    /// Default seat count for matches created without an explicit limit.
    pub default_max_players: usize,
}

impl AppConfig {
    pub fn load() -> Self {
        let config_path = "Config.toml";
        let mut config = if Path::new(config_path).exists() {
            let contents = fs::read_to_string(config_path).expect("Failed to read Config.toml");
            toml::from_str(&contents).expect("Failed to parse Config.toml")
        } else {
            warn!("Config.toml not found, using defaults");
            Self::default()
        };

        config.merge_env();

        info!(
            host = %config.api.host,
            port = config.api.port,
            default_max_players = config.game.default_max_players,
            "configuration loaded"
        );

        config
    }

    fn merge_env(&mut self) {
        if let Ok(val) = std::env::var("PARQUES_API_HOST") {
            if !val.is_empty() {
                self.api.host = val;
            }
        }
        if let Ok(val) = std::env::var("PARQUES_API_PORT") {
            if let Ok(parsed) = val.parse() {
                self.api.port = parsed;
            }
        }
        if let Ok(val) = std::env::var("PARQUES_DEFAULT_MAX_PLAYERS") {
            if let Ok(parsed) = val.parse() {
                self.game.default_max_players = parsed;
            }
        }
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.api.host, self.api.port)
    }
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 3000,
        }
    }
}

impl Default for GameConfig {
    fn default() -> Self {
        Self {
            default_max_players: 4,
        }
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            api: ApiConfig::default(),
            game: GameConfig::default(),
        }
    }
}
