use crate::domain::models::Difficulty;
use serde::Deserialize;
use std::fs;
use std::path::Path;

#[derive(Debug, Deserialize, Clone)]
pub struct AppConfig {
    pub game: GameConfig,
    pub timers: TimerConfig,
    pub bot: BotConfig,
    pub api: ApiConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct GameConfig {
    pub board_size: usize,
    pub win_length: usize,
}

#[derive(Debug, Deserialize, Clone)]
pub struct TimerConfig {
    /// Seconds a player may think before forfeiting the match.
    pub turn_seconds: u64,
    /// Rolling window without a liveness signal before a player forfeits.
    pub liveness_seconds: u64,
}

#[derive(Debug, Deserialize, Clone)]
pub struct BotConfig {
    pub difficulty: Difficulty,
    pub think_millis: u64,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ApiConfig {
    pub port: u16,
}

impl AppConfig {
    pub fn load() -> Self {
        let config_path = "Config.toml";
        let mut config = if Path::new(config_path).exists() {
            let contents = fs::read_to_string(config_path).expect("Failed to read Config.toml");
            toml::from_str(&contents).expect("Failed to parse Config.toml")
        } else {
            eprintln!("Config.toml not found, using defaults");
            Self::default()
        };

        config.merge_env();

        eprintln!("----------------------------------------");
        eprintln!("Caro Coordinator Configuration:");
        eprintln!(
            "  Board: {}x{}, win length {}",
            config.game.board_size, config.game.board_size, config.game.win_length
        );
        eprintln!(
            "  Timers: {}s per turn, {}s liveness window",
            config.timers.turn_seconds, config.timers.liveness_seconds
        );
        eprintln!(
            "  Bot: {:?}, {} ms think delay",
            config.bot.difficulty, config.bot.think_millis
        );
        eprintln!("  API Port: {}", config.api.port);
        eprintln!("----------------------------------------");

        config
    }

    fn merge_env(&mut self) {
        if let Ok(val) = std::env::var("CARO_BOARD_SIZE") {
            if let Ok(parsed) = val.parse() {
                self.game.board_size = parsed;
            }
        }
        if let Ok(val) = std::env::var("CARO_WIN_LENGTH") {
            if let Ok(parsed) = val.parse() {
                self.game.win_length = parsed;
            }
        }
        if let Ok(val) = std::env::var("CARO_TURN_SECONDS") {
            if let Ok(parsed) = val.parse() {
                self.timers.turn_seconds = parsed;
            }
        }
        if let Ok(val) = std::env::var("CARO_LIVENESS_SECONDS") {
            if let Ok(parsed) = val.parse() {
                self.timers.liveness_seconds = parsed;
            }
        }
        if let Ok(val) = std::env::var("CARO_BOT_DIFFICULTY") {
            match val.to_lowercase().as_str() {
                "easy" => self.bot.difficulty = Difficulty::Easy,
                "medium" => self.bot.difficulty = Difficulty::Medium,
                "hard" => self.bot.difficulty = Difficulty::Hard,
                _ => {}
            }
        }
        if let Ok(val) = std::env::var("CARO_BOT_THINK_MILLIS") {
            if let Ok(parsed) = val.parse() {
                self.bot.think_millis = parsed;
            }
        }
        if let Ok(val) = std::env::var("CARO_API_PORT") {
            if let Ok(parsed) = val.parse() {
                self.api.port = parsed;
            }
        }
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            game: GameConfig::default(),
            timers: TimerConfig::default(),
            bot: BotConfig::default(),
            api: ApiConfig::default(),
        }
    }
}

impl Default for GameConfig {
    fn default() -> Self {
        Self {
            board_size: 20,
            win_length: 5,
        }
    }
}

impl Default for TimerConfig {
    fn default() -> Self {
        Self {
            turn_seconds: 30,
            liveness_seconds: 30,
        }
    }
}

impl Default for BotConfig {
    fn default() -> Self {
        Self {
            difficulty: Difficulty::Medium,
            think_millis: 500,
        }
    }
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self { port: 3123 }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::env;

    struct EnvVarGuard {
        key: String,
        original: Option<String>,
    }

    impl EnvVarGuard {
        fn new(key: &str, value: &str) -> Self {
            let original = env::var(key).ok();
            unsafe {
                env::set_var(key, value);
            }
            Self {
                key: key.to_string(),
                original,
            }
        }
    }

    impl Drop for EnvVarGuard {
        fn drop(&mut self) {
            unsafe {
                match &self.original {
                    Some(val) => env::set_var(&self.key, val),
                    None => env::remove_var(&self.key),
                }
            }
        }
    }

    #[test]
    fn test_default_config() {
        unsafe {
            env::remove_var("CARO_BOARD_SIZE");
            env::remove_var("CARO_WIN_LENGTH");
        }

        let config = AppConfig::default();
        assert_eq!(config.game.board_size, 20);
        assert_eq!(config.game.win_length, 5);
        assert_eq!(config.timers.turn_seconds, 30);
        assert_eq!(config.bot.difficulty, Difficulty::Medium);
    }

    #[test]
    fn test_merge_env_overrides() {
        let mut config = AppConfig::default();

        let _g1 = EnvVarGuard::new("CARO_BOARD_SIZE", "15");
        let _g2 = EnvVarGuard::new("CARO_TURN_SECONDS", "60");
        let _g3 = EnvVarGuard::new("CARO_BOT_DIFFICULTY", "hard");
        let _g4 = EnvVarGuard::new("CARO_API_PORT", "8888");

        config.merge_env();

        assert_eq!(config.game.board_size, 15);
        assert_eq!(config.timers.turn_seconds, 60);
        assert_eq!(config.bot.difficulty, Difficulty::Hard);
        assert_eq!(config.api.port, 8888);
    }

    #[test]
    fn test_invalid_env_vars_ignored() {
        let mut config = AppConfig::default();
        let _g1 = EnvVarGuard::new("CARO_WIN_LENGTH", "not_a_number");
        let _g2 = EnvVarGuard::new("CARO_BOT_DIFFICULTY", "impossible");

        config.merge_env();

        assert_eq!(config.game.win_length, 5);
        assert_eq!(config.bot.difficulty, Difficulty::Medium);
    }
}
