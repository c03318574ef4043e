//! Bot configuration via TOML files.
//!
//! Every section and every key is optional; anything left out takes the
//! default shown in [`BotConfig::default`].
//!
//! ```toml
//! [user]
//! nick = "skizzobot"
//!
//! [channels]
//! active = ["#skizzo"]
//! triggers = []
//!
//! [messages]
//! thanks = ["Thanks!", "Much obliged."]
//!
//! [generation]
//! max_words = 48
//! topical_chance = 1.0
//! tie_break = "rarest"
//! join_cooldown_ms = 1000
//!
//! [brain]
//! path = "skizzobot.brain.json"
//! ```

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use seed_select::{SeedPolicy, TieBreak};
use serde::Deserialize;
use thiserror::Error;
use triplet_gen::WalkLimit;

use crate::engine::Settings;

/// Errors from reading a configuration file.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("cannot read config: {0}")]
    Io(#[from] io::Error),

    #[error("invalid config: {0}")]
    Parse(#[from] toml::de::Error),
}

/// Complete bot configuration.
///
/// # Examples
///
/// ```
/// use skizzobot::BotConfig;
///
/// let config: BotConfig = "[user]\nnick = \"babbler\"".parse().unwrap();
/// assert_eq!(config.user.nick, "babbler");
/// assert_eq!(config.triggers(), vec!["babbler".to_string()]);
/// ```
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct BotConfig {
    pub user: UserConfig,
    pub channels: ChannelConfig,
    pub messages: Messages,
    pub generation: GenerationConfig,
    pub brain: BrainConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct UserConfig {
    pub nick: String,
}

impl Default for UserConfig {
    fn default() -> Self {
        UserConfig {
            nick: "skizzobot".to_string(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ChannelConfig {
    /// Channels joined on connect.
    pub active: Vec<String>,
    /// Substrings that make the bot answer a line. Empty means the nick.
    pub triggers: Vec<String>,
}

impl Default for ChannelConfig {
    fn default() -> Self {
        ChannelConfig {
            active: vec!["#skizzo".to_string()],
            triggers: Vec::new(),
        }
    }
}

/// Canned message templates, one picked at random per use.
///
/// An empty list silences that message.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Messages {
    pub hello_channel: Vec<String>,
    pub hello_user: Vec<String>,
    pub revenge: Vec<String>,
    pub thanks: Vec<String>,
    pub kick: Vec<String>,
    pub disappointment: Vec<String>,
}

impl Default for Messages {
    fn default() -> Self {
        fn list(items: &[&str]) -> Vec<String> {
            items.iter().map(|s| s.to_string()).collect()
        }
        Messages {
            hello_channel: list(&["Hello!"]),
            hello_user: list(&["Hi!"]),
            revenge: list(&["I'll remember that."]),
            thanks: list(&["Thanks!"]),
            kick: list(&["Revenge!"]),
            disappointment: list(&["Why?"]),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct GenerationConfig {
    pub max_words: usize,
    pub topical_chance: f64,
    pub tie_break: TieBreak,
    /// Joins closer together than this are not greeted (netsplit guard).
    pub join_cooldown_ms: u64,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        GenerationConfig {
            max_words: WalkLimit::default().max_words,
            topical_chance: 1.0,
            tie_break: TieBreak::default(),
            join_cooldown_ms: 1000,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct BrainConfig {
    pub path: PathBuf,
}

impl Default for BrainConfig {
    fn default() -> Self {
        BrainConfig {
            path: PathBuf::from("skizzobot.brain.json"),
        }
    }
}

impl BotConfig {
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let contents = fs::read_to_string(path)?;
        contents.parse()
    }

    /// Substrings that trigger a reply; the nick when none are configured.
    pub fn triggers(&self) -> Vec<String> {
        if self.channels.triggers.is_empty() {
            vec![self.user.nick.clone()]
        } else {
            self.channels.triggers.clone()
        }
    }

    /// Generation settings. The bot's own nick is never used as a seed.
    pub fn settings(&self) -> Settings {
        Settings {
            limit: WalkLimit {
                max_words: self.generation.max_words,
            },
            seed: SeedPolicy {
                topical_chance: self.generation.topical_chance,
                tie_break: self.generation.tie_break,
                ignored: [self.user.nick.clone()].into_iter().collect(),
            },
        }
    }

    pub fn join_cooldown(&self) -> Duration {
        Duration::from_millis(self.generation.join_cooldown_ms)
    }
}

impl FromStr for BotConfig {
    type Err = ConfigError;

    fn from_str(toml_str: &str) -> Result<Self, Self::Err> {
        Ok(toml::from_str(toml_str)?)
    }
}
