use anyhow::{Context, Result, bail};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::ui::conversation::commands::{CommandSuggestion, default_suggestions};

/// Main application configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Simulated reply settings
    pub reply: ReplyConfig,

    /// Chat screen text
    pub chat: ChatConfig,

    /// History follow behaviour
    pub scroll: ScrollConfig,

    /// Slash commands offered by the palette, in navigation order
    pub commands: Vec<CommandSuggestion>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ReplyConfig {
    pub delay_ms: u64,
    pub text: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ChatConfig {
    pub greeting: Option<String>,
    pub placeholder: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ScrollConfig {
    pub smooth: bool,
    /// Distance from the bottom, in rows, still treated as "at bottom"
    pub tolerance: u32,
}

impl Default for ReplyConfig {
    fn default() -> Self {
        Self {
            delay_ms: 2000,
            text: "Thanks for your message! This is a demo AI response.".to_string(),
        }
    }
}

impl Default for ChatConfig {
    fn default() -> Self {
        Self {
            greeting: Some("Hello! How can I help you today?".to_string()),
            placeholder: "Type a message or use / for commands...".to_string(),
        }
    }
}

impl Default for ScrollConfig {
    fn default() -> Self {
        Self {
            smooth: false,
            tolerance: 1,
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Config {
            reply: ReplyConfig::default(),
            chat: ChatConfig::default(),
            scroll: ScrollConfig::default(),
            commands: default_suggestions(),
        }
    }
}

impl Config {
    /// `~/.parley`
    pub fn home_dir() -> Result<PathBuf> {
        let home = dirs::home_dir().context("Could not find home directory")?;
        Ok(home.join(".parley"))
    }

    /// Default config location, `~/.parley/config.toml`
    pub fn default_path() -> Result<PathBuf> {
        Ok(Self::home_dir()?.join("config.toml"))
    }

    /// Load configuration from the default location, falling back to defaults when absent
    pub fn load() -> Result<Self> {
        Self::load_from(&Self::default_path()?)
    }

    /// Load configuration from a specific file, falling back to defaults when absent
    pub fn load_from(path: &Path) -> Result<Self> {
        let config = if path.exists() {
            let content = fs::read_to_string(path)
                .with_context(|| format!("Failed to read config file {}", path.display()))?;
            toml::from_str(&content)
                .with_context(|| format!("Failed to parse config file {}", path.display()))?
        } else {
            Config::default()
        };

        config.validate()?;
        Ok(config)
    }

    /// Save configuration to file
    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).context("Failed to create config directory")?;
        }
        let content = toml::to_string_pretty(self).context("Failed to serialize config")?;
        fs::write(path, content).context("Failed to write config file")?;
        Ok(())
    }

    /// Command prefixes must look like `/name` and be pairwise distinct
    pub fn validate(&self) -> Result<()> {
        let mut seen = HashSet::new();
        for command in &self.commands {
            if !command.prefix.starts_with('/') {
                bail!("Command prefix '{}' must start with '/'", command.prefix);
            }
            if command.prefix.len() < 2 {
                bail!("Command prefix '{}' is missing a name", command.prefix);
            }
            if command.prefix.chars().any(char::is_whitespace) {
                bail!("Command prefix '{}' must not contain whitespace", command.prefix);
            }
            if !seen.insert(command.prefix.as_str()) {
                bail!("Duplicate command prefix '{}'", command.prefix);
            }
        }
        Ok(())
    }

    pub fn reply_delay(&self) -> Duration {
        Duration::from_millis(self.reply.delay_ms)
    }
}
