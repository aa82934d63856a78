//! Configuration types and loading.
//!
//! Config is loaded from a JSON file and overrides the console adapter's
//! default conversation reference (user/bot names, conversation id).
//! Kept minimal; extend as transports grow their own settings.

use crate::activity::ConversationReference;
use crate::console::console_reference;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Top-level application config.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Config {
    /// Console transport settings.
    #[serde(default)]
    pub console: ConsoleConfig,
}

/// Overrides for the console conversation reference.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConsoleConfig {
    /// Display name for the console user (default "User1").
    #[serde(default = "default_user_name")]
    pub user_name: String,

    /// Display name for the bot (default "Bot").
    #[serde(default = "default_bot_name")]
    pub bot_name: String,

    /// Conversation id for the single console conversation (default "convo1").
    #[serde(default = "default_conversation_id")]
    pub conversation_id: String,
}

fn default_user_name() -> String {
    "User1".to_string()
}

fn default_bot_name() -> String {
    "Bot".to_string()
}

fn default_conversation_id() -> String {
    "convo1".to_string()
}

impl Default for ConsoleConfig {
    fn default() -> Self {
        Self {
            user_name: default_user_name(),
            bot_name: default_bot_name(),
            conversation_id: default_conversation_id(),
        }
    }
}

/// Load config from a JSON file.
pub fn load_config(path: &Path) -> Result<Config> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("read config {}", path.display()))?;
    let config: Config = serde_json::from_str(&raw)
        .with_context(|| format!("parse config {}", path.display()))?;
    Ok(config)
}

/// Resolve the config path: explicit argument wins, then the
/// PARLEY_CONFIG_PATH env var; None means run on defaults.
pub fn resolve_config_path(cli_path: Option<PathBuf>) -> Option<PathBuf> {
    cli_path.or_else(|| {
        std::env::var("PARLEY_CONFIG_PATH")
            .ok()
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .map(PathBuf::from)
    })
}

/// Build the console conversation reference with config overrides applied.
pub fn console_reference_from(config: &Config) -> ConversationReference {
    let mut reference = console_reference();
    reference.user.name = config.console.user_name.clone();
    reference.bot.name = config.console.bot_name.clone();
    reference.conversation.id = config.console.conversation_id.clone();
    reference
}
