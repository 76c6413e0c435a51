//! Configuration management for Retroterm

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// How scrollback dumps are written
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum SaveType {
    #[default]
    Normal,
    Html,
    /// Pop a dialog each time
    Ask,
}

/// Application configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Emulation selected at startup (by label, e.g. "ANSI", "VT220")
    #[serde(default = "default_emulation")]
    pub emulation: String,

    /// Command for the local shell session
    #[serde(default = "default_shell")]
    pub shell: String,

    /// Maximum scrollback lines; 0 disables the cap
    #[serde(default = "default_scrollback_lines_max")]
    pub scrollback_lines_max: usize,

    /// AND every incoming byte with 0x7F before the emulation sees it
    #[serde(default)]
    pub strip_8th_bit: bool,

    /// Wrap at the right margin
    #[serde(default = "default_true")]
    pub line_wrap: bool,

    /// Carriage return also feeds a line
    #[serde(default)]
    pub line_feed_on_cr: bool,

    /// NUL prints as a space instead of being dropped
    #[serde(default)]
    pub display_null: bool,

    /// BBS-family variants use a right margin of 79 regardless of the
    /// terminal width
    #[serde(default = "default_true")]
    pub assume_80_columns: bool,

    /// The display font can render ATASCII at normal width; when false
    /// those lines go out double-width
    #[serde(default = "default_true")]
    pub atascii_has_wide_font: bool,

    /// Same for PETSCII
    #[serde(default = "default_true")]
    pub petscii_has_wide_font: bool,

    /// Scrollback dump format
    #[serde(default)]
    pub scrollback_save_type: SaveType,

    /// Notification method for BEL: "bell" (terminal bell) or "none"
    #[serde(default = "default_bell_method")]
    pub bell_method: String,
}

fn default_emulation() -> String {
    "ANSI".to_string()
}

fn default_shell() -> String {
    std::env::var("SHELL").unwrap_or_else(|_| "/bin/sh".to_string())
}

fn default_scrollback_lines_max() -> usize {
    20_000
}

fn default_true() -> bool {
    true
}

fn default_bell_method() -> String {
    "bell".to_string()
}

impl Default for Config {
    fn default() -> Self {
        Self {
            emulation: default_emulation(),
            shell: default_shell(),
            scrollback_lines_max: default_scrollback_lines_max(),
            strip_8th_bit: false,
            line_wrap: true,
            line_feed_on_cr: false,
            display_null: false,
            assume_80_columns: true,
            atascii_has_wide_font: true,
            petscii_has_wide_font: true,
            scrollback_save_type: SaveType::default(),
            bell_method: default_bell_method(),
        }
    }
}

impl Config {
    /// Load configuration from file, or return default if not found
    pub fn load() -> Result<Self> {
        Self::load_from(&config_file_path())
    }

    pub fn load_from(path: &std::path::Path) -> Result<Self> {
        if path.exists() {
            let content = std::fs::read_to_string(path).context("Failed to read config file")?;
            toml::from_str(&content).context("Failed to parse config file")
        } else {
            Ok(Self::default())
        }
    }

    /// Save configuration to file
    pub fn save(&self) -> Result<()> {
        let path = config_file_path();
        let content = toml::to_string_pretty(self).context("Failed to serialize config")?;
        std::fs::write(&path, content).context("Failed to write config file")?;
        Ok(())
    }
}

/// Get the base configuration directory (~/.retroterm)
/// Falls back to ./.retroterm if home directory cannot be determined
pub fn config_dir() -> PathBuf {
    try_config_dir().unwrap_or_else(|| {
        tracing::warn!("Could not determine home directory, using current directory for config");
        PathBuf::from(".retroterm")
    })
}

/// Try to get the base configuration directory, returning None if home dir is unavailable
pub fn try_config_dir() -> Option<PathBuf> {
    dirs::home_dir().map(|h| h.join(".retroterm"))
}

/// Get the path to the config file
pub fn config_file_path() -> PathBuf {
    config_dir().join("config.toml")
}

/// Directory scrollback dumps land in by default
pub fn dumps_dir() -> PathBuf {
    config_dir().join("dumps")
}

/// Directory for log files
pub fn logs_dir() -> PathBuf {
    config_dir().join("logs")
}

/// Ensure all required directories exist
pub fn ensure_directories() -> Result<()> {
    std::fs::create_dir_all(config_dir()).context("Failed to create config directory")?;
    std::fs::create_dir_all(dumps_dir()).context("Failed to create dumps directory")?;
    std::fs::create_dir_all(logs_dir()).context("Failed to create logs directory")?;
    Ok(())
}
