//! Configuration for the terminal engine

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::parser::Encoding;

/// Terminal engine configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TerminalConfig {
    /// Initial width in columns
    pub cols: usize,
    /// Initial height in rows
    pub rows: usize,
    /// Maximum scrollback lines kept in history
    pub scrollback_lines: usize,
    /// Approximate cell budget for history (0 = unlimited)
    pub scrollback_bytes: usize,
    /// Byte encoding of the child's output
    pub encoding: Encoding,
    /// Parser limits
    pub limits: ParserLimits,
    /// Consumed prefix size after which the byte buffer compacts
    pub compact_threshold: usize,
    /// Depth of the I/O -> mutation queue, in chunks
    pub channel_capacity: usize,
    /// Default tab stop interval
    pub tab_width: usize,
    /// Whether `CSI 3 J` really clears history
    pub clear_scrollback_on_ed3: bool,
}

impl Default for TerminalConfig {
    fn default() -> Self {
        Self {
            cols: 80,
            rows: 24,
            scrollback_lines: 10000,
            scrollback_bytes: 0,
            encoding: Encoding::Utf8,
            limits: ParserLimits::default(),
            compact_threshold: 4096,
            channel_capacity: 256,
            tab_width: 8,
            clear_scrollback_on_ed3: true,
        }
    }
}

/// Size caps applied by the sub-parsers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ParserLimits {
    /// Maximum number of CSI parameters before the sequence is ignored
    pub max_csi_params: usize,
    /// Maximum OSC payload kept; the rest is dropped
    pub max_osc_len: usize,
    /// Maximum hooked DCS payload kept; the rest is dropped
    pub max_dcs_len: usize,
}

impl Default for ParserLimits {
    fn default() -> Self {
        Self {
            max_csi_params: 16,
            max_osc_len: 64 * 1024,
            max_dcs_len: 16 * 1024 * 1024,
        }
    }
}

impl TerminalConfig {
    /// Create a config with the given size and defaults otherwise
    pub fn with_size(cols: usize, rows: usize) -> Self {
        Self {
            cols,
            rows,
            ..Self::default()
        }
    }

    /// Check that the values can drive a terminal
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.cols == 0 || self.rows == 0 {
            return Err(ConfigError::Invalid(format!(
                "terminal size must be non-zero, got {}x{}",
                self.cols, self.rows
            )));
        }
        if self.tab_width == 0 {
            return Err(ConfigError::Invalid("tab_width must be non-zero".into()));
        }
        if self.channel_capacity == 0 {
            return Err(ConfigError::Invalid(
                "channel_capacity must be non-zero".into(),
            ));
        }
        if self.limits.max_csi_params == 0 {
            return Err(ConfigError::Invalid(
                "max_csi_params must be non-zero".into(),
            ));
        }
        Ok(())
    }

    /// Load configuration from a file
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        let config: TerminalConfig = serde_json::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Save configuration to a file
    pub fn save(&self, path: &Path) -> Result<(), ConfigError> {
        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Load configuration from the default location or return the default config
    pub fn load_or_default() -> Self {
        if let Some(config_dir) = config_dir() {
            let config_path = config_dir.join("engine.json");
            if config_path.exists() {
                match Self::load(&config_path) {
                    Ok(config) => return config,
                    Err(e) => tracing::warn!("Ignoring {}: {}", config_path.display(), e),
                }
            }
        }
        Self::default()
    }
}

/// Get the configuration directory path
fn config_dir() -> Option<std::path::PathBuf> {
    std::env::var("HOME")
        .ok()
        .map(|home| std::path::PathBuf::from(home).join(".config").join("vt-engine"))
}
