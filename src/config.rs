//! Configuration file handling.
//!
//! This module handles loading and merging configuration from
//! `.shiplog.toml` files. Credentials never live here; they come from
//! flags or the environment.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Root configuration structure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// General settings.
    #[serde(default)]
    pub general: GeneralConfig,

    /// Shortcut API settings.
    #[serde(default)]
    pub shortcut: ShortcutConfig,

    /// Gemini model settings.
    #[serde(default)]
    pub gemini: GeminiConfig,

    /// Report settings.
    #[serde(default)]
    pub report: ReportConfig,
}

/// General application settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeneralConfig {
    /// Default output file path.
    #[serde(default = "default_output")]
    pub output: String,

    /// Enable verbose logging by default.
    #[serde(default)]
    pub verbose: bool,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            output: default_output(),
            verbose: false,
        }
    }
}

fn default_output() -> String {
    "changelog.md".to_string()
}

/// Shortcut API settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ShortcutConfig {
    /// API base URL (no trailing slash).
    #[serde(default = "default_shortcut_base_url")]
    pub base_url: String,

    /// Request timeout in seconds.
    #[serde(default = "default_shortcut_timeout")]
    pub timeout_seconds: u64,
}

impl Default for ShortcutConfig {
    fn default() -> Self {
        Self {
            base_url: default_shortcut_base_url(),
            timeout_seconds: default_shortcut_timeout(),
        }
    }
}

fn default_shortcut_base_url() -> String {
    crate::shortcut::DEFAULT_BASE_URL.to_string()
}

fn default_shortcut_timeout() -> u64 {
    30
}

/// Gemini model settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeminiConfig {
    /// Model name.
    #[serde(default = "default_model")]
    pub model: String,

    /// API base URL (no trailing slash).
    #[serde(default = "default_gemini_base_url")]
    pub base_url: String,

    /// Temperature for generation.
    #[serde(default = "default_temperature")]
    pub temperature: f32,

    /// Request timeout in seconds. Generation can take a while.
    #[serde(default = "default_gemini_timeout")]
    pub timeout_seconds: u64,
}

impl Default for GeminiConfig {
    fn default() -> Self {
        Self {
            model: default_model(),
            base_url: default_gemini_base_url(),
            temperature: default_temperature(),
            timeout_seconds: default_gemini_timeout(),
        }
    }
}

fn default_model() -> String {
    "gemini-flash-latest".to_string()
}

fn default_gemini_base_url() -> String {
    crate::gemini::DEFAULT_BASE_URL.to_string()
}

fn default_temperature() -> f32 {
    0.3
}

fn default_gemini_timeout() -> u64 {
    120
}

/// Report generation settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportConfig {
    /// Include the completed-stories appendix in Markdown reports.
    #[serde(default = "default_true")]
    pub include_stories: bool,
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            include_stories: true,
        }
    }
}

fn default_true() -> bool {
    true
}

impl Config {
    /// Load configuration from a file path.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        Ok(config)
    }

    /// Try to load configuration from the default location.
    ///
    /// Returns `Ok(None)` if the file doesn't exist, `Err` if it exists
    /// but can't be parsed.
    pub fn load_default() -> Result<Option<Self>> {
        let default_path = Path::new(".shiplog.toml");

        if default_path.exists() {
            Ok(Some(Self::load(default_path)?))
        } else {
            Ok(None)
        }
    }

    /// Merge this configuration with CLI arguments.
    ///
    /// CLI arguments take precedence over config file settings.
    pub fn merge_with_args(&mut self, args: &crate::cli::Args) {
        // Model settings always override since they have CLI defaults
        self.gemini.model = args.model.clone();
        self.gemini.temperature = args.temperature;

        // Timeout only overrides when explicitly provided
        if let Some(timeout) = args.timeout {
            self.gemini.timeout_seconds = timeout;
        }

        // Flags always override
        if args.verbose {
            self.general.verbose = true;
        }
    }

    /// Generate a default configuration file content.
    pub fn default_toml() -> String {
        let config = Config::default();
        toml::to_string_pretty(&config).unwrap_or_else(|_| String::new())
    }
}
