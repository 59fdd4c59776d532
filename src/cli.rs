//! Command-line interface argument parsing.
//!
//! This module handles all CLI argument parsing using clap,
//! including validation and default values.

use chrono::{DateTime, Utc};
use clap::Parser;
use std::path::PathBuf;

/// Shiplog - AI-powered weekly changelog generator for Shortcut
///
/// Pulls the stories completed in a reporting week from Shortcut,
/// enriches them with team/epic/owner details and partial-completion
/// detection, and asks Gemini to write the changelog.
///
/// Examples:
///   shiplog --week 1
///   shiplog --start 2024-05-06T00:00:00Z --end 2024-05-12T23:59:59Z
///   shiplog --week 0 --dry-run
///   shiplog --init-config
#[derive(Parser, Debug, Clone)]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Args {
    /// Shortcut API token
    ///
    /// Can also be set via the SHORTCUT_TOKEN env var.
    #[arg(long, env = "SHORTCUT_TOKEN", hide_env_values = true, value_name = "TOKEN")]
    pub shortcut_token: Option<String>,

    /// Gemini API key
    ///
    /// Can also be set via the GEMINI_API_KEY env var. Not required
    /// with --dry-run.
    #[arg(long, env = "GEMINI_API_KEY", hide_env_values = true, value_name = "KEY")]
    pub gemini_key: Option<String>,

    /// How many weeks back to report on (0 = the current week)
    #[arg(short, long, default_value = "0", value_name = "N")]
    pub week: usize,

    /// Explicit period start (RFC 3339 instant)
    ///
    /// Overrides --week. Must be paired with --end.
    #[arg(long, value_name = "INSTANT", requires = "end", conflicts_with = "week")]
    pub start: Option<DateTime<Utc>>,

    /// Explicit period end (RFC 3339 instant)
    ///
    /// Overrides --week. Must be paired with --start.
    #[arg(long, value_name = "INSTANT", requires = "start", conflicts_with = "week")]
    pub end: Option<DateTime<Utc>>,

    /// List the selectable recent weeks and exit
    #[arg(long)]
    pub list_weeks: bool,

    /// Output file path for the report
    ///
    /// Defaults to the config file setting, or changelog.md.
    #[arg(short, long, value_name = "FILE")]
    pub output: Option<PathBuf>,

    /// Output format (markdown, json)
    #[arg(long, default_value = "markdown", value_name = "FORMAT")]
    pub format: OutputFormat,

    /// Gemini model to use
    #[arg(short, long, default_value = "gemini-flash-latest", env = "SHIPLOG_MODEL")]
    pub model: String,

    /// Temperature for generation (0.0 - 1.0)
    #[arg(long, default_value = "0.3")]
    pub temperature: f32,

    /// Request timeout in seconds for the generation call
    #[arg(long, value_name = "SECS")]
    pub timeout: Option<u64>,

    /// Path to configuration file
    ///
    /// If not specified, looks for .shiplog.toml in the current directory
    #[arg(short, long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Enable verbose logging output
    #[arg(short, long)]
    pub verbose: bool,

    /// Run in quiet mode (minimal output)
    #[arg(short, long)]
    pub quiet: bool,

    /// Fetch and print the enriched stories without calling Gemini
    #[arg(long)]
    pub dry_run: bool,

    /// Generate a default .shiplog.toml configuration file
    #[arg(long)]
    pub init_config: bool,
}

/// Output format for the report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum OutputFormat {
    /// Markdown format (default)
    #[default]
    Markdown,
    /// JSON format
    Json,
}

impl Args {
    /// Parse command-line arguments.
    pub fn parse_args() -> Self {
        Self::parse()
    }

    /// Validate the parsed arguments.
    pub fn validate(&self) -> Result<(), String> {
        // Nothing else is needed for these modes
        if self.init_config || self.list_weeks {
            return Ok(());
        }

        if self.shortcut_token.as_deref().unwrap_or("").is_empty() {
            return Err(
                "A Shortcut token is required (--shortcut-token or SHORTCUT_TOKEN)".to_string(),
            );
        }

        if !self.dry_run && self.gemini_key.as_deref().unwrap_or("").is_empty() {
            return Err("A Gemini API key is required (--gemini-key or GEMINI_API_KEY)".to_string());
        }

        if let (Some(start), Some(end)) = (self.start, self.end) {
            if start > end {
                return Err("--start must not be after --end".to_string());
            }
        }

        // Validate temperature range
        if !(0.0..=1.0).contains(&self.temperature) {
            return Err("Temperature must be between 0.0 and 1.0".to_string());
        }

        // Check for conflicting options
        if self.verbose && self.quiet {
            return Err("Cannot use both --verbose and --quiet".to_string());
        }

        // Validate timeout if provided
        if let Some(timeout) = self.timeout {
            if timeout == 0 {
                return Err("Timeout must be at least 1 second".to_string());
            }
        }

        Ok(())
    }

    /// Returns the log level based on verbosity settings.
    pub fn log_level(&self) -> tracing::Level {
        if self.quiet {
            tracing::Level::ERROR
        } else if self.verbose {
            tracing::Level::DEBUG
        } else {
            tracing::Level::INFO
        }
    }
}
