//! Shiplog - AI-powered weekly changelog generator for Shortcut
//!
//! A CLI tool that pulls the stories completed in a reporting week from
//! the Shortcut API, enriches them with team/epic/owner metadata and
//! partial-completion detection, and asks Gemini to write the weekly
//! changelog.
//!
//! Exit codes:
//!   0 - Success
//!   1 - Runtime error (connection, config, generation failure, etc.)

mod cli;
mod config;
mod gemini;
mod models;
mod report;
mod shortcut;
mod week;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use cli::{Args, OutputFormat};
use config::Config;
use gemini::GeminiClient;
use indicatif::{ProgressBar, ProgressStyle};
use models::EnrichedStory;
use report::{ChangelogReport, ReportMetadata};
use shortcut::ShortcutClient;
use std::path::PathBuf;
use std::time::{Duration, Instant};
use tracing::{debug, error, info, warn};
use tracing_subscriber::FmtSubscriber;

#[tokio::main]
async fn main() -> Result<()> {
    // Parse command-line arguments
    let args = Args::parse_args();

    // Validate arguments
    if let Err(e) = args.validate() {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }

    // Handle --init-config and --list-weeks early (no logging needed)
    if args.init_config {
        return handle_init_config();
    }
    if args.list_weeks {
        return handle_list_weeks();
    }

    // Initialize logging
    init_logging(&args);

    info!("Shiplog v{}", env!("CARGO_PKG_VERSION"));
    debug!("Arguments: {:?}", args);

    // Generate the changelog
    match run_changelog(args).await {
        Ok(()) => Ok(()),
        Err(e) => {
            error!("Changelog generation failed: {}", e);
            eprintln!("\n❌ Error: {}", e);
            std::process::exit(1);
        }
    }
}

/// Handle --init-config: generate a default .shiplog.toml.
fn handle_init_config() -> Result<()> {
    let path = std::path::Path::new(".shiplog.toml");

    if path.exists() {
        eprintln!("⚠️  .shiplog.toml already exists. Remove it first or edit it manually.");
        std::process::exit(1);
    }

    let content = Config::default_toml();
    std::fs::write(path, &content).context("Failed to write .shiplog.toml")?;

    println!("✅ Created .shiplog.toml with default settings.");
    println!("   Edit it to customize output, endpoints, model, and more.");
    Ok(())
}

/// Handle --list-weeks: print the selectable reporting weeks and exit.
fn handle_list_weeks() -> Result<()> {
    println!("Selectable reporting weeks (--week N):\n");
    for (i, week) in week::recent_weeks(5).iter().enumerate() {
        println!(
            "   {} - {} ({} → {})",
            i,
            week.label,
            week.start.format("%Y-%m-%d"),
            week.end.format("%Y-%m-%d")
        );
    }
    Ok(())
}

/// Initialize logging based on verbosity settings.
fn init_logging(args: &Args) {
    let level = args.log_level();

    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .compact()
        .finish();

    tracing::subscriber::set_global_default(subscriber).expect("Failed to set tracing subscriber");
}

/// Run the complete changelog workflow.
async fn run_changelog(args: Args) -> Result<()> {
    let start_time = Instant::now();

    // Load configuration
    let mut config = load_config(&args)?;
    config.merge_with_args(&args);

    let (period_label, period_start, period_end) = resolve_period(&args);

    // Step 1: Fetch and enrich the completed stories
    let shortcut = ShortcutClient::new(
        args.shortcut_token.clone().unwrap_or_default(),
        config.shortcut.base_url.clone(),
        Duration::from_secs(config.shortcut.timeout_seconds),
    );

    println!(
        "🔎 Fetching stories completed {} ({} → {})",
        period_label,
        period_start.format("%Y-%m-%d"),
        period_end.format("%Y-%m-%d")
    );

    let spinner = progress_spinner("Fetching completed stories...");
    let stories = shortcut.completed_stories(period_start, period_end).await;
    spinner.finish_and_clear();

    let stories = stories.context("Failed to fetch completed stories")?;

    if stories.is_empty() {
        println!("   No completed stories found for this period.");
        return Ok(());
    }

    let partial_count = stories.iter().filter(|s| s.is_partial).count();
    println!(
        "   Found {} completed stories ({} partial)",
        stories.len(),
        partial_count
    );

    // Handle --dry-run: print stories and exit
    if args.dry_run {
        return handle_dry_run(&stories);
    }

    // Step 2: Generate the changelog
    let gemini = GeminiClient::new(
        args.gemini_key.clone().unwrap_or_default(),
        config.gemini.model.clone(),
        config.gemini.base_url.clone(),
        config.gemini.temperature,
        Duration::from_secs(config.gemini.timeout_seconds),
    )?;

    println!("🤖 Generating changelog with {}...", config.gemini.model);

    let spinner = progress_spinner("Waiting for Gemini...");
    let changelog = gemini.generate_changelog(&stories).await;
    spinner.finish_and_clear();

    let changelog = changelog.context("Failed to generate changelog")?;

    // Step 3: Build and write the report
    let duration = start_time.elapsed().as_secs_f64();
    let metadata = ReportMetadata {
        period_label: period_label.clone(),
        period_start,
        period_end,
        model_used: config.gemini.model.clone(),
        story_count: stories.len(),
        generated_at: Utc::now(),
        duration_seconds: duration,
    };

    let story_count = stories.len();
    let changelog_report = ChangelogReport {
        metadata,
        changelog,
        stories,
    };

    let rendered = match args.format {
        OutputFormat::Markdown => {
            report::generate_markdown_report(&changelog_report, config.report.include_stories)
        }
        OutputFormat::Json => report::generate_json_report(&changelog_report)?,
    };

    let output = args
        .output
        .clone()
        .unwrap_or_else(|| PathBuf::from(&config.general.output));
    std::fs::write(&output, &rendered)
        .with_context(|| format!("Failed to write report to {}", output.display()))?;

    // Print summary
    println!("\n📊 Changelog Summary:");
    println!("   Period: {}", period_label);
    println!("   Stories: {} ({} partial)", story_count, partial_count);
    println!("   Duration: {:.1}s", duration);
    println!("\n✅ Changelog saved to: {}", output.display());

    Ok(())
}

/// Handle --dry-run: print the enriched stories, skip generation.
fn handle_dry_run(stories: &[EnrichedStory]) -> Result<()> {
    println!("\n🔍 Dry run: no changelog will be generated.\n");

    for story in stories {
        let partial = if story.is_partial { " ⏳ partial" } else { "" };
        let epic = story
            .epic_name
            .as_deref()
            .map(|e| format!(" · {e}"))
            .unwrap_or_default();
        println!(
            "   {} [{}] {}{}{}",
            story.story_type.emoji(),
            story.team_name,
            story.name,
            epic,
            partial
        );
    }

    println!("\n✅ Dry run complete. No Gemini calls were made.");
    Ok(())
}

/// Resolve the reporting period from explicit instants or a week index.
fn resolve_period(args: &Args) -> (String, DateTime<Utc>, DateTime<Utc>) {
    if let (Some(start), Some(end)) = (args.start, args.end) {
        return ("Custom period".to_string(), start, end);
    }

    let week = week::nth_recent_week(args.week);
    (week.label, week.start, week.end)
}

/// Load configuration from file or use defaults.
fn load_config(args: &Args) -> Result<Config> {
    // Try explicit config path
    if let Some(ref config_path) = args.config {
        info!("Loading config from: {}", config_path.display());
        return Config::load(config_path);
    }

    // Try default location
    match Config::load_default() {
        Ok(Some(config)) => {
            info!("Loaded default config from .shiplog.toml");
            Ok(config)
        }
        Ok(None) => {
            debug!("No config file found, using defaults");
            Ok(Config::default())
        }
        Err(e) => {
            warn!("Failed to load config: {}", e);
            Ok(Config::default())
        }
    }
}

/// A spinner for the long-running network phases.
fn progress_spinner(message: &str) -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    if let Ok(style) = ProgressStyle::default_spinner().template("{spinner:.cyan} {msg}") {
        pb.set_style(style);
    }
    pb.set_message(message.to_string());
    pb.enable_steady_tick(Duration::from_millis(120));
    pb
}
