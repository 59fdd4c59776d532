//! Changelog report rendering.
//!
//! Renders the generated changelog plus run metadata as Markdown or
//! JSON.

use crate::models::EnrichedStory;
use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::BTreeMap;

/// Metadata about a changelog run.
#[derive(Debug, Clone, Serialize)]
pub struct ReportMetadata {
    /// Human label of the reporting period.
    pub period_label: String,
    /// Period start instant.
    pub period_start: DateTime<Utc>,
    /// Period end instant.
    pub period_end: DateTime<Utc>,
    /// Name of the generation model used.
    pub model_used: String,
    /// Number of completed stories in the period.
    pub story_count: usize,
    /// When the report was generated.
    pub generated_at: DateTime<Utc>,
    /// Duration of the run in seconds.
    pub duration_seconds: f64,
}

/// The complete changelog report.
#[derive(Debug, Clone, Serialize)]
pub struct ChangelogReport {
    /// Metadata about the run.
    pub metadata: ReportMetadata,
    /// The AI-generated changelog body.
    pub changelog: String,
    /// The enriched stories the changelog was generated from.
    pub stories: Vec<EnrichedStory>,
}

/// Generate a complete Markdown report.
pub fn generate_markdown_report(report: &ChangelogReport, include_stories: bool) -> String {
    let mut output = String::new();

    output.push_str("# Weekly Changelog\n\n");
    output.push_str(&generate_metadata_section(&report.metadata));
    output.push_str(&report.changelog);
    output.push_str("\n\n");

    if include_stories {
        output.push_str(&generate_stories_section(&report.stories));
    }

    output.push_str(&generate_footer());

    output
}

/// Generate the report as pretty-printed JSON.
pub fn generate_json_report(report: &ChangelogReport) -> Result<String> {
    serde_json::to_string_pretty(report).context("Failed to serialize report to JSON")
}

fn generate_metadata_section(metadata: &ReportMetadata) -> String {
    let mut section = String::new();

    section.push_str("## Metadata\n\n");
    section.push_str(&format!("- **Period:** {}\n", metadata.period_label));
    section.push_str(&format!(
        "- **From:** {}\n",
        metadata.period_start.format("%Y-%m-%d %H:%M UTC")
    ));
    section.push_str(&format!(
        "- **To:** {}\n",
        metadata.period_end.format("%Y-%m-%d %H:%M UTC")
    ));
    section.push_str(&format!("- **Model Used:** `{}`\n", metadata.model_used));
    section.push_str(&format!("- **Stories:** {}\n", metadata.story_count));
    section.push_str(&format!(
        "- **Generated:** {}\n",
        metadata.generated_at.format("%Y-%m-%d %H:%M:%S UTC")
    ));
    section.push_str(&format!(
        "- **Duration:** {:.1}s\n",
        metadata.duration_seconds
    ));
    section.push('\n');

    section
}

/// Appendix listing the completed stories grouped by team, with the
/// unassigned groups ("General", "Sin Equipo") last.
fn generate_stories_section(stories: &[EnrichedStory]) -> String {
    if stories.is_empty() {
        return String::new();
    }

    let mut section = String::new();
    section.push_str("## Completed Stories\n\n");

    let mut by_team: BTreeMap<&str, Vec<&EnrichedStory>> = BTreeMap::new();
    for story in stories {
        by_team.entry(story.team_name.as_str()).or_default().push(story);
    }

    let is_unassigned = |team: &str| team == "General" || team == "Sin Equipo";

    let (named, unassigned): (Vec<_>, Vec<_>) = by_team
        .into_iter()
        .partition(|(team, _)| !is_unassigned(team));

    for (team, team_stories) in named.into_iter().chain(unassigned) {
        section.push_str(&format!("### {}\n\n", team));
        for story in team_stories {
            section.push_str(&story_line(story));
        }
        section.push('\n');
    }

    section
}

fn story_line(story: &EnrichedStory) -> String {
    let mut line = format!("- {} **{}**", story.story_type.emoji(), story.name);

    if let Some(epic) = &story.epic_name {
        line.push_str(&format!(" · {}", epic));
    }
    if let Some(owners) = &story.owner_names {
        line.push_str(&format!(" · {}", owners.join(", ")));
    }
    if !story.labels.is_empty() {
        line.push_str(&format!(" · _{}_", story.label_names().join(", ")));
    }
    if story.is_partial {
        line.push_str(" · ⏳ partial");
    }

    line.push('\n');
    line
}

fn generate_footer() -> String {
    format!(
        "---\n\n*Generated by Shiplog v{}*\n",
        env!("CARGO_PKG_VERSION")
    )
}
