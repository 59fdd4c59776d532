//! Data models for the changelog generator.
//!
//! This module contains the core data structures used throughout
//! the application for representing stories, members, and reports.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Kind of work a story represents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StoryType {
    /// New functionality
    Feature,
    /// Defect fix
    Bug,
    /// Maintenance work
    Chore,
}

impl fmt::Display for StoryType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StoryType::Feature => write!(f, "Feature"),
            StoryType::Bug => write!(f, "Bug"),
            StoryType::Chore => write!(f, "Chore"),
        }
    }
}

impl Default for StoryType {
    fn default() -> Self {
        StoryType::Feature
    }
}

impl StoryType {
    /// Returns an emoji representation of the story type.
    pub fn emoji(&self) -> &'static str {
        match self {
            StoryType::Feature => "✨",
            StoryType::Bug => "🐛",
            StoryType::Chore => "🔧",
        }
    }
}

/// A label attached to a story.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Label {
    /// Label name.
    pub name: String,
}

/// A story as returned by the tracker API.
///
/// Only the fields the pipeline consumes are deserialized; anything else
/// the API sends is dropped at the boundary.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawStory {
    /// Story identifier.
    pub id: i64,
    /// Story title.
    pub name: String,
    /// Story description (may be empty).
    #[serde(default)]
    pub description: String,
    /// Kind of work.
    #[serde(default)]
    pub story_type: StoryType,
    /// When the story was completed.
    #[serde(default)]
    pub completed_at: Option<DateTime<Utc>>,
    /// Permalink into the tracker UI.
    #[serde(default)]
    pub app_url: String,
    /// Labels attached to the story.
    #[serde(default)]
    pub labels: Vec<Label>,
    /// Owning team (group) id, if assigned.
    #[serde(default)]
    pub group_id: Option<String>,
    /// Epic id, if the story belongs to one.
    #[serde(default)]
    pub epic_id: Option<i64>,
    /// Iteration id, if the story is scheduled in one.
    #[serde(default)]
    pub iteration_id: Option<i64>,
    /// Member ids of the story owners.
    #[serde(default)]
    pub owner_ids: Vec<String>,
    /// Whether the story is completed.
    #[serde(default)]
    pub completed: bool,
}

/// Resolved member details from the members endpoint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MemberInfo {
    /// Display name (profile name, mention handle, or a placeholder).
    pub name: String,
    /// Direct avatar URL, if the member has one.
    pub avatar: Option<String>,
    /// Gravatar hash fallback, if present.
    pub gravatar: Option<String>,
}

/// A story after reference-data merge and partiality resolution.
///
/// Every field is copied explicitly from the raw story; derived fields
/// are appended. No untyped passthrough.
#[derive(Debug, Clone, Serialize)]
pub struct EnrichedStory {
    /// Story identifier.
    pub id: i64,
    /// Story title.
    pub name: String,
    /// Story description.
    pub description: String,
    /// Kind of work.
    pub story_type: StoryType,
    /// When the story was completed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,
    /// Permalink into the tracker UI.
    pub app_url: String,
    /// Labels attached to the story.
    pub labels: Vec<Label>,
    /// Owning team (group) id, if assigned.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub group_id: Option<String>,
    /// Epic id, if the story belongs to one.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub epic_id: Option<i64>,
    /// Iteration id, if the story is scheduled in one.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub iteration_id: Option<i64>,
    /// Member ids of the story owners.
    pub owner_ids: Vec<String>,
    /// Whether the story is completed.
    pub completed: bool,
    /// Resolved team name ("General" when unassigned, "Sin Equipo" when
    /// the group id does not resolve).
    pub team_name: String,
    /// Resolved epic name; absent unless the epic id resolves.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub epic_name: Option<String>,
    /// Resolved owner display names; absent when none resolve.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub owner_names: Option<Vec<String>>,
    /// Resolved owner avatar URLs; may be shorter than the owner list.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub owner_avatars: Option<Vec<String>>,
    /// Whether a same-named, not-yet-completed sibling exists in the
    /// story's epic or iteration.
    pub is_partial: bool,
}

impl EnrichedStory {
    /// Returns the label names joined for display.
    pub fn label_names(&self) -> Vec<&str> {
        self.labels.iter().map(|l| l.name.as_str()).collect()
    }
}
