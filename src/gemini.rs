//! Gemini changelog generation.
//!
//! One-shot call to the generateContent endpoint: enriched stories in,
//! Markdown changelog out. Fails on a missing key, a non-success
//! status, or an empty response. No retries.

use crate::models::EnrichedStory;
use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, info};

/// Production Gemini API base URL.
pub const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com";

/// Client for the Gemini generateContent API.
pub struct GeminiClient {
    api_key: String,
    model: String,
    base_url: String,
    temperature: f32,
    http: reqwest::Client,
}

#[derive(Debug, Serialize)]
struct GenerateRequest {
    contents: Vec<Content>,
    #[serde(rename = "generationConfig")]
    generation_config: GenerationConfig,
}

#[derive(Debug, Serialize)]
struct Content {
    parts: Vec<Part>,
}

#[derive(Debug, Serialize)]
struct Part {
    text: String,
}

#[derive(Debug, Serialize)]
struct GenerationConfig {
    temperature: f32,
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Option<ResponseContent>,
}

#[derive(Debug, Deserialize)]
struct ResponseContent {
    #[serde(default)]
    parts: Vec<ResponsePart>,
}

#[derive(Debug, Deserialize)]
struct ResponsePart {
    text: Option<String>,
}

impl GeminiClient {
    /// Create a client. Errors when the API key is missing.
    pub fn new(
        api_key: impl Into<String>,
        model: impl Into<String>,
        base_url: impl Into<String>,
        temperature: f32,
        timeout: Duration,
    ) -> Result<Self> {
        let api_key = api_key.into();
        if api_key.is_empty() {
            return Err(anyhow!("Missing Gemini API key"));
        }

        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self {
            api_key,
            model: model.into(),
            base_url: base_url.into(),
            temperature,
            http,
        })
    }

    /// Generate a weekly changelog from the given stories.
    pub async fn generate_changelog(&self, stories: &[EnrichedStory]) -> Result<String> {
        let prompt = build_prompt(stories);
        debug!("Prompt is {} characters", prompt.len());

        let url = format!(
            "{}/v1beta/models/{}:generateContent?key={}",
            self.base_url, self.model, self.api_key
        );
        let request = GenerateRequest {
            contents: vec![Content {
                parts: vec![Part { text: prompt }],
            }],
            generation_config: GenerationConfig {
                temperature: self.temperature,
            },
        };

        info!("Requesting changelog from model {}", self.model);

        let response = self
            .http
            .post(&url)
            .header("Content-Type", "application/json")
            .json(&request)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    anyhow!("Gemini request timed out")
                } else if e.is_connect() {
                    anyhow!("Cannot connect to Gemini at {}", self.base_url)
                } else {
                    anyhow!("Failed to send Gemini request: {}", e)
                }
            })?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(anyhow!("Gemini API error {}: {}", status, body));
        }

        let generated: GenerateResponse = response
            .json()
            .await
            .context("Failed to parse Gemini response")?;

        let text: String = generated
            .candidates
            .into_iter()
            .next()
            .and_then(|c| c.content)
            .map(|c| c.parts)
            .unwrap_or_default()
            .into_iter()
            .filter_map(|p| p.text)
            .collect();

        if text.trim().is_empty() {
            return Err(anyhow!("Gemini returned an empty changelog"));
        }

        Ok(text)
    }
}

/// Build the changelog prompt from enriched story summaries.
fn build_prompt(stories: &[EnrichedStory]) -> String {
    let summaries: Vec<String> = stories.iter().map(story_summary).collect();

    format!(
        r###"Act as a senior product manager. Write a professional weekly changelog.

IMPORTANT:
1. Group the updates by TEAM (squad).
2. For each story, mention its epic ONLY when one is assigned. If it has no epic, say nothing about epics.
3. Include the labels and owners of each relevant story.
4. When a story is marked "[PARTIAL]", state explicitly that only part of the initiative has shipped (e.g. backend or frontend) and that the rest is still in progress. Otherwise treat it as completed.

Here are the stories completed during the period:

{}

Formatting instructions:
1. Use the team name as a top-level heading (e.g. "## Team Payments").
2. Within each team, list the improvements concisely.
3. Translate technical wording into user-facing benefits.
4. Use clean Markdown.
5. Group any "General" or "Sin Equipo" stories at the end.
6. Open with a short "Week in review" paragraph highlighting the overall impact."###,
        summaries.join("\n\n")
    )
}

fn story_summary(story: &EnrichedStory) -> String {
    let story_type = story.story_type.to_string().to_uppercase();
    let description = if story.description.is_empty() {
        "No description provided".to_string()
    } else {
        story.description.chars().take(150).collect()
    };
    let labels = if story.labels.is_empty() {
        "No labels".to_string()
    } else {
        story.label_names().join(", ")
    };
    let epic_line = story
        .epic_name
        .as_ref()
        .map(|e| format!("\n    Epic: {e}"))
        .unwrap_or_default();
    let owners = match &story.owner_names {
        Some(names) if !names.is_empty() => names.join(", "),
        _ => "Unassigned".to_string(),
    };
    let status = if story.is_partial {
        "\n    STATUS: [PARTIAL] Only one slice of this initiative is complete; the rest is still in progress."
    } else {
        "\n    STATUS: [COMPLETED] Fully finished."
    };

    format!(
        "[TEAM: {}] [TYPE: {}] {}{}\n    Owners: {}\n    Labels: {}{}\n    Context: {}",
        story.team_name, story_type, story.name, epic_line, owners, labels, status, description
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Label, StoryType};
    use mockito::Server;
    use serde_json::json;

    fn enriched(name: &str, epic: Option<&str>, partial: bool) -> EnrichedStory {
        EnrichedStory {
            id: 1,
            name: name.to_string(),
            description: "Better checkout".to_string(),
            story_type: StoryType::Feature,
            completed_at: None,
            app_url: String::new(),
            labels: vec![Label {
                name: "payments".to_string(),
            }],
            group_id: None,
            epic_id: None,
            iteration_id: None,
            owner_ids: vec![],
            completed: true,
            team_name: "Team A".to_string(),
            epic_name: epic.map(String::from),
            owner_names: Some(vec!["Ana".to_string()]),
            owner_avatars: None,
            is_partial: partial,
        }
    }

    #[test]
    fn test_missing_key_is_rejected() {
        let result = GeminiClient::new(
            "",
            "gemini-flash-latest",
            DEFAULT_BASE_URL,
            0.3,
            Duration::from_secs(5),
        );
        assert!(result.is_err());
    }

    #[test]
    fn test_prompt_mentions_epic_only_when_assigned() {
        let with_epic = build_prompt(&[enriched("Story", Some("Epic X"), false)]);
        assert!(with_epic.contains("Epic: Epic X"));

        let without_epic = build_prompt(&[enriched("Story", None, false)]);
        assert!(!without_epic.contains("Epic:"));
    }

    #[test]
    fn test_prompt_marks_partial_stories() {
        let partial = build_prompt(&[enriched("Story", None, true)]);
        assert!(partial.contains("[PARTIAL]"));

        let complete = build_prompt(&[enriched("Story", None, false)]);
        assert!(complete.contains("[COMPLETED]"));
    }

    #[test]
    fn test_summary_includes_team_owners_and_labels() {
        let summary = story_summary(&enriched("Checkout", None, false));
        assert!(summary.contains("[TEAM: Team A]"));
        assert!(summary.contains("[TYPE: FEATURE]"));
        assert!(summary.contains("Owners: Ana"));
        assert!(summary.contains("Labels: payments"));
    }

    #[tokio::test]
    async fn test_generate_changelog_returns_text() {
        let mut server = Server::new_async().await;
        server
            .mock(
                "POST",
                "/v1beta/models/gemini-flash-latest:generateContent?key=k",
            )
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(
                json!({
                    "candidates": [{
                        "content": {"parts": [{"text": "## Team A\n- Shipped"}]}
                    }]
                })
                .to_string(),
            )
            .create_async()
            .await;

        let client = GeminiClient::new(
            "k",
            "gemini-flash-latest",
            server.url(),
            0.3,
            Duration::from_secs(5),
        )
        .unwrap();

        let changelog = client
            .generate_changelog(&[enriched("Story", None, false)])
            .await
            .unwrap();

        assert!(changelog.contains("Team A"));
    }

    #[tokio::test]
    async fn test_empty_response_is_an_error() {
        let mut server = Server::new_async().await;
        server
            .mock(
                "POST",
                "/v1beta/models/gemini-flash-latest:generateContent?key=k",
            )
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(json!({"candidates": []}).to_string())
            .create_async()
            .await;

        let client = GeminiClient::new(
            "k",
            "gemini-flash-latest",
            server.url(),
            0.3,
            Duration::from_secs(5),
        )
        .unwrap();

        let result = client
            .generate_changelog(&[enriched("Story", None, false)])
            .await;

        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_api_error_status_is_surfaced() {
        let mut server = Server::new_async().await;
        server
            .mock(
                "POST",
                "/v1beta/models/gemini-flash-latest:generateContent?key=k",
            )
            .with_status(429)
            .with_body("quota exceeded")
            .create_async()
            .await;

        let client = GeminiClient::new(
            "k",
            "gemini-flash-latest",
            server.url(),
            0.3,
            Duration::from_secs(5),
        )
        .unwrap();

        let err = client
            .generate_changelog(&[enriched("Story", None, false)])
            .await
            .unwrap_err();

        assert!(err.to_string().contains("429"));
    }
}
