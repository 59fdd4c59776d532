//! HTTP client for the Shortcut API.
//!
//! Reference data (teams, epics, members) is loaded best-effort: any
//! failure degrades to an empty map. The story search is the one fatal
//! path; everything downstream of it only enriches.

use crate::models::{EnrichedStory, MemberInfo, RawStory};
use crate::shortcut::enrich::{enrich_stories, ReferenceMaps};
use crate::shortcut::partial::{Container, PartialityResolver};
use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Production Shortcut API base URL.
pub const DEFAULT_BASE_URL: &str = "https://api.app.shortcut.com/api/v3";

/// Errors from the Shortcut API that abort an aggregation run.
#[derive(Debug, thiserror::Error)]
pub enum ShortcutError {
    /// The API answered with a non-success status.
    #[error("Shortcut API error: status {status}")]
    Api { status: u16 },
    /// The request failed at the transport level.
    #[error("Shortcut request failed: {0}")]
    Http(#[from] reqwest::Error),
}

/// Authenticated client for the Shortcut API.
pub struct ShortcutClient {
    token: String,
    base_url: String,
    http: reqwest::Client,
}

#[derive(Debug, Serialize)]
struct SearchRequest {
    completed_at_start: DateTime<Utc>,
    completed_at_end: DateTime<Utc>,
    archived: bool,
}

#[derive(Debug, Deserialize)]
struct Group {
    id: String,
    name: String,
}

#[derive(Debug, Deserialize)]
struct Epic {
    id: i64,
    name: String,
}

#[derive(Debug, Deserialize)]
struct Member {
    id: String,
    #[serde(default)]
    profile: Profile,
}

#[derive(Debug, Default, Deserialize)]
struct Profile {
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    mention_name: Option<String>,
    #[serde(default)]
    display_icon: Option<DisplayIcon>,
    #[serde(default)]
    gravatar_hash: Option<String>,
}

#[derive(Debug, Deserialize)]
struct DisplayIcon {
    #[serde(default)]
    url: Option<String>,
}

impl ShortcutClient {
    /// Create a client for the given API token.
    ///
    /// `base_url` must not end with a slash.
    pub fn new(token: impl Into<String>, base_url: impl Into<String>, timeout: Duration) -> Self {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .expect("Failed to create HTTP client");

        Self {
            token: token.into(),
            base_url: base_url.into(),
            http,
        }
    }

    /// Fetch completed stories in `[start, end]` and enrich each with
    /// team/epic/owner metadata and a partial-completion verdict.
    ///
    /// Output length and order match the raw search response. Reference
    /// lookups degrade on failure; only the search itself can error.
    pub async fn completed_stories(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<EnrichedStory>, ShortcutError> {
        info!("Searching stories completed between {} and {}", start, end);

        let (teams, epics, members, raw) = tokio::join!(
            self.get_groups(),
            self.get_epics(),
            self.get_members(),
            self.search_stories(start, end),
        );
        let raw = raw?;
        debug!("Search returned {} stories", raw.len());

        let refs = ReferenceMaps {
            teams,
            epics,
            members,
        };
        let resolver = PartialityResolver::new(self);

        Ok(enrich_stories(raw, &refs, &resolver, &self.token).await)
    }

    /// Map group id to team name. Empty on any failure.
    pub(crate) async fn get_groups(&self) -> HashMap<String, String> {
        match self.fetch_list::<Group>("/groups").await {
            Ok(groups) => groups.into_iter().map(|g| (g.id, g.name)).collect(),
            Err(e) => {
                warn!("Failed to load teams: {}", e);
                HashMap::new()
            }
        }
    }

    /// Map epic id to epic name. Empty on any failure.
    pub(crate) async fn get_epics(&self) -> HashMap<i64, String> {
        match self.fetch_list::<Epic>("/epics").await {
            Ok(epics) => epics.into_iter().map(|e| (e.id, e.name)).collect(),
            Err(e) => {
                warn!("Failed to load epics: {}", e);
                HashMap::new()
            }
        }
    }

    /// Map member id to display details. Empty on any failure.
    pub(crate) async fn get_members(&self) -> HashMap<String, MemberInfo> {
        match self.fetch_list::<Member>("/members").await {
            Ok(members) => members
                .into_iter()
                .map(|m| {
                    let name = m
                        .profile
                        .name
                        .or(m.profile.mention_name)
                        .unwrap_or_else(|| "unknown user".to_string());
                    let avatar = m.profile.display_icon.and_then(|icon| icon.url);

                    (
                        m.id,
                        MemberInfo {
                            name,
                            avatar,
                            gravatar: m.profile.gravatar_hash,
                        },
                    )
                })
                .collect(),
            Err(e) => {
                warn!("Failed to load members: {}", e);
                HashMap::new()
            }
        }
    }

    /// Stories belonging to an epic or iteration.
    pub(crate) async fn container_stories(
        &self,
        container: Container,
    ) -> Result<Vec<RawStory>, ShortcutError> {
        let path = match container {
            Container::Epic(id) => format!("/epics/{id}/stories"),
            Container::Iteration(id) => format!("/iterations/{id}/stories"),
        };
        self.fetch_list(&path).await
    }

    async fn search_stories(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<RawStory>, ShortcutError> {
        let body = SearchRequest {
            completed_at_start: start,
            completed_at_end: end,
            archived: false,
        };

        let response = self
            .http
            .post(format!("{}/stories/search", self.base_url))
            .header("Shortcut-Token", &self.token)
            .header("Content-Type", "application/json")
            .json(&body)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(ShortcutError::Api {
                status: response.status().as_u16(),
            });
        }

        Ok(response.json().await?)
    }

    async fn fetch_list<T: DeserializeOwned>(&self, path: &str) -> Result<Vec<T>, ShortcutError> {
        let response = self
            .http
            .get(format!("{}{}", self.base_url, path))
            .header("Shortcut-Token", &self.token)
            .header("Content-Type", "application/json")
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(ShortcutError::Api {
                status: response.status().as_u16(),
            });
        }

        Ok(response.json().await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use mockito::{Matcher, Server, ServerGuard};
    use serde_json::json;

    fn client_for(server: &ServerGuard) -> ShortcutClient {
        ShortcutClient::new("test-token", server.url(), Duration::from_secs(5))
    }

    fn period() -> (DateTime<Utc>, DateTime<Utc>) {
        (
            Utc.with_ymd_and_hms(2024, 5, 6, 0, 0, 0).unwrap(),
            Utc.with_ymd_and_hms(2024, 5, 12, 23, 59, 59).unwrap(),
        )
    }

    async fn mock_reference_endpoints(server: &mut ServerGuard) {
        server
            .mock("GET", "/groups")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(json!([{"id": "g1", "name": "Team A"}]).to_string())
            .create_async()
            .await;
        server
            .mock("GET", "/epics")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(json!([{"id": 101, "name": "Epic X"}]).to_string())
            .create_async()
            .await;
        server
            .mock("GET", "/members")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(json!([{"id": "u1", "profile": {"name": "User 1"}}]).to_string())
            .create_async()
            .await;
    }

    #[tokio::test]
    async fn test_enriches_story_with_team_and_epic() {
        let mut server = Server::new_async().await;
        mock_reference_endpoints(&mut server).await;

        server
            .mock("POST", "/stories/search")
            .match_header("shortcut-token", "test-token")
            .match_body(Matcher::PartialJson(json!({"archived": false})))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(
                json!([{"id": 1, "name": "Story 1", "group_id": "g1", "epic_id": 101}])
                    .to_string(),
            )
            .create_async()
            .await;
        server
            .mock("GET", "/epics/101/stories")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body("[]")
            .create_async()
            .await;

        let (start, end) = period();
        let stories = client_for(&server)
            .completed_stories(start, end)
            .await
            .unwrap();

        assert_eq!(stories.len(), 1);
        assert_eq!(stories[0].team_name, "Team A");
        assert_eq!(stories[0].epic_name.as_deref(), Some("Epic X"));
        assert!(!stories[0].is_partial);
    }

    #[tokio::test]
    async fn test_search_failure_is_fatal() {
        let mut server = Server::new_async().await;
        mock_reference_endpoints(&mut server).await;

        server
            .mock("POST", "/stories/search")
            .with_status(500)
            .create_async()
            .await;

        let (start, end) = period();
        let err = client_for(&server)
            .completed_stories(start, end)
            .await
            .expect_err("search failure must be fatal");

        match err {
            ShortcutError::Api { status } => assert_eq!(status, 500),
            other => panic!("Expected Api error, got {other}"),
        }
    }

    #[tokio::test]
    async fn test_empty_search_yields_empty_output() {
        let mut server = Server::new_async().await;
        mock_reference_endpoints(&mut server).await;

        server
            .mock("POST", "/stories/search")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body("[]")
            .create_async()
            .await;

        let (start, end) = period();
        let stories = client_for(&server)
            .completed_stories(start, end)
            .await
            .unwrap();

        assert!(stories.is_empty());
    }

    #[tokio::test]
    async fn test_reference_failures_degrade_to_defaults() {
        let mut server = Server::new_async().await;
        // No reference endpoints mocked: groups/epics/members all fail.
        server
            .mock("POST", "/stories/search")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(
                json!([{
                    "id": 1,
                    "name": "Story 1",
                    "group_id": "g1",
                    "epic_id": 101,
                    "owner_ids": ["u1"]
                }])
                .to_string(),
            )
            .create_async()
            .await;
        server
            .mock("GET", "/epics/101/stories")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body("[]")
            .create_async()
            .await;

        let (start, end) = period();
        let stories = client_for(&server)
            .completed_stories(start, end)
            .await
            .unwrap();

        assert_eq!(stories.len(), 1);
        assert_eq!(stories[0].team_name, "Sin Equipo");
        assert!(stories[0].epic_name.is_none());
        assert!(stories[0].owner_names.is_none());
    }

    #[tokio::test]
    async fn test_get_groups_swallows_malformed_body() {
        let mut server = Server::new_async().await;
        server
            .mock("GET", "/groups")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body("not json")
            .create_async()
            .await;

        let groups = client_for(&server).get_groups().await;
        assert!(groups.is_empty());
    }

    #[tokio::test]
    async fn test_member_name_fallback_chain() {
        let mut server = Server::new_async().await;
        server
            .mock("GET", "/members")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(
                json!([
                    {"id": "a", "profile": {"name": "Full Name", "mention_name": "handle"}},
                    {"id": "b", "profile": {"mention_name": "handle-only"}},
                    {"id": "c", "profile": {}}
                ])
                .to_string(),
            )
            .create_async()
            .await;

        let members = client_for(&server).get_members().await;

        assert_eq!(members["a"].name, "Full Name");
        assert_eq!(members["b"].name, "handle-only");
        assert_eq!(members["c"].name, "unknown user");
    }

    #[tokio::test]
    async fn test_gravatar_only_member_gets_gravatar_avatar() {
        let mut server = Server::new_async().await;
        server
            .mock("GET", "/groups")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body("[]")
            .create_async()
            .await;
        server
            .mock("GET", "/epics")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body("[]")
            .create_async()
            .await;
        server
            .mock("GET", "/members")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(
                json!([{"id": "u1", "profile": {"name": "User 1", "gravatar_hash": "abc123"}}])
                    .to_string(),
            )
            .create_async()
            .await;
        server
            .mock("POST", "/stories/search")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(json!([{"id": 1, "name": "Story 1", "owner_ids": ["u1"]}]).to_string())
            .create_async()
            .await;

        let (start, end) = period();
        let stories = client_for(&server)
            .completed_stories(start, end)
            .await
            .unwrap();

        let avatars = stories[0].owner_avatars.as_ref().unwrap();
        assert_eq!(
            avatars[0],
            "https://www.gravatar.com/avatar/abc123?s=200&d=retro"
        );
    }

    #[tokio::test]
    async fn test_sibling_listing_fetched_once_per_run() {
        let mut server = Server::new_async().await;
        mock_reference_endpoints(&mut server).await;

        server
            .mock("POST", "/stories/search")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(
                json!([
                    {"id": 1, "name": "Story 1", "epic_id": 101},
                    {"id": 2, "name": "Story 2", "epic_id": 101}
                ])
                .to_string(),
            )
            .create_async()
            .await;
        let siblings = server
            .mock("GET", "/epics/101/stories")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body("[]")
            .expect(1)
            .create_async()
            .await;

        let (start, end) = period();
        client_for(&server)
            .completed_stories(start, end)
            .await
            .unwrap();

        siblings.assert_async().await;
    }

    #[tokio::test]
    async fn test_sibling_cache_not_reused_across_runs() {
        let mut server = Server::new_async().await;
        mock_reference_endpoints(&mut server).await;

        server
            .mock("POST", "/stories/search")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(json!([{"id": 1, "name": "Story 1", "epic_id": 101}]).to_string())
            .expect(2)
            .create_async()
            .await;
        let siblings = server
            .mock("GET", "/epics/101/stories")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body("[]")
            .expect(2)
            .create_async()
            .await;

        let (start, end) = period();
        let client = client_for(&server);
        client.completed_stories(start, end).await.unwrap();
        client.completed_stories(start, end).await.unwrap();

        siblings.assert_async().await;
    }

    #[tokio::test]
    async fn test_output_preserves_search_order() {
        let mut server = Server::new_async().await;
        mock_reference_endpoints(&mut server).await;

        let raw: Vec<_> = (0..13)
            .map(|i| json!({"id": i, "name": format!("Story {i}")}))
            .collect();
        server
            .mock("POST", "/stories/search")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(json!(raw).to_string())
            .create_async()
            .await;

        let (start, end) = period();
        let stories = client_for(&server)
            .completed_stories(start, end)
            .await
            .unwrap();

        assert_eq!(stories.len(), 13);
        let ids: Vec<i64> = stories.iter().map(|s| s.id).collect();
        assert_eq!(ids, (0..13).collect::<Vec<i64>>());
    }
}
