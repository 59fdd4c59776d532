//! Story enrichment.
//!
//! Merges reference data and partiality verdicts onto raw stories in
//! fixed-size batches: items within a batch run concurrently, batches
//! run sequentially, and the output keeps the input order.

use crate::models::{EnrichedStory, MemberInfo, RawStory};
use crate::shortcut::partial::PartialityResolver;
use futures::future::join_all;
use std::collections::HashMap;

/// Stories enriched concurrently per batch. Caps simultaneous
/// sibling-listing requests against any one container.
const BATCH_SIZE: usize = 5;

/// Lookup tables built once per aggregation run.
pub struct ReferenceMaps {
    /// group id → team name
    pub teams: HashMap<String, String>,
    /// epic id → epic name
    pub epics: HashMap<i64, String>,
    /// member id → display details
    pub members: HashMap<String, MemberInfo>,
}

/// Enrich every story, preserving input order.
pub async fn enrich_stories(
    raw: Vec<RawStory>,
    refs: &ReferenceMaps,
    resolver: &PartialityResolver<'_>,
    token: &str,
) -> Vec<EnrichedStory> {
    let mut enriched = Vec::with_capacity(raw.len());

    for batch in raw.chunks(BATCH_SIZE) {
        let processed = join_all(
            batch
                .iter()
                .map(|story| enrich_story(story, refs, resolver, token)),
        )
        .await;
        enriched.extend(processed);
    }

    enriched
}

async fn enrich_story(
    story: &RawStory,
    refs: &ReferenceMaps,
    resolver: &PartialityResolver<'_>,
    token: &str,
) -> EnrichedStory {
    let is_partial = resolver.is_partial(story).await;

    let owners: Vec<&MemberInfo> = story
        .owner_ids
        .iter()
        .filter_map(|id| refs.members.get(id))
        .collect();
    let owner_names: Vec<String> = owners.iter().map(|m| m.name.clone()).collect();
    let owner_avatars: Vec<String> = owners.iter().filter_map(|m| avatar_url(m, token)).collect();

    EnrichedStory {
        id: story.id,
        name: story.name.clone(),
        description: story.description.clone(),
        story_type: story.story_type,
        completed_at: story.completed_at,
        app_url: story.app_url.clone(),
        labels: story.labels.clone(),
        group_id: story.group_id.clone(),
        epic_id: story.epic_id,
        iteration_id: story.iteration_id,
        owner_ids: story.owner_ids.clone(),
        completed: story.completed,
        team_name: team_name(story.group_id.as_deref(), &refs.teams),
        epic_name: story.epic_id.and_then(|id| refs.epics.get(&id).cloned()),
        owner_names: (!owner_names.is_empty()).then_some(owner_names),
        owner_avatars: (!owner_avatars.is_empty()).then_some(owner_avatars),
        is_partial,
    }
}

/// "General" when no team is assigned, "Sin Equipo" when the assigned
/// team does not resolve.
fn team_name(group_id: Option<&str>, teams: &HashMap<String, String>) -> String {
    match group_id {
        None => "General".to_string(),
        Some(id) => teams
            .get(id)
            .cloned()
            .unwrap_or_else(|| "Sin Equipo".to_string()),
    }
}

/// Direct avatar URLs get the API token appended so the tracker serves
/// them; members with only a gravatar hash get a gravatar URL; members
/// with neither get no entry.
fn avatar_url(member: &MemberInfo, token: &str) -> Option<String> {
    if let Some(avatar) = &member.avatar {
        let separator = if avatar.contains('?') { '&' } else { '?' };
        return Some(format!("{avatar}{separator}token={token}"));
    }

    member
        .gravatar
        .as_ref()
        .map(|hash| format!("https://www.gravatar.com/avatar/{hash}?s=200&d=retro"))
}
