//! Partial-completion detection.
//!
//! A story is "partial" when a story with the same name exists in the
//! same epic (or, failing that, the same iteration) and is not yet
//! completed — the reported story is then only one slice of a larger
//! initiative.

use crate::models::RawStory;
use crate::shortcut::client::ShortcutClient;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use tokio::sync::OnceCell;
use tracing::{debug, info, warn};

/// Grouping under which sibling stories are compared.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Container {
    Epic(i64),
    Iteration(i64),
}

impl Container {
    /// The container a story's siblings live in. Epic takes precedence;
    /// the iteration is only consulted when no epic id is present.
    fn of(story: &RawStory) -> Option<Self> {
        match story.epic_id {
            Some(epic_id) => Some(Container::Epic(epic_id)),
            None => story.iteration_id.map(Container::Iteration),
        }
    }
}

type SharedSiblings = Arc<OnceCell<Vec<RawStory>>>;

/// Decides whether each story has a not-yet-completed counterpart.
///
/// One resolver serves one aggregation run. Sibling listings are
/// memoized per container, and the cell is shared before the fetch
/// settles, so concurrent stories in the same container await a single
/// in-flight request. The cache dies with the resolver; verdicts never
/// leak into the next run.
pub struct PartialityResolver<'a> {
    client: &'a ShortcutClient,
    cache: Mutex<HashMap<Container, SharedSiblings>>,
}

impl<'a> PartialityResolver<'a> {
    pub fn new(client: &'a ShortcutClient) -> Self {
        Self {
            client,
            cache: Mutex::new(HashMap::new()),
        }
    }

    /// Returns true when a sibling with the same normalized name exists
    /// in the story's container and is not completed. Never errors:
    /// partiality is advisory, so fetch failures resolve to false.
    pub async fn is_partial(&self, story: &RawStory) -> bool {
        let Some(container) = Container::of(story) else {
            return false;
        };

        let cell = self.sibling_cell(container);
        let siblings = cell
            .get_or_init(|| self.fetch_siblings(container))
            .await;

        let target = normalize(&story.name);
        let found = siblings
            .iter()
            .any(|s| s.id != story.id && !s.completed && normalize(&s.name) == target);

        if found {
            info!("Partial counterpart detected for \"{}\"", story.name);
        }

        found
    }

    fn sibling_cell(&self, container: Container) -> SharedSiblings {
        let mut cache = self.cache.lock().expect("sibling cache poisoned");
        cache.entry(container).or_default().clone()
    }

    async fn fetch_siblings(&self, container: Container) -> Vec<RawStory> {
        debug!("Loading sibling stories for {:?}", container);

        match self.client.container_stories(container).await {
            Ok(stories) => stories,
            Err(e) => {
                warn!("Failed to load sibling stories for {:?}: {}", container, e);
                Vec::new()
            }
        }
    }
}

fn normalize(name: &str) -> String {
    name.trim().to_lowercase()
}
