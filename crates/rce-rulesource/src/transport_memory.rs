// crates/rce-rulesource/src/transport_memory.rs
// ============================================================================
// Module: In-Memory Git Host Client
// Description: GitHostClient fake for tests.
// Purpose: Exercise the syncer without a real git host.
// Dependencies: rce-core, async-trait, std::collections::BTreeMap
// ============================================================================

use std::collections::BTreeMap;

use async_trait::async_trait;
use rce_core::interfaces::BlameInfo;
use rce_core::interfaces::GitHostClient;
use rce_core::interfaces::GitHostError;
use tokio::sync::Mutex;

/// A `GitHostClient` backed by canned archives and blame answers, keyed by
/// `(project_id, git_ref)` and `(project_id, path)` respectively.
#[derive(Default)]
pub struct InMemoryGitHostClient {
    archives: Mutex<BTreeMap<(String, String), Vec<u8>>>,
    blames: Mutex<BTreeMap<(String, String), BlameInfo>>,
}

impl InMemoryGitHostClient {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn set_archive(&self, project_id: &str, git_ref: &str, bytes: Vec<u8>) {
        self.archives
            .lock()
            .await
            .insert((project_id.to_string(), git_ref.to_string()), bytes);
    }

    pub async fn set_blame(&self, project_id: &str, path: &str, blame: BlameInfo) {
        self.blames
            .lock()
            .await
            .insert((project_id.to_string(), path.to_string()), blame);
    }
}

#[async_trait]
impl GitHostClient for InMemoryGitHostClient {
    async fn fetch_archive(&self, project_id: &str, git_ref: &str) -> Result<Vec<u8>, GitHostError> {
        self.archives
            .lock()
            .await
            .get(&(project_id.to_string(), git_ref.to_string()))
            .cloned()
            .ok_or_else(|| GitHostError::NotFound(project_id.to_string()))
    }

    async fn blame_commit(&self, project_id: &str, path: &str) -> Result<BlameInfo, GitHostError> {
        self.blames
            .lock()
            .await
            .get(&(project_id.to_string(), path.to_string()))
            .cloned()
            .ok_or_else(|| GitHostError::NotFound(path.to_string()))
    }
}
