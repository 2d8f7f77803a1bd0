use tracing::debug;

use ecoaction_types::api::{ProfileUpdate, StatsUpdate};
use ecoaction_types::models::{Profile, UserId};

use crate::error::Result;
use crate::http::ApiClient;
use crate::session::Credential;

/// `/profile/{user_id}` endpoints. The backend returns the bare profile
/// object with no envelope.
#[derive(Clone)]
pub struct ProfileService {
    api: ApiClient,
}

impl ProfileService {
    pub fn new(api: ApiClient) -> Self {
        Self { api }
    }

    pub async fn fetch(&self, credential: &Credential, user_id: UserId) -> Result<Profile> {
        self.api
            .get(&format!("/profile/{}", user_id), Some(credential))
            .await
    }

    pub async fn update(&self, credential: &Credential, user_id: UserId, update: &ProfileUpdate) -> Result<Profile> {
        debug!(user_id, "updating profile");
        self.api
            .put_json(&format!("/profile/{}", user_id), update, Some(credential))
            .await
    }

    /// Only the counters set in `update` are sent.
    pub async fn update_stats(&self, credential: &Credential, user_id: UserId, update: &StatsUpdate) -> Result<Profile> {
        self.api
            .patch_json(&format!("/profile/{}/stats", user_id), update, Some(credential))
            .await
    }
}
