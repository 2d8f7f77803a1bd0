use ecoaction_types::models::{Dashboard, UserId};

use crate::error::Result;
use crate::http::ApiClient;
use crate::session::Credential;

/// `/dashboard/{user_id}`: stats, insights for the user's county and recent
/// activity in one call. The body has no envelope.
#[derive(Clone)]
pub struct DashboardService {
    api: ApiClient,
}

impl DashboardService {
    pub fn new(api: ApiClient) -> Self {
        Self { api }
    }

    pub async fn fetch(&self, user_id: UserId, credential: Option<&Credential>) -> Result<Dashboard> {
        self.api
            .get(&format!("/dashboard/{}", user_id), credential)
            .await
    }
}
