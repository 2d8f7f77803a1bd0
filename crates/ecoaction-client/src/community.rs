use ecoaction_types::api::{
    Ack, ActionFilters, ActionList, ActionResponse, ActionUpdate, NewAction, StatsResponse,
};
use ecoaction_types::models::{ActionCategory, ActionId, CommunityAction, CommunityStats};

use crate::error::{ClientError, Result};
use crate::http::ApiClient;
use crate::session::Credential;

/// `/community/*` endpoints.
#[derive(Clone)]
pub struct CommunityService {
    api: ApiClient,
}

impl CommunityService {
    pub fn new(api: ApiClient) -> Self {
        Self { api }
    }

    pub async fn list_actions(&self, filters: &ActionFilters) -> Result<Vec<CommunityAction>> {
        let list: ActionList = self
            .api
            .get_with_query("/community/actions", &filters.to_query(), None)
            .await?;
        Ok(list.actions)
    }

    pub async fn get_action(&self, id: ActionId) -> Result<CommunityAction> {
        let resp: ActionResponse = self.api.get(&format!("/community/actions/{}", id), None).await?;
        Ok(resp.action)
    }

    pub async fn create_action(&self, credential: &Credential, action: &NewAction) -> Result<CommunityAction> {
        validate_new_action(action)?;
        let resp: ActionResponse = self
            .api
            .post_json("/community/actions", action, Some(credential))
            .await?;
        Ok(resp.action)
    }

    pub async fn update_action(
        &self,
        credential: &Credential,
        id: ActionId,
        update: &ActionUpdate,
    ) -> Result<CommunityAction> {
        let resp: ActionResponse = self
            .api
            .put_json(&format!("/community/actions/{}", id), update, Some(credential))
            .await?;
        Ok(resp.action)
    }

    pub async fn delete_action(&self, credential: &Credential, id: ActionId) -> Result<Ack> {
        self.api
            .delete(&format!("/community/actions/{}", id), Some(credential))
            .await
    }

    pub async fn join_action(&self, credential: &Credential, id: ActionId) -> Result<Ack> {
        self.api
            .post_empty(&format!("/community/actions/{}/join", id), Some(credential))
            .await
    }

    pub async fn leave_action(&self, credential: &Credential, id: ActionId) -> Result<Ack> {
        self.api
            .post_empty(&format!("/community/actions/{}/leave", id), Some(credential))
            .await
    }

    /// Actions the signed-in user has joined.
    pub async fn my_actions(&self, credential: &Credential) -> Result<Vec<CommunityAction>> {
        let list: ActionList = self.api.get("/community/my-actions", Some(credential)).await?;
        Ok(list.actions)
    }

    pub async fn stats(&self) -> Result<CommunityStats> {
        let resp: StatsResponse = self.api.get("/community/stats", None).await?;
        Ok(resp.stats)
    }

    // -- Admin --

    pub async fn proposals(&self, credential: &Credential) -> Result<Vec<CommunityAction>> {
        let list: ActionList = self
            .api
            .get("/community/admin/proposals", Some(credential))
            .await?;
        Ok(list.actions)
    }

    pub async fn approve_proposal(&self, credential: &Credential, id: ActionId) -> Result<Ack> {
        self.api
            .post_empty(
                &format!("/community/admin/proposals/{}/approve", id),
                Some(credential),
            )
            .await
    }

    pub async fn reject_proposal(&self, credential: &Credential, id: ActionId) -> Result<Ack> {
        self.api
            .post_empty(
                &format!("/community/admin/proposals/{}/reject", id),
                Some(credential),
            )
            .await
    }

    pub async fn mark_complete(&self, credential: &Credential, id: ActionId) -> Result<Ack> {
        self.api
            .post_empty(
                &format!("/community/admin/actions/{}/complete", id),
                Some(credential),
            )
            .await
    }
}

const CATEGORIES: [ActionCategory; 4] = [
    ActionCategory::Environment,
    ActionCategory::Agriculture,
    ActionCategory::Conservation,
    ActionCategory::Education,
];

/// Mirrors the backend's create-action constraints so the form can fail fast.
pub fn validate_new_action(action: &NewAction) -> Result<()> {
    let title = action.title.trim().chars().count();
    if !(3..=200).contains(&title) {
        return Err(ClientError::Validation(
            "Title must be between 3 and 200 characters".into(),
        ));
    }
    if action.description.trim().chars().count() < 10 {
        return Err(ClientError::Validation(
            "Description must be at least 10 characters".into(),
        ));
    }
    if !CATEGORIES.iter().any(|c| c.as_str() == action.category) {
        return Err(ClientError::Validation(format!(
            "Unknown category: {}",
            action.category
        )));
    }
    let location = action.location.trim().chars().count();
    if !(3..=200).contains(&location) {
        return Err(ClientError::Validation(
            "Location must be between 3 and 200 characters".into(),
        ));
    }
    if action.date.trim().is_empty() {
        return Err(ClientError::Validation("Date is required".into()));
    }
    Ok(())
}
