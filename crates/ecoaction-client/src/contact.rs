use tracing::info;

use ecoaction_types::api::{
    ContactMessageDetail, ContactMessageList, ContactMessageResponse, MessageFilters,
    NewContactMessage, UpdateMessageStatus,
};
use ecoaction_types::models::{ContactMessage, MessageStatus};

use crate::auth::validate_email;
use crate::error::{ClientError, Result};
use crate::http::ApiClient;
use crate::session::Credential;

/// `/contact/*` endpoints. Submitting is public; the rest is admin only.
#[derive(Clone)]
pub struct ContactService {
    api: ApiClient,
}

impl ContactService {
    pub fn new(api: ApiClient) -> Self {
        Self { api }
    }

    /// Send a message. When signed in the credential is attached so the
    /// backend can link the message to the user.
    pub async fn submit_message(
        &self,
        message: &NewContactMessage,
        credential: Option<&Credential>,
    ) -> Result<ContactMessage> {
        validate_message(message)?;
        let resp: ContactMessageResponse = self
            .api
            .post_json("/contact/messages", message, credential)
            .await?;
        info!(
            message_id = resp.contact_message.id,
            category = resp.contact_message.category.as_str(),
            "contact message sent"
        );
        Ok(resp.contact_message)
    }

    pub async fn messages(&self, credential: &Credential, filters: &MessageFilters) -> Result<Vec<ContactMessage>> {
        let mut query = Vec::new();
        if let Some(status) = filters.status {
            query.push(("status", status.as_str().to_string()));
        }
        if let Some(category) = filters.category {
            query.push(("category", category.as_str().to_string()));
        }
        let list: ContactMessageList = self
            .api
            .get_with_query("/contact/messages", &query, Some(credential))
            .await?;
        Ok(list.messages)
    }

    pub async fn message(&self, credential: &Credential, id: i64) -> Result<ContactMessage> {
        let resp: ContactMessageDetail = self
            .api
            .get(&format!("/contact/messages/{}", id), Some(credential))
            .await?;
        Ok(resp.message)
    }

    pub async fn update_status(
        &self,
        credential: &Credential,
        id: i64,
        status: MessageStatus,
    ) -> Result<ContactMessage> {
        let resp: ContactMessageResponse = self
            .api
            .put_json(
                &format!("/contact/messages/{}/status", id),
                &UpdateMessageStatus { status },
                Some(credential),
            )
            .await?;
        Ok(resp.contact_message)
    }
}

pub fn validate_message(message: &NewContactMessage) -> Result<()> {
    validate_email(&message.email)?;
    let subject = message.subject.trim().chars().count();
    if !(3..=200).contains(&subject) {
        return Err(ClientError::Validation(
            "Subject must be between 3 and 200 characters".into(),
        ));
    }
    if message.message.trim().chars().count() < 10 {
        return Err(ClientError::Validation(
            "Message must be at least 10 characters".into(),
        ));
    }
    Ok(())
}
