use ecoaction_types::api::{ChatReply, ChatRequest};

use crate::error::{ClientError, Result};
use crate::http::ApiClient;

/// `POST /ai/chat`.
#[derive(Clone)]
pub struct AiService {
    api: ApiClient,
}

impl AiService {
    pub fn new(api: ApiClient) -> Self {
        Self { api }
    }

    pub async fn chat(&self, message: &str) -> Result<String> {
        let message = message.trim();
        if message.is_empty() {
            return Err(ClientError::Validation("Message cannot be empty".into()));
        }
        let resp: ChatReply = self.api.post_json("/ai/chat", &ChatRequest { message }, None).await?;
        Ok(resp.reply)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Speaker {
    User,
    Assistant,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Turn {
    pub speaker: Speaker,
    pub text: String,
}

/// Chat transcript. A user turn is only recorded together with the reply
/// it produced, so a failed call leaves the transcript unchanged.
#[derive(Clone)]
pub struct Conversation {
    service: AiService,
    turns: Vec<Turn>,
}

impl Conversation {
    pub fn new(service: AiService) -> Self {
        Self {
            service,
            turns: Vec::new(),
        }
    }

    pub async fn send(&mut self, message: &str) -> Result<&str> {
        let reply = self.service.chat(message).await?;
        self.turns.push(Turn {
            speaker: Speaker::User,
            text: message.trim().to_string(),
        });
        self.turns.push(Turn {
            speaker: Speaker::Assistant,
            text: reply,
        });
        Ok(&self.turns[self.turns.len() - 1].text)
    }

    pub fn turns(&self) -> &[Turn] {
        &self.turns
    }

    pub fn clear(&mut self) {
        self.turns.clear();
    }
}
