use chrono::Utc;
use tracing::{debug, warn};

use crate::api::{ApiClient, ApiResult};
use crate::auth::ValidationError;
use crate::models::{Conversation, Message, Role};

const REPLY_FAILED_MESSAGE: &str = "Failed to get a response from the assistant.";

/// The chat panel of one workspace.
pub struct ChatThread {
    api: ApiClient,
    workspace_id: i64,
    conversation_id: Option<i64>,
    messages: Vec<Message>,
    // Locally created messages count down from -1 so they never collide
    // with server ids.
    next_local_id: i64,
}

impl ChatThread {
    pub fn new(api: ApiClient, workspace_id: i64) -> Self {
        Self {
            api,
            workspace_id,
            conversation_id: None,
            messages: Vec::new(),
            next_local_id: -1,
        }
    }

    pub fn workspace_id(&self) -> i64 {
        self.workspace_id
    }

    pub fn conversation_id(&self) -> Option<i64> {
        self.conversation_id
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    fn push_local(&mut self, role: Role, content: String) -> Message {
        let message = Message {
            id: self.next_local_id,
            role,
            content,
            created_at: Utc::now().format("%Y-%m-%dT%H:%M:%S%.6f").to_string(),
            conversation_id: self.conversation_id.unwrap_or(0),
        };
        self.next_local_id -= 1;
        self.messages.push(message.clone());
        message
    }

    /// Send a message. The user's message is shown immediately; a failure
    /// leaves an assistant notice in the thread and is also returned. A
    /// rejected credential gets no notice.
    pub async fn send(&mut self, text: &str) -> ApiResult<Message> {
        let text = text.trim();
        if text.is_empty() {
            return Err(ValidationError::MissingField("Message").into());
        }
        self.push_local(Role::User, text.to_string());

        match self
            .api
            .send_chat(self.workspace_id, text, self.conversation_id)
            .await
        {
            Ok(reply) => {
                debug!(conversation_id = reply.conversation_id, "Chat reply received");
                self.conversation_id = Some(reply.conversation_id);
                Ok(self.push_local(Role::Assistant, reply.reply))
            }
            // Session listeners report a rejected credential.
            Err(e) if e.is_unauthorized() => Err(e),
            Err(e) => {
                warn!(workspace_id = self.workspace_id, error = %e, "Chat request failed");
                let detail = e.detail().unwrap_or(REPLY_FAILED_MESSAGE).to_string();
                self.push_local(Role::Assistant, format!("Error: {}", detail));
                Err(e)
            }
        }
    }

    pub async fn history(&self) -> ApiResult<Vec<Conversation>> {
        self.api.chat_history(self.workspace_id).await
    }

    /// Continue an earlier conversation.
    pub fn open(&mut self, conversation: Conversation) {
        self.conversation_id = Some(conversation.id);
        self.messages = conversation.messages;
    }

    pub fn new_chat(&mut self) {
        self.conversation_id = None;
        self.messages.clear();
    }

    pub async fn delete_conversation(&mut self, conversation_id: i64) -> ApiResult<()> {
        self.api.delete_conversation(conversation_id).await?;
        if self.conversation_id == Some(conversation_id) {
            self.new_chat();
        }
        Ok(())
    }
}
