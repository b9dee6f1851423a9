//! Clients for the conversation persistence backend.
//!
//! Two wire schemes exist: the conversation API with server-assigned ids and
//! the older session endpoints storing whole message lists. Both sit behind
//! [`ConversationStore`] so the view does not care which one is configured.

use crate::config::{ChatConfig, PersistenceMode};
use crate::error::ChatError;
use crate::state::{sort_summaries, Conversation, ConversationSummary, Message, Sender};
use async_trait::async_trait;
use leptos::logging::log;
use serde::{Deserialize, Serialize};
use std::rc::Rc;

#[async_trait(?Send)]
pub trait ConversationStore {
    async fn create(&self, first: &Message) -> Result<String, ChatError>;

    /// Not idempotent: a retry may store the message twice.
    async fn append(&self, conversation_id: &str, message: &Message) -> Result<bool, ChatError>;

    async fn fetch(&self, conversation_id: &str) -> Result<Conversation, ChatError>;

    /// Summaries sorted by `updated_at`, most recent first.
    async fn list(&self) -> Result<Vec<ConversationSummary>, ChatError>;
}

pub fn from_config(config: &ChatConfig) -> Rc<dyn ConversationStore> {
    match config.persistence_mode {
        PersistenceMode::Conversations => Rc::new(ConversationApi::new(config.clone())),
        PersistenceMode::Sessions => Rc::new(SessionApi::new(config.clone())),
    }
}

#[derive(Serialize)]
struct MessageBody<'a> {
    message: &'a Message,
}

#[derive(Deserialize)]
struct Created {
    #[serde(default)]
    success: bool,
    conversation_id: Option<String>,
    error: Option<String>,
}

#[derive(Deserialize)]
struct Appended {
    #[serde(default)]
    success: bool,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum Fetched {
    Missing { error: String },
    Found(Conversation),
}

#[derive(Deserialize)]
struct Listed {
    #[serde(default)]
    conversations: Vec<ConversationSummary>,
}

pub struct ConversationApi {
    client: reqwest::Client,
    config: ChatConfig,
}

impl ConversationApi {
    pub fn new(config: ChatConfig) -> Self {
        ConversationApi {
            client: reqwest::Client::new(),
            config,
        }
    }
}

#[async_trait(?Send)]
impl ConversationStore for ConversationApi {
    async fn create(&self, first: &Message) -> Result<String, ChatError> {
        let res = self
            .client
            .post(self.config.endpoint("conversations"))
            .json(&MessageBody { message: first })
            .send()
            .await
            .map_err(|err| ChatError::BackendUnavailable(err.to_string()))?;
        let created: Created = res
            .json()
            .await
            .map_err(|err| ChatError::BackendUnavailable(err.to_string()))?;
        match (created.success, created.conversation_id) {
            (true, Some(id)) => {
                log!("Created conversation {id}");
                Ok(id)
            }
            _ => Err(ChatError::BackendUnavailable(
                created
                    .error
                    .unwrap_or_else(|| "conversation was not created".to_string()),
            )),
        }
    }

    async fn append(&self, conversation_id: &str, message: &Message) -> Result<bool, ChatError> {
        let url = self
            .config
            .endpoint(&format!("conversations/{conversation_id}/messages"));
        let res = self
            .client
            .post(url)
            .json(&MessageBody { message })
            .send()
            .await?;
        let appended: Appended = res.json().await?;
        Ok(appended.success)
    }

    async fn fetch(&self, conversation_id: &str) -> Result<Conversation, ChatError> {
        let url = self
            .config
            .endpoint(&format!("conversations/{conversation_id}"));
        let fetched: Fetched = self.client.get(url).send().await?.json().await?;
        match fetched {
            Fetched::Found(conversation) => Ok(conversation),
            Fetched::Missing { error } => {
                log!("Fetch of {conversation_id} failed: {error}");
                Err(ChatError::NotFound(conversation_id.to_string()))
            }
        }
    }

    async fn list(&self) -> Result<Vec<ConversationSummary>, ChatError> {
        let listed: Listed = self
            .client
            .get(self.config.endpoint("conversations"))
            .send()
            .await?
            .json()
            .await?;
        let mut summaries = listed.conversations;
        sort_summaries(&mut summaries);
        Ok(summaries)
    }
}

#[derive(Serialize)]
struct SaveSession<'a> {
    session_id: &'a str,
    messages: &'a [Message],
}

#[derive(Deserialize)]
struct SessionMessages {
    #[serde(default)]
    success: bool,
    #[serde(default)]
    messages: Vec<Message>,
}

#[derive(Deserialize)]
struct SessionEntry {
    session_id: String,
    last_updated: Option<i64>,
}

#[derive(Deserialize)]
struct SessionList {
    #[serde(default)]
    sessions: Vec<SessionEntry>,
}

/// Builds a conversation out of a bare session message list.
pub fn session_conversation(session_id: &str, messages: Vec<Message>) -> Conversation {
    let title = messages
        .iter()
        .find(|m| m.sender == Sender::User)
        .map(|m| m.text.clone())
        .unwrap_or_else(|| session_title(session_id));
    let created_at = messages.first().map_or(0, |m| m.timestamp);
    let updated_at = messages
        .iter()
        .map(|m| m.timestamp)
        .max()
        .unwrap_or(created_at)
        .max(created_at);
    Conversation {
        id: session_id.to_string(),
        title,
        created_at,
        updated_at,
        messages,
    }
}

fn session_title(session_id: &str) -> String {
    let short: String = session_id.chars().take(8).collect();
    format!("Session {short}")
}

/// The session scheme has no append call: the whole list is saved again.
fn with_appended(stored: Conversation, message: &Message) -> Vec<Message> {
    let mut messages = stored.messages;
    messages.push(message.clone());
    messages
}

pub struct SessionApi {
    client: reqwest::Client,
    config: ChatConfig,
}

impl SessionApi {
    pub fn new(config: ChatConfig) -> Self {
        SessionApi {
            client: reqwest::Client::new(),
            config,
        }
    }

    async fn save(&self, session_id: &str, messages: &[Message]) -> Result<bool, ChatError> {
        let res = self
            .client
            .post(self.config.endpoint("save-session"))
            .json(&SaveSession {
                session_id,
                messages,
            })
            .send()
            .await?;
        let saved: Appended = res.json().await?;
        Ok(saved.success)
    }
}

#[async_trait(?Send)]
impl ConversationStore for SessionApi {
    async fn create(&self, first: &Message) -> Result<String, ChatError> {
        let session_id = uuid::Uuid::new_v4().to_string();
        match self.save(&session_id, std::slice::from_ref(first)).await {
            Ok(true) => Ok(session_id),
            Ok(false) => Err(ChatError::BackendUnavailable(
                "session was not saved".to_string(),
            )),
            Err(err) => Err(ChatError::BackendUnavailable(err.to_string())),
        }
    }

    async fn append(&self, conversation_id: &str, message: &Message) -> Result<bool, ChatError> {
        let stored = self.fetch(conversation_id).await?;
        let messages = with_appended(stored, message);
        self.save(conversation_id, &messages).await
    }

    async fn fetch(&self, conversation_id: &str) -> Result<Conversation, ChatError> {
        let url = self
            .config
            .endpoint(&format!("get-session/{conversation_id}"));
        let session: SessionMessages = self.client.get(url).send().await?.json().await?;
        if !session.success {
            return Err(ChatError::NotFound(conversation_id.to_string()));
        }
        Ok(session_conversation(conversation_id, session.messages))
    }

    async fn list(&self) -> Result<Vec<ConversationSummary>, ChatError> {
        let listed: SessionList = self
            .client
            .get(self.config.endpoint("list-sessions"))
            .send()
            .await?
            .json()
            .await?;
        let mut summaries: Vec<ConversationSummary> = listed
            .sessions
            .into_iter()
            .map(|s| ConversationSummary {
                title: session_title(&s.session_id),
                updated_at: s.last_updated.unwrap_or(0),
                id: s.session_id,
            })
            .collect();
        sort_summaries(&mut summaries);
        Ok(summaries)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_fetched_error_shape() {
        let fetched: Fetched =
            serde_json::from_value(json!({"error": "Conversation not found"})).unwrap();
        assert!(matches!(fetched, Fetched::Missing { .. }));

        let fetched: Fetched = serde_json::from_value(json!({
            "id": "c1",
            "title": "Show all pending orders",
            "created_at": 10,
            "updated_at": 20,
            "messages": [{"id": "m1", "text": "Show all pending orders", "sender": "user", "timestamp": 10}]
        }))
        .unwrap();
        match fetched {
            Fetched::Found(conversation) => {
                assert_eq!(conversation.id, "c1");
                assert_eq!(conversation.messages.len(), 1);
            }
            Fetched::Missing { .. } => panic!("expected a conversation"),
        }
    }

    #[test]
    fn test_created_without_success() {
        let created: Created = serde_json::from_value(json!({"success": false, "error": "db down"})).unwrap();
        assert!(!created.success);
        assert_eq!(created.error.as_deref(), Some("db down"));
    }

    #[test]
    fn test_session_conversation() {
        let mut hello = Message::bot("Hello");
        hello.timestamp = 5;
        let mut question = Message::user("Show all pending orders");
        question.timestamp = 9;
        let conversation = session_conversation("0f3c2a9e-11", vec![hello, question]);
        assert_eq!(conversation.title, "Show all pending orders");
        assert_eq!(conversation.created_at, 5);
        assert_eq!(conversation.updated_at, 9);
        assert!(conversation.updated_at >= conversation.created_at);

        let empty = session_conversation("0f3c2a9e-11", vec![]);
        assert_eq!(empty.title, "Session 0f3c2a9e");
    }

    #[test]
    fn test_session_append_saves_full_list() {
        let first = Message::user("Show all pending orders");
        let reply = Message::bot("- Order ID: A1 | Status: Pending");
        let stored = session_conversation("s1", vec![first.clone(), reply.clone()]);
        let next = Message::user("long pending orders");

        let messages = with_appended(stored, &next);
        let body = serde_json::to_value(SaveSession {
            session_id: "s1",
            messages: &messages,
        })
        .unwrap();
        assert_eq!(body["session_id"], "s1");
        let ids: Vec<&str> = body["messages"]
            .as_array()
            .unwrap()
            .iter()
            .map(|m| m["id"].as_str().unwrap())
            .collect();
        assert_eq!(ids, vec![first.id.as_str(), reply.id.as_str(), next.id.as_str()]);
        assert_eq!(body["messages"][2]["text"], "long pending orders");
    }

    #[test]
    fn test_session_list_shape() {
        let listed: SessionList = serde_json::from_value(json!({
            "sessions": [
                {"session_id": "a", "last_updated": 1},
                {"session_id": "b", "last_updated": null}
            ]
        }))
        .unwrap();
        assert_eq!(listed.sessions.len(), 2);
        assert_eq!(listed.sessions[1].last_updated, None);
    }
}
