use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// One row of tabular data. Key order is the column order.
pub type Record = Map<String, Value>;

pub const WELCOME: &str = "Hello! I'm your order management assistant. I can help you track orders, check delivery status, find orders by customer, date, location, and much more. How can I assist you today?";

const TITLE_LEN: usize = 30;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Sender {
    User,
    Bot,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct Button {
    #[serde(rename = "title")]
    pub label: String,
    pub payload: String,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct Message {
    pub id: String,
    #[serde(default)]
    pub text: String,
    pub sender: Sender,
    #[serde(default)]
    pub timestamp: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub buttons: Option<Vec<Button>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub custom: Option<Value>,
}

impl Message {
    fn new(text: String, sender: Sender) -> Self {
        Message {
            id: uuid::Uuid::new_v4().to_string(),
            text,
            sender,
            timestamp: Utc::now().timestamp_millis(),
            buttons: None,
            image: None,
            custom: None,
        }
    }

    pub fn user(text: impl Into<String>) -> Self {
        Self::new(text.into(), Sender::User)
    }

    pub fn bot(text: impl Into<String>) -> Self {
        Self::new(text.into(), Sender::Bot)
    }

    pub fn welcome() -> Self {
        Self::bot(WELCOME)
    }

    pub fn is_bot(&self) -> bool {
        self.sender == Sender::Bot
    }

    /// Bot messages with nothing to show are hidden.
    pub fn is_visible(&self) -> bool {
        !self.is_bot()
            || !self.text.trim().is_empty()
            || self.image.is_some()
            || self.custom.as_ref().is_some_and(|c| !c.is_null())
    }

    /// Backend-labeled rows carried in `custom.table_data`.
    pub fn table_data(&self) -> Option<Vec<Record>> {
        let rows = self.custom.as_ref()?.get("table_data")?.as_array()?;
        let records: Vec<Record> = rows
            .iter()
            .filter_map(|row| row.as_object().cloned())
            .collect();
        if records.is_empty() {
            None
        } else {
            Some(records)
        }
    }

    pub fn excel_url(&self) -> Option<&str> {
        self.custom.as_ref()?.get("excel_url")?.as_str()
    }
}

impl From<BotReply> for Message {
    fn from(reply: BotReply) -> Self {
        let mut message = Message::bot(reply.text.unwrap_or_default());
        message.buttons = reply.buttons.filter(|b| !b.is_empty());
        message.image = reply.image.filter(|i| !i.is_empty());
        message.custom = reply.custom.filter(|c| !c.is_null());
        message
    }
}

/// One element of what the bot gateway answers.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct BotReply {
    #[serde(default)]
    pub text: Option<String>,
    #[serde(default)]
    pub buttons: Option<Vec<Button>>,
    #[serde(default)]
    pub image: Option<String>,
    #[serde(default)]
    pub attachment: Option<Value>,
    #[serde(default)]
    pub custom: Option<Value>,
}

impl BotReply {
    pub fn is_empty(&self) -> bool {
        self.text.as_deref().map_or(true, |t| t.trim().is_empty())
            && self.image.as_deref().map_or(true, str::is_empty)
            && self.custom.as_ref().map_or(true, Value::is_null)
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct Conversation {
    pub id: String,
    #[serde(default)]
    pub title: String,
    pub created_at: i64,
    pub updated_at: i64,
    #[serde(default)]
    pub messages: Vec<Message>,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct ConversationSummary {
    pub id: String,
    #[serde(default)]
    pub title: String,
    pub updated_at: i64,
}

/// Most recently updated first, whatever order the store answered in.
pub fn sort_summaries(summaries: &mut [ConversationSummary]) {
    summaries.sort_by(|a, b| b.updated_at.cmp(&a.updated_at));
}

pub fn truncate_title(title: &str) -> String {
    if title.chars().count() > TITLE_LEN {
        let head: String = title.chars().take(TITLE_LEN).collect();
        format!("{head}...")
    } else {
        title.to_owned()
    }
}
