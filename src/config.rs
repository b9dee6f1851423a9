//! Runtime configuration for the chat view.
//!
//! The defaults can be overridden at build time with `ORDER_ASSISTANT_*`
//! environment variables, read through `option_env!`.

use leptos::logging::warn;

pub const SESSION_KEY: &str = "order_assistant_session_id";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PersistenceMode {
    /// Server-assigned conversation ids.
    Conversations,
    /// Whole message lists keyed by a browser session id.
    Sessions,
}

impl std::str::FromStr for PersistenceMode {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "conversations" => Ok(PersistenceMode::Conversations),
            "sessions" => Ok(PersistenceMode::Sessions),
            other => Err(format!("Unknown persistence mode {other}")),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ChatConfig {
    /// Base URL of the same-origin proxy, without trailing slash.
    pub api_base: String,
    pub enable_table_parsing: bool,
    pub enable_suggestions: bool,
    pub persistence_mode: PersistenceMode,
    pub persist_bot_replies: bool,
}

impl Default for ChatConfig {
    fn default() -> Self {
        ChatConfig {
            api_base: "http://localhost:3000/api".to_string(),
            enable_table_parsing: true,
            enable_suggestions: true,
            persistence_mode: PersistenceMode::Conversations,
            persist_bot_replies: false,
        }
    }
}

fn flag(value: Option<&str>, default: bool) -> bool {
    match value.map(|v| v.trim().to_ascii_lowercase()) {
        Some(v) if v == "1" || v == "true" || v == "on" => true,
        Some(v) if v == "0" || v == "false" || v == "off" => false,
        _ => default,
    }
}

impl ChatConfig {
    /// `origin` is the page origin, used when no API base was baked in.
    pub fn from_env(origin: Option<&str>) -> Self {
        Self::from_values(
            origin,
            option_env!("ORDER_ASSISTANT_API"),
            option_env!("ORDER_ASSISTANT_PERSISTENCE"),
            option_env!("ORDER_ASSISTANT_SUGGESTIONS"),
            option_env!("ORDER_ASSISTANT_TABLES"),
            option_env!("ORDER_ASSISTANT_PERSIST_REPLIES"),
        )
    }

    fn from_values(
        origin: Option<&str>,
        api: Option<&str>,
        persistence: Option<&str>,
        suggestions: Option<&str>,
        tables: Option<&str>,
        persist_replies: Option<&str>,
    ) -> Self {
        let default = ChatConfig::default();
        let api_base = match (api.filter(|a| !a.is_empty()), origin) {
            (Some(api), _) => api.to_string(),
            (None, Some(origin)) => format!("{origin}/api"),
            (None, None) => default.api_base,
        };
        let persistence_mode = match persistence.map(str::parse) {
            Some(Ok(mode)) => mode,
            Some(Err(err)) => {
                warn!("{err}, using conversations");
                PersistenceMode::Conversations
            }
            None => default.persistence_mode,
        };
        ChatConfig {
            api_base: api_base.trim_end_matches('/').to_string(),
            enable_table_parsing: flag(tables, default.enable_table_parsing),
            enable_suggestions: flag(suggestions, default.enable_suggestions),
            persistence_mode,
            persist_bot_replies: flag(persist_replies, default.persist_bot_replies),
        }
    }

    pub fn endpoint(&self, path: &str) -> String {
        format!("{}/{}", self.api_base, path.trim_start_matches('/'))
    }
}

/// Identity of this browser tab towards the bot, passed explicitly to the
/// gateway instead of being read from storage at call time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionContext {
    pub session_id: String,
}

impl SessionContext {
    pub fn new(session_id: impl Into<String>) -> Self {
        SessionContext {
            session_id: session_id.into(),
        }
    }

    pub fn generate() -> Self {
        Self::new(format!("user_{}", uuid::Uuid::new_v4().simple()))
    }

    /// Loads the id kept in local storage, minting and storing one if absent.
    pub fn from_local_storage() -> Self {
        let storage = leptos::window().local_storage().ok().flatten();
        if let Some(storage) = &storage {
            if let Ok(Some(id)) = storage.get_item(SESSION_KEY) {
                if !id.is_empty() {
                    return Self::new(id);
                }
            }
        }
        let context = Self::generate();
        if let Some(storage) = storage {
            if storage.set_item(SESSION_KEY, &context.session_id).is_err() {
                warn!("Could not persist session id");
            }
        }
        context
    }

    /// The bot tracks one dialogue per conversation when one exists.
    pub fn sender_for(&self, conversation_id: Option<&str>) -> String {
        conversation_id.unwrap_or(&self.session_id).to_string()
    }
}
