use crate::config::ChatConfig;
use crate::error::ChatError;
use crate::state::BotReply;
use async_trait::async_trait;
use serde::Serialize;
use serde_json::Value;

pub const FALLBACK_UNREACHABLE: &str =
    "Sorry, I'm having trouble connecting. Please check if the bot server is running.";
pub const FALLBACK_NO_REPLY: &str =
    "I received your message but don't have a specific response. Could you try rephrasing?";

#[async_trait(?Send)]
pub trait BotGateway {
    /// Sends `utterance` on behalf of `sender`; empty replies are dropped.
    async fn send(&self, utterance: &str, sender: &str) -> Result<Vec<BotReply>, ChatError>;
}

#[derive(Serialize)]
struct Outgoing<'a> {
    sender: &'a str,
    message: &'a str,
}

/// Talks to the bot through the proxy's `/chat` route, or to a bot webhook
/// directly when `url` points at one.
pub struct RestGateway {
    client: reqwest::Client,
    url: String,
}

impl RestGateway {
    pub fn new(url: impl Into<String>) -> Self {
        RestGateway {
            client: reqwest::Client::new(),
            url: url.into(),
        }
    }

    pub fn from_config(config: &ChatConfig) -> Self {
        Self::new(config.endpoint("chat"))
    }
}

#[async_trait(?Send)]
impl BotGateway for RestGateway {
    async fn send(&self, utterance: &str, sender: &str) -> Result<Vec<BotReply>, ChatError> {
        let message = utterance.trim();
        if message.is_empty() {
            return Err(ChatError::EmptyInput);
        }
        let res = self
            .client
            .post(&self.url)
            .json(&Outgoing { sender, message })
            .send()
            .await
            .map_err(|err| ChatError::GatewayUnreachable(err.to_string()))?;
        if !res.status().is_success() {
            return Err(ChatError::GatewayUnreachable(format!(
                "status {}",
                res.status()
            )));
        }
        let body: Value = res
            .json()
            .await
            .map_err(|err| ChatError::GatewayUnreachable(err.to_string()))?;
        normalize_replies(body)
    }
}

/// Accepts a bare reply, a list of replies or the proxy envelope
/// `{success, responses}` and returns the non-empty replies in order.
pub fn normalize_replies(body: Value) -> Result<Vec<BotReply>, ChatError> {
    let items = match body {
        Value::Array(items) => items,
        Value::Object(mut object) if object.contains_key("responses") => {
            if object.get("success").and_then(Value::as_bool) == Some(false) {
                let error = object
                    .get("error")
                    .and_then(Value::as_str)
                    .unwrap_or("bot gateway failed")
                    .to_string();
                return Err(ChatError::GatewayUnreachable(error));
            }
            match object.remove("responses") {
                Some(Value::Array(items)) => items,
                Some(other) => vec![other],
                None => vec![],
            }
        }
        Value::Null => vec![],
        other => vec![other],
    };
    let mut replies = Vec::with_capacity(items.len());
    for item in items {
        let reply: BotReply = serde_json::from_value(item)?;
        if !reply.is_empty() {
            replies.push(reply);
        }
    }
    Ok(replies)
}
