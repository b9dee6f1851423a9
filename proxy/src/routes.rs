//! Handlers forwarding `/api/*` calls to the bot and the conversation backend.
//!
//! Backend answers are passed through untouched; only the bot route reshapes
//! its payload into the `{success, responses}` envelope the client expects.

use crate::config::ProxyConfig;
use crate::error::ProxyError;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Deserialize;
use serde_json::{json, Value};
use std::sync::Arc;

pub const CHAT_FAILED: &str = "Failed to communicate with chat bot";
pub const CHAT_FALLBACK: &str =
    "Sorry, I'm having trouble connecting to the chat service. Please try again.";

#[derive(Clone)]
pub struct AppState {
    pub client: reqwest::Client,
    pub config: Arc<ProxyConfig>,
}

impl AppState {
    pub fn new(config: ProxyConfig) -> Self {
        AppState {
            client: reqwest::Client::new(),
            config: Arc::new(config),
        }
    }

    async fn get(&self, path: &str) -> Result<Value, ProxyError> {
        let url = self.config.backend(path);
        tracing::debug!(%url, "forward GET");
        let res = self.client.get(url).send().await?;
        Ok(res.json().await?)
    }

    async fn post(&self, path: &str, body: &Value) -> Result<Value, ProxyError> {
        let url = self.config.backend(path);
        tracing::debug!(%url, "forward POST");
        let res = self.client.post(url).json(body).send().await?;
        Ok(res.json().await?)
    }
}

#[derive(Debug, Deserialize)]
pub struct ChatRequest {
    pub message: String,
    #[serde(default = "default_sender")]
    pub sender: String,
}

fn default_sender() -> String {
    "user".to_string()
}

fn field_or(item: &Value, key: &str, default: Value) -> Value {
    match item.get(key) {
        None | Some(Value::Null) => default,
        Some(value) => value.clone(),
    }
}

/// Turns a bot answer (one object or a list) into uniform reply objects.
pub fn bot_responses(body: Value) -> Vec<Value> {
    let items = match body {
        Value::Array(items) => items,
        Value::Null => vec![],
        other => vec![other],
    };
    items
        .iter()
        .map(|item| {
            let text = item.get("text").and_then(Value::as_str).unwrap_or_default();
            json!({
                "text": text,
                "buttons": field_or(item, "buttons", json!([])),
                "image": field_or(item, "image", Value::Null),
                "attachment": field_or(item, "attachment", Value::Null),
                "custom": field_or(item, "custom", Value::Null),
            })
        })
        .collect()
}

async fn ask_bot(state: &AppState, request: &ChatRequest) -> Result<Value, ProxyError> {
    let res = state
        .client
        .post(&state.config.bot_url)
        .json(&json!({ "sender": request.sender, "message": request.message }))
        .send()
        .await?
        .error_for_status()?;
    Ok(res.json().await?)
}

pub async fn chat(State(state): State<AppState>, Json(request): Json<ChatRequest>) -> Response {
    match ask_bot(&state, &request).await {
        Ok(body) => {
            let responses = bot_responses(body);
            tracing::info!(sender = %request.sender, replies = responses.len(), "bot answered");
            Json(json!({ "success": true, "responses": responses })).into_response()
        }
        Err(err) => {
            tracing::error!(sender = %request.sender, "bot failed: {err}");
            let body = json!({
                "success": false,
                "error": CHAT_FAILED,
                "responses": [{ "text": CHAT_FALLBACK }],
            });
            (StatusCode::INTERNAL_SERVER_ERROR, Json(body)).into_response()
        }
    }
}

pub async fn list_conversations(State(state): State<AppState>) -> Json<Value> {
    match state.get("conversations").await {
        Ok(body) => Json(body),
        Err(err) => {
            tracing::warn!("list conversations: {err}");
            Json(json!({ "conversations": [] }))
        }
    }
}

pub async fn create_conversation(
    State(state): State<AppState>,
    Json(body): Json<Value>,
) -> Result<Json<Value>, ProxyError> {
    Ok(Json(state.post("conversations", &body).await?))
}

pub async fn get_conversation(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Value>, ProxyError> {
    Ok(Json(state.get(&format!("conversations/{id}")).await?))
}

pub async fn append_message(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(body): Json<Value>,
) -> Result<Json<Value>, ProxyError> {
    Ok(Json(
        state
            .post(&format!("conversations/{id}/messages"), &body)
            .await?,
    ))
}

pub async fn get_session(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Value>, ProxyError> {
    Ok(Json(state.get(&format!("get-session/{id}")).await?))
}

pub async fn save_session(
    State(state): State<AppState>,
    Json(body): Json<Value>,
) -> Result<Json<Value>, ProxyError> {
    Ok(Json(state.post("save-session", &body).await?))
}

pub async fn list_sessions(State(state): State<AppState>) -> Json<Value> {
    match state.get("list-sessions").await {
        Ok(body) => Json(body),
        Err(err) => {
            tracing::warn!("list sessions: {err}");
            Json(json!({ "sessions": [] }))
        }
    }
}

pub async fn health() -> Json<Value> {
    Json(json!({ "status": "ok", "version": env!("CARGO_PKG_VERSION") }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_single_object_becomes_list() {
        let responses = bot_responses(json!({"recipient_id": "user_1", "text": "Hi"}));
        assert_eq!(
            responses,
            vec![json!({
                "text": "Hi",
                "buttons": [],
                "image": null,
                "attachment": null,
                "custom": null,
            })]
        );
    }

    #[test]
    fn test_list_keeps_order_and_fields() {
        let responses = bot_responses(json!([
            {"text": "Pending orders:"},
            {"image": "https://cdn.example/trend.png", "buttons": [{"title": "More", "payload": "/more"}]},
        ]));
        assert_eq!(responses.len(), 2);
        assert_eq!(responses[0]["text"], "Pending orders:");
        assert_eq!(responses[1]["text"], "");
        assert_eq!(responses[1]["image"], "https://cdn.example/trend.png");
        assert_eq!(responses[1]["buttons"][0]["payload"], "/more");
    }

    #[test]
    fn test_null_body() {
        assert!(bot_responses(Value::Null).is_empty());
    }

    #[test]
    fn test_default_sender() {
        let request: ChatRequest = serde_json::from_value(json!({"message": "hello"})).unwrap();
        assert_eq!(request.sender, "user");
    }
}
