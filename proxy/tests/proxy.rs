use axum::body::Body;
use axum::extract::Path;
use axum::http::{Request, StatusCode};
use axum::routing::{get, post};
use axum::{Json, Router};
use order_assistant_proxy::routes::{CHAT_FAILED, CHAT_FALLBACK};
use order_assistant_proxy::{build_router, ProxyConfig};
use serde_json::{json, Value};
use std::net::SocketAddr;
use tower::ServiceExt;

/// Starts a stand-in for the bot and the conversation backend.
async fn spawn_upstream() -> SocketAddr {
    let upstream = Router::new()
        .route(
            "/webhook",
            post(|Json(body): Json<Value>| async move {
                Json(json!({
                    "recipient_id": body["sender"],
                    "text": format!("echo: {}", body["message"].as_str().unwrap_or_default()),
                }))
            }),
        )
        .route(
            "/webhook-list",
            post(|| async {
                Json(json!([
                    {"text": "Pending orders:"},
                    {"text": "Download the report", "buttons": [{"title": "Yes", "payload": "/affirm"}]},
                ]))
            }),
        )
        .route(
            "/conversations",
            get(|| async {
                Json(json!({"conversations": [{"id": "c1", "title": "Show all pending orders", "updated_at": 2}]}))
            })
            .post(|Json(body): Json<Value>| async move {
                Json(json!({"success": true, "conversation_id": "c1", "echo": body}))
            }),
        )
        .route(
            "/conversations/{id}",
            get(|Path(id): Path<String>| async move {
                Json(json!({"id": id, "title": "t", "created_at": 1, "updated_at": 2, "messages": []}))
            }),
        )
        .route(
            "/list-sessions",
            get(|| async { (StatusCode::OK, "not json") }),
        );
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, upstream).await.unwrap();
    });
    addr
}

fn config(backend: &str, bot: &str) -> ProxyConfig {
    ProxyConfig {
        listen: "127.0.0.1:0".parse().unwrap(),
        backend_url: backend.to_string(),
        bot_url: bot.to_string(),
        static_dir: None,
    }
}

async fn call(app: Router, request: Request<Body>) -> (StatusCode, Value) {
    let res = app.oneshot(request).await.unwrap();
    let status = res.status();
    let bytes = axum::body::to_bytes(res.into_body(), usize::MAX).await.unwrap();
    (status, serde_json::from_slice(&bytes).unwrap())
}

fn post_json(uri: &str, body: Value) -> Request<Body> {
    Request::post(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

fn get_req(uri: &str) -> Request<Body> {
    Request::get(uri).body(Body::empty()).unwrap()
}

#[tokio::test]
async fn chat_wraps_single_reply() {
    let addr = spawn_upstream().await;
    let app = build_router(config(
        &format!("http://{addr}"),
        &format!("http://{addr}/webhook"),
    ));
    let (status, body) = call(
        app,
        post_json("/api/chat", json!({"sender": "user_1", "message": "hello"})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);
    let responses = body["responses"].as_array().unwrap();
    assert_eq!(responses.len(), 1);
    assert_eq!(responses[0]["text"], "echo: hello");
    assert_eq!(responses[0]["buttons"], json!([]));
}

#[tokio::test]
async fn chat_keeps_list_order() {
    let addr = spawn_upstream().await;
    let app = build_router(config(
        &format!("http://{addr}"),
        &format!("http://{addr}/webhook-list"),
    ));
    let (_, body) = call(app, post_json("/api/chat", json!({"message": "pending"}))).await;
    let responses = body["responses"].as_array().unwrap();
    assert_eq!(responses[0]["text"], "Pending orders:");
    assert_eq!(responses[1]["buttons"][0]["payload"], "/affirm");
}

#[tokio::test]
async fn chat_failure_carries_fallback() {
    let addr = spawn_upstream().await;
    let app = build_router(config(
        &format!("http://{addr}"),
        &format!("http://{addr}/missing"),
    ));
    let (status, body) = call(app, post_json("/api/chat", json!({"message": "hello"}))).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["success"], false);
    assert_eq!(body["error"], CHAT_FAILED);
    assert_eq!(body["responses"][0]["text"], CHAT_FALLBACK);
}

#[tokio::test]
async fn conversations_are_forwarded() {
    let addr = spawn_upstream().await;
    let backend = format!("http://{addr}");
    let bot = format!("http://{addr}/webhook");

    let (_, body) = call(build_router(config(&backend, &bot)), get_req("/api/conversations")).await;
    assert_eq!(body["conversations"][0]["id"], "c1");

    let (_, body) = call(
        build_router(config(&backend, &bot)),
        post_json("/api/conversations", json!({"message": {"text": "hi"}})),
    )
    .await;
    assert_eq!(body["conversation_id"], "c1");
    assert_eq!(body["echo"]["message"]["text"], "hi");

    let (_, body) = call(build_router(config(&backend, &bot)), get_req("/api/conversations/c9")).await;
    assert_eq!(body["id"], "c9");
}

#[tokio::test]
async fn backend_down_answers_envelope() {
    // Nothing listens on port 9 of the loopback.
    let app = || build_router(config("http://127.0.0.1:9", "http://127.0.0.1:9/webhook"));

    let (status, body) = call(app(), get_req("/api/conversations")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({"conversations": []}));

    let (status, body) = call(app(), get_req("/api/conversations/c1")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], false);
    assert!(body["error"].as_str().unwrap().starts_with("Upstream unreachable"));

    let (_, body) = call(
        app(),
        post_json("/api/save-session", json!({"session_id": "s1", "messages": []})),
    )
    .await;
    assert_eq!(body["success"], false);
}

#[tokio::test]
async fn invalid_backend_json_lists_nothing() {
    let addr = spawn_upstream().await;
    let app = build_router(config(
        &format!("http://{addr}"),
        &format!("http://{addr}/webhook"),
    ));
    let (_, body) = call(app, get_req("/api/list-sessions")).await;
    assert_eq!(body, json!({"sessions": []}));
}
