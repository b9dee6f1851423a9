pub mod config;
pub mod error;
pub mod routes;

use axum::routing::{get, post};
use axum::Router;
use tower_http::cors::{Any, CorsLayer};
use tower_http::services::{ServeDir, ServeFile};
use tower_http::trace::TraceLayer;

pub use config::ProxyConfig;
pub use error::ProxyError;
pub use routes::AppState;

pub fn build_router(config: ProxyConfig) -> Router {
    let static_dir = config.static_dir.clone();
    let state = AppState::new(config);

    let api = Router::new()
        .route("/chat", post(routes::chat))
        .route(
            "/conversations",
            get(routes::list_conversations).post(routes::create_conversation),
        )
        .route("/conversations/{id}", get(routes::get_conversation))
        .route("/conversations/{id}/messages", post(routes::append_message))
        .route("/get-session/{id}", get(routes::get_session))
        .route("/save-session", post(routes::save_session))
        .route("/list-sessions", get(routes::list_sessions));

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let mut router = Router::new()
        .nest("/api", api)
        .route("/health", get(routes::health))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state);

    if let Some(dir) = static_dir.filter(|d| d.exists()) {
        let index = dir.join("index.html");
        tracing::info!(path = %dir.display(), "serving client bundle");
        router = router.fallback_service(ServeDir::new(dir).fallback(ServeFile::new(index)));
    }
    router
}
