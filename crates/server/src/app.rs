use std::sync::Arc;

use axum::extract::DefaultBodyLimit;
use axum::http::{header, HeaderValue, Method};
use axum::routing::{get, post, put};
use axum::Router;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use tripchat_agent::{AgentRuntime, ReceiptAnalyzer};
use tripchat_core::config::ServerConfig;
use tripchat_core::session::SessionSigner;
use tripchat_db::{DbPool, Store};

use crate::{chat, events, health, receipts, trips, users};

/// Everything a handler may reach. Cloned per request, so every field is
/// a cheap handle.
#[derive(Clone)]
pub struct AppState {
    pub store: Store,
    pub runtime: Arc<AgentRuntime>,
    pub receipts: Arc<ReceiptAnalyzer>,
    pub sessions: Arc<SessionSigner>,
}

/// Routes served under `/api`.
pub fn api_router(state: AppState) -> Router {
    Router::new()
        .route("/chat", post(chat::send))
        .route("/chat/{user_id}", get(chat::list_conversations))
        .route("/messages/{conversation_id}", get(chat::list_messages))
        .route(
            "/conversation/{conversation_id}",
            get(chat::conversation).delete(chat::delete_conversation),
        )
        .route(
            "/trips/{id}",
            get(trips::find_or_list).post(trips::create).put(trips::update).delete(trips::delete),
        )
        .route("/events/user-events/{user_id}", get(events::list_for_user))
        .route("/events/{trip_id}", get(events::list_for_trip).post(events::create))
        .route("/events/{trip_id}/{event_id}", put(events::update).delete(events::delete))
        .route("/users/{user_id}", get(users::profile))
        .route("/auth/me", get(users::me))
        .route("/auth/logout", post(users::logout))
        .route("/receipts/analyze", post(receipts::analyze))
        .with_state(state)
}

/// The full HTTP surface: `/api`, `/health`, CORS for the configured
/// front-end origin and the request body cap.
pub fn router(
    state: AppState,
    db_pool: DbPool,
    server: &ServerConfig,
) -> Result<Router, header::InvalidHeaderValue> {
    let origin = HeaderValue::from_str(&server.allowed_origin)?;
    let cors = CorsLayer::new()
        .allow_origin(origin)
        .allow_credentials(true)
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION]);

    Ok(Router::new()
        .nest("/api", api_router(state))
        .merge(health::router(db_pool))
        .layer(DefaultBodyLimit::max(server.body_limit_bytes))
        .layer(cors)
        .layer(TraceLayer::new_for_http()))
}
