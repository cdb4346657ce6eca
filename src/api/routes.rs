use crate::api::{handlers, ws, ApiDoc};
use crate::AppState;
use axum::{
    routing::{get, post},
    Json, Router,
};
use tower::ServiceBuilder;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use utoipa::OpenApi;

/// Routes nested under `/api`.
pub fn create_router() -> Router<AppState> {
    Router::new()
        .route("/status", get(handlers::status::get_status))
        .route("/message", post(handlers::messages::submit_message))
        .route("/rounds/{round_id}", get(handlers::rounds::get_round))
        .route(
            "/openapi.json",
            get(|| async { Json(ApiDoc::openapi()) }),
        )
}

/// The complete application: WebSocket, service routes and the REST API,
/// with request tracing and permissive CORS.
pub fn create_app(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/", get(handlers::status::root))
        .route("/health", get(handlers::status::health))
        .route("/ws", get(ws::ws_handler))
        .nest("/api", create_router())
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(cors),
        )
        .with_state(state)
}
