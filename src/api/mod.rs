//! HTTP and WebSocket handlers and routes
//!
//! This module provides the transport layer for Convergence, built on the
//! Axum web framework.
//!
//! # Module Structure
//!
//! - [`api::handlers`](crate::api::handlers) - REST request handlers
//! - [`api::ws`](crate::api::ws) - WebSocket sessions for peers
//! - [`api::routes`](crate::api::routes) - Route definitions and router configuration
//!
//! # Endpoints
//!
//! ## WebSocket (`/ws`)
//! - `GET /ws` - Upgrade to a peer session (see [`protocol`](crate::protocol))
//!
//! ## Service
//! - `GET /` - Service info
//! - `GET /health` - Liveness probe, plain `OK`
//!
//! ## REST (`/api`)
//! - `GET /api/status` - Connected peers, counters and fan-out stats
//! - `POST /api/message` - Start a round from outside the WebSocket
//! - `GET /api/rounds/{round_id}` - Inspect a round and its synthesis
//! - `GET /api/openapi.json` - OpenAPI document for the REST endpoints

use utoipa::OpenApi;

/// Request handlers for the REST endpoints.
pub mod handlers;
/// Router configuration and route definitions.
pub mod routes;
/// WebSocket peer sessions.
pub mod ws;

/// OpenAPI description of the REST surface.
#[derive(OpenApi)]
#[openapi(
    info(title = "Convergence", description = "Multi-agent fan-out and synthesis hub"),
    paths(
        handlers::status::root,
        handlers::status::health,
        handlers::status::get_status,
        handlers::messages::submit_message,
        handlers::rounds::get_round,
    ),
    components(schemas(
        crate::types::SubmitMessageRequest,
        crate::types::SubmitMessageResponse,
        crate::types::ServiceInfo,
        crate::types::StatusResponse,
        crate::types::ErrorBody,
        crate::deliberation::Round,
        crate::deliberation::Synthesis,
    )),
    tags(
        (name = "service", description = "Service health and status"),
        (name = "rounds", description = "Deliberation rounds")
    )
)]
pub struct ApiDoc;
