use crate::{
    types::{ServiceInfo, StatusResponse},
    AppState,
};
use axum::{extract::State, Json};

#[utoipa::path(
    get,
    path = "/",
    responses(
        (status = 200, description = "Service info", body = ServiceInfo)
    ),
    tag = "service"
)]
pub async fn root(State(state): State<AppState>) -> Json<ServiceInfo> {
    let status = state.coordinator.status();

    Json(ServiceInfo {
        name: "Convergence".to_string(),
        status: "running".to_string(),
        connected_peers: status.total_connections,
        total_messages: status.total_messages,
        uptime_secs: state.started_at.elapsed().as_secs(),
    })
}

#[utoipa::path(
    get,
    path = "/health",
    responses(
        (status = 200, description = "Service is up", body = String)
    ),
    tag = "service"
)]
pub async fn health() -> &'static str {
    "OK"
}

#[utoipa::path(
    get,
    path = "/api/status",
    responses(
        (status = 200, description = "Current peers and round counters", body = StatusResponse)
    ),
    tag = "service"
)]
pub async fn get_status(State(state): State<AppState>) -> Json<StatusResponse> {
    let status = state.coordinator.status();

    Json(StatusResponse {
        connected_peers: status.connected_peers,
        total_connections: status.total_connections,
        total_messages: status.total_messages,
        active_rounds: status.active_rounds,
        fanout: status.fanout,
    })
}
