use crate::broadcast::FanoutSnapshot;
use crate::deliberation::{MessageId, RoundId};
use crate::peers::PeerSummary;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

// ============= API Request/Response Types =============

/// Body of `POST /api/message`.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SubmitMessageRequest {
    pub content: Option<String>,
    pub user_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub platform: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub conversation_id: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SubmitMessageResponse {
    pub message_id: MessageId,
    pub round_id: RoundId,
    pub status: String,
    /// Number of peers the query was actually delivered to
    pub recipients: usize,
    /// Quorum fixed for the round at creation
    pub required_responses: usize,
}

/// Body of `GET /`.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ServiceInfo {
    pub name: String,
    pub status: String,
    pub connected_peers: usize,
    pub total_messages: usize,
    pub uptime_secs: u64,
}

/// Body of `GET /api/status`.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct StatusResponse {
    pub connected_peers: Vec<PeerSummary>,
    pub total_connections: usize,
    pub total_messages: usize,
    pub active_rounds: usize,
    pub fanout: FanoutSnapshot,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ErrorBody {
    pub error: String,
}

// ============= Error Types =============

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("Round not found: {0}")]
    RoundNotFound(RoundId),

    #[error("Malformed event: {0}")]
    MalformedEvent(String),

    #[error("Unknown peer: {0}")]
    UnknownPeer(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

impl AppError {
    /// Stable machine-readable code carried by WebSocket `error` events.
    pub fn code(&self) -> &'static str {
        match self {
            AppError::RoundNotFound(_) => "round_not_found",
            AppError::MalformedEvent(_) => "malformed_event",
            AppError::UnknownPeer(_) => "unknown_peer",
            AppError::InvalidInput(_) => "invalid_input",
        }
    }

    pub fn status_code(&self) -> axum::http::StatusCode {
        use axum::http::StatusCode;

        match self {
            AppError::RoundNotFound(_) => StatusCode::NOT_FOUND,
            AppError::MalformedEvent(_) | AppError::UnknownPeer(_) | AppError::InvalidInput(_) => {
                StatusCode::BAD_REQUEST
            }
        }
    }
}

impl axum::response::IntoResponse for AppError {
    fn into_response(self) -> axum::response::Response {
        let status = self.status_code();
        let body = ErrorBody {
            error: self.to_string(),
        };

        (status, axum::Json(body)).into_response()
    }
}

pub type Result<T> = std::result::Result<T, AppError>;
