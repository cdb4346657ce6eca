use crate::{
    deliberation::Query,
    types::{AppError, Result, SubmitMessageRequest, SubmitMessageResponse},
    AppState,
};
use axum::{extract::State, Json};

/// Start a round on behalf of a client that is not a peer.
///
/// Same path as a `user_message` over the WebSocket: the query goes to
/// every registered peer and the call returns once it is fanned out.
#[utoipa::path(
    post,
    path = "/api/message",
    request_body = SubmitMessageRequest,
    responses(
        (status = 200, description = "Query broadcast to peers", body = SubmitMessageResponse),
        (status = 400, description = "Missing content or userId", body = crate::types::ErrorBody)
    ),
    tag = "rounds"
)]
pub async fn submit_message(
    State(state): State<AppState>,
    Json(payload): Json<SubmitMessageRequest>,
) -> Result<Json<SubmitMessageResponse>> {
    let content = payload
        .content
        .filter(|c| !c.trim().is_empty())
        .ok_or_else(|| AppError::InvalidInput("content is required".to_string()))?;
    let user_id = payload
        .user_id
        .filter(|u| !u.trim().is_empty())
        .ok_or_else(|| AppError::InvalidInput("userId is required".to_string()))?;

    let mut query = Query::new(content, user_id);
    if let Some(platform) = payload.platform {
        query = query.with_platform(platform);
    }
    if let Some(conversation_id) = payload.conversation_id {
        query = query.with_conversation(conversation_id);
    }

    let started = state.coordinator.start_round(query)?;

    Ok(Json(SubmitMessageResponse {
        message_id: started.message_id,
        round_id: started.round_id,
        status: "broadcast".to_string(),
        recipients: started.recipients,
        required_responses: started.required_responses,
    }))
}
