use crate::{
    deliberation::{Round, RoundId},
    types::Result,
    AppState,
};
use axum::{
    extract::{Path, State},
    Json,
};

#[utoipa::path(
    get,
    path = "/api/rounds/{round_id}",
    params(
        ("round_id" = String, Path, description = "Round identifier")
    ),
    responses(
        (status = 200, description = "The round, with its synthesis once complete", body = Round),
        (status = 404, description = "Unknown or evicted round", body = crate::types::ErrorBody)
    ),
    tag = "rounds"
)]
pub async fn get_round(
    State(state): State<AppState>,
    Path(round_id): Path<RoundId>,
) -> Result<Json<Round>> {
    Ok(Json(state.coordinator.round(&round_id)?))
}
