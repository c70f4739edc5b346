use axum::{Json, Router, extract::State, routing::post};

use crate::{
    dto::admin::{ResetResponse, ScoreMutationRequest, ScoreMutationResponse},
    error::AppError,
    services::admin_service,
    state::SharedState,
};

/// Admin endpoints for manual score management.
///
/// Only `POST` is registered on these paths; any other method gets a 405
/// straight from the router.
pub fn router() -> Router<SharedState> {
    Router::<SharedState>::new()
        .route("/admin/score", post(adjust_score))
        .route("/admin/score/reset", post(reset_score))
}

/// Apply a manual ±1 score mutation.
#[utoipa::path(
    post,
    path = "/admin/score",
    tag = "admin",
    request_body = ScoreMutationRequest,
    responses(
        (status = 200, description = "Mutation committed", body = ScoreMutationResponse),
        (status = 400, description = "Invalid `type` field"),
    )
)]
pub async fn adjust_score(
    State(state): State<SharedState>,
    Json(request): Json<ScoreMutationRequest>,
) -> Result<Json<ScoreMutationResponse>, AppError> {
    Ok(Json(admin_service::adjust_score(&state, request).await?))
}

/// Unconditionally reset the score to zero.
#[utoipa::path(
    post,
    path = "/admin/score/reset",
    tag = "admin",
    responses(
        (status = 200, description = "Score reset to zero", body = ResetResponse),
        (status = 405, description = "Any method other than POST"),
    )
)]
pub async fn reset_score(
    State(state): State<SharedState>,
) -> Result<Json<ResetResponse>, AppError> {
    Ok(Json(admin_service::reset_score(&state).await?))
}
