//! Business logic powering the admin REST routes: manual score mutations and
//! the unconditional reset.

use tracing::info;

use crate::{
    dto::admin::{ResetResponse, ScoreMutationRequest, ScoreMutationResponse},
    error::ServiceError,
    state::SharedState,
};

/// Apply a manual ±1 score mutation through the shared transaction contract.
///
/// The `type` field is validated before the store is touched; anything other
/// than `increment` or `decrement` is rejected outright.
pub async fn adjust_score(
    state: &SharedState,
    request: ScoreMutationRequest,
) -> Result<ScoreMutationResponse, ServiceError> {
    let direction = request.direction().ok_or_else(|| {
        ServiceError::InvalidInput(format!(
            "`type` must be `increment` or `decrement` (got `{}`)",
            request.kind
        ))
    })?;

    let score = state.score().apply_delta(direction.delta()).await?;
    info!(direction = direction.label(), score, "admin score mutation committed");
    Ok(ScoreMutationResponse::committed(direction, score))
}

/// Set the score straight back to zero.
///
/// Deliberately last-writer-wins; calling it twice in a row succeeds both
/// times and leaves the score at zero.
pub async fn reset_score(state: &SharedState) -> Result<ResetResponse, ServiceError> {
    state.score().reset().await?;
    info!("admin score reset committed");
    Ok(ResetResponse::done())
}
