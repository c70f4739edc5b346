use crate::{dto::health::HealthResponse, state::SharedState};

/// Respond with the liveness payload and the connected session count.
pub async fn health_status(state: &SharedState) -> HealthResponse {
    HealthResponse::ok(state.players().len())
}
