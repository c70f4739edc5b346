//! DTO definitions used by the admin REST API and documentation layer.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Parsed direction of a manual score mutation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScoreDirection {
    /// Shift the score by +1.
    Increment,
    /// Shift the score by -1.
    Decrement,
}

impl ScoreDirection {
    /// Signed delta this direction applies.
    pub fn delta(self) -> i64 {
        match self {
            ScoreDirection::Increment => 1,
            ScoreDirection::Decrement => -1,
        }
    }

    /// Wire spelling of the direction.
    pub fn label(self) -> &'static str {
        match self {
            ScoreDirection::Increment => "increment",
            ScoreDirection::Decrement => "decrement",
        }
    }
}

/// Payload for the manual score adjustment endpoint.
#[derive(Debug, Deserialize, ToSchema)]
pub struct ScoreMutationRequest {
    /// Either `increment` or `decrement`; anything else is rejected before
    /// the store is touched.
    #[serde(rename = "type")]
    pub kind: String,
}

impl ScoreMutationRequest {
    /// Parse the `type` field into a direction.
    pub fn direction(&self) -> Option<ScoreDirection> {
        match self.kind.as_str() {
            "increment" => Some(ScoreDirection::Increment),
            "decrement" => Some(ScoreDirection::Decrement),
            _ => None,
        }
    }
}

/// Response for a committed score mutation.
#[derive(Debug, Serialize, ToSchema)]
pub struct ScoreMutationResponse {
    /// Always `success` for a committed mutation.
    pub status: String,
    /// Human-readable summary of what happened.
    pub message: String,
    /// The committed score.
    pub score: i64,
}

impl ScoreMutationResponse {
    /// Build the response for a committed mutation.
    pub fn committed(direction: ScoreDirection, score: i64) -> Self {
        Self {
            status: "success".into(),
            message: format!("Score {}ed by 1. New score: {score}.", direction.label()),
            score,
        }
    }
}

/// Response for the score reset endpoint.
#[derive(Debug, Serialize, ToSchema)]
pub struct ResetResponse {
    /// Always `success` once the reset committed.
    pub status: String,
    /// Human-readable confirmation.
    pub message: String,
}

impl ResetResponse {
    /// Build the confirmation response.
    pub fn done() -> Self {
        Self {
            status: "success".into(),
            message: "Game score reset to 0.".into(),
        }
    }
}
