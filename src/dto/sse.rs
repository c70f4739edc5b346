use serde::Serialize;
use utoipa::ToSchema;

use crate::dto::common::{RosterSnapshot, ScoreSnapshot, TeamSide};

#[derive(Clone, Debug)]
/// Dispatched payload carried across the SSE channel.
pub struct ServerEvent {
    /// SSE event name, `None` for unnamed messages.
    pub event: Option<String>,
    /// Pre-serialised JSON data field.
    pub data: String,
}

impl ServerEvent {
    /// Convenience wrapper that serialises `payload` into the SSE data field.
    pub fn json<E, T>(event: E, payload: &T) -> serde_json::Result<Self>
    where
        E: Into<Option<String>>,
        T: Serialize,
    {
        Ok(Self {
            event: event.into(),
            data: serde_json::to_string(payload)?,
        })
    }
}

#[derive(Debug, Serialize, ToSchema)]
/// Initial metadata sent to an SSE client when it connects.
pub struct Handshake {
    /// Identifier of the SSE stream.
    pub stream: String,
    /// Human-readable message confirming the subscription.
    pub message: String,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(transparent)]
/// Broadcast whenever the shared score changes.
pub struct ScoreChangedEvent(pub ScoreSnapshot);

#[derive(Debug, Serialize, ToSchema)]
#[serde(transparent)]
/// Broadcast whenever the roster changes.
pub struct RosterChangedEvent(pub RosterSnapshot);

#[derive(Debug, Serialize, ToSchema)]
/// Broadcast once when a side crosses its winning threshold.
pub struct GameWonEvent {
    /// The winning side.
    pub team: TeamSide,
}
