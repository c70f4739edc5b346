use serde::Serialize;
use tracing::warn;

use crate::{
    dto::{
        common::{RosterSnapshot, ScoreSnapshot, TeamSide},
        sse::{GameWonEvent, RosterChangedEvent, ScoreChangedEvent, ServerEvent},
    },
    state::SharedState,
};

const EVENT_SCORE_CHANGED: &str = "score.changed";
const EVENT_ROSTER_CHANGED: &str = "roster.changed";
const EVENT_GAME_WON: &str = "game.won";

/// Broadcast the new score and win state to public subscribers.
pub fn broadcast_score_changed(state: &SharedState, snapshot: ScoreSnapshot) {
    send_public_event(state, EVENT_SCORE_CHANGED, &ScoreChangedEvent(snapshot));
}

/// Broadcast the new roster to public subscribers.
pub fn broadcast_roster_changed(state: &SharedState, snapshot: RosterSnapshot) {
    send_public_event(state, EVENT_ROSTER_CHANGED, &RosterChangedEvent(snapshot));
}

/// Broadcast that a side crossed its winning threshold.
pub fn broadcast_game_won(state: &SharedState, team: TeamSide) {
    send_public_event(state, EVENT_GAME_WON, &GameWonEvent { team });
}

fn send_public_event(state: &SharedState, event: &str, payload: &impl Serialize) {
    match ServerEvent::json(Some(event.to_string()), payload) {
        Ok(event) => state.public_sse().broadcast(event),
        Err(err) => warn!(event, error = %err, "failed to serialize public SSE payload"),
    }
}
