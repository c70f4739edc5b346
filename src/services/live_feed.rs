//! Process-wide relay pushing score and roster changes onto the public SSE
//! stream.

use tokio::task::JoinHandle;
use tracing::info;

use crate::{
    dto::common::{RosterSnapshot, ScoreSnapshot, TeamSide},
    services::sse_events,
    state::SharedState,
};

/// Spawn the live feed task for the lifetime of the process.
pub fn spawn(state: SharedState) -> JoinHandle<()> {
    tokio::spawn(run(state))
}

/// Relay every mirror change to the SSE hub, announcing a win exactly once
/// when the score crosses a threshold.
async fn run(state: SharedState) {
    let threshold = state.config().win_threshold();
    let mut score = state.score().watch();
    let mut roster = state.roster().watch();
    let mut last_winner: Option<TeamSide> =
        ScoreSnapshot::evaluate(*score.borrow(), threshold).winner;

    loop {
        tokio::select! {
            changed = score.changed() => {
                if changed.is_err() {
                    break;
                }
                let snapshot = ScoreSnapshot::evaluate(*score.borrow_and_update(), threshold);
                sse_events::broadcast_score_changed(&state, snapshot);
                if let Some(team) = snapshot.winner
                    && last_winner != Some(team)
                {
                    info!(team = ?team, score = snapshot.score, "game won");
                    sse_events::broadcast_game_won(&state, team);
                }
                last_winner = snapshot.winner;
            }
            changed = roster.changed() => {
                if changed.is_err() {
                    break;
                }
                let snapshot = RosterSnapshot::from(&*roster.borrow_and_update());
                sse_events::broadcast_roster_changed(&state, snapshot);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use serde_json::{Value, json};
    use tokio::sync::broadcast::Receiver;

    use super::*;
    use crate::{
        config::AppConfig,
        dto::sse::ServerEvent,
        state::{AppState, game::SCORE_PATH},
        store::{LiveStore, memory::MemoryStore},
    };

    async fn next_event(receiver: &mut Receiver<ServerEvent>, name: &str) -> Value {
        loop {
            let event = receiver.recv().await.unwrap();
            if event.event.as_deref() == Some(name) {
                return serde_json::from_str(&event.data).unwrap();
            }
        }
    }

    fn feed() -> (Arc<dyn LiveStore>, SharedState, Receiver<ServerEvent>) {
        let store: Arc<dyn LiveStore> = Arc::new(MemoryStore::new());
        let state = AppState::with_store(AppConfig::default(), store.clone());
        let receiver = state.public_sse().subscribe();
        spawn(state.clone());
        (store, state, receiver)
    }

    #[tokio::test]
    async fn score_changes_reach_the_public_stream() {
        let (store, _state, mut receiver) = feed();
        store.set(SCORE_PATH, json!(4)).await.unwrap();
        let payload = next_event(&mut receiver, "score.changed").await;
        assert_eq!(payload, json!({"score": 4}));
    }

    #[tokio::test]
    async fn crossing_the_threshold_announces_the_win_once() {
        let (store, _state, mut receiver) = feed();
        store.set(SCORE_PATH, json!(100)).await.unwrap();

        let payload = next_event(&mut receiver, "score.changed").await;
        assert_eq!(payload, json!({"score": 100, "winner": "right"}));
        let payload = next_event(&mut receiver, "game.won").await;
        assert_eq!(payload, json!({"team": "right"}));

        // Pushing further past the threshold only repeats the score event; a
        // second win announcement would land between the two score events.
        store.set(SCORE_PATH, json!(101)).await.unwrap();
        let event = receiver.recv().await.unwrap();
        assert_eq!(event.event.as_deref(), Some("score.changed"));
        store.set(SCORE_PATH, json!(99)).await.unwrap();
        let event = receiver.recv().await.unwrap();
        assert_eq!(event.event.as_deref(), Some("score.changed"));
    }

    #[tokio::test]
    async fn roster_changes_reach_the_public_stream() {
        let (store, _state, mut receiver) = feed();
        store
            .set(
                "game/players/ada-1f2e3d4c",
                json!({"nickname": "ada", "team": "left"}),
            )
            .await
            .unwrap();
        let payload = next_event(&mut receiver, "roster.changed").await;
        assert_eq!(
            payload,
            json!({"players": [
                {"id": "ada-1f2e3d4c", "nickname": "ada", "team": "left"}
            ]})
        );
    }
}
