pub mod game;
pub mod input;
mod sse;

use std::sync::Arc;

use axum::extract::ws::Message;
use dashmap::DashMap;
use tokio::sync::mpsc;

use crate::{
    config::AppConfig,
    state::game::{GAME_PATH, Team, fresh_game, winner},
    store::{ConnectionId, LiveStore, StoreResult, memory::MemoryStore},
    sync::{roster::RosterSync, score::ScoreSync},
};

pub use self::sse::SseHub;

/// Shared handle to the central application state.
pub type SharedState = Arc<AppState>;

#[derive(Clone)]
/// Handle used to push messages to a connected player session.
pub struct PlayerConnection {
    /// Connection id of the session.
    pub id: ConnectionId,
    /// Writer channel into the session's socket.
    pub tx: mpsc::UnboundedSender<Message>,
}

/// Central application state: the store authority, its mirrors, and every
/// connected surface.
pub struct AppState {
    config: AppConfig,
    store: Arc<dyn LiveStore>,
    score: ScoreSync,
    roster: RosterSync,
    sse: SseHub,
    players: DashMap<ConnectionId, PlayerConnection>,
}

impl AppState {
    /// Construct the state over a fresh in-memory store.
    pub fn new(config: AppConfig) -> SharedState {
        Self::with_store(config, Arc::new(MemoryStore::new()))
    }

    /// Construct the state over an existing store; tests inject prepared
    /// trees this way.
    pub fn with_store(config: AppConfig, store: Arc<dyn LiveStore>) -> SharedState {
        Arc::new(Self {
            score: ScoreSync::new(store.clone()),
            roster: RosterSync::new(store.clone()),
            sse: SseHub::new(16),
            players: DashMap::new(),
            config,
            store,
        })
    }

    /// Immutable runtime configuration.
    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    /// The shared store authority.
    pub fn store(&self) -> &Arc<dyn LiveStore> {
        &self.store
    }

    /// Mirror of the shared score.
    pub fn score(&self) -> &ScoreSync {
        &self.score
    }

    /// Mirror of the shared roster.
    pub fn roster(&self) -> &RosterSync {
        &self.roster
    }

    /// Broadcast hub used for the public SSE stream.
    pub fn public_sse(&self) -> &SseHub {
        &self.sse
    }

    /// Registry of active player sockets keyed by connection id.
    pub fn players(&self) -> &DashMap<ConnectionId, PlayerConnection> {
        &self.players
    }

    /// Evaluate the win rule against the configured threshold.
    pub fn current_winner(&self) -> Option<Team> {
        winner(self.score.current(), self.config.win_threshold())
    }

    /// Start a fresh game: score back to zero, every player ejected.
    ///
    /// Written as one combined root write so no observer can see a zeroed
    /// score with the old roster still attached.
    pub async fn restart_game(&self) -> StoreResult<()> {
        self.store.set(GAME_PATH, fresh_game()).await
    }
}
