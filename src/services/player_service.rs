//! Per-player WebSocket session: the game session controller.
//!
//! Each connection runs one event loop owning its private input machine and
//! watching the shared mirrors. Every scoring action goes through the store
//! transaction; the session never adjusts its own view of the score.

use std::time::{Duration, Instant};

use axum::extract::ws::{Message, WebSocket};
use futures::{SinkExt, Stream, StreamExt};
use tokio::{sync::mpsc, task::JoinHandle};
use tracing::{info, warn};
use uuid::Uuid;

use crate::{
    dto::{
        common::{RosterSnapshot, ScoreSnapshot},
        validation::validate_nickname,
        ws::{InputStateDto, PlayerInboundMessage, PlayerOutboundMessage},
    },
    state::{
        PlayerConnection, SharedState,
        game::{Roster, Team},
        input::{InputMachine, KeyOutcome, PromptKey},
    },
    store::ConnectionId,
};

const IDENT_TIMEOUT: Duration = Duration::from_secs(10);

/// Handle the full lifecycle for an individual player WebSocket connection.
pub async fn handle_socket(state: SharedState, socket: WebSocket) {
    let (mut sender, mut receiver) = socket.split();
    let (outbound_tx, mut outbound_rx) = mpsc::unbounded_channel::<Message>();

    // Dedicated writer task keeps outbound messages flowing even while we await inbound frames.
    let writer_task = tokio::spawn(async move {
        while let Some(message) = outbound_rx.recv().await {
            if sender.send(message).await.is_err() {
                break;
            }
        }
    });

    let initial_message = match tokio::time::timeout(IDENT_TIMEOUT, receiver.next()).await {
        Ok(Some(Ok(Message::Text(text)))) => text,
        Ok(Some(Ok(Message::Close(_)))) => {
            finalize(writer_task, outbound_tx).await;
            return;
        }
        Ok(Some(Ok(_))) => {
            let _ = outbound_tx.send(Message::Close(None));
            finalize(writer_task, outbound_tx).await;
            return;
        }
        Ok(Some(Err(err))) => {
            warn!(error = %err, "websocket receive error");
            finalize(writer_task, outbound_tx).await;
            return;
        }
        Ok(None) | Err(_) => {
            warn!("websocket identification timed out");
            finalize(writer_task, outbound_tx).await;
            return;
        }
    };

    let nickname = match parse_join(&initial_message) {
        Ok(nickname) => nickname,
        Err(err) => {
            warn!(error = %err, "rejecting websocket join");
            let _ = outbound_tx.send(Message::Close(None));
            finalize(writer_task, outbound_tx).await;
            return;
        }
    };

    let connection = Uuid::new_v4();
    state.players().insert(
        connection,
        PlayerConnection {
            id: connection,
            tx: outbound_tx.clone(),
        },
    );
    info!(%connection, nickname = %nickname, "player connected");

    let mut session = PlayerSession::new(state.clone(), connection, nickname, outbound_tx.clone());
    session.send_welcome();
    run_session(&mut session, &mut receiver).await;

    // The armed roster removal fires here unless the player left gracefully.
    if let Err(err) = state.store().connection_lost(connection).await {
        warn!(%connection, error = %err, "disconnect cleanup failed");
    }
    state.players().remove(&connection);
    info!(%connection, "player disconnected");

    finalize(writer_task, outbound_tx).await;
}

/// Validate the mandatory first message of a session.
fn parse_join(raw: &str) -> Result<String, String> {
    let inbound: PlayerInboundMessage =
        serde_json::from_str(raw).map_err(|err| format!("malformed join message: {err}"))?;
    let PlayerInboundMessage::Join { nickname } = inbound else {
        return Err("first message must be `join`".into());
    };
    let nickname = nickname.trim().to_owned();
    validate_nickname(&nickname).map_err(|err| err.to_string())?;
    Ok(nickname)
}

/// Event loop of one joined session.
async fn run_session(
    session: &mut PlayerSession,
    receiver: &mut (impl Stream<Item = Result<Message, axum::Error>> + Unpin),
) {
    let mut score_watch = session.state.score().watch();
    let mut roster_watch = session.state.roster().watch();

    loop {
        let deadline = session.machine.next_deadline();
        tokio::select! {
            message = receiver.next() => {
                match message {
                    Some(Ok(Message::Text(text))) => session.handle_text(&text).await,
                    Some(Ok(Message::Ping(payload))) => {
                        let _ = session.tx.send(Message::Pong(payload));
                    }
                    Some(Ok(Message::Close(frame))) => {
                        let _ = session.tx.send(Message::Close(frame));
                        break;
                    }
                    Some(Ok(_)) => {}
                    Some(Err(err)) => {
                        warn!(connection = %session.connection, error = %err, "websocket error");
                        break;
                    }
                    None => break,
                }
            }
            changed = score_watch.changed() => {
                if changed.is_err() {
                    break;
                }
                let snapshot = session.score_snapshot(*score_watch.borrow_and_update());
                session.send(&PlayerOutboundMessage::Score { score: snapshot });
            }
            changed = roster_watch.changed() => {
                if changed.is_err() {
                    break;
                }
                let roster = roster_watch.borrow_and_update().clone();
                session.on_roster_change(&roster);
            }
            _ = sleep_until(deadline) => {
                let now = Instant::now();
                if session.machine.poll(now) {
                    session.push_input(now);
                }
            }
        }
    }
}

/// Sleep until the machine's next deadline, or forever when none is pending.
async fn sleep_until(deadline: Option<Instant>) {
    match deadline {
        Some(instant) => tokio::time::sleep_until(instant.into()).await,
        None => std::future::pending().await,
    }
}

/// State owned by one connected player.
struct PlayerSession {
    state: SharedState,
    connection: ConnectionId,
    nickname: String,
    machine: InputMachine,
    player_id: Option<String>,
    tx: mpsc::UnboundedSender<Message>,
}

impl PlayerSession {
    fn new(
        state: SharedState,
        connection: ConnectionId,
        nickname: String,
        tx: mpsc::UnboundedSender<Message>,
    ) -> Self {
        let machine = InputMachine::new(state.config().input_settings());
        Self {
            state,
            connection,
            nickname,
            machine,
            player_id: None,
            tx,
        }
    }

    /// Serialize and queue one outbound message, dropping it if the writer
    /// side already closed (the loop ends on its own shortly after).
    fn send(&self, message: &PlayerOutboundMessage) {
        match serde_json::to_string(message) {
            Ok(payload) => {
                let _ = self.tx.send(Message::Text(payload.into()));
            }
            Err(err) => {
                warn!(error = %err, "failed to serialize outbound message `{message:?}`");
            }
        }
    }

    fn send_error(&self, message: impl Into<String>) {
        self.send(&PlayerOutboundMessage::Error {
            message: message.into(),
        });
    }

    fn send_welcome(&self) {
        self.send(&PlayerOutboundMessage::Welcome {
            score: self.score_snapshot(self.state.score().current()),
            players: RosterSnapshot::from(&self.state.roster().current()).players,
        });
    }

    fn score_snapshot(&self, score: i64) -> ScoreSnapshot {
        ScoreSnapshot::evaluate(score, self.state.config().win_threshold())
    }

    /// Push the machine's visible state to the owning client.
    fn push_input(&self, now: Instant) {
        self.send(&PlayerOutboundMessage::Input {
            state: InputStateDto::from(&self.machine.snapshot(now)),
        });
    }

    async fn handle_text(&mut self, raw: &str) {
        let inbound: PlayerInboundMessage = match serde_json::from_str(raw) {
            Ok(message) => message,
            Err(err) => {
                warn!(connection = %self.connection, error = %err, "malformed player message");
                self.send_error("malformed message");
                return;
            }
        };

        match inbound {
            PlayerInboundMessage::Join { .. } => {
                self.send_error("already joined");
            }
            PlayerInboundMessage::Select { team } => self.handle_select(team.into()).await,
            PlayerInboundMessage::Key { key } => self.handle_key(&key).await,
            PlayerInboundMessage::Leave => self.handle_leave().await,
            PlayerInboundMessage::Restart => self.handle_restart().await,
            PlayerInboundMessage::Unknown => {
                self.send_error("unsupported message type");
            }
        }
    }

    async fn handle_select(&mut self, team: Team) {
        if self.machine.team().is_some() {
            self.send_error("already on a team");
            return;
        }
        match self
            .state
            .roster()
            .select(self.connection, &self.nickname, team)
            .await
        {
            Ok(player_id) => {
                info!(connection = %self.connection, %player_id, ?team, "player joined a team");
                self.player_id = Some(player_id);
                self.machine.join(team);
                self.push_input(Instant::now());
            }
            Err(err) => {
                warn!(connection = %self.connection, error = %err, "team selection failed");
                self.send_error("internal error");
            }
        }
    }

    /// Feed a raw key press through the machine, submitting any resulting
    /// delta to the shared score.
    async fn handle_key(&mut self, raw: &str) {
        // Once a winner exists, gameplay input is suppressed.
        if self.state.current_winner().is_some() {
            return;
        }
        // Keys outside the prompt alphabet are ignored in every state.
        let Some(key) = PromptKey::from_input(raw) else {
            return;
        };

        let now = Instant::now();
        let outcome = self.machine.handle_key(key, now);
        let delta = match outcome {
            KeyOutcome::Ignored => return,
            KeyOutcome::Pull { delta } => delta,
            KeyOutcome::Penalty { delta, .. } => delta,
        };

        // A failed transaction is dropped: the machine already advanced, but
        // the visible score only ever reflects store-confirmed values.
        if let Err(err) = self.state.score().apply_delta(delta).await {
            warn!(connection = %self.connection, error = %err, delta, "score delta dropped");
        }
        self.push_input(now);
    }

    async fn handle_leave(&mut self) {
        let Some(player_id) = self.player_id.take() else {
            self.send_error("not on a team");
            return;
        };
        if let Err(err) = self.state.roster().leave(self.connection, &player_id).await {
            warn!(connection = %self.connection, error = %err, "leave failed");
        }
        self.machine.detach();
        self.push_input(Instant::now());
    }

    async fn handle_restart(&mut self) {
        if self.state.current_winner().is_none() {
            self.send_error("restart requires a finished game");
            return;
        }
        info!(connection = %self.connection, "restarting the game");
        if let Err(err) = self.state.restart_game().await {
            warn!(connection = %self.connection, error = %err, "restart failed");
            self.send_error("internal error");
        }
    }

    /// React to a roster mirror change: relay it, and detach if this
    /// session's own entry vanished (disconnect cleanup or a full restart).
    fn on_roster_change(&mut self, roster: &Roster) {
        self.send(&PlayerOutboundMessage::Roster {
            players: RosterSnapshot::from(roster).players,
        });
        if let Some(player_id) = &self.player_id
            && !roster.contains_key(player_id)
        {
            info!(connection = %self.connection, %player_id, "own roster entry vanished, detaching");
            self.player_id = None;
            self.machine.detach();
            self.send(&PlayerOutboundMessage::Ejected);
            self.push_input(Instant::now());
        }
    }
}

/// Ensure the writer task winds down before we return from the socket handler.
async fn finalize(writer_task: JoinHandle<()>, outbound_tx: mpsc::UnboundedSender<Message>) {
    drop(outbound_tx);
    let _ = writer_task.await;
}
