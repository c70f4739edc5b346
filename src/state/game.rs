//! Core game model: teams, roster entries and the win rule.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use uuid::Uuid;

/// Store path of the game root, rewritten as a whole on restart.
pub const GAME_PATH: &str = "game";
/// Store path of the shared score counter.
pub const SCORE_PATH: &str = "game/score";
/// Store path of the shared player roster.
pub const PLAYERS_PATH: &str = "game/players";

/// The two opposing teams, named after the side of the rope they pull toward.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Team {
    /// Pulls the score toward the negative threshold.
    Left,
    /// Pulls the score toward the positive threshold.
    Right,
}

impl Team {
    /// Signed direction a successful pull from this team moves the score.
    pub fn pull_sign(self) -> i64 {
        match self {
            Team::Left => -1,
            Team::Right => 1,
        }
    }

    /// Label used in win announcements and logs.
    pub fn label(self) -> &'static str {
        match self {
            Team::Left => "Team 1 (left)",
            Team::Right => "Team 2 (right)",
        }
    }
}

/// A roster entry as stored under `game/players/<id>`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayerEntry {
    /// Display name supplied at join time.
    pub nickname: String,
    /// Team this player pulls for.
    pub team: Team,
}

impl PlayerEntry {
    /// JSON form written under the player's roster path.
    pub fn to_stored(&self) -> Value {
        json!({ "nickname": self.nickname, "team": self.team })
    }
}

/// The shared roster keyed by player id.
pub type Roster = IndexMap<String, PlayerEntry>;

/// Decide the winner for a score, if any.
///
/// The thresholds are inclusive: a score of exactly `-threshold` or
/// `threshold` is already a win.
pub fn winner(score: i64, threshold: i64) -> Option<Team> {
    if score <= -threshold {
        Some(Team::Left)
    } else if score >= threshold {
        Some(Team::Right)
    } else {
        None
    }
}

/// Interpret a stored score value, defaulting absent or non-numeric
/// values to zero.
pub fn score_of(value: &Value) -> i64 {
    value.as_i64().unwrap_or(0)
}

/// Generate a fresh roster key for a nickname.
///
/// Uniqueness is probabilistic: the nickname is suffixed with eight hex
/// characters of a random UUID, which is plenty for one game's roster.
pub fn player_id(nickname: &str) -> String {
    let suffix = Uuid::new_v4().simple().to_string();
    format!("{nickname}-{}", &suffix[..8])
}

/// Store path of one player's roster entry.
pub fn player_path(player_id: &str) -> String {
    format!("{PLAYERS_PATH}/{player_id}")
}

/// The value written over the game root on restart: score back to zero and
/// every player ejected from their team.
pub fn fresh_game() -> Value {
    json!({ "score": 0, "players": {} })
}
