use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::state::game::{Roster, Team, winner};

/// Wire identifier of a team side.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum TeamSide {
    /// Pulls the score toward the negative threshold.
    Left,
    /// Pulls the score toward the positive threshold.
    Right,
}

impl From<Team> for TeamSide {
    fn from(team: Team) -> Self {
        match team {
            Team::Left => TeamSide::Left,
            Team::Right => TeamSide::Right,
        }
    }
}

impl From<TeamSide> for Team {
    fn from(side: TeamSide) -> Self {
        match side {
            TeamSide::Left => Team::Left,
            TeamSide::Right => Team::Right,
        }
    }
}

/// Current rope position and win state, shared by every push surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
pub struct ScoreSnapshot {
    /// Signed score; negative pulls left, positive pulls right.
    pub score: i64,
    /// Winning side, present once a threshold was crossed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub winner: Option<TeamSide>,
}

impl ScoreSnapshot {
    /// Evaluate the win rule for `score` against the configured threshold.
    pub fn evaluate(score: i64, threshold: i64) -> Self {
        Self {
            score,
            winner: winner(score, threshold).map(TeamSide::from),
        }
    }
}

/// One roster entry as exposed on the wire.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
pub struct PlayerSnapshot {
    /// Roster key of the player.
    pub id: String,
    /// Display name supplied at join time.
    pub nickname: String,
    /// Side the player pulls for.
    pub team: TeamSide,
}

/// Roster projection shared by the socket and SSE surfaces.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
pub struct RosterSnapshot {
    /// Every joined player.
    pub players: Vec<PlayerSnapshot>,
}

impl From<&Roster> for RosterSnapshot {
    fn from(roster: &Roster) -> Self {
        Self {
            players: roster
                .iter()
                .map(|(id, entry)| PlayerSnapshot {
                    id: id.clone(),
                    nickname: entry.nickname.clone(),
                    team: entry.team.into(),
                })
                .collect(),
        }
    }
}
