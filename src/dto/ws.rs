use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::{
    dto::common::{PlayerSnapshot, ScoreSnapshot, TeamSide},
    state::input::{InputSnapshot, LockClass},
};

#[derive(Debug, Deserialize, Serialize, ToSchema)]
/// Messages accepted from player WebSocket clients.
#[serde(tag = "type")]
pub enum PlayerInboundMessage {
    /// First message of a session, naming the player.
    #[serde(rename = "join")]
    Join {
        /// Display name for this session.
        nickname: String,
    },
    /// Pick a side and enter the shared roster.
    #[serde(rename = "select")]
    Select {
        /// Side to pull for.
        team: TeamSide,
    },
    /// A raw key press; anything outside the prompt alphabet is ignored.
    #[serde(rename = "key")]
    Key {
        /// The pressed key as reported by the client.
        key: String,
    },
    /// Leave the current team while staying connected.
    #[serde(rename = "leave")]
    Leave,
    /// Ask for a fresh game once a winner exists.
    #[serde(rename = "restart")]
    Restart,
    /// Anything carrying an unrecognised tag.
    #[serde(other)]
    Unknown,
}

#[derive(Debug, Serialize, ToSchema)]
/// Messages pushed to player WebSocket clients.
#[serde(tag = "type")]
pub enum PlayerOutboundMessage {
    /// Initial snapshot sent right after a successful join.
    #[serde(rename = "welcome")]
    Welcome {
        /// Score and win state at join time.
        #[serde(flatten)]
        score: ScoreSnapshot,
        /// Current roster.
        players: Vec<PlayerSnapshot>,
    },
    /// Input-machine state, pushed after every machine change.
    #[serde(rename = "input")]
    Input {
        /// The machine's visible state.
        #[serde(flatten)]
        state: InputStateDto,
    },
    /// Score mirror update.
    #[serde(rename = "score")]
    Score {
        /// New score and win state.
        #[serde(flatten)]
        score: ScoreSnapshot,
    },
    /// Roster mirror update.
    #[serde(rename = "roster")]
    Roster {
        /// Current roster.
        players: Vec<PlayerSnapshot>,
    },
    /// The session's own roster entry vanished; the player is off-team again.
    #[serde(rename = "ejected")]
    Ejected,
    /// Protocol violation report; the connection stays open.
    #[serde(rename = "error")]
    Error {
        /// What went wrong.
        message: String,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
/// Lockout class on the wire.
#[serde(rename_all = "lowercase")]
pub enum LockClassDto {
    /// Regular wrong-key lockout.
    Short,
    /// Extended lockout after the last heart.
    Long,
}

impl From<LockClass> for LockClassDto {
    fn from(class: LockClass) -> Self {
        match class {
            LockClass::Short => LockClassDto::Short,
            LockClass::Long => LockClassDto::Long,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
/// Lockout details while one is active.
pub struct LockStateDto {
    /// Which lockout duration applies.
    pub class: LockClassDto,
    /// Milliseconds until input resumes.
    pub remaining_ms: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
/// Input-machine view pushed to the owning player.
pub struct InputStateDto {
    /// Side the player is on, absent while off-team.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub team: Option<TeamSide>,
    /// Upcoming prompts; the first entry is the required key.
    pub queue: Vec<String>,
    /// Recently consumed-correct symbols, oldest first.
    pub history: Vec<String>,
    /// Hearts remaining; zero while the long lockout runs.
    pub hearts: u8,
    /// Present while locked.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub locked: Option<LockStateDto>,
    /// Success pulse currently visible.
    pub bump: bool,
    /// Wrong-key flash currently visible.
    pub wrong_key: bool,
}

impl From<&InputSnapshot> for InputStateDto {
    fn from(snapshot: &InputSnapshot) -> Self {
        Self {
            team: snapshot.team.map(TeamSide::from),
            queue: snapshot
                .queue
                .iter()
                .map(|key| key.as_str().to_owned())
                .collect(),
            history: snapshot
                .history
                .iter()
                .map(|key| key.as_str().to_owned())
                .collect(),
            hearts: snapshot.hearts,
            locked: snapshot.locked.map(|lock| LockStateDto {
                class: lock.class.into(),
                remaining_ms: lock.remaining.as_millis() as u64,
            }),
            bump: snapshot.bump,
            wrong_key: snapshot.wrong_key,
        }
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn inbound_messages_parse_by_tag() {
        let join: PlayerInboundMessage =
            serde_json::from_value(json!({"type": "join", "nickname": "ada"})).unwrap();
        assert!(matches!(join, PlayerInboundMessage::Join { nickname } if nickname == "ada"));

        let select: PlayerInboundMessage =
            serde_json::from_value(json!({"type": "select", "team": "left"})).unwrap();
        assert!(matches!(
            select,
            PlayerInboundMessage::Select {
                team: TeamSide::Left
            }
        ));

        let key: PlayerInboundMessage =
            serde_json::from_value(json!({"type": "key", "key": "f"})).unwrap();
        assert!(matches!(key, PlayerInboundMessage::Key { key } if key == "f"));

        assert!(matches!(
            serde_json::from_value::<PlayerInboundMessage>(json!({"type": "leave"})).unwrap(),
            PlayerInboundMessage::Leave
        ));
        assert!(matches!(
            serde_json::from_value::<PlayerInboundMessage>(json!({"type": "restart"})).unwrap(),
            PlayerInboundMessage::Restart
        ));
    }

    #[test]
    fn unknown_tags_fall_through_to_unknown() {
        let message: PlayerInboundMessage =
            serde_json::from_value(json!({"type": "dance", "tempo": 120})).unwrap();
        assert!(matches!(message, PlayerInboundMessage::Unknown));
    }

    #[test]
    fn untagged_payloads_are_rejected() {
        assert!(serde_json::from_value::<PlayerInboundMessage>(json!({"nickname": "ada"})).is_err());
    }

    #[test]
    fn welcome_flattens_the_score_snapshot() {
        let message = PlayerOutboundMessage::Welcome {
            score: ScoreSnapshot {
                score: 3,
                winner: None,
            },
            players: vec![PlayerSnapshot {
                id: "ada-1f2e3d4c".into(),
                nickname: "ada".into(),
                team: TeamSide::Left,
            }],
        };
        assert_eq!(
            serde_json::to_value(&message).unwrap(),
            json!({
                "type": "welcome",
                "score": 3,
                "players": [
                    {"id": "ada-1f2e3d4c", "nickname": "ada", "team": "left"}
                ]
            })
        );
    }

    #[test]
    fn score_message_carries_the_winner_once_present() {
        let message = PlayerOutboundMessage::Score {
            score: ScoreSnapshot {
                score: 100,
                winner: Some(TeamSide::Right),
            },
        };
        assert_eq!(
            serde_json::to_value(&message).unwrap(),
            json!({"type": "score", "score": 100, "winner": "right"})
        );
    }

    #[test]
    fn input_message_reports_the_lockout() {
        let state = InputStateDto {
            team: Some(TeamSide::Right),
            queue: vec!["F".into(), "D".into()],
            history: vec!["K".into()],
            hearts: 2,
            locked: Some(LockStateDto {
                class: LockClassDto::Short,
                remaining_ms: 640,
            }),
            bump: false,
            wrong_key: true,
        };
        assert_eq!(
            serde_json::to_value(PlayerOutboundMessage::Input { state }).unwrap(),
            json!({
                "type": "input",
                "team": "right",
                "queue": ["F", "D"],
                "history": ["K"],
                "hearts": 2,
                "locked": {"class": "short", "remaining_ms": 640},
                "bump": false,
                "wrong_key": true
            })
        );
    }
}
