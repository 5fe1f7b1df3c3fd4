//! Wire protocol: tagged `cmd.*` client messages and `evt.*` server pushes.
//!
//! Every client request carries a numeric `clientSeq` which is echoed back
//! on the direct response so clients can correlate request and reply.
//! Unknown `type` values are rejected with `unknown_type`; malformed bodies
//! with `bad_request`.

use serde::{Deserialize, Serialize};

use crate::domain::cards::Card;
use crate::domain::melds::MeldSpec;
use crate::domain::projection::GameProjection;
use crate::domain::state::Seat;
use crate::errors::domain::RuleKind;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DrawSource {
    Stock,
    Discard,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum ClientMsg {
    #[serde(rename = "cmd.hello", rename_all = "camelCase")]
    Hello { client_seq: u64, token: String },
    #[serde(rename = "cmd.joinGame", rename_all = "camelCase")]
    JoinGame { client_seq: u64, game_id: i64 },
    #[serde(rename = "cmd.leaveGame", rename_all = "camelCase")]
    LeaveGame { client_seq: u64, game_id: i64 },
    #[serde(rename = "cmd.startGame", rename_all = "camelCase")]
    StartGame { client_seq: u64, game_id: i64 },
    #[serde(rename = "cmd.draw", rename_all = "camelCase")]
    Draw {
        client_seq: u64,
        game_id: i64,
        source: DrawSource,
    },
    #[serde(rename = "cmd.layMelds", rename_all = "camelCase")]
    LayMelds {
        client_seq: u64,
        game_id: i64,
        melds: Vec<MeldSpec>,
    },
    #[serde(rename = "cmd.layOff", rename_all = "camelCase")]
    LayOff {
        client_seq: u64,
        game_id: i64,
        target_seat: Seat,
        meld_idx: usize,
        cards: Vec<Card>,
    },
    #[serde(rename = "cmd.discard", rename_all = "camelCase")]
    Discard {
        client_seq: u64,
        game_id: i64,
        card: Card,
    },
    #[serde(rename = "cmd.goOut", rename_all = "camelCase")]
    GoOut {
        client_seq: u64,
        game_id: i64,
        melds: Vec<MeldSpec>,
        discard: Card,
    },
}

impl ClientMsg {
    pub fn client_seq(&self) -> u64 {
        match self {
            ClientMsg::Hello { client_seq, .. }
            | ClientMsg::JoinGame { client_seq, .. }
            | ClientMsg::LeaveGame { client_seq, .. }
            | ClientMsg::StartGame { client_seq, .. }
            | ClientMsg::Draw { client_seq, .. }
            | ClientMsg::LayMelds { client_seq, .. }
            | ClientMsg::LayOff { client_seq, .. }
            | ClientMsg::Discard { client_seq, .. }
            | ClientMsg::GoOut { client_seq, .. } => *client_seq,
        }
    }
}

const KNOWN_TYPES: &[&str] = &[
    "cmd.hello",
    "cmd.joinGame",
    "cmd.leaveGame",
    "cmd.startGame",
    "cmd.draw",
    "cmd.layMelds",
    "cmd.layOff",
    "cmd.discard",
    "cmd.goOut",
];

pub struct ParseFailure {
    pub code: WireErrorCode,
    pub message: String,
}

/// Parse one inbound text frame, distinguishing unknown kinds from
/// malformed payloads.
pub fn parse_client_msg(text: &str) -> Result<ClientMsg, ParseFailure> {
    let value: serde_json::Value = serde_json::from_str(text).map_err(|e| ParseFailure {
        code: WireErrorCode::BadRequest,
        message: format!("malformed JSON: {e}"),
    })?;
    let kind = value
        .get("type")
        .and_then(|t| t.as_str())
        .map(|s| s.to_string())
        .ok_or_else(|| ParseFailure {
            code: WireErrorCode::BadRequest,
            message: "missing type field".to_string(),
        })?;
    if !KNOWN_TYPES.contains(&kind.as_str()) {
        return Err(ParseFailure {
            code: WireErrorCode::UnknownType,
            message: format!("unknown message type: {kind}"),
        });
    }
    serde_json::from_value(value).map_err(|e| ParseFailure {
        code: WireErrorCode::BadRequest,
        message: format!("invalid {kind} payload: {e}"),
    })
}

/// A persisted notification as pushed over the socket and returned by the
/// notifications REST surface.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NotificationPush {
    pub id: i64,
    pub kind: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub from_user_id: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub game_id: Option<i64>,
    pub created_at: String,
    pub status: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum ServerMsg {
    #[serde(rename = "evt.hello", rename_all = "camelCase")]
    Hello { client_seq: u64, user_id: i64 },
    #[serde(rename = "evt.state", rename_all = "camelCase")]
    State {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        client_seq: Option<u64>,
        game: GameProjection,
    },
    #[serde(rename = "evt.error", rename_all = "camelCase")]
    Error {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        client_seq: Option<u64>,
        code: WireErrorCode,
        message: String,
    },
    #[serde(rename = "evt.notification", rename_all = "camelCase")]
    Notification { notification: NotificationPush },
    #[serde(rename = "evt.gameDeleted", rename_all = "camelCase")]
    GameDeleted { game_id: i64 },
}

/// Socket-level error codes. Rule violations are returned only to the
/// issuing socket and never broadcast.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WireErrorCode {
    Unauthenticated,
    UnknownType,
    BadRequest,
    NotYourTurn,
    WrongPhase,
    InvalidMeld,
    CardNotInHand,
    CannotExtendMeld,
    CannotGoOut,
    FinalTurnPhase,
    GameNotActive,
    NotInGame,
    ServerRetry,
}

impl From<RuleKind> for WireErrorCode {
    fn from(kind: RuleKind) -> Self {
        match kind {
            RuleKind::NotYourTurn => WireErrorCode::NotYourTurn,
            RuleKind::WrongPhase => WireErrorCode::WrongPhase,
            RuleKind::InvalidMeld => WireErrorCode::InvalidMeld,
            RuleKind::CardNotInHand => WireErrorCode::CardNotInHand,
            RuleKind::CannotExtendMeld => WireErrorCode::CannotExtendMeld,
            RuleKind::CannotGoOut => WireErrorCode::CannotGoOut,
            RuleKind::FinalTurnPhase => WireErrorCode::FinalTurnPhase,
            RuleKind::GameNotActive => WireErrorCode::GameNotActive,
            RuleKind::NotInGame => WireErrorCode::NotInGame,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_draw_command() {
        let msg = parse_client_msg(
            r#"{"type":"cmd.draw","clientSeq":4,"gameId":17,"source":"stock"}"#,
        )
        .unwrap_or_else(|e| panic!("{}", e.message));
        assert_eq!(
            msg,
            ClientMsg::Draw {
                client_seq: 4,
                game_id: 17,
                source: DrawSource::Stock
            }
        );
        assert_eq!(msg.client_seq(), 4);
    }

    #[test]
    fn parses_go_out_with_cards() {
        let msg = parse_client_msg(
            r#"{"type":"cmd.goOut","clientSeq":9,"gameId":3,
                "melds":[{"kind":"run","cards":["H4","H5","H6"]}],
                "discard":"C8"}"#,
        )
        .unwrap_or_else(|e| panic!("{}", e.message));
        match msg {
            ClientMsg::GoOut { melds, discard, .. } => {
                assert_eq!(melds.len(), 1);
                assert_eq!(melds[0].cards.len(), 3);
                assert_eq!(discard.to_string(), "C8");
            }
            other => panic!("unexpected message {other:?}"),
        }
    }

    #[test]
    fn unknown_type_is_distinguished_from_bad_payload() {
        let unknown = parse_client_msg(r#"{"type":"cmd.teleport","clientSeq":1}"#).unwrap_err();
        assert_eq!(unknown.code, WireErrorCode::UnknownType);

        let bad = parse_client_msg(r#"{"type":"cmd.draw","clientSeq":1}"#).unwrap_err();
        assert_eq!(bad.code, WireErrorCode::BadRequest);

        let garbage = parse_client_msg("not json").unwrap_err();
        assert_eq!(garbage.code, WireErrorCode::BadRequest);
    }

    #[test]
    fn server_messages_use_evt_types() {
        let json = serde_json::to_value(ServerMsg::GameDeleted { game_id: 5 }).unwrap();
        assert_eq!(json["type"], "evt.gameDeleted");
        assert_eq!(json["gameId"], 5);

        let json = serde_json::to_value(ServerMsg::Error {
            client_seq: Some(2),
            code: WireErrorCode::FinalTurnPhase,
            message: "lay-off is disabled".into(),
        })
        .unwrap();
        assert_eq!(json["type"], "evt.error");
        assert_eq!(json["code"], "final_turn_phase");
        assert_eq!(json["clientSeq"], 2);
    }

    #[test]
    fn rule_kinds_map_to_wire_codes() {
        assert_eq!(
            WireErrorCode::from(RuleKind::NotYourTurn),
            WireErrorCode::NotYourTurn
        );
        assert_eq!(
            serde_json::to_value(WireErrorCode::CardNotInHand).unwrap(),
            "card_not_in_hand"
        );
    }
}
