//! Per-player projections of game state.
//!
//! A projection is the only shape of state that ever leaves the game
//! worker: melds, scores, and counters are public, but a hand is included
//! only for the viewer it belongs to. Everyone else sees card counts.

use serde::{Deserialize, Serialize};

use crate::domain::cards::Card;
use crate::domain::melds::Meld;
use crate::domain::state::{GameState, GameStatus, Seat, TurnPhase};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlayerPublic {
    pub user_id: i64,
    pub seat: Seat,
    pub hand_count: usize,
    /// Present only in the owner's projection.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hand: Option<Vec<Card>>,
    pub melds: Vec<Meld>,
    pub score: u32,
    pub has_gone_out: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GameProjection {
    pub game_id: i64,
    pub status: GameStatus,
    pub round_number: u8,
    pub turn_index: Seat,
    pub turn_phase: TurnPhase,
    pub is_final_turn_phase: bool,
    pub stock_count: usize,
    pub discard_top: Option<Card>,
    pub players: Vec<PlayerPublic>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub viewer_seat: Option<Seat>,
}

/// Project the state for one viewing user. A user with no seat (stale
/// subscription) gets the fully-elided view.
pub fn project_for(state: &GameState, viewer_user_id: i64) -> GameProjection {
    let viewer_seat = state.seat_of(viewer_user_id);
    let players = state
        .players
        .iter()
        .map(|p| PlayerPublic {
            user_id: p.user_id,
            seat: p.seat,
            hand_count: p.hand.len(),
            hand: (Some(p.seat) == viewer_seat).then(|| p.hand.clone()),
            melds: p.melds.clone(),
            score: p.score,
            has_gone_out: p.has_gone_out,
        })
        .collect();

    GameProjection {
        game_id: state.game_id,
        status: state.status,
        round_number: state.round_number,
        turn_index: state.turn_index,
        turn_phase: state.turn_phase,
        is_final_turn_phase: state.final_turn_phase,
        stock_count: state.stock.len(),
        discard_top: state.discard.last().copied(),
        players,
        viewer_seat,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_the_viewer_sees_a_hand() {
        let mut state = GameState::new(9, 1234, &[100, 200, 300]);
        state.start_game().unwrap();

        let view = project_for(&state, 200);
        assert_eq!(view.viewer_seat, Some(1));
        for player in &view.players {
            if player.seat == 1 {
                assert_eq!(player.hand.as_ref().map(Vec::len), Some(3));
            } else {
                assert!(player.hand.is_none());
            }
            assert_eq!(player.hand_count, 3);
        }
        assert!(view.discard_top.is_some());
    }

    #[test]
    fn non_member_viewer_sees_no_hand() {
        let mut state = GameState::new(9, 1234, &[100, 200]);
        state.start_game().unwrap();
        let view = project_for(&state, 999);
        assert_eq!(view.viewer_seat, None);
        assert!(view.players.iter().all(|p| p.hand.is_none()));
    }

    #[test]
    fn projection_serializes_hidden_hands_away() {
        let mut state = GameState::new(9, 1234, &[100, 200]);
        state.start_game().unwrap();
        let json = serde_json::to_value(project_for(&state, 100)).unwrap();
        let players = json["players"].as_array().unwrap();
        assert!(players[0].get("hand").is_some());
        assert!(players[1].get("hand").is_none());
    }
}
