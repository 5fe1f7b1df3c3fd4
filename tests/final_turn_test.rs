//! Final-turn fairness: after a player goes out, every other player gets
//! exactly one more turn with lay-off disabled, then the round closes.

mod common;

use common::{card, cards, rig_current_hand, started_game};
use fivecrowns_backend::domain::melds::{MeldKind, MeldSpec};
use fivecrowns_backend::domain::state::{GameStatus, TurnPhase};
use fivecrowns_backend::errors::domain::RuleKind;

fn go_out_as_current_player(
    state: &mut fivecrowns_backend::domain::state::GameState,
) {
    rig_current_hand(state, &["H4", "H5", "H6", "C8"]);
    let seat = state.turn_index;
    state
        .go_out(
            seat,
            &[MeldSpec {
                kind: MeldKind::Run,
                cards: cards(&["H4", "H5", "H6"]),
            }],
            card("C8"),
        )
        .unwrap();
}

#[test]
fn each_other_player_gets_exactly_one_final_turn() {
    let mut state = started_game(7, 3);
    go_out_as_current_player(&mut state);
    assert_eq!(state.player_who_went_out, Some(0));
    assert!(state.final_turn_phase);
    assert_eq!(state.round_number, 1);

    for seat in [1usize, 2] {
        assert_eq!(state.turn_index, seat);
        assert_eq!(state.turn_phase, TurnPhase::MustDraw);
        let drawn = state.draw_from_stock(seat).unwrap();

        // Lay-off is locked for every final turn.
        let err = state.lay_off(seat, 0, 0, &[drawn]).unwrap_err();
        assert_eq!(err.rule_kind(), Some(RuleKind::FinalTurnPhase));

        state.discard(seat, drawn).unwrap();
    }

    // The lap came back to the player who went out: round 2 begins.
    assert_eq!(state.round_number, 2);
    assert!(!state.final_turn_phase);
    assert_eq!(state.player_who_went_out, None);
    for player in &state.players {
        assert_eq!(player.hand.len(), 4);
        assert!(player.melds.is_empty());
    }
}

#[test]
fn round_scores_count_remaining_hands_only() {
    let mut state = started_game(7, 3);
    // Known remaining hands for the two players who did not go out.
    state.players[1].hand = cards(&["H4", "HX", "JK"]);
    state.players[2].hand = cards(&["SK", "S3", "C5"]);
    go_out_as_current_player(&mut state);

    for seat in [1usize, 2] {
        let drawn = state.draw_from_stock(seat).unwrap();
        state.discard(seat, drawn).unwrap();
    }

    assert_eq!(state.round_number, 2);
    assert_eq!(state.players[0].score, 0);
    // Round 1: 3s wild. H4 + HX + JK = 4 + 10 + 50.
    assert_eq!(state.players[1].score, 64);
    // SK + S3(wild) + C5 = 13 + 20 + 5.
    assert_eq!(state.players[2].score, 38);
}

#[test]
fn commands_after_round_close_belong_to_the_new_round() {
    let mut state = started_game(19, 2);
    go_out_as_current_player(&mut state);

    let drawn = state.draw_from_stock(1).unwrap();
    state.discard(1, drawn).unwrap();

    // Round 2: deal rotated to seat 1, fresh phases.
    assert_eq!(state.round_number, 2);
    assert_eq!(state.turn_index, 1);
    assert_eq!(state.turn_phase, TurnPhase::MustDraw);
    assert_eq!(state.status, GameStatus::Active);
    // Stale final-turn commands from the old round are plain turn errors.
    let err = state.draw_from_stock(0).unwrap_err();
    assert_eq!(err.rule_kind(), Some(RuleKind::NotYourTurn));
}

#[test]
fn going_out_during_final_turn_keeps_the_first_marker() {
    let mut state = started_game(11, 3);
    go_out_as_current_player(&mut state);
    assert_eq!(state.player_who_went_out, Some(0));

    // Seat 1 also manages to go out on their final turn.
    rig_current_hand(&mut state, &["D6", "D7", "D8", "TJ"]);
    state
        .go_out(
            1,
            &[MeldSpec {
                kind: MeldKind::Run,
                cards: cards(&["D6", "D7", "D8"]),
            }],
            card("TJ"),
        )
        .unwrap();

    // Still seat 0's lap marker; seat 2 plays the last final turn.
    assert_eq!(state.round_number, 1);
    assert_eq!(state.player_who_went_out, Some(0));
    assert_eq!(state.turn_index, 2);
    let drawn = state.draw_from_stock(2).unwrap();
    state.discard(2, drawn).unwrap();
    assert_eq!(state.round_number, 2);
}
