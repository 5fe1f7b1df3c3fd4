//! Concrete rules scenarios at the state-machine level.

mod common;

use common::{card, cards, rig_current_hand, started_game};
use fivecrowns_backend::domain::melds::{
    can_go_out, is_valid_book, is_valid_run, MeldKind, MeldSpec,
};
use fivecrowns_backend::domain::state::TurnPhase;
use fivecrowns_backend::errors::domain::RuleKind;

/// Round 1 (3s wild): lay a three-card run and discard the fourth card.
#[test]
fn round_one_run_then_discard_empties_hand() {
    let mut state = started_game(11, 2);
    rig_current_hand(&mut state, &["H4", "H5", "H6", "H7"]);

    state
        .lay_melds(
            0,
            &[MeldSpec {
                kind: MeldKind::Run,
                cards: cards(&["H4", "H5", "H6"]),
            }],
        )
        .unwrap();
    assert_eq!(state.players[0].melds.len(), 1);
    assert_eq!(state.players[0].melds[0].cards.len(), 3);

    state.discard(0, card("H7")).unwrap();
    assert!(state.players[0].hand.is_empty());
    assert_eq!(state.turn_index, 1);
    assert_eq!(state.turn_phase, TurnPhase::MustDraw);
}

/// Round 5 (7s wild): wilds must cover the whole interior gap.
#[test]
fn wild_substitution_respects_gap_limit() {
    // Naturals {4, 8} leave a three-slot gap; the 7 and the joker are only
    // two wilds.
    assert!(!is_valid_run(&cards(&["H4", "H7", "JK", "H8"]), 5));
    // Naturals {4, 5, 8}: two wilds cover the 6-7 gap.
    assert!(is_valid_run(&cards(&["H4", "H5", "H7", "JK", "H8"]), 5));
    // A wild-rank card never stands in as its printed rank.
    assert!(!is_valid_run(&cards(&["H4", "H5", "H7", "H8"]), 5));
}

/// Two decks make duplicate suits legal in books.
#[test]
fn book_accepts_duplicate_suits() {
    assert!(is_valid_book(&cards(&["HQ", "HQ", "SQ"]), 1));
}

#[test]
fn go_out_requires_exact_hand_consumption() {
    let hand = cards(&["H4", "H5", "H6", "C8"]);
    let melds = vec![cards(&["H4", "H5", "H6"])];
    assert!(can_go_out(&hand, &melds, card("C8"), 1));

    let mut bigger = hand.clone();
    bigger.push(card("C9"));
    assert!(!can_go_out(&bigger, &melds, card("C8"), 1));
}

/// A lay-off extends another player's meld and consumes the card.
#[test]
fn lay_off_extends_other_players_meld() {
    let mut state = started_game(23, 2);

    // Seat 0 melds a run and discards.
    rig_current_hand(&mut state, &["H4", "H5", "H6", "SQ"]);
    state
        .lay_melds(
            0,
            &[MeldSpec {
                kind: MeldKind::Run,
                cards: cards(&["H4", "H5", "H6"]),
            }],
        )
        .unwrap();
    state.discard(0, card("SQ")).unwrap();

    // Seat 1 draws, then lays H7 onto seat 0's run.
    rig_current_hand(&mut state, &["H7", "C3", "C9", "DX"]);
    let hand_before = state.players[1].hand.len();
    state.lay_off(1, 0, 0, &cards(&["H7"])).unwrap();

    assert_eq!(state.players[0].melds[0].cards.len(), 4);
    assert_eq!(state.players[1].hand.len(), hand_before - 1);
    assert!(!state.players[1].hand.contains(&card("H7")));
}

/// After a go-out, lay-off is locked for everyone's final turn.
#[test]
fn final_turn_lockout_rejects_lay_off() {
    let mut state = started_game(31, 2);

    rig_current_hand(&mut state, &["H4", "H5", "H6", "C8"]);
    state
        .go_out(
            0,
            &[MeldSpec {
                kind: MeldKind::Run,
                cards: cards(&["H4", "H5", "H6"]),
            }],
            card("C8"),
        )
        .unwrap();
    assert!(state.final_turn_phase);
    assert_eq!(state.player_who_went_out, Some(0));

    // Seat 1 draws into the discard phase, then tries to lay off.
    state.draw_from_stock(1).unwrap();
    let before = state.clone();
    let err = state.lay_off(1, 0, 0, &cards(&["H7"])).unwrap_err();
    assert_eq!(err.rule_kind(), Some(RuleKind::FinalTurnPhase));
    assert_eq!(state, before);
}
