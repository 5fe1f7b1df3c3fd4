//! Full-game playouts: eleven rounds of legal play through to Finished,
//! with the conservation law checked after every committed command.
//!
//! The driver plays a simple book-collecting strategy (keep the most
//! common rank plus wilds, shed everything else, go out once all but one
//! card form a single book), which provably converges because collected
//! cards are never given up and the stock keeps recycling discards.

mod common;

use common::{book_go_out, book_goal, is_useful};
use fivecrowns_backend::domain::cards::DECK_SIZE;
use fivecrowns_backend::domain::state::{GameState, GameStatus, TurnPhase};
use fivecrowns_backend::domain::MAX_ROUND;

const COMMAND_CAP: usize = 100_000;

fn play_to_finish(seed: u64, players: usize) -> GameState {
    let user_ids: Vec<i64> = (1..=players as i64).collect();
    let mut state = GameState::new(9, seed, &user_ids);
    state.start_game().unwrap();
    assert_eq!(state.card_count(), DECK_SIZE);

    let mut rounds_seen = vec![state.round_number];
    for commands in 1.. {
        if state.status != GameStatus::Active {
            break;
        }
        assert!(
            commands < COMMAND_CAP,
            "game stalled in round {} after {commands} commands",
            state.round_number
        );

        let seat = state.turn_index;
        let round = state.round_number;
        match state.turn_phase {
            TurnPhase::MustDraw => {
                let goal = book_goal(&state.players[seat].hand, round);
                let top_useful = state
                    .discard
                    .last()
                    .is_some_and(|c| is_useful(*c, goal, round));
                if top_useful {
                    state.draw_from_discard(seat).unwrap();
                } else {
                    state.draw_from_stock(seat).unwrap();
                }
            }
            TurnPhase::MustDiscard => {
                let hand = state.players[seat].hand.clone();
                if let Some((melds, discard)) = book_go_out(&hand, round) {
                    state.go_out(seat, &melds, discard).unwrap();
                } else {
                    let goal = book_goal(&hand, round);
                    let junk = hand
                        .iter()
                        .copied()
                        .find(|c| !is_useful(*c, goal, round))
                        .unwrap_or(hand[0]);
                    state.discard(seat, junk).unwrap();
                }
            }
        }

        if state.status == GameStatus::Active {
            assert_eq!(
                state.card_count(),
                DECK_SIZE,
                "conservation violated in round {}",
                state.round_number
            );
            if rounds_seen.last() != Some(&state.round_number) {
                rounds_seen.push(state.round_number);
            }
        }
    }

    assert_eq!(
        rounds_seen,
        (1..=MAX_ROUND).collect::<Vec<u8>>(),
        "every round must be played exactly once, in order"
    );
    state
}

#[test]
fn full_game_reaches_finished_after_round_eleven() {
    let state = play_to_finish(2024, 2);
    assert_eq!(state.status, GameStatus::Finished);
    assert_eq!(state.round_number, MAX_ROUND);
    assert!(state.player_who_went_out.is_none());
    assert!(!state.final_turn_phase);
}

#[test]
fn finished_game_returns_every_card_to_the_box() {
    let state = play_to_finish(7, 2);
    assert_eq!(state.status, GameStatus::Finished);
    assert!(state.stock.is_empty());
    assert!(state.discard.is_empty());
    for player in &state.players {
        assert!(player.hand.is_empty());
        assert!(player.melds.is_empty());
    }
    assert_eq!(state.card_count(), 0);
}

#[test]
fn lowest_total_score_wins() {
    let state = play_to_finish(31337, 2);
    let winners = state.winner_seats();
    assert!(!winners.is_empty());
    let best = state.players.iter().map(|p| p.score).min().unwrap();
    for seat in &winners {
        assert_eq!(state.players[*seat].score, best);
    }
    for player in &state.players {
        assert!(player.score >= best);
    }
}
