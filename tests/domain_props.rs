//! Property tests for the rules engine's quantified invariants.

mod common;

use common::{book_go_out, book_goal, is_useful};
use proptest::prelude::*;

use fivecrowns_backend::domain::cards::{double_deck, Card, Rank, Suit, DECK_SIZE};
use fivecrowns_backend::domain::melds::{
    can_extend_meld, is_valid_book, is_valid_meld, is_valid_run, Meld, MeldKind, MeldSpec,
};
use fivecrowns_backend::domain::state::{GameState, GameStatus, TurnPhase};

fn arb_card() -> impl Strategy<Value = Card> {
    prop_oneof![
        9 => (0usize..5, 3u8..=13).prop_map(|(s, v)| {
            Card::new(Suit::ALL[s], Rank::from_value(v).expect("value in range"))
        }),
        1 => Just(Card::Joker),
    ]
}

fn arb_cards(max: usize) -> impl Strategy<Value = Vec<Card>> {
    prop::collection::vec(arb_card(), 0..max)
}

/// A structurally valid run built from consecutive naturals.
fn arb_run(round: u8) -> impl Strategy<Value = Meld> {
    (0usize..5, 3u8..=9, 3usize..=5).prop_map(move |(suit_idx, start, len)| {
        let suit = Suit::ALL[suit_idx];
        let cards: Vec<Card> = (0..len as u8)
            .filter_map(|i| Rank::from_value(start + i).map(|r| Card::new(suit, r)))
            .collect();
        Meld::new(MeldKind::Run, cards, round).expect("consecutive naturals form a run")
    })
}

fn arb_book(round: u8) -> impl Strategy<Value = Meld> {
    (3u8..=13, prop::collection::vec(0usize..5, 3..=5)).prop_map(move |(value, suits)| {
        let rank = Rank::from_value(value).expect("value in range");
        let cards: Vec<Card> = suits.iter().map(|&s| Card::new(Suit::ALL[s], rank)).collect();
        Meld::new(MeldKind::Book, cards, round).expect("same-rank cards form a book")
    })
}

#[test]
fn card_codec_round_trips_whole_deck() {
    for card in double_deck() {
        let token = card.to_string();
        let back: Card = token.parse().unwrap();
        assert_eq!(back, card, "token {token}");
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    /// A card set that is simultaneously a run and a book can have at most
    /// one natural: runs force distinct ranks, books force equal ranks.
    #[test]
    fn run_and_book_overlap_is_nearly_all_wild(
        cards in arb_cards(8),
        round in 1u8..=11,
    ) {
        if is_valid_run(&cards, round) && is_valid_book(&cards, round) {
            let naturals = cards.iter().filter(|c| !c.is_wild(round)).count();
            prop_assert!(
                naturals <= 1,
                "run/book overlap with {naturals} naturals: {cards:?} round {round}"
            );
        }
    }

    /// Accepting a lay-off implies the combined card set is a valid meld.
    #[test]
    fn extend_implies_valid_run(
        round in 1u8..=11u8,
        existing in (1u8..=11u8).prop_flat_map(arb_run),
        new_cards in arb_cards(4),
    ) {
        if can_extend_meld(&existing, &new_cards, round) {
            let mut combined = existing.cards.clone();
            combined.extend_from_slice(&new_cards);
            prop_assert!(is_valid_meld(&combined, round));
        }
    }

    #[test]
    fn extend_implies_valid_book(
        round in 1u8..=11u8,
        existing in (1u8..=11u8).prop_flat_map(arb_book),
        new_cards in arb_cards(4),
    ) {
        if can_extend_meld(&existing, &new_cards, round) {
            let mut combined = existing.cards.clone();
            combined.extend_from_slice(&new_cards);
            prop_assert!(is_valid_meld(&combined, round));
        }
    }

    /// 116-card conservation holds after every committed command of a
    /// random legal playout. The playout collects toward books so that
    /// go-outs, lay-offs, and round progression are all genuinely
    /// exercised, not just draws and discards.
    #[test]
    fn conservation_holds_through_random_playouts(
        seed in any::<u64>(),
        players in 2usize..=5,
        moves in prop::collection::vec(any::<u8>(), 0..200),
    ) {
        let user_ids: Vec<i64> = (1..=players as i64).collect();
        let mut state = GameState::new(1, seed, &user_ids);
        state.start_game().unwrap();
        prop_assert_eq!(state.card_count(), DECK_SIZE);

        for m in moves {
            if state.status != GameStatus::Active {
                break;
            }
            let seat = state.turn_index;
            let round = state.round_number;
            match state.turn_phase {
                TurnPhase::MustDraw => {
                    let goal = book_goal(&state.players[seat].hand, round);
                    let top_useful = state
                        .discard
                        .last()
                        .is_some_and(|c| is_useful(*c, goal, round));
                    if (top_useful || m % 3 == 0) && !state.discard.is_empty() {
                        state.draw_from_discard(seat).unwrap();
                    } else {
                        state.draw_from_stock(seat).unwrap();
                    }
                }
                TurnPhase::MustDiscard => {
                    // Occasionally try melding an arbitrary hand prefix;
                    // mostly rejected, which must leave state untouched.
                    if m % 11 == 0 && state.players[seat].hand.len() >= 4 {
                        let attempt: Vec<Card> =
                            state.players[seat].hand[..3].to_vec();
                        let before = state.card_count();
                        let _ = state.lay_melds(
                            seat,
                            &[MeldSpec { kind: MeldKind::Run, cards: attempt }],
                        );
                        prop_assert_eq!(state.card_count(), before);
                    }

                    let hand = state.players[seat].hand.clone();
                    if let Some((melds, discard)) = book_go_out(&hand, round) {
                        state.go_out(seat, &melds, discard).unwrap();
                    } else {
                        let goal = book_goal(&hand, round);
                        if m % 4 == 0 {
                            // Lay the collected book early so later turns
                            // have a lay-off target.
                            let useful: Vec<Card> = hand
                                .iter()
                                .copied()
                                .filter(|c| is_useful(*c, goal, round))
                                .collect();
                            if useful.len() >= 3 {
                                state
                                    .lay_melds(
                                        seat,
                                        &[MeldSpec { kind: MeldKind::Book, cards: useful }],
                                    )
                                    .unwrap();
                            }
                        } else if m % 4 == 1 && !state.final_turn_phase {
                            // Extend any player's meld with a single card.
                            'melds: for target in 0..state.players.len() {
                                for meld_idx in 0..state.players[target].melds.len() {
                                    let meld = state.players[target].melds[meld_idx].clone();
                                    let candidate = state.players[seat]
                                        .hand
                                        .iter()
                                        .copied()
                                        .find(|c| can_extend_meld(&meld, &[*c], round));
                                    if let Some(card) = candidate {
                                        state
                                            .lay_off(seat, target, meld_idx, &[card])
                                            .unwrap();
                                        break 'melds;
                                    }
                                }
                            }
                        }

                        let hand_now = &state.players[seat].hand;
                        let card = hand_now[m as usize % hand_now.len()];
                        state.discard(seat, card).unwrap();
                    }
                }
            }
            if state.status == GameStatus::Active {
                prop_assert_eq!(state.card_count(), DECK_SIZE);
            } else {
                // The game finished mid-playout: every card went back to
                // the box with it.
                prop_assert_eq!(state.card_count(), 0);
                break;
            }
        }
    }
}
