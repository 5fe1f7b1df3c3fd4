//! Shared helpers for the domain test suites.
#![allow(dead_code)]

use fivecrowns_backend::domain::cards::{wild_rank_for_round, Card, Rank};
use fivecrowns_backend::domain::melds::{MeldKind, MeldSpec};
use fivecrowns_backend::domain::state::{GameState, TurnPhase};

pub fn cards(tokens: &[&str]) -> Vec<Card> {
    tokens.iter().map(|t| t.parse().unwrap()).collect()
}

pub fn card(token: &str) -> Card {
    token.parse().unwrap()
}

/// A started game with the given player count.
pub fn started_game(seed: u64, players: usize) -> GameState {
    let user_ids: Vec<i64> = (1..=players as i64).collect();
    let mut state = GameState::new(1, seed, &user_ids);
    state.start_game().unwrap();
    state
}

/// Force a specific hand onto the current player and put them in the
/// discard phase, as if they had just drawn.
pub fn rig_current_hand(state: &mut GameState, tokens: &[&str]) {
    let seat = state.turn_index;
    state.players[seat].hand = cards(tokens);
    state.turn_phase = TurnPhase::MustDiscard;
}

/// The rank a book-collecting player should chase: the non-wild rank with
/// the most copies in hand.
pub fn book_goal(hand: &[Card], round: u8) -> Option<Rank> {
    let wild = wild_rank_for_round(round);
    let mut best: Option<(Rank, usize)> = None;
    for card in hand {
        let Some(rank) = card.rank() else { continue };
        if rank == wild {
            continue;
        }
        let count = hand.iter().filter(|c| c.rank() == Some(rank)).count();
        if best.map_or(true, |(_, n)| count > n) {
            best = Some((rank, count));
        }
    }
    best.map(|(rank, _)| rank)
}

/// Whether a card contributes to the book the player is collecting.
pub fn is_useful(card: Card, goal: Option<Rank>, round: u8) -> bool {
    card.is_wild(round) || (goal.is_some() && card.rank() == goal)
}

/// A legal go-out for a book-collecting hand, if one exists: all but one
/// card form a single book of the goal rank plus wilds, the leftover is
/// the discard.
pub fn book_go_out(hand: &[Card], round: u8) -> Option<(Vec<MeldSpec>, Card)> {
    let goal = book_goal(hand, round);
    let (useful, junk): (Vec<Card>, Vec<Card>) = hand
        .iter()
        .copied()
        .partition(|c| is_useful(*c, goal, round));
    if useful.len() + 1 < hand.len() {
        return None;
    }
    let (meld, discard) = match junk.first() {
        Some(j) => (useful, *j),
        None => {
            let mut rest = useful;
            let d = rest.pop()?;
            (rest, d)
        }
    };
    if meld.len() < 3 {
        return None;
    }
    Some((
        vec![MeldSpec {
            kind: MeldKind::Book,
            cards: meld,
        }],
        discard,
    ))
}
