//! Meld validation: runs, books, lay-off extension, and going out.
//!
//! These predicates are the single semantic authority for meld legality.
//! Every other component (state machine, hub, routes) calls into this module
//! and never re-implements the logic.

use serde::{Deserialize, Serialize};

use crate::domain::cards::Card;
use crate::errors::domain::{DomainError, RuleKind};

#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MeldKind {
    Run,
    Book,
}

/// A meld as proposed on the wire or recorded in an event: a declared kind
/// plus the exact cards, unvalidated until [`Meld::new`] accepts it.
#[derive(Debug, Clone, Eq, PartialEq, Serialize, Deserialize)]
pub struct MeldSpec {
    pub kind: MeldKind,
    pub cards: Vec<Card>,
}

/// A validated meld. Run cards are stored value-ascending with wilds in
/// their gap positions; book order is insertion order.
#[derive(Debug, Clone, Eq, PartialEq, Serialize, Deserialize)]
pub struct Meld {
    pub kind: MeldKind,
    pub cards: Vec<Card>,
}

impl Meld {
    /// Build a meld from a declared kind and card set, validating against
    /// the round's wild rank. All-wild melds keep the declared kind.
    pub fn new(kind: MeldKind, cards: Vec<Card>, round: u8) -> Result<Self, DomainError> {
        let valid = match kind {
            MeldKind::Run => is_valid_run(&cards, round),
            MeldKind::Book => is_valid_book(&cards, round),
        };
        if !valid {
            return Err(DomainError::rule(
                RuleKind::InvalidMeld,
                format!("{} cards do not form a valid {kind:?}", cards.len()),
            ));
        }
        let cards = match kind {
            MeldKind::Run => arrange_run(cards, round),
            MeldKind::Book => cards,
        };
        Ok(Self { kind, cards })
    }
}

fn partition_wilds(cards: &[Card], round: u8) -> (Vec<Card>, Vec<Card>) {
    cards.iter().copied().partition(|c| c.is_wild(round))
}

/// A run is ≥3 cards of one suit with consecutive rank values; wilds fill
/// interior gaps. A wild-rank card always counts as a wild, never as its
/// printed rank, and duplicate natural ranks are rejected outright.
pub fn is_valid_run(cards: &[Card], round: u8) -> bool {
    if cards.len() < 3 {
        return false;
    }
    let (wilds, naturals) = partition_wilds(cards, round);
    if naturals.is_empty() {
        return true;
    }

    let suit = naturals[0].suit().expect("naturals are suited");
    if naturals.iter().any(|c| c.suit() != Some(suit)) {
        return false;
    }

    let mut values: Vec<u8> = naturals
        .iter()
        .map(|c| c.rank().expect("naturals are ranked").value())
        .collect();
    values.sort_unstable();
    if values.windows(2).any(|w| w[0] == w[1]) {
        return false;
    }

    let gaps: usize = values
        .windows(2)
        .map(|w| (w[1] - w[0] - 1) as usize)
        .sum();
    wilds.len() >= gaps
}

/// A book is ≥3 cards of one rank; duplicate suits are legal with two
/// decks, and there is no upper size bound.
pub fn is_valid_book(cards: &[Card], round: u8) -> bool {
    if cards.len() < 3 {
        return false;
    }
    let (_, naturals) = partition_wilds(cards, round);
    let Some(first) = naturals.first() else {
        return true;
    };
    let rank = first.rank().expect("naturals are ranked");
    naturals.iter().all(|c| c.rank() == Some(rank))
}

pub fn is_valid_meld(cards: &[Card], round: u8) -> bool {
    is_valid_run(cards, round) || is_valid_book(cards, round)
}

/// Classify a card set: run first, else book. All-wild sets satisfy both;
/// the caller's declared kind wins there (see [`Meld::new`]).
pub fn meld_kind(cards: &[Card], round: u8) -> Option<MeldKind> {
    if is_valid_run(cards, round) {
        Some(MeldKind::Run)
    } else if is_valid_book(cards, round) {
        Some(MeldKind::Book)
    } else {
        None
    }
}

/// Whether `new_cards` can extend `existing` while preserving its kind.
pub fn can_extend_meld(existing: &Meld, new_cards: &[Card], round: u8) -> bool {
    if new_cards.is_empty() {
        return false;
    }
    let mut combined = existing.cards.clone();
    combined.extend_from_slice(new_cards);
    match existing.kind {
        MeldKind::Run => is_valid_run(&combined, round),
        MeldKind::Book => is_valid_book(&combined, round),
    }
}

/// Whether the hand can go out with the proposed melds plus final discard:
/// the melds and the discard must consume the hand exactly, and every meld
/// must be valid on its own.
pub fn can_go_out(hand: &[Card], melds: &[Vec<Card>], discard: Card, round: u8) -> bool {
    let meld_total: usize = melds.iter().map(Vec::len).sum();
    if meld_total + 1 != hand.len() {
        return false;
    }
    if !melds.iter().all(|m| is_valid_meld(m, round)) {
        return false;
    }
    let mut remaining = hand.to_vec();
    for meld in melds {
        match multiset_subtract(&remaining, meld) {
            Some(rest) => remaining = rest,
            None => return false,
        }
    }
    matches!(multiset_subtract(&remaining, &[discard]), Some(rest) if rest.is_empty())
}

/// Remove `cards` from `from` as a multiset. Returns the remainder, or
/// `None` if any card is missing.
pub fn multiset_subtract(from: &[Card], cards: &[Card]) -> Option<Vec<Card>> {
    let mut remaining = from.to_vec();
    for card in cards {
        let idx = remaining.iter().position(|c| c == card)?;
        remaining.swap_remove(idx);
    }
    Some(remaining)
}

/// Sort run cards value-ascending with wilds interleaved into the gaps they
/// fill; surplus wilds trail the run.
fn arrange_run(cards: Vec<Card>, round: u8) -> Vec<Card> {
    let (mut wilds, mut naturals) = partition_wilds(&cards, round);
    naturals.sort_by_key(|c| c.rank().expect("naturals are ranked").value());

    let mut arranged = Vec::with_capacity(cards.len());
    let mut prev_value: Option<u8> = None;
    for natural in naturals {
        let value = natural.rank().expect("naturals are ranked").value();
        if let Some(prev) = prev_value {
            for _ in 0..(value - prev - 1) {
                if let Some(wild) = wilds.pop() {
                    arranged.push(wild);
                }
            }
        }
        arranged.push(natural);
        prev_value = Some(value);
    }
    arranged.extend(wilds);
    arranged
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::cards::{Rank, Suit};

    fn cards(tokens: &[&str]) -> Vec<Card> {
        tokens.iter().map(|t| t.parse().unwrap()).collect()
    }

    #[test]
    fn run_of_three_naturals() {
        // round 1: 3s wild
        assert!(is_valid_run(&cards(&["H4", "H5", "H6"]), 1));
    }

    #[test]
    fn run_rejects_short_and_mixed_suit() {
        assert!(!is_valid_run(&cards(&["H4", "H5"]), 1));
        assert!(!is_valid_run(&cards(&["H4", "S5", "H6"]), 1));
    }

    #[test]
    fn run_wild_gap_accounting() {
        // round 5: 7s wild. Naturals {4,8} need three fillers, two wilds.
        assert!(!is_valid_run(&cards(&["H4", "H7", "JK", "H8"]), 5));
        // Naturals {4,5,8}: gap 6,7 covered by H7-as-wild plus the joker.
        assert!(is_valid_run(&cards(&["H4", "H5", "H7", "JK", "H8"]), 5));
        // One wild cannot cover the two-slot gap.
        assert!(!is_valid_run(&cards(&["H4", "H5", "H7", "H8"]), 5));
    }

    #[test]
    fn run_rejects_duplicate_naturals() {
        assert!(!is_valid_run(&cards(&["H4", "H4", "H5", "H6"]), 1));
    }

    #[test]
    fn run_permits_trailing_wilds() {
        assert!(is_valid_run(&cards(&["H4", "H5", "H6", "JK"]), 1));
    }

    #[test]
    fn all_wild_meld_is_both() {
        let all_wild = cards(&["JK", "JK", "H3"]);
        assert!(is_valid_run(&all_wild, 1));
        assert!(is_valid_book(&all_wild, 1));
    }

    #[test]
    fn book_with_duplicate_suits() {
        assert!(is_valid_book(&cards(&["HQ", "HQ", "SQ"]), 1));
    }

    #[test]
    fn book_rejects_mixed_ranks() {
        assert!(!is_valid_book(&cards(&["HQ", "SQ", "SK"]), 1));
    }

    #[test]
    fn book_has_no_upper_bound() {
        assert!(is_valid_book(
            &cards(&["H9", "S9", "D9", "C9", "T9", "H9", "JK"]),
            1
        ));
    }

    #[test]
    fn extend_preserves_kind() {
        let run = Meld::new(MeldKind::Run, cards(&["H4", "H5", "H6"]), 1).unwrap();
        assert!(can_extend_meld(&run, &cards(&["H7"]), 1));
        assert!(!can_extend_meld(&run, &cards(&["S7"]), 1));
        assert!(!can_extend_meld(&run, &[], 1));

        let book = Meld::new(MeldKind::Book, cards(&["HQ", "SQ", "DQ"]), 1).unwrap();
        assert!(can_extend_meld(&book, &cards(&["TQ"]), 1));
        assert!(!can_extend_meld(&book, &cards(&["TK"]), 1));
    }

    #[test]
    fn go_out_requires_exact_consumption() {
        let hand = cards(&["H4", "H5", "H6", "C8"]);
        let melds = vec![cards(&["H4", "H5", "H6"])];
        let discard: Card = "C8".parse().unwrap();
        assert!(can_go_out(&hand, &melds, discard, 1));

        let mut bigger = hand.clone();
        bigger.push("C9".parse().unwrap());
        assert!(!can_go_out(&bigger, &melds, discard, 1));

        // discard must come from the hand
        assert!(!can_go_out(&hand, &melds, "C9".parse().unwrap(), 1));
    }

    #[test]
    fn go_out_rejects_invalid_meld() {
        let hand = cards(&["H4", "S5", "H6", "C8"]);
        let melds = vec![cards(&["H4", "S5", "H6"])];
        assert!(!can_go_out(&hand, &melds, "C8".parse().unwrap(), 1));
    }

    #[test]
    fn run_storage_order_interleaves_wilds() {
        let meld = Meld::new(MeldKind::Run, cards(&["H8", "JK", "H5", "H6"]), 1).unwrap();
        // 5, 6, wild-filling-7, 8
        assert_eq!(meld.cards[0], Card::new(Suit::Hearts, Rank::Five));
        assert_eq!(meld.cards[1], Card::new(Suit::Hearts, Rank::Six));
        assert_eq!(meld.cards[2], Card::Joker);
        assert_eq!(meld.cards[3], Card::new(Suit::Hearts, Rank::Eight));
    }

    #[test]
    fn multiset_subtract_respects_duplicates() {
        let hand = cards(&["HQ", "HQ", "SQ"]);
        let rest = multiset_subtract(&hand, &cards(&["HQ"])).unwrap();
        assert_eq!(rest.len(), 2);
        assert!(multiset_subtract(&hand, &cards(&["HQ", "HQ", "HQ"])).is_none());
    }
}
