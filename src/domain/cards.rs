//! Core card types: Suit, Rank, Card, wildness, point values, deck composition.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::errors::domain::DomainError;

/// Rounds run 1..=11 with hand sizes 3..=13.
pub const MIN_ROUND: u8 = 1;
pub const MAX_ROUND: u8 = 11;

/// Two copies of the 55-card Five Crowns deck plus 6 jokers.
pub const DECK_SIZE: usize = 116;
pub const JOKERS_PER_DOUBLE_DECK: usize = 6;

#[derive(Debug, Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub enum Suit {
    Hearts,
    Spades,
    Diamonds,
    Clubs,
    Stars,
}

impl Suit {
    pub const ALL: [Suit; 5] = [
        Suit::Hearts,
        Suit::Spades,
        Suit::Diamonds,
        Suit::Clubs,
        Suit::Stars,
    ];

    pub const fn letter(self) -> char {
        match self {
            Suit::Hearts => 'H',
            Suit::Spades => 'S',
            Suit::Diamonds => 'D',
            Suit::Clubs => 'C',
            Suit::Stars => 'T',
        }
    }
}

#[derive(Debug, Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub enum Rank {
    Three,
    Four,
    Five,
    Six,
    Seven,
    Eight,
    Nine,
    Ten,
    Jack,
    Queen,
    King,
}

impl Rank {
    pub const ALL: [Rank; 11] = [
        Rank::Three,
        Rank::Four,
        Rank::Five,
        Rank::Six,
        Rank::Seven,
        Rank::Eight,
        Rank::Nine,
        Rank::Ten,
        Rank::Jack,
        Rank::Queen,
        Rank::King,
    ];

    /// Natural rank value, 3..=13.
    pub const fn value(self) -> u8 {
        match self {
            Rank::Three => 3,
            Rank::Four => 4,
            Rank::Five => 5,
            Rank::Six => 6,
            Rank::Seven => 7,
            Rank::Eight => 8,
            Rank::Nine => 9,
            Rank::Ten => 10,
            Rank::Jack => 11,
            Rank::Queen => 12,
            Rank::King => 13,
        }
    }

    pub const fn from_value(value: u8) -> Option<Rank> {
        match value {
            3 => Some(Rank::Three),
            4 => Some(Rank::Four),
            5 => Some(Rank::Five),
            6 => Some(Rank::Six),
            7 => Some(Rank::Seven),
            8 => Some(Rank::Eight),
            9 => Some(Rank::Nine),
            10 => Some(Rank::Ten),
            11 => Some(Rank::Jack),
            12 => Some(Rank::Queen),
            13 => Some(Rank::King),
            _ => None,
        }
    }

    pub const fn letter(self) -> char {
        match self {
            Rank::Three => '3',
            Rank::Four => '4',
            Rank::Five => '5',
            Rank::Six => '6',
            Rank::Seven => '7',
            Rank::Eight => '8',
            Rank::Nine => '9',
            Rank::Ten => 'X',
            Rank::Jack => 'J',
            Rank::Queen => 'Q',
            Rank::King => 'K',
        }
    }
}

/// The rank that is wild in the given round: round 1 → 3s, round 11 → Ks.
/// Out-of-range rounds are a caller bug; clamp keeps the function total.
pub fn wild_rank_for_round(round: u8) -> Rank {
    let value = round.clamp(MIN_ROUND, MAX_ROUND) + 2;
    Rank::from_value(value).expect("round+2 is always a valid rank value")
}

#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum Card {
    Suited { suit: Suit, rank: Rank },
    Joker,
}

impl Card {
    pub const fn new(suit: Suit, rank: Rank) -> Self {
        Card::Suited { suit, rank }
    }

    pub const fn rank(self) -> Option<Rank> {
        match self {
            Card::Suited { rank, .. } => Some(rank),
            Card::Joker => None,
        }
    }

    pub const fn suit(self) -> Option<Suit> {
        match self {
            Card::Suited { suit, .. } => Some(suit),
            Card::Joker => None,
        }
    }

    /// Wildness is evaluated fresh against the current round, never stored.
    pub fn is_wild(self, round: u8) -> bool {
        match self {
            Card::Joker => true,
            Card::Suited { rank, .. } => rank == wild_rank_for_round(round),
        }
    }

    /// Point value of a card left in hand when the round is scored.
    pub fn point_value(self, round: u8) -> u32 {
        match self {
            Card::Joker => 50,
            Card::Suited { rank, .. } => {
                if rank == wild_rank_for_round(round) {
                    20
                } else {
                    rank.value() as u32
                }
            }
        }
    }
}

// Ord on Card is only for stable sorting (suit then rank, jokers last).
// Game logic never compares cards by this ordering.
impl Ord for Card {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        match (self, other) {
            (Card::Joker, Card::Joker) => std::cmp::Ordering::Equal,
            (Card::Joker, _) => std::cmp::Ordering::Greater,
            (_, Card::Joker) => std::cmp::Ordering::Less,
            (
                Card::Suited { suit: s1, rank: r1 },
                Card::Suited { suit: s2, rank: r2 },
            ) => s1.cmp(s2).then(r1.cmp(r2)),
        }
    }
}

impl PartialOrd for Card {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Display for Card {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Card::Joker => write!(f, "JK"),
            Card::Suited { suit, rank } => write!(f, "{}{}", suit.letter(), rank.letter()),
        }
    }
}

impl FromStr for Card {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s == "JK" {
            return Ok(Card::Joker);
        }
        let mut chars = s.chars();
        let (Some(suit_ch), Some(rank_ch), None) = (chars.next(), chars.next(), chars.next())
        else {
            return Err(DomainError::validation(format!("Parse card: {s}")));
        };
        let suit = match suit_ch {
            'H' => Suit::Hearts,
            'S' => Suit::Spades,
            'D' => Suit::Diamonds,
            'C' => Suit::Clubs,
            'T' => Suit::Stars,
            _ => return Err(DomainError::validation(format!("Parse card: {s}"))),
        };
        let rank = match rank_ch {
            '3' => Rank::Three,
            '4' => Rank::Four,
            '5' => Rank::Five,
            '6' => Rank::Six,
            '7' => Rank::Seven,
            '8' => Rank::Eight,
            '9' => Rank::Nine,
            'X' => Rank::Ten,
            'J' => Rank::Jack,
            'Q' => Rank::Queen,
            'K' => Rank::King,
            _ => return Err(DomainError::validation(format!("Parse card: {s}"))),
        };
        Ok(Card::Suited { suit, rank })
    }
}

impl Serialize for Card {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Card {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let token = String::deserialize(deserializer)?;
        token.parse().map_err(serde::de::Error::custom)
    }
}

/// Non-panicking helper to parse card tokens (e.g. "H7", "TX", "JK").
pub fn try_parse_cards<I, S>(tokens: I) -> Result<Vec<Card>, DomainError>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    tokens
        .into_iter()
        .map(|s| s.as_ref().parse::<Card>())
        .collect()
}

/// The full 116-card double deck in canonical order (shuffling is the
/// caller's concern).
pub fn double_deck() -> Vec<Card> {
    let mut deck = Vec::with_capacity(DECK_SIZE);
    for _ in 0..2 {
        for suit in Suit::ALL {
            for rank in Rank::ALL {
                deck.push(Card::new(suit, rank));
            }
        }
    }
    for _ in 0..JOKERS_PER_DOUBLE_DECK {
        deck.push(Card::Joker);
    }
    deck
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn deck_has_116_cards() {
        let deck = double_deck();
        assert_eq!(deck.len(), DECK_SIZE);
        assert_eq!(deck.iter().filter(|c| **c == Card::Joker).count(), 6);
        // every suited card appears exactly twice
        for suit in Suit::ALL {
            for rank in Rank::ALL {
                let card = Card::new(suit, rank);
                assert_eq!(deck.iter().filter(|c| **c == card).count(), 2);
            }
        }
    }

    #[test]
    fn wild_rank_rotates_with_round() {
        assert_eq!(wild_rank_for_round(1), Rank::Three);
        assert_eq!(wild_rank_for_round(5), Rank::Seven);
        assert_eq!(wild_rank_for_round(11), Rank::King);
    }

    #[test]
    fn wildness_is_round_relative() {
        let seven = Card::new(Suit::Hearts, Rank::Seven);
        assert!(seven.is_wild(5));
        assert!(!seven.is_wild(4));
        assert!(Card::Joker.is_wild(1));
        assert!(Card::Joker.is_wild(11));
    }

    #[test]
    fn point_values() {
        assert_eq!(Card::Joker.point_value(3), 50);
        // 7s are wild in round 5
        assert_eq!(Card::new(Suit::Clubs, Rank::Seven).point_value(5), 20);
        assert_eq!(Card::new(Suit::Clubs, Rank::Seven).point_value(4), 7);
        assert_eq!(Card::new(Suit::Stars, Rank::King).point_value(1), 13);
        assert_eq!(Card::new(Suit::Spades, Rank::Three).point_value(2), 3);
    }

    #[test]
    fn codec_round_trips() {
        for token in ["H7", "TX", "JK", "S3", "DK", "CQ", "T9"] {
            let card: Card = token.parse().unwrap();
            assert_eq!(card.to_string(), token);
        }
    }

    #[test]
    fn rejects_invalid_tokens() {
        for token in ["", "H", "H2", "HA", "ZX", "10H", "jk", "hx", "H77"] {
            assert!(token.parse::<Card>().is_err(), "should reject {token:?}");
        }
    }

    #[test]
    fn serde_uses_wire_tokens() {
        let card = Card::new(Suit::Stars, Rank::Ten);
        assert_eq!(serde_json::to_string(&card).unwrap(), "\"TX\"");
        let back: Card = serde_json::from_str("\"TX\"").unwrap();
        assert_eq!(back, card);
        let joker: Card = serde_json::from_str("\"JK\"").unwrap();
        assert_eq!(joker, Card::Joker);
        assert!(serde_json::from_str::<Card>("\"Z9\"").is_err());
    }
}
