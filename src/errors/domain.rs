//! Domain-level error type used by the rules engine and services.
//!
//! This error type is HTTP- and DB-agnostic. Handlers return
//! `Result<T, crate::error::AppError>` and convert from `DomainError`
//! using the provided `From<DomainError> for AppError` implementation;
//! the websocket layer maps `RuleKind` onto its own wire codes.

use std::error::Error;
use std::fmt::{Display, Formatter, Result as FmtResult};

/// Rule violations surfaced to the acting socket only. Each variant maps
/// 1:1 onto a lowercase wire code in `crate::ws::protocol`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RuleKind {
    NotYourTurn,
    WrongPhase,
    InvalidMeld,
    CardNotInHand,
    CannotExtendMeld,
    CannotGoOut,
    FinalTurnPhase,
    GameNotActive,
    NotInGame,
}

/// Domain-level not found entities
#[derive(Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum NotFoundKind {
    User,
    Game,
    Card,
    Meld,
    Other(String),
}

/// Domain-level conflict kinds
#[derive(Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum ConflictKind {
    AlreadyMember,
    AlreadyFriends,
    AlreadyRequested,
    GameNotLobby,
    GameFull,
    UniqueEmail,
    Other(String),
}

/// Central domain error type
#[derive(Debug, Clone, PartialEq)]
pub enum DomainError {
    /// Input validation failure (bad card token, bad payload shape)
    Validation(String),
    /// Game-rule violation; never mutates state
    Rule(RuleKind, String),
    /// Semantic conflict
    Conflict(ConflictKind, String),
    /// Missing resource in domain terms
    NotFound(NotFoundKind, String),
}

impl Display for DomainError {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        match self {
            DomainError::Validation(d) => write!(f, "validation error: {d}"),
            DomainError::Rule(kind, d) => write!(f, "rule {kind:?}: {d}"),
            DomainError::Conflict(kind, d) => write!(f, "conflict {kind:?}: {d}"),
            DomainError::NotFound(kind, d) => write!(f, "not found {kind:?}: {d}"),
        }
    }
}

impl Error for DomainError {}

impl DomainError {
    pub fn validation(detail: impl Into<String>) -> Self {
        Self::Validation(detail.into())
    }
    pub fn rule(kind: RuleKind, detail: impl Into<String>) -> Self {
        Self::Rule(kind, detail.into())
    }
    pub fn conflict(kind: ConflictKind, detail: impl Into<String>) -> Self {
        Self::Conflict(kind, detail.into())
    }
    pub fn not_found(kind: NotFoundKind, detail: impl Into<String>) -> Self {
        Self::NotFound(kind, detail.into())
    }

    /// The rule violation kind, if this is a rule error.
    pub fn rule_kind(&self) -> Option<RuleKind> {
        match self {
            DomainError::Rule(kind, _) => Some(*kind),
            // A card or meld the engine cannot find is a rules failure from
            // the player's point of view.
            DomainError::NotFound(NotFoundKind::Card, _) => Some(RuleKind::CardNotInHand),
            DomainError::NotFound(NotFoundKind::Meld, _) => Some(RuleKind::InvalidMeld),
            _ => None,
        }
    }
}
