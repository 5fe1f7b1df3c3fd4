//! Error codes for the Five Crowns backend API.
//!
//! This module defines all error codes used throughout the application.
//! Add new codes here; never pass ad-hoc strings as error codes.
//!
//! All error codes are SCREAMING_SNAKE_CASE and map 1:1 to the strings
//! that appear in HTTP responses.

use core::fmt;

/// Centralized error codes for the Five Crowns backend API.
///
/// Each variant maps to a canonical SCREAMING_SNAKE_CASE string that appears
/// in HTTP responses. Websocket rule errors use their own lowercase codes in
/// `crate::ws::protocol`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCode {
    // Authentication & Authorization
    /// Authentication required
    Unauthorized,
    /// Missing or malformed Bearer token
    UnauthorizedMissingBearer,
    /// Invalid JWT token
    UnauthorizedInvalidJwt,
    /// JWT token has expired
    UnauthorizedExpiredJwt,
    /// Access denied
    Forbidden,
    /// User is not a member of the game
    NotAMember,
    /// Only the game host may perform this operation
    NotHost,
    /// Users are not accepted friends
    NotFriends,

    // Request Validation
    /// Invalid game ID provided
    InvalidGameId,
    /// Invalid email address
    InvalidEmail,
    /// Password does not meet requirements
    InvalidPassword,
    /// Max players outside the supported range
    InvalidMaxPlayers,
    /// Unknown card code on the wire
    ParseCard,
    /// General validation error
    ValidationError,
    /// General bad request error
    BadRequest,

    // Resource Not Found
    /// Game not found
    GameNotFound,
    /// User not found
    UserNotFound,
    /// Notification not found
    NotificationNotFound,
    /// General not found error
    NotFound,

    // Business Logic Conflicts
    /// Target is already a member of the game
    AlreadyMember,
    /// Friendship already exists
    AlreadyFriends,
    /// Friend request already pending
    AlreadyRequested,
    /// Game is not in the Lobby state
    GameNotLobby,
    /// Game is not Active
    GameNotActive,
    /// Game has no free seats
    GameFull,
    /// Unique email constraint
    UniqueEmail,
    /// Generic conflict (fallback for unmatched conflicts)
    Conflict,

    // System Errors
    /// Database error
    DbError,
    /// Internal server error
    Internal,
    /// Configuration error
    ConfigError,
}

impl ErrorCode {
    /// Returns the canonical SCREAMING_SNAKE_CASE string for this error code.
    ///
    /// This is the exact string that appears in HTTP responses.
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Unauthorized => "UNAUTHORIZED",
            Self::UnauthorizedMissingBearer => "UNAUTHORIZED_MISSING_BEARER",
            Self::UnauthorizedInvalidJwt => "UNAUTHORIZED_INVALID_JWT",
            Self::UnauthorizedExpiredJwt => "UNAUTHORIZED_EXPIRED_JWT",
            Self::Forbidden => "FORBIDDEN",
            Self::NotAMember => "NOT_A_MEMBER",
            Self::NotHost => "NOT_HOST",
            Self::NotFriends => "NOT_FRIENDS",

            Self::InvalidGameId => "INVALID_GAME_ID",
            Self::InvalidEmail => "INVALID_EMAIL",
            Self::InvalidPassword => "INVALID_PASSWORD",
            Self::InvalidMaxPlayers => "INVALID_MAX_PLAYERS",
            Self::ParseCard => "PARSE_CARD",
            Self::ValidationError => "VALIDATION_ERROR",
            Self::BadRequest => "BAD_REQUEST",

            Self::GameNotFound => "GAME_NOT_FOUND",
            Self::UserNotFound => "USER_NOT_FOUND",
            Self::NotificationNotFound => "NOTIFICATION_NOT_FOUND",
            Self::NotFound => "NOT_FOUND",

            Self::AlreadyMember => "ALREADY_MEMBER",
            Self::AlreadyFriends => "ALREADY_FRIENDS",
            Self::AlreadyRequested => "ALREADY_REQUESTED",
            Self::GameNotLobby => "GAME_NOT_LOBBY",
            Self::GameNotActive => "GAME_NOT_ACTIVE",
            Self::GameFull => "GAME_FULL",
            Self::UniqueEmail => "UNIQUE_EMAIL",
            Self::Conflict => "CONFLICT",

            Self::DbError => "DB_ERROR",
            Self::Internal => "INTERNAL",
            Self::ConfigError => "CONFIG_ERROR",
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_code_strings_are_screaming_snake() {
        assert_eq!(ErrorCode::Unauthorized.as_str(), "UNAUTHORIZED");
        assert_eq!(
            ErrorCode::UnauthorizedMissingBearer.as_str(),
            "UNAUTHORIZED_MISSING_BEARER"
        );
        assert_eq!(ErrorCode::NotAMember.as_str(), "NOT_A_MEMBER");
        assert_eq!(ErrorCode::InvalidMaxPlayers.as_str(), "INVALID_MAX_PLAYERS");
        assert_eq!(ErrorCode::GameNotLobby.as_str(), "GAME_NOT_LOBBY");
        assert_eq!(ErrorCode::ParseCard.as_str(), "PARSE_CARD");
        assert_eq!(ErrorCode::UniqueEmail.as_str(), "UNIQUE_EMAIL");
        assert_eq!(ErrorCode::DbError.as_str(), "DB_ERROR");
    }

    #[test]
    fn display_matches_as_str() {
        assert_eq!(format!("{}", ErrorCode::GameFull), "GAME_FULL");
        assert_eq!(format!("{}", ErrorCode::NotHost), "NOT_HOST");
    }
}
