//! JWT claims used across the application.

use serde::{Deserialize, Serialize};

/// What a token is good for. Tokens are never interchangeable across
/// purposes; verification pins the expected kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TokenKind {
    Access,
    Refresh,
    VerifyEmail,
    PasswordReset,
}

/// Claims in backend-issued session tokens. `sub` is the numeric user id
/// rendered as a string, per JWT convention.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Claims {
    pub sub: String,
    pub kind: TokenKind,
    /// Issued-at (seconds since epoch)
    pub iat: i64,
    /// Expiry (seconds since epoch)
    pub exp: i64,
}

impl Claims {
    pub fn user_id(&self) -> Option<i64> {
        self.sub.parse().ok()
    }
}
