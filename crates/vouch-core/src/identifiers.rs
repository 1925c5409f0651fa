//! Identifier newtypes.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use crate::errors::InviteError;

/// Organization identifier
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct OrganizationId(String);

impl OrganizationId {
    /// Create an organization identifier
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Borrow the raw identifier
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for OrganizationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Member identifier within an organization
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct UserId(String);

impl UserId {
    /// Create a user identifier
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Borrow the raw identifier
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// One-time invitation token
///
/// Unique per organization. Rendered as 32 lowercase hex characters, which
/// is the form carried in invitation URLs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct InvitationToken(Uuid);

impl InvitationToken {
    /// Generate a fresh random token
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Wrap an existing UUID
    pub fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    /// Hex form without dashes
    pub fn hex(&self) -> String {
        self.0.simple().to_string()
    }
}

impl Default for InvitationToken {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for InvitationToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.simple())
    }
}

impl FromStr for InvitationToken {
    type Err = InviteError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Uuid::parse_str(s)
            .map(Self)
            .map_err(|e| InviteError::internal(format!("invalid invitation token {s:?}: {e}")))
    }
}

/// Human-readable identity attached to a member
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct HumanHandle {
    /// Contact e-mail address
    pub email: String,
    /// Display name
    pub label: String,
}

impl HumanHandle {
    /// Create a human handle
    pub fn new(email: impl Into<String>, label: impl Into<String>) -> Self {
        Self {
            email: email.into(),
            label: label.into(),
        }
    }
}

impl fmt::Display for HumanHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} <{}>", self.label, self.email)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn token_hex_round_trips_through_from_str() {
        let token = InvitationToken::new();
        let parsed: InvitationToken = token.hex().parse().unwrap();
        assert_eq!(parsed, token);
        assert_eq!(token.to_string().len(), 32);
    }

    #[test]
    fn garbage_token_is_rejected() {
        assert!("not-a-token".parse::<InvitationToken>().is_err());
    }

    #[test]
    fn human_handle_display() {
        let handle = HumanHandle::new("alice@example.com", "Alice");
        assert_eq!(handle.to_string(), "Alice <alice@example.com>");
    }
}
