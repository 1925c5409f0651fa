//! Error taxonomy for invitation and conduit operations
//!
//! One error type covers the store, the channel and the engine. E-mail
//! delivery failures are listed here too because they surface from the
//! creation path, but they never undo an invitation.
//!
//! "Close this connection" is not listed: transports receive it as
//! `ClaimerOutcome::CloseConnection` from `vouch-service`.

use serde::{Deserialize, Serialize};

/// Errors raised by invitation and conduit operations
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, thiserror::Error)]
pub enum InviteError {
    /// Token unknown in this organization (or not greeted by the caller)
    #[error("Invitation not found")]
    NotFound,

    /// Operation targets an invitation that has been deleted
    #[error("Invitation already deleted")]
    AlreadyDeleted,

    /// Requested conduit state does not match the relay's recorded state
    #[error("Invalid conduit state")]
    InvalidState,

    /// User invitation requested for an e-mail already bound to a member
    #[error("Claimer e-mail already belongs to a member")]
    AlreadyMember,

    /// Mail server refused the recipient
    #[error("E-mail recipient refused")]
    EmailRecipient,

    /// Mail delivery is misconfigured or unavailable
    #[error("E-mail delivery not available: {message}")]
    EmailConfig {
        /// Error message describing the delivery failure
        message: String,
    },

    /// Backing store failed
    #[error("Storage error: {message}")]
    Storage {
        /// Error message describing the storage failure
        message: String,
    },

    /// Internal system error
    #[error("Internal error: {message}")]
    Internal {
        /// Error message describing the internal error
        message: String,
    },
}

impl InviteError {
    /// Create an e-mail configuration error
    pub fn email_config(message: impl Into<String>) -> Self {
        Self::EmailConfig {
            message: message.into(),
        }
    }

    /// Create a storage error
    pub fn storage(message: impl Into<String>) -> Self {
        Self::Storage {
            message: message.into(),
        }
    }

    /// Create an internal error
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    /// True for the conduit-level failures a peer can trigger
    pub fn is_protocol(&self) -> bool {
        matches!(
            self,
            Self::NotFound | Self::AlreadyDeleted | Self::InvalidState
        )
    }

    /// True if the invitation is gone, from the caller's point of view
    pub fn is_gone(&self) -> bool {
        matches!(self, Self::NotFound | Self::AlreadyDeleted)
    }
}

/// Standard Result type for invitation operations
pub type InviteResult<T> = std::result::Result<T, InviteError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn protocol_errors_are_classified() {
        assert!(InviteError::InvalidState.is_protocol());
        assert!(InviteError::AlreadyDeleted.is_gone());
        assert!(!InviteError::InvalidState.is_gone());
        assert!(!InviteError::storage("disk full").is_protocol());
    }

    #[test]
    fn messages_carry_context() {
        let err = InviteError::email_config("no smtp host");
        assert_eq!(err.to_string(), "E-mail delivery not available: no smtp host");
    }
}
