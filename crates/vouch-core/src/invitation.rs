//! Invitation model
//!
//! An invitation is created by a greeter and claimed by whoever holds its
//! token. Status moves `Idle -> Ready` when a claimer starts the handshake,
//! back to `Idle` when the conduit is reset, and to `Deleted` exactly once.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::identifiers::{HumanHandle, InvitationToken, UserId};

// =============================================================================
// Status
// =============================================================================

/// Invitation status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum InvitationStatus {
    /// No claimer is currently running the handshake
    Idle,
    /// A claimer has joined and is mid-handshake
    Ready,
    /// Terminal: the token is permanently invalid
    Deleted,
}

impl InvitationStatus {
    /// Whether the invitation can still be claimed
    pub fn is_active(&self) -> bool {
        !matches!(self, InvitationStatus::Deleted)
    }
}

/// Why an invitation was deleted
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum InvitationDeletedReason {
    /// The claimer completed enrollment
    Finished,
    /// The greeter cancelled the invitation
    Cancelled,
    /// Replaced by a fresh invitation
    Rotated,
}

// =============================================================================
// Invitation Types
// =============================================================================

/// Discriminant-only view of the invitation kind
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum InvitationType {
    /// Onboard a new member
    User,
    /// Onboard a new device for the greeter
    Device,
}

/// Kind-specific invitation data
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum InvitationKind {
    /// Invitation for a new member
    User {
        /// Address the invitation was issued for
        claimer_email: String,
    },
    /// Invitation for a new device of the greeter
    Device,
}

impl InvitationKind {
    /// Get the invitation type
    pub fn invitation_type(&self) -> InvitationType {
        match self {
            InvitationKind::User { .. } => InvitationType::User,
            InvitationKind::Device => InvitationType::Device,
        }
    }
}

/// Invitation record
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Invitation {
    /// Token, unique within the organization
    pub token: InvitationToken,
    /// Member who created the invitation
    pub greeter_user_id: UserId,
    /// Greeter's human handle, if any
    pub greeter_human_handle: Option<HumanHandle>,
    /// Kind-specific data
    pub kind: InvitationKind,
    /// Creation timestamp
    pub created_on: DateTime<Utc>,
    /// Current status
    pub status: InvitationStatus,
    /// Deletion timestamp and reason, set once status is `Deleted`
    pub deleted: Option<(DateTime<Utc>, InvitationDeletedReason)>,
}

impl Invitation {
    /// Build a fresh `Idle` invitation from creation parameters
    pub fn from_new(token: InvitationToken, new: NewInvitation) -> Self {
        Self {
            token,
            greeter_user_id: new.greeter_user_id,
            greeter_human_handle: new.greeter_human_handle,
            kind: new.kind,
            created_on: new.created_on,
            status: InvitationStatus::Idle,
            deleted: None,
        }
    }

    /// Get the invitation type
    pub fn invitation_type(&self) -> InvitationType {
        self.kind.invitation_type()
    }

    /// Claimer e-mail for user invitations
    pub fn claimer_email(&self) -> Option<&str> {
        match &self.kind {
            InvitationKind::User { claimer_email } => Some(claimer_email),
            InvitationKind::Device => None,
        }
    }

    /// Check if the invitation has been deleted
    pub fn is_deleted(&self) -> bool {
        !self.status.is_active()
    }

    /// Check whether `user` greeted this invitation
    pub fn is_greeted_by(&self, user: &UserId) -> bool {
        &self.greeter_user_id == user
    }
}

/// Parameters for creating an invitation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewInvitation {
    /// Member creating the invitation
    pub greeter_user_id: UserId,
    /// Greeter's human handle, if any
    pub greeter_human_handle: Option<HumanHandle>,
    /// Kind-specific data
    pub kind: InvitationKind,
    /// Creation timestamp
    pub created_on: DateTime<Utc>,
}

impl NewInvitation {
    /// Parameters for a user invitation
    pub fn user(
        greeter_user_id: UserId,
        greeter_human_handle: Option<HumanHandle>,
        claimer_email: impl Into<String>,
        created_on: DateTime<Utc>,
    ) -> Self {
        Self {
            greeter_user_id,
            greeter_human_handle,
            kind: InvitationKind::User {
                claimer_email: claimer_email.into(),
            },
            created_on,
        }
    }

    /// Parameters for a device invitation
    pub fn device(
        greeter_user_id: UserId,
        greeter_human_handle: Option<HumanHandle>,
        created_on: DateTime<Utc>,
    ) -> Self {
        Self {
            greeter_user_id,
            greeter_human_handle,
            kind: InvitationKind::Device,
            created_on,
        }
    }
}

/// Greeter profile within the organization
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum UserProfile {
    /// May invite new members
    Admin,
    /// Regular member
    Standard,
    /// Read-only member
    Outsider,
}
