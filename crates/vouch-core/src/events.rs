//! Notification bus events

use serde::{Deserialize, Serialize};

use crate::identifiers::{InvitationToken, OrganizationId, UserId};
use crate::invitation::InvitationStatus;

/// Event published on the notification bus
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum InviteEvent {
    /// One side of the conduit submitted or consumed a payload
    ConduitUpdated {
        /// Organization owning the invitation
        organization_id: OrganizationId,
        /// Invitation token
        token: InvitationToken,
    },
    /// Invitation status moved (ready, back to idle, or deleted)
    StatusChanged {
        /// Organization owning the invitation
        organization_id: OrganizationId,
        /// Invitation token
        token: InvitationToken,
        /// Member who greets the invitation
        greeter: UserId,
        /// New status
        status: InvitationStatus,
    },
}

impl InviteEvent {
    /// Organization the event belongs to
    pub fn organization_id(&self) -> &OrganizationId {
        match self {
            InviteEvent::ConduitUpdated {
                organization_id, ..
            }
            | InviteEvent::StatusChanged {
                organization_id, ..
            } => organization_id,
        }
    }

    /// Invitation token the event is about
    pub fn token(&self) -> InvitationToken {
        match self {
            InviteEvent::ConduitUpdated { token, .. } | InviteEvent::StatusChanged { token, .. } => {
                *token
            }
        }
    }

    /// Whether the event concerns the given invitation
    pub fn concerns(&self, organization_id: &OrganizationId, token: InvitationToken) -> bool {
        self.token() == token && self.organization_id() == organization_id
    }
}
