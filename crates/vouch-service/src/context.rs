//! Per-connection caller contexts

use vouch_core::{HumanHandle, Invitation, InvitationToken, OrganizationId, UserId, UserProfile};

/// Authenticated member issuing greeter commands
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GreeterContext {
    /// Organization the member belongs to
    pub organization_id: OrganizationId,
    /// Member identity
    pub user_id: UserId,
    /// Member profile
    pub profile: UserProfile,
    /// Human handle, if the member has one
    pub human_handle: Option<HumanHandle>,
}

impl GreeterContext {
    /// Context for a member without a human handle
    pub fn new(organization_id: OrganizationId, user_id: UserId, profile: UserProfile) -> Self {
        Self {
            organization_id,
            user_id,
            profile,
            human_handle: None,
        }
    }

    /// Attach a human handle
    pub fn with_human_handle(mut self, human_handle: HumanHandle) -> Self {
        self.human_handle = Some(human_handle);
        self
    }
}

/// Anonymous claimer connection, bound to one invitation
///
/// Holds the invitation as it was when the connection was accepted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClaimerContext {
    /// Organization owning the invitation
    pub organization_id: OrganizationId,
    /// Invitation fetched at connection time
    pub invitation: Invitation,
}

impl ClaimerContext {
    /// Token the claimer holds
    pub fn token(&self) -> InvitationToken {
        self.invitation.token
    }
}
