//! Invitation store contract
//!
//! Persistence is an external collaborator; the conduit only relies on the
//! operations below. Implementations must keep tokens unique per
//! organization and make a created invitation durable before returning it.

pub mod memory;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use vouch_core::{
    Invitation, InvitationDeletedReason, InvitationStatus, InvitationToken, InviteResult,
    NewInvitation, OrganizationId, UserId,
};

/// Invitation record storage
#[async_trait]
pub trait InvitationStore: Send + Sync {
    /// Create an invitation with a fresh token
    ///
    /// Fails with `AlreadyMember` for a user invitation whose claimer e-mail
    /// already belongs to a member. Token collisions are retried internally.
    async fn create(
        &self,
        organization_id: &OrganizationId,
        new: NewInvitation,
    ) -> InviteResult<Invitation>;

    /// Fetch an invitation, including deleted ones
    ///
    /// Fails with `NotFound` if the token is unknown to the organization.
    async fn get(
        &self,
        organization_id: &OrganizationId,
        token: InvitationToken,
    ) -> InviteResult<Invitation>;

    /// Mark an invitation deleted, returning the updated record
    ///
    /// Fails with `NotFound`, or `AlreadyDeleted` without touching the record.
    async fn delete(
        &self,
        organization_id: &OrganizationId,
        token: InvitationToken,
        reason: InvitationDeletedReason,
        on: DateTime<Utc>,
    ) -> InviteResult<Invitation>;

    /// Active invitations greeted by `greeter`, in creation order
    async fn list(
        &self,
        organization_id: &OrganizationId,
        greeter: &UserId,
    ) -> InviteResult<Vec<Invitation>>;

    /// Compare-and-set the status between the non-terminal states
    ///
    /// Returns `Ok(true)` if the status was `from` and is now `to`,
    /// `Ok(false)` if it was something else. Deleted invitations fail with
    /// `AlreadyDeleted`; use [`InvitationStore::delete`] to reach `Deleted`.
    async fn update_status(
        &self,
        organization_id: &OrganizationId,
        token: InvitationToken,
        from: InvitationStatus,
        to: InvitationStatus,
    ) -> InviteResult<bool>;
}
