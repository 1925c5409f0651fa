//! Invitation lifecycle
//!
//! Wraps the store so that every status transition is published on the
//! notification bus before the call returns. Waiters filtered on the token
//! therefore observe deletions and resets without polling.

use chrono::{DateTime, Utc};
use std::sync::Arc;
use vouch_core::{
    Invitation, InvitationDeletedReason, InvitationStatus, InvitationToken, InviteEvent,
    InviteResult, NewInvitation, OrganizationId, UserId,
};
use vouch_effects::{InvitationStore, NotificationBus};

/// Store access with status-change notifications
#[derive(Clone)]
pub struct InvitationLifecycle {
    store: Arc<dyn InvitationStore>,
    bus: NotificationBus,
}

impl InvitationLifecycle {
    /// Create a lifecycle over `store`, publishing on `bus`
    pub fn new(store: Arc<dyn InvitationStore>, bus: NotificationBus) -> Self {
        Self { store, bus }
    }

    /// Bus status changes are published on
    pub fn bus(&self) -> &NotificationBus {
        &self.bus
    }

    /// Create an invitation in `IDLE` status
    pub async fn create(
        &self,
        organization_id: &OrganizationId,
        new: NewInvitation,
    ) -> InviteResult<Invitation> {
        let invitation = self.store.create(organization_id, new).await?;
        tracing::info!(
            %organization_id,
            token = %invitation.token,
            greeter = %invitation.greeter_user_id,
            kind = ?invitation.invitation_type(),
            "invitation created"
        );
        Ok(invitation)
    }

    /// Fetch an invitation, deleted ones included
    pub async fn get(
        &self,
        organization_id: &OrganizationId,
        token: InvitationToken,
    ) -> InviteResult<Invitation> {
        self.store.get(organization_id, token).await
    }

    /// Active invitations greeted by `greeter`, in creation order
    pub async fn list(
        &self,
        organization_id: &OrganizationId,
        greeter: &UserId,
    ) -> InviteResult<Vec<Invitation>> {
        self.store.list(organization_id, greeter).await
    }

    /// Delete an invitation and wake everyone waiting on it
    pub async fn delete(
        &self,
        organization_id: &OrganizationId,
        token: InvitationToken,
        reason: InvitationDeletedReason,
        on: DateTime<Utc>,
    ) -> InviteResult<Invitation> {
        let invitation = self.store.delete(organization_id, token, reason, on).await?;
        tracing::info!(%organization_id, %token, ?reason, "invitation deleted");
        self.publish_status(organization_id, &invitation, InvitationStatus::Deleted);
        Ok(invitation)
    }

    /// Move `IDLE` to `READY`; returns whether the status changed
    pub async fn mark_ready(
        &self,
        organization_id: &OrganizationId,
        invitation: &Invitation,
    ) -> InviteResult<bool> {
        self.transition(
            organization_id,
            invitation,
            InvitationStatus::Idle,
            InvitationStatus::Ready,
        )
        .await
    }

    /// Move `READY` back to `IDLE`; returns whether the status changed
    pub async fn mark_idle(
        &self,
        organization_id: &OrganizationId,
        invitation: &Invitation,
    ) -> InviteResult<bool> {
        self.transition(
            organization_id,
            invitation,
            InvitationStatus::Ready,
            InvitationStatus::Idle,
        )
        .await
    }

    async fn transition(
        &self,
        organization_id: &OrganizationId,
        invitation: &Invitation,
        from: InvitationStatus,
        to: InvitationStatus,
    ) -> InviteResult<bool> {
        let changed = self
            .store
            .update_status(organization_id, invitation.token, from, to)
            .await?;
        if changed {
            tracing::debug!(
                %organization_id,
                token = %invitation.token,
                ?from,
                ?to,
                "invitation status changed"
            );
            self.publish_status(organization_id, invitation, to);
        }
        Ok(changed)
    }

    fn publish_status(
        &self,
        organization_id: &OrganizationId,
        invitation: &Invitation,
        status: InvitationStatus,
    ) {
        self.bus.publish(InviteEvent::StatusChanged {
            organization_id: organization_id.clone(),
            token: invitation.token,
            greeter: invitation.greeter_user_id.clone(),
            status,
        });
    }
}

impl std::fmt::Debug for InvitationLifecycle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InvitationLifecycle")
            .field("bus", &self.bus)
            .finish_non_exhaustive()
    }
}
