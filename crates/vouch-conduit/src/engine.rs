//! Conduit exchange engine
//!
//! Turns the non-blocking talk/listen pair into one blocking call per side.
//! The waiter is registered before talking: a peer update or a deletion
//! published between `talk` and the first `wait` stays queued in it.

use std::sync::Arc;
use vouch_core::{ConduitRole, ConduitState, InvitationToken, InviteResult, OrganizationId};
use vouch_effects::NotificationBus;

use crate::channel::ConduitChannel;

/// Drives talk, wait and listen until the peer's payload arrives
#[derive(Debug, Clone)]
pub struct ConduitExchangeEngine {
    channel: Arc<ConduitChannel>,
    bus: NotificationBus,
}

impl ConduitExchangeEngine {
    /// Create an engine over `channel`, woken by `bus`
    pub fn new(channel: Arc<ConduitChannel>, bus: NotificationBus) -> Self {
        Self { channel, bus }
    }

    /// Channel the engine drives
    pub fn channel(&self) -> &Arc<ConduitChannel> {
        &self.channel
    }

    /// Submit `payload` for `state` and return the peer's payload
    ///
    /// Suspends until the peer has talked for the same state. Fails with
    /// `NotFound`, `AlreadyDeleted` or `InvalidState` as soon as the channel
    /// reports them. No timeout is applied; dropping the future releases
    /// the waiter and leaves the relay untouched.
    pub async fn exchange(
        &self,
        organization_id: &OrganizationId,
        role: ConduitRole,
        token: InvitationToken,
        state: ConduitState,
        payload: Vec<u8>,
    ) -> InviteResult<Vec<u8>> {
        let filter_org = organization_id.clone();
        let mut waiter = self
            .bus
            .subscribe(move |event| event.concerns(&filter_org, token));

        let side = role.side();
        let ctx = self
            .channel
            .talk(organization_id, token, role, state, payload)
            .await?;

        let mut wakes = 0u64;
        loop {
            if let Some(peer_payload) = self.channel.listen(&ctx).await? {
                tracing::debug!(
                    %organization_id,
                    %token,
                    %side,
                    %state,
                    wakes,
                    "exchange complete"
                );
                return Ok(peer_payload);
            }
            waiter.wait().await?;
            waiter.clear();
            wakes = wakes.saturating_add(1);
        }
    }
}
