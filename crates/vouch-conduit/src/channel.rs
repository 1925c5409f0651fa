//! Conduit channel: the talk/listen rendezvous
//!
//! Each invitation token owns a `ConduitSlot` holding the current
//! handshake state and at most one pending payload per side. Both
//! primitives run under the slot's lock, so concurrent calls on the same
//! token are serialized while other tokens proceed independently.
//!
//! A completed exchange is called a round. The side whose `listen` finds
//! both payloads consumes them, advances the state and parks its own payload
//! for the peer, which collects it on its next `listen`. The slot also
//! carries an epoch, bumped on every reset, so that a listener from before
//! the reset fails instead of pairing with the restarted peer.

use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;
use vouch_core::{
    ConduitRole, ConduitSide, ConduitState, Invitation, InvitationToken, InviteError, InviteEvent,
    InviteResult, OrganizationId,
};

use crate::lifecycle::InvitationLifecycle;

type SlotKey = (OrganizationId, InvitationToken);

/// Payload parked for the side that did not consume the round
#[derive(Debug)]
struct Undelivered {
    round: u64,
    to: ConduitSide,
    payload: Vec<u8>,
}

/// Relay state for one invitation token
#[derive(Debug)]
struct ConduitSlot {
    state: ConduitState,
    round: u64,
    epoch: u64,
    greeter_payload: Option<Vec<u8>>,
    claimer_payload: Option<Vec<u8>>,
    undelivered: Option<Undelivered>,
}

impl ConduitSlot {
    fn new() -> Self {
        Self {
            state: ConduitState::WaitPeers,
            round: 0,
            epoch: 0,
            greeter_payload: None,
            claimer_payload: None,
            undelivered: None,
        }
    }

    fn pending(&self, side: ConduitSide) -> Option<&Vec<u8>> {
        match side {
            ConduitSide::Greeter => self.greeter_payload.as_ref(),
            ConduitSide::Claimer => self.claimer_payload.as_ref(),
        }
    }

    fn pending_mut(&mut self, side: ConduitSide) -> &mut Option<Vec<u8>> {
        match side {
            ConduitSide::Greeter => &mut self.greeter_payload,
            ConduitSide::Claimer => &mut self.claimer_payload,
        }
    }

    /// Back to `WaitPeers`, dropping everything in flight
    fn reset(&mut self) {
        self.state = ConduitState::WaitPeers;
        self.epoch += 1;
        self.greeter_payload = None;
        self.claimer_payload = None;
        self.undelivered = None;
    }
}

/// Context returned by [`ConduitChannel::talk`], consumed by
/// [`ConduitChannel::listen`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConduitListenCtx {
    /// Organization owning the invitation
    pub organization_id: OrganizationId,
    /// Invitation token
    pub token: InvitationToken,
    /// Caller identity
    pub role: ConduitRole,
    /// State the payload was submitted for
    pub state: ConduitState,
    /// Caller's own payload
    pub payload: Vec<u8>,
    /// Peer payload, if the peer had already talked for this state
    pub peer_payload: Option<Vec<u8>>,
    round: u64,
    epoch: u64,
}

impl ConduitListenCtx {
    /// Side of the conduit the caller writes to
    pub fn side(&self) -> ConduitSide {
        self.role.side()
    }
}

/// Per-token relay between greeter and claimer
pub struct ConduitChannel {
    lifecycle: InvitationLifecycle,
    slots: Mutex<HashMap<SlotKey, Arc<tokio::sync::Mutex<ConduitSlot>>>>,
}

impl ConduitChannel {
    /// Create a channel validating invitations through `lifecycle`
    pub fn new(lifecycle: InvitationLifecycle) -> Self {
        Self {
            lifecycle,
            slots: Mutex::new(HashMap::new()),
        }
    }

    /// Submit this side's payload for `state`
    ///
    /// Talking at `WaitPeers` while the slot is further along resets the
    /// slot: pending payloads are dropped and a `READY` invitation goes back
    /// to `IDLE`. A claimer talking at `WaitPeers` marks the invitation
    /// `READY`. Any other state must equal the slot's current state.
    ///
    /// Resubmitting the same payload for a state is accepted; a different
    /// payload while the previous one is still pending fails `InvalidState`,
    /// except at `WaitPeers` where the new payload replaces the old one.
    pub async fn talk(
        &self,
        organization_id: &OrganizationId,
        token: InvitationToken,
        role: ConduitRole,
        state: ConduitState,
        payload: Vec<u8>,
    ) -> InviteResult<ConduitListenCtx> {
        self.checked_invitation(organization_id, token, &role).await?;
        let cell = self.slot(organization_id, token);
        let mut slot = cell.lock().await;
        // Deletion may have raced the slot creation
        let invitation = self.checked_invitation(organization_id, token, &role).await?;
        let side = role.side();

        if state == ConduitState::WaitPeers {
            if slot.state != ConduitState::WaitPeers {
                tracing::info!(
                    %organization_id,
                    %token,
                    %side,
                    from = %slot.state,
                    "peer restarted the handshake, conduit reset"
                );
                slot.reset();
                self.lifecycle.mark_idle(organization_id, &invitation).await?;
            }
            if side == ConduitSide::Claimer {
                self.lifecycle.mark_ready(organization_id, &invitation).await?;
            }
            *slot.pending_mut(side) = Some(payload.clone());
        } else {
            if slot.state != state {
                tracing::debug!(
                    %organization_id,
                    %token,
                    %side,
                    requested = %state,
                    current = %slot.state,
                    "talk rejected, conduit desync"
                );
                return Err(InviteError::InvalidState);
            }
            match slot.pending(side) {
                Some(pending) if *pending != payload => return Err(InviteError::InvalidState),
                Some(_) => {}
                None => *slot.pending_mut(side) = Some(payload.clone()),
            }
        }

        let ctx = ConduitListenCtx {
            organization_id: organization_id.clone(),
            token,
            role,
            state,
            payload,
            peer_payload: slot.pending(side.peer()).cloned(),
            round: slot.round,
            epoch: slot.epoch,
        };
        drop(slot);

        tracing::trace!(%organization_id, %token, %side, %state, "talk");
        self.publish_updated(organization_id, token);
        Ok(ctx)
    }

    /// Try to collect the peer's payload for the context's state
    ///
    /// Returns `Ok(None)` while the peer has not talked yet. When both
    /// payloads are present they are consumed, the state advances and
    /// the peer's payload is returned.
    pub async fn listen(&self, ctx: &ConduitListenCtx) -> InviteResult<Option<Vec<u8>>> {
        let organization_id = &ctx.organization_id;
        let token = ctx.token;
        let Some(cell) = self.existing_slot(organization_id, token) else {
            self.checked_invitation(organization_id, token, &ctx.role)
                .await?;
            return Err(InviteError::InvalidState);
        };
        let mut slot = cell.lock().await;
        self.checked_invitation(organization_id, token, &ctx.role)
            .await?;

        if slot.epoch != ctx.epoch {
            return Err(InviteError::InvalidState);
        }
        let side = ctx.side();

        if slot.round == ctx.round {
            if slot.state != ctx.state || slot.pending(side).is_none() {
                return Err(InviteError::InvalidState);
            }
            let Some(peer_payload) = slot.pending_mut(side.peer()).take() else {
                return Ok(None);
            };
            let own_payload = slot.pending_mut(side).take().unwrap_or_default();
            slot.undelivered = Some(Undelivered {
                round: ctx.round,
                to: side.peer(),
                payload: own_payload,
            });
            slot.state = slot.state.next();
            slot.round += 1;
            let next = slot.state;
            drop(slot);

            if ctx.state.is_absorbing() {
                tracing::trace!(%organization_id, %token, round = ctx.round, "message relayed");
            } else {
                tracing::debug!(%organization_id, %token, from = %ctx.state, to = %next, "conduit advanced");
            }
            self.publish_updated(organization_id, token);
            return Ok(Some(peer_payload));
        }

        let parked_for_us = matches!(
            &slot.undelivered,
            Some(parked) if parked.round == ctx.round && parked.to == side
        );
        if slot.round == ctx.round + 1 && parked_for_us {
            return Ok(slot.undelivered.take().map(|parked| parked.payload));
        }
        Err(InviteError::InvalidState)
    }

    #[cfg(test)]
    pub(crate) async fn state(
        &self,
        organization_id: &OrganizationId,
        token: InvitationToken,
    ) -> Option<ConduitState> {
        let slot = self.existing_slot(organization_id, token)?;
        let state = slot.lock().await.state;
        Some(state)
    }

    /// Drop the token's slot
    pub fn forget(&self, organization_id: &OrganizationId, token: InvitationToken) {
        if self
            .slots
            .lock()
            .remove(&(organization_id.clone(), token))
            .is_some()
        {
            tracing::debug!(%organization_id, %token, "conduit slot released");
        }
    }

    /// Number of live slots
    pub fn slot_count(&self) -> usize {
        self.slots.lock().len()
    }

    fn slot(
        &self,
        organization_id: &OrganizationId,
        token: InvitationToken,
    ) -> Arc<tokio::sync::Mutex<ConduitSlot>> {
        self.slots
            .lock()
            .entry((organization_id.clone(), token))
            .or_insert_with(|| Arc::new(tokio::sync::Mutex::new(ConduitSlot::new())))
            .clone()
    }

    fn existing_slot(
        &self,
        organization_id: &OrganizationId,
        token: InvitationToken,
    ) -> Option<Arc<tokio::sync::Mutex<ConduitSlot>>> {
        self.slots
            .lock()
            .get(&(organization_id.clone(), token))
            .cloned()
    }

    /// Fetch the invitation behind a conduit call
    ///
    /// A greeter that does not greet the invitation sees `NotFound`. A
    /// deleted invitation releases its slot.
    async fn checked_invitation(
        &self,
        organization_id: &OrganizationId,
        token: InvitationToken,
        role: &ConduitRole,
    ) -> InviteResult<Invitation> {
        let invitation = self.lifecycle.get(organization_id, token).await?;
        if let Some(greeter) = role.greeter() {
            if !invitation.is_greeted_by(greeter) {
                return Err(InviteError::NotFound);
            }
        }
        if invitation.is_deleted() {
            self.forget(organization_id, token);
            return Err(InviteError::AlreadyDeleted);
        }
        Ok(invitation)
    }

    fn publish_updated(&self, organization_id: &OrganizationId, token: InvitationToken) {
        self.lifecycle.bus().publish(InviteEvent::ConduitUpdated {
            organization_id: organization_id.clone(),
            token,
        });
    }
}

impl std::fmt::Debug for ConduitChannel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConduitChannel")
            .field("slots", &self.slot_count())
            .finish()
    }
}
