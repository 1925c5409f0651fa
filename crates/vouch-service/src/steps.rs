//! Handshake step commands
//!
//! One command per protocol step and side. Some commands span two conduit
//! states so that a side never has to wait for an empty acknowledgement:
//!
//! | Greeter                    | Claimer                     | States                    |
//! |----------------------------|-----------------------------|---------------------------|
//! | `greeter_wait_peer`        | `claimer_wait_peer`         | `WaitPeers`               |
//! | `greeter_get_hashed_nonce` | `claimer_send_hashed_nonce` | `ClaimerHashedNonce`      |
//! | `greeter_send_nonce`       | (same command, 2nd half)    | `GreeterNonce`            |
//! | (same command, 2nd half)   | `claimer_send_nonce`        | `ClaimerNonce`            |
//! | `greeter_wait_peer_trust`  | `claimer_signify_trust`     | `ClaimerTrust`            |
//! | `greeter_signify_trust`    | `claimer_wait_peer_trust`   | `GreeterTrust`            |
//! | `greeter_communicate`      | `claimer_communicate`       | `Communicate` (repeats)   |

use vouch_core::{ConduitRole, ConduitState, InvitationToken, InviteResult, OrganizationId};

use crate::context::{ClaimerContext, GreeterContext};
use crate::reply::{ClaimerOutcome, GreeterReply};
use crate::service::InviteService;

impl InviteService {
    // -------------------------------------------------------------------------
    // Greeter side
    // -------------------------------------------------------------------------

    /// Swap public keys; returns the claimer's
    pub async fn greeter_wait_peer(
        &self,
        ctx: &GreeterContext,
        token: InvitationToken,
        greeter_public_key: Vec<u8>,
    ) -> InviteResult<GreeterReply<Vec<u8>>> {
        let result = self
            .greeter_exchange(ctx, token, ConduitState::WaitPeers, greeter_public_key)
            .await;
        GreeterReply::from_result(result)
    }

    /// Collect the claimer's hashed nonce
    pub async fn greeter_get_hashed_nonce(
        &self,
        ctx: &GreeterContext,
        token: InvitationToken,
    ) -> InviteResult<GreeterReply<Vec<u8>>> {
        let result = self
            .greeter_exchange(ctx, token, ConduitState::ClaimerHashedNonce, Vec::new())
            .await;
        GreeterReply::from_result(result)
    }

    /// Reveal the greeter nonce; returns the claimer's nonce
    pub async fn greeter_send_nonce(
        &self,
        ctx: &GreeterContext,
        token: InvitationToken,
        greeter_nonce: Vec<u8>,
    ) -> InviteResult<GreeterReply<Vec<u8>>> {
        let result = self
            .exchange_pair(
                &ctx.organization_id,
                ConduitRole::Greeter(ctx.user_id.clone()),
                token,
                (ConduitState::GreeterNonce, greeter_nonce),
                ConduitState::ClaimerNonce,
            )
            .await;
        GreeterReply::from_result(result)
    }

    /// Wait for the claimer to confirm the greeter's SAS
    pub async fn greeter_wait_peer_trust(
        &self,
        ctx: &GreeterContext,
        token: InvitationToken,
    ) -> InviteResult<GreeterReply<()>> {
        let result = self
            .greeter_exchange(ctx, token, ConduitState::ClaimerTrust, Vec::new())
            .await
            .map(drop);
        GreeterReply::from_result(result)
    }

    /// Confirm the claimer's SAS
    pub async fn greeter_signify_trust(
        &self,
        ctx: &GreeterContext,
        token: InvitationToken,
    ) -> InviteResult<GreeterReply<()>> {
        let result = self
            .greeter_exchange(ctx, token, ConduitState::GreeterTrust, Vec::new())
            .await
            .map(drop);
        GreeterReply::from_result(result)
    }

    /// Exchange one opaque message
    pub async fn greeter_communicate(
        &self,
        ctx: &GreeterContext,
        token: InvitationToken,
        payload: Vec<u8>,
    ) -> InviteResult<GreeterReply<Vec<u8>>> {
        let result = self
            .greeter_exchange(ctx, token, ConduitState::Communicate, payload)
            .await;
        GreeterReply::from_result(result)
    }

    // -------------------------------------------------------------------------
    // Claimer side
    // -------------------------------------------------------------------------

    /// Swap public keys; returns the greeter's
    pub async fn claimer_wait_peer(
        &self,
        ctx: &ClaimerContext,
        claimer_public_key: Vec<u8>,
    ) -> InviteResult<ClaimerOutcome<Vec<u8>>> {
        let result = self
            .claimer_exchange(ctx, ConduitState::WaitPeers, claimer_public_key)
            .await;
        self.claimer_outcome(ctx, result)
    }

    /// Commit to the claimer nonce; returns the greeter's nonce
    pub async fn claimer_send_hashed_nonce(
        &self,
        ctx: &ClaimerContext,
        claimer_hashed_nonce: Vec<u8>,
    ) -> InviteResult<ClaimerOutcome<Vec<u8>>> {
        let result = self
            .exchange_pair(
                &ctx.organization_id,
                ConduitRole::Claimer,
                ctx.token(),
                (ConduitState::ClaimerHashedNonce, claimer_hashed_nonce),
                ConduitState::GreeterNonce,
            )
            .await;
        self.claimer_outcome(ctx, result)
    }

    /// Reveal the claimer nonce
    pub async fn claimer_send_nonce(
        &self,
        ctx: &ClaimerContext,
        claimer_nonce: Vec<u8>,
    ) -> InviteResult<ClaimerOutcome<()>> {
        let result = self
            .claimer_exchange(ctx, ConduitState::ClaimerNonce, claimer_nonce)
            .await
            .map(drop);
        self.claimer_outcome(ctx, result)
    }

    /// Confirm the greeter's SAS
    pub async fn claimer_signify_trust(
        &self,
        ctx: &ClaimerContext,
    ) -> InviteResult<ClaimerOutcome<()>> {
        let result = self
            .claimer_exchange(ctx, ConduitState::ClaimerTrust, Vec::new())
            .await
            .map(drop);
        self.claimer_outcome(ctx, result)
    }

    /// Wait for the greeter to confirm the claimer's SAS
    pub async fn claimer_wait_peer_trust(
        &self,
        ctx: &ClaimerContext,
    ) -> InviteResult<ClaimerOutcome<()>> {
        let result = self
            .claimer_exchange(ctx, ConduitState::GreeterTrust, Vec::new())
            .await
            .map(drop);
        self.claimer_outcome(ctx, result)
    }

    /// Exchange one opaque message
    pub async fn claimer_communicate(
        &self,
        ctx: &ClaimerContext,
        payload: Vec<u8>,
    ) -> InviteResult<ClaimerOutcome<Vec<u8>>> {
        let result = self
            .claimer_exchange(ctx, ConduitState::Communicate, payload)
            .await;
        self.claimer_outcome(ctx, result)
    }

    // -------------------------------------------------------------------------
    // Helpers
    // -------------------------------------------------------------------------

    async fn greeter_exchange(
        &self,
        ctx: &GreeterContext,
        token: InvitationToken,
        state: ConduitState,
        payload: Vec<u8>,
    ) -> InviteResult<Vec<u8>> {
        self.engine
            .exchange(
                &ctx.organization_id,
                ConduitRole::Greeter(ctx.user_id.clone()),
                token,
                state,
                payload,
            )
            .await
    }

    async fn claimer_exchange(
        &self,
        ctx: &ClaimerContext,
        state: ConduitState,
        payload: Vec<u8>,
    ) -> InviteResult<Vec<u8>> {
        self.engine
            .exchange(
                &ctx.organization_id,
                ConduitRole::Claimer,
                ctx.token(),
                state,
                payload,
            )
            .await
    }

    /// Talk at `first`, then acknowledge `second` with an empty payload
    async fn exchange_pair(
        &self,
        organization_id: &OrganizationId,
        role: ConduitRole,
        token: InvitationToken,
        first: (ConduitState, Vec<u8>),
        second: ConduitState,
    ) -> InviteResult<Vec<u8>> {
        let (state, payload) = first;
        self.engine
            .exchange(organization_id, role.clone(), token, state, payload)
            .await?;
        self.engine
            .exchange(organization_id, role, token, second, Vec::new())
            .await
    }

    fn claimer_outcome<T>(
        &self,
        ctx: &ClaimerContext,
        result: InviteResult<T>,
    ) -> InviteResult<ClaimerOutcome<T>> {
        let outcome = ClaimerOutcome::from_result(result)?;
        if outcome.is_close() {
            tracing::info!(
                organization_id = %ctx.organization_id,
                token = %ctx.token(),
                "invitation gone, closing claimer connection"
            );
        }
        Ok(outcome)
    }
}
