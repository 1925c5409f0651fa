//! Invite Service
//!
//! Entry point for the transport layer. Owns one instance of every
//! collaborator: the lifecycle over the store, the conduit channel and its
//! exchange engine, the e-mail sender and the ready claimer index.
//!
//! Handshake step commands live in [`crate::steps`].

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use vouch_conduit::{ConduitChannel, ConduitExchangeEngine, InvitationLifecycle, ReadyClaimerIndex};
use vouch_core::{
    HumanHandle, Invitation, InvitationDeletedReason, InvitationKind, InvitationStatus,
    InvitationToken, InviteError, InviteResult, NewInvitation, OrganizationId, UserId, UserProfile,
    VouchConfig,
};
use vouch_effects::{
    invitation_url, EmailError, EmailSender, InvitationEmail, InvitationEmailParams,
    InvitationStore, MemberDirectory, MemoryInvitationStore, MockedEmailSender, NotificationBus,
};

use crate::context::{ClaimerContext, GreeterContext};
use crate::reply::{ClaimerOutcome, GreeterReply};

// =============================================================================
// Requests and replies
// =============================================================================

/// What a greeter asks to create
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum InviteNewRequest {
    /// Invite a new user
    User {
        /// Address the invitation is for
        claimer_email: String,
        /// Whether to e-mail the claimer
        send_email: bool,
    },
    /// Invite a new device for the greeter
    Device {
        /// Whether to e-mail the greeter
        send_email: bool,
    },
}

/// Whether the invitation e-mail went out
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum InvitationEmailSentStatus {
    /// Sent, or no e-mail was requested
    Success,
    /// Delivery is not configured or failed
    NotAvailable,
    /// Recipient refused
    BadRecipient,
}

/// Reply to [`InviteService::invite_new`]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum InviteNewReply {
    /// Invitation created
    Ok {
        /// Token to hand to the claimer
        token: InvitationToken,
        /// Outcome of the e-mail step
        email_sent: InvitationEmailSentStatus,
    },
    /// Only admins invite users
    NotAllowed,
    /// Device invitation e-mail requested without a human handle
    NotAvailable,
    /// Claimer e-mail already belongs to a member
    AlreadyMember,
}

/// Entry of [`InviteService::invite_list`]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum InviteListItem {
    /// User invitation
    User {
        /// Invitation token
        token: InvitationToken,
        /// Creation time
        created_on: DateTime<Utc>,
        /// Invited address
        claimer_email: String,
        /// Stored status
        status: InvitationStatus,
        /// A claimer appeared mid-handshake on this instance (advisory)
        claimer_ready: bool,
    },
    /// Device invitation
    Device {
        /// Invitation token
        token: InvitationToken,
        /// Creation time
        created_on: DateTime<Utc>,
        /// Stored status
        status: InvitationStatus,
        /// A claimer appeared mid-handshake on this instance (advisory)
        claimer_ready: bool,
    },
}

impl InviteListItem {
    /// Invitation token
    pub fn token(&self) -> InvitationToken {
        match self {
            InviteListItem::User { token, .. } | InviteListItem::Device { token, .. } => *token,
        }
    }

    /// Advisory readiness flag
    pub fn claimer_ready(&self) -> bool {
        match self {
            InviteListItem::User { claimer_ready, .. }
            | InviteListItem::Device { claimer_ready, .. } => *claimer_ready,
        }
    }
}

/// Public invitation metadata shown to a claimer
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum InviteInfo {
    /// User invitation
    User {
        /// Invited address
        claimer_email: String,
        /// Greeting member
        greeter_user_id: UserId,
        /// Greeting member's human handle
        greeter_human_handle: Option<HumanHandle>,
    },
    /// Device invitation
    Device {
        /// Greeting member
        greeter_user_id: UserId,
        /// Greeting member's human handle
        greeter_human_handle: Option<HumanHandle>,
    },
}

// =============================================================================
// Service
// =============================================================================

/// Invitation and conduit commands for greeters and claimers
pub struct InviteService {
    config: VouchConfig,
    lifecycle: InvitationLifecycle,
    channel: Arc<ConduitChannel>,
    pub(crate) engine: ConduitExchangeEngine,
    email: Arc<dyn EmailSender>,
    ready: Arc<ReadyClaimerIndex>,
}

impl InviteService {
    /// Wire a service over `store` and `email`
    ///
    /// Starts the ready claimer feed, so this must run inside a Tokio
    /// runtime.
    pub fn new(
        config: VouchConfig,
        store: Arc<dyn InvitationStore>,
        email: Arc<dyn EmailSender>,
    ) -> Self {
        let bus = NotificationBus::new();
        let (ready, _feed) = ReadyClaimerIndex::spawn(&bus);
        let lifecycle = InvitationLifecycle::new(store, bus.clone());
        let channel = Arc::new(ConduitChannel::new(lifecycle.clone()));
        let engine = ConduitExchangeEngine::new(Arc::clone(&channel), bus);
        Self {
            config,
            lifecycle,
            channel,
            engine,
            email,
            ready,
        }
    }

    /// Service over the in-memory store with mocked e-mail delivery
    pub fn in_memory(config: VouchConfig, members: Arc<dyn MemberDirectory>) -> Self {
        let store = MemoryInvitationStore::new(members)
            .with_collision_retries(config.invitations.token_collision_retries);
        let email = MockedEmailSender::new(config.email.outbox_dir.clone());
        Self::new(config, Arc::new(store), Arc::new(email))
    }

    /// Active configuration
    pub fn config(&self) -> &VouchConfig {
        &self.config
    }

    /// Advisory ready claimer index
    pub fn ready_claimers(&self) -> &Arc<ReadyClaimerIndex> {
        &self.ready
    }

    // -------------------------------------------------------------------------
    // Greeter commands
    // -------------------------------------------------------------------------

    /// Create an invitation, optionally e-mailing it
    ///
    /// E-mail failures only downgrade `email_sent`; the invitation stays.
    pub async fn invite_new(
        &self,
        ctx: &GreeterContext,
        request: InviteNewRequest,
    ) -> InviteResult<InviteNewReply> {
        let now = Utc::now();
        let (new, send_email) = match request {
            InviteNewRequest::User {
                claimer_email,
                send_email,
            } => {
                if ctx.profile != UserProfile::Admin {
                    return Ok(InviteNewReply::NotAllowed);
                }
                let new = NewInvitation::user(
                    ctx.user_id.clone(),
                    ctx.human_handle.clone(),
                    claimer_email,
                    now,
                );
                (new, send_email)
            }
            InviteNewRequest::Device { send_email } => {
                if send_email && ctx.human_handle.is_none() {
                    return Ok(InviteNewReply::NotAvailable);
                }
                let new =
                    NewInvitation::device(ctx.user_id.clone(), ctx.human_handle.clone(), now);
                (new, send_email)
            }
        };

        let invitation = match self.lifecycle.create(&ctx.organization_id, new).await {
            Ok(invitation) => invitation,
            Err(InviteError::AlreadyMember) => return Ok(InviteNewReply::AlreadyMember),
            Err(err) => return Err(err),
        };

        let email_sent = if send_email {
            self.send_invitation_email(ctx, &invitation).await
        } else {
            InvitationEmailSentStatus::Success
        };
        Ok(InviteNewReply::Ok {
            token: invitation.token,
            email_sent,
        })
    }

    async fn send_invitation_email(
        &self,
        ctx: &GreeterContext,
        invitation: &Invitation,
    ) -> InvitationEmailSentStatus {
        let Some(server_url) = self.config.server_url.as_deref() else {
            tracing::debug!(token = %invitation.token, "no server url configured, e-mail skipped");
            return InvitationEmailSentStatus::NotAvailable;
        };

        let (to_addr, greeter_name, reply_to) = match &invitation.kind {
            InvitationKind::User { claimer_email } => match &ctx.human_handle {
                Some(handle) => (
                    claimer_email.clone(),
                    Some(handle.label.clone()),
                    Some(handle.email.clone()),
                ),
                None => (claimer_email.clone(), Some(ctx.user_id.to_string()), None),
            },
            InvitationKind::Device => match &ctx.human_handle {
                Some(handle) => (handle.email.clone(), None, None),
                None => return InvitationEmailSentStatus::NotAvailable,
            },
        };

        let email = InvitationEmail::render(InvitationEmailParams {
            product_name: self.config.email.product_name.clone(),
            from_addr: self.config.email.sender.clone(),
            to_addr,
            reply_to,
            greeter_name,
            organization_id: ctx.organization_id.clone(),
            invitation_url: invitation_url(
                server_url,
                &ctx.organization_id,
                invitation.invitation_type(),
                invitation.token,
            ),
            server_url: server_url.to_string(),
        });

        match self.email.send(&email).await {
            Ok(()) => InvitationEmailSentStatus::Success,
            Err(EmailError::Recipient(reason)) => {
                tracing::warn!(token = %invitation.token, %reason, "invitation e-mail refused");
                InvitationEmailSentStatus::BadRecipient
            }
            Err(EmailError::Config(reason)) => {
                tracing::warn!(token = %invitation.token, %reason, "invitation e-mail not sent");
                InvitationEmailSentStatus::NotAvailable
            }
        }
    }

    /// Delete one of the caller's invitations
    ///
    /// Claimers waiting on the token are woken and told to disconnect.
    pub async fn invite_delete(
        &self,
        ctx: &GreeterContext,
        token: InvitationToken,
        reason: InvitationDeletedReason,
    ) -> InviteResult<GreeterReply<()>> {
        GreeterReply::from_result(self.delete_owned(ctx, token, reason).await)
    }

    async fn delete_owned(
        &self,
        ctx: &GreeterContext,
        token: InvitationToken,
        reason: InvitationDeletedReason,
    ) -> InviteResult<()> {
        let org = &ctx.organization_id;
        let invitation = self.lifecycle.get(org, token).await?;
        if !invitation.is_greeted_by(&ctx.user_id) {
            return Err(InviteError::NotFound);
        }
        self.lifecycle.delete(org, token, reason, Utc::now()).await?;
        self.channel.forget(org, token);
        Ok(())
    }

    /// The caller's active invitations, oldest first
    pub async fn invite_list(&self, ctx: &GreeterContext) -> InviteResult<Vec<InviteListItem>> {
        let org = &ctx.organization_id;
        let invitations = self.lifecycle.list(org, &ctx.user_id).await?;
        Ok(invitations
            .into_iter()
            .map(|invitation| {
                let claimer_ready = self.ready.is_ready(org, invitation.token);
                match invitation.kind {
                    InvitationKind::User { claimer_email } => InviteListItem::User {
                        token: invitation.token,
                        created_on: invitation.created_on,
                        claimer_email,
                        status: invitation.status,
                        claimer_ready,
                    },
                    InvitationKind::Device => InviteListItem::Device {
                        token: invitation.token,
                        created_on: invitation.created_on,
                        status: invitation.status,
                        claimer_ready,
                    },
                }
            })
            .collect())
    }

    // -------------------------------------------------------------------------
    // Claimer connection
    // -------------------------------------------------------------------------

    /// Accept an anonymous connection presenting `token`
    pub async fn claimer_connect(
        &self,
        organization_id: &OrganizationId,
        token: InvitationToken,
    ) -> InviteResult<ClaimerOutcome<ClaimerContext>> {
        let result = match self.lifecycle.get(organization_id, token).await {
            Ok(invitation) if invitation.is_deleted() => Err(InviteError::AlreadyDeleted),
            Ok(invitation) => Ok(ClaimerContext {
                organization_id: organization_id.clone(),
                invitation,
            }),
            Err(err) => Err(err),
        };
        if let Err(err) = &result {
            tracing::info!(%organization_id, %token, %err, "claimer connection refused");
        }
        ClaimerOutcome::from_result(result)
    }

    /// Release a claimer connection
    ///
    /// A `READY` invitation goes back to `IDLE`. An invitation that vanished
    /// meanwhile is not an error.
    pub async fn claimer_disconnect(&self, ctx: &ClaimerContext) -> InviteResult<()> {
        let organization_id = &ctx.organization_id;
        match self
            .lifecycle
            .mark_idle(organization_id, &ctx.invitation)
            .await
        {
            Ok(_) => Ok(()),
            Err(err) if err.is_gone() => Ok(()),
            Err(err) => Err(err),
        }
    }

    /// Invitation metadata, from the connection context only
    pub fn invite_info(&self, ctx: &ClaimerContext) -> InviteInfo {
        let invitation = &ctx.invitation;
        match &invitation.kind {
            InvitationKind::User { claimer_email } => InviteInfo::User {
                claimer_email: claimer_email.clone(),
                greeter_user_id: invitation.greeter_user_id.clone(),
                greeter_human_handle: invitation.greeter_human_handle.clone(),
            },
            InvitationKind::Device => InviteInfo::Device {
                greeter_user_id: invitation.greeter_user_id.clone(),
                greeter_human_handle: invitation.greeter_human_handle.clone(),
            },
        }
    }
}

impl std::fmt::Debug for InviteService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InviteService")
            .field("config", &self.config)
            .field("channel", &self.channel)
            .finish_non_exhaustive()
    }
}
