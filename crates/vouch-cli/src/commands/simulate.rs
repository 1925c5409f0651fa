//! `vouch simulate`
//!
//! Plays both sides of a pairing against one in-memory service. Payloads
//! are placeholders; no key agreement happens here.

use anyhow::{anyhow, bail, Context, Result};
use std::path::Path;
use std::sync::Arc;
use vouch_core::{
    HumanHandle, InvitationDeletedReason, InvitationToken, OrganizationId, UserId, UserProfile,
    VouchConfig,
};
use vouch_effects::MemoryMemberDirectory;
use vouch_service::{
    ClaimerContext, ClaimerOutcome, ClaimerReply, GreeterContext, GreeterReply, InviteNewReply,
    InviteNewRequest, InviteService,
};

use super::load_config;

/// Run the simulation
pub async fn run(config: Option<&Path>, user: Option<String>, messages: u32) -> Result<()> {
    let config = match config {
        Some(path) => load_config(path)?,
        None => VouchConfig::default(),
    };
    let service = Arc::new(InviteService::in_memory(
        config,
        Arc::new(MemoryMemberDirectory::new()),
    ));
    let greeter = GreeterContext::new(
        OrganizationId::new("SimOrg"),
        UserId::new("alice"),
        UserProfile::Admin,
    )
    .with_human_handle(HumanHandle::new("alice@example.com", "Alice"));

    let request = match user {
        Some(claimer_email) => InviteNewRequest::User {
            claimer_email,
            send_email: false,
        },
        None => InviteNewRequest::Device { send_email: false },
    };
    let token = match service.invite_new(&greeter, request).await? {
        InviteNewReply::Ok { token, .. } => token,
        other => bail!("invitation refused: {other:?}"),
    };
    tracing::info!(%token, "invitation created");

    let claimer_ctx = expect_claimer(
        service
            .claimer_connect(&greeter.organization_id, token)
            .await?,
        "connect",
    )?;

    let claimer = tokio::spawn(run_claimer(Arc::clone(&service), claimer_ctx, messages));
    run_greeter(&service, &greeter, token, messages).await?;
    claimer.await.context("claimer task panicked")??;

    let deleted = service
        .invite_delete(&greeter, token, InvitationDeletedReason::Finished)
        .await?;
    expect_greeter(deleted, "delete")?;
    println!("pairing complete, {messages} message(s) exchanged");
    Ok(())
}

async fn run_greeter(
    service: &InviteService,
    ctx: &GreeterContext,
    token: InvitationToken,
    messages: u32,
) -> Result<()> {
    let claimer_key = expect_greeter(
        service.greeter_wait_peer(ctx, token, b"greeter-public-key".to_vec()).await?,
        "wait peer",
    )?;
    tracing::info!(bytes = claimer_key.len(), "greeter: got claimer public key");

    let hashed = expect_greeter(service.greeter_get_hashed_nonce(ctx, token).await?, "hashed nonce")?;
    tracing::info!(bytes = hashed.len(), "greeter: got hashed nonce");

    let nonce = expect_greeter(
        service.greeter_send_nonce(ctx, token, b"greeter-nonce".to_vec()).await?,
        "send nonce",
    )?;
    tracing::info!(bytes = nonce.len(), "greeter: got claimer nonce");

    expect_greeter(service.greeter_wait_peer_trust(ctx, token).await?, "wait peer trust")?;
    expect_greeter(service.greeter_signify_trust(ctx, token).await?, "signify trust")?;
    tracing::info!("greeter: trust established");

    for i in 0..messages {
        let reply = expect_greeter(
            service
                .greeter_communicate(ctx, token, format!("greeter message {i}").into_bytes())
                .await?,
            "communicate",
        )?;
        tracing::info!(message = %String::from_utf8_lossy(&reply), "greeter: received");
    }
    Ok(())
}

async fn run_claimer(service: Arc<InviteService>, ctx: ClaimerContext, messages: u32) -> Result<()> {
    let greeter_key = expect_claimer(
        service.claimer_wait_peer(&ctx, b"claimer-public-key".to_vec()).await?,
        "wait peer",
    )?;
    tracing::info!(bytes = greeter_key.len(), "claimer: got greeter public key");

    let nonce = expect_claimer(
        service.claimer_send_hashed_nonce(&ctx, b"claimer-hashed-nonce".to_vec()).await?,
        "send hashed nonce",
    )?;
    tracing::info!(bytes = nonce.len(), "claimer: got greeter nonce");

    expect_claimer(service.claimer_send_nonce(&ctx, b"claimer-nonce".to_vec()).await?, "send nonce")?;
    expect_claimer(service.claimer_signify_trust(&ctx).await?, "signify trust")?;
    expect_claimer(service.claimer_wait_peer_trust(&ctx).await?, "wait peer trust")?;
    tracing::info!("claimer: trust established");

    for i in 0..messages {
        let reply = expect_claimer(
            service
                .claimer_communicate(&ctx, format!("claimer message {i}").into_bytes())
                .await?,
            "communicate",
        )?;
        tracing::info!(message = %String::from_utf8_lossy(&reply), "claimer: received");
    }

    service
        .claimer_disconnect(&ctx)
        .await
        .context("claimer disconnect")
}

fn expect_greeter<T>(reply: GreeterReply<T>, step: &str) -> Result<T> {
    match reply {
        GreeterReply::Ok(value) => Ok(value),
        other => Err(anyhow!("greeter {step} failed: {}", describe_greeter(&other))),
    }
}

fn describe_greeter<T>(reply: &GreeterReply<T>) -> &'static str {
    match reply {
        GreeterReply::Ok(_) => "ok",
        GreeterReply::NotFound => "invitation not found",
        GreeterReply::AlreadyDeleted => "invitation deleted",
        GreeterReply::InvalidState => "peer is at another step",
    }
}

fn expect_claimer<T>(outcome: ClaimerOutcome<T>, step: &str) -> Result<T> {
    match outcome {
        ClaimerOutcome::Reply(ClaimerReply::Ok(value)) => Ok(value),
        ClaimerOutcome::Reply(ClaimerReply::InvalidState) => {
            bail!("claimer {step} failed: peer is at another step")
        }
        ClaimerOutcome::CloseConnection => bail!("claimer {step} failed: connection closed"),
    }
}
