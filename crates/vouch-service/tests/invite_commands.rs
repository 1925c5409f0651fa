//! Greeter and claimer commands over the in-memory stack

use assert_matches::assert_matches;
use std::sync::Arc;
use std::time::Duration;
use vouch_core::{
    HumanHandle, InvitationDeletedReason, InvitationStatus, InvitationToken, OrganizationId,
    UserId, UserProfile, VouchConfig,
};
use vouch_effects::{EmailError, MemoryInvitationStore, MemoryMemberDirectory, RecordingEmailSender};
use vouch_service::{
    ClaimerContext, ClaimerOutcome, ClaimerReply, GreeterContext, GreeterReply,
    InvitationEmailSentStatus, InviteInfo, InviteListItem, InviteNewReply, InviteNewRequest,
    InviteService,
};

const TIMEOUT: Duration = Duration::from_secs(5);

struct Harness {
    service: Arc<InviteService>,
    email: Arc<RecordingEmailSender>,
    members: Arc<MemoryMemberDirectory>,
    alice: GreeterContext,
}

fn org() -> OrganizationId {
    OrganizationId::new("CoolOrg")
}

fn harness_with(config: VouchConfig) -> Harness {
    let members = Arc::new(MemoryMemberDirectory::new());
    let email = Arc::new(RecordingEmailSender::new());
    let store = MemoryInvitationStore::new(members.clone());
    let service = InviteService::new(config, Arc::new(store), email.clone());
    Harness {
        service: Arc::new(service),
        email,
        members,
        alice: GreeterContext::new(org(), UserId::new("alice"), UserProfile::Admin)
            .with_human_handle(HumanHandle::new("alice@example.com", "Alicey McAliceFace")),
    }
}

fn harness() -> Harness {
    harness_with(VouchConfig {
        server_url: Some("https://vouch.example.com/".into()),
        ..VouchConfig::default()
    })
}

impl Harness {
    async fn invite_user(&self, claimer_email: &str) -> InvitationToken {
        let reply = self
            .service
            .invite_new(
                &self.alice,
                InviteNewRequest::User {
                    claimer_email: claimer_email.into(),
                    send_email: false,
                },
            )
            .await
            .unwrap();
        match reply {
            InviteNewReply::Ok { token, .. } => token,
            other => panic!("unexpected reply {other:?}"),
        }
    }

    async fn connect(&self, token: InvitationToken) -> ClaimerContext {
        self.service
            .claimer_connect(&org(), token)
            .await
            .unwrap()
            .ok()
            .expect("claimer should be accepted")
    }

    async fn status(&self, token: InvitationToken) -> Option<InvitationStatus> {
        self.service
            .invite_list(&self.alice)
            .await
            .unwrap()
            .into_iter()
            .find(|item| item.token() == token)
            .map(|item| match item {
                InviteListItem::User { status, .. } | InviteListItem::Device { status, .. } => {
                    status
                }
            })
    }
}

// =============================================================================
// invite_new
// =============================================================================

#[tokio::test]
async fn only_admins_invite_users() {
    let h = harness();
    let bob = GreeterContext::new(org(), UserId::new("bob"), UserProfile::Standard);
    let reply = h
        .service
        .invite_new(
            &bob,
            InviteNewRequest::User {
                claimer_email: "zack@example.com".into(),
                send_email: true,
            },
        )
        .await
        .unwrap();
    assert_eq!(reply, InviteNewReply::NotAllowed);

    // Standard members may still invite their own devices
    let reply = h
        .service
        .invite_new(&bob, InviteNewRequest::Device { send_email: false })
        .await
        .unwrap();
    assert_matches!(reply, InviteNewReply::Ok { email_sent: InvitationEmailSentStatus::Success, .. });
}

#[tokio::test]
async fn device_email_needs_a_human_handle() {
    let h = harness();
    let anonymous = GreeterContext::new(org(), UserId::new("robot"), UserProfile::Admin);
    let reply = h
        .service
        .invite_new(&anonymous, InviteNewRequest::Device { send_email: true })
        .await
        .unwrap();
    assert_eq!(reply, InviteNewReply::NotAvailable);
    assert!(h.service.invite_list(&anonymous).await.unwrap().is_empty());
}

#[tokio::test]
async fn existing_member_cannot_be_invited() {
    let h = harness();
    h.members.add_member(&org(), "bob@example.com").await;
    let reply = h
        .service
        .invite_new(
            &h.alice,
            InviteNewRequest::User {
                claimer_email: "bob@example.com".into(),
                send_email: true,
            },
        )
        .await
        .unwrap();
    assert_eq!(reply, InviteNewReply::AlreadyMember);
    assert!(h.email.sent().is_empty());
}

#[tokio::test]
async fn user_invitation_email_is_sent_to_the_claimer() {
    let h = harness();
    let reply = h
        .service
        .invite_new(
            &h.alice,
            InviteNewRequest::User {
                claimer_email: "zack@example.com".into(),
                send_email: true,
            },
        )
        .await
        .unwrap();
    let token = match reply {
        InviteNewReply::Ok {
            token,
            email_sent: InvitationEmailSentStatus::Success,
        } => token,
        other => panic!("unexpected reply {other:?}"),
    };

    let sent = h.email.sent();
    assert_eq!(sent.len(), 1);
    let email = &sent[0];
    assert_eq!(email.to, "zack@example.com");
    assert_eq!(email.subject, "[Vouch] Alicey McAliceFace invited you to CoolOrg");
    assert_eq!(
        email.reply_to.as_deref(),
        Some("Alicey McAliceFace <alice@example.com>")
    );
    assert!(email.text.contains(&format!(
        "https://vouch.example.com/redirect/CoolOrg?action=claim_user_invitation&token={token}"
    )));
}

#[tokio::test]
async fn device_invitation_email_goes_to_the_greeter() {
    let h = harness();
    h.service
        .invite_new(&h.alice, InviteNewRequest::Device { send_email: true })
        .await
        .unwrap();
    let sent = h.email.sent();
    assert_eq!(sent[0].to, "alice@example.com");
    assert_eq!(sent[0].subject, "[Vouch] New device invitation to CoolOrg");
    assert_eq!(sent[0].reply_to, None);
}

#[tokio::test]
async fn email_failures_keep_the_invitation() {
    let h = harness();
    h.email.fail_with(EmailError::Recipient("no such mailbox".into()));
    let reply = h
        .service
        .invite_new(
            &h.alice,
            InviteNewRequest::User {
                claimer_email: "nobody@example.com".into(),
                send_email: true,
            },
        )
        .await
        .unwrap();
    let token = match reply {
        InviteNewReply::Ok {
            token,
            email_sent: InvitationEmailSentStatus::BadRecipient,
        } => token,
        other => panic!("unexpected reply {other:?}"),
    };
    assert_eq!(h.status(token).await, Some(InvitationStatus::Idle));

    h.email.fail_with(EmailError::Config("smtp down".into()));
    let reply = h
        .service
        .invite_new(&h.alice, InviteNewRequest::Device { send_email: true })
        .await
        .unwrap();
    assert_matches!(
        reply,
        InviteNewReply::Ok { email_sent: InvitationEmailSentStatus::NotAvailable, .. }
    );
    assert_eq!(h.service.invite_list(&h.alice).await.unwrap().len(), 2);
}

#[tokio::test]
async fn no_server_url_means_no_email() {
    let h = harness_with(VouchConfig::default());
    let reply = h
        .service
        .invite_new(&h.alice, InviteNewRequest::Device { send_email: true })
        .await
        .unwrap();
    assert_matches!(
        reply,
        InviteNewReply::Ok { email_sent: InvitationEmailSentStatus::NotAvailable, .. }
    );
    assert!(h.email.sent().is_empty());
}

#[tokio::test]
async fn in_memory_service_writes_emails_to_the_outbox() {
    let outbox = tempfile::tempdir().unwrap();
    let mut config = VouchConfig {
        server_url: Some("https://vouch.example.com".into()),
        ..VouchConfig::default()
    };
    config.email.outbox_dir = outbox.path().to_path_buf();
    let service = InviteService::in_memory(config, Arc::new(MemoryMemberDirectory::new()));
    let alice = GreeterContext::new(org(), UserId::new("alice"), UserProfile::Admin)
        .with_human_handle(HumanHandle::new("alice@example.com", "Alice"));

    service
        .invite_new(&alice, InviteNewRequest::Device { send_email: true })
        .await
        .unwrap();
    assert_eq!(std::fs::read_dir(outbox.path()).unwrap().count(), 1);
}

// =============================================================================
// list / delete / info
// =============================================================================

#[tokio::test]
async fn delete_reports_each_outcome() {
    let h = harness();
    let token = h.invite_user("zack@example.com").await;
    let bob = GreeterContext::new(org(), UserId::new("bob"), UserProfile::Admin);

    assert_eq!(
        h.service
            .invite_delete(&bob, token, InvitationDeletedReason::Cancelled)
            .await
            .unwrap(),
        GreeterReply::NotFound
    );
    assert_eq!(
        h.service
            .invite_delete(&h.alice, token, InvitationDeletedReason::Cancelled)
            .await
            .unwrap(),
        GreeterReply::Ok(())
    );
    assert_eq!(
        h.service
            .invite_delete(&h.alice, token, InvitationDeletedReason::Cancelled)
            .await
            .unwrap(),
        GreeterReply::AlreadyDeleted
    );
    assert!(h.service.invite_list(&h.alice).await.unwrap().is_empty());
    assert!(h
        .service
        .claimer_connect(&org(), token)
        .await
        .unwrap()
        .is_close());
}

#[tokio::test]
async fn unknown_token_closes_the_claimer_connection() {
    let h = harness();
    assert!(h
        .service
        .claimer_connect(&org(), InvitationToken::new())
        .await
        .unwrap()
        .is_close());
}

#[tokio::test]
async fn info_comes_from_the_connection_context() {
    let h = harness();
    let token = h.invite_user("zack@example.com").await;
    let ctx = h.connect(token).await;

    h.service
        .invite_delete(&h.alice, token, InvitationDeletedReason::Cancelled)
        .await
        .unwrap();

    assert_eq!(
        h.service.invite_info(&ctx),
        InviteInfo::User {
            claimer_email: "zack@example.com".into(),
            greeter_user_id: UserId::new("alice"),
            greeter_human_handle: Some(HumanHandle::new(
                "alice@example.com",
                "Alicey McAliceFace"
            )),
        }
    );
}

// =============================================================================
// Handshake
// =============================================================================

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn full_pairing_through_the_commands() {
    let h = harness();
    let token = h.invite_user("zack@example.com").await;
    let claimer_ctx = h.connect(token).await;
    let service = h.service.clone();

    let claimer = tokio::spawn(async move {
        let s = &service;
        let ctx = &claimer_ctx;
        let greeter_key = s.claimer_wait_peer(ctx, b"C_PUB".to_vec()).await?.ok();
        let greeter_nonce = s
            .claimer_send_hashed_nonce(ctx, b"C_HASH".to_vec())
            .await?
            .ok();
        s.claimer_send_nonce(ctx, b"C_NONCE".to_vec()).await?;
        s.claimer_signify_trust(ctx).await?;
        s.claimer_wait_peer_trust(ctx).await?;
        let message = s.claimer_communicate(ctx, b"device keys".to_vec()).await?.ok();
        s.claimer_disconnect(ctx).await?;
        Ok::<_, vouch_core::InviteError>((greeter_key, greeter_nonce, message))
    });

    let alice = &h.alice;
    let svc = &h.service;
    let greeter = async {
        let claimer_key = svc.greeter_wait_peer(alice, token, b"G_PUB".to_vec()).await?.ok();
        let hashed = svc.greeter_get_hashed_nonce(alice, token).await?.ok();
        let claimer_nonce = svc
            .greeter_send_nonce(alice, token, b"G_NONCE".to_vec())
            .await?
            .ok();
        svc.greeter_wait_peer_trust(alice, token).await?;
        svc.greeter_signify_trust(alice, token).await?;
        let message = svc
            .greeter_communicate(alice, token, b"welcome".to_vec())
            .await?
            .ok();
        Ok::<_, vouch_core::InviteError>((claimer_key, hashed, claimer_nonce, message))
    };

    let (claimer_key, hashed, claimer_nonce, greeter_message) =
        tokio::time::timeout(TIMEOUT, greeter).await.unwrap().unwrap();
    let (greeter_key, greeter_nonce, claimer_message) =
        tokio::time::timeout(TIMEOUT, claimer).await.unwrap().unwrap().unwrap();

    assert_eq!(claimer_key.as_deref(), Some(&b"C_PUB"[..]));
    assert_eq!(greeter_key.as_deref(), Some(&b"G_PUB"[..]));
    assert_eq!(hashed.as_deref(), Some(&b"C_HASH"[..]));
    assert_eq!(greeter_nonce.as_deref(), Some(&b"G_NONCE"[..]));
    assert_eq!(claimer_nonce.as_deref(), Some(&b"C_NONCE"[..]));
    assert_eq!(greeter_message.as_deref(), Some(&b"device keys"[..]));
    assert_eq!(claimer_message.as_deref(), Some(&b"welcome"[..]));

    // Disconnect sends the invitation back to idle
    assert_eq!(h.status(token).await, Some(InvitationStatus::Idle));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn ready_claimer_shows_up_in_the_list() {
    let h = harness();
    let token = h.invite_user("zack@example.com").await;
    let ctx = h.connect(token).await;

    let service = h.service.clone();
    let claimer_ctx = ctx.clone();
    let claimer = tokio::spawn(async move {
        service.claimer_wait_peer(&claimer_ctx, b"C_PUB".to_vec()).await
    });

    tokio::time::timeout(TIMEOUT, async {
        loop {
            let items = h.service.invite_list(&h.alice).await.unwrap();
            if items.iter().any(|item| item.claimer_ready()) {
                break;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    })
    .await
    .expect("claimer should be listed as ready");
    assert_eq!(h.status(token).await, Some(InvitationStatus::Ready));

    // Greeter cancels: the waiting claimer is told to hang up
    h.service
        .invite_delete(&h.alice, token, InvitationDeletedReason::Cancelled)
        .await
        .unwrap();
    let outcome = tokio::time::timeout(TIMEOUT, claimer)
        .await
        .unwrap()
        .unwrap()
        .unwrap();
    assert_eq!(outcome, ClaimerOutcome::CloseConnection);
    h.service.claimer_disconnect(&ctx).await.unwrap();
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn out_of_order_claimer_gets_invalid_state() {
    let h = harness();
    let token = h.invite_user("zack@example.com").await;
    let ctx = h.connect(token).await;

    let outcome = tokio::time::timeout(
        TIMEOUT,
        h.service.claimer_send_nonce(&ctx, b"too early".to_vec()),
    )
    .await
    .unwrap()
    .unwrap();
    assert_eq!(outcome, ClaimerOutcome::Reply(ClaimerReply::InvalidState));
}
