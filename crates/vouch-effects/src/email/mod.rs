//! Invitation e-mail delivery
//!
//! Delivery is fire-and-forget from the invitation's point of view: a failed
//! send downgrades the creation reply and never removes the invitation.

mod render;

pub use render::{invitation_url, InvitationEmail, InvitationEmailParams};

use async_trait::async_trait;
use parking_lot::Mutex;
use std::path::PathBuf;
use uuid::Uuid;
use vouch_core::InviteError;

/// E-mail delivery failures
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum EmailError {
    /// The server refused the recipient address
    #[error("Recipient refused: {0}")]
    Recipient(String),

    /// Delivery is misconfigured or the server is unreachable
    #[error("E-mail configuration error: {0}")]
    Config(String),
}

impl From<EmailError> for InviteError {
    fn from(err: EmailError) -> Self {
        match err {
            EmailError::Recipient(_) => InviteError::EmailRecipient,
            EmailError::Config(message) => InviteError::email_config(message),
        }
    }
}

/// Outbound e-mail delivery
#[async_trait]
pub trait EmailSender: Send + Sync {
    /// Deliver a rendered invitation e-mail
    async fn send(&self, email: &InvitationEmail) -> Result<(), EmailError>;
}

// =============================================================================
// Mocked sender
// =============================================================================

/// Sender that writes messages to a directory instead of a mail server
///
/// Used for development deployments: the message file can be opened to
/// follow the invitation link by hand.
#[derive(Debug, Clone)]
pub struct MockedEmailSender {
    outbox_dir: PathBuf,
}

impl MockedEmailSender {
    /// Create a sender writing into `outbox_dir`
    pub fn new(outbox_dir: impl Into<PathBuf>) -> Self {
        Self {
            outbox_dir: outbox_dir.into(),
        }
    }

    /// Directory messages are written into
    pub fn outbox_dir(&self) -> &PathBuf {
        &self.outbox_dir
    }
}

#[async_trait]
impl EmailSender for MockedEmailSender {
    async fn send(&self, email: &InvitationEmail) -> Result<(), EmailError> {
        tokio::fs::create_dir_all(&self.outbox_dir)
            .await
            .map_err(|e| EmailError::Config(format!("cannot create outbox: {e}")))?;

        let id = Uuid::new_v4().simple().to_string();
        let path = self.outbox_dir.join(format!("tmp-email-{id}.eml"));
        tokio::fs::write(&path, email.to_mime(&id))
            .await
            .map_err(|e| EmailError::Config(format!("cannot write {}: {e}", path.display())))?;

        tracing::info!(
            to = %email.to,
            path = %path.display(),
            "e-mail delivery mocked, message written to outbox"
        );
        Ok(())
    }
}

// =============================================================================
// Recording sender
// =============================================================================

/// Sender that keeps messages in memory, optionally failing every send
#[derive(Debug, Default)]
pub struct RecordingEmailSender {
    sent: Mutex<Vec<InvitationEmail>>,
    failure: Mutex<Option<EmailError>>,
}

impl RecordingEmailSender {
    /// Create a sender that accepts everything
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every following send fail with `error`
    pub fn fail_with(&self, error: EmailError) {
        *self.failure.lock() = Some(error);
    }

    /// Messages accepted so far
    pub fn sent(&self) -> Vec<InvitationEmail> {
        self.sent.lock().clone()
    }
}

#[async_trait]
impl EmailSender for RecordingEmailSender {
    async fn send(&self, email: &InvitationEmail) -> Result<(), EmailError> {
        if let Some(error) = self.failure.lock().clone() {
            return Err(error);
        }
        self.sent.lock().push(email.clone());
        Ok(())
    }
}
