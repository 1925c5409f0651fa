//! Member directory
//!
//! The invitation store only needs one fact about existing members: whether
//! an e-mail address is already bound to one of them.

use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use tokio::sync::RwLock;
use vouch_core::{InviteResult, OrganizationId};

/// Lookup of existing organization members
#[async_trait]
pub trait MemberDirectory: Send + Sync {
    /// Whether `email` belongs to a member of `organization_id`
    async fn is_member_email(
        &self,
        organization_id: &OrganizationId,
        email: &str,
    ) -> InviteResult<bool>;
}

/// In-memory member directory
///
/// E-mails are compared case-insensitively.
#[derive(Debug, Default)]
pub struct MemoryMemberDirectory {
    emails: RwLock<HashMap<OrganizationId, HashSet<String>>>,
}

impl MemoryMemberDirectory {
    /// Create an empty directory
    pub fn new() -> Self {
        Self::default()
    }

    /// Record that `email` belongs to a member of `organization_id`
    pub async fn add_member(&self, organization_id: &OrganizationId, email: &str) {
        self.emails
            .write()
            .await
            .entry(organization_id.clone())
            .or_default()
            .insert(email.to_lowercase());
    }
}

#[async_trait]
impl MemberDirectory for MemoryMemberDirectory {
    async fn is_member_email(
        &self,
        organization_id: &OrganizationId,
        email: &str,
    ) -> InviteResult<bool> {
        let emails = self.emails.read().await;
        Ok(emails
            .get(organization_id)
            .is_some_and(|set| set.contains(&email.to_lowercase())))
    }
}
