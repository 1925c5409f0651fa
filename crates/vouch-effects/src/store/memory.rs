//! In-memory invitation store

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use vouch_core::{
    Invitation, InvitationDeletedReason, InvitationKind, InvitationStatus, InvitationToken,
    InviteError, InviteResult, NewInvitation, OrganizationId, UserId,
};

use super::InvitationStore;
use crate::members::MemberDirectory;

type TokenSource = Box<dyn Fn() -> InvitationToken + Send + Sync>;

/// Default number of fresh tokens tried on collision
pub const DEFAULT_COLLISION_RETRIES: u32 = 8;

/// In-memory invitation store
///
/// Invitations are kept per organization in insertion order.
pub struct MemoryInvitationStore {
    data: RwLock<HashMap<OrganizationId, IndexMap<InvitationToken, Invitation>>>,
    members: Arc<dyn MemberDirectory>,
    token_source: TokenSource,
    collision_retries: u32,
}

impl MemoryInvitationStore {
    /// Create a store checking claimer e-mails against `members`
    pub fn new(members: Arc<dyn MemberDirectory>) -> Self {
        Self {
            data: RwLock::new(HashMap::new()),
            members,
            token_source: Box::new(InvitationToken::new),
            collision_retries: DEFAULT_COLLISION_RETRIES,
        }
    }

    /// Override how many fresh tokens are tried on collision
    pub fn with_collision_retries(mut self, retries: u32) -> Self {
        self.collision_retries = retries.max(1);
        self
    }

    /// Override token generation
    pub fn with_token_source<F>(mut self, source: F) -> Self
    where
        F: Fn() -> InvitationToken + Send + Sync + 'static,
    {
        self.token_source = Box::new(source);
        self
    }

    fn lookup<'a>(
        data: &'a HashMap<OrganizationId, IndexMap<InvitationToken, Invitation>>,
        organization_id: &OrganizationId,
        token: InvitationToken,
    ) -> InviteResult<&'a Invitation> {
        data.get(organization_id)
            .and_then(|invitations| invitations.get(&token))
            .ok_or(InviteError::NotFound)
    }

    fn lookup_mut<'a>(
        data: &'a mut HashMap<OrganizationId, IndexMap<InvitationToken, Invitation>>,
        organization_id: &OrganizationId,
        token: InvitationToken,
    ) -> InviteResult<&'a mut Invitation> {
        data.get_mut(organization_id)
            .and_then(|invitations| invitations.get_mut(&token))
            .ok_or(InviteError::NotFound)
    }
}

#[async_trait]
impl InvitationStore for MemoryInvitationStore {
    async fn create(
        &self,
        organization_id: &OrganizationId,
        new: NewInvitation,
    ) -> InviteResult<Invitation> {
        if let InvitationKind::User { claimer_email } = &new.kind {
            if self
                .members
                .is_member_email(organization_id, claimer_email)
                .await?
            {
                return Err(InviteError::AlreadyMember);
            }
        }

        let mut data = self.data.write().await;
        let invitations = data.entry(organization_id.clone()).or_default();
        let mut token = None;
        for attempt in 1..=self.collision_retries {
            let candidate = (self.token_source)();
            if !invitations.contains_key(&candidate) {
                token = Some(candidate);
                break;
            }
            tracing::debug!(%organization_id, token = %candidate, attempt, "invitation token collision, retrying");
        }
        let token = token.ok_or_else(|| {
            InviteError::storage(format!(
                "no unique invitation token after {} attempts",
                self.collision_retries
            ))
        })?;

        let invitation = Invitation::from_new(token, new);
        invitations.insert(token, invitation.clone());
        Ok(invitation)
    }

    async fn get(
        &self,
        organization_id: &OrganizationId,
        token: InvitationToken,
    ) -> InviteResult<Invitation> {
        let data = self.data.read().await;
        Self::lookup(&data, organization_id, token).cloned()
    }

    async fn delete(
        &self,
        organization_id: &OrganizationId,
        token: InvitationToken,
        reason: InvitationDeletedReason,
        on: DateTime<Utc>,
    ) -> InviteResult<Invitation> {
        let mut data = self.data.write().await;
        let invitation = Self::lookup_mut(&mut data, organization_id, token)?;
        if invitation.is_deleted() {
            return Err(InviteError::AlreadyDeleted);
        }
        invitation.status = InvitationStatus::Deleted;
        invitation.deleted = Some((on, reason));
        Ok(invitation.clone())
    }

    async fn list(
        &self,
        organization_id: &OrganizationId,
        greeter: &UserId,
    ) -> InviteResult<Vec<Invitation>> {
        let data = self.data.read().await;
        Ok(data
            .get(organization_id)
            .map(|invitations| {
                invitations
                    .values()
                    .filter(|inv| inv.is_greeted_by(greeter) && !inv.is_deleted())
                    .cloned()
                    .collect()
            })
            .unwrap_or_default())
    }

    async fn update_status(
        &self,
        organization_id: &OrganizationId,
        token: InvitationToken,
        from: InvitationStatus,
        to: InvitationStatus,
    ) -> InviteResult<bool> {
        if !to.is_active() {
            return Err(InviteError::internal(
                "update_status cannot delete, use delete instead",
            ));
        }
        let mut data = self.data.write().await;
        let invitation = Self::lookup_mut(&mut data, organization_id, token)?;
        if invitation.is_deleted() {
            return Err(InviteError::AlreadyDeleted);
        }
        if invitation.status != from {
            return Ok(false);
        }
        invitation.status = to;
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::members::MemoryMemberDirectory;
    use assert_matches::assert_matches;
    use parking_lot::Mutex;
    use std::collections::VecDeque;
    use uuid::Uuid;

    fn org() -> OrganizationId {
        OrganizationId::new("CoolOrg")
    }

    fn alice() -> UserId {
        UserId::new("alice")
    }

    fn store() -> MemoryInvitationStore {
        MemoryInvitationStore::new(Arc::new(MemoryMemberDirectory::new()))
    }

    #[tokio::test]
    async fn create_then_get() {
        let store = store();
        let created = store
            .create(&org(), NewInvitation::user(alice(), None, "zack@example.com", Utc::now()))
            .await
            .unwrap();

        let fetched = store.get(&org(), created.token).await.unwrap();
        assert_eq!(fetched, created);
        assert_eq!(fetched.status, InvitationStatus::Idle);
    }

    #[tokio::test]
    async fn unknown_token_and_unknown_org_are_not_found() {
        let store = store();
        let created = store
            .create(&org(), NewInvitation::device(alice(), None, Utc::now()))
            .await
            .unwrap();

        assert_matches!(
            store.get(&org(), InvitationToken::new()).await,
            Err(InviteError::NotFound)
        );
        assert_matches!(
            store.get(&OrganizationId::new("OtherOrg"), created.token).await,
            Err(InviteError::NotFound)
        );
    }

    #[tokio::test]
    async fn user_invitation_for_member_email_is_rejected() {
        let members = Arc::new(MemoryMemberDirectory::new());
        members.add_member(&org(), "bob@example.com").await;
        let store = MemoryInvitationStore::new(members);

        assert_matches!(
            store
                .create(&org(), NewInvitation::user(alice(), None, "bob@example.com", Utc::now()))
                .await,
            Err(InviteError::AlreadyMember)
        );
        // Device invitations never check membership
        store
            .create(&org(), NewInvitation::device(alice(), None, Utc::now()))
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn colliding_tokens_are_regenerated() {
        let fixed = InvitationToken::from_uuid(Uuid::from_u128(1));
        let fresh = InvitationToken::from_uuid(Uuid::from_u128(2));
        let queue = Mutex::new(VecDeque::from(vec![fixed, fixed, fresh]));
        let store = store().with_token_source(move || queue.lock().pop_front().unwrap_or(fresh));

        let first = store
            .create(&org(), NewInvitation::device(alice(), None, Utc::now()))
            .await
            .unwrap();
        let second = store
            .create(&org(), NewInvitation::device(alice(), None, Utc::now()))
            .await
            .unwrap();

        assert_eq!(first.token, fixed);
        assert_eq!(second.token, fresh);
    }

    #[tokio::test]
    async fn exhausted_retry_budget_is_a_storage_error() {
        let fixed = InvitationToken::from_uuid(Uuid::from_u128(7));
        let store = store()
            .with_collision_retries(3)
            .with_token_source(move || fixed);

        store
            .create(&org(), NewInvitation::device(alice(), None, Utc::now()))
            .await
            .unwrap();
        assert_matches!(
            store
                .create(&org(), NewInvitation::device(alice(), None, Utc::now()))
                .await,
            Err(InviteError::Storage { .. })
        );
    }

    #[tokio::test]
    async fn delete_twice_reports_already_deleted() {
        let store = store();
        let created = store
            .create(&org(), NewInvitation::device(alice(), None, Utc::now()))
            .await
            .unwrap();
        let on = Utc::now();

        let deleted = store
            .delete(&org(), created.token, InvitationDeletedReason::Cancelled, on)
            .await
            .unwrap();
        assert_eq!(deleted.status, InvitationStatus::Deleted);

        assert_matches!(
            store
                .delete(&org(), created.token, InvitationDeletedReason::Finished, Utc::now())
                .await,
            Err(InviteError::AlreadyDeleted)
        );
        let after = store.get(&org(), created.token).await.unwrap();
        assert_eq!(after.deleted, Some((on, InvitationDeletedReason::Cancelled)));
    }

    #[tokio::test]
    async fn list_keeps_creation_order_and_skips_deleted_and_foreign() {
        let store = store();
        let first = store
            .create(&org(), NewInvitation::user(alice(), None, "a@example.com", Utc::now()))
            .await
            .unwrap();
        let gone = store
            .create(&org(), NewInvitation::device(alice(), None, Utc::now()))
            .await
            .unwrap();
        store
            .create(&org(), NewInvitation::device(UserId::new("bob"), None, Utc::now()))
            .await
            .unwrap();
        let last = store
            .create(&org(), NewInvitation::user(alice(), None, "b@example.com", Utc::now()))
            .await
            .unwrap();
        store
            .delete(&org(), gone.token, InvitationDeletedReason::Rotated, Utc::now())
            .await
            .unwrap();

        let tokens: Vec<_> = store
            .list(&org(), &alice())
            .await
            .unwrap()
            .into_iter()
            .map(|inv| inv.token)
            .collect();
        assert_eq!(tokens, vec![first.token, last.token]);
        assert!(store
            .list(&OrganizationId::new("Empty"), &alice())
            .await
            .unwrap()
            .is_empty());
    }

    #[tokio::test]
    async fn update_status_is_compare_and_set() {
        let store = store();
        let created = store
            .create(&org(), NewInvitation::device(alice(), None, Utc::now()))
            .await
            .unwrap();

        assert!(store
            .update_status(&org(), created.token, InvitationStatus::Idle, InvitationStatus::Ready)
            .await
            .unwrap());
        assert!(!store
            .update_status(&org(), created.token, InvitationStatus::Idle, InvitationStatus::Ready)
            .await
            .unwrap());
        assert_eq!(
            store.get(&org(), created.token).await.unwrap().status,
            InvitationStatus::Ready
        );

        store
            .delete(&org(), created.token, InvitationDeletedReason::Finished, Utc::now())
            .await
            .unwrap();
        assert_matches!(
            store
                .update_status(&org(), created.token, InvitationStatus::Ready, InvitationStatus::Idle)
                .await,
            Err(InviteError::AlreadyDeleted)
        );
    }
}
