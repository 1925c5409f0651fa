//! Ready claimer index
//!
//! Process-local view of which invitations currently have a claimer in the
//! middle of the handshake. It is built once per running instance, fed only
//! by status-change events from the bus, and read by invitation listing.
//!
//! The index is advisory. A restart, or a second instance serving the same
//! organization, leaves it incomplete; the store's status is authoritative.

use parking_lot::RwLock;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tokio::task::JoinHandle;
use vouch_core::{InvitationStatus, InvitationToken, InviteEvent, OrganizationId};
use vouch_effects::NotificationBus;

/// Tokens whose last observed status was `READY`, per organization
#[derive(Debug, Default)]
pub struct ReadyClaimerIndex {
    ready: RwLock<HashMap<OrganizationId, HashSet<InvitationToken>>>,
}

impl ReadyClaimerIndex {
    /// Create an empty index with no feed attached
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an index and start the task that feeds it from `bus`
    ///
    /// The subscription is registered before this returns, so no status
    /// change published afterwards is missed. The task ends once every
    /// handle to the bus is dropped.
    pub fn spawn(bus: &NotificationBus) -> (Arc<Self>, JoinHandle<()>) {
        let index = Arc::new(Self::new());
        let mut waiter =
            bus.subscribe(|event| matches!(event, InviteEvent::StatusChanged { .. }));
        let feed = Arc::clone(&index);
        let handle = tokio::spawn(async move {
            while let Some(event) = waiter.recv().await {
                feed.apply(&event);
            }
            tracing::debug!("ready claimer feed stopped");
        });
        (index, handle)
    }

    pub(crate) fn apply(&self, event: &InviteEvent) {
        let InviteEvent::StatusChanged {
            organization_id,
            token,
            status,
            ..
        } = event
        else {
            return;
        };
        let mut ready = self.ready.write();
        if *status == InvitationStatus::Ready {
            ready
                .entry(organization_id.clone())
                .or_default()
                .insert(*token);
        } else if let Some(tokens) = ready.get_mut(organization_id) {
            tokens.remove(token);
            if tokens.is_empty() {
                ready.remove(organization_id);
            }
        }
    }

    /// Whether a claimer looked ready on `token` last time we heard
    pub fn is_ready(&self, organization_id: &OrganizationId, token: InvitationToken) -> bool {
        self.ready
            .read()
            .get(organization_id)
            .is_some_and(|tokens| tokens.contains(&token))
    }
}
