//! Vouch Core
//!
//! Shared vocabulary for the invitation conduit: identifiers, the invitation
//! model, the conduit state table, bus events and the error taxonomy.
//!
//! # Architecture
//!
//! This crate has no async code and no I/O beyond configuration loading.
//! Everything stateful lives in the crates built on top of it:
//! - `vouch-effects` - stores, notification bus, e-mail delivery
//! - `vouch-conduit` - talk/listen channel and the exchange engine
//! - `vouch-service` - transport-facing commands

#![forbid(unsafe_code)]

pub mod conduit;
pub mod config;
pub mod errors;
pub mod events;
pub mod identifiers;
pub mod invitation;

pub use conduit::{ConduitRole, ConduitSide, ConduitState};
pub use config::{ConfigError, EmailConfig, InvitationsConfig, VouchConfig};
pub use errors::{InviteError, InviteResult};
pub use events::InviteEvent;
pub use identifiers::{HumanHandle, InvitationToken, OrganizationId, UserId};
pub use invitation::{
    Invitation, InvitationDeletedReason, InvitationKind, InvitationStatus, InvitationType,
    NewInvitation, UserProfile,
};
