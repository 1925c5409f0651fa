//! Vouch Effects
//!
//! Collaborator contracts consumed by the conduit, with the in-process
//! handlers used by the server and by tests.
//!
//! # Handlers
//!
//! - [`NotificationBus`] - predicate-filtered publish/subscribe with scoped
//!   [`Waiter`] handles
//! - [`InvitationStore`] / [`MemoryInvitationStore`] - invitation records
//! - [`MemberDirectory`] / [`MemoryMemberDirectory`] - member e-mail lookup
//! - [`EmailSender`] / [`MockedEmailSender`] / [`RecordingEmailSender`] -
//!   invitation e-mail delivery

#![forbid(unsafe_code)]

pub mod bus;
pub mod email;
pub mod members;
pub mod store;

pub use bus::{NotificationBus, Waiter};
pub use email::{
    invitation_url, EmailError, EmailSender, InvitationEmail, InvitationEmailParams, MockedEmailSender,
    RecordingEmailSender,
};
pub use members::{MemberDirectory, MemoryMemberDirectory};
pub use store::{memory::MemoryInvitationStore, InvitationStore};
