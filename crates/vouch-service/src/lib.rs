//! Vouch Service
//!
//! Transport-facing invitation commands. Authenticated members call the
//! greeter commands, anonymous token holders the claimer ones; both meet on
//! the conduit from `vouch-conduit`.
//!
//! Greeter commands return [`GreeterReply`]. Claimer commands return
//! [`ClaimerOutcome`], whose `CloseConnection` variant tells the transport to
//! drop an anonymous connection whose invitation is gone.

#![forbid(unsafe_code)]

pub mod context;
pub mod reply;
pub mod service;
pub mod steps;
pub mod telemetry;

pub use context::{ClaimerContext, GreeterContext};
pub use reply::{ClaimerOutcome, ClaimerReply, GreeterReply};
pub use service::{
    InvitationEmailSentStatus, InviteInfo, InviteListItem, InviteNewReply, InviteNewRequest,
    InviteService,
};
pub use telemetry::init_tracing;
