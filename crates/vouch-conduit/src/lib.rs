//! Vouch Conduit
//!
//! Server-side relay for the greeter/claimer pairing handshake. The two
//! parties never talk directly: each submits its payload for the current
//! step to the relay and blocks until the other side has done the same.
//!
//! # Components
//!
//! - [`InvitationLifecycle`] - store access that publishes status changes
//! - [`ConduitChannel`] - per-token slot with the `talk`/`listen` primitives
//! - [`ConduitExchangeEngine`] - the blocking `exchange` built on both
//! - [`ReadyClaimerIndex`] - advisory set of tokens with a claimer mid-handshake
//!
//! # Example
//!
//! ```ignore
//! let bus = NotificationBus::new();
//! let lifecycle = InvitationLifecycle::new(store, bus.clone());
//! let channel = Arc::new(ConduitChannel::new(lifecycle));
//! let engine = ConduitExchangeEngine::new(channel, bus);
//!
//! let claimer_pub = engine
//!     .exchange(&org, ConduitRole::Greeter(alice), token, ConduitState::WaitPeers, greeter_pub)
//!     .await?;
//! ```

#![forbid(unsafe_code)]

pub mod channel;
pub mod engine;
pub mod lifecycle;
pub mod ready;

pub use channel::{ConduitChannel, ConduitListenCtx};
pub use engine::ConduitExchangeEngine;
pub use lifecycle::InvitationLifecycle;
pub use ready::ReadyClaimerIndex;
