//! Conduit handshake states and roles
//!
//! The handshake walks seven steps in a fixed order. The transition table is
//! written out as an exhaustive `match` in [`ConduitState::next`], so adding
//! a step without deciding its successor does not compile.
//!
//! ```text
//! WaitPeers -> ClaimerHashedNonce -> GreeterNonce -> ClaimerNonce
//!           -> ClaimerTrust -> GreeterTrust -> Communicate -> Communicate ...
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::identifiers::UserId;

/// Step of the pairing handshake
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ConduitState {
    /// Both sides exchange public keys
    #[serde(rename = "1_WAIT_PEERS")]
    WaitPeers,
    /// Claimer commits to its nonce
    #[serde(rename = "2_1_CLAIMER_HASHED_NONCE")]
    ClaimerHashedNonce,
    /// Greeter reveals its nonce
    #[serde(rename = "2_2_GREETER_NONCE")]
    GreeterNonce,
    /// Claimer reveals its nonce
    #[serde(rename = "2_3_CLAIMER_NONCE")]
    ClaimerNonce,
    /// Greeter confirms the claimer's SAS
    #[serde(rename = "3_1_CLAIMER_TRUST")]
    ClaimerTrust,
    /// Claimer confirms the greeter's SAS
    #[serde(rename = "3_2_GREETER_TRUST")]
    GreeterTrust,
    /// Free-form encrypted messages, repeatable
    #[serde(rename = "4_COMMUNICATE")]
    Communicate,
}

impl ConduitState {
    /// Every state, in protocol order
    pub const ALL: [ConduitState; 7] = [
        ConduitState::WaitPeers,
        ConduitState::ClaimerHashedNonce,
        ConduitState::GreeterNonce,
        ConduitState::ClaimerNonce,
        ConduitState::ClaimerTrust,
        ConduitState::GreeterTrust,
        ConduitState::Communicate,
    ];

    /// State the conduit moves to once both sides exchanged at `self`
    pub fn next(self) -> ConduitState {
        match self {
            ConduitState::WaitPeers => ConduitState::ClaimerHashedNonce,
            ConduitState::ClaimerHashedNonce => ConduitState::GreeterNonce,
            ConduitState::GreeterNonce => ConduitState::ClaimerNonce,
            ConduitState::ClaimerNonce => ConduitState::ClaimerTrust,
            ConduitState::ClaimerTrust => ConduitState::GreeterTrust,
            ConduitState::GreeterTrust => ConduitState::Communicate,
            ConduitState::Communicate => ConduitState::Communicate,
        }
    }

    /// Whether the state loops onto itself
    pub fn is_absorbing(self) -> bool {
        self.next() == self
    }

    /// Wire label
    pub fn as_str(self) -> &'static str {
        match self {
            ConduitState::WaitPeers => "1_WAIT_PEERS",
            ConduitState::ClaimerHashedNonce => "2_1_CLAIMER_HASHED_NONCE",
            ConduitState::GreeterNonce => "2_2_GREETER_NONCE",
            ConduitState::ClaimerNonce => "2_3_CLAIMER_NONCE",
            ConduitState::ClaimerTrust => "3_1_CLAIMER_TRUST",
            ConduitState::GreeterTrust => "3_2_GREETER_TRUST",
            ConduitState::Communicate => "4_COMMUNICATE",
        }
    }
}

impl fmt::Display for ConduitState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Which end of the conduit a payload belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ConduitSide {
    /// Authenticated member
    Greeter,
    /// Anonymous token holder
    Claimer,
}

impl ConduitSide {
    /// The opposite side
    pub fn peer(self) -> ConduitSide {
        match self {
            ConduitSide::Greeter => ConduitSide::Claimer,
            ConduitSide::Claimer => ConduitSide::Greeter,
        }
    }
}

impl fmt::Display for ConduitSide {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConduitSide::Greeter => f.write_str("greeter"),
            ConduitSide::Claimer => f.write_str("claimer"),
        }
    }
}

/// Identity of a conduit caller
///
/// Greeters are authenticated, so their user id is checked against the
/// invitation. Claimers are anonymous; holding the token is their identity.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ConduitRole {
    /// Authenticated member greeting the invitation
    Greeter(UserId),
    /// Anonymous claimer
    Claimer,
}

impl ConduitRole {
    /// Side of the conduit this role writes to
    pub fn side(&self) -> ConduitSide {
        match self {
            ConduitRole::Greeter(_) => ConduitSide::Greeter,
            ConduitRole::Claimer => ConduitSide::Claimer,
        }
    }

    /// Greeter user id, if this is a greeter
    pub fn greeter(&self) -> Option<&UserId> {
        match self {
            ConduitRole::Greeter(user_id) => Some(user_id),
            ConduitRole::Claimer => None,
        }
    }
}
