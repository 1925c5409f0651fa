//! Command outcomes handed back to the transport
//!
//! Protocol failures are ordinary replies here. Only storage and internal
//! errors stay in the `Err` channel.

use serde::{Deserialize, Serialize};
use vouch_core::{InviteError, InviteResult};

/// Reply to an authenticated (greeter) command
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum GreeterReply<T> {
    /// Command succeeded
    Ok(T),
    /// Token unknown, or not greeted by the caller
    NotFound,
    /// Invitation has been deleted
    AlreadyDeleted,
    /// Peer is at another step; the pairing must restart
    InvalidState,
}

impl<T> GreeterReply<T> {
    pub(crate) fn from_result(result: InviteResult<T>) -> InviteResult<Self> {
        match result {
            Ok(value) => Ok(GreeterReply::Ok(value)),
            Err(err) if !err.is_protocol() => Err(err),
            Err(InviteError::NotFound) => Ok(GreeterReply::NotFound),
            Err(InviteError::AlreadyDeleted) => Ok(GreeterReply::AlreadyDeleted),
            Err(_) => Ok(GreeterReply::InvalidState),
        }
    }

    /// Success value, if any
    pub fn ok(self) -> Option<T> {
        match self {
            GreeterReply::Ok(value) => Some(value),
            _ => None,
        }
    }
}

/// Reply to an anonymous (claimer) command that keeps the connection open
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ClaimerReply<T> {
    /// Command succeeded
    Ok(T),
    /// Peer is at another step; the pairing must restart
    InvalidState,
}

/// Outcome of a claimer command
///
/// `CloseConnection` is the only way to tell an anonymous caller that its
/// token is no longer usable. Transports must end the connection on it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ClaimerOutcome<T> {
    /// Answer the request
    Reply(ClaimerReply<T>),
    /// Invitation gone: terminate the transport
    CloseConnection,
}

impl<T> ClaimerOutcome<T> {
    pub(crate) fn from_result(result: InviteResult<T>) -> InviteResult<Self> {
        match result {
            Ok(value) => Ok(ClaimerOutcome::Reply(ClaimerReply::Ok(value))),
            Err(InviteError::InvalidState) => Ok(ClaimerOutcome::Reply(ClaimerReply::InvalidState)),
            Err(err) if err.is_gone() => Ok(ClaimerOutcome::CloseConnection),
            Err(err) => Err(err),
        }
    }

    /// Success value, if any
    pub fn ok(self) -> Option<T> {
        match self {
            ClaimerOutcome::Reply(ClaimerReply::Ok(value)) => Some(value),
            _ => None,
        }
    }

    /// Whether the transport must close the connection
    pub fn is_close(&self) -> bool {
        matches!(self, ClaimerOutcome::CloseConnection)
    }
}
