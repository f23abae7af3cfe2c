//! Error types for the conversation crate.
//!
//! Errors are designed for layered context using rootcause:
//! - `StoreError`: Errors from the contact state store
//! - `DispatchError`: A single outbound send that did not go through
//! - `DeskError`: High-level wrapper identifying the event being handled
//!
//! None of these reach the contact. Dispatch errors are logged and dropped;
//! store errors end the current event only.

use frontdesk_core::{ContactId, EventId};
use frontdesk_transport::TransportError;
use std::fmt;

/// Errors from state store operations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// The backing store could not be read or written.
    Unavailable { reason: String },
}

impl fmt::Display for StoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unavailable { reason } => write!(f, "state store unavailable: {reason}"),
        }
    }
}

impl std::error::Error for StoreError {}

/// Errors from a single outbound delivery.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DispatchError {
    /// The transport refused the text.
    Send {
        contact: ContactId,
        source: TransportError,
    },
    /// The typing indicator could not be toggled.
    Typing {
        contact: ContactId,
        source: TransportError,
    },
    /// The transport did not answer within the configured bound.
    TimedOut {
        contact: ContactId,
        operation: &'static str,
    },
}

impl DispatchError {
    /// Returns the contact the failed delivery was addressed to.
    #[must_use]
    pub fn contact(&self) -> &ContactId {
        match self {
            Self::Send { contact, .. }
            | Self::Typing { contact, .. }
            | Self::TimedOut { contact, .. } => contact,
        }
    }
}

impl fmt::Display for DispatchError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Send { contact, source } => write!(f, "reply to {contact} not sent: {source}"),
            Self::Typing { contact, source } => {
                write!(f, "typing indicator for {contact} failed: {source}")
            }
            Self::TimedOut { contact, operation } => {
                write!(f, "{operation} for {contact} timed out")
            }
        }
    }
}

impl std::error::Error for DispatchError {}

/// High-level desk errors.
///
/// Use these to add context when wrapping lower-level errors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeskError {
    /// State store access failed while handling an event (context wrapper).
    StateStore { event: EventId, contact: ContactId },
    /// The runner has shut down and no longer accepts events.
    RunnerClosed,
}

impl fmt::Display for DeskError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::StateStore { event, contact } => {
                write!(f, "state store access failed for {contact} while handling {event}")
            }
            Self::RunnerClosed => write!(f, "desk runner is closed"),
        }
    }
}

impl std::error::Error for DeskError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn store_error_display() {
        let err = StoreError::Unavailable {
            reason: "lock poisoned".to_string(),
        };
        assert!(err.to_string().contains("lock poisoned"));
    }

    #[test]
    fn dispatch_error_names_contact() {
        let err = DispatchError::Send {
            contact: ContactId::new("1@c.us"),
            source: TransportError::Timeout,
        };
        assert_eq!(err.contact().as_str(), "1@c.us");
        assert!(err.to_string().contains("not sent"));

        let timeout = DispatchError::TimedOut {
            contact: ContactId::new("1@c.us"),
            operation: "send_text",
        };
        assert_eq!(timeout.to_string(), "send_text for 1@c.us timed out");
    }

    #[test]
    fn desk_error_display() {
        let err = DeskError::StateStore {
            event: EventId::new(),
            contact: ContactId::new("1@c.us"),
        };
        assert!(err.to_string().contains("1@c.us"));
    }
}
