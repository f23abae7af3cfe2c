//! Error types for the transport crate.

use frontdesk_core::ContactId;
use std::fmt;

/// Errors reported by a messaging client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportError {
    /// The network rejected or dropped an outbound message.
    SendFailed { contact: ContactId, reason: String },
    /// The messaging session is not connected.
    SessionUnavailable { reason: String },
    /// The contact (or its chat) is unknown to the transport.
    ContactNotFound { contact: ContactId },
    /// The transport did not answer in time.
    Timeout,
}

impl fmt::Display for TransportError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::SendFailed { contact, reason } => {
                write!(f, "send to {contact} failed: {reason}")
            }
            Self::SessionUnavailable { reason } => {
                write!(f, "messaging session unavailable: {reason}")
            }
            Self::ContactNotFound { contact } => write!(f, "contact not found: {contact}"),
            Self::Timeout => write!(f, "transport timed out"),
        }
    }
}

impl std::error::Error for TransportError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn send_failed_display() {
        let err = TransportError::SendFailed {
            contact: ContactId::new("123@c.us"),
            reason: "socket closed".to_string(),
        };
        assert!(err.to_string().contains("123@c.us"));
        assert!(err.to_string().contains("socket closed"));
    }

    #[test]
    fn contact_not_found_display() {
        let err = TransportError::ContactNotFound {
            contact: ContactId::new("999@c.us"),
        };
        assert_eq!(err.to_string(), "contact not found: 999@c.us");
    }
}
