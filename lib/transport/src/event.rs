//! Events emitted by the messaging transport.

use chrono::{DateTime, Utc};
use frontdesk_core::{ContactId, EventId};
use serde::{Deserialize, Serialize};

/// A single message observed on the operator's account.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageEvent {
    /// Event identifier, generated when absent.
    #[serde(default)]
    pub id: EventId,
    /// Address that sent the message.
    pub sender: ContactId,
    /// Address the message was sent to.
    pub recipient: ContactId,
    /// Raw text body, exactly as typed.
    #[serde(default)]
    pub body: String,
    /// Whether a non-text attachment (image, audio, document) is present.
    #[serde(default)]
    pub has_media: bool,
    /// Whether the message originated from the operator's own account.
    #[serde(default)]
    pub from_self: bool,
    /// When the transport observed the message.
    #[serde(default = "Utc::now")]
    pub received_at: DateTime<Utc>,
}

impl MessageEvent {
    /// Creates a message a contact sent to the operator's account.
    #[must_use]
    pub fn from_contact(
        sender: impl Into<ContactId>,
        recipient: impl Into<ContactId>,
        body: impl Into<String>,
    ) -> Self {
        Self {
            id: EventId::new(),
            sender: sender.into(),
            recipient: recipient.into(),
            body: body.into(),
            has_media: false,
            from_self: false,
            received_at: Utc::now(),
        }
    }

    /// Creates a message the operator sent from their own account.
    #[must_use]
    pub fn from_operator(
        operator: impl Into<ContactId>,
        recipient: impl Into<ContactId>,
        body: impl Into<String>,
    ) -> Self {
        Self {
            from_self: true,
            ..Self::from_contact(operator, recipient, body)
        }
    }

    /// Marks the message as carrying a non-text attachment.
    #[must_use]
    pub fn with_media(mut self) -> Self {
        self.has_media = true;
        self
    }

    /// Returns true if the message has neither a text body nor an attachment.
    #[must_use]
    pub fn is_blank(&self) -> bool {
        self.body.is_empty() && !self.has_media
    }
}

/// An event delivered by the transport.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TransportEvent {
    /// A message arrived on the account.
    Inbound(MessageEvent),
    /// A message was sent from the account.
    Outbound(MessageEvent),
}

impl TransportEvent {
    /// Returns the underlying message.
    #[must_use]
    pub fn message(&self) -> &MessageEvent {
        match self {
            Self::Inbound(message) | Self::Outbound(message) => message,
        }
    }

    /// Returns the contact whose conversation this event belongs to.
    ///
    /// Inbound messages belong to their sender. Outbound messages belong to
    /// the chat the operator is typing into, i.e. their recipient.
    #[must_use]
    pub fn conversation_contact(&self) -> &ContactId {
        match self {
            Self::Inbound(message) => &message.sender,
            Self::Outbound(message) => &message.recipient,
        }
    }
}
