//! The messaging client trait.
//!
//! Every transport (a WhatsApp Web session, the console adapter, the
//! recording client used in tests) implements [`MessagingClient`]. Session
//! setup, pairing and reconnects stay on the transport's side of this trait.

use crate::error::TransportError;
use async_trait::async_trait;
use frontdesk_core::ContactId;
use std::sync::Arc;

/// Capabilities the conversation engine needs from the messaging network.
#[async_trait]
pub trait MessagingClient: Send + Sync {
    /// Sends a text message to a contact's chat.
    ///
    /// # Errors
    ///
    /// Returns an error if the network could not deliver the message.
    async fn send_text(&self, contact: &ContactId, text: &str) -> Result<(), TransportError>;

    /// Shows the "typing..." indicator in a contact's chat.
    async fn simulate_typing(&self, contact: &ContactId) -> Result<(), TransportError>;

    /// Clears the typing indicator in a contact's chat.
    async fn clear_typing(&self, contact: &ContactId) -> Result<(), TransportError>;

    /// Returns the contact's self-chosen display name, if the network knows one.
    async fn display_name(&self, contact: &ContactId) -> Result<Option<String>, TransportError>;
}

#[async_trait]
impl<T: MessagingClient + ?Sized> MessagingClient for Arc<T> {
    async fn send_text(&self, contact: &ContactId, text: &str) -> Result<(), TransportError> {
        (**self).send_text(contact, text).await
    }

    async fn simulate_typing(&self, contact: &ContactId) -> Result<(), TransportError> {
        (**self).simulate_typing(contact).await
    }

    async fn clear_typing(&self, contact: &ContactId) -> Result<(), TransportError> {
        (**self).clear_typing(contact).await
    }

    async fn display_name(&self, contact: &ContactId) -> Result<Option<String>, TransportError> {
        (**self).display_name(contact).await
    }
}
