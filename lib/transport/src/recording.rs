//! In-memory messaging client.
//!
//! Records every call it receives instead of talking to a network, so tests
//! can assert on exactly what a contact would have seen.

use crate::client::MessagingClient;
use crate::error::TransportError;
use async_trait::async_trait;
use frontdesk_core::ContactId;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, MutexGuard};

/// A call made against the client.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "call", rename_all = "snake_case")]
pub enum TransportCall {
    /// Typing indicator shown.
    Typing { contact: ContactId },
    /// Typing indicator cleared.
    ClearTyping { contact: ContactId },
    /// Text delivered.
    Text { contact: ContactId, text: String },
}

/// Messaging client that records calls in memory.
#[derive(Debug, Default)]
pub struct RecordingClient {
    calls: Mutex<Vec<TransportCall>>,
    display_names: Mutex<HashMap<ContactId, String>>,
    fail_sends: AtomicBool,
    fail_typing: AtomicBool,
}

impl RecordingClient {
    /// Creates an empty client.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a display name for a contact.
    pub fn set_display_name(&self, contact: impl Into<ContactId>, name: impl Into<String>) {
        if let Ok(mut names) = self.display_names.lock() {
            names.insert(contact.into(), name.into());
        }
    }

    /// Makes every subsequent `send_text` fail (or succeed again).
    pub fn set_fail_sends(&self, fail: bool) {
        self.fail_sends.store(fail, Ordering::SeqCst);
    }

    /// Makes every subsequent typing call fail (or succeed again).
    pub fn set_fail_typing(&self, fail: bool) {
        self.fail_typing.store(fail, Ordering::SeqCst);
    }

    /// Returns a snapshot of all recorded calls.
    #[must_use]
    pub fn calls(&self) -> Vec<TransportCall> {
        self.calls.lock().map(|c| c.clone()).unwrap_or_default()
    }

    /// Returns the texts delivered to a contact, in order.
    #[must_use]
    pub fn texts_to(&self, contact: &ContactId) -> Vec<String> {
        self.calls()
            .into_iter()
            .filter_map(|call| match call {
                TransportCall::Text { contact: to, text } if &to == contact => Some(text),
                _ => None,
            })
            .collect()
    }

    /// Forgets all recorded calls.
    pub fn clear(&self) {
        if let Ok(mut calls) = self.calls.lock() {
            calls.clear();
        }
    }

    fn record(&self, call: TransportCall) -> Result<(), TransportError> {
        self.lock_calls()?.push(call);
        Ok(())
    }

    fn lock_calls(&self) -> Result<MutexGuard<'_, Vec<TransportCall>>, TransportError> {
        self.calls
            .lock()
            .map_err(|_| TransportError::SessionUnavailable {
                reason: "call log poisoned".to_string(),
            })
    }

    fn typing_failure(&self) -> Result<(), TransportError> {
        if self.fail_typing.load(Ordering::SeqCst) {
            return Err(TransportError::SessionUnavailable {
                reason: "typing indicator rejected".to_string(),
            });
        }
        Ok(())
    }
}

#[async_trait]
impl MessagingClient for RecordingClient {
    async fn send_text(&self, contact: &ContactId, text: &str) -> Result<(), TransportError> {
        if self.fail_sends.load(Ordering::SeqCst) {
            return Err(TransportError::SendFailed {
                contact: contact.clone(),
                reason: "send rejected".to_string(),
            });
        }
        self.record(TransportCall::Text {
            contact: contact.clone(),
            text: text.to_string(),
        })
    }

    async fn simulate_typing(&self, contact: &ContactId) -> Result<(), TransportError> {
        self.typing_failure()?;
        self.record(TransportCall::Typing {
            contact: contact.clone(),
        })
    }

    async fn clear_typing(&self, contact: &ContactId) -> Result<(), TransportError> {
        self.typing_failure()?;
        self.record(TransportCall::ClearTyping {
            contact: contact.clone(),
        })
    }

    async fn display_name(&self, contact: &ContactId) -> Result<Option<String>, TransportError> {
        let names = self
            .display_names
            .lock()
            .map_err(|_| TransportError::SessionUnavailable {
                reason: "contact book poisoned".to_string(),
            })?;
        Ok(names.get(contact).cloned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn records_texts_per_contact() {
        let client = RecordingClient::new();
        let alice = ContactId::new("1@c.us");
        let bob = ContactId::new("2@c.us");

        client.send_text(&alice, "oi").await.unwrap();
        client.send_text(&bob, "menu").await.unwrap();
        client.send_text(&alice, "tchau").await.unwrap();

        assert_eq!(client.texts_to(&alice), vec!["oi", "tchau"]);
        assert_eq!(client.texts_to(&bob), vec!["menu"]);
    }

    #[tokio::test]
    async fn failing_sends_are_not_recorded() {
        let client = RecordingClient::new();
        let alice = ContactId::new("1@c.us");
        client.set_fail_sends(true);

        let err = client.send_text(&alice, "oi").await.unwrap_err();
        assert!(matches!(err, TransportError::SendFailed { .. }));
        assert!(client.calls().is_empty());

        client.set_fail_sends(false);
        client.send_text(&alice, "oi").await.unwrap();
        assert_eq!(client.calls().len(), 1);
    }

    #[tokio::test]
    async fn display_names_are_looked_up() {
        let client = RecordingClient::new();
        client.set_display_name("1@c.us", "Maria Souza");

        let known = client.display_name(&ContactId::new("1@c.us")).await.unwrap();
        let unknown = client.display_name(&ContactId::new("2@c.us")).await.unwrap();

        assert_eq!(known.as_deref(), Some("Maria Souza"));
        assert_eq!(unknown, None);
    }

    #[tokio::test]
    async fn typing_failures_are_reported() {
        let client = RecordingClient::new();
        let alice = ContactId::new("1@c.us");
        client.set_fail_typing(true);

        assert!(client.simulate_typing(&alice).await.is_err());
        assert!(client.clear_typing(&alice).await.is_err());
        client.send_text(&alice, "oi").await.unwrap();
        assert_eq!(client.calls().len(), 1);
    }

    #[test]
    fn call_serializes_with_tag() {
        let call = TransportCall::Text {
            contact: ContactId::new("1@c.us"),
            text: "oi".to_string(),
        };
        let json = serde_json::to_value(&call).unwrap();
        assert_eq!(json["call"], "text");
        assert_eq!(json["contact"], "1@c.us");
    }
}
