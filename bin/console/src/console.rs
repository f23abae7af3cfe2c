//! JSON-lines transport.
//!
//! Input lines are [`ConsoleInput`] values. Every call the desk makes against
//! [`ConsoleClient`] is forwarded as a [`TransportCall`] to a writer task that
//! prints one JSON object per line.

use async_trait::async_trait;
use frontdesk_core::ContactId;
use frontdesk_transport::{MessageEvent, MessagingClient, TransportCall, TransportError, TransportEvent};
use serde::Deserialize;
use std::collections::HashMap;
use std::sync::RwLock;
use tokio::io::{AsyncWrite, AsyncWriteExt};
use tokio::sync::mpsc;
use tracing::warn;

/// One line of console input.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ConsoleInput {
    /// A complete inbound event.
    Inbound(MessageEvent),
    /// A complete outbound event.
    Outbound(MessageEvent),
    /// Short form: a contact writes to the operator's account.
    Message {
        from: ContactId,
        #[serde(default)]
        body: String,
        #[serde(default)]
        has_media: bool,
    },
    /// Short form: the operator writes into a contact's chat.
    Operator { to: ContactId, body: String },
    /// Registers the display name the transport reports for a contact.
    Contact {
        id: ContactId,
        display_name: String,
    },
}

/// What the host should do with a parsed line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConsoleCommand {
    Submit(TransportEvent),
    RegisterContact {
        id: ContactId,
        display_name: String,
    },
}

impl ConsoleInput {
    /// Resolves short forms against the operator's address.
    #[must_use]
    pub fn into_command(self, operator: &ContactId) -> ConsoleCommand {
        match self {
            Self::Inbound(message) => ConsoleCommand::Submit(TransportEvent::Inbound(message)),
            Self::Outbound(message) => ConsoleCommand::Submit(TransportEvent::Outbound(message)),
            Self::Message {
                from,
                body,
                has_media,
            } => {
                let mut message = MessageEvent::from_contact(from, operator.clone(), body);
                message.has_media = has_media;
                ConsoleCommand::Submit(TransportEvent::Inbound(message))
            }
            Self::Operator { to, body } => ConsoleCommand::Submit(TransportEvent::Outbound(
                MessageEvent::from_operator(operator.clone(), to, body),
            )),
            Self::Contact { id, display_name } => {
                ConsoleCommand::RegisterContact { id, display_name }
            }
        }
    }
}

/// Parses one input line. Blank lines yield `None`.
///
/// # Errors
///
/// Returns an error if the line is not a valid [`ConsoleInput`].
pub fn parse_line(
    line: &str,
    operator: &ContactId,
) -> Result<Option<ConsoleCommand>, serde_json::Error> {
    let line = line.trim();
    if line.is_empty() {
        return Ok(None);
    }
    let input: ConsoleInput = serde_json::from_str(line)?;
    Ok(Some(input.into_command(operator)))
}

/// Messaging client that forwards every call to the output channel.
#[derive(Debug)]
pub struct ConsoleClient {
    calls: mpsc::UnboundedSender<TransportCall>,
    display_names: RwLock<HashMap<ContactId, String>>,
}

impl ConsoleClient {
    /// Creates a client and the receiving end of its call stream.
    #[must_use]
    pub fn channel() -> (Self, mpsc::UnboundedReceiver<TransportCall>) {
        let (calls, rx) = mpsc::unbounded_channel();
        let client = Self {
            calls,
            display_names: RwLock::new(HashMap::new()),
        };
        (client, rx)
    }

    /// Sets the display name reported for a contact.
    pub fn register_contact(&self, id: ContactId, display_name: String) {
        match self.display_names.write() {
            Ok(mut names) => {
                names.insert(id, display_name);
            }
            Err(_) => warn!(contact = %id, "contact book poisoned, display name dropped"),
        }
    }

    fn forward(&self, call: TransportCall) -> Result<(), TransportError> {
        self.calls
            .send(call)
            .map_err(|_| TransportError::SessionUnavailable {
                reason: "console output closed".to_string(),
            })
    }
}

#[async_trait]
impl MessagingClient for ConsoleClient {
    async fn send_text(&self, contact: &ContactId, text: &str) -> Result<(), TransportError> {
        self.forward(TransportCall::Text {
            contact: contact.clone(),
            text: text.to_string(),
        })
    }

    async fn simulate_typing(&self, contact: &ContactId) -> Result<(), TransportError> {
        self.forward(TransportCall::Typing {
            contact: contact.clone(),
        })
    }

    async fn clear_typing(&self, contact: &ContactId) -> Result<(), TransportError> {
        self.forward(TransportCall::ClearTyping {
            contact: contact.clone(),
        })
    }

    async fn display_name(&self, contact: &ContactId) -> Result<Option<String>, TransportError> {
        let names = self
            .display_names
            .read()
            .map_err(|_| TransportError::SessionUnavailable {
                reason: "contact book poisoned".to_string(),
            })?;
        Ok(names.get(contact).cloned())
    }
}

/// Writes each call as a JSON line until every client handle is dropped.
///
/// # Errors
///
/// Returns an error if writing to `out` fails.
pub async fn write_calls<W>(
    mut calls: mpsc::UnboundedReceiver<TransportCall>,
    mut out: W,
) -> std::io::Result<()>
where
    W: AsyncWrite + Unpin,
{
    while let Some(call) = calls.recv().await {
        let mut line = serde_json::to_vec(&call)?;
        line.push(b'\n');
        out.write_all(&line).await?;
        out.flush().await?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn operator() -> ContactId {
        ContactId::new("me@c.us")
    }

    #[test]
    fn short_message_becomes_inbound_to_operator() {
        let command = parse_line(
            r#"{"kind":"message","from":"5563911111111@c.us","body":"oi"}"#,
            &operator(),
        )
        .unwrap()
        .unwrap();

        let ConsoleCommand::Submit(TransportEvent::Inbound(message)) = command else {
            panic!("expected inbound event");
        };
        assert_eq!(message.sender.as_str(), "5563911111111@c.us");
        assert_eq!(message.recipient, operator());
        assert_eq!(message.body, "oi");
        assert!(!message.from_self);
    }

    #[test]
    fn short_operator_line_becomes_self_sent_outbound() {
        let command = parse_line(
            r#"{"kind":"operator","to":"5563911111111@c.us","body":"!bot_desativar"}"#,
            &operator(),
        )
        .unwrap()
        .unwrap();

        let ConsoleCommand::Submit(TransportEvent::Outbound(message)) = command else {
            panic!("expected outbound event");
        };
        assert_eq!(message.sender, operator());
        assert_eq!(message.recipient.as_str(), "5563911111111@c.us");
        assert!(message.from_self);
    }

    #[test]
    fn full_events_pass_through() {
        let command = parse_line(
            r#"{"kind":"inbound","sender":"1@g.us","recipient":"me@c.us","body":"menu","from_self":true}"#,
            &operator(),
        )
        .unwrap()
        .unwrap();

        let ConsoleCommand::Submit(TransportEvent::Inbound(message)) = command else {
            panic!("expected inbound event");
        };
        assert_eq!(message.sender.as_str(), "1@g.us");
        assert!(message.from_self);
    }

    #[test]
    fn contact_line_registers_display_name() {
        let command = parse_line(
            r#"{"kind":"contact","id":"1@c.us","display_name":"Maria Souza"}"#,
            &operator(),
        )
        .unwrap();

        assert_eq!(
            command,
            Some(ConsoleCommand::RegisterContact {
                id: ContactId::new("1@c.us"),
                display_name: "Maria Souza".to_string(),
            })
        );
    }

    #[test]
    fn blank_and_malformed_lines() {
        assert_eq!(parse_line("   ", &operator()).unwrap(), None);
        assert!(parse_line("oi", &operator()).is_err());
        assert!(parse_line(r#"{"kind":"sms"}"#, &operator()).is_err());
    }

    #[tokio::test]
    async fn client_calls_are_written_as_json_lines() {
        let (client, calls) = ConsoleClient::channel();
        let alice = ContactId::new("1@c.us");
        client.register_contact(alice.clone(), "Maria".to_string());

        client.simulate_typing(&alice).await.unwrap();
        client.send_text(&alice, "oi").await.unwrap();
        assert_eq!(
            client.display_name(&alice).await.unwrap().as_deref(),
            Some("Maria")
        );
        drop(client);

        let mut out = Vec::new();
        write_calls(calls, &mut out).await.unwrap();

        let lines: Vec<serde_json::Value> = String::from_utf8(out)
            .unwrap()
            .lines()
            .map(|l| serde_json::from_str(l).unwrap())
            .collect();
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0]["call"], "typing");
        assert_eq!(lines[1]["call"], "text");
        assert_eq!(lines[1]["text"], "oi");
    }

    #[tokio::test]
    async fn closed_output_is_a_session_error() {
        let (client, calls) = ConsoleClient::channel();
        drop(calls);

        let err = client
            .send_text(&ContactId::new("1@c.us"), "oi")
            .await
            .unwrap_err();
        assert!(matches!(err, TransportError::SessionUnavailable { .. }));
    }
}
