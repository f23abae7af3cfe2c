//! Messaging transport boundary for frontdesk.
//!
//! The conversation engine never talks to a messaging network directly. It
//! receives [`TransportEvent`]s and calls back into a [`MessagingClient`].
//!
//! - **Events**: inbound contact messages and outbound operator messages
//! - **Client**: send text, simulate typing, look up display names
//! - **Recording client**: in-memory client that records every call

pub mod client;
pub mod error;
pub mod event;
pub mod recording;

pub use client::MessagingClient;
pub use error::TransportError;
pub use event::{MessageEvent, TransportEvent};
pub use recording::{RecordingClient, TransportCall};
