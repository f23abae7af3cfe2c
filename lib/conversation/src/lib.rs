//! Conversation engine for the frontdesk assistant.
//!
//! This crate provides:
//!
//! - **State Store**: per-contact conversation state
//! - **Inbound Router**: ordered rules turning a contact message into replies
//! - **Operator Handler**: `!bot_*` control commands for human takeover
//! - **Reply Dispatcher**: best-effort delivery with simulated typing
//! - **Catalog**: the fixed menu and reply texts
//! - **Desk**: event entry point with per-contact serialization

pub mod catalog;
pub mod config;
pub mod desk;
pub mod dispatcher;
pub mod error;
pub mod operator;
pub mod router;
pub mod state;

pub use catalog::{MenuOption, ReplyStep, StepDelivery};
pub use config::{DeskConfig, DispatchConfig};
pub use desk::{Desk, DeskRunner, EventOutcome, IgnoreReason};
pub use dispatcher::{DeliveryReport, ReplyDispatcher};
pub use error::{DeskError, DispatchError, StoreError};
pub use operator::{OperatorCommand, OperatorHandler, OperatorOutcome};
pub use router::{InboundRouter, InboundRule, RoutedReply, Transition, normalize};
pub use state::{ConversationState, InMemoryStateStore, StateStore};
