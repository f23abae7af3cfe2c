//! Core types shared by the frontdesk crates.
//!
//! This crate provides the contact and event identifiers and the error
//! handling foundation used by the transport boundary and the conversation
//! engine.

pub mod error;
pub mod id;

pub use error::Result;
pub use id::{ContactId, EventId, ParseIdError};
