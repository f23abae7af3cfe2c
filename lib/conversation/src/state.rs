//! Per-contact conversation state.
//!
//! A contact is in exactly one [`ConversationState`] at a time. Contacts the
//! store has no entry for are `Idle`; setting `Idle` removes the entry.

use crate::error::StoreError;
use async_trait::async_trait;
use frontdesk_core::ContactId;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

/// Where a contact is in the conversation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConversationState {
    /// No flow in progress.
    #[default]
    Idle,
    /// The bot asked for consultation details and waits for one free-text reply.
    AwaitingIntakeData,
    /// A human is handling the contact; the bot stays silent.
    AwaitingHuman,
}

impl ConversationState {
    /// Returns true if the bot must not answer this contact.
    #[must_use]
    pub fn is_silenced(&self) -> bool {
        matches!(self, Self::AwaitingHuman)
    }

    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::AwaitingIntakeData => "awaiting_intake_data",
            Self::AwaitingHuman => "awaiting_human",
        }
    }
}

impl fmt::Display for ConversationState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Storage for contact states.
///
/// The desk serializes events per contact, so implementations only need to
/// make individual calls atomic.
#[async_trait]
pub trait StateStore: Send + Sync {
    /// Returns the contact's state, `Idle` if unknown.
    async fn get(&self, contact: &ContactId) -> Result<ConversationState, StoreError>;

    /// Sets the contact's state. Setting `Idle` is the same as [`clear`](Self::clear).
    async fn set(&self, contact: &ContactId, state: ConversationState) -> Result<(), StoreError>;

    /// Returns the contact to `Idle`.
    async fn clear(&self, contact: &ContactId) -> Result<(), StoreError>;

    /// Number of contacts held outside `Idle`, if the store can tell cheaply.
    fn tracked_contacts(&self) -> Option<usize> {
        None
    }
}

/// Process-lifetime state store.
///
/// Entries are never evicted: every contact that was ever moved out of `Idle`
/// and not moved back keeps one entry until the process exits.
#[derive(Debug, Default)]
pub struct InMemoryStateStore {
    states: RwLock<HashMap<ContactId, ConversationState>>,
}

impl InMemoryStateStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of contacts currently outside `Idle`.
    #[must_use]
    pub fn len(&self) -> usize {
        self.states.read().map(|s| s.len()).unwrap_or_default()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, HashMap<ContactId, ConversationState>>, StoreError> {
        self.states.read().map_err(|_| StoreError::Unavailable {
            reason: "state map poisoned".to_string(),
        })
    }

    fn write(
        &self,
    ) -> Result<RwLockWriteGuard<'_, HashMap<ContactId, ConversationState>>, StoreError> {
        self.states.write().map_err(|_| StoreError::Unavailable {
            reason: "state map poisoned".to_string(),
        })
    }
}

#[async_trait]
impl StateStore for InMemoryStateStore {
    async fn get(&self, contact: &ContactId) -> Result<ConversationState, StoreError> {
        Ok(self.read()?.get(contact).copied().unwrap_or_default())
    }

    async fn set(&self, contact: &ContactId, state: ConversationState) -> Result<(), StoreError> {
        let mut states = self.write()?;
        if state == ConversationState::Idle {
            states.remove(contact);
        } else {
            states.insert(contact.clone(), state);
        }
        Ok(())
    }

    async fn clear(&self, contact: &ContactId) -> Result<(), StoreError> {
        self.write()?.remove(contact);
        Ok(())
    }

    fn tracked_contacts(&self) -> Option<usize> {
        Some(self.len())
    }
}
