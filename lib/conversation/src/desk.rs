//! Event entry point.
//!
//! [`Desk`] turns one transport event into state changes and replies. Events
//! for the same contact never overlap: each contact has its own async mutex,
//! held for the whole event including every outbound send. The mutex exists
//! only while some event for the contact is in flight.
//!
//! [`DeskRunner`] feeds a stream of events through the desk with one FIFO
//! lane per contact, so unrelated contacts are served in parallel while each
//! contact's replies stay in arrival order. A lane is retired as soon as every
//! event queued on it has been handled.

use crate::config::DeskConfig;
use crate::dispatcher::{DeliveryReport, ReplyDispatcher};
use crate::error::DeskError;
use crate::operator::{OperatorCommand, OperatorHandler, OperatorOutcome};
use crate::router::{InboundRouter, InboundRule, Transition};
use crate::state::{ConversationState, StateStore};
use frontdesk_core::ContactId;
use frontdesk_transport::{MessageEvent, MessagingClient, TransportEvent};
use rootcause::prelude::ResultExt;
use std::collections::HashMap;
use std::collections::hash_map::Entry;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, PoisonError};
use tokio::sync::mpsc::error::TrySendError;
use tokio::sync::{Mutex, mpsc};
use tokio::task::{JoinHandle, JoinSet};
use tracing::{debug, error, info, instrument, warn};

type ContactLocks = std::sync::Mutex<HashMap<ContactId, Arc<Mutex<()>>>>;

/// Why an event was dropped without reaching a handler.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IgnoreReason {
    /// Inbound message with neither text nor attachment.
    Blank,
    /// Inbound copy of a message the operator sent.
    SelfOriginated,
    /// Sender is not a personal chat (group, broadcast, status).
    NotAContact,
    /// Outbound message that did not come from the operator's account.
    NotFromOperator,
    /// Operator message that is not a control command.
    NotACommand,
}

/// What handling an event did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EventOutcome {
    Ignored(IgnoreReason),
    /// A contact message went through the router.
    Routed {
        rule: InboundRule,
        state: ConversationState,
        delivery: DeliveryReport,
    },
    /// An operator command was applied.
    Operator(OperatorOutcome),
}

/// The conversation engine.
pub struct Desk<S, C> {
    store: S,
    dispatcher: ReplyDispatcher<C>,
    router: InboundRouter,
    operator: OperatorHandler,
    contact_suffix: Option<String>,
    contact_locks: ContactLocks,
}

impl<S: StateStore, C: MessagingClient> Desk<S, C> {
    pub fn new(store: S, client: C, config: &DeskConfig) -> Self {
        Self {
            store,
            dispatcher: ReplyDispatcher::new(client, config.dispatch.clone()),
            router: InboundRouter::new(config.fallback_display_name.clone()),
            operator: OperatorHandler,
            contact_suffix: config.contact_suffix.clone(),
            contact_locks: ContactLocks::default(),
        }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn client(&self) -> &C {
        self.dispatcher.client()
    }

    /// Number of contacts with an event in flight.
    #[must_use]
    pub fn active_contacts(&self) -> usize {
        self.contact_locks
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// Handles one transport event.
    ///
    /// # Errors
    ///
    /// Returns an error if the state store fails. The event is abandoned at
    /// that point; replies already sent are not taken back.
    pub async fn handle(
        &self,
        event: &TransportEvent,
    ) -> frontdesk_core::Result<EventOutcome, DeskError> {
        match event {
            TransportEvent::Inbound(message) => self.handle_inbound(message).await,
            TransportEvent::Outbound(message) => self.handle_outbound(message).await,
        }
    }

    /// Handles a message received on the account.
    ///
    /// # Errors
    ///
    /// Returns an error if the state store fails.
    #[instrument(skip_all, fields(event = %message.id, contact = %message.sender))]
    pub async fn handle_inbound(
        &self,
        message: &MessageEvent,
    ) -> frontdesk_core::Result<EventOutcome, DeskError> {
        if let Some(reason) = self.inbound_filter(message) {
            debug!(reason = ?reason, "inbound message ignored");
            return Ok(EventOutcome::Ignored(reason));
        }

        let contact = &message.sender;
        let slot = self.contact_slot(contact);
        let _guard = slot.lock().await;

        let state = self
            .store
            .get(contact)
            .await
            .context(self.store_context(message, contact))?;

        let routed = self
            .router
            .route(state, contact, &message.body, self.dispatcher.client())
            .await;
        let delivery = self.dispatcher.deliver(contact, &routed.replies).await;

        let next = routed.transition.apply(state);
        match routed.transition {
            Transition::Keep => {}
            Transition::Reset => self
                .store
                .clear(contact)
                .await
                .context(self.store_context(message, contact))?,
            Transition::Enter(entered) => self
                .store
                .set(contact, entered)
                .await
                .context(self.store_context(message, contact))?,
        }

        if next != state {
            info!(rule = routed.rule.name(), from = %state, to = %next, "conversation state changed");
            if let Some(tracked) = self.store.tracked_contacts() {
                debug!(tracked, "contacts held outside idle");
            }
        }

        Ok(EventOutcome::Routed {
            rule: routed.rule,
            state: next,
            delivery,
        })
    }

    /// Handles a message sent from the account.
    ///
    /// # Errors
    ///
    /// Returns an error if the state store fails.
    #[instrument(skip_all, fields(event = %message.id, contact = %message.recipient))]
    pub async fn handle_outbound(
        &self,
        message: &MessageEvent,
    ) -> frontdesk_core::Result<EventOutcome, DeskError> {
        if !message.from_self {
            return Ok(EventOutcome::Ignored(IgnoreReason::NotFromOperator));
        }
        if OperatorCommand::parse(&message.body).is_none() {
            return Ok(EventOutcome::Ignored(IgnoreReason::NotACommand));
        }

        let target = &message.recipient;
        let slot = self.contact_slot(target);
        let _guard = slot.lock().await;

        let outcome = self
            .operator
            .handle(&self.store, &self.dispatcher, target, &message.body)
            .await
            .context(self.store_context(message, target))?;

        Ok(EventOutcome::Operator(outcome))
    }

    fn inbound_filter(&self, message: &MessageEvent) -> Option<IgnoreReason> {
        if message.from_self {
            return Some(IgnoreReason::SelfOriginated);
        }
        if let Some(suffix) = &self.contact_suffix
            && !message.sender.has_suffix(suffix)
        {
            return Some(IgnoreReason::NotAContact);
        }
        if message.is_blank() {
            return Some(IgnoreReason::Blank);
        }
        None
    }

    fn contact_slot(&self, contact: &ContactId) -> ContactSlot<'_> {
        let mut locks = self
            .contact_locks
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        let lock = locks
            .entry(contact.clone())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone();
        ContactSlot {
            locks: &self.contact_locks,
            contact: contact.clone(),
            lock,
        }
    }

    fn store_context(&self, message: &MessageEvent, contact: &ContactId) -> DeskError {
        DeskError::StateStore {
            event: message.id,
            contact: contact.clone(),
        }
    }
}

/// A contact's lock, held by one in-flight event.
///
/// Dropping the last slot for a contact removes its entry from the lock map.
struct ContactSlot<'a> {
    locks: &'a ContactLocks,
    contact: ContactId,
    lock: Arc<Mutex<()>>,
}

impl ContactSlot<'_> {
    async fn lock(&self) -> tokio::sync::MutexGuard<'_, ()> {
        self.lock.lock().await
    }
}

impl Drop for ContactSlot<'_> {
    fn drop(&mut self) {
        let mut locks = self.locks.lock().unwrap_or_else(PoisonError::into_inner);
        // Clones are only handed out under the map lock, so the count is exact
        // here: one for the map, one for this slot.
        if Arc::strong_count(&self.lock) == 2 {
            locks.remove(&self.contact);
        }
    }
}

/// Runs a desk over a stream of events with one lane per contact.
pub struct DeskRunner {
    events: mpsc::Sender<TransportEvent>,
    router: JoinHandle<()>,
    open_lanes: Arc<AtomicUsize>,
}

impl DeskRunner {
    /// Starts the runner on the current tokio runtime.
    ///
    /// `lane_capacity` bounds both the shared intake queue and each contact's
    /// lane. Events for a contact whose lane is full are dropped with a
    /// warning; other contacts are unaffected.
    pub fn spawn<S, C>(desk: Arc<Desk<S, C>>, lane_capacity: usize) -> Self
    where
        S: StateStore + 'static,
        C: MessagingClient + 'static,
    {
        let lane_capacity = lane_capacity.max(1);
        let (events, rx) = mpsc::channel(lane_capacity);
        let open_lanes = Arc::new(AtomicUsize::new(0));
        let router = tokio::spawn(route_events(
            desk,
            rx,
            lane_capacity,
            Arc::clone(&open_lanes),
        ));
        Self {
            events,
            router,
            open_lanes,
        }
    }

    /// Queues an event.
    ///
    /// # Errors
    ///
    /// Returns an error if the runner has shut down.
    pub async fn submit(&self, event: TransportEvent) -> frontdesk_core::Result<(), DeskError> {
        self.events
            .send(event)
            .await
            .map_err(|_| DeskError::RunnerClosed)?;
        Ok(())
    }

    /// Number of contacts with events queued or in flight.
    #[must_use]
    pub fn open_lanes(&self) -> usize {
        self.open_lanes.load(Ordering::SeqCst)
    }

    /// Stops accepting events and waits until every queued event is handled.
    pub async fn shutdown(self) {
        drop(self.events);
        if let Err(e) = self.router.await {
            error!(error = %e, "desk runner task failed");
        }
    }
}

struct Lane {
    events: mpsc::Sender<TransportEvent>,
    pending: usize,
}

async fn route_events<S, C>(
    desk: Arc<Desk<S, C>>,
    mut rx: mpsc::Receiver<TransportEvent>,
    lane_capacity: usize,
    open_lanes: Arc<AtomicUsize>,
) where
    S: StateStore + 'static,
    C: MessagingClient + 'static,
{
    let mut lanes: HashMap<ContactId, Lane> = HashMap::new();
    let mut workers = JoinSet::new();
    let (done_tx, mut done_rx) = mpsc::unbounded_channel::<ContactId>();

    loop {
        tokio::select! {
            Some(contact) = done_rx.recv() => {
                // A lane is dropped only once everything sent to it was handled,
                // so its worker sees the channel close with nothing left queued.
                if let Entry::Occupied(mut lane) = lanes.entry(contact) {
                    let state = lane.get_mut();
                    state.pending = state.pending.saturating_sub(1);
                    if state.pending == 0 {
                        debug!(contact = %lane.key(), "contact lane retired");
                        lane.remove();
                    }
                }
            }
            Some(joined) = workers.join_next(), if !workers.is_empty() => {
                if let Err(e) = joined {
                    error!(error = %e, "contact lane task failed");
                }
            }
            event = rx.recv() => {
                let Some(event) = event else { break };
                let contact = event.conversation_contact().clone();
                let lane = lanes.entry(contact.clone()).or_insert_with(|| {
                    let (tx, lane_rx) = mpsc::channel(lane_capacity);
                    workers.spawn(serve_lane(
                        Arc::clone(&desk),
                        contact.clone(),
                        lane_rx,
                        done_tx.clone(),
                    ));
                    Lane {
                        events: tx,
                        pending: 0,
                    }
                });

                match lane.events.try_send(event) {
                    Ok(()) => lane.pending += 1,
                    Err(TrySendError::Full(event)) => {
                        warn!(
                            contact = %contact,
                            event = %event.message().id,
                            "contact lane full, event dropped"
                        );
                    }
                    Err(TrySendError::Closed(event)) => {
                        error!(
                            contact = %contact,
                            event = %event.message().id,
                            "contact lane closed, event dropped"
                        );
                        lanes.remove(&contact);
                    }
                }
            }
        }
        open_lanes.store(lanes.len(), Ordering::SeqCst);
    }

    // Closing the lanes lets each worker drain its queue and exit.
    lanes.clear();
    open_lanes.store(0, Ordering::SeqCst);
    while let Some(joined) = workers.join_next().await {
        if let Err(e) = joined {
            error!(error = %e, "contact lane task failed");
        }
    }
}

async fn serve_lane<S, C>(
    desk: Arc<Desk<S, C>>,
    contact: ContactId,
    mut events: mpsc::Receiver<TransportEvent>,
    done: mpsc::UnboundedSender<ContactId>,
) where
    S: StateStore,
    C: MessagingClient,
{
    while let Some(event) = events.recv().await {
        if let Err(e) = desk.handle(&event).await {
            error!(contact = %contact, error = %e, "event handling failed");
        }
        // The router is gone during shutdown; nothing to report to then.
        let _ = done.send(contact.clone());
    }
}
