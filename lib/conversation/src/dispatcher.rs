//! Reply delivery.
//!
//! Two send modes: typing-simulated (indicator on, wait, send, indicator off)
//! and plain (send now). Delivery is best effort. A failed step is logged and
//! the sequence carries on with the next one; nothing is retried.

use crate::catalog::{ReplyStep, StepDelivery};
use crate::config::DispatchConfig;
use crate::error::DispatchError;
use frontdesk_core::ContactId;
use frontdesk_transport::{MessagingClient, TransportError};
use std::future::Future;
use std::time::Duration;
use tracing::{debug, instrument, warn};

/// Outcome of delivering a reply sequence.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DeliveryReport {
    /// Steps the dispatcher tried to send.
    pub attempted: usize,
    /// Steps the transport accepted.
    pub delivered: usize,
}

impl DeliveryReport {
    #[must_use]
    pub fn failed(&self) -> usize {
        self.attempted - self.delivered
    }

    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.attempted == self.delivered
    }

    fn merge(&mut self, other: Self) {
        self.attempted += other.attempted;
        self.delivered += other.delivered;
    }
}

/// Sends replies through a messaging client.
pub struct ReplyDispatcher<C> {
    client: C,
    config: DispatchConfig,
}

impl<C: MessagingClient> ReplyDispatcher<C> {
    pub fn new(client: C, config: DispatchConfig) -> Self {
        Self { client, config }
    }

    /// Returns the underlying client.
    pub fn client(&self) -> &C {
        &self.client
    }

    /// Shows the typing indicator for `delay`, then sends `text`.
    ///
    /// Indicator failures are logged and do not stop the text from being sent.
    ///
    /// # Errors
    ///
    /// Returns an error if the text itself was not delivered.
    pub async fn send_typing(
        &self,
        contact: &ContactId,
        text: &str,
        delay: Duration,
    ) -> frontdesk_core::Result<(), DispatchError> {
        let typing_error = |source| DispatchError::Typing {
            contact: contact.clone(),
            source,
        };

        let shown = self.bounded(
            contact,
            "simulate_typing",
            self.config.typing_timeout(),
            typing_error,
            self.client.simulate_typing(contact),
        );
        if let Err(e) = shown.await {
            warn!(contact = %contact, error = %e, "typing indicator not shown");
        }

        tokio::time::sleep(delay).await;
        let sent = self.send_plain(contact, text).await;

        let cleared = self.bounded(
            contact,
            "clear_typing",
            self.config.typing_timeout(),
            typing_error,
            self.client.clear_typing(contact),
        );
        if let Err(e) = cleared.await {
            debug!(contact = %contact, error = %e, "typing indicator not cleared");
        }

        sent
    }

    /// Sends `text` immediately.
    ///
    /// # Errors
    ///
    /// Returns an error if the transport did not accept the text in time.
    pub async fn send_plain(
        &self,
        contact: &ContactId,
        text: &str,
    ) -> frontdesk_core::Result<(), DispatchError> {
        self.bounded(
            contact,
            "send_text",
            self.config.send_timeout(),
            |source| DispatchError::Send {
                contact: contact.clone(),
                source,
            },
            self.client.send_text(contact, text),
        )
        .await?;
        Ok(())
    }

    /// Sends every step in order. Failed steps are logged and skipped.
    #[instrument(skip(self, steps), fields(contact = %contact, steps = steps.len()))]
    pub async fn deliver(&self, contact: &ContactId, steps: &[ReplyStep]) -> DeliveryReport {
        let mut report = DeliveryReport::default();
        for step in steps {
            report.merge(self.deliver_step(contact, step).await);
        }
        if !report.is_complete() {
            warn!(
                attempted = report.attempted,
                failed = report.failed(),
                "reply sequence partially delivered"
            );
        }
        report
    }

    async fn deliver_step(&self, contact: &ContactId, step: &ReplyStep) -> DeliveryReport {
        let result = match step.delivery {
            StepDelivery::Typing { delay_ms } => {
                let delay = delay_ms
                    .map(Duration::from_millis)
                    .unwrap_or_else(|| self.config.typing_delay());
                self.send_typing(contact, &step.text, delay).await
            }
            StepDelivery::Plain => self.send_plain(contact, &step.text).await,
        };

        match result {
            Ok(()) => DeliveryReport {
                attempted: 1,
                delivered: 1,
            },
            Err(e) => {
                warn!(contact = %contact, error = %e, "reply not delivered");
                DeliveryReport {
                    attempted: 1,
                    delivered: 0,
                }
            }
        }
    }

    async fn bounded<T>(
        &self,
        contact: &ContactId,
        operation: &'static str,
        limit: Duration,
        wrap: impl FnOnce(TransportError) -> DispatchError,
        call: impl Future<Output = Result<T, TransportError>>,
    ) -> Result<T, DispatchError> {
        match tokio::time::timeout(limit, call).await {
            Ok(Ok(value)) => Ok(value),
            Ok(Err(source)) => Err(wrap(source)),
            Err(_) => Err(DispatchError::TimedOut {
                contact: contact.clone(),
                operation,
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use frontdesk_transport::{RecordingClient, TransportCall};
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn dispatcher() -> ReplyDispatcher<Arc<RecordingClient>> {
        ReplyDispatcher::new(Arc::new(RecordingClient::new()), DispatchConfig::default())
    }

    fn alice() -> ContactId {
        ContactId::new("1@c.us")
    }

    #[tokio::test(start_paused = true)]
    async fn typing_send_wraps_text_in_indicator() {
        let dispatcher = dispatcher();
        let started = tokio::time::Instant::now();

        dispatcher
            .send_typing(&alice(), "oi", Duration::from_millis(2500))
            .await
            .unwrap();

        assert!(started.elapsed() >= Duration::from_millis(2500));
        assert_eq!(
            dispatcher.client().calls(),
            vec![
                TransportCall::Typing { contact: alice() },
                TransportCall::Text {
                    contact: alice(),
                    text: "oi".to_string()
                },
                TransportCall::ClearTyping { contact: alice() },
            ]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn plain_send_skips_indicator_and_delay() {
        let dispatcher = dispatcher();
        let started = tokio::time::Instant::now();

        dispatcher.send_plain(&alice(), "hours").await.unwrap();

        assert!(started.elapsed() < Duration::from_millis(1));
        assert_eq!(dispatcher.client().calls().len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn deliver_uses_step_delay_override() {
        let dispatcher = dispatcher();
        let started = tokio::time::Instant::now();

        let report = dispatcher
            .deliver(
                &alice(),
                &[ReplyStep::typed_for("a", 1500), ReplyStep::plain("b")],
            )
            .await;

        assert!(report.is_complete());
        let elapsed = started.elapsed();
        assert!(elapsed >= Duration::from_millis(1500));
        assert!(elapsed < Duration::from_millis(2500));
        assert_eq!(dispatcher.client().texts_to(&alice()), vec!["a", "b"]);
    }

    #[tokio::test(start_paused = true)]
    async fn failed_sends_do_not_abort_the_sequence() {
        let dispatcher = dispatcher();
        dispatcher.client().set_fail_sends(true);

        let report = dispatcher
            .deliver(
                &alice(),
                &[ReplyStep::typed("a"), ReplyStep::plain("b"), ReplyStep::typed("c")],
            )
            .await;

        assert_eq!(report.attempted, 3);
        assert_eq!(report.delivered, 0);
        assert_eq!(report.failed(), 3);
        // The indicator is still toggled around every typed step.
        let typing = dispatcher
            .client()
            .calls()
            .into_iter()
            .filter(|c| matches!(c, TransportCall::Typing { .. }))
            .count();
        assert_eq!(typing, 2);
    }

    #[tokio::test(start_paused = true)]
    async fn typing_failure_still_sends_text() {
        let dispatcher = dispatcher();
        dispatcher.client().set_fail_typing(true);

        dispatcher
            .send_typing(&alice(), "oi", Duration::from_millis(10))
            .await
            .unwrap();

        assert_eq!(dispatcher.client().texts_to(&alice()), vec!["oi"]);
    }

    /// Client whose sends never complete.
    struct StalledClient {
        sends: AtomicUsize,
    }

    #[async_trait]
    impl MessagingClient for StalledClient {
        async fn send_text(&self, _contact: &ContactId, _text: &str) -> Result<(), TransportError> {
            self.sends.fetch_add(1, Ordering::SeqCst);
            std::future::pending().await
        }

        async fn simulate_typing(&self, _contact: &ContactId) -> Result<(), TransportError> {
            Ok(())
        }

        async fn clear_typing(&self, _contact: &ContactId) -> Result<(), TransportError> {
            Ok(())
        }

        async fn display_name(&self, _contact: &ContactId) -> Result<Option<String>, TransportError> {
            Ok(None)
        }
    }

    #[tokio::test(start_paused = true)]
    async fn stalled_send_times_out() {
        let dispatcher = ReplyDispatcher::new(
            StalledClient {
                sends: AtomicUsize::new(0),
            },
            DispatchConfig::default(),
        );

        let err = dispatcher.send_plain(&alice(), "oi").await.unwrap_err();

        assert!(err.to_string().contains("timed out"));
        assert_eq!(dispatcher.client().sends.load(Ordering::SeqCst), 1);
    }
}
