//! In-memory message bus for test-session orchestration.

use crate::server_test::{
    domain::{LifecycleEvent, McpServerTestRequest, TestSessionId},
    ports::{
        BusError, BusResult, LifecycleSubscription, SubscriptionDrain, TestSessionBus,
        wire::{self, REQUEST_SUBJECT},
    },
};
use async_trait::async_trait;
use futures::StreamExt;
use futures::channel::mpsc::{self, UnboundedSender};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

/// In-memory stand-in for the worker message bus.
///
/// Published requests are encoded with the wire codec and kept for
/// inspection; tests play the worker by pushing lifecycle payloads onto a
/// session's subject. Failure switches let tests exercise transport errors.
#[derive(Debug, Clone, Default)]
pub struct InMemoryTestSessionBus {
    state: Arc<Mutex<InMemoryBusState>>,
}

#[derive(Debug, Default)]
struct InMemoryBusState {
    published: Vec<(String, Vec<u8>)>,
    subscribers: HashMap<String, UnboundedSender<BusResult<Vec<u8>>>>,
    drained: Vec<String>,
    reject_publish: bool,
    reject_subscribe: bool,
    reject_drain: bool,
}

fn poisoned(err: impl ToString) -> BusError {
    BusError::transport(std::io::Error::other(err.to_string()))
}

impl InMemoryTestSessionBus {
    /// Creates an empty bus.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> BusResult<MutexGuard<'_, InMemoryBusState>> {
        self.state.lock().map_err(poisoned)
    }

    /// Makes subsequent publishes fail.
    ///
    /// # Errors
    ///
    /// Returns a transport error when lock acquisition fails.
    pub fn reject_publishes(&self, reject: bool) -> BusResult<()> {
        self.lock()?.reject_publish = reject;
        Ok(())
    }

    /// Makes subsequent subscriptions fail.
    ///
    /// # Errors
    ///
    /// Returns a transport error when lock acquisition fails.
    pub fn reject_subscriptions(&self, reject: bool) -> BusResult<()> {
        self.lock()?.reject_subscribe = reject;
        Ok(())
    }

    /// Makes subsequent drains fail.
    ///
    /// # Errors
    ///
    /// Returns a transport error when lock acquisition fails.
    pub fn reject_drains(&self, reject: bool) -> BusResult<()> {
        self.lock()?.reject_drain = reject;
        Ok(())
    }

    /// Returns every request published so far, decoded from the wire.
    ///
    /// # Errors
    ///
    /// Returns a transport error when lock acquisition fails or a stored
    /// payload no longer decodes.
    pub fn published_requests(&self) -> BusResult<Vec<McpServerTestRequest>> {
        let state = self.lock()?;
        state
            .published
            .iter()
            .filter(|(subject, _)| subject == REQUEST_SUBJECT)
            .map(|(_, payload)| wire::decode_request(payload).map_err(BusError::transport))
            .collect()
    }

    /// Returns whether a live subscription exists for `session_id`.
    ///
    /// # Errors
    ///
    /// Returns a transport error when lock acquisition fails.
    pub fn is_subscribed(&self, session_id: &TestSessionId) -> BusResult<bool> {
        let subject = wire::lifecycle_subject(session_id);
        Ok(self.lock()?.subscribers.contains_key(&subject))
    }

    /// Returns the subjects whose subscriptions were drained, in order.
    ///
    /// # Errors
    ///
    /// Returns a transport error when lock acquisition fails.
    pub fn drained_subjects(&self) -> BusResult<Vec<String>> {
        Ok(self.lock()?.drained.clone())
    }

    /// Delivers a raw payload on a session's lifecycle subject.
    ///
    /// Returns `false` when nobody is subscribed, mirroring a bus that drops
    /// messages without interest.
    ///
    /// # Errors
    ///
    /// Returns a transport error when lock acquisition fails.
    pub fn deliver_raw(&self, session_id: &TestSessionId, payload: Vec<u8>) -> BusResult<bool> {
        self.deliver(session_id, Ok(payload))
    }

    /// Encodes and delivers a lifecycle event on its session's subject.
    ///
    /// # Errors
    ///
    /// Returns a transport error when encoding or lock acquisition fails.
    pub fn deliver_event(&self, event: &LifecycleEvent) -> BusResult<bool> {
        let payload = wire::encode_lifecycle_event(event).map_err(BusError::transport)?;
        self.deliver(event.session_id(), Ok(payload))
    }

    /// Injects a transport failure into a session's subscription.
    ///
    /// # Errors
    ///
    /// Returns a transport error when lock acquisition fails.
    pub fn deliver_failure(&self, session_id: &TestSessionId, error: BusError) -> BusResult<bool> {
        self.deliver(session_id, Err(error))
    }

    fn deliver(&self, session_id: &TestSessionId, item: BusResult<Vec<u8>>) -> BusResult<bool> {
        let subject = wire::lifecycle_subject(session_id);
        let state = self.lock()?;
        Ok(state
            .subscribers
            .get(&subject)
            .is_some_and(|sender| sender.unbounded_send(item).is_ok()))
    }
}

#[async_trait]
impl TestSessionBus for InMemoryTestSessionBus {
    async fn publish_request(&self, request: &McpServerTestRequest) -> BusResult<()> {
        let payload = wire::encode_request(request).map_err(|err| BusError::Publish {
            subject: REQUEST_SUBJECT.to_owned(),
            reason: err.to_string(),
        })?;

        let mut state = self.lock()?;
        if state.reject_publish {
            return Err(BusError::Publish {
                subject: REQUEST_SUBJECT.to_owned(),
                reason: "publishing disabled".to_owned(),
            });
        }
        state.published.push((REQUEST_SUBJECT.to_owned(), payload));
        Ok(())
    }

    async fn subscribe_lifecycle(
        &self,
        session_id: &TestSessionId,
    ) -> BusResult<LifecycleSubscription> {
        let subject = wire::lifecycle_subject(session_id);
        let mut state = self.lock()?;
        if state.reject_subscribe {
            return Err(BusError::Subscribe {
                subject,
                reason: "subscriptions disabled".to_owned(),
            });
        }

        let (sender, receiver) = mpsc::unbounded();
        state.subscribers.insert(subject.clone(), sender);
        let drain = InMemoryDrain {
            subject,
            state: Arc::clone(&self.state),
        };
        Ok(LifecycleSubscription::new(receiver.boxed(), Box::new(drain)))
    }
}

struct InMemoryDrain {
    subject: String,
    state: Arc<Mutex<InMemoryBusState>>,
}

#[async_trait]
impl SubscriptionDrain for InMemoryDrain {
    async fn drain(&self) -> BusResult<()> {
        let mut state = self.state.lock().map_err(poisoned)?;
        if state.reject_drain {
            return Err(BusError::Drain {
                subject: self.subject.clone(),
                reason: "drain disabled".to_owned(),
            });
        }
        state.subscribers.remove(&self.subject);
        state.drained.push(self.subject.clone());
        Ok(())
    }
}
