//! Multicast channel relaying one session's lifecycle events to observers.

use crate::server_test::domain::LifecycleEvent;
use futures::stream::{self, BoxStream, StreamExt};
use std::collections::VecDeque;
use std::sync::{Mutex, MutexGuard, PoisonError};
use thiserror::Error;
use tokio::sync::broadcast::{self, error::RecvError};
use tracing::{debug, warn};

/// Error signal delivered to observers when a session dies of a transport
/// failure rather than a worker-reported `FAILED` stage.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum TestProgressError {
    /// The bus failed while the session was live.
    #[error("test session transport failure: {0}")]
    Transport(String),
}

/// Stream of lifecycle events handed to an observer.
///
/// The stream ends without error once the session is cleaned up. A
/// transport failure yields one `Err` item and then ends.
pub type TestProgressStream = BoxStream<'static, Result<LifecycleEvent, TestProgressError>>;

/// Item carried on a fanout channel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FanoutItem {
    /// A lifecycle event from the worker or the timeout guard.
    Event(LifecycleEvent),
    /// A transport failure; always the last item.
    Error(TestProgressError),
}

impl FanoutItem {
    fn into_result(self) -> Result<LifecycleEvent, TestProgressError> {
        match self {
            Self::Event(event) => Ok(event),
            Self::Error(err) => Err(err),
        }
    }
}

/// Broadcast channel with a bounded replay buffer.
///
/// Publishing with no observers attached is a no-op apart from the replay
/// buffer. Subscribing snapshots the buffer and attaches to the live channel
/// under the same lock publishing takes, so an observer sees every event
/// exactly once from the point the buffer starts.
#[derive(Debug)]
pub struct SessionFanout {
    state: Mutex<FanoutState>,
    replay_capacity: usize,
}

#[derive(Debug)]
struct FanoutState {
    sender: Option<broadcast::Sender<FanoutItem>>,
    history: VecDeque<FanoutItem>,
}

impl SessionFanout {
    /// Creates an open fanout.
    #[must_use]
    pub fn new(capacity: usize, replay_capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self {
            state: Mutex::new(FanoutState {
                sender: Some(sender),
                history: VecDeque::with_capacity(replay_capacity),
            }),
            replay_capacity,
        }
    }

    /// Creates a fanout that is already closed.
    #[must_use]
    pub fn closed() -> Self {
        Self {
            state: Mutex::new(FanoutState {
                sender: None,
                history: VecDeque::new(),
            }),
            replay_capacity: 0,
        }
    }

    fn lock(&self) -> MutexGuard<'_, FanoutState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Publishes an item to current observers.
    ///
    /// Returns the number of observers the item reached; zero when the
    /// fanout is closed or nobody is attached.
    #[must_use]
    pub fn publish(&self, item: FanoutItem) -> usize {
        let mut state = self.lock();
        self.publish_locked(&mut state, item)
    }

    fn publish_locked(&self, state: &mut FanoutState, item: FanoutItem) -> usize {
        let Some(sender) = state.sender.as_ref() else {
            debug!("dropping item published to a closed fanout");
            return 0;
        };

        let delivered = sender.send(item.clone()).unwrap_or_default();
        if self.replay_capacity > 0 {
            if state.history.len() == self.replay_capacity {
                state.history.pop_front();
            }
            state.history.push_back(item);
        }
        delivered
    }

    /// Publishes an optional final item, then closes the fanout.
    ///
    /// Observers drain what they already received and then see the end of
    /// their stream. Returns `false` when the fanout was already closed, in
    /// which case `last` is discarded.
    #[must_use]
    pub fn finish(&self, last: Option<FanoutItem>) -> bool {
        let mut state = self.lock();
        if state.sender.is_none() {
            return false;
        }
        if let Some(item) = last {
            self.publish_locked(&mut state, item);
        }
        state.sender = None;
        state.history.clear();
        true
    }

    /// Returns whether the fanout still accepts items.
    #[must_use]
    pub fn is_open(&self) -> bool {
        self.lock().sender.is_some()
    }

    /// Returns the number of currently attached observers.
    #[must_use]
    pub fn observer_count(&self) -> usize {
        self.lock()
            .sender
            .as_ref()
            .map_or(0, broadcast::Sender::receiver_count)
    }

    /// Attaches a new observer and returns its event stream.
    #[must_use]
    pub fn subscribe(&self) -> TestProgressStream {
        let state = self.lock();
        let replay = state.history.clone();
        let receiver = state.sender.as_ref().map(broadcast::Sender::subscribe);
        drop(state);
        observer_stream(replay, receiver)
    }
}

struct ObserverState {
    replay: VecDeque<FanoutItem>,
    receiver: Option<broadcast::Receiver<FanoutItem>>,
    finished: bool,
}

fn observer_stream(
    replay: VecDeque<FanoutItem>,
    receiver: Option<broadcast::Receiver<FanoutItem>>,
) -> TestProgressStream {
    let initial = ObserverState {
        replay,
        receiver,
        finished: false,
    };

    stream::unfold(initial, |mut observer| async move {
        if observer.finished {
            return None;
        }
        let item = next_item(&mut observer).await?;
        if matches!(item, FanoutItem::Error(_)) {
            observer.finished = true;
        }
        Some((item.into_result(), observer))
    })
    .boxed()
}

async fn next_item(observer: &mut ObserverState) -> Option<FanoutItem> {
    if let Some(item) = observer.replay.pop_front() {
        return Some(item);
    }

    let receiver = observer.receiver.as_mut()?;
    loop {
        match receiver.recv().await {
            Ok(item) => return Some(item),
            Err(RecvError::Lagged(skipped)) => {
                warn!(skipped, "observer lagged behind test session fanout");
            }
            Err(RecvError::Closed) => return None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::server_test::domain::{TestSessionId, TestStage};
    use chrono::Utc;
    use rstest::{fixture, rstest};

    #[fixture]
    fn session_id() -> TestSessionId {
        TestSessionId::new()
    }

    fn event(session_id: &TestSessionId, stage: TestStage) -> FanoutItem {
        FanoutItem::Event(LifecycleEvent::new(
            session_id.clone(),
            stage,
            stage.as_str(),
            Utc::now(),
        ))
    }

    async fn stages(stream: TestProgressStream) -> Vec<TestStage> {
        stream
            .filter_map(|item| async move { item.ok().map(|event| event.stage()) })
            .collect()
            .await
    }

    #[rstest]
    #[tokio::test]
    async fn publishing_without_observers_is_a_no_op(session_id: TestSessionId) {
        let fanout = SessionFanout::new(8, 0);

        let delivered = fanout.publish(event(&session_id, TestStage::Starting));

        assert_eq!(delivered, 0);
        assert!(fanout.is_open());
    }

    #[rstest]
    #[tokio::test]
    async fn every_observer_receives_every_event(session_id: TestSessionId) {
        let fanout = SessionFanout::new(8, 0);
        let first = fanout.subscribe();
        let second = fanout.subscribe();
        assert_eq!(fanout.observer_count(), 2);

        assert_eq!(fanout.publish(event(&session_id, TestStage::Starting)), 2);
        assert!(fanout.finish(Some(event(&session_id, TestStage::Completed))));

        let expected = vec![TestStage::Starting, TestStage::Completed];
        assert_eq!(stages(first).await, expected);
        assert_eq!(stages(second).await, expected);
    }

    #[rstest]
    #[tokio::test]
    async fn late_observer_sees_replayed_history(session_id: TestSessionId) {
        let fanout = SessionFanout::new(8, 1);
        assert_eq!(fanout.publish(event(&session_id, TestStage::Starting)), 0);
        assert_eq!(fanout.publish(event(&session_id, TestStage::Connecting)), 0);

        let late = fanout.subscribe();
        assert!(fanout.finish(None));

        assert_eq!(stages(late).await, vec![TestStage::Connecting]);
    }

    #[rstest]
    #[tokio::test]
    async fn closed_fanout_yields_empty_stream() {
        let fanout = SessionFanout::closed();

        let items: Vec<_> = fanout.subscribe().collect().await;

        assert!(items.is_empty());
    }

    #[rstest]
    #[tokio::test]
    async fn error_signal_ends_the_stream(session_id: TestSessionId) {
        let fanout = SessionFanout::new(8, 0);
        let observer = fanout.subscribe();

        assert_eq!(fanout.publish(event(&session_id, TestStage::Starting)), 1);
        assert!(fanout.finish(Some(FanoutItem::Error(TestProgressError::Transport(
            "bus down".to_owned(),
        )))));

        let items: Vec<_> = observer.collect().await;
        assert_eq!(items.len(), 2);
        assert!(matches!(items.last(), Some(Err(TestProgressError::Transport(_)))));
    }

    #[rstest]
    fn finishing_twice_is_idempotent(session_id: TestSessionId) {
        let fanout = SessionFanout::new(8, 4);

        assert!(fanout.finish(Some(event(&session_id, TestStage::TimedOut))));
        assert!(!fanout.finish(Some(event(&session_id, TestStage::Completed))));
        assert!(!fanout.is_open());
    }
}
