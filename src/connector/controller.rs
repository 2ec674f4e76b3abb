//! The connect / reconnect / failover state machine.
//!
//! # Responsibilities
//! - Own the endpoint list, current index, current token and attempt registry
//! - Start one attempt at a time and advance through endpoints on failure
//! - Discard outcomes from superseded attempts
//! - Notify the owning client of every lifecycle event
//!
//! # Concurrency
//! All mutable state sits behind one mutex. Public operations and outcome
//! handling each run as a single critical section, so the token comparison in
//! `handle_outcome` is a linearizable check-and-act. Attempt outcomes arrive
//! over a channel and are applied by a driver task in arrival order; a failed
//! attempt starts the next one from inside its own transition, and that
//! attempt reports back through the same channel.
//!
//! Client notifications raised during a critical section are appended to an
//! outbox before the lock is released, so the outbox holds them in transition
//! order. One caller at a time drains it, outside the lock; a caller that finds
//! a drain in progress leaves its notices to that drain. Handlers may therefore
//! call back into the connector, and their notices follow the current one.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};

use arc_swap::ArcSwap;
use serde::Serialize;
use tokio::runtime::Handle;
use tokio::sync::{mpsc, watch};

use crate::connector::handler::ConnectionHandler;
use crate::connector::registry::AttemptRegistry;
use crate::connector::state::{AtomicState, ConnectorState};
use crate::connector::token::{ConnectToken, TokenMint};
use crate::net::attempt::{AttemptOutcome, CloseOutcome, ConnectionAttempt};
use crate::net::endpoint::{Endpoint, EndpointList};
use crate::net::transport::{Dialer, Transport};
use crate::observability::metrics;

/// Point-in-time view of a connector, for status output.
#[derive(Debug, Clone, Serialize)]
pub struct ConnectorSnapshot {
    pub state: ConnectorState,
    /// Index of the endpoint in use this cycle; `None` before a cycle starts.
    pub index: Option<usize>,
    pub token: u64,
    pub pending_attempts: usize,
    pub endpoints: Vec<String>,
}

enum Notice<T> {
    Init(Arc<T>),
    Success,
    Failed,
    Closed,
    ClearUnreachable,
}

struct Inner<T: Transport> {
    state: ConnectorState,
    index: Option<usize>,
    /// Endpoint list pinned for the running cycle.
    cycle: EndpointList,
    token: ConnectToken,
    mint: TokenMint,
    current: Option<Arc<ConnectionAttempt<T>>>,
    registry: AttemptRegistry<T>,
    outbox: VecDeque<Notice<T>>,
    delivering: bool,
}

struct Shared<D: Dialer, H> {
    dialer: D,
    handler: Arc<H>,
    endpoints: ArcSwap<Vec<Endpoint>>,
    state: AtomicState,
    state_tx: watch::Sender<ConnectorState>,
    outcomes: mpsc::UnboundedSender<AttemptOutcome<D::Transport>>,
    runtime: Handle,
    inner: Mutex<Inner<D::Transport>>,
}

impl<D: Dialer, H> Drop for Shared<D, H> {
    fn drop(&mut self) {
        let inner = self.inner.get_mut().unwrap_or_else(PoisonError::into_inner);
        if let Some(attempt) = inner.current.take() {
            attempt.close();
        }
        for attempt in inner.registry.drain() {
            attempt.close();
        }
    }
}

/// Hands delivery to the next caller if a handler panics mid-drain.
struct ResetOnPanic<'a, T: Transport>(&'a Mutex<Inner<T>>);

impl<T: Transport> Drop for ResetOnPanic<'_, T> {
    fn drop(&mut self) {
        if std::thread::panicking() {
            self.0.lock().unwrap_or_else(PoisonError::into_inner).delivering = false;
        }
    }
}

/// Connection lifecycle controller for one logical connection.
///
/// Cloning yields another handle to the same connector.
pub struct Connector<D: Dialer, H> {
    shared: Arc<Shared<D, H>>,
}

impl<D: Dialer, H> Clone for Connector<D, H> {
    fn clone(&self) -> Self {
        Self {
            shared: Arc::clone(&self.shared),
        }
    }
}

impl<D, H> Connector<D, H>
where
    D: Dialer,
    H: ConnectionHandler<D::Transport>,
{
    /// Create a connector that runs its attempts on the current Tokio runtime.
    ///
    /// # Panics
    /// Panics when called outside a Tokio runtime; use [`Connector::with_runtime`] there.
    pub fn new(dialer: D, handler: Arc<H>, endpoints: Vec<Endpoint>) -> Self {
        Self::with_runtime(dialer, handler, endpoints, Handle::current())
    }

    /// Create a connector that runs its attempts and outcome driver on `runtime`.
    pub fn with_runtime(dialer: D, handler: Arc<H>, endpoints: Vec<Endpoint>, runtime: Handle) -> Self {
        let (connector, outcomes) = Self::detached(dialer, handler, endpoints, runtime);
        connector.spawn_driver(outcomes);
        connector
    }

    /// Build a connector without an outcome driver; the caller feeds
    /// outcomes to `handle_outcome`.
    pub(crate) fn detached(
        dialer: D,
        handler: Arc<H>,
        endpoints: Vec<Endpoint>,
        runtime: Handle,
    ) -> (Self, mpsc::UnboundedReceiver<AttemptOutcome<D::Transport>>) {
        let (outcomes_tx, outcomes_rx) = mpsc::unbounded_channel();
        let (state_tx, _) = watch::channel(ConnectorState::Closed);
        let endpoints = Arc::new(endpoints);

        let shared = Shared {
            dialer,
            handler,
            endpoints: ArcSwap::new(Arc::clone(&endpoints)),
            state: AtomicState::new(ConnectorState::Closed),
            state_tx,
            outcomes: outcomes_tx,
            runtime,
            inner: Mutex::new(Inner {
                state: ConnectorState::Closed,
                index: None,
                cycle: endpoints,
                token: ConnectToken::NONE,
                mint: TokenMint::new(),
                current: None,
                registry: AttemptRegistry::new(),
                outbox: VecDeque::new(),
                delivering: false,
            }),
        };

        (
            Self {
                shared: Arc::new(shared),
            },
            outcomes_rx,
        )
    }

    fn spawn_driver(&self, mut outcomes: mpsc::UnboundedReceiver<AttemptOutcome<D::Transport>>) {
        let weak: Weak<Shared<D, H>> = Arc::downgrade(&self.shared);
        self.shared.runtime.spawn(async move {
            while let Some(outcome) = outcomes.recv().await {
                let Some(shared) = weak.upgrade() else {
                    break;
                };
                Connector { shared }.handle_outcome(outcome);
            }
            tracing::debug!("Connector outcome driver stopped");
        });
    }

    // --- Commands ---

    /// Start a connect cycle step if closed; otherwise a no-op.
    pub fn connect(&self) {
        let mut inner = self.lock();
        let mut notices = Vec::new();
        self.start_connect(&mut inner, &mut notices);
        self.release(inner, notices);
    }

    /// Tear down and connect again.
    ///
    /// The next attempt continues with the following endpoint unless the
    /// previous one was the last in the list, in which case it restarts from
    /// the first.
    pub fn reconnect(&self) {
        let mut inner = self.lock();
        let mut notices = Vec::new();
        self.stop_connect(&mut inner, &mut notices);

        let next = inner.index.map_or(0, |i| i + 1);
        if next >= inner.cycle.len() {
            inner.index = None;
        }

        self.start_connect(&mut inner, &mut notices);
        self.release(inner, notices);
    }

    /// Unconditionally tear down. Safe from any state.
    ///
    /// `on_closed` is delivered before this returns unless another caller is
    /// already delivering notifications, in which case that caller delivers it
    /// after the notices queued ahead of it.
    pub fn disconnect(&self) {
        let mut inner = self.lock();
        let mut notices = Vec::new();
        self.stop_connect(&mut inner, &mut notices);
        self.release(inner, notices);
    }

    /// Liveness check, meant to be called periodically by the owner.
    ///
    /// Starts an attempt when nothing is in flight and nothing is connected,
    /// and wakes the live transport when connected.
    pub fn check_connect(&self) {
        let mut inner = self.lock();
        let mut notices = Vec::new();
        let state = inner.state;
        match state {
            ConnectorState::Closed => self.start_connect(&mut inner, &mut notices),
            ConnectorState::Connected => {
                if let Some(attempt) = &inner.current {
                    attempt.wake_up();
                }
            }
            ConnectorState::Connecting | ConnectorState::Failed => {
                tracing::trace!(token = %inner.token, "Check skipped, attempt in flight");
            }
        }
        self.release(inner, notices);
    }

    /// Replace the endpoint list. The running cycle keeps the list it started
    /// with; the new list is used from the next cycle.
    pub fn set_endpoints(&self, endpoints: Vec<Endpoint>) {
        tracing::info!(count = endpoints.len(), "Endpoint list replaced");
        self.shared.endpoints.store(Arc::new(endpoints));
    }

    // --- Queries ---

    pub fn state(&self) -> ConnectorState {
        self.shared.state.load()
    }

    pub fn is_connected(&self) -> bool {
        self.state() == ConnectorState::Connected
    }

    pub fn is_connecting(&self) -> bool {
        self.state() == ConnectorState::Connecting
    }

    pub fn is_closed(&self) -> bool {
        self.state() == ConnectorState::Closed
    }

    /// Receive every state transition.
    pub fn subscribe(&self) -> watch::Receiver<ConnectorState> {
        self.shared.state_tx.subscribe()
    }

    /// Latest endpoint list (not necessarily the one pinned by the running cycle).
    pub fn endpoints(&self) -> EndpointList {
        self.shared.endpoints.load_full()
    }

    pub fn current_index(&self) -> Option<usize> {
        self.lock().index
    }

    pub fn current_token(&self) -> ConnectToken {
        self.lock().token
    }

    /// Number of registered attempts that may still report an outcome.
    pub fn pending_attempts(&self) -> usize {
        self.lock().registry.len()
    }

    pub fn snapshot(&self) -> ConnectorSnapshot {
        let inner = self.lock();
        ConnectorSnapshot {
            state: inner.state,
            index: inner.index,
            token: inner.token.as_u64(),
            pending_attempts: inner.registry.len(),
            endpoints: inner.cycle.iter().map(ToString::to_string).collect(),
        }
    }

    // --- Transitions ---

    /// Apply an attempt outcome.
    pub(crate) fn handle_outcome(&self, outcome: AttemptOutcome<D::Transport>) {
        let mut inner = self.lock();
        let mut notices = Vec::new();

        if outcome.token != inner.token {
            Self::discard_stale(&mut inner, outcome);
        } else {
            inner.registry.remove(outcome.token);
            match outcome.result {
                Ok(transport) => {
                    self.set_state(&mut inner, ConnectorState::Connected);
                    metrics::record_attempt_outcome("connected");
                    tracing::info!(
                        endpoint = %outcome.endpoint,
                        token = %outcome.token,
                        index = ?inner.index,
                        "Connected"
                    );
                    notices.push(Notice::Init(transport));
                    notices.push(Notice::Success);
                }
                Err(error) => {
                    metrics::record_attempt_outcome("failed");
                    tracing::warn!(
                        endpoint = %outcome.endpoint,
                        token = %outcome.token,
                        error = %error,
                        "Connection attempt failed, trying next endpoint"
                    );
                    inner.current = None;
                    self.set_state(&mut inner, ConnectorState::Failed);
                    self.set_state(&mut inner, ConnectorState::Closed);
                    self.start_connect(&mut inner, &mut notices);
                    notices.push(Notice::Failed);
                }
            }
        }
        self.release(inner, notices);
    }

    fn discard_stale(inner: &mut Inner<D::Transport>, outcome: AttemptOutcome<D::Transport>) {
        let attempt = inner.registry.remove(outcome.token);
        if let Some(attempt) = &attempt {
            attempt.close();
        }
        if let Ok(transport) = &outcome.result {
            transport.close();
        }

        metrics::record_stale_outcome();
        tracing::debug!(
            stale_token = %outcome.token,
            current_token = %inner.token,
            endpoint = %outcome.endpoint,
            registered = attempt.is_some(),
            "Discarded outcome of superseded attempt"
        );
    }

    fn start_connect(&self, inner: &mut Inner<D::Transport>, notices: &mut Vec<Notice<D::Transport>>) {
        if inner.state != ConnectorState::Closed {
            tracing::trace!(state = %inner.state, "Connect ignored, not closed");
            return;
        }

        let next = inner.index.map_or(0, |i| i + 1);
        if next == 0 {
            inner.cycle = self.shared.endpoints.load_full();
        }

        let Some(endpoint) = inner.cycle.get(next).cloned() else {
            inner.index = None;
            metrics::record_cycle_exhausted();
            tracing::warn!(
                endpoints = inner.cycle.len(),
                "Every endpoint failed this cycle, clearing unreachable messages"
            );
            notices.push(Notice::ClearUnreachable);
            return;
        };

        let token = inner.mint.mint();
        inner.index = Some(next);
        inner.token = token;

        let attempt = Arc::new(ConnectionAttempt::start(
            token,
            endpoint.clone(),
            &self.shared.dialer,
            self.shared.outcomes.clone(),
            &self.shared.runtime,
        ));
        inner.registry.insert(token, Arc::clone(&attempt));
        inner.current = Some(attempt);
        self.set_state(inner, ConnectorState::Connecting);

        metrics::record_attempt_started(&endpoint);
        tracing::debug!(endpoint = %endpoint, index = next, token = %token, "Connecting");
    }

    fn stop_connect(&self, inner: &mut Inner<D::Transport>, notices: &mut Vec<Notice<D::Transport>>) {
        inner.token = ConnectToken::NONE;
        self.set_state(inner, ConnectorState::Closed);
        notices.push(Notice::Closed);

        if let Some(attempt) = inner.current.take() {
            match attempt.close() {
                CloseOutcome::Suppressed | CloseOutcome::AlreadyClosed => {
                    inner.registry.remove(attempt.token());
                }
                // The outcome may still be queued; stale handling removes the entry.
                CloseOutcome::AlreadyResolved => {}
            }
            tracing::info!(endpoint = %attempt.endpoint(), token = %attempt.token(), "Disconnected");
        }
    }

    fn set_state(&self, inner: &mut Inner<D::Transport>, state: ConnectorState) {
        inner.state = state;
        self.shared.state.store(state);
        self.shared.state_tx.send_replace(state);
        metrics::record_state(state);
    }

    /// Queue the section's notices behind any already queued, release the
    /// lock, and drain the outbox unless another caller is draining it.
    fn release(&self, mut inner: MutexGuard<'_, Inner<D::Transport>>, notices: Vec<Notice<D::Transport>>) {
        inner.outbox.extend(notices);
        if inner.delivering || inner.outbox.is_empty() {
            return;
        }
        inner.delivering = true;
        drop(inner);

        let _reset = ResetOnPanic(&self.shared.inner);
        loop {
            let notice = {
                let mut inner = self.lock();
                match inner.outbox.pop_front() {
                    Some(notice) => notice,
                    None => {
                        inner.delivering = false;
                        return;
                    }
                }
            };
            self.deliver(notice);
        }
    }

    fn deliver(&self, notice: Notice<D::Transport>) {
        let handler = &self.shared.handler;
        match notice {
            Notice::Init(transport) => handler.init(transport),
            Notice::Success => handler.on_connection_success(),
            Notice::Failed => handler.on_connection_failed(),
            Notice::Closed => handler.on_closed(),
            Notice::ClearUnreachable => handler.clear_unreachable_messages(),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Inner<D::Transport>> {
        self.shared.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::net::transport::ConnectError;
    use futures_util::future::BoxFuture;
    use futures_util::FutureExt;
    use std::collections::HashSet;
    use std::sync::atomic::{AtomicBool, Ordering};

    #[derive(Debug)]
    struct TestTransport {
        port: u16,
        closed: AtomicBool,
    }

    impl Transport for TestTransport {
        fn wake_up(&self) {}
        fn close(&self) {
            self.closed.store(true, Ordering::SeqCst);
        }
    }

    /// Resolves immediately; ports in `refuse` fail.
    struct ImmediateDialer {
        refuse: HashSet<u16>,
    }

    impl Dialer for ImmediateDialer {
        type Transport = TestTransport;

        fn dial(&self, endpoint: &Endpoint) -> BoxFuture<'static, Result<TestTransport, ConnectError>> {
            let endpoint = endpoint.clone();
            let refused = self.refuse.contains(&endpoint.port);
            async move {
                if refused {
                    Err(ConnectError::Io {
                        endpoint,
                        source: std::io::ErrorKind::ConnectionRefused.into(),
                    })
                } else {
                    Ok(TestTransport {
                        port: endpoint.port,
                        closed: AtomicBool::new(false),
                    })
                }
            }
            .boxed()
        }
    }

    #[derive(Debug, Clone, PartialEq, Eq)]
    enum Event {
        Init(u16),
        Success,
        Failed,
        Closed,
        ClearUnreachable,
    }

    #[derive(Default)]
    struct Recorder {
        events: Mutex<Vec<Event>>,
    }

    impl Recorder {
        fn events(&self) -> Vec<Event> {
            self.events.lock().unwrap().clone()
        }

        fn push(&self, event: Event) {
            self.events.lock().unwrap().push(event);
        }
    }

    impl ConnectionHandler<TestTransport> for Recorder {
        fn init(&self, transport: Arc<TestTransport>) {
            self.push(Event::Init(transport.port));
        }
        fn on_connection_success(&self) {
            self.push(Event::Success);
        }
        fn on_connection_failed(&self) {
            self.push(Event::Failed);
        }
        fn on_closed(&self) {
            self.push(Event::Closed);
        }
        fn clear_unreachable_messages(&self) {
            self.push(Event::ClearUnreachable);
        }
    }

    fn endpoints(ports: &[u16]) -> Vec<Endpoint> {
        ports.iter().map(|p| Endpoint::new("10.0.0.1", *p)).collect()
    }

    fn detached(
        refuse: &[u16],
        ports: &[u16],
    ) -> (
        Connector<ImmediateDialer, Recorder>,
        Arc<Recorder>,
        mpsc::UnboundedReceiver<AttemptOutcome<TestTransport>>,
    ) {
        let recorder = Arc::new(Recorder::default());
        let dialer = ImmediateDialer {
            refuse: refuse.iter().copied().collect(),
        };
        let (connector, rx) =
            Connector::detached(dialer, Arc::clone(&recorder), endpoints(ports), Handle::current());
        (connector, recorder, rx)
    }

    #[tokio::test]
    async fn failover_to_second_endpoint() {
        let (connector, recorder, mut rx) = detached(&[1], &[1, 2]);

        connector.connect();
        assert!(connector.is_connecting());
        assert_eq!(connector.current_index(), Some(0));

        connector.handle_outcome(rx.recv().await.unwrap());
        assert!(connector.is_connecting());
        assert_eq!(connector.current_index(), Some(1));

        connector.handle_outcome(rx.recv().await.unwrap());
        assert!(connector.is_connected());
        assert_eq!(connector.current_index(), Some(1));
        assert_eq!(connector.pending_attempts(), 0);
        assert_eq!(
            recorder.events(),
            vec![Event::Failed, Event::Init(2), Event::Success]
        );
    }

    #[tokio::test]
    async fn single_endpoint_exhaustion() {
        let (connector, recorder, mut rx) = detached(&[1], &[1]);

        connector.connect();
        connector.handle_outcome(rx.recv().await.unwrap());

        assert!(connector.is_closed());
        assert_eq!(connector.current_index(), None);
        assert_eq!(connector.pending_attempts(), 0);
        assert_eq!(recorder.events(), vec![Event::ClearUnreachable, Event::Failed]);
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn stale_success_is_discarded_and_closed() {
        let (connector, recorder, mut rx) = detached(&[], &[1, 2]);

        connector.connect();
        let first_token = connector.current_token();
        let stale = rx.recv().await.unwrap();
        assert_eq!(stale.token, first_token);
        let stale_transport = Arc::clone(stale.result.as_ref().unwrap());

        // Outcome for the first attempt is still queued when reconnect supersedes it.
        connector.reconnect();
        let second_token = connector.current_token();
        assert_ne!(first_token, second_token);
        assert_eq!(connector.current_index(), Some(1));
        assert_eq!(connector.pending_attempts(), 2);
        assert!(connector.lock().registry.contains(first_token));

        connector.handle_outcome(stale);
        assert!(!connector.lock().registry.contains(first_token));
        assert!(connector.is_connecting());
        assert_eq!(connector.current_token(), second_token);
        assert_eq!(connector.pending_attempts(), 1);
        assert!(stale_transport.closed.load(Ordering::SeqCst));
        assert_eq!(recorder.events(), vec![Event::Closed]);

        connector.handle_outcome(rx.recv().await.unwrap());
        assert!(connector.is_connected());
        assert_eq!(
            recorder.events(),
            vec![Event::Closed, Event::Init(2), Event::Success]
        );
    }

    #[tokio::test]
    async fn stale_failure_does_not_trigger_failover() {
        let (connector, recorder, mut rx) = detached(&[1], &[1, 2]);

        connector.connect();
        let stale = rx.recv().await.unwrap();
        connector.disconnect();
        assert_eq!(connector.pending_attempts(), 1);

        connector.handle_outcome(stale);
        assert!(connector.is_closed());
        assert_eq!(connector.pending_attempts(), 0);
        assert_eq!(connector.current_index(), Some(0));
        assert_eq!(recorder.events(), vec![Event::Closed]);
    }

    #[tokio::test]
    async fn reconnect_at_last_endpoint_restarts_from_first() {
        let (connector, _recorder, mut rx) = detached(&[], &[1, 2]);

        connector.connect();
        connector.handle_outcome(rx.recv().await.unwrap());
        assert_eq!(connector.current_index(), Some(0));

        connector.reconnect();
        assert_eq!(connector.current_index(), Some(1));
        connector.handle_outcome(rx.recv().await.unwrap());
        assert!(connector.is_connected());

        connector.reconnect();
        assert_eq!(connector.current_index(), Some(0));
    }

    #[tokio::test]
    async fn snapshot_reflects_state() {
        let (connector, _recorder, _rx) = detached(&[], &[1, 2]);
        connector.connect();

        let snapshot = connector.snapshot();
        assert_eq!(snapshot.state, ConnectorState::Connecting);
        assert_eq!(snapshot.index, Some(0));
        assert_eq!(snapshot.pending_attempts, 1);
        assert_eq!(snapshot.endpoints, vec!["10.0.0.1:1", "10.0.0.1:2"]);

        let json = serde_json::to_value(&snapshot).unwrap();
        assert_eq!(json["state"], "connecting");
    }
}
