//! Shared fixtures for connector integration tests.

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use failover_connector::{ConnectError, ConnectionHandler, Dialer, Endpoint, Transport};
use futures_util::future::BoxFuture;
use futures_util::FutureExt;
use tokio::sync::{mpsc, Notify};

/// Transport produced by [`ScriptedDialer`].
#[derive(Debug)]
pub struct MockTransport {
    pub endpoint: Endpoint,
    wakeups: AtomicUsize,
    closed: AtomicBool,
}

impl MockTransport {
    pub fn wakeups(&self) -> usize {
        self.wakeups.load(Ordering::SeqCst)
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }
}

impl Transport for MockTransport {
    fn wake_up(&self) {
        self.wakeups.fetch_add(1, Ordering::SeqCst);
    }

    fn close(&self) {
        self.closed.store(true, Ordering::SeqCst);
    }
}

/// How the scripted dialer answers one endpoint.
#[derive(Clone)]
pub enum Behavior {
    Accept,
    Refuse,
    /// Wait for the gate, then accept (`true`) or refuse (`false`).
    Gated(Arc<Notify>, bool),
}

#[derive(Default)]
struct Script {
    behaviors: Mutex<HashMap<Endpoint, Behavior>>,
    dials: Mutex<Vec<Endpoint>>,
}

/// Dialer whose per-endpoint results are set by the test.
/// Unscripted endpoints refuse.
#[derive(Clone, Default)]
pub struct ScriptedDialer {
    script: Arc<Script>,
}

impl ScriptedDialer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&self, endpoint: &Endpoint, behavior: Behavior) -> &Self {
        self.script
            .behaviors
            .lock()
            .unwrap()
            .insert(endpoint.clone(), behavior);
        self
    }

    /// Install a gate for `endpoint` and return it.
    pub fn gate(&self, endpoint: &Endpoint, succeed: bool) -> Arc<Notify> {
        let gate = Arc::new(Notify::new());
        self.set(endpoint, Behavior::Gated(Arc::clone(&gate), succeed));
        gate
    }

    /// Endpoints dialed so far, in order.
    pub fn dials(&self) -> Vec<Endpoint> {
        self.script.dials.lock().unwrap().clone()
    }
}

fn refused(endpoint: Endpoint) -> ConnectError {
    ConnectError::Io {
        endpoint,
        source: std::io::ErrorKind::ConnectionRefused.into(),
    }
}

fn accepted(endpoint: Endpoint) -> MockTransport {
    MockTransport {
        endpoint,
        wakeups: AtomicUsize::new(0),
        closed: AtomicBool::new(false),
    }
}

impl Dialer for ScriptedDialer {
    type Transport = MockTransport;

    fn dial(&self, endpoint: &Endpoint) -> BoxFuture<'static, Result<MockTransport, ConnectError>> {
        self.script.dials.lock().unwrap().push(endpoint.clone());
        let behavior = self
            .script
            .behaviors
            .lock()
            .unwrap()
            .get(endpoint)
            .cloned()
            .unwrap_or(Behavior::Refuse);
        let endpoint = endpoint.clone();

        async move {
            match behavior {
                Behavior::Accept => Ok(accepted(endpoint)),
                Behavior::Refuse => Err(refused(endpoint)),
                Behavior::Gated(gate, succeed) => {
                    gate.notified().await;
                    if succeed {
                        Ok(accepted(endpoint))
                    } else {
                        Err(refused(endpoint))
                    }
                }
            }
        }
        .boxed()
    }
}

/// Notification observed by [`Recorder`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    Init(Endpoint),
    Success,
    Failed,
    Closed,
    ClearUnreachable,
}

/// Handler that streams every notification to the test.
pub struct Recorder {
    tx: mpsc::UnboundedSender<Event>,
    transport: Mutex<Option<Arc<MockTransport>>>,
}

impl Recorder {
    pub fn new() -> (Arc<Self>, Events) {
        let (tx, rx) = mpsc::unbounded_channel();
        let recorder = Arc::new(Self {
            tx,
            transport: Mutex::new(None),
        });
        (recorder, Events { rx })
    }

    pub fn transport(&self) -> Option<Arc<MockTransport>> {
        self.transport.lock().unwrap().clone()
    }

    fn emit(&self, event: Event) {
        let _ = self.tx.send(event);
    }
}

impl ConnectionHandler<MockTransport> for Recorder {
    fn init(&self, transport: Arc<MockTransport>) {
        self.emit(Event::Init(transport.endpoint.clone()));
        *self.transport.lock().unwrap() = Some(transport);
    }

    fn on_connection_success(&self) {
        self.emit(Event::Success);
    }

    fn on_connection_failed(&self) {
        self.emit(Event::Failed);
    }

    fn on_closed(&self) {
        self.emit(Event::Closed);
    }

    fn clear_unreachable_messages(&self) {
        self.emit(Event::ClearUnreachable);
    }
}

/// Receiving side of a [`Recorder`].
pub struct Events {
    rx: mpsc::UnboundedReceiver<Event>,
}

impl Events {
    /// Next event, failing the test after two seconds.
    pub async fn next(&mut self) -> Event {
        tokio::time::timeout(Duration::from_secs(2), self.rx.recv())
            .await
            .expect("timed out waiting for connector event")
            .expect("recorder dropped")
    }

    pub async fn take(&mut self, n: usize) -> Vec<Event> {
        let mut events = Vec::with_capacity(n);
        for _ in 0..n {
            events.push(self.next().await);
        }
        events
    }

    /// Assert nothing else arrives within a short window.
    pub async fn assert_quiet(&mut self) {
        tokio::time::sleep(Duration::from_millis(100)).await;
        if let Ok(event) = self.rx.try_recv() {
            panic!("unexpected event: {:?}", event);
        }
    }
}

pub fn endpoint(host: &str, port: u16) -> Endpoint {
    Endpoint::new(host, port)
}
