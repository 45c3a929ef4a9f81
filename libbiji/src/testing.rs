//! Test doubles shared by the unit tests of this crate
use crate::{
    Error, Result,
    backend::{Backend, ChangeEvent, ChangeKind, Subscription},
    location::{Location, NewLocation},
};
use async_trait::async_trait;
use std::{
    collections::VecDeque,
    sync::{
        Arc, Mutex,
        atomic::{AtomicUsize, Ordering},
    },
    time::Duration,
};
use time::OffsetDateTime;
use tokio::{
    sync::{broadcast, mpsc, oneshot, watch},
    time::timeout,
};

const TIMEOUT: Duration = Duration::from_secs(5);

pub(crate) fn location(name: &str) -> Location {
    Location {
        id: uuid::Uuid::new_v4().to_string(),
        name: name.to_string(),
        description: format!("description of {name}"),
        latitude: -6.2088,
        longitude: 106.8456,
        created_by: "tester".to_string(),
        created_at: OffsetDateTime::now_utc(),
    }
}

/// Wait until the watched value satisfies `f` and return a copy of it
pub(crate) async fn wait_for<T: Clone>(
    rx: &mut watch::Receiver<T>,
    f: impl FnMut(&T) -> bool,
) -> T {
    let value = timeout(TIMEOUT, rx.wait_for(f))
        .await
        .expect("timed out waiting for state")
        .expect("sender dropped");
    T::clone(&value)
}

/// Poll `f` until it returns true
pub(crate) async fn eventually(mut f: impl FnMut() -> bool) {
    timeout(TIMEOUT, async {
        while !f() {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    })
    .await
    .expect("timed out waiting for condition");
}

pub(crate) type Responder = oneshot::Sender<Result<Vec<Location>>>;

/// The pending `list()` calls of a [ScriptedBackend], in the order they were made
pub(crate) struct ListCalls {
    rx: mpsc::UnboundedReceiver<Responder>,
}

impl ListCalls {
    /// Wait for the next `list()` call and return the sender that resolves it
    pub(crate) async fn next(&mut self) -> Responder {
        timeout(TIMEOUT, self.rx.recv())
            .await
            .expect("timed out waiting for a list call")
            .expect("backend dropped")
    }

    /// Wait for the next `list()` call and resolve it immediately
    pub(crate) async fn respond(&mut self, response: Result<Vec<Location>>) {
        self.next()
            .await
            .send(response)
            .expect("fetch was dropped");
    }

    pub(crate) fn is_idle(&mut self) -> bool {
        self.rx.try_recv().is_err()
    }
}

/// A backend whose responses are supplied by the test. Every `list()` call
/// blocks until the test resolves it through [ListCalls].
pub(crate) struct ScriptedBackend {
    calls: mpsc::UnboundedSender<Responder>,
    inserts: Mutex<VecDeque<Result<Location>>>,
    list_calls: AtomicUsize,
    insert_calls: AtomicUsize,
    subscribe_fails: bool,
    pub(crate) changes: broadcast::Sender<ChangeEvent>,
}

impl ScriptedBackend {
    pub(crate) fn new() -> (Arc<Self>, ListCalls) {
        Self::build(false)
    }

    pub(crate) fn failing_subscribe() -> (Arc<Self>, ListCalls) {
        Self::build(true)
    }

    fn build(subscribe_fails: bool) -> (Arc<Self>, ListCalls) {
        let (calls, rx) = mpsc::unbounded_channel();
        let (changes, _) = broadcast::channel(16);
        let backend = Self {
            calls,
            inserts: Mutex::new(VecDeque::new()),
            list_calls: AtomicUsize::new(0),
            insert_calls: AtomicUsize::new(0),
            subscribe_fails,
            changes,
        };
        (Arc::new(backend), ListCalls { rx })
    }

    pub(crate) fn script_insert(&self, result: Result<Location>) {
        self.inserts.lock().expect("poisoned").push_back(result);
    }

    pub(crate) fn notify(&self, kind: ChangeKind) {
        self.changes
            .send(ChangeEvent::new(kind))
            .expect("nobody is subscribed");
    }

    pub(crate) fn list_calls(&self) -> usize {
        self.list_calls.load(Ordering::SeqCst)
    }

    pub(crate) fn insert_calls(&self) -> usize {
        self.insert_calls.load(Ordering::SeqCst)
    }

    pub(crate) fn subscribers(&self) -> usize {
        self.changes.receiver_count()
    }
}

#[async_trait]
impl Backend for ScriptedBackend {
    async fn list(&self) -> Result<Vec<Location>> {
        self.list_calls.fetch_add(1, Ordering::SeqCst);
        let (tx, rx) = oneshot::channel();
        self.calls
            .send(tx)
            .map_err(|_| Error::Backend("test is gone".into()))?;
        rx.await
            .unwrap_or_else(|_| Err(Error::Backend("response dropped".into())))
    }

    async fn insert(&self, _location: &NewLocation) -> Result<Location> {
        self.insert_calls.fetch_add(1, Ordering::SeqCst);
        self.inserts
            .lock()
            .expect("poisoned")
            .pop_front()
            .unwrap_or_else(|| Err(Error::Backend("no insert scripted".into())))
    }

    fn subscribe(&self) -> Result<Subscription> {
        if self.subscribe_fails {
            return Err(Error::Backend("realtime is unavailable".into()));
        }
        Ok(Subscription::new(self.changes.subscribe()))
    }
}

/// A backend that keeps its rows in memory and announces every insert
pub(crate) struct MemoryBackend {
    rows: Mutex<Vec<Location>>,
    pub(crate) changes: broadcast::Sender<ChangeEvent>,
}

impl MemoryBackend {
    pub(crate) fn new() -> Arc<Self> {
        let (changes, _) = broadcast::channel(16);
        Arc::new(Self {
            rows: Mutex::new(Vec::new()),
            changes,
        })
    }

    pub(crate) fn subscribers(&self) -> usize {
        self.changes.receiver_count()
    }
}

#[async_trait]
impl Backend for MemoryBackend {
    async fn list(&self) -> Result<Vec<Location>> {
        Ok(self.rows.lock().expect("poisoned").clone())
    }

    async fn insert(&self, new: &NewLocation) -> Result<Location> {
        let mut stored = location(&new.name);
        stored.description = new.description.clone();
        stored.latitude = new.latitude;
        stored.longitude = new.longitude;
        self.rows.lock().expect("poisoned").insert(0, stored.clone());
        let _ = self.changes.send(ChangeEvent::new(ChangeKind::Insert));
        Ok(stored)
    }

    fn subscribe(&self) -> Result<Subscription> {
        Ok(Subscription::new(self.changes.subscribe()))
    }
}
