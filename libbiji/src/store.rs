//! The client-side copy of the location collection.
//!
//! A [LocationStore] keeps a snapshot of everything the backend holds. It is
//! filled when the store is mounted and replaced wholesale whenever the backend
//! reports a change, so the local list never has to be merged with anything.
//! Fetches are not deduplicated: when several are in flight, the one that
//! resolves last determines the published list.
use crate::{
    Error, Result,
    backend::{Backend, Subscription},
    location::{Location, NewLocation},
};
use std::sync::{
    Arc, Mutex, PoisonError, Weak,
    atomic::{AtomicBool, Ordering},
};
use tokio::{
    sync::watch,
    task::{JoinHandle, JoinSet},
};
use tracing::{debug, trace, warn};

/// The observable state of a [LocationStore]
#[derive(Debug, Clone, PartialEq)]
pub struct StoreState {
    /// Every known location, newest first
    pub locations: Vec<Location>,
    /// Whether the store is still waiting for its first fetch to finish
    pub loading: bool,
    /// A description of the most recent failure, if any
    pub error: Option<String>,
    /// Bumped every time `locations` is replaced or prepended to, including
    /// when a refetch returns an identical list
    pub revision: u64,
}

impl Default for StoreState {
    fn default() -> Self {
        Self {
            locations: Vec::new(),
            loading: true,
            error: None,
            revision: 0,
        }
    }
}

struct Inner {
    backend: Arc<dyn Backend>,
    state: watch::Sender<StoreState>,
    mounted: AtomicBool,
    listener: Mutex<Option<JoinHandle<()>>>,
}

impl Inner {
    fn is_mounted(&self) -> bool {
        self.mounted.load(Ordering::Acquire)
    }

    /// Apply `modify` to the published state, unless the store has been
    /// unmounted. Returns whether anything was published.
    fn publish(&self, modify: impl FnOnce(&mut StoreState)) -> bool {
        self.state.send_if_modified(|state| {
            if !self.is_mounted() {
                return false;
            }
            modify(state);
            true
        })
    }

    async fn fetch_all(&self) -> Result<()> {
        trace!("fetching all locations");
        let (locations, outcome) = match self.backend.list().await {
            Ok(locations) => (Some(locations), Ok(())),
            Err(e) => {
                warn!("Failed to fetch locations: {e}");
                (None, Err(e))
            }
        };
        let message = outcome.as_ref().err().map(ToString::to_string);
        let published = self.publish(|state| {
            match locations {
                Some(locations) => {
                    debug!(n = locations.len(), "replacing location list");
                    state.locations = locations;
                    state.error = None;
                    state.revision += 1;
                }
                None => state.error = message,
            }
            state.loading = false;
        });
        if !published {
            debug!("discarding fetch result, store is unmounted");
        }
        outcome
    }

    fn record_error(&self, e: &Error) {
        self.publish(|state| state.error = Some(e.to_string()));
    }
}

impl Drop for Inner {
    fn drop(&mut self) {
        let listener = self.listener.get_mut().unwrap_or_else(PoisonError::into_inner);
        if let Some(listener) = listener.take() {
            listener.abort();
        }
    }
}

/// A cheaply cloneable handle to the shared location list. All clones refer to
/// the same state; unmounting through any of them unmounts all of them.
#[derive(Clone)]
pub struct LocationStore {
    inner: Arc<Inner>,
}

impl std::fmt::Debug for LocationStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LocationStore")
            .field("mounted", &self.is_mounted())
            .field("state", &*self.inner.state.borrow())
            .finish()
    }
}

impl LocationStore {
    /// Subscribe to the backend's change notifications and start the initial
    /// fetch. Must be called from within a tokio runtime.
    pub fn mount(backend: Arc<dyn Backend>) -> Self {
        let (state, _) = watch::channel(StoreState::default());
        let subscription = match backend.subscribe() {
            Ok(subscription) => Some(subscription),
            Err(e) => {
                warn!("Failed to subscribe to location changes: {e}");
                state.send_modify(|state| state.error = Some(e.to_string()));
                None
            }
        };
        let inner = Arc::new(Inner {
            backend,
            state,
            mounted: AtomicBool::new(true),
            listener: Mutex::new(None),
        });
        let listener = tokio::spawn(listen(Arc::downgrade(&inner), subscription));
        *inner.listener.lock().unwrap_or_else(PoisonError::into_inner) = Some(listener);
        debug!("location store mounted");
        Self { inner }
    }

    /// Replace the local list with the backend's current list. On failure the
    /// previous list is kept and the error is recorded in the state as well as
    /// returned.
    pub async fn fetch_all(&self) -> Result<()> {
        self.inner.fetch_all().await
    }

    /// Store a new location. No validation is performed here; see
    /// [LocationStore::submit]. The stored row is put at the front of the local
    /// list without re-fetching.
    pub async fn add(&self, location: &NewLocation) -> Result<Location> {
        if !self.inner.is_mounted() {
            return Err(Error::StoreUnmounted);
        }
        match self.inner.backend.insert(location).await {
            Ok(stored) => {
                self.inner.publish(|state| {
                    state.locations.insert(0, stored.clone());
                    state.revision += 1;
                });
                Ok(stored)
            }
            Err(e) => {
                warn!("Failed to add location: {e}");
                self.inner.record_error(&e);
                Err(e)
            }
        }
    }

    /// Validate a submission and then [add](LocationStore::add) it. Invalid
    /// submissions never reach the backend.
    pub async fn submit(&self, location: &NewLocation) -> Result<Location> {
        location.validate()?;
        self.add(location).await
    }

    /// Observe the state of the store
    pub fn subscribe(&self) -> watch::Receiver<StoreState> {
        self.inner.state.subscribe()
    }

    /// A copy of the current state
    pub fn snapshot(&self) -> StoreState {
        self.inner.state.borrow().clone()
    }

    pub fn is_mounted(&self) -> bool {
        self.inner.is_mounted()
    }

    /// Release the change subscription and abandon all fetches that are still
    /// in flight. No state changes are published after this returns.
    pub async fn unmount(&self) {
        // flip the flag while holding the state lock so that no publish can
        // interleave with it
        let mut was_mounted = false;
        self.inner.state.send_if_modified(|_| {
            was_mounted = self.inner.mounted.swap(false, Ordering::AcqRel);
            false
        });
        if !was_mounted {
            return;
        }
        let listener = self
            .inner
            .listener
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(listener) = listener {
            listener.abort();
            let _ = listener.await;
        }
        debug!("location store unmounted");
    }
}

async fn fetch(inner: Weak<Inner>) {
    if let Some(inner) = inner.upgrade() {
        // failures are already recorded in the store state
        let _ = inner.fetch_all().await;
    }
}

async fn listen(inner: Weak<Inner>, subscription: Option<Subscription>) {
    let mut inflight = JoinSet::new();
    inflight.spawn(fetch(inner.clone()));
    if let Some(mut subscription) = subscription {
        loop {
            tokio::select! {
                event = subscription.next() => match event {
                    Some(event) => {
                        debug!(kind = %event.kind, "locations changed, re-fetching");
                        inflight.spawn(fetch(inner.clone()));
                    }
                    None => break,
                },
                Some(_) = inflight.join_next(), if !inflight.is_empty() => (),
            }
        }
        debug!("backend closed the change subscription");
    }
    while inflight.join_next().await.is_some() {}
}
