//! The seam between the client-side state and the service that persists
//! locations and fans out change notifications
use crate::{
    Result,
    location::{Location, NewLocation},
};
use async_trait::async_trait;
use tokio::sync::broadcast::{self, error::RecvError};
use tracing::{debug, warn};

pub mod sqlite;

pub use sqlite::SqliteBackend;

/// The kind of change that a backend observed on the location collection
#[derive(Debug, Clone, Copy, PartialEq, Eq, strum_macros::Display, strum_macros::EnumString)]
#[strum(serialize_all = "lowercase")]
pub enum ChangeKind {
    Insert,
    Update,
    Delete,
    /// Some other client changed the collection; the exact operation is unknown
    External,
}

/// A notification that something in the location collection changed. Consumers
/// are expected to re-fetch the collection rather than inspect the payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChangeEvent {
    pub kind: ChangeKind,
}

impl ChangeEvent {
    pub fn new(kind: ChangeKind) -> Self {
        Self { kind }
    }
}

/// A standing subscription to the change notifications of a backend. The
/// subscription is released when this object is dropped.
#[derive(Debug)]
pub struct Subscription {
    receiver: broadcast::Receiver<ChangeEvent>,
}

impl Subscription {
    pub fn new(receiver: broadcast::Receiver<ChangeEvent>) -> Self {
        Self { receiver }
    }

    /// Wait for the next change notification. Returns `None` once the backend
    /// has gone away. If notifications were dropped because this subscriber fell
    /// behind, a single [ChangeKind::External] event is reported in their place.
    pub async fn next(&mut self) -> Option<ChangeEvent> {
        match self.receiver.recv().await {
            Ok(event) => Some(event),
            Err(RecvError::Lagged(n)) => {
                warn!(skipped = n, "change subscription lagged");
                Some(ChangeEvent::new(ChangeKind::External))
            }
            Err(RecvError::Closed) => None,
        }
    }

    pub fn unsubscribe(self) {
        debug!("Releasing change subscription");
    }
}

/// A service that persists locations and notifies subscribers about changes
#[async_trait]
pub trait Backend: Send + Sync {
    /// Fetch every location, newest first
    async fn list(&self) -> Result<Vec<Location>>;

    /// Store a new location and return the complete row as stored by the backend
    async fn insert(&self, location: &NewLocation) -> Result<Location>;

    /// Start receiving notifications about inserts, updates and deletions
    fn subscribe(&self) -> Result<Subscription>;
}
