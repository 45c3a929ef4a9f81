//! The focused coordinate that the map camera follows.
//!
//! A [SelectionProvider] is created when the application is mounted and owns
//! the selection for as long as it lives. Components get a [SelectionHandle]
//! from the provider and can read or replace the selection through it. Once
//! the provider is dropped, every handle fails with
//! [Error::SelectionOutOfScope].
use crate::{Error, Result, location::Coordinate};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};
use tokio::sync::mpsc;
use tracing::{debug, trace};

/// One call to [SelectionHandle::set]. `generation` counts the calls, so
/// setting the same coordinate twice is still observed as two separate events.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct SelectionEvent {
    pub coordinate: Option<Coordinate>,
    pub generation: u64,
}

/// Receives every [SelectionEvent] in the order the sets happened. Yields
/// `None` once the provider is dropped.
pub type SelectionEvents = mpsc::UnboundedReceiver<SelectionEvent>;

#[derive(Debug, Default)]
struct Shared {
    current: Mutex<SelectionEvent>,
    observers: Mutex<Vec<mpsc::UnboundedSender<SelectionEvent>>>,
}

impl Shared {
    fn current(&self) -> MutexGuard<'_, SelectionEvent> {
        self.current.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn observers(&self) -> MutexGuard<'_, Vec<mpsc::UnboundedSender<SelectionEvent>>> {
        self.observers.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn subscribe(&self) -> SelectionEvents {
        let (tx, rx) = mpsc::unbounded_channel();
        self.observers().push(tx);
        rx
    }
}

/// Owner of the selection state, scoped to the lifetime of the application
#[derive(Debug, Default)]
pub struct SelectionProvider {
    shared: Arc<Shared>,
}

impl SelectionProvider {
    pub fn new() -> Self {
        Self::default()
    }

    /// Get a handle for reading and writing the selection
    pub fn handle(&self) -> SelectionHandle {
        SelectionHandle {
            shared: Arc::downgrade(&self.shared),
        }
    }

    /// Observe selection changes from now on
    pub fn subscribe(&self) -> SelectionEvents {
        self.shared.subscribe()
    }
}

/// A cheaply cloneable accessor for the selection of a [SelectionProvider]
#[derive(Debug, Clone)]
pub struct SelectionHandle {
    shared: Weak<Shared>,
}

impl SelectionHandle {
    fn provider(&self) -> Result<Arc<Shared>> {
        self.shared.upgrade().ok_or(Error::SelectionOutOfScope)
    }

    /// The currently selected coordinate, if any
    pub fn get(&self) -> Result<Option<Coordinate>> {
        Ok(self.provider()?.current().coordinate)
    }

    /// Replace the selection. Every call is delivered to every observer, even
    /// when the new value is equal to the current one.
    pub fn set(&self, coordinate: Option<Coordinate>) -> Result<()> {
        let shared = self.provider()?;
        // held while sending so observers see sets in the order they happened
        let mut current = shared.current();
        current.coordinate = coordinate;
        current.generation += 1;
        let event = *current;
        debug!(?coordinate, generation = event.generation, "selection changed");
        shared.observers().retain(|tx| {
            let open = tx.send(event).is_ok();
            if !open {
                trace!("dropping closed selection observer");
            }
            open
        });
        Ok(())
    }

    pub fn clear(&self) -> Result<()> {
        self.set(None)
    }

    pub fn subscribe(&self) -> Result<SelectionEvents> {
        Ok(self.provider()?.subscribe())
    }
}
