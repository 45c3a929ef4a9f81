//! The root of the application: mounts the store, the selection and the map
//! together and tears them down together
use crate::{
    Result,
    backend::Backend,
    map::{MapEvent, MapOptions, MapRenderer, MapView},
    selection::{SelectionEvents, SelectionHandle, SelectionProvider},
    store::{LocationStore, StoreState},
};
use std::sync::Arc;
use tokio::{
    sync::{mpsc, oneshot, watch},
    task::JoinHandle,
};
use tracing::{debug, info, warn};

/// A mounted map application.
///
/// The location list and the selection each flow one way into the map view.
/// A single task applies both flows, plus the popup events reported by the
/// renderer, so every update to the view runs to completion before the next
/// one starts.
pub struct MapApp {
    store: LocationStore,
    selection: SelectionProvider,
    events: mpsc::UnboundedSender<MapEvent>,
    shutdown: Option<oneshot::Sender<()>>,
    view_task: Option<JoinHandle<MapView>>,
}

impl std::fmt::Debug for MapApp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MapApp")
            .field("store", &self.store)
            .field("selection", &self.selection)
            .finish_non_exhaustive()
    }
}

impl MapApp {
    /// Create the map and start following the backend. Fails without touching
    /// the backend if the map can't be created.
    pub fn mount(
        backend: Arc<dyn Backend>,
        renderer: Box<dyn MapRenderer>,
        options: &MapOptions,
    ) -> Result<Self> {
        let view = MapView::mount(renderer, options)?;
        let store = LocationStore::mount(backend);
        let selection = SelectionProvider::new();
        let (events, events_rx) = mpsc::unbounded_channel();
        let (shutdown, shutdown_rx) = oneshot::channel();
        let view_task = tokio::spawn(run_view(
            view,
            store.subscribe(),
            selection.subscribe(),
            events_rx,
            shutdown_rx,
        ));
        info!("map application mounted");
        Ok(Self {
            store,
            selection,
            events,
            shutdown: Some(shutdown),
            view_task: Some(view_task),
        })
    }

    pub fn store(&self) -> &LocationStore {
        &self.store
    }

    pub fn selection(&self) -> SelectionHandle {
        self.selection.handle()
    }

    /// The channel on which the renderer reports popup interactions
    pub fn map_events(&self) -> mpsc::UnboundedSender<MapEvent> {
        self.events.clone()
    }

    /// Release the change subscription, stop updating the map and then remove
    /// every marker and destroy the map. Selection handles fail afterwards.
    pub async fn unmount(mut self) {
        self.store.unmount().await;
        if let Some(shutdown) = self.shutdown.take() {
            let _ = shutdown.send(());
        }
        if let Some(task) = self.view_task.take() {
            match task.await {
                Ok(view) => view.unmount(),
                Err(e) => warn!("Map view task failed: {e}"),
            }
        }
        info!("map application unmounted");
    }
}

impl Drop for MapApp {
    fn drop(&mut self) {
        if let Some(task) = self.view_task.take() {
            task.abort();
        }
    }
}

async fn run_view(
    mut view: MapView,
    mut store: watch::Receiver<StoreState>,
    mut selection: SelectionEvents,
    mut events: mpsc::UnboundedReceiver<MapEvent>,
    mut shutdown: oneshot::Receiver<()>,
) -> MapView {
    let (mut drawn, locations) = {
        let state = store.borrow_and_update();
        (state.revision, state.locations.clone())
    };
    view.sync_markers(&locations);
    loop {
        tokio::select! {
            biased;
            _ = &mut shutdown => break,
            changed = store.changed() => {
                if changed.is_err() {
                    break;
                }
                // error and loading updates leave the markers alone
                let replaced = {
                    let state = store.borrow_and_update();
                    (state.revision != drawn).then(|| (state.revision, state.locations.clone()))
                };
                if let Some((revision, locations)) = replaced {
                    view.sync_markers(&locations);
                    drawn = revision;
                }
            }
            event = selection.recv() => match event {
                Some(event) => {
                    debug!(generation = event.generation, "applying selection");
                    view.sync_selection(event.coordinate);
                }
                None => break,
            },
            Some(event) = events.recv() => view.handle_event(event),
        }
    }
    view
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        Error,
        location::{Coordinate, NewLocation},
        map::{HeadlessMap, MarkerKind, SELECTION_ZOOM},
        testing::{MemoryBackend, eventually, wait_for},
    };
    use secrecy::SecretString;
    use test_log::test;

    fn options() -> MapOptions {
        MapOptions::new(SecretString::from("pk.test".to_string()))
    }

    fn selection_markers(map: &HeadlessMap) -> usize {
        map.snapshot()
            .markers
            .values()
            .filter(|m| m.marker.element.kind == MarkerKind::Selection)
            .count()
    }

    async fn mounted() -> (MapApp, Arc<MemoryBackend>, HeadlessMap) {
        let backend = MemoryBackend::new();
        let map = HeadlessMap::new();
        let app = MapApp::mount(backend.clone(), Box::new(map.clone()), &options())
            .expect("mount failed");
        let mut rx = app.store().subscribe();
        wait_for(&mut rx, |s| !s.loading).await;
        (app, backend, map)
    }

    #[test(tokio::test)]
    async fn test_add_then_fetch_yields_record_once() {
        let (app, _backend, map) = mounted().await;
        let stored = app
            .store()
            .submit(&NewLocation::new(
                "Cafe Tugu".into(),
                "Kopi".into(),
                -6.2088,
                106.8456,
            ))
            .await
            .expect("submit failed");
        app.store().fetch_all().await.expect("fetch failed");
        let state = app.store().snapshot();
        assert_eq!(
            state.locations.iter().filter(|l| l.id == stored.id).count(),
            1
        );
        eventually(|| map.marker_for_location(&stored.id).is_some()).await;
        assert_eq!(map.snapshot().markers.len(), 1);
        app.unmount().await;
    }

    #[test(tokio::test)]
    async fn test_selection_then_clear() {
        let (app, _backend, map) = mounted().await;
        let selection = app.selection();
        let jakarta = Coordinate::from([106.8456, -6.2088]);

        selection.set(Some(jakarta)).expect("selection out of scope");
        eventually(|| selection_markers(&map) == 1).await;
        let flight = *map.snapshot().flights.last().expect("no flight");
        assert_eq!(flight.center, jakarta);
        assert_eq!(flight.zoom, SELECTION_ZOOM);

        selection.set(None).expect("selection out of scope");
        eventually(|| selection_markers(&map) == 0).await;
        assert_eq!(map.snapshot().flights.len(), 1);
        app.unmount().await;
    }

    #[test(tokio::test)]
    async fn test_every_selection_set_reaches_the_map() {
        let (app, _backend, map) = mounted().await;
        let selection = app.selection();
        let jakarta = Coordinate::from([106.8456, -6.2088]);
        let bogor = Coordinate::from([106.7990, -6.5950]);

        selection.set(Some(jakarta)).expect("selection out of scope");
        selection.set(Some(jakarta)).expect("selection out of scope");
        eventually(|| map.snapshot().flights.len() == 2).await;

        selection.set(Some(bogor)).expect("selection out of scope");
        selection.set(None).expect("selection out of scope");
        eventually(|| map.snapshot().flights.len() == 3 && selection_markers(&map) == 0).await;
        let flights = map.snapshot().flights;
        assert_eq!(
            flights.iter().map(|f| f.center).collect::<Vec<_>>(),
            vec![jakarta, jakarta, bogor]
        );
        app.unmount().await;
    }

    #[test(tokio::test)]
    async fn test_identical_refetch_resyncs_markers() {
        let (app, _backend, map) = mounted().await;
        let mut rx = app.store().subscribe();
        let stored = app
            .store()
            .submit(&NewLocation::new("monas".into(), "".into(), -6.1754, 106.8272))
            .await
            .expect("submit failed");
        // the prepend and the refetch after the insert notification
        wait_for(&mut rx, |s| s.revision >= 3).await;
        eventually(|| map.marker_for_location(&stored.id).is_some()).await;
        let before = map
            .marker_for_location(&stored.id)
            .expect("marker disappeared");

        app.store().fetch_all().await.expect("fetch failed");
        eventually(|| {
            map.snapshot().markers.len() == 1
                && map
                    .marker_for_location(&stored.id)
                    .is_some_and(|id| id != before)
        })
        .await;
        app.unmount().await;
    }

    #[test(tokio::test)]
    async fn test_popup_events() {
        let (app, _backend, map) = mounted().await;
        let stored = app
            .store()
            .submit(&NewLocation::new("pasar baru".into(), "".into(), -6.16, 106.83))
            .await
            .expect("submit failed");
        eventually(|| map.marker_for_location(&stored.id).is_some()).await;
        let id = map
            .marker_for_location(&stored.id)
            .expect("marker disappeared");

        app.map_events()
            .send(MapEvent::PopupOpened(id))
            .expect("view task is gone");
        eventually(|| map.snapshot().markers.get(&id).is_some_and(|m| m.highlighted)).await;
        app.map_events()
            .send(MapEvent::PopupClosed(id))
            .expect("view task is gone");
        eventually(|| map.snapshot().markers.get(&id).is_some_and(|m| !m.highlighted)).await;
        app.unmount().await;
    }

    #[test(tokio::test)]
    async fn test_unmount_releases_everything() {
        let (app, backend, map) = mounted().await;
        app.store()
            .submit(&NewLocation::new("taman".into(), "".into(), -6.2, 106.8))
            .await
            .expect("submit failed");
        app.selection()
            .set(Some(Coordinate::new(106.8, -6.2)))
            .expect("selection out of scope");
        eventually(|| map.snapshot().markers.len() == 2).await;
        assert_eq!(backend.subscribers(), 1);

        let store = app.store().clone();
        let selection = app.selection();
        app.unmount().await;

        let state = map.snapshot();
        assert!(state.markers.is_empty());
        assert!(state.destroyed);
        assert_eq!(backend.subscribers(), 0);
        assert!(!store.is_mounted());
        assert!(matches!(selection.get(), Err(Error::SelectionOutOfScope)));
    }

    #[test(tokio::test)]
    async fn test_mount_without_token() {
        let backend = MemoryBackend::new();
        let res = MapApp::mount(
            backend.clone(),
            Box::new(HeadlessMap::new()),
            &MapOptions::new(SecretString::from(String::new())),
        );
        assert!(matches!(res, Err(Error::MissingMapToken)));
        assert_eq!(backend.subscribers(), 0);
    }
}
