//! Keeps the markers of a [MapRenderer] in sync with the location list and the
//! selection
use super::{
    Flight, MapEvent, MapOptions, MapRenderer, Marker, MarkerElement, MarkerId, POPUP_ZOOM,
    Popup, SELECTION_ZOOM,
};
use crate::{
    Error, Result,
    color::{ColorDeriver, to_title_case},
    location::{Coordinate, Location},
};
use secrecy::ExposeSecret;
use tracing::{debug, trace};

/// Whether the popup of a location marker is showing
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, strum_macros::Display)]
#[strum(serialize_all = "lowercase")]
pub enum PopupState {
    #[default]
    Closed,
    Open,
}

#[derive(Debug)]
struct PlacedMarker {
    id: MarkerId,
    location_id: String,
    coordinate: Coordinate,
    popup: PopupState,
}

/// The map as the user sees it: one marker per location plus an optional
/// highlight marker at the selected coordinate
pub struct MapView {
    renderer: Box<dyn MapRenderer>,
    colors: ColorDeriver,
    markers: Vec<PlacedMarker>,
    selection_marker: Option<MarkerId>,
}

impl std::fmt::Debug for MapView {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MapView")
            .field("markers", &self.markers)
            .field("selection_marker", &self.selection_marker)
            .finish_non_exhaustive()
    }
}

impl MapView {
    /// Create the map. Fails with [Error::MissingMapToken] if no access token
    /// was configured.
    pub fn mount(mut renderer: Box<dyn MapRenderer>, options: &MapOptions) -> Result<Self> {
        if options.access_token.expose_secret().trim().is_empty() {
            return Err(Error::MissingMapToken);
        }
        renderer.create(options)?;
        debug!(style = %options.style_url, "map created");
        Ok(Self {
            renderer,
            colors: ColorDeriver::new(),
            markers: Vec::new(),
            selection_marker: None,
        })
    }

    /// Replace all location markers with one marker per location
    pub fn sync_markers(&mut self, locations: &[Location]) {
        for marker in self.markers.drain(..) {
            self.renderer.remove_marker(marker.id);
        }
        for location in locations {
            let coordinate = location.coordinate();
            let id = self.renderer.add_marker(Marker {
                location_id: Some(location.id.clone()),
                coordinate,
                element: MarkerElement::location(self.colors.color_for(&location.name)),
                popup: Some(Popup::new(
                    to_title_case(&location.name),
                    to_title_case(&location.description),
                )),
            });
            self.markers.push(PlacedMarker {
                id,
                location_id: location.id.clone(),
                coordinate,
                popup: PopupState::Closed,
            });
        }
        debug!(n = self.markers.len(), "markers synced");
    }

    /// Move the highlight marker to `coordinate` and fly there. `None` only
    /// removes the highlight marker.
    pub fn sync_selection(&mut self, coordinate: Option<Coordinate>) {
        if let Some(previous) = self.selection_marker.take() {
            self.renderer.remove_marker(previous);
        }
        let Some(coordinate) = coordinate else {
            trace!("selection cleared");
            return;
        };
        let id = self.renderer.add_marker(Marker {
            location_id: None,
            coordinate,
            element: MarkerElement::selection(),
            popup: None,
        });
        self.selection_marker = Some(id);
        self.renderer.fly_to(Flight::new(coordinate, SELECTION_ZOOM));
    }

    /// Apply a popup interaction reported by the renderer
    pub fn handle_event(&mut self, event: MapEvent) {
        match event {
            MapEvent::PopupOpened(id) => self.open_popup(id),
            MapEvent::PopupClosed(id) => self.close_popup(id),
        }
    }

    fn open_popup(&mut self, id: MarkerId) {
        let Some(index) = self.markers.iter().position(|m| m.id == id) else {
            debug!(%id, "ignoring popup event for unknown marker");
            return;
        };
        if self.markers[index].popup == PopupState::Open {
            return;
        }
        for marker in self.markers.iter_mut() {
            self.renderer.set_highlight(marker.id, false);
            marker.popup = PopupState::Closed;
        }
        let marker = &mut self.markers[index];
        marker.popup = PopupState::Open;
        self.renderer.set_highlight(id, true);
        self.renderer.fly_to(Flight::new(marker.coordinate, POPUP_ZOOM));
    }

    fn close_popup(&mut self, id: MarkerId) {
        let Some(marker) = self.markers.iter_mut().find(|m| m.id == id) else {
            debug!(%id, "ignoring popup event for unknown marker");
            return;
        };
        if marker.popup == PopupState::Open {
            marker.popup = PopupState::Closed;
            self.renderer.set_highlight(id, false);
        }
    }

    pub fn popup_state(&self, id: MarkerId) -> Option<PopupState> {
        self.markers.iter().find(|m| m.id == id).map(|m| m.popup)
    }

    /// The marker currently placed for a location
    pub fn marker_for(&self, location_id: &str) -> Option<MarkerId> {
        self.markers
            .iter()
            .find(|m| m.location_id == location_id)
            .map(|m| m.id)
    }

    pub fn marker_count(&self) -> usize {
        self.markers.len()
    }

    pub fn selection_marker(&self) -> Option<MarkerId> {
        self.selection_marker
    }

    /// Remove every marker and destroy the map
    pub fn unmount(mut self) {
        for marker in self.markers.drain(..) {
            self.renderer.remove_marker(marker.id);
        }
        if let Some(id) = self.selection_marker.take() {
            self.renderer.remove_marker(id);
        }
        self.renderer.destroy();
        debug!("map destroyed");
    }
}
