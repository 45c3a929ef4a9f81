//! A [MapRenderer] that keeps the map in memory instead of drawing it
use super::{Flight, MapOptions, MapRenderer, Marker, MarkerId};
use crate::{Result, location::Coordinate};
use serde_json::{Value, json};
use std::{
    collections::BTreeMap,
    sync::{Arc, Mutex, MutexGuard, PoisonError},
};

/// Where the camera is pointing
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Camera {
    pub center: Coordinate,
    pub zoom: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PlacedMarker {
    pub marker: Marker,
    pub highlighted: bool,
}

/// Everything a [HeadlessMap] has been told to draw
#[derive(Debug, Clone, Default)]
pub struct HeadlessState {
    pub style_url: Option<String>,
    /// `None` until the map is created
    pub camera: Option<Camera>,
    pub markers: BTreeMap<MarkerId, PlacedMarker>,
    /// Every flight that was started, oldest first
    pub flights: Vec<Flight>,
    pub destroyed: bool,
    next_id: u64,
}

/// An in-memory map renderer. Clones share the same state, so a caller can
/// hand one clone to a [MapView](super::MapView) and inspect the map through
/// another.
#[derive(Debug, Clone, Default)]
pub struct HeadlessMap {
    state: Arc<Mutex<HeadlessState>>,
    echo: bool,
}

impl HeadlessMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// A renderer that also prints every operation to stdout
    pub fn with_echo() -> Self {
        Self {
            echo: true,
            ..Self::default()
        }
    }

    fn lock(&self) -> MutexGuard<'_, HeadlessState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn echo(&self, line: impl FnOnce() -> String) {
        if self.echo {
            println!("[map] {}", line());
        }
    }

    pub fn snapshot(&self) -> HeadlessState {
        self.lock().clone()
    }

    pub fn marker_for_location(&self, location_id: &str) -> Option<MarkerId> {
        self.lock()
            .markers
            .iter()
            .find(|(_, placed)| placed.marker.location_id.as_deref() == Some(location_id))
            .map(|(id, _)| *id)
    }

    /// Export the placed markers as a GeoJSON `FeatureCollection`
    pub fn to_geojson(&self) -> Value {
        let state = self.lock();
        let features: Vec<Value> = state
            .markers
            .iter()
            .map(|(id, placed)| {
                let marker = &placed.marker;
                json!({
                    "type": "Feature",
                    "id": id.0,
                    "geometry": {
                        "type": "Point",
                        "coordinates": [marker.coordinate.longitude, marker.coordinate.latitude],
                    },
                    "properties": {
                        "kind": marker.element.kind,
                        "location_id": marker.location_id,
                        "color": marker.element.color,
                        "highlighted": placed.highlighted,
                        "title": marker.popup.as_ref().map(|p| p.title.as_str()),
                        "description": marker.popup.as_ref().map(|p| p.body.as_str()),
                    },
                })
            })
            .collect();
        json!({
            "type": "FeatureCollection",
            "features": features,
        })
    }
}

impl MapRenderer for HeadlessMap {
    fn create(&mut self, options: &MapOptions) -> Result<()> {
        let mut state = self.lock();
        state.style_url = Some(options.style_url.clone());
        state.camera = Some(Camera {
            center: options.center,
            zoom: options.zoom,
        });
        state.destroyed = false;
        drop(state);
        self.echo(|| {
            format!(
                "created {} at [{}, {}] zoom {}",
                options.style_url, options.center.longitude, options.center.latitude, options.zoom
            )
        });
        Ok(())
    }

    fn add_marker(&mut self, marker: Marker) -> MarkerId {
        let mut state = self.lock();
        state.next_id += 1;
        let id = MarkerId(state.next_id);
        self.echo(|| {
            format!(
                "marker {id} {} {} at [{}, {}]{}",
                marker.element.kind,
                marker.element.color,
                marker.coordinate.longitude,
                marker.coordinate.latitude,
                marker
                    .popup
                    .as_ref()
                    .map(|p| format!(" \"{}\"", p.title))
                    .unwrap_or_default()
            )
        });
        state.markers.insert(
            id,
            PlacedMarker {
                marker,
                highlighted: false,
            },
        );
        id
    }

    fn remove_marker(&mut self, id: MarkerId) {
        if self.lock().markers.remove(&id).is_some() {
            self.echo(|| format!("removed marker {id}"));
        }
    }

    fn set_highlight(&mut self, id: MarkerId, highlighted: bool) {
        let mut state = self.lock();
        let Some(placed) = state.markers.get_mut(&id) else {
            return;
        };
        if placed.highlighted != highlighted {
            placed.highlighted = highlighted;
            drop(state);
            self.echo(|| {
                let verb = if highlighted { "highlighted" } else { "unhighlighted" };
                format!("{verb} marker {id}")
            });
        }
    }

    fn fly_to(&mut self, flight: Flight) {
        let mut state = self.lock();
        // the camera jumps to the target: a newer flight always replaces an
        // unfinished one
        state.camera = Some(Camera {
            center: flight.center,
            zoom: flight.zoom,
        });
        state.flights.push(flight);
        drop(state);
        self.echo(|| {
            format!(
                "flying to [{}, {}] zoom {} over {}ms",
                flight.center.longitude,
                flight.center.latitude,
                flight.zoom,
                flight.duration.as_millis()
            )
        });
    }

    fn destroy(&mut self) {
        let mut state = self.lock();
        state.markers.clear();
        state.destroyed = true;
        drop(state);
        self.echo(|| "destroyed".to_string());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::map::{MarkerElement, Popup};
    use secrecy::SecretString;

    fn marker(location_id: &str, coordinate: Coordinate) -> Marker {
        Marker {
            location_id: Some(location_id.to_string()),
            coordinate,
            element: MarkerElement::location("#123456".to_string()),
            popup: Some(Popup::new("Cafe Tugu".into(), "Kopi".into())),
        }
    }

    #[test]
    fn test_records_operations() {
        let mut map = HeadlessMap::new();
        let observer = map.clone();
        map.create(&MapOptions::new(SecretString::from("pk".to_string())))
            .expect("create failed");
        let a = map.add_marker(marker("a", Coordinate::new(106.8, -6.2)));
        let b = map.add_marker(marker("b", Coordinate::new(106.9, -6.3)));
        assert_ne!(a, b);
        map.set_highlight(b, true);
        map.fly_to(Flight::new(Coordinate::new(106.9, -6.3), 16.0));

        let state = observer.snapshot();
        assert_eq!(state.markers.len(), 2);
        assert!(state.markers[&b].highlighted);
        assert!(!state.markers[&a].highlighted);
        assert_eq!(
            state.camera,
            Some(Camera {
                center: Coordinate::new(106.9, -6.3),
                zoom: 16.0
            })
        );
        assert_eq!(observer.marker_for_location("b"), Some(b));
        assert_eq!(observer.marker_for_location("c"), None);

        map.remove_marker(a);
        // unknown ids are ignored
        map.remove_marker(a);
        map.set_highlight(a, true);
        assert_eq!(observer.snapshot().markers.len(), 1);

        map.destroy();
        let state = observer.snapshot();
        assert!(state.destroyed);
        assert!(state.markers.is_empty());
    }

    #[test]
    fn test_geojson() {
        let mut map = HeadlessMap::new();
        map.create(&MapOptions::new(SecretString::from("pk".to_string())))
            .expect("create failed");
        map.add_marker(marker("a", Coordinate::new(106.8456, -6.2088)));
        map.add_marker(Marker {
            location_id: None,
            coordinate: Coordinate::new(1.0, 2.0),
            element: MarkerElement::selection(),
            popup: None,
        });

        let geojson = map.to_geojson();
        assert_eq!(geojson["type"], "FeatureCollection");
        let features = geojson["features"].as_array().expect("no features");
        assert_eq!(features.len(), 2);
        assert_eq!(
            features[0]["geometry"]["coordinates"],
            json!([106.8456, -6.2088])
        );
        assert_eq!(features[0]["properties"]["kind"], "location");
        assert_eq!(features[0]["properties"]["location_id"], "a");
        assert_eq!(features[0]["properties"]["title"], "Cafe Tugu");
        assert_eq!(features[1]["properties"]["kind"], "selection");
        assert_eq!(features[1]["properties"]["color"], "#ef4444");
        assert!(features[1]["properties"]["title"].is_null());
    }
}
