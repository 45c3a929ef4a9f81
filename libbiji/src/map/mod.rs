//! The map view and the interface to whatever renders the map
use crate::{Result, location::Coordinate};
use secrecy::SecretString;
use serde::Serialize;
use std::{fmt, time::Duration};

pub mod headless;
pub mod view;

pub use headless::HeadlessMap;
pub use view::{MapView, PopupState};

pub const DEFAULT_STYLE_URL: &str = "mapbox://styles/mapbox/streets-v12";
/// Jakarta
pub const DEFAULT_CENTER: Coordinate = Coordinate {
    longitude: 106.8456,
    latitude: -6.2088,
};
pub const DEFAULT_ZOOM: f64 = 12.0;

/// Zoom level used when the popup of a location marker is opened
pub const POPUP_ZOOM: f64 = 16.0;
/// Zoom level used when flying to a selected coordinate
pub const SELECTION_ZOOM: f64 = 14.0;
pub const FLIGHT_DURATION: Duration = Duration::from_millis(1000);

pub const MARKER_SIZE_PX: u32 = 20;
pub const POPUP_OFFSET_PX: u32 = 25;
pub const SELECTION_COLOR: &str = "#ef4444";

/// The settings used to create a map
#[derive(Debug, Clone)]
pub struct MapOptions {
    pub style_url: String,
    pub center: Coordinate,
    pub zoom: f64,
    pub access_token: SecretString,
}

impl MapOptions {
    pub fn new(access_token: SecretString) -> Self {
        Self {
            style_url: DEFAULT_STYLE_URL.to_string(),
            center: DEFAULT_CENTER,
            zoom: DEFAULT_ZOOM,
            access_token,
        }
    }
}

/// Identifies a marker placed by a [MapRenderer]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct MarkerId(pub u64);

impl fmt::Display for MarkerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// What a marker stands for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, strum_macros::Display)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum MarkerKind {
    /// A stored location
    Location,
    /// The temporary marker at the selected coordinate
    Selection,
}

/// The visual element drawn for a marker: a round dot with a white border
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MarkerElement {
    pub kind: MarkerKind,
    pub color: String,
    pub size_px: u32,
}

impl MarkerElement {
    pub fn location(color: String) -> Self {
        Self {
            kind: MarkerKind::Location,
            color,
            size_px: MARKER_SIZE_PX,
        }
    }

    pub fn selection() -> Self {
        Self {
            kind: MarkerKind::Selection,
            color: SELECTION_COLOR.to_string(),
            size_px: MARKER_SIZE_PX,
        }
    }
}

/// Detail text shown when a marker is clicked
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Popup {
    pub title: String,
    pub body: String,
    pub offset_px: u32,
}

impl Popup {
    pub fn new(title: String, body: String) -> Self {
        Self {
            title,
            body,
            offset_px: POPUP_OFFSET_PX,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Marker {
    /// The id of the location this marker stands for, if any
    pub location_id: Option<String>,
    pub coordinate: Coordinate,
    pub element: MarkerElement,
    pub popup: Option<Popup>,
}

/// An animated camera movement. A new flight interrupts any flight that is
/// still running.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Flight {
    pub center: Coordinate,
    pub zoom: f64,
    pub duration: Duration,
}

impl Flight {
    pub fn new(center: Coordinate, zoom: f64) -> Self {
        Self {
            center,
            zoom,
            duration: FLIGHT_DURATION,
        }
    }
}

/// Interactions reported by the renderer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MapEvent {
    PopupOpened(MarkerId),
    PopupClosed(MarkerId),
}

/// A map renderer. Implementations draw the base map, markers and popups and
/// animate the camera; the [MapView] decides what to draw.
pub trait MapRenderer: Send {
    /// Create the map. Called once, before any other method.
    fn create(&mut self, options: &MapOptions) -> Result<()>;

    fn add_marker(&mut self, marker: Marker) -> MarkerId;

    /// Remove a marker and its popup. Unknown ids are ignored.
    fn remove_marker(&mut self, id: MarkerId);

    /// Turn the highlight (pulse) effect of a marker on or off
    fn set_highlight(&mut self, id: MarkerId, highlighted: bool);

    /// Start a camera flight without waiting for it to finish
    fn fly_to(&mut self, flight: Flight);

    /// Tear down the map. No other method is called afterwards.
    fn destroy(&mut self);
}
