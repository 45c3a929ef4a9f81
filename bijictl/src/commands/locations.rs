//! Commands that read or change the shared [Location]s
use crate::{
    config::Config,
    output::{
        self, OutputFormat,
        rows::{ColorRow, LocationRow},
    },
    prompt::prompt_location,
};
use anyhow::{Result, anyhow};
use libbiji::{
    backend::{Backend, SqliteBackend},
    location::{Location, NewLocation},
    map::{HeadlessMap, MapView},
    search,
};

pub(crate) async fn list(
    backend: &SqliteBackend,
    filter: Option<String>,
    format: OutputFormat,
) -> Result<()> {
    let locations = backend.list().await?;
    let matching = match filter {
        Some(ref query) => search::search(&locations, query),
        None => locations.iter().collect(),
    };
    let rows = matching
        .into_iter()
        .map(LocationRow::new)
        .collect::<Result<Vec<_>, _>>()?;
    println!("{}", output::format_records(&rows, format)?);
    Ok(())
}

pub(crate) async fn add(
    backend: &SqliteBackend,
    name: Option<String>,
    description: Option<String>,
    latitude: Option<f64>,
    longitude: Option<f64>,
) -> Result<()> {
    let location = if name.is_none()
        && description.is_none()
        && latitude.is_none()
        && longitude.is_none()
    {
        prompt_location()?
    } else {
        NewLocation::new(
            name.ok_or_else(|| anyhow!("No name specified"))?,
            description.unwrap_or_default(),
            latitude.ok_or_else(|| anyhow!("No latitude specified"))?,
            longitude.ok_or_else(|| anyhow!("No longitude specified"))?,
        )
    };
    // the backend stores whatever it is given
    location.validate()?;
    let stored = backend.insert(&location).await?;
    println!("Added location {} to database", stored.id);
    println!("{}", output::format_record(&LocationRow::new(&stored)?));
    Ok(())
}

async fn find(backend: &SqliteBackend, id: &str) -> Result<Location> {
    backend
        .list()
        .await?
        .into_iter()
        .find(|l| l.id == id)
        .ok_or_else(|| libbiji::Error::LocationNotFound(id.to_string()).into())
}

pub(crate) async fn modify(
    backend: &SqliteBackend,
    id: String,
    name: Option<String>,
    description: Option<String>,
    latitude: Option<f64>,
    longitude: Option<f64>,
) -> Result<()> {
    if name.is_none() && description.is_none() && latitude.is_none() && longitude.is_none() {
        return Err(anyhow!("Cannot modify location without new values"));
    }
    let existing = find(backend, &id).await?;
    let location = NewLocation::new(
        name.unwrap_or(existing.name),
        description.unwrap_or(existing.description),
        latitude.unwrap_or(existing.latitude),
        longitude.unwrap_or(existing.longitude),
    );
    location.validate()?;
    let updated = backend.update(&id, &location).await?;
    println!("Modified location {id}");
    println!("{}", output::format_record(&LocationRow::new(&updated)?));
    Ok(())
}

pub(crate) async fn remove(backend: &SqliteBackend, id: String) -> Result<()> {
    backend.delete(&id).await?;
    println!("Removed location {id} from database");
    Ok(())
}

pub(crate) fn colors(names: &[String]) -> Result<()> {
    let rows = names.iter().map(|n| ColorRow::new(n)).collect::<Vec<_>>();
    println!("{}", output::format_records(&rows, OutputFormat::Table)?);
    Ok(())
}

/// Place every location on a headless map and print its markers
pub(crate) async fn geojson(backend: &SqliteBackend, cfg: &Config) -> Result<()> {
    let locations = backend.list().await?;
    let map = HeadlessMap::new();
    let mut view = MapView::mount(Box::new(map.clone()), &cfg.map)?;
    view.sync_markers(&locations);
    println!("{}", serde_json::to_string_pretty(&map.to_geojson())?);
    view.unmount();
    Ok(())
}
