use super::Record;
use libbiji::{
    color::{self, category_of},
    location::Location,
};
use serde::Serialize;
use tabled::Tabled;
use time::format_description::well_known::Rfc3339;

#[derive(Tabled, Serialize)]
#[tabled(rename_all = "PascalCase")]
pub(crate) struct LocationRow {
    id: String,
    name: String,
    description: String,
    latitude: f64,
    longitude: f64,
    color: String,
    #[tabled(rename = "Created By")]
    created_by: String,
    #[tabled(rename = "Created At")]
    created_at: String,
}

impl Record for LocationRow {
    const NOUN: &'static str = "location";
}

impl LocationRow {
    pub(crate) fn new(location: &Location) -> Result<Self, time::error::Format> {
        Ok(Self {
            id: location.id.clone(),
            name: location.name.clone(),
            description: location.description.clone(),
            latitude: location.latitude,
            longitude: location.longitude,
            color: color::color_for(&location.name),
            created_by: location.created_by.clone(),
            created_at: location.created_at.format(&Rfc3339)?,
        })
    }
}

/// A location in a numbered list, as shown in an interactive session
#[derive(Tabled, Serialize)]
#[tabled(rename_all = "PascalCase")]
pub(crate) struct IndexedRow {
    #[tabled(rename = "#")]
    index: usize,
    name: String,
    description: String,
    latitude: f64,
    longitude: f64,
    color: String,
}

impl Record for IndexedRow {
    const NOUN: &'static str = "location";
}

impl IndexedRow {
    /// `index` is zero-based; rows are numbered from 1
    pub(crate) fn new(index: usize, location: &Location) -> Self {
        Self {
            index: index + 1,
            name: location.name.clone(),
            description: location.description.clone(),
            latitude: location.latitude,
            longitude: location.longitude,
            color: color::color_for(&location.name),
        }
    }
}

#[derive(Tabled, Serialize)]
#[tabled(rename_all = "PascalCase")]
pub(crate) struct ColorRow {
    name: String,
    category: String,
    color: String,
}

impl Record for ColorRow {
    const NOUN: &'static str = "color";
}

impl ColorRow {
    pub(crate) fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            category: category_of(name),
            color: color::color_for(name),
        }
    }
}
