//! Free-text search over a list of locations
use crate::location::Location;

/// Whether the name or description of `location` contains `query`, ignoring
/// case. An empty query matches everything.
pub fn matches(location: &Location, query: &str) -> bool {
    let query = query.trim().to_lowercase();
    query.is_empty()
        || location.name.to_lowercase().contains(&query)
        || location.description.to_lowercase().contains(&query)
}

/// The locations matching `query`, in their original order
pub fn search<'a>(locations: &'a [Location], query: &str) -> Vec<&'a Location> {
    locations.iter().filter(|l| matches(l, query)).collect()
}
