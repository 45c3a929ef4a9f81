//! This is a library for sharing points of interest on a map. It keeps a local
//! copy of the locations stored by a backend, follows the backend's change
//! notifications, and keeps a map view in sync with the list and with the
//! coordinate the user has selected.

pub mod app;
pub mod backend;
pub mod color;
pub mod core;
pub mod location;
pub mod map;
pub mod search;
pub mod selection;
pub mod store;

#[cfg(test)]
pub(crate) mod testing;

pub use self::core::database::Database;
pub use self::core::error::{self, Error, Result};
