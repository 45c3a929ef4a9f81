//! Core infrastructure for storing and accessing shared locations.
pub mod database;
pub mod error;
