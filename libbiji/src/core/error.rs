//! Objects related to reporting errors from this library

/// A list of error types that can occur within this library
#[derive(thiserror::Error, Debug)]
#[non_exhaustive]
pub enum Error {
    // submission errors, raised by caller-side validation
    #[error("invalid latitude {0}: must be between -90 and 90")]
    LatitudeOutOfRange(f64),

    #[error("invalid longitude {0}: must be between -180 and 180")]
    LongitudeOutOfRange(f64),

    #[error("invalid location: the name must not be empty")]
    EmptyName,

    // lifecycle errors
    #[error("the selection was accessed outside of its provider")]
    SelectionOutOfScope,

    #[error("the location store has been unmounted")]
    StoreUnmounted,

    // map errors
    #[error("Mapbox token is not configured")]
    MissingMapToken,

    #[error("map renderer error: {0}")]
    Renderer(String),

    // backend errors
    #[error("location '{0}' was not found")]
    LocationNotFound(String),

    #[error("backend error: {0}")]
    Backend(String),

    #[error(transparent)]
    DatabaseError(#[from] sqlx::Error),

    #[error(transparent)]
    DatabaseMigrationError(#[from] sqlx::migrate::MigrateError),
}

/// A convenience type alias for a [Result] with [Error] as its error type
pub type Result<T, E = Error> = std::result::Result<T, E>;
