use sqlx::{Pool, Sqlite, SqlitePool, sqlite::SqliteConnectOptions};
use std::str::FromStr;
use tracing::trace;

/// An object that represents a connection to the location database
#[derive(Clone, Debug)]
pub struct Database(Pool<Sqlite>);

impl From<Pool<Sqlite>> for Database {
    /// **WARNING**: This is primarily intended for tests. You should probably
    /// use [Database::open()] instead of creating the pool yourself, since
    /// [Database::open()] will perform database schema migration automatically.
    fn from(value: Pool<Sqlite>) -> Self {
        Self(value)
    }
}

impl Database {
    /// Open a connection to the database at the given url (e.g.
    /// `sqlite://locations.sqlite`) or plain file path, creating the file if
    /// needed. This will also perform any necessary sql migrations to ensure
    /// that the database is up to date with the latest schema changes.
    pub async fn open(url: &str) -> Result<Self, crate::Error> {
        let options = match url.starts_with("sqlite:") {
            true => SqliteConnectOptions::from_str(url)?,
            false => SqliteConnectOptions::new().filename(url),
        }
        .create_if_missing(true);
        let dbpool = SqlitePool::connect_with(options).await?;
        trace!("Running database migrations");
        sqlx::migrate!("../db/migrations").run(&dbpool).await?;
        Ok(Database(dbpool))
    }

    /// gets a reference to the underlying sqlx connection pool
    pub fn pool(&self) -> &Pool<Sqlite> {
        &self.0
    }
}
