//! A [Backend] that keeps locations in a local SQLite database
use crate::{
    Database, Error, Result,
    backend::{Backend, ChangeEvent, ChangeKind, Subscription},
    location::{Location, NewLocation},
};
use async_trait::async_trait;
use sqlx::{Sqlite, pool::PoolConnection};
use std::{sync::Arc, time::Duration};
use time::OffsetDateTime;
use tokio::{
    sync::{Mutex, MutexGuard, broadcast},
    task::JoinHandle,
};
use tracing::{debug, trace, warn};

const CHANNEL_CAPACITY: usize = 64;

/// The connection on which `PRAGMA data_version` is polled and the last
/// version seen on it
struct Watcher {
    conn: PoolConnection<Sqlite>,
    version: i64,
    failing: bool,
}

impl std::fmt::Debug for Watcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Watcher")
            .field("version", &self.version)
            .field("failing", &self.failing)
            .finish_non_exhaustive()
    }
}

impl Watcher {
    /// Read the current version. Returns true if it moved since the last read.
    async fn poll(&mut self) -> bool {
        match data_version(&mut self.conn).await {
            Ok(v) => {
                if self.failing {
                    debug!("polling database version again");
                    self.failing = false;
                }
                let moved = v != self.version;
                if moved {
                    trace!(old = self.version, new = v, "database version moved");
                }
                self.version = v;
                moved
            }
            Err(e) => {
                // keep polling; only report the first failure in a row
                if !self.failing {
                    warn!("Failed to poll database version: {e}");
                    self.failing = true;
                }
                false
            }
        }
    }
}

/// Location storage backed by SQLite. Changes made through this object are
/// announced to subscribers directly. Changes committed by other processes are
/// picked up by polling `PRAGMA data_version` when a poll interval is given.
#[derive(Debug)]
pub struct SqliteBackend {
    db: Database,
    principal: String,
    changes: broadcast::Sender<ChangeEvent>,
    watcher: Option<Arc<Mutex<Watcher>>>,
    poller: Option<JoinHandle<()>>,
}

impl SqliteBackend {
    /// Open the database at `url` and act on behalf of `principal`, which is
    /// recorded as the creator of every inserted location.
    pub async fn connect(
        url: &str,
        principal: String,
        poll_interval: Option<Duration>,
    ) -> Result<Self> {
        debug!(url, %principal, "connecting to location database");
        let db = Database::open(url).await?;
        let mut backend = Self::new(db, principal);
        if let Some(interval) = poll_interval {
            backend.watch_external(interval).await?;
        }
        Ok(backend)
    }

    /// Create a backend over an already opened database. No external change
    /// detection is performed.
    pub fn new(db: Database, principal: String) -> Self {
        let (changes, _) = broadcast::channel(CHANNEL_CAPACITY);
        Self {
            db,
            principal,
            changes,
            watcher: None,
            poller: None,
        }
    }

    pub fn principal(&self) -> &str {
        &self.principal
    }

    /// Replace the user-supplied fields of an existing location
    pub async fn update(&self, id: &str, location: &NewLocation) -> Result<Location> {
        let watcher = self.pause_watcher().await;
        let updated: Option<Location> = sqlx::query_as(
            r#"UPDATE locations SET name=?, description=?, latitude=?, longitude=?
            WHERE id=? RETURNING *"#,
        )
        .bind(&location.name)
        .bind(&location.description)
        .bind(location.latitude)
        .bind(location.longitude)
        .bind(id)
        .fetch_optional(self.db.pool())
        .await?;
        let updated = updated.ok_or_else(|| Error::LocationNotFound(id.to_string()))?;
        self.written(watcher, ChangeKind::Update).await;
        Ok(updated)
    }

    pub async fn delete(&self, id: &str) -> Result<()> {
        let watcher = self.pause_watcher().await;
        let res = sqlx::query("DELETE FROM locations WHERE id=?")
            .bind(id)
            .execute(self.db.pool())
            .await?;
        if res.rows_affected() == 0 {
            return Err(Error::LocationNotFound(id.to_string()));
        }
        self.written(watcher, ChangeKind::Delete).await;
        Ok(())
    }

    /// Keep the poller from reading the version until a local write is done,
    /// so that the write is not reported a second time as an external change
    async fn pause_watcher(&self) -> Option<MutexGuard<'_, Watcher>> {
        match &self.watcher {
            Some(watcher) => Some(watcher.lock().await),
            None => None,
        }
    }

    /// Announce a committed local write. Anything committed by others in the
    /// meantime is covered by the refetch this triggers.
    async fn written(&self, watcher: Option<MutexGuard<'_, Watcher>>, kind: ChangeKind) {
        if let Some(mut watcher) = watcher {
            watcher.poll().await;
        }
        self.notify(kind);
    }

    fn notify(&self, kind: ChangeKind) {
        // an error only means that nobody is subscribed right now
        if self.changes.send(ChangeEvent::new(kind)).is_err() {
            trace!(%kind, "no subscribers for change notification");
        }
    }

    async fn watch_external(&mut self, interval: Duration) -> Result<()> {
        let mut conn = self.db.pool().acquire().await?;
        let version = data_version(&mut conn).await?;
        debug!(?interval, version, "watching for external database changes");
        let watcher = Arc::new(Mutex::new(Watcher {
            conn,
            version,
            failing: false,
        }));
        let changes = self.changes.clone();
        self.poller = Some(tokio::spawn({
            let watcher = watcher.clone();
            async move {
                let mut ticker = tokio::time::interval(interval);
                loop {
                    ticker.tick().await;
                    if watcher.lock().await.poll().await {
                        trace!("database changed externally");
                        let _ = changes.send(ChangeEvent::new(ChangeKind::External));
                    }
                }
            }
        }));
        self.watcher = Some(watcher);
        Ok(())
    }
}

async fn data_version(conn: &mut PoolConnection<Sqlite>) -> Result<i64> {
    sqlx::query_scalar("PRAGMA data_version")
        .fetch_one(conn.as_mut())
        .await
        .map_err(Into::into)
}

impl Drop for SqliteBackend {
    fn drop(&mut self) {
        if let Some(poller) = self.poller.take() {
            poller.abort();
        }
    }
}

#[async_trait]
impl Backend for SqliteBackend {
    async fn list(&self) -> Result<Vec<Location>> {
        // the stored text drops trailing zeros from the fraction, so it does
        // not sort as a timestamp
        sqlx::query_as(
            "SELECT * FROM locations ORDER BY unixepoch(created_at, 'subsec') DESC, rowid DESC",
        )
        .fetch_all(self.db.pool())
        .await
        .map_err(Into::into)
    }

    async fn insert(&self, location: &NewLocation) -> Result<Location> {
        debug!(?location, "Inserting location into database");
        let watcher = self.pause_watcher().await;
        let inserted = sqlx::query_as(
            r#"INSERT INTO locations
            (id, name, description, latitude, longitude, created_by, created_at)
            VALUES (?, ?, ?, ?, ?, ?, ?) RETURNING *"#,
        )
        .bind(uuid::Uuid::new_v4().to_string())
        .bind(&location.name)
        .bind(&location.description)
        .bind(location.latitude)
        .bind(location.longitude)
        .bind(&self.principal)
        .bind(OffsetDateTime::now_utc())
        .fetch_one(self.db.pool())
        .await?;
        self.written(watcher, ChangeKind::Insert).await;
        Ok(inserted)
    }

    fn subscribe(&self) -> Result<Subscription> {
        Ok(Subscription::new(self.changes.subscribe()))
    }
}
