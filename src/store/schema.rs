use sqlx::{
    sqlite::{SqliteConnectOptions, SqlitePoolOptions},
    SqlitePool,
};
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;

use super::types::StoreError;

// ============================================================================
// SqliteStore
// ============================================================================

/// SQLite-backed document store.
///
/// Cheap to clone: clones share the pool and the revision channel, so a write
/// through any clone wakes every subscription.
#[derive(Clone)]
pub struct SqliteStore {
    pub(crate) pool: SqlitePool,
    revision: Arc<watch::Sender<u64>>,
}

impl SqliteStore {
    /// Open (creating if needed) a store and run migrations.
    ///
    /// `":memory:"` opens a private in-memory database held on a single
    /// connection for the lifetime of the store.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::Locked` if another process holds the database lock.
    pub async fn open(path: &str) -> Result<Self, StoreError> {
        let in_memory = path == ":memory:";
        let url = if in_memory {
            "sqlite::memory:".to_string()
        } else {
            format!("sqlite:{}?mode=rwc", path)
        };

        let options = SqliteConnectOptions::from_str(&url)
            .map_err(StoreError::from_sqlx)?
            .pragma("busy_timeout", "5000")
            .foreign_keys(true);

        // An in-memory database lives and dies with its connection, so the pool
        // must never hold more than one or recycle it.
        let pool_options = if in_memory {
            SqlitePoolOptions::new()
                .max_connections(1)
                .min_connections(1)
                .idle_timeout(None)
                .max_lifetime(None)
        } else {
            SqlitePoolOptions::new().max_connections(5)
        };

        let pool = pool_options
            .acquire_timeout(Duration::from_secs(10))
            .connect_with(options)
            .await
            .map_err(StoreError::from_sqlx)?;

        let (revision, _) = watch::channel(0u64);
        let store = Self {
            pool,
            revision: Arc::new(revision),
        };
        store.migrate().await?;
        tracing::debug!(path = %path, "Opened post store");
        Ok(store)
    }

    /// Run migrations atomically. All statements are idempotent.
    async fn migrate(&self) -> Result<(), StoreError> {
        let mut tx = self.pool.begin().await.map_err(StoreError::from_sqlx)?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS posts (
                id TEXT PRIMARY KEY,
                collection TEXT NOT NULL,
                owner_uid TEXT NOT NULL,
                title TEXT NOT NULL,
                subtitle TEXT,
                content TEXT NOT NULL,
                image_url TEXT,
                is_draft INTEGER NOT NULL DEFAULT 0,
                created_at INTEGER NOT NULL,
                updated_at INTEGER,
                author_name TEXT,
                author_avatar TEXT,
                tags TEXT NOT NULL DEFAULT '[]',
                tag_ids TEXT NOT NULL DEFAULT '[]',
                views INTEGER NOT NULL DEFAULT 0
            )
        "#,
        )
        .execute(&mut *tx)
        .await
        .map_err(StoreError::from_sqlx)?;

        // Keyset pagination: WHERE collection = ? AND (created_at, id) < (?, ?)
        sqlx::query(
            "CREATE INDEX IF NOT EXISTS idx_posts_collection_created ON posts(collection, created_at DESC, id DESC)",
        )
        .execute(&mut *tx)
        .await
        .map_err(StoreError::from_sqlx)?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS categories (
                id TEXT PRIMARY KEY,
                collection TEXT NOT NULL,
                name TEXT NOT NULL,
                created_at INTEGER NOT NULL
            )
        "#,
        )
        .execute(&mut *tx)
        .await
        .map_err(StoreError::from_sqlx)?;

        // No UNIQUE(category_id, name): duplicate tags are allowed.
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS tags (
                id TEXT PRIMARY KEY,
                collection TEXT NOT NULL,
                name TEXT NOT NULL,
                category_id TEXT NOT NULL REFERENCES categories(id),
                category_name TEXT NOT NULL,
                created_at INTEGER NOT NULL
            )
        "#,
        )
        .execute(&mut *tx)
        .await
        .map_err(StoreError::from_sqlx)?;

        tx.commit().await.map_err(StoreError::from_sqlx)?;
        Ok(())
    }

    /// Record that the store changed, waking every subscription.
    pub(crate) fn bump_revision(&self) {
        self.revision.send_modify(|rev| *rev += 1);
        tracing::trace!(revision = *self.revision.borrow(), "Store revision bumped");
    }

    pub(crate) fn watch_revision(&self) -> watch::Receiver<u64> {
        self.revision.subscribe()
    }
}

/// Current wall-clock time in Unix milliseconds.
pub(crate) fn now_millis() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_open_in_memory_runs_migrations() {
        let store = SqliteStore::open(":memory:").await.unwrap();
        let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM posts")
            .fetch_one(&store.pool)
            .await
            .unwrap();
        assert_eq!(count, 0);
    }

    #[tokio::test]
    async fn test_migrate_is_idempotent() {
        let store = SqliteStore::open(":memory:").await.unwrap();
        store.migrate().await.unwrap();
    }

    #[tokio::test]
    async fn test_bump_revision_wakes_watchers() {
        let store = SqliteStore::open(":memory:").await.unwrap();
        let mut rx = store.watch_revision();
        store.bump_revision();
        rx.changed().await.unwrap();
        assert_eq!(*rx.borrow(), 1);
    }
}
