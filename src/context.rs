//! Application context built once at startup and passed by reference.

use std::sync::Arc;

use crate::config::{BlogIdentity, Config};
use crate::feed::{FeedComposer, FeedError};
use crate::store::{CollectionPath, DocumentStore, SqliteStore, StoreError};

/// Who is browsing, and whose blog.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    pub identity: BlogIdentity,
    pub posts_path: CollectionPath,
}

impl Session {
    pub fn new(identity: BlogIdentity) -> Self {
        let posts_path = CollectionPath::posts(&identity.app_id, &identity.owner_uid);
        Self {
            identity,
            posts_path,
        }
    }

    /// The viewer is the blog owner. Only the admin sees drafts.
    pub fn is_admin(&self) -> bool {
        self.identity.viewer_uid.as_deref() == Some(self.identity.owner_uid.as_str())
    }
}

pub struct AppContext {
    pub config: Config,
    pub session: Session,
    pub store: Arc<SqliteStore>,
}

impl AppContext {
    /// Resolve the session from `config` and attach an opened store.
    pub fn new(config: Config, store: SqliteStore) -> Result<Self, FeedError> {
        let session = Session::new(config.identity()?);
        tracing::info!(
            path = %session.posts_path,
            admin = session.is_admin(),
            "Session resolved"
        );
        Ok(Self {
            config,
            session,
            store: Arc::new(store),
        })
    }

    /// Open the store at `db_path` and build the context.
    pub async fn open(config: Config, db_path: &str) -> anyhow::Result<Self> {
        // Resolve identity before touching the database
        config.identity()?;
        let store = SqliteStore::open(db_path)
            .await
            .map_err(|e| match e {
                StoreError::Locked => anyhow::anyhow!(
                    "Another instance of quire appears to be using {}",
                    db_path
                ),
                other => anyhow::Error::new(other).context("Failed to open database"),
            })?;
        Ok(Self::new(config, store)?)
    }

    /// The read side of the store, as the feed consumes it.
    pub fn documents(&self) -> Arc<dyn DocumentStore> {
        self.store.clone()
    }

    pub fn posts_path(&self) -> &CollectionPath {
        &self.session.posts_path
    }

    pub fn new_composer(&self) -> FeedComposer {
        FeedComposer::new(self.config.composer_settings(), self.session.is_admin())
    }
}
