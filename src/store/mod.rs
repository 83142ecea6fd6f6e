//! Document storage for the blog owner's posts, tags and categories.
//!
//! The feed only depends on the [`DocumentStore`] trait: a full-collection
//! live subscription plus a cursor-paginated read. [`SqliteStore`] is the
//! shipped implementation and also carries the admin write operations.

mod path;
mod posts;
mod schema;
mod subscription;
mod taxonomy;
mod types;

use async_trait::async_trait;

pub use path::{CollectionKind, CollectionPath};
pub use schema::SqliteStore;
pub use subscription::Subscription;
pub use types::{Category, Cursor, Page, Post, PostDraft, Snapshot, StoreError, Tag, TagRef};

/// Maximum size of a post body in bytes.
pub const MAX_CONTENT_BYTES: usize = 1_048_487;

/// Hard cap on a single page read; longer requests are truncated.
pub const MAX_PAGE_SIZE: usize = 500;

/// Read side of the document store, as consumed by the feed.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Subscribe to a whole collection.
    ///
    /// The current contents are delivered immediately, then a new complete
    /// snapshot after every change, in order.
    async fn subscribe(&self, path: &CollectionPath) -> Result<Subscription, StoreError>;

    /// Read one page ordered by creation time, newest first.
    ///
    /// `after` continues from the last document of a previous page.
    async fn fetch_page(
        &self,
        path: &CollectionPath,
        after: Option<&Cursor>,
        limit: usize,
    ) -> Result<Page, StoreError>;
}
