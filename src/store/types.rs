use serde::{Deserialize, Serialize};
use std::sync::Arc;
use thiserror::Error;

// ============================================================================
// Error Types
// ============================================================================

/// Store-specific errors with user-friendly messages
#[derive(Debug, Error)]
pub enum StoreError {
    /// Another process holds the database lock
    #[error("The post database is locked by another process. Please close it and try again.")]
    Locked,

    /// A write was rejected before reaching the database
    #[error("{0}")]
    Invalid(String),

    /// A document referenced by id does not exist
    #[error("No {kind} with id '{id}'")]
    NotFound { kind: &'static str, id: String },

    /// A stored document could not be decoded
    #[error("Corrupt document '{id}': {reason}")]
    Corrupt { id: String, reason: String },

    /// The subscription delivery task stopped
    #[error("Live updates stopped")]
    SubscriptionClosed,

    /// Generic database error
    #[error("Database error: {0}")]
    Other(#[from] sqlx::Error),
}

impl StoreError {
    /// Map a sqlx error, recognising SQLite lock conditions
    pub(crate) fn from_sqlx(err: sqlx::Error) -> Self {
        let error_string = err.to_string().to_lowercase();

        // SQLITE_BUSY (5), SQLITE_LOCKED (6)
        if error_string.contains("database is locked")
            || error_string.contains("database table is locked")
            || error_string.contains("sqlite_busy")
            || error_string.contains("sqlite_locked")
        {
            return StoreError::Locked;
        }

        StoreError::Other(err)
    }
}

// ============================================================================
// Documents
// ============================================================================

/// Denormalized copy of a tag, embedded in every post that carries it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TagRef {
    pub id: String,
    pub name: String,
    pub category_id: String,
    pub category_name: String,
}

impl TagRef {
    /// True when both tags name the same `(category, name)` pair.
    ///
    /// Ids are ignored: duplicate tags created under the same category share
    /// a facet.
    pub fn same_label(&self, category_name: &str, name: &str) -> bool {
        self.category_name == category_name && self.name == name
    }
}

/// A blog post as stored in the owner's posts collection.
///
/// Timestamps are Unix milliseconds.
#[derive(Debug, Clone, PartialEq)]
pub struct Post {
    pub id: String,
    pub owner_uid: String,
    pub title: String,
    pub subtitle: Option<String>,
    /// HTML body
    pub content: String,
    pub image_url: Option<String>,
    pub is_draft: bool,
    pub created_at: i64,
    pub updated_at: Option<i64>,
    pub author_name: Option<String>,
    pub author_avatar: Option<String>,
    pub tags: Vec<TagRef>,
    pub tag_ids: Vec<String>,
    pub views: i64,
}

/// A tag category (e.g. "Book", "Tech").
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Category {
    pub id: String,
    pub name: String,
    pub created_at: i64,
}

/// A tag belonging to a category.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Tag {
    pub id: String,
    pub name: String,
    pub category_id: String,
    pub category_name: String,
    pub created_at: i64,
}

impl Tag {
    pub fn to_ref(&self) -> TagRef {
        TagRef {
            id: self.id.clone(),
            name: self.name.clone(),
            category_id: self.category_id.clone(),
            category_name: self.category_name.clone(),
        }
    }
}

/// Editable fields of a post, as submitted by the admin.
#[derive(Debug, Clone, Default)]
pub struct PostDraft {
    pub title: String,
    pub subtitle: Option<String>,
    pub content: String,
    pub image_url: Option<String>,
    pub is_draft: bool,
    pub author_name: Option<String>,
    pub author_avatar: Option<String>,
    pub tags: Vec<TagRef>,
}

// ============================================================================
// Query Results
// ============================================================================

/// Opaque position of the last document returned by a page fetch.
///
/// Only meaningful for the `created_at DESC, id DESC` ordering it was
/// produced under.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Cursor {
    pub(crate) created_at: i64,
    pub(crate) id: String,
}

impl Cursor {
    pub(crate) fn after(post: &Post) -> Self {
        Self {
            created_at: post.created_at,
            id: post.id.clone(),
        }
    }
}

/// One page of a paginated read.
#[derive(Debug, Clone)]
pub struct Page {
    pub docs: Vec<Arc<Post>>,
    /// Cursor after the last document, `None` when the page is empty.
    pub next_cursor: Option<Cursor>,
}

/// Complete point-in-time copy of a subscribed collection.
#[derive(Debug, Clone)]
pub struct Snapshot {
    pub docs: Vec<Arc<Post>>,
    /// Store revision the snapshot was read at.
    pub revision: u64,
}

// ============================================================================
// Row Types
// ============================================================================

/// Internal row type for post queries (used by sqlx FromRow).
/// Converts to Post via into_post(), decoding the embedded tag list.
#[derive(Debug, sqlx::FromRow)]
pub(crate) struct PostRow {
    pub id: String,
    pub owner_uid: String,
    pub title: String,
    pub subtitle: Option<String>,
    pub content: String,
    pub image_url: Option<String>,
    pub is_draft: bool,
    pub created_at: i64,
    pub updated_at: Option<i64>,
    pub author_name: Option<String>,
    pub author_avatar: Option<String>,
    pub tags: String,
    pub tag_ids: String,
    pub views: i64,
}

impl PostRow {
    pub(crate) fn into_post(self) -> Result<Post, StoreError> {
        let tags: Vec<TagRef> =
            serde_json::from_str(&self.tags).map_err(|e| StoreError::Corrupt {
                id: self.id.clone(),
                reason: format!("tags: {}", e),
            })?;
        let tag_ids: Vec<String> =
            serde_json::from_str(&self.tag_ids).map_err(|e| StoreError::Corrupt {
                id: self.id.clone(),
                reason: format!("tag_ids: {}", e),
            })?;

        Ok(Post {
            id: self.id,
            owner_uid: self.owner_uid,
            title: self.title,
            subtitle: self.subtitle,
            content: self.content,
            image_url: self.image_url,
            is_draft: self.is_draft,
            created_at: self.created_at,
            updated_at: self.updated_at,
            author_name: self.author_name,
            author_avatar: self.author_avatar,
            tags,
            tag_ids,
            views: self.views,
        })
    }
}

#[derive(Debug, sqlx::FromRow)]
pub(crate) struct CategoryRow {
    pub id: String,
    pub name: String,
    pub created_at: i64,
}

#[derive(Debug, sqlx::FromRow)]
pub(crate) struct TagRow {
    pub id: String,
    pub name: String,
    pub category_id: String,
    pub category_name: String,
    pub created_at: i64,
}
