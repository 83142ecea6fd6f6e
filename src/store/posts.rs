use async_trait::async_trait;
use std::sync::Arc;
use tokio::sync::mpsc;

use super::path::CollectionPath;
use super::schema::{now_millis, SqliteStore};
use super::subscription::{Subscription, SNAPSHOT_BUFFER};
use super::types::{Cursor, Page, Post, PostDraft, PostRow, Snapshot, StoreError};
use super::{DocumentStore, MAX_CONTENT_BYTES, MAX_PAGE_SIZE};

const POST_COLUMNS: &str = "id, owner_uid, title, subtitle, content, image_url, is_draft, \
     created_at, updated_at, author_name, author_avatar, tags, tag_ids, views";

fn decode_rows(rows: Vec<PostRow>) -> Result<Vec<Arc<Post>>, StoreError> {
    rows.into_iter()
        .map(|row| row.into_post().map(Arc::new))
        .collect()
}

/// Reject drafts the admin panel would not submit.
fn validate_draft(draft: &PostDraft) -> Result<(), StoreError> {
    if draft.title.trim().is_empty() || draft.content.trim().is_empty() {
        return Err(StoreError::Invalid(
            "Title and content cannot be empty.".to_string(),
        ));
    }
    let size = draft.content.len();
    if size > MAX_CONTENT_BYTES {
        return Err(StoreError::Invalid(format!(
            "Post content is too large ({}KB). The maximum size is ~{}KB.",
            (size + 512) / 1024,
            (MAX_CONTENT_BYTES + 512) / 1024
        )));
    }
    Ok(())
}

fn encode_tags(draft: &PostDraft) -> Result<(String, String), StoreError> {
    let tag_ids: Vec<&str> = draft.tags.iter().map(|t| t.id.as_str()).collect();
    let tags = serde_json::to_string(&draft.tags)
        .map_err(|e| StoreError::Invalid(format!("Unencodable tags: {}", e)))?;
    let tag_ids = serde_json::to_string(&tag_ids)
        .map_err(|e| StoreError::Invalid(format!("Unencodable tag ids: {}", e)))?;
    Ok((tags, tag_ids))
}

impl SqliteStore {
    // ========================================================================
    // Reads
    // ========================================================================

    /// Read the whole collection, newest first.
    async fn load_snapshot(
        &self,
        path: &CollectionPath,
        revision: u64,
    ) -> Result<Snapshot, StoreError> {
        let sql = format!(
            "SELECT {} FROM posts WHERE collection = ? ORDER BY created_at DESC, id DESC",
            POST_COLUMNS
        );
        let rows = sqlx::query_as::<_, PostRow>(&sql)
            .bind(path.to_string())
            .fetch_all(&self.pool)
            .await
            .map_err(StoreError::from_sqlx)?;

        let docs = decode_rows(rows)?;
        tracing::debug!(path = %path, revision, count = docs.len(), "Loaded snapshot");
        Ok(Snapshot { docs, revision })
    }

    /// Get a single post by id.
    pub async fn get_post(
        &self,
        path: &CollectionPath,
        id: &str,
    ) -> Result<Option<Post>, StoreError> {
        let sql = format!(
            "SELECT {} FROM posts WHERE collection = ? AND id = ?",
            POST_COLUMNS
        );
        let row = sqlx::query_as::<_, PostRow>(&sql)
            .bind(path.to_string())
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(StoreError::from_sqlx)?;

        row.map(PostRow::into_post).transpose()
    }

    // ========================================================================
    // Admin Writes
    // ========================================================================

    /// Create a post stamped with the current time.
    pub async fn create_post(
        &self,
        path: &CollectionPath,
        draft: &PostDraft,
    ) -> Result<Post, StoreError> {
        self.create_post_at(path, draft, now_millis()).await
    }

    /// Create a post with an explicit creation time (imports, backfills).
    pub async fn create_post_at(
        &self,
        path: &CollectionPath,
        draft: &PostDraft,
        created_at: i64,
    ) -> Result<Post, StoreError> {
        validate_draft(draft)?;
        let (tags, tag_ids) = encode_tags(draft)?;
        let id = uuid::Uuid::new_v4().to_string();

        sqlx::query(
            r#"
            INSERT INTO posts (id, collection, owner_uid, title, subtitle, content, image_url,
                               is_draft, created_at, updated_at, author_name, author_avatar,
                               tags, tag_ids, views)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, 0)
        "#,
        )
        .bind(&id)
        .bind(path.to_string())
        .bind(path.owner_uid())
        .bind(draft.title.trim())
        .bind(&draft.subtitle)
        .bind(&draft.content)
        .bind(&draft.image_url)
        .bind(draft.is_draft)
        .bind(created_at)
        .bind(created_at)
        .bind(&draft.author_name)
        .bind(&draft.author_avatar)
        .bind(&tags)
        .bind(&tag_ids)
        .execute(&self.pool)
        .await
        .map_err(StoreError::from_sqlx)?;

        self.bump_revision();
        tracing::info!(post_id = %id, draft = draft.is_draft, "Created post");

        self.get_post(path, &id).await?.ok_or(StoreError::NotFound {
            kind: "post",
            id,
        })
    }

    /// Replace the editable fields of an existing post.
    ///
    /// Creation time and view count are preserved.
    pub async fn update_post(
        &self,
        path: &CollectionPath,
        id: &str,
        draft: &PostDraft,
    ) -> Result<Post, StoreError> {
        validate_draft(draft)?;
        let (tags, tag_ids) = encode_tags(draft)?;

        let result = sqlx::query(
            r#"
            UPDATE posts SET title = ?, subtitle = ?, content = ?, image_url = ?, is_draft = ?,
                             updated_at = ?, author_name = ?, author_avatar = ?, tags = ?, tag_ids = ?
            WHERE collection = ? AND id = ?
        "#,
        )
        .bind(draft.title.trim())
        .bind(&draft.subtitle)
        .bind(&draft.content)
        .bind(&draft.image_url)
        .bind(draft.is_draft)
        .bind(now_millis())
        .bind(&draft.author_name)
        .bind(&draft.author_avatar)
        .bind(&tags)
        .bind(&tag_ids)
        .bind(path.to_string())
        .bind(id)
        .execute(&self.pool)
        .await
        .map_err(StoreError::from_sqlx)?;

        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound {
                kind: "post",
                id: id.to_string(),
            });
        }

        self.bump_revision();
        tracing::info!(post_id = %id, draft = draft.is_draft, "Updated post");

        self.get_post(path, id).await?.ok_or(StoreError::NotFound {
            kind: "post",
            id: id.to_string(),
        })
    }

    /// Create `draft`, or overwrite `existing` with it.
    pub async fn save_post(
        &self,
        path: &CollectionPath,
        draft: &PostDraft,
        existing: Option<&str>,
    ) -> Result<Post, StoreError> {
        match existing {
            Some(id) => self.update_post(path, id, draft).await,
            None => self.create_post(path, draft).await,
        }
    }

    /// Publish (`false`) or move back to draft (`true`).
    pub async fn set_draft(
        &self,
        path: &CollectionPath,
        id: &str,
        is_draft: bool,
    ) -> Result<(), StoreError> {
        let result = sqlx::query(
            "UPDATE posts SET is_draft = ?, updated_at = ? WHERE collection = ? AND id = ?",
        )
        .bind(is_draft)
        .bind(now_millis())
        .bind(path.to_string())
        .bind(id)
        .execute(&self.pool)
        .await
        .map_err(StoreError::from_sqlx)?;

        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound {
                kind: "post",
                id: id.to_string(),
            });
        }

        self.bump_revision();
        tracing::info!(post_id = %id, is_draft, "Changed post status");
        Ok(())
    }

    pub async fn delete_post(&self, path: &CollectionPath, id: &str) -> Result<(), StoreError> {
        let result = sqlx::query("DELETE FROM posts WHERE collection = ? AND id = ?")
            .bind(path.to_string())
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(StoreError::from_sqlx)?;

        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound {
                kind: "post",
                id: id.to_string(),
            });
        }

        self.bump_revision();
        tracing::info!(post_id = %id, "Deleted post");
        Ok(())
    }

    /// Count one view of a post. Does not touch `updated_at`.
    pub async fn record_view(&self, path: &CollectionPath, id: &str) -> Result<i64, StoreError> {
        let row: Option<(i64,)> = sqlx::query_as(
            "UPDATE posts SET views = views + 1 WHERE collection = ? AND id = ? RETURNING views",
        )
        .bind(path.to_string())
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(StoreError::from_sqlx)?;

        let (views,) = row.ok_or_else(|| StoreError::NotFound {
            kind: "post",
            id: id.to_string(),
        })?;

        self.bump_revision();
        Ok(views)
    }
}

#[async_trait]
impl DocumentStore for SqliteStore {
    async fn subscribe(&self, path: &CollectionPath) -> Result<Subscription, StoreError> {
        let store = self.clone();
        let path = path.clone();
        let mut revisions = self.watch_revision();
        let (tx, rx) = mpsc::channel(SNAPSHOT_BUFFER);

        tracing::debug!(path = %path, "Subscribing to collection");

        let task = tokio::spawn(async move {
            loop {
                let revision = *revisions.borrow_and_update();
                let snapshot = store.load_snapshot(&path, revision).await;
                if let Err(ref e) = snapshot {
                    tracing::warn!(path = %path, error = %e, "Snapshot read failed");
                }
                if tx.send(snapshot).await.is_err() {
                    tracing::debug!(path = %path, "Subscriber gone, stopping delivery");
                    break;
                }
                if revisions.changed().await.is_err() {
                    break;
                }
            }
        });

        Ok(Subscription::new(rx, task))
    }

    async fn fetch_page(
        &self,
        path: &CollectionPath,
        after: Option<&Cursor>,
        limit: usize,
    ) -> Result<Page, StoreError> {
        let limit = limit.min(MAX_PAGE_SIZE) as i64;

        let rows = match after {
            None => {
                let sql = format!(
                    "SELECT {} FROM posts WHERE collection = ? \
                     ORDER BY created_at DESC, id DESC LIMIT ?",
                    POST_COLUMNS
                );
                sqlx::query_as::<_, PostRow>(&sql)
                    .bind(path.to_string())
                    .bind(limit)
                    .fetch_all(&self.pool)
                    .await
            }
            Some(cursor) => {
                let sql = format!(
                    "SELECT {} FROM posts WHERE collection = ? \
                     AND (created_at < ? OR (created_at = ? AND id < ?)) \
                     ORDER BY created_at DESC, id DESC LIMIT ?",
                    POST_COLUMNS
                );
                sqlx::query_as::<_, PostRow>(&sql)
                    .bind(path.to_string())
                    .bind(cursor.created_at)
                    .bind(cursor.created_at)
                    .bind(&cursor.id)
                    .bind(limit)
                    .fetch_all(&self.pool)
                    .await
            }
        }
        .map_err(StoreError::from_sqlx)?;

        let docs = decode_rows(rows)?;
        let next_cursor = docs.last().map(|post| Cursor::after(post));
        tracing::debug!(
            path = %path,
            after = after.is_some(),
            limit,
            returned = docs.len(),
            "Fetched page"
        );
        Ok(Page { docs, next_cursor })
    }
}
