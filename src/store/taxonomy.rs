use super::path::{CollectionKind, CollectionPath};
use super::schema::{now_millis, SqliteStore};
use super::types::{Category, CategoryRow, StoreError, Tag, TagRow};

/// Trim a category/tag name and reject empty ones.
fn clean_name<'a>(name: &'a str, what: &str) -> Result<&'a str, StoreError> {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        return Err(StoreError::Invalid(format!("{} name cannot be empty.", what)));
    }
    Ok(trimmed)
}

impl SqliteStore {
    // ========================================================================
    // Categories
    // ========================================================================

    /// Create a category under the owner of `posts`.
    pub async fn create_category(
        &self,
        posts: &CollectionPath,
        name: &str,
    ) -> Result<Category, StoreError> {
        let name = clean_name(name, "Category")?;
        let collection = posts.sibling(CollectionKind::Categories);
        let category = Category {
            id: uuid::Uuid::new_v4().to_string(),
            name: name.to_string(),
            created_at: now_millis(),
        };

        sqlx::query("INSERT INTO categories (id, collection, name, created_at) VALUES (?, ?, ?, ?)")
            .bind(&category.id)
            .bind(collection.to_string())
            .bind(&category.name)
            .bind(category.created_at)
            .execute(&self.pool)
            .await
            .map_err(StoreError::from_sqlx)?;

        self.bump_revision();
        tracing::info!(category_id = %category.id, name = %category.name, "Created category");
        Ok(category)
    }

    pub async fn list_categories(
        &self,
        posts: &CollectionPath,
    ) -> Result<Vec<Category>, StoreError> {
        let collection = posts.sibling(CollectionKind::Categories);
        let rows = sqlx::query_as::<_, CategoryRow>(
            "SELECT id, name, created_at FROM categories WHERE collection = ? ORDER BY name, created_at",
        )
        .bind(collection.to_string())
        .fetch_all(&self.pool)
        .await
        .map_err(StoreError::from_sqlx)?;

        Ok(rows
            .into_iter()
            .map(|r| Category {
                id: r.id,
                name: r.name,
                created_at: r.created_at,
            })
            .collect())
    }

    // ========================================================================
    // Tags
    // ========================================================================

    /// Create a tag in an existing category.
    ///
    /// The category name is copied onto the tag. A tag with the same name in
    /// the same category may already exist; it is not merged.
    pub async fn create_tag(
        &self,
        posts: &CollectionPath,
        name: &str,
        category_id: &str,
    ) -> Result<Tag, StoreError> {
        let name = clean_name(name, "Tag")?;
        let categories = posts.sibling(CollectionKind::Categories);
        let collection = posts.sibling(CollectionKind::Tags);

        let category: Option<(String,)> =
            sqlx::query_as("SELECT name FROM categories WHERE collection = ? AND id = ?")
                .bind(categories.to_string())
                .bind(category_id)
                .fetch_optional(&self.pool)
                .await
                .map_err(StoreError::from_sqlx)?;
        let (category_name,) = category.ok_or_else(|| StoreError::NotFound {
            kind: "category",
            id: category_id.to_string(),
        })?;

        let tag = Tag {
            id: uuid::Uuid::new_v4().to_string(),
            name: name.to_string(),
            category_id: category_id.to_string(),
            category_name,
            created_at: now_millis(),
        };

        sqlx::query(
            r#"
            INSERT INTO tags (id, collection, name, category_id, category_name, created_at)
            VALUES (?, ?, ?, ?, ?, ?)
        "#,
        )
        .bind(&tag.id)
        .bind(collection.to_string())
        .bind(&tag.name)
        .bind(&tag.category_id)
        .bind(&tag.category_name)
        .bind(tag.created_at)
        .execute(&self.pool)
        .await
        .map_err(StoreError::from_sqlx)?;

        self.bump_revision();
        tracing::info!(tag_id = %tag.id, name = %tag.name, category = %tag.category_name, "Created tag");
        Ok(tag)
    }

    pub async fn list_tags(&self, posts: &CollectionPath) -> Result<Vec<Tag>, StoreError> {
        let collection = posts.sibling(CollectionKind::Tags);
        let rows = sqlx::query_as::<_, TagRow>(
            r#"
            SELECT id, name, category_id, category_name, created_at
            FROM tags WHERE collection = ?
            ORDER BY category_name, name, created_at
        "#,
        )
        .bind(collection.to_string())
        .fetch_all(&self.pool)
        .await
        .map_err(StoreError::from_sqlx)?;

        Ok(rows
            .into_iter()
            .map(|r| Tag {
                id: r.id,
                name: r.name,
                category_id: r.category_id,
                category_name: r.category_name,
                created_at: r.created_at,
            })
            .collect())
    }

    /// Find a tag by `"Category:Name"` label, creating the category and tag
    /// when missing. Used by the CLI's `--tag` flag.
    pub async fn resolve_tag_label(
        &self,
        posts: &CollectionPath,
        label: &str,
    ) -> Result<Tag, StoreError> {
        let (category_name, tag_name) = label.split_once(':').ok_or_else(|| {
            StoreError::Invalid(format!("Tag '{}' must look like Category:Name", label))
        })?;
        let category_name = clean_name(category_name, "Category")?;
        let tag_name = clean_name(tag_name, "Tag")?;

        if let Some(tag) = self
            .list_tags(posts)
            .await?
            .into_iter()
            .find(|t| t.category_name == category_name && t.name == tag_name)
        {
            return Ok(tag);
        }

        let category = match self
            .list_categories(posts)
            .await?
            .into_iter()
            .find(|c| c.name == category_name)
        {
            Some(c) => c,
            None => self.create_category(posts, category_name).await?,
        };
        self.create_tag(posts, tag_name, &category.id).await
    }
}
