use std::fmt;

/// Which collection under the owner's document tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CollectionKind {
    Posts,
    Tags,
    Categories,
}

impl CollectionKind {
    fn segment(self) -> &'static str {
        match self {
            CollectionKind::Posts => "posts",
            CollectionKind::Tags => "tags",
            CollectionKind::Categories => "categories",
        }
    }
}

/// Fixed document path `artifacts/{app_id}/users/{owner_uid}/{collection}`.
///
/// Always keyed on the blog owner, never on the viewer: every reader sees the
/// same single owner's posts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CollectionPath {
    app_id: String,
    owner_uid: String,
    kind: CollectionKind,
}

impl CollectionPath {
    pub fn new(app_id: &str, owner_uid: &str, kind: CollectionKind) -> Self {
        Self {
            app_id: app_id.to_owned(),
            owner_uid: owner_uid.to_owned(),
            kind,
        }
    }

    pub fn posts(app_id: &str, owner_uid: &str) -> Self {
        Self::new(app_id, owner_uid, CollectionKind::Posts)
    }

    pub fn owner_uid(&self) -> &str {
        &self.owner_uid
    }

    pub fn kind(&self) -> CollectionKind {
        self.kind
    }

    /// Path of a sibling collection under the same owner.
    pub fn sibling(&self, kind: CollectionKind) -> Self {
        Self {
            kind,
            ..self.clone()
        }
    }
}

impl fmt::Display for CollectionPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "artifacts/{}/users/{}/{}",
            self.app_id,
            self.owner_uid,
            self.kind.segment()
        )
    }
}
