//! Feed facets: the selectable views over the locally known post set.
//!
//! Everything here is pure. The composer calls into it with `all_posts`,
//! which is already filtered for visibility and sorted newest first.

use std::cmp::Ordering;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use crate::store::Post;

/// Category whose tags are preferred for the tab bar.
pub const DEFAULT_PRIORITY_CATEGORY: &str = "Book";

/// Number of tag facets shown as tabs.
pub const DEFAULT_TOP_FACET_LIMIT: usize = 5;

/// One selectable feed view.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Facet {
    /// Newest first, paginated by the store
    Latest,
    /// Most viewed first
    Top,
    /// Posts carrying none of the top tags
    Others,
    /// Posts carrying a top tag, identified by its display label
    Tag(String),
}

impl Facet {
    /// Parse a tab name. Anything that is not a fixed facet names a tag.
    pub fn parse(name: &str) -> Self {
        match name {
            "Latest" => Facet::Latest,
            "Top" => Facet::Top,
            "Others" => Facet::Others,
            other => Facet::Tag(other.to_string()),
        }
    }

    pub fn label(&self) -> &str {
        match self {
            Facet::Latest => "Latest",
            Facet::Top => "Top",
            Facet::Others => "Others",
            Facet::Tag(label) => label,
        }
    }

    /// True for the only facet backed by server-side pagination.
    pub fn is_server_paginated(&self) -> bool {
        matches!(self, Facet::Latest)
    }
}

impl fmt::Display for Facet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// A tag as a tab: its label and how many known posts carry it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TagFacet {
    pub category_name: String,
    pub name: String,
    pub display_name: String,
    pub count: usize,
}

impl TagFacet {
    fn new(category_name: &str, name: &str, count: usize) -> Self {
        Self {
            category_name: category_name.to_string(),
            name: name.to_string(),
            display_name: format!("{} ({})", name, category_name),
            count,
        }
    }

    fn matches(&self, post: &Post) -> bool {
        post.tags
            .iter()
            .any(|t| t.same_label(&self.category_name, &self.name))
    }
}

/// Tunables for facet derivation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FacetRules {
    pub priority_category: String,
    pub limit: usize,
}

impl Default for FacetRules {
    fn default() -> Self {
        Self {
            priority_category: DEFAULT_PRIORITY_CATEGORY.to_string(),
            limit: DEFAULT_TOP_FACET_LIMIT,
        }
    }
}

/// Visibility predicate: drafts are shown to the admin only.
pub fn is_visible(post: &Post, viewer_is_admin: bool) -> bool {
    viewer_is_admin || !post.is_draft
}

/// Most frequent tags across `posts`, priority-category tags first.
///
/// Each group is sorted by descending count, ties by `(category, name)`.
/// The result holds up to `rules.limit` priority tags, padded with the
/// most frequent other tags up to `rules.limit` in total. A post carrying
/// the same tag twice counts twice.
pub fn top_facets(posts: &[Arc<Post>], viewer_is_admin: bool, rules: &FacetRules) -> Vec<TagFacet> {
    let mut counts: HashMap<(&str, &str), usize> = HashMap::new();
    for post in posts.iter().filter(|p| is_visible(p, viewer_is_admin)) {
        for tag in &post.tags {
            *counts
                .entry((tag.category_name.as_str(), tag.name.as_str()))
                .or_default() += 1;
        }
    }

    let (mut priority, mut others): (Vec<TagFacet>, Vec<TagFacet>) = counts
        .into_iter()
        .map(|((category, name), count)| TagFacet::new(category, name, count))
        .partition(|f| f.category_name == rules.priority_category);

    let by_count = |a: &TagFacet, b: &TagFacet| -> Ordering {
        b.count
            .cmp(&a.count)
            .then_with(|| a.category_name.cmp(&b.category_name))
            .then_with(|| a.name.cmp(&b.name))
    };
    priority.sort_by(by_count);
    others.sort_by(by_count);

    priority.truncate(rules.limit);
    let remaining = rules.limit - priority.len();
    priority.extend(others.into_iter().take(remaining));
    priority
}

/// The posts a locally paginated facet shows, in display order.
///
/// Returns `None` for [`Facet::Latest`], which is never derived from the
/// local set. A tag facet that is no longer among `top` yields an empty list.
pub fn filter_by_facet(
    facet: &Facet,
    posts: &[Arc<Post>],
    top: &[TagFacet],
) -> Option<Vec<Arc<Post>>> {
    let filtered = match facet {
        Facet::Latest => return None,
        Facet::Top => {
            let mut sorted = posts.to_vec();
            // Stable: equal view counts keep newest-first order
            sorted.sort_by(|a, b| b.views.cmp(&a.views));
            sorted
        }
        Facet::Others => posts
            .iter()
            .filter(|p| !top.iter().any(|f| f.matches(p)))
            .cloned()
            .collect(),
        Facet::Tag(label) => match top.iter().find(|f| &f.display_name == label) {
            Some(selected) => posts
                .iter()
                .filter(|p| selected.matches(p))
                .cloned()
                .collect(),
            None => {
                tracing::debug!(facet = %label, "Tag facet not among top facets");
                Vec::new()
            }
        },
    };
    Some(filtered)
}
