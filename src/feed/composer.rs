//! Feed composition: which posts are on screen, in what order, and whether
//! more can be loaded.
//!
//! The composer keeps two independent slices of state:
//!
//! - `all_posts`: the complete visible collection, replaced wholesale by
//!   every live snapshot. Facets, `Top`, `Others` and tag tabs are derived
//!   from it and paginated locally.
//! - `visible_posts`: what the reader is looking at. In `Latest` it is built
//!   from store pages fetched with a server cursor; elsewhere from slices of
//!   `all_posts`. It is append-only until the next facet switch.
//!
//! The server cursor belongs to `Latest` alone and is dropped on every facet
//! switch. Page requests carry the generation they were issued under so a
//! result arriving after a switch is discarded.
//!
//! The composer does no I/O. Callers run the [`PageRequest`]s it hands out
//! against a [`DocumentStore`](crate::store::DocumentStore) and feed the
//! outcome back through [`FeedComposer::apply_page`].

use std::sync::Arc;
use thiserror::Error;

use super::entry::{FeedEntry, DEFAULT_EXCERPT_LENGTH};
use super::facets::{filter_by_facet, is_visible, top_facets, Facet, FacetRules, TagFacet};
use crate::store::{Cursor, Page, Post, StoreError};

/// Posts per page, for both server and local pagination.
pub const PAGE_SIZE: usize = 15;

// ============================================================================
// Error Types
// ============================================================================

/// Errors surfaced to the reader.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FeedError {
    /// Required identifiers are missing. Fatal, no retry.
    #[error("Application configuration error: {0}")]
    Configuration(String),

    /// The store failed during a snapshot or page read. Retry with load more.
    #[error("Failed to load posts: {0}")]
    Fetch(String),
}

impl FeedError {
    /// True when the reader can retry with load more.
    pub fn is_retryable(&self) -> bool {
        matches!(self, FeedError::Fetch(_))
    }
}

// ============================================================================
// Settings and Requests
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ComposerSettings {
    pub page_size: usize,
    pub excerpt_length: usize,
    pub facet_rules: FacetRules,
}

impl Default for ComposerSettings {
    fn default() -> Self {
        Self {
            page_size: PAGE_SIZE,
            excerpt_length: DEFAULT_EXCERPT_LENGTH,
            facet_rules: FacetRules::default(),
        }
    }
}

/// A store page read the composer wants performed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageRequest {
    /// Unique per composer; identifies the in-flight request
    pub id: u64,
    /// Facet generation the request was issued under
    pub generation: u64,
    pub facet: Facet,
    /// Continue after this document; `None` for the first page
    pub after: Option<Cursor>,
    pub limit: usize,
}

// ============================================================================
// FeedComposer
// ============================================================================

pub struct FeedComposer {
    settings: ComposerSettings,
    viewer_is_admin: bool,

    all_posts: Vec<Arc<Post>>,
    /// At least one snapshot has been applied
    snapshot_seen: bool,

    visible_posts: Vec<Arc<Post>>,
    server_cursor: Option<Cursor>,
    active_facet: Facet,
    has_more: bool,

    /// Bumped on every facet switch
    generation: u64,
    next_request_id: u64,
    in_flight: Option<u64>,
    /// A local facet was selected before the first snapshot arrived
    awaiting_snapshot: bool,

    error: Option<FeedError>,
}

impl FeedComposer {
    pub fn new(settings: ComposerSettings, viewer_is_admin: bool) -> Self {
        Self {
            settings,
            viewer_is_admin,
            all_posts: Vec::new(),
            snapshot_seen: false,
            visible_posts: Vec::new(),
            server_cursor: None,
            active_facet: Facet::Latest,
            has_more: true,
            generation: 0,
            next_request_id: 0,
            in_flight: None,
            awaiting_snapshot: false,
            error: None,
        }
    }

    /// Initial load: select `Latest` and return its first page request.
    pub fn start(&mut self) -> Option<PageRequest> {
        self.select_facet(Facet::Latest)
    }

    // ========================================================================
    // Operations
    // ========================================================================

    /// Switch to `facet`, discarding everything loaded for the previous one.
    ///
    /// Returns the first page request for `Latest`; local facets are sliced
    /// immediately (or as soon as the first snapshot arrives).
    pub fn select_facet(&mut self, facet: Facet) -> Option<PageRequest> {
        tracing::debug!(from = %self.active_facet, to = %facet, "Selecting facet");

        self.generation = self.generation.wrapping_add(1);
        self.active_facet = facet;
        self.visible_posts.clear();
        self.server_cursor = None;
        self.has_more = true;
        self.in_flight = None;
        self.awaiting_snapshot = false;

        if self.active_facet.is_server_paginated() {
            return self.issue_request();
        }

        if self.snapshot_seen {
            self.load_local_page(true);
        } else {
            self.awaiting_snapshot = true;
        }
        None
    }

    /// Load the next page of the active facet.
    ///
    /// No-op while a request is in flight or once the facet is exhausted, so
    /// rapid repeated calls collapse into one request.
    pub fn load_more(&mut self) -> Option<PageRequest> {
        if !self.has_more || self.in_flight.is_some() || self.awaiting_snapshot {
            return None;
        }

        if self.active_facet.is_server_paginated() {
            self.issue_request()
        } else {
            self.load_local_page(false);
            None
        }
    }

    /// Resolve a page request issued by this composer.
    ///
    /// Returns `false` when the result was discarded because the facet was
    /// switched (or another request superseded it) after it was issued.
    pub fn apply_page(&mut self, request: &PageRequest, result: Result<Page, StoreError>) -> bool {
        if request.generation != self.generation || self.in_flight != Some(request.id) {
            tracing::debug!(
                request = request.id,
                facet = %request.facet,
                "Discarding stale page result"
            );
            return false;
        }
        self.in_flight = None;

        match result {
            Ok(page) => {
                let returned = page.docs.len();
                if returned < request.limit {
                    self.has_more = false;
                }
                if let Some(cursor) = page.next_cursor {
                    self.server_cursor = Some(cursor);
                }
                let admin = self.viewer_is_admin;
                self.visible_posts
                    .extend(page.docs.into_iter().filter(|p| is_visible(p, admin)));
                self.error = None;

                tracing::debug!(
                    returned,
                    visible = self.visible_posts.len(),
                    has_more = self.has_more,
                    "Applied page"
                );
            }
            Err(e) => {
                tracing::warn!(error = %e, facet = %request.facet, "Page fetch failed");
                self.error = Some(FeedError::Fetch(e.to_string()));
            }
        }
        true
    }

    /// Replace the locally known post set with a new snapshot.
    ///
    /// Posts already on screen are left alone; a post that disappears (or
    /// becomes a draft) stays visible until the next facet switch.
    pub fn on_remote_snapshot(&mut self, docs: Vec<Arc<Post>>) {
        let admin = self.viewer_is_admin;
        let mut posts: Vec<Arc<Post>> = docs.into_iter().filter(|p| is_visible(p, admin)).collect();
        posts.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        self.all_posts = posts;
        self.snapshot_seen = true;

        tracing::debug!(posts = self.all_posts.len(), "Applied snapshot");

        if self.awaiting_snapshot {
            self.awaiting_snapshot = false;
            self.load_local_page(true);
        }
    }

    /// Record a failure of the live subscription.
    pub fn on_snapshot_error(&mut self, err: &StoreError) {
        tracing::warn!(error = %err, "Live update failed");
        self.error = Some(FeedError::Fetch(err.to_string()));
    }

    /// Tag facets for the tab bar, derived from the current post set.
    pub fn top_facets(&self) -> Vec<TagFacet> {
        top_facets(&self.all_posts, self.viewer_is_admin, &self.settings.facet_rules)
    }

    /// The complete display list for a local facet; `None` for `Latest`.
    pub fn filter_by_facet(&self, facet: &Facet) -> Option<Vec<Arc<Post>>> {
        filter_by_facet(facet, &self.all_posts, &self.top_facets())
    }

    /// Tabs in display order: `Latest`, `Top`, top tags, `Others`.
    pub fn tabs(&self) -> Vec<Facet> {
        let mut tabs = vec![Facet::Latest, Facet::Top];
        tabs.extend(
            self.top_facets()
                .into_iter()
                .map(|f| Facet::Tag(f.display_name)),
        );
        tabs.push(Facet::Others);
        tabs
    }

    pub fn dismiss_error(&mut self) {
        self.error = None;
    }

    // ========================================================================
    // Accessors
    // ========================================================================

    pub fn visible_posts(&self) -> &[Arc<Post>] {
        &self.visible_posts
    }

    pub fn all_posts(&self) -> &[Arc<Post>] {
        &self.all_posts
    }

    pub fn entries(&self) -> Vec<FeedEntry> {
        self.visible_posts
            .iter()
            .map(|p| FeedEntry::new(Arc::clone(p), self.settings.excerpt_length))
            .collect()
    }

    pub fn active_facet(&self) -> &Facet {
        &self.active_facet
    }

    pub fn has_more(&self) -> bool {
        self.has_more
    }

    pub fn is_loading(&self) -> bool {
        self.in_flight.is_some() || self.awaiting_snapshot
    }

    pub fn error(&self) -> Option<&FeedError> {
        self.error.as_ref()
    }

    pub fn viewer_is_admin(&self) -> bool {
        self.viewer_is_admin
    }

    pub fn page_size(&self) -> usize {
        self.settings.page_size
    }

    // ========================================================================
    // Internals
    // ========================================================================

    fn issue_request(&mut self) -> Option<PageRequest> {
        self.next_request_id = self.next_request_id.wrapping_add(1);
        let request = PageRequest {
            id: self.next_request_id,
            generation: self.generation,
            facet: self.active_facet.clone(),
            after: self.server_cursor.clone(),
            limit: self.settings.page_size,
        };
        self.in_flight = Some(request.id);
        tracing::debug!(
            request = request.id,
            after = request.after.is_some(),
            "Issuing page request"
        );
        Some(request)
    }

    /// Append the next slice of the active local facet.
    ///
    /// The first slice ends the feed when it holds the whole facet. Later
    /// slices end it only when they come up short, so posts added by a
    /// snapshot after an exactly-full slice stay reachable.
    fn load_local_page(&mut self, first: bool) {
        let Some(filtered) = self.filter_by_facet(&self.active_facet) else {
            return;
        };
        let start = self.visible_posts.len().min(filtered.len());
        let end = (start + self.settings.page_size).min(filtered.len());
        let slice = &filtered[start..end];

        let exhausted = if first {
            end == filtered.len()
        } else {
            slice.len() < self.settings.page_size
        };
        if exhausted {
            self.has_more = false;
        }
        self.visible_posts.extend_from_slice(slice);

        tracing::debug!(
            facet = %self.active_facet,
            added = slice.len(),
            total = filtered.len(),
            has_more = self.has_more,
            "Sliced local page"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::feed::facets::tests::{post, tag};
    use pretty_assertions::assert_eq;
    use proptest::prelude::*;

    fn page_of(posts: &[Arc<Post>]) -> Page {
        Page {
            docs: posts.to_vec(),
            next_cursor: posts.last().map(|p| Cursor::after(p)),
        }
    }

    fn numbered(n: usize) -> Vec<Arc<Post>> {
        (0..n)
            .map(|i| post(&format!("p{:02}", i), 1_000 - i as i64, vec![]))
            .collect()
    }

    fn draft(p: Arc<Post>) -> Arc<Post> {
        let mut p = (*p).clone();
        p.is_draft = true;
        Arc::new(p)
    }

    fn ids(posts: &[Arc<Post>]) -> Vec<&str> {
        posts.iter().map(|p| p.id.as_str()).collect()
    }

    #[test]
    fn test_latest_pages_fifteen_then_three() {
        let posts = numbered(18);
        let mut composer = FeedComposer::new(ComposerSettings::default(), false);

        let first = composer.start().unwrap();
        assert!(first.after.is_none());
        assert!(composer.apply_page(&first, Ok(page_of(&posts[..15]))));
        assert!(composer.has_more());
        assert_eq!(composer.visible_posts().len(), 15);

        let second = composer.load_more().unwrap();
        assert_eq!(second.after, Some(Cursor::after(&posts[14])));
        assert!(composer.apply_page(&second, Ok(page_of(&posts[15..]))));
        assert!(!composer.has_more());
        assert_eq!(composer.visible_posts().len(), 18);

        assert!(composer.load_more().is_none());
    }

    #[test]
    fn test_empty_latest_page_ends_feed() {
        let mut composer = FeedComposer::new(ComposerSettings::default(), false);
        let req = composer.start().unwrap();
        composer.apply_page(&req, Ok(page_of(&[])));
        assert!(!composer.has_more());
        assert!(composer.error().is_none());
    }

    #[test]
    fn test_load_more_collapses_while_in_flight() {
        let mut composer = FeedComposer::new(ComposerSettings::default(), false);
        let first = composer.start().unwrap();
        assert!(composer.load_more().is_none());
        assert!(composer.load_more().is_none());
        assert!(composer.is_loading());

        composer.apply_page(&first, Ok(page_of(&numbered(15))));
        assert!(!composer.is_loading());
        assert!(composer.load_more().is_some());
        assert!(composer.load_more().is_none());
    }

    #[test]
    fn test_stale_page_after_facet_switch_is_discarded() {
        let mut composer = FeedComposer::new(ComposerSettings::default(), true);
        composer.on_remote_snapshot(numbered(3));
        let stale = composer.start().unwrap();

        composer.select_facet(Facet::Top);
        assert!(!composer.apply_page(&stale, Ok(page_of(&numbered(15)))));
        assert_eq!(composer.visible_posts().len(), 3);
        assert_eq!(composer.active_facet(), &Facet::Top);
    }

    #[test]
    fn test_switching_back_to_latest_never_reuses_cursor() {
        let posts = numbered(15);
        let mut composer = FeedComposer::new(ComposerSettings::default(), false);
        let req = composer.start().unwrap();
        composer.apply_page(&req, Ok(page_of(&posts)));

        composer.select_facet(Facet::Top);
        let fresh = composer.select_facet(Facet::Latest).unwrap();
        assert!(fresh.after.is_none());
        assert!(composer.visible_posts().is_empty());
        assert!(composer.has_more());
    }

    #[test]
    fn test_reselecting_latest_discards_earlier_request() {
        let mut composer = FeedComposer::new(ComposerSettings::default(), false);
        let old = composer.start().unwrap();
        let new = composer.select_facet(Facet::Latest).unwrap();
        assert_ne!(old.id, new.id);
        assert!(!composer.apply_page(&old, Ok(page_of(&numbered(15)))));
        assert!(composer.apply_page(&new, Ok(page_of(&numbered(2)))));
        assert_eq!(composer.visible_posts().len(), 2);
    }

    #[test]
    fn test_failed_page_keeps_state_and_allows_retry() {
        let posts = numbered(20);
        let mut composer = FeedComposer::new(ComposerSettings::default(), false);
        let req = composer.start().unwrap();
        composer.apply_page(&req, Ok(page_of(&posts[..15])));

        let next = composer.load_more().unwrap();
        composer.apply_page(&next, Err(StoreError::SubscriptionClosed));
        assert_eq!(composer.visible_posts().len(), 15);
        assert!(composer.has_more());
        assert!(matches!(composer.error(), Some(FeedError::Fetch(_))));
        assert!(composer.error().unwrap().is_retryable());

        let retry = composer.load_more().unwrap();
        assert_eq!(retry.after, next.after);
        composer.apply_page(&retry, Ok(page_of(&posts[15..])));
        assert!(composer.error().is_none());
        assert_eq!(composer.visible_posts().len(), 20);
    }

    #[test]
    fn test_latest_page_hides_drafts_from_readers() {
        let mut posts = numbered(15);
        posts[3] = draft(Arc::clone(&posts[3]));
        let mut composer = FeedComposer::new(ComposerSettings::default(), false);
        let req = composer.start().unwrap();
        composer.apply_page(&req, Ok(page_of(&posts)));

        // Raw page was full, so there may be more
        assert!(composer.has_more());
        assert_eq!(composer.visible_posts().len(), 14);
        assert!(composer.visible_posts().iter().all(|p| !p.is_draft));
    }

    #[test]
    fn test_snapshot_excludes_drafts_for_readers_everywhere() {
        let mut posts = numbered(4);
        posts[1] = draft(post("secret", 999, vec![tag("Book", "Hidden")]));
        let mut composer = FeedComposer::new(ComposerSettings::default(), false);
        composer.on_remote_snapshot(posts);

        assert_eq!(composer.all_posts().len(), 3);
        assert!(composer.top_facets().is_empty());
        composer.select_facet(Facet::Top);
        assert!(composer.visible_posts().iter().all(|p| p.id != "secret"));
        composer.select_facet(Facet::Others);
        assert!(composer.visible_posts().iter().all(|p| p.id != "secret"));
    }

    #[test]
    fn test_admin_sees_drafts() {
        let posts = vec![draft(post("d", 1, vec![]))];
        let mut composer = FeedComposer::new(ComposerSettings::default(), true);
        composer.on_remote_snapshot(posts);
        assert_eq!(composer.all_posts().len(), 1);
    }

    #[test]
    fn test_snapshot_does_not_touch_rendered_latest_posts() {
        let posts = numbered(5);
        let mut composer = FeedComposer::new(ComposerSettings::default(), false);
        let req = composer.start().unwrap();
        composer.apply_page(&req, Ok(page_of(&posts)));

        // p02 turns into a draft after it was rendered
        let mut changed = posts.clone();
        changed[2] = draft(Arc::clone(&posts[2]));
        composer.on_remote_snapshot(changed);

        assert_eq!(composer.all_posts().len(), 4);
        assert_eq!(composer.visible_posts().len(), 5);
        assert!(composer.visible_posts().iter().any(|p| p.id == "p02"));
    }

    #[test]
    fn test_local_facet_paginates_from_all_posts() {
        let mut composer = FeedComposer::new(ComposerSettings::default(), false);
        composer.on_remote_snapshot(numbered(20));

        assert!(composer.select_facet(Facet::Top).is_none());
        assert_eq!(composer.visible_posts().len(), 15);
        assert!(composer.has_more());

        assert!(composer.load_more().is_none());
        assert_eq!(composer.visible_posts().len(), 20);
        assert!(!composer.has_more());

        // Exhausted: no further slice
        assert!(composer.load_more().is_none());
        assert_eq!(composer.visible_posts().len(), 20);
    }

    #[test]
    fn test_exactly_full_later_slice_keeps_feed_open() {
        let mut composer = FeedComposer::new(ComposerSettings::default(), false);
        composer.on_remote_snapshot(numbered(30));
        composer.select_facet(Facet::Top);
        assert_eq!(composer.visible_posts().len(), 15);
        assert!(composer.has_more());

        composer.load_more();
        assert_eq!(composer.visible_posts().len(), 30);
        assert!(composer.has_more());

        // A snapshot adds posts; the next slice reaches them
        composer.on_remote_snapshot(numbered(32));
        composer.load_more();
        assert_eq!(composer.visible_posts().len(), 32);
        assert!(!composer.has_more());
    }

    #[test]
    fn test_empty_later_slice_ends_feed() {
        let mut composer = FeedComposer::new(ComposerSettings::default(), false);
        composer.on_remote_snapshot(numbered(30));
        composer.select_facet(Facet::Top);
        composer.load_more();
        assert!(composer.has_more());

        composer.load_more();
        assert_eq!(composer.visible_posts().len(), 30);
        assert!(!composer.has_more());
    }

    #[test]
    fn test_local_facet_exact_page_has_no_phantom_page() {
        let mut composer = FeedComposer::new(ComposerSettings::default(), false);
        composer.on_remote_snapshot(numbered(15));
        composer.select_facet(Facet::Top);
        assert_eq!(composer.visible_posts().len(), 15);
        assert!(!composer.has_more());
    }

    #[test]
    fn test_local_facet_selected_before_first_snapshot() {
        let mut composer = FeedComposer::new(ComposerSettings::default(), false);
        assert!(composer.select_facet(Facet::Others).is_none());
        assert!(composer.is_loading());
        assert!(composer.load_more().is_none());

        composer.on_remote_snapshot(numbered(3));
        assert!(!composer.is_loading());
        assert_eq!(composer.visible_posts().len(), 3);
        assert!(!composer.has_more());
    }

    #[test]
    fn test_later_snapshot_does_not_reslice_local_facet() {
        let mut composer = FeedComposer::new(ComposerSettings::default(), false);
        composer.on_remote_snapshot(numbered(3));
        composer.select_facet(Facet::Top);
        composer.on_remote_snapshot(numbered(10));
        assert_eq!(composer.visible_posts().len(), 3);
    }

    #[test]
    fn test_tag_facet_selects_matching_posts() {
        let mut posts = Vec::new();
        for i in 0..12 {
            posts.push(post(&format!("b{:02}", i), 100 - i, vec![tag("Book", "Sapiens")]));
        }
        for i in 0..8 {
            posts.push(post(&format!("t{:02}", i), 50 - i, vec![tag("Tech", "AI")]));
        }
        let mut composer = FeedComposer::new(ComposerSettings::default(), true);
        composer.on_remote_snapshot(posts);

        let tabs: Vec<String> = composer.tabs().iter().map(|t| t.to_string()).collect();
        assert_eq!(tabs, vec!["Latest", "Top", "Sapiens (Book)", "AI (Tech)", "Others"]);

        composer.select_facet(Facet::parse("AI (Tech)"));
        assert_eq!(composer.visible_posts().len(), 8);
        assert!(!composer.has_more());

        composer.select_facet(Facet::Others);
        assert!(composer.visible_posts().is_empty());
    }

    #[test]
    fn test_unknown_tag_facet_is_empty_and_exhausted() {
        let mut composer = FeedComposer::new(ComposerSettings::default(), false);
        composer.on_remote_snapshot(numbered(5));
        composer.select_facet(Facet::Tag("Nope (Book)".into()));
        assert!(composer.visible_posts().is_empty());
        assert!(!composer.has_more());
    }

    #[test]
    fn test_snapshot_error_is_observable_and_dismissible() {
        let mut composer = FeedComposer::new(ComposerSettings::default(), false);
        composer.on_snapshot_error(&StoreError::SubscriptionClosed);
        assert!(composer.error().is_some());
        composer.dismiss_error();
        assert!(composer.error().is_none());
    }

    #[test]
    fn test_entries_decorate_visible_posts() {
        let mut composer = FeedComposer::new(ComposerSettings::default(), false);
        composer.on_remote_snapshot(numbered(2));
        composer.select_facet(Facet::Top);
        let entries = composer.entries();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].excerpt, "body");
        assert_eq!(ids(composer.visible_posts()), vec!["p00", "p01"]);
    }

    proptest! {
        #[test]
        fn prop_snapshot_is_visible_subset_sorted_desc(
            specs in prop::collection::vec((0i64..500, any::<bool>()), 0..60),
            admin in any::<bool>(),
        ) {
            let docs: Vec<Arc<Post>> = specs
                .iter()
                .enumerate()
                .map(|(i, (created, is_draft))| {
                    let p = post(&format!("p{}", i), *created, vec![]);
                    if *is_draft { draft(p) } else { p }
                })
                .collect();
            let expected = docs.iter().filter(|p| admin || !p.is_draft).count();

            let mut composer = FeedComposer::new(ComposerSettings::default(), admin);
            composer.on_remote_snapshot(docs);

            let all = composer.all_posts();
            prop_assert_eq!(all.len(), expected);
            prop_assert!(all.iter().all(|p| admin || !p.is_draft));
            for pair in all.windows(2) {
                prop_assert!(pair[0].created_at >= pair[1].created_at);
            }
        }

        #[test]
        fn prop_facet_switch_resets_to_first_page(
            n in 0usize..50,
            loads in 0usize..4,
        ) {
            let mut composer = FeedComposer::new(ComposerSettings::default(), false);
            composer.on_remote_snapshot(numbered(n));
            composer.select_facet(Facet::Top);
            for _ in 0..loads {
                composer.load_more();
            }
            composer.select_facet(Facet::Others);
            prop_assert_eq!(composer.visible_posts().len(), n.min(PAGE_SIZE));
            prop_assert_eq!(composer.has_more(), n > PAGE_SIZE);
        }
    }
}
