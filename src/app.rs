use std::borrow::Cow;
use std::sync::Arc;
use tokio::task::JoinHandle;
use tokio::time::Instant;

use crate::context::AppContext;
use crate::feed::{Facet, FeedComposer, PageRequest};
use crate::store::{CollectionPath, DocumentStore, Page, Post, Snapshot, SqliteStore, StoreError};
use crate::theme::{Palette, ThemeVariant};

/// Maximum scroll offset for the reader view (ratatui u16 limit).
pub const MAX_SCROLL: usize = u16::MAX as usize;

/// Seconds a status message stays on screen.
const STATUS_TTL_SECS: u64 = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum View {
    Browse, // Tab bar + post list
    Reader, // Full-screen post
}

/// Events from background tasks
pub enum AppEvent {
    /// A live snapshot (or a failure to read one) from the subscription.
    Snapshot(Result<Snapshot, StoreError>),
    /// The subscription stopped delivering.
    SubscriptionEnded,
    /// A page request issued by the composer completed.
    PageLoaded {
        request: PageRequest,
        result: Result<Page, StoreError>,
    },
    /// A post view was recorded.
    ViewRecorded {
        post_id: String,
        result: Result<i64, StoreError>,
    },
    /// A background task panicked.
    ///
    /// Fields:
    /// - `task`: Name of the task that panicked (e.g., "page_fetch")
    /// - `error`: The panic message extracted from the panic payload
    TaskPanicked { task: &'static str, error: String },
}

// ============================================================================
// Application State
// ============================================================================

/// Central application state
pub struct App {
    pub store: Arc<SqliteStore>,
    pub documents: Arc<dyn DocumentStore>,
    pub posts_path: CollectionPath,

    // Theme
    pub theme_variant: ThemeVariant,
    pub theme: Palette,

    // Feed
    pub composer: FeedComposer,

    // UI State
    pub view: View,
    pub selected: usize,
    pub scroll_offset: usize,
    pub reader_post: Option<Arc<Post>>,
    /// View count returned by the store after opening the reader
    pub reader_views: Option<i64>,

    pub status_message: Option<(Cow<'static, str>, Instant)>,
    pub needs_redraw: bool,
    pub spinner_frame: usize,

    /// Task forwarding subscription snapshots into the event channel
    pub subscription_handle: Option<JoinHandle<()>>,
}

impl App {
    pub fn new(ctx: &AppContext) -> Self {
        let theme_variant = ThemeVariant::from_str_name(&ctx.config.theme).unwrap_or_else(|| {
            tracing::warn!(theme = %ctx.config.theme, "Unknown theme, using dark");
            ThemeVariant::Dark
        });

        Self {
            store: Arc::clone(&ctx.store),
            documents: ctx.documents(),
            posts_path: ctx.posts_path().clone(),
            theme_variant,
            theme: theme_variant.palette(),
            composer: ctx.new_composer(),
            view: View::Browse,
            selected: 0,
            scroll_offset: 0,
            reader_post: None,
            reader_views: None,
            status_message: None,
            needs_redraw: true,
            spinner_frame: 0,
            subscription_handle: None,
        }
    }

    pub fn cycle_theme(&mut self) -> &'static str {
        self.theme_variant = self.theme_variant.next();
        self.theme = self.theme_variant.palette();
        self.theme_variant.name()
    }

    // ========================================================================
    // Feed
    // ========================================================================

    /// Tabs in display order and the index of the active one.
    ///
    /// A tag facet that has dropped out of the top set stays selected but
    /// has no tab; the index then points at `Latest`.
    pub fn tabs(&self) -> (Vec<Facet>, usize) {
        let tabs = self.composer.tabs();
        let active = tabs
            .iter()
            .position(|t| t == self.composer.active_facet())
            .unwrap_or(0);
        (tabs, active)
    }

    fn tab_at_offset(&self, offset: isize) -> Facet {
        let (tabs, active) = self.tabs();
        let len = tabs.len() as isize;
        let idx = (active as isize + offset).rem_euclid(len) as usize;
        tabs[idx].clone()
    }

    /// Switch facet and reset the selection.
    pub fn select_facet(&mut self, facet: Facet) -> Option<PageRequest> {
        self.selected = 0;
        self.composer.select_facet(facet)
    }

    pub fn next_facet(&mut self) -> Option<PageRequest> {
        let facet = self.tab_at_offset(1);
        self.select_facet(facet)
    }

    pub fn prev_facet(&mut self) -> Option<PageRequest> {
        let facet = self.tab_at_offset(-1);
        self.select_facet(facet)
    }

    pub fn load_more(&mut self) -> Option<PageRequest> {
        self.composer.load_more()
    }

    pub fn selected_post(&self) -> Option<&Arc<Post>> {
        self.composer.visible_posts().get(self.selected)
    }

    pub fn clamp_selection(&mut self) {
        let len = self.composer.visible_posts().len();
        self.selected = self.selected.min(len.saturating_sub(1));
    }

    // ========================================================================
    // Navigation
    // ========================================================================

    pub fn nav_up(&mut self) {
        self.selected = self.selected.saturating_sub(1);
    }

    /// Move down. Moving past the last post asks for the next page.
    pub fn nav_down(&mut self) -> Option<PageRequest> {
        let len = self.composer.visible_posts().len();
        if self.selected + 1 < len {
            self.selected += 1;
            None
        } else {
            self.composer.load_more()
        }
    }

    pub fn scroll_up(&mut self, lines: usize) {
        self.scroll_offset = self.scroll_offset.saturating_sub(lines);
    }

    pub fn scroll_down(&mut self, lines: usize) {
        self.scroll_offset = self.scroll_offset.saturating_add(lines).min(MAX_SCROLL);
    }

    /// Enter reader view for the selected post.
    pub fn enter_reader(&mut self) -> Option<Arc<Post>> {
        let post = Arc::clone(self.selected_post()?);
        self.view = View::Reader;
        self.scroll_offset = 0;
        self.reader_views = None;
        self.reader_post = Some(Arc::clone(&post));
        Some(post)
    }

    pub fn exit_reader(&mut self) {
        self.view = View::Browse;
        self.scroll_offset = 0;
        self.reader_post = None;
        self.reader_views = None;
    }

    // ========================================================================
    // Status
    // ========================================================================

    /// Set status message (will auto-expire after 3 seconds)
    pub fn set_status(&mut self, msg: impl Into<Cow<'static, str>>) {
        self.status_message = Some((msg.into(), Instant::now()));
    }

    /// Clear status message if expired.
    /// Returns true if a message was actually cleared
    pub fn clear_expired_status(&mut self) -> bool {
        if let Some((_, time)) = &self.status_message {
            if time.elapsed().as_secs() >= STATUS_TTL_SECS {
                self.status_message = None;
                return true;
            }
        }
        false
    }
}

// ============================================================================
// Resource Cleanup
// ============================================================================

/// Abort the subscription forwarder on drop, which in turn drops (and
/// closes) the store subscription it owns.
impl Drop for App {
    fn drop(&mut self) {
        if let Some(handle) = self.subscription_handle.take() {
            handle.abort();
            tracing::debug!("Aborted subscription task on App drop");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::store::{PostDraft, TagRef};
    use tokio::time::{self, Duration};

    async fn test_app(viewer: &str) -> App {
        let config = Config::parse(&format!(
            "app_id = \"blog\"\nowner_uid = \"alice\"\nviewer_uid = \"{}\"\npage_size = 3\n",
            viewer
        ))
        .unwrap();
        let ctx = AppContext::open(config, ":memory:").await.unwrap();
        App::new(&ctx)
    }

    fn post(id: &str, created_at: i64, tags: Vec<TagRef>) -> Arc<Post> {
        Arc::new(Post {
            id: id.to_string(),
            owner_uid: "alice".into(),
            title: id.to_string(),
            subtitle: None,
            content: "<p>x</p>".into(),
            image_url: None,
            is_draft: false,
            created_at,
            updated_at: None,
            author_name: None,
            author_avatar: None,
            tag_ids: tags.iter().map(|t| t.id.clone()).collect(),
            tags,
            views: 0,
        })
    }

    fn tag(category: &str, name: &str) -> TagRef {
        TagRef {
            id: name.into(),
            name: name.into(),
            category_id: category.into(),
            category_name: category.into(),
        }
    }

    #[tokio::test]
    async fn test_nav_empty_list() {
        let mut app = test_app("bob").await;
        assert!(app.selected_post().is_none());
        app.nav_up();
        assert_eq!(app.selected, 0);
        assert!(app.enter_reader().is_none());
        assert_eq!(app.view, View::Browse);
    }

    #[tokio::test]
    async fn test_tab_cycling_wraps() {
        let mut app = test_app("bob").await;
        app.composer
            .on_remote_snapshot(vec![post("a", 2, vec![tag("Book", "Dune")]), post("b", 1, vec![])]);

        let (tabs, active) = app.tabs();
        let labels: Vec<String> = tabs.iter().map(|t| t.to_string()).collect();
        assert_eq!(labels, vec!["Latest", "Top", "Dune (Book)", "Others"]);
        assert_eq!(active, 0);

        assert!(app.next_facet().is_none());
        assert_eq!(app.composer.active_facet(), &Facet::Top);
        assert!(app.prev_facet().is_some());
        assert!(app.prev_facet().is_none());
        assert_eq!(app.composer.active_facet(), &Facet::Others);
    }

    #[tokio::test]
    async fn test_nav_down_past_end_loads_more() {
        let mut app = test_app("bob").await;
        let posts: Vec<_> = (0..5).map(|i| post(&format!("p{}", i), 10 - i, vec![])).collect();
        app.composer.on_remote_snapshot(posts);
        app.select_facet(Facet::Top);
        assert_eq!(app.composer.visible_posts().len(), 3);

        app.nav_down();
        app.nav_down();
        assert_eq!(app.selected, 2);
        // Local facet: no request, the next slice is appended directly
        assert!(app.nav_down().is_none());
        assert_eq!(app.composer.visible_posts().len(), 5);
        app.nav_down();
        assert_eq!(app.selected, 3);
    }

    #[tokio::test]
    async fn test_facet_switch_resets_selection() {
        let mut app = test_app("bob").await;
        let posts: Vec<_> = (0..3).map(|i| post(&format!("p{}", i), 10 - i, vec![])).collect();
        app.composer.on_remote_snapshot(posts);
        app.select_facet(Facet::Top);
        app.nav_down();
        app.select_facet(Facet::Others);
        assert_eq!(app.selected, 0);
    }

    #[tokio::test]
    async fn test_enter_and_exit_reader() {
        let mut app = test_app("bob").await;
        app.composer.on_remote_snapshot(vec![post("a", 1, vec![])]);
        app.select_facet(Facet::Top);

        let opened = app.enter_reader().unwrap();
        assert_eq!(opened.id, "a");
        assert_eq!(app.view, View::Reader);
        app.scroll_down(5);
        app.exit_reader();
        assert_eq!(app.view, View::Browse);
        assert_eq!(app.scroll_offset, 0);
        assert!(app.reader_post.is_none());
    }

    #[tokio::test]
    async fn test_admin_flag_follows_viewer() {
        assert!(test_app("alice").await.composer.viewer_is_admin());
        assert!(!test_app("bob").await.composer.viewer_is_admin());
    }

    #[tokio::test]
    async fn test_cycle_theme() {
        let mut app = test_app("bob").await;
        assert_eq!(app.cycle_theme(), "Light");
        assert_eq!(app.cycle_theme(), "Dark");
    }

    #[tokio::test]
    async fn test_store_is_shared_with_context() {
        let app = test_app("alice").await;
        let draft = PostDraft {
            title: "Hello".into(),
            content: "<p>Hi</p>".into(),
            ..Default::default()
        };
        app.store.create_post(&app.posts_path, &draft).await.unwrap();
        let page = app
            .documents
            .fetch_page(&app.posts_path, None, 10)
            .await
            .unwrap();
        assert_eq!(page.docs.len(), 1);
    }

    #[tokio::test]
    async fn test_status_expires() {
        let mut app = test_app("bob").await;
        time::pause();
        app.set_status("Hello");
        assert!(!app.clear_expired_status());
        time::advance(Duration::from_secs(3)).await;
        assert!(app.clear_expired_status());
        assert!(app.status_message.is_none());
    }
}
