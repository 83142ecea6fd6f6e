//! Integration tests for the feed: facets, pagination and draft visibility.
//!
//! Each test creates its own in-memory SQLite store and drives a
//! `FeedComposer` through `FeedLoader`, the way the command line does.

use pretty_assertions::assert_eq;
use quire::config::Config;
use quire::context::AppContext;
use quire::feed::{Facet, FeedLoader};
use quire::store::{PostDraft, TagRef};

const OWNER: &str = "alice";

async fn context(viewer: &str, extra: &str) -> AppContext {
    let config = Config::parse(&format!(
        "app_id = \"blog\"\nowner_uid = \"{}\"\nviewer_uid = \"{}\"\n{}",
        OWNER, viewer, extra
    ))
    .unwrap();
    AppContext::open(config, ":memory:").await.unwrap()
}

async fn tag(ctx: &AppContext, label: &str) -> TagRef {
    ctx.store
        .resolve_tag_label(ctx.posts_path(), label)
        .await
        .unwrap()
        .to_ref()
}

/// Create a post `n` minutes after the epoch of the test blog.
async fn add_post(ctx: &AppContext, n: i64, title: &str, is_draft: bool, tags: Vec<TagRef>) {
    let draft = PostDraft {
        title: title.to_string(),
        content: format!("<p>{}</p>", title),
        is_draft,
        tags,
        ..Default::default()
    };
    ctx.store
        .create_post_at(ctx.posts_path(), &draft, 1_700_000_000_000 + n * 60_000)
        .await
        .unwrap();
}

async fn started(ctx: &AppContext) -> FeedLoader {
    let mut loader = FeedLoader::new(ctx.documents(), ctx.posts_path().clone(), ctx.new_composer());
    loader.start().await.unwrap();
    loader
}

fn titles(loader: &FeedLoader) -> Vec<String> {
    loader
        .composer()
        .visible_posts()
        .iter()
        .map(|p| p.title.clone())
        .collect()
}

// ============================================================================
// Latest
// ============================================================================

#[tokio::test]
async fn test_latest_loads_two_pages_then_stops() {
    let ctx = context("bob", "").await;
    for i in 0..18 {
        add_post(&ctx, i, &format!("post {}", i), false, vec![]).await;
    }

    let mut loader = started(&ctx).await;
    assert_eq!(loader.composer().visible_posts().len(), 15);
    assert!(loader.composer().has_more());
    assert_eq!(titles(&loader)[0], "post 17");

    loader.load_more().await;
    assert_eq!(loader.composer().visible_posts().len(), 18);
    assert!(!loader.composer().has_more());
    assert_eq!(titles(&loader)[17], "post 0");
    assert!(loader.composer().error().is_none());

    // Exhausted: further calls change nothing
    loader.load_more().await;
    assert_eq!(loader.composer().visible_posts().len(), 18);
}

#[tokio::test]
async fn test_latest_is_newest_first_without_duplicates() {
    let ctx = context("bob", "page_size = 4\n").await;
    // Same timestamp for several posts: the id breaks the tie
    for i in 0..10 {
        add_post(&ctx, i / 3, &format!("post {}", i), false, vec![]).await;
    }

    let mut loader = started(&ctx).await;
    while loader.composer().has_more() {
        loader.load_more().await;
    }

    let posts = loader.composer().visible_posts();
    assert_eq!(posts.len(), 10);
    for pair in posts.windows(2) {
        assert!(
            (pair[0].created_at, &pair[0].id) > (pair[1].created_at, &pair[1].id),
            "out of order: {} then {}",
            pair[0].title,
            pair[1].title
        );
    }
}

#[tokio::test]
async fn test_empty_blog_has_no_more() {
    let ctx = context("bob", "").await;
    let loader = started(&ctx).await;
    assert!(loader.composer().visible_posts().is_empty());
    assert!(!loader.composer().has_more());
    assert!(!loader.composer().is_loading());
    assert!(loader.composer().error().is_none());
}

// ============================================================================
// Drafts
// ============================================================================

#[tokio::test]
async fn test_drafts_hidden_from_readers_everywhere() {
    let ctx = context("bob", "").await;
    let book = tag(&ctx, "Book:Dune").await;
    add_post(&ctx, 1, "published", false, vec![book.clone()]).await;
    add_post(&ctx, 2, "draft", true, vec![book.clone()]).await;
    add_post(&ctx, 3, "secret", true, vec![tag(&ctx, "Tech:Rust").await]).await;

    let mut loader = started(&ctx).await;
    assert_eq!(titles(&loader), vec!["published"]);
    assert!(loader.composer().all_posts().iter().all(|p| !p.is_draft));

    // Tags that only appear on drafts never become facets
    let facets: Vec<String> = loader
        .composer()
        .top_facets()
        .into_iter()
        .map(|f| format!("{} {}", f.display_name, f.count))
        .collect();
    assert_eq!(facets, vec!["Dune (Book) 1"]);

    for facet in [Facet::Top, Facet::Others, Facet::parse("Dune (Book)")] {
        loader.select_facet(facet).await;
        assert!(loader.composer().visible_posts().iter().all(|p| !p.is_draft));
    }
}

#[tokio::test]
async fn test_owner_sees_drafts() {
    let ctx = context(OWNER, "").await;
    add_post(&ctx, 1, "published", false, vec![]).await;
    add_post(&ctx, 2, "draft", true, vec![]).await;

    let loader = started(&ctx).await;
    assert!(loader.composer().viewer_is_admin());
    assert_eq!(titles(&loader), vec!["draft", "published"]);
}

// ============================================================================
// Facets
// ============================================================================

#[tokio::test]
async fn test_book_and_tech_facets() {
    let ctx = context("bob", "").await;
    let sapiens = tag(&ctx, "Book:Sapiens").await;
    let ai = tag(&ctx, "Tech:AI").await;
    for i in 0..12 {
        add_post(&ctx, i, &format!("book {}", i), false, vec![sapiens.clone()]).await;
    }
    for i in 12..20 {
        add_post(&ctx, i, &format!("tech {}", i), false, vec![ai.clone()]).await;
    }

    let mut loader = started(&ctx).await;
    let facets: Vec<(String, usize)> = loader
        .composer()
        .top_facets()
        .into_iter()
        .map(|f| (f.display_name, f.count))
        .collect();
    assert_eq!(
        facets,
        vec![("Sapiens (Book)".to_string(), 12), ("AI (Tech)".to_string(), 8)]
    );

    loader.select_facet(Facet::parse("Sapiens (Book)")).await;
    assert_eq!(loader.composer().visible_posts().len(), 12);
    assert!(!loader.composer().has_more());
    assert_eq!(titles(&loader)[0], "book 11");

    loader.select_facet(Facet::parse("AI (Tech)")).await;
    assert_eq!(loader.composer().visible_posts().len(), 8);

    loader.select_facet(Facet::Others).await;
    assert!(loader.composer().visible_posts().is_empty());
    assert!(!loader.composer().has_more());
}

#[tokio::test]
async fn test_others_excludes_top_tags_only() {
    let ctx = context("bob", "top_facet_limit = 1\n").await;
    let y = tag(&ctx, "Tech:Y").await;
    add_post(&ctx, 1, "y one", false, vec![y.clone()]).await;
    add_post(&ctx, 2, "y two", false, vec![y]).await;
    add_post(&ctx, 3, "travel", false, vec![tag(&ctx, "Travel:Z").await]).await;
    add_post(&ctx, 4, "untagged", false, vec![]).await;

    let mut loader = started(&ctx).await;
    let top: Vec<String> = loader
        .composer()
        .top_facets()
        .into_iter()
        .map(|f| f.display_name)
        .collect();
    assert_eq!(top, vec!["Y (Tech)"]);

    loader.select_facet(Facet::Others).await;
    assert_eq!(titles(&loader), vec!["untagged", "travel"]);
}

#[tokio::test]
async fn test_local_facet_paginates_by_page_size() {
    let ctx = context("bob", "page_size = 4\n").await;
    for i in 0..10 {
        add_post(&ctx, i, &format!("post {}", i), false, vec![]).await;
    }

    let mut loader = started(&ctx).await;
    loader.select_facet(Facet::Top).await;
    assert_eq!(loader.composer().visible_posts().len(), 4);
    loader.load_more().await;
    assert_eq!(loader.composer().visible_posts().len(), 8);
    assert!(loader.composer().has_more());
    loader.load_more().await;
    assert_eq!(loader.composer().visible_posts().len(), 10);
    assert!(!loader.composer().has_more());
}

#[tokio::test]
async fn test_top_orders_by_views() {
    let ctx = context("bob", "").await;
    add_post(&ctx, 1, "old", false, vec![]).await;
    add_post(&ctx, 2, "new", false, vec![]).await;
    let old_id = {
        let loader = started(&ctx).await;
        loader.composer().visible_posts()[1].id.clone()
    };
    ctx.store.record_view(ctx.posts_path(), &old_id).await.unwrap();

    let mut loader = started(&ctx).await;
    loader.select_facet(Facet::Top).await;
    assert_eq!(titles(&loader), vec!["old", "new"]);
}

#[tokio::test]
async fn test_switching_back_to_latest_restarts_pagination() {
    let ctx = context("bob", "page_size = 2\n").await;
    for i in 0..5 {
        add_post(&ctx, i, &format!("post {}", i), false, vec![]).await;
    }

    let mut loader = started(&ctx).await;
    loader.load_more().await;
    assert_eq!(loader.composer().visible_posts().len(), 4);

    loader.select_facet(Facet::Top).await;
    loader.select_facet(Facet::Latest).await;
    assert_eq!(titles(&loader), vec!["post 4", "post 3"]);
    assert!(loader.composer().has_more());
}
