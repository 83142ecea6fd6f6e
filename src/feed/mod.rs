//! The post feed shown to readers.
//!
//! - [`facets`] - tab derivation and local filtering over the known posts
//! - [`composer`] - the pagination state machine behind the feed view
//! - [`entry`] - display decoration (excerpt, short date)
//! - [`loader`] - runs composer page requests against a store
//!
//! # Example
//!
//! ```ignore
//! let mut composer = FeedComposer::new(ComposerSettings::default(), false);
//! if let Some(request) = composer.start() {
//!     let page = fetch_page(store.as_ref(), &path, &request).await;
//!     composer.apply_page(&request, page);
//! }
//! ```

mod composer;
mod entry;
mod facets;
mod loader;

pub use composer::{ComposerSettings, FeedComposer, FeedError, PageRequest, PAGE_SIZE};
pub use entry::{format_date, FeedEntry, DEFAULT_EXCERPT_LENGTH};
pub use facets::{
    filter_by_facet, is_visible, top_facets, Facet, FacetRules, TagFacet,
    DEFAULT_PRIORITY_CATEGORY, DEFAULT_TOP_FACET_LIMIT,
};
pub use loader::{fetch_page, FeedLoader};
