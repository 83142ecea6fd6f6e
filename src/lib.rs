//! quire: a terminal front end for a single-author blog.
//!
//! - [`store`] - document store trait and the SQLite implementation
//! - [`feed`] - facets, the feed composer and its loader
//! - [`config`] / [`context`] - configuration and the session built from it
//! - [`app`] / [`ui`] - terminal UI state and rendering

pub mod app;
pub mod config;
pub mod context;
pub mod feed;
pub mod store;
pub mod theme;
pub mod ui;
pub mod util;
