//! Text helpers shared by the feed and the terminal UI.
//!
//! - **HTML**: plain-text conversion and excerpts of post bodies
//! - **Terminal**: width-aware truncation and control-character stripping
//!
//! ```
//! use quire::util::{excerpt, truncate_to_width};
//!
//! assert_eq!(excerpt("<p>Hello <em>there</em></p>", 70), "Hello there");
//! assert_eq!(truncate_to_width("Long post title", 10), "Long po...");
//! ```

mod text;

pub use text::{excerpt, html_to_text, strip_control_chars, truncate_to_width};
