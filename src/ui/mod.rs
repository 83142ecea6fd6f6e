//! Terminal User Interface module.
//!
//! # Module Structure
//!
//! - `loop_runner` - Main event loop and terminal management
//! - `input` - Keyboard input handling
//! - `events` - Background task event processing
//! - `helpers` - Background task spawning
//! - `render` - View rendering dispatch
//! - `tabs` - Facet tab bar
//! - `posts` - Post list widget
//! - `reader` - Post reader widget
//! - `status` - Status bar widget

mod events;
mod helpers;
mod input;
mod loop_runner;
mod posts;
pub mod reader;
mod render;
mod status;
mod tabs;

pub use loop_runner::{run, Action};
