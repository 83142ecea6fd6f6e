use chrono::DateTime;
use std::sync::Arc;

use crate::store::Post;
use crate::util::excerpt;

/// Default excerpt length in characters.
pub const DEFAULT_EXCERPT_LENGTH: usize = 70;

/// A post decorated for display. Never persisted.
#[derive(Debug, Clone)]
pub struct FeedEntry {
    pub post: Arc<Post>,
    /// Subtitle, or a plain-text excerpt of the body
    pub excerpt: String,
    /// Creation date as `MON D`, e.g. `JUN 5`
    pub date: String,
}

impl FeedEntry {
    pub fn new(post: Arc<Post>, excerpt_length: usize) -> Self {
        let excerpt = match post.subtitle.as_deref() {
            Some(subtitle) if !subtitle.trim().is_empty() => subtitle.to_string(),
            _ => excerpt(&post.content, excerpt_length),
        };
        let date = format_date(post.created_at);
        Self {
            post,
            excerpt,
            date,
        }
    }
}

/// Format a Unix-millisecond timestamp as an uppercase short date (UTC).
pub fn format_date(millis: i64) -> String {
    DateTime::from_timestamp_millis(millis)
        .map(|dt| dt.format("%b %-d").to_string().to_uppercase())
        .unwrap_or_default()
}
