//! Application event handling.
//!
//! Background task results (snapshots, pages, view counts) are applied to
//! `App` here, on the event loop, in arrival order.

use crate::app::{App, AppEvent};

/// Handle application events from background tasks.
pub(super) fn handle_app_event(app: &mut App, event: AppEvent) {
    match event {
        AppEvent::Snapshot(Ok(snapshot)) => {
            tracing::debug!(
                revision = snapshot.revision,
                docs = snapshot.docs.len(),
                "Snapshot received"
            );
            app.composer.on_remote_snapshot(snapshot.docs);
            app.clamp_selection();
        }
        AppEvent::Snapshot(Err(e)) => {
            app.composer.on_snapshot_error(&e);
        }
        AppEvent::SubscriptionEnded => {
            tracing::warn!("Live updates stopped");
            app.set_status("Live updates stopped");
        }
        AppEvent::PageLoaded { request, result } => {
            if app.composer.apply_page(&request, result) {
                app.clamp_selection();
            }
        }
        AppEvent::ViewRecorded { post_id, result } => match result {
            Ok(views) => {
                let current = app.reader_post.as_ref().is_some_and(|p| p.id == post_id);
                if current {
                    app.reader_views = Some(views);
                }
            }
            Err(e) => {
                tracing::warn!(post_id = %post_id, error = %e, "Failed to record view");
            }
        },
        AppEvent::TaskPanicked { task, error } => {
            tracing::error!(task, error = %error, "Background task panicked");
            app.set_status(format!("Internal error in {} task", task));
        }
    }
}
