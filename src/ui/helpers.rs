//! Background task spawning for the UI.
//!
//! Every task reports back through the `AppEvent` channel; no task touches
//! `App` directly. Panics are caught and reported as `TaskPanicked`.

use crate::app::{App, AppEvent};
use crate::feed::{fetch_page, PageRequest};
use futures::FutureExt;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use tokio::sync::mpsc;

/// Wraps a future to catch panics and convert them to errors.
///
/// # Returns
///
/// - `Ok(result)` if the future completes normally
/// - `Err(panic_message)` if the future panics
pub(super) async fn catch_task_panic<F, T>(future: F) -> Result<T, String>
where
    F: std::future::Future<Output = T>,
{
    AssertUnwindSafe(future)
        .catch_unwind()
        .await
        .map_err(|panic| {
            if let Some(s) = panic.downcast_ref::<&'static str>() {
                s.to_string()
            } else if let Some(s) = panic.downcast_ref::<String>() {
                s.clone()
            } else {
                format!("Unknown panic: {:?}", (*panic).type_id())
            }
        })
}

async fn report_panic(tx: &mpsc::Sender<AppEvent>, task: &'static str, error: String) {
    tracing::error!(task, error = %error, "Background task panicked");
    let _ = tx.send(AppEvent::TaskPanicked { task, error }).await;
}

/// Subscribe to the post collection and forward every snapshot.
///
/// The spawned task owns the subscription; aborting the task drops it,
/// which stops delivery at the store.
pub(super) fn spawn_subscription(app: &mut App, tx: &mpsc::Sender<AppEvent>) {
    if let Some(handle) = app.subscription_handle.take() {
        handle.abort();
    }

    let documents = Arc::clone(&app.documents);
    let path = app.posts_path.clone();
    let tx = tx.clone();

    app.subscription_handle = Some(tokio::spawn(async move {
        let tx_panic = tx.clone();
        let outcome = catch_task_panic(async {
            let mut subscription = match documents.subscribe(&path).await {
                Ok(s) => s,
                Err(e) => {
                    let _ = tx.send(AppEvent::Snapshot(Err(e))).await;
                    return;
                }
            };

            while let Some(snapshot) = subscription.next().await {
                if tx.send(AppEvent::Snapshot(snapshot)).await.is_err() {
                    tracing::debug!("Event channel closed, ending subscription");
                    return;
                }
            }
            let _ = tx.send(AppEvent::SubscriptionEnded).await;
        })
        .await;

        if let Err(panic_msg) = outcome {
            report_panic(&tx_panic, "subscription", panic_msg).await;
        }
    }));
}

/// Run a composer page request in the background.
///
/// Fetches are never cancelled; the composer discards results that arrive
/// after a facet switch.
pub(super) fn spawn_page_fetch(app: &App, request: PageRequest, tx: &mpsc::Sender<AppEvent>) {
    let documents = Arc::clone(&app.documents);
    let path = app.posts_path.clone();
    let tx = tx.clone();

    tracing::debug!(request = request.id, facet = %request.facet, "Spawning page fetch");

    tokio::spawn(async move {
        let tx_panic = tx.clone();
        let outcome = catch_task_panic(async {
            let result = fetch_page(documents.as_ref(), &path, &request).await;
            if let Err(e) = tx.send(AppEvent::PageLoaded { request, result }).await {
                tracing::warn!(error = %e, event = "PageLoaded", "Channel send failed (receiver dropped)");
            }
        })
        .await;

        if let Err(panic_msg) = outcome {
            report_panic(&tx_panic, "page_fetch", panic_msg).await;
        }
    });
}

/// Spawn the fetch for `request`, if the composer issued one.
pub(super) fn dispatch(app: &App, request: Option<PageRequest>, tx: &mpsc::Sender<AppEvent>) {
    if let Some(request) = request {
        spawn_page_fetch(app, request, tx);
    }
}

/// Count a view of `post_id` in the background.
pub(super) fn spawn_record_view(app: &App, post_id: String, tx: &mpsc::Sender<AppEvent>) {
    let store = Arc::clone(&app.store);
    let path = app.posts_path.clone();
    let tx = tx.clone();

    tokio::spawn(async move {
        let tx_panic = tx.clone();
        let outcome = catch_task_panic(async {
            let result = store.record_view(&path, &post_id).await;
            let _ = tx.send(AppEvent::ViewRecorded { post_id, result }).await;
        })
        .await;

        if let Err(panic_msg) = outcome {
            report_panic(&tx_panic, "record_view", panic_msg).await;
        }
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_catch_task_panic_passes_value() {
        assert_eq!(catch_task_panic(async { 7 }).await, Ok(7));
    }

    #[tokio::test]
    async fn test_catch_task_panic_reports_message() {
        let result: Result<(), String> = catch_task_panic(async { panic!("boom") }).await;
        assert_eq!(result, Err("boom".to_string()));
    }
}
