use std::sync::Arc;

use super::composer::{FeedComposer, PageRequest};
use super::facets::Facet;
use crate::store::{CollectionPath, DocumentStore, Page, StoreError};

/// Run one page request against the store.
///
/// Shared by the sequential [`FeedLoader`] and the UI's background fetch
/// task, which hands the result back to the composer itself.
pub async fn fetch_page(
    store: &dyn DocumentStore,
    path: &CollectionPath,
    request: &PageRequest,
) -> Result<Page, StoreError> {
    let started = std::time::Instant::now();
    let result = store
        .fetch_page(path, request.after.as_ref(), request.limit)
        .await;

    match &result {
        Ok(page) => tracing::debug!(
            request = request.id,
            path = %path,
            docs = page.docs.len(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Page request completed"
        ),
        Err(e) => tracing::warn!(request = request.id, path = %path, error = %e, "Page fetch failed"),
    }
    result
}

/// Drives a [`FeedComposer`] against a store one request at a time.
///
/// The command-line front end uses this; each operation completes its page
/// read before returning, so no result is ever stale. It reads a single
/// snapshot of the collection and does not follow later changes.
pub struct FeedLoader {
    store: Arc<dyn DocumentStore>,
    path: CollectionPath,
    composer: FeedComposer,
}

impl FeedLoader {
    pub fn new(store: Arc<dyn DocumentStore>, path: CollectionPath, composer: FeedComposer) -> Self {
        Self {
            store,
            path,
            composer,
        }
    }

    /// Subscribe to the collection, apply the initial snapshot and load the
    /// first `Latest` page.
    ///
    /// The subscription is closed once the first snapshot is in, so its
    /// delivery task never waits on a reader that is not there.
    pub async fn start(&mut self) -> Result<(), StoreError> {
        let mut subscription = self.store.subscribe(&self.path).await?;
        match subscription.next().await {
            Some(Ok(snapshot)) => self.composer.on_remote_snapshot(snapshot.docs),
            Some(Err(e)) => self.composer.on_snapshot_error(&e),
            None => self.composer.on_snapshot_error(&StoreError::SubscriptionClosed),
        }
        subscription.close();

        let request = self.composer.start();
        self.run(request).await;
        Ok(())
    }

    pub async fn select_facet(&mut self, facet: Facet) {
        let request = self.composer.select_facet(facet);
        self.run(request).await;
    }

    pub async fn load_more(&mut self) {
        let request = self.composer.load_more();
        self.run(request).await;
    }

    pub fn composer(&self) -> &FeedComposer {
        &self.composer
    }

    async fn run(&mut self, request: Option<PageRequest>) {
        if let Some(request) = request {
            let result = fetch_page(self.store.as_ref(), &self.path, &request).await;
            self.composer.apply_page(&request, result);
        }
    }
}
