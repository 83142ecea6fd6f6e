use futures::Stream;
use std::pin::Pin;
use std::task::{Context, Poll};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use super::types::{Snapshot, StoreError};

/// Snapshots buffered between the delivery task and the consumer.
///
/// Each snapshot is the complete collection, so a slow consumer only ever
/// needs the latest few.
pub(crate) const SNAPSHOT_BUFFER: usize = 4;

/// Handle to a live collection subscription.
///
/// Owns the delivery task. Dropping the handle (or calling [`close`]) aborts
/// the task, so no delivery can reach a consumer that has gone away.
///
/// [`close`]: Subscription::close
pub struct Subscription {
    rx: mpsc::Receiver<Result<Snapshot, StoreError>>,
    task: Option<JoinHandle<()>>,
}

impl Subscription {
    pub(crate) fn new(rx: mpsc::Receiver<Result<Snapshot, StoreError>>, task: JoinHandle<()>) -> Self {
        Self {
            rx,
            task: Some(task),
        }
    }

    /// Wait for the next snapshot.
    ///
    /// Returns `None` once the subscription has been closed and every
    /// buffered snapshot consumed.
    pub async fn next(&mut self) -> Option<Result<Snapshot, StoreError>> {
        self.rx.recv().await
    }

    /// Tear the subscription down. Buffered snapshots are discarded.
    pub fn close(mut self) {
        self.shutdown();
    }

    fn shutdown(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
            tracing::debug!("Subscription delivery task aborted");
        }
        self.rx.close();
    }
}

impl Stream for Subscription {
    type Item = Result<Snapshot, StoreError>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.rx.poll_recv(cx)
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.shutdown();
    }
}
