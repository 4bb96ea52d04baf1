//! Cancellable handles for background tasks.
//!
//! Every long-lived task in this crate (a query's polling loop, a reactive
//! body watcher, the visibility monitor) is owned through a [`Handle`] that
//! pairs a cancellation token with the task's join handle.

use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

/// Handle for a running background task.
#[derive(Debug)]
pub struct Handle {
    token: CancellationToken,
    join: JoinHandle<()>,
}

impl Handle {
    pub fn new(token: CancellationToken, join: JoinHandle<()>) -> Self {
        Self { token, join }
    }

    /// Signal cancellation without waiting for the task to exit.
    ///
    /// The task observes the token at its next suspension point. An HTTP
    /// request already in flight is not aborted.
    pub fn cancel(&self) {
        self.token.cancel();
    }

    /// Cancel the task and wait for it to finish.
    pub async fn shutdown(self) {
        self.token.cancel();
        let _ = self.join.await;
    }
}
