//! Foreground/background suspension of registry-wide polling.
//!
//! The host environment owns the actual visibility signal (for a browser
//! host that is the page visibility API, for anything else whatever "am I
//! in the background" means there); this module only consumes a boolean
//! `hidden` cell. The [`VisibilityMonitor`] is a two-state machine: a
//! transition to Background stops every registered polling query, a
//! transition back to Foreground re-arms them all, which immediately
//! re-fetches each unpaused query. Redundant notifications that do not
//! change the state are ignored.

use std::sync::Arc;

use tokio::sync::watch;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::handle::Handle;
use crate::registry::Registry;

/// Create the `hidden` cell a [`VisibilityMonitor`] consumes.
///
/// The host keeps the sender and writes `true` when the page goes to the
/// background, `false` when it returns.
#[must_use]
pub fn visibility_cell(initially_hidden: bool) -> (watch::Sender<bool>, watch::Receiver<bool>) {
    watch::channel(initially_hidden)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Visibility {
    Foreground,
    Background,
}

impl Visibility {
    const fn from_hidden(hidden: bool) -> Self {
        if hidden {
            Self::Background
        } else {
            Self::Foreground
        }
    }
}

/// Drives registry-wide polling from a boolean `hidden` signal.
///
/// # Example
///
/// ```rust,no_run
/// use std::sync::Arc;
///
/// use repoll::endpoint::EndpointTable;
/// use repoll::http::Executor;
/// use repoll::registry::Registry;
/// use repoll::visibility::{visibility_cell, VisibilityMonitor};
///
/// # async fn run() {
/// let registry = Arc::new(Registry::new(
///     EndpointTable::new(),
///     Executor::new("https://api.example.com".parse().unwrap()),
/// ));
///
/// let (hidden_tx, hidden_rx) = visibility_cell(false);
/// let monitor = VisibilityMonitor::spawn(registry, hidden_rx);
///
/// // Host signals a background transition: all polling stops.
/// hidden_tx.send(true).ok();
/// // Back to the foreground: every unpaused query re-fetches and rearms.
/// hidden_tx.send(false).ok();
///
/// monitor.shutdown().await;
/// # }
/// ```
#[derive(Debug)]
pub struct VisibilityMonitor {
    handle: Handle,
}

impl VisibilityMonitor {
    /// Start monitoring. If the signal starts out hidden, polling is
    /// suspended immediately.
    #[must_use]
    pub fn spawn(registry: Arc<Registry>, hidden: watch::Receiver<bool>) -> Self {
        let token = CancellationToken::new();
        let task_token = token.clone();
        let join = tokio::spawn(async move {
            Self::run(registry, hidden, task_token).await;
        });

        Self {
            handle: Handle::new(token, join),
        }
    }

    async fn run(
        registry: Arc<Registry>,
        mut hidden: watch::Receiver<bool>,
        token: CancellationToken,
    ) {
        let mut state = Visibility::from_hidden(*hidden.borrow_and_update());
        if state == Visibility::Background {
            debug!("starting in background; polling suspended");
            registry.stop_polling();
        }

        loop {
            tokio::select! {
                () = token.cancelled() => break,
                changed = hidden.changed() => {
                    // Sender dropped means the host went away; stop monitoring.
                    if changed.is_err() {
                        break;
                    }

                    let next = Visibility::from_hidden(*hidden.borrow_and_update());
                    if next == state {
                        continue;
                    }
                    state = next;

                    match state {
                        Visibility::Background => {
                            debug!("page hidden; suspending polling");
                            registry.stop_polling();
                        }
                        Visibility::Foreground => {
                            debug!("page visible; resuming polling");
                            registry.start_polling();
                        }
                    }
                }
            }
        }
    }

    /// Stop the monitor. Queries keep whatever polling state they were in.
    pub async fn shutdown(self) {
        self.handle.shutdown().await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    use reqwest::Method;
    use tokio::time::{sleep, timeout};
    use url::Url;

    use crate::endpoint::{Endpoint, EndpointTable};
    use crate::http::Executor;
    use crate::query::QueryOptions;

    fn test_registry() -> Arc<Registry> {
        let table =
            EndpointTable::new().define("list", Endpoint::new(Method::POST, "/jobs/search/"));
        Arc::new(Registry::new(
            table,
            Executor::new(Url::parse("http://127.0.0.1:9/").unwrap()),
        ))
    }

    #[test]
    fn test_visibility_from_hidden() {
        assert_eq!(Visibility::from_hidden(true), Visibility::Background);
        assert_eq!(Visibility::from_hidden(false), Visibility::Foreground);
    }

    #[tokio::test]
    async fn test_monitor_shutdown() {
        let registry = test_registry();
        let (_tx, rx) = visibility_cell(false);
        let monitor = VisibilityMonitor::spawn(registry, rx);

        let result = timeout(Duration::from_secs(1), monitor.shutdown()).await;
        assert!(result.is_ok());
    }

    #[tokio::test]
    async fn test_monitor_exits_when_host_drops_signal() {
        let registry = test_registry();
        let (tx, rx) = visibility_cell(false);
        let monitor = VisibilityMonitor::spawn(registry, rx);

        drop(tx);
        let result = timeout(Duration::from_secs(1), monitor.handle.shutdown()).await;
        assert!(result.is_ok());
    }

    #[tokio::test]
    async fn test_initially_hidden_suspends_polling() {
        let registry = test_registry();
        let query = registry
            .query(
                "list",
                QueryOptions::new()
                    .poll_every(Duration::from_secs(1))
                    .paused(),
            )
            .unwrap();

        assert!(query.is_armed());

        let (tx, rx) = visibility_cell(true);
        let monitor = VisibilityMonitor::spawn(Arc::clone(&registry), rx);

        // Give the monitor a moment to run its initial transition.
        sleep(Duration::from_millis(50)).await;
        assert!(!query.is_armed());

        tx.send(false).unwrap();
        sleep(Duration::from_millis(50)).await;
        assert!(query.is_armed());

        monitor.shutdown().await;
        registry.shutdown().await;
    }
}
