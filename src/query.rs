//! Query lifecycle and polling scheduler.
//!
//! A [`Query`] binds one [`Endpoint`] to a [`BodySpec`] and owns the full
//! request lifecycle: it fetches once at construction, optionally repeats on
//! a timer, reacts to changes of a reactive body, and publishes its
//! loading/error/response state through a watch channel.
//!
//! # Design Pattern: Serialized Fetches
//!
//! Within one query, fetch attempts never overlap. Every trigger (timer
//! tick, `resume`, body change, manual `fetch`) queues behind a per-query
//! async mutex, so responses always apply in trigger order and a slow
//! request can never be overwritten by an older one racing it.
//!
//! Per-request failures never escape: they are stored in the snapshot and
//! logged, and the polling loop keeps re-arming across them. Only
//! configuration errors ([`ConfigError`]) are surfaced as `Err` at
//! construction time.
//!
//! # Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use std::time::Duration;
//!
//! use repoll::endpoint::Endpoint;
//! use repoll::http::Executor;
//! use repoll::query::{Query, QueryId, QueryOptions};
//! use reqwest::Method;
//! use serde_json::json;
//!
//! # async fn run() -> Result<(), repoll::query::ConfigError> {
//! let executor = Arc::new(Executor::new("https://api.example.com".parse().unwrap()));
//!
//! let query = Query::new(
//!     QueryId(0),
//!     Endpoint::new(Method::POST, "/jobs/search/"),
//!     executor,
//!     QueryOptions::new()
//!         .poll_every(Duration::from_secs(5))
//!         .body(json!({"status": "running"})),
//! )?;
//!
//! let mut updates = query.subscribe();
//! while updates.changed().await.is_ok() {
//!     let snapshot = updates.borrow().clone();
//!     println!("loading={} error={:?}", snapshot.loading, snapshot.error);
//! }
//! # Ok(())
//! # }
//! ```

use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex as StdMutex};
use std::time::Duration;

use futures::StreamExt;
use serde_json::Value;
use thiserror::Error;
use tokio::sync::{watch, Mutex};
use tokio::time::sleep;
use tokio_stream::wrappers::WatchStream;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::body::BodySpec;
use crate::endpoint::Endpoint;
use crate::handle::Handle;
use crate::http::{Executor, FetchError, Payload};

/// Minimum polling granularity. Intervals below this (other than zero,
/// which means one-shot) are rejected at construction.
pub const MIN_POLL_INTERVAL: Duration = Duration::from_secs(1);

/// Error type for query construction and registration.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// The requested operation name is not in the endpoint table.
    #[error("unknown endpoint `{0}`")]
    UnknownEndpoint(String),

    /// The poll interval is neither zero nor at least [`MIN_POLL_INTERVAL`].
    #[error("poll interval must be zero or at least 1s, got {0:?}")]
    IntervalTooShort(Duration),
}

/// Validates that `interval` is zero (one-shot) or at least the minimum
/// polling granularity.
pub(crate) fn validate_poll_interval(interval: Duration) -> Result<(), ConfigError> {
    if interval.is_zero() || interval >= MIN_POLL_INTERVAL {
        Ok(())
    } else {
        Err(ConfigError::IntervalTooShort(interval))
    }
}

/// Identifier assigned to a query at creation.
///
/// Allocated from a strictly monotonic per-registry counter; ids are never
/// reused within a registry's lifetime, even after removals.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct QueryId(pub u64);

impl fmt::Display for QueryId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "query#{}", self.0)
    }
}

/// Options for constructing a query.
///
/// # Example
///
/// ```rust
/// use std::time::Duration;
/// use repoll::query::QueryOptions;
/// use serde_json::json;
///
/// let options = QueryOptions::new()
///     .poll_every(Duration::from_secs(30))
///     .body(json!({"page": 1}))
///     .paused();
/// ```
#[derive(Debug, Clone, Default)]
pub struct QueryOptions {
    /// Zero for a one-shot query, otherwise at least [`MIN_POLL_INTERVAL`].
    pub poll_interval: Duration,
    /// The request body source. Defaults to an empty object.
    pub body: BodySpec,
    /// Start with fetching suspended.
    pub paused: bool,
}

impl QueryOptions {
    /// Options for a one-shot query with an empty body.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Repeat the fetch at the given interval.
    #[must_use]
    pub const fn poll_every(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    /// Set the request body source.
    #[must_use]
    pub fn body(mut self, body: impl Into<BodySpec>) -> Self {
        self.body = body.into();
        self
    }

    /// Start paused: the polling loop arms but skips fetches until
    /// [`Query::resume`] is called.
    ///
    /// Only polling and body-change fetches are suppressed; a one-shot
    /// query still performs its single construction fetch.
    #[must_use]
    pub const fn paused(mut self) -> Self {
        self.paused = true;
        self
    }
}

/// Observable state of a query.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct QuerySnapshot {
    /// `true` exactly while a fetch attempt is pending.
    pub loading: bool,
    /// The last fetch's error, or `None` if it succeeded.
    pub error: Option<FetchError>,
    /// The last successful payload. A failed fetch leaves this untouched.
    pub response: Option<Payload>,
}

impl QuerySnapshot {
    /// Returns `true` if a fetch is currently pending.
    #[must_use]
    pub const fn is_loading(&self) -> bool {
        self.loading
    }

    /// Returns `true` if the last completed fetch failed.
    #[must_use]
    pub const fn is_error(&self) -> bool {
        self.error.is_some()
    }

    /// The last successful JSON payload, if any.
    #[must_use]
    pub fn response_json(&self) -> Option<&Value> {
        self.response.as_ref().and_then(Payload::json)
    }
}

/// One endpoint binding with its body source, timer state, and last
/// loading/error/response snapshot.
///
/// Constructed behind an [`Arc`]; all control methods take `&self` so the
/// query can be driven from its own background tasks as well as the caller.
pub struct Query {
    id: QueryId,
    endpoint: Endpoint,
    executor: Arc<Executor>,
    poll_interval: Duration,
    paused: AtomicBool,
    snapshot_tx: watch::Sender<QuerySnapshot>,
    // Serializes fetch attempts; see the module docs.
    fetch_gate: Mutex<()>,
    body: StdMutex<BodySpec>,
    timer: StdMutex<Option<Handle>>,
    body_watch: StdMutex<Option<Handle>>,
}

impl Query {
    /// Create a query and start its lifecycle.
    ///
    /// Validates the poll interval, wires the body source, then performs one
    /// immediate fetch; polling queries instead arm the polling loop, whose
    /// first iteration fetches unless the query starts paused.
    ///
    /// # Errors
    ///
    /// [`ConfigError::IntervalTooShort`] if the interval is between zero and
    /// [`MIN_POLL_INTERVAL`] exclusive.
    pub fn new(
        id: QueryId,
        endpoint: Endpoint,
        executor: Arc<Executor>,
        options: QueryOptions,
    ) -> Result<Arc<Self>, ConfigError> {
        validate_poll_interval(options.poll_interval)?;

        let (snapshot_tx, _) = watch::channel(QuerySnapshot::default());
        let query = Arc::new(Self {
            id,
            endpoint,
            executor,
            poll_interval: options.poll_interval,
            paused: AtomicBool::new(options.paused),
            snapshot_tx,
            fetch_gate: Mutex::new(()),
            body: StdMutex::new(BodySpec::default()),
            timer: StdMutex::new(None),
            body_watch: StdMutex::new(None),
        });

        query.set_body(options.body);

        if query.is_polling() {
            query.start_polling();
        } else {
            query.spawn_fetch();
        }

        Ok(query)
    }

    /// The id assigned at creation.
    #[must_use]
    pub const fn id(&self) -> QueryId {
        self.id
    }

    /// The endpoint this query is bound to.
    #[must_use]
    pub const fn endpoint(&self) -> &Endpoint {
        &self.endpoint
    }

    /// Returns `true` for queries with a nonzero poll interval.
    #[must_use]
    pub fn is_polling(&self) -> bool {
        !self.poll_interval.is_zero()
    }

    /// Returns `true` while fetching is suspended by [`Query::pause`].
    #[must_use]
    pub fn is_paused(&self) -> bool {
        self.paused.load(Ordering::SeqCst)
    }

    /// Returns `true` while the polling timer is armed.
    #[must_use]
    pub fn is_armed(&self) -> bool {
        self.timer_slot().is_some()
    }

    /// The current state snapshot.
    #[must_use]
    pub fn snapshot(&self) -> QuerySnapshot {
        self.snapshot_tx.borrow().clone()
    }

    /// Subscribe to state changes.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<QuerySnapshot> {
        self.snapshot_tx.subscribe()
    }

    /// Perform one fetch attempt against the current resolved body.
    ///
    /// Sets `loading` and clears `error` while the request is pending. On
    /// success the payload replaces `response`; on failure the error is
    /// stored and logged and `response` keeps its previous value. `loading`
    /// is cleared on completion either way.
    pub async fn fetch(&self) {
        let _gate = self.fetch_gate.lock().await;

        self.snapshot_tx.send_modify(|s| {
            s.loading = true;
            s.error = None;
        });

        let body = self.body_spec().resolve();
        match self.executor.execute(&self.endpoint, &body).await {
            Ok(payload) => {
                self.snapshot_tx.send_modify(|s| {
                    s.loading = false;
                    s.response = Some(payload);
                });
            }
            Err(error) => {
                warn!(query = %self.id, %error, "fetch failed");
                self.snapshot_tx.send_modify(|s| {
                    s.loading = false;
                    s.error = Some(error);
                });
            }
        }
    }

    /// Arm the polling loop, cancelling any previous timer first.
    ///
    /// No-op for one-shot queries. The loop fetches (unless paused), awaits
    /// completion, then re-arms after the poll interval. Re-arming happens
    /// even while paused so a later [`Query::resume`] is picked up on the
    /// next tick without an external nudge. There is never more than one
    /// timer per query.
    pub fn start_polling(self: &Arc<Self>) {
        if !self.is_polling() {
            return;
        }

        debug!(query = %self.id, interval = ?self.poll_interval, "polling armed");

        let token = CancellationToken::new();
        let loop_token = token.clone();
        let query = Arc::clone(self);

        // Swap under one lock so concurrent restarts cannot leak a loop.
        let mut slot = self.timer_slot();
        if let Some(previous) = slot.take() {
            previous.cancel();
        }
        let join = tokio::spawn(async move {
            loop {
                if !query.is_paused() {
                    query.fetch().await;
                }
                tokio::select! {
                    () = loop_token.cancelled() => break,
                    () = sleep(query.poll_interval) => {}
                }
            }
        });
        *slot = Some(Handle::new(token, join));
    }

    /// Cancel the pending timer, if any. Idempotent.
    ///
    /// Does not abort a request already in flight; its result still lands,
    /// in order, behind the fetch gate.
    pub fn stop_polling(&self) {
        if let Some(handle) = self.timer_slot().take() {
            debug!(query = %self.id, "polling stopped");
            handle.cancel();
        }
    }

    /// Suspend fetching. The armed timer keeps re-arming but skips its
    /// ticks' fetches until resumed.
    pub fn pause(&self) {
        self.paused.store(true, Ordering::SeqCst);
    }

    /// Resume fetching and trigger one immediate fetch, without waiting for
    /// the next timer tick.
    pub fn resume(self: &Arc<Self>) {
        self.paused.store(false, Ordering::SeqCst);
        self.spawn_fetch();
    }

    /// Replace the body source.
    ///
    /// Any previous subscription to a reactive body is cancelled first, so a
    /// discarded source can never trigger fetches again. If the new body is
    /// reactive, each change restarts the polling loop (the next tick sees
    /// the fresh body and the interval realigns) or, for one-shot queries,
    /// triggers an immediate fetch unless paused.
    pub fn set_body(self: &Arc<Self>, body: impl Into<BodySpec>) {
        let body = body.into();
        let changes = body.watch();

        // Swap under one lock so concurrent reassignments cannot leave a
        // cancelled-but-unstored watcher running.
        let mut slot = self.body_watch_slot();
        if let Some(previous) = slot.take() {
            previous.cancel();
        }
        *self.body_slot() = body;

        *slot = changes.map(|rx| {
            let token = CancellationToken::new();
            let task_token = token.clone();
            let query = Arc::clone(self);
            let join = tokio::spawn(async move {
                // from_changes skips the current value; only future writes count.
                let mut changes = WatchStream::from_changes(rx);
                loop {
                    tokio::select! {
                        () = task_token.cancelled() => break,
                        next = changes.next() => match next {
                            Some(_) => query.on_body_change(),
                            // Sender dropped; nothing further to react to.
                            None => break,
                        },
                    }
                }
            });
            Handle::new(token, join)
        });
    }

    /// Stop the timer and the body watcher, waiting for both tasks to exit.
    pub async fn shutdown(&self) {
        let timer = self.timer_slot().take();
        if let Some(handle) = timer {
            handle.shutdown().await;
        }
        let body_watch = self.body_watch_slot().take();
        if let Some(handle) = body_watch {
            handle.shutdown().await;
        }
    }

    fn on_body_change(self: &Arc<Self>) {
        debug!(query = %self.id, "body changed");
        if self.is_polling() {
            self.start_polling();
        } else if !self.is_paused() {
            self.spawn_fetch();
        }
    }

    fn spawn_fetch(self: &Arc<Self>) {
        let query = Arc::clone(self);
        tokio::spawn(async move {
            query.fetch().await;
        });
    }

    fn body_spec(&self) -> BodySpec {
        self.body_slot().clone()
    }

    fn body_slot(&self) -> std::sync::MutexGuard<'_, BodySpec> {
        self.body.lock().expect("body lock poisoned")
    }

    fn timer_slot(&self) -> std::sync::MutexGuard<'_, Option<Handle>> {
        self.timer.lock().expect("timer lock poisoned")
    }

    fn body_watch_slot(&self) -> std::sync::MutexGuard<'_, Option<Handle>> {
        self.body_watch.lock().expect("body watch lock poisoned")
    }
}

impl fmt::Debug for Query {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Query")
            .field("id", &self.id)
            .field("endpoint", &self.endpoint)
            .field("poll_interval", &self.poll_interval)
            .field("paused", &self.is_paused())
            .finish_non_exhaustive()
    }
}
