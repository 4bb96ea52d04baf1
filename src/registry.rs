//! Process-wide coordination of polling queries.
//!
//! The [`Registry`] is the construction entry point for queries and the
//! coordination point for bulk suspend/resume. It is an explicit context
//! object rather than a global: create one per application (or per test)
//! and share it behind an [`Arc`].
//!
//! Only *polling* queries (nonzero interval) are tracked; one-shot queries
//! cannot be bulk-stopped or swept at teardown, so they are never inserted.
//!
//! # Example
//!
//! ```rust,no_run
//! use std::time::Duration;
//!
//! use repoll::endpoint::{Endpoint, EndpointTable};
//! use repoll::http::Executor;
//! use repoll::query::QueryOptions;
//! use repoll::registry::Registry;
//! use reqwest::Method;
//!
//! # async fn run() -> Result<(), repoll::query::ConfigError> {
//! let table = EndpointTable::new()
//!     .define("list-jobs", Endpoint::new(Method::POST, "/jobs/search/"));
//! let registry = Registry::new(
//!     table,
//!     Executor::new("https://api.example.com".parse().unwrap()),
//! );
//!
//! let jobs = registry.query(
//!     "list-jobs",
//!     QueryOptions::new().poll_every(Duration::from_secs(10)),
//! )?;
//!
//! // Suspend and resume every polling query at once.
//! registry.stop_polling();
//! registry.start_polling();
//!
//! // Teardown: cancels the timer and any body subscription.
//! registry.remove(jobs.id()).await;
//! # Ok(())
//! # }
//! ```

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use dashmap::DashMap;
use tracing::debug;

use crate::endpoint::EndpointTable;
use crate::http::Executor;
use crate::query::{validate_poll_interval, ConfigError, Query, QueryId, QueryOptions};

/// Registry of live polling queries, keyed by ascending [`QueryId`].
///
/// Invariant: every entry is a live, still-polling query. Ids come from a
/// monotonic counter and are never reused, so removing one query and adding
/// another can never collide.
#[derive(Debug)]
pub struct Registry {
    table: EndpointTable,
    executor: Arc<Executor>,
    queries: DashMap<QueryId, Arc<Query>>,
    next_id: AtomicU64,
}

impl Registry {
    /// Create a registry over an endpoint table and an executor.
    #[must_use]
    pub fn new(table: EndpointTable, executor: Executor) -> Self {
        Self {
            table,
            executor: Arc::new(executor),
            queries: DashMap::new(),
            next_id: AtomicU64::new(0),
        }
    }

    /// Construct a query against a named endpoint.
    ///
    /// Polling queries are registered for bulk control and teardown;
    /// one-shot queries are returned untracked.
    ///
    /// # Errors
    ///
    /// [`ConfigError::UnknownEndpoint`] if `name` is not in the table, or
    /// [`ConfigError::IntervalTooShort`] for an invalid poll interval. Both
    /// fail before an id is allocated.
    pub fn query(&self, name: &str, options: QueryOptions) -> Result<Arc<Query>, ConfigError> {
        let endpoint = self
            .table
            .get(name)
            .ok_or_else(|| ConfigError::UnknownEndpoint(name.to_string()))?
            .clone();
        validate_poll_interval(options.poll_interval)?;

        let id = QueryId(self.next_id.fetch_add(1, Ordering::Relaxed));
        let query = Query::new(id, endpoint, Arc::clone(&self.executor), options)?;

        if query.is_polling() {
            debug!(query = %id, endpoint = name, "registered polling query");
            self.queries.insert(id, Arc::clone(&query));
        }

        Ok(query)
    }

    /// Re-arm the polling loop of every registered query.
    ///
    /// Each unpaused query fetches immediately and its timer realigns.
    pub fn start_polling(&self) {
        for entry in &self.queries {
            entry.value().start_polling();
        }
    }

    /// Cancel the timer of every registered query.
    pub fn stop_polling(&self) {
        for entry in &self.queries {
            entry.value().stop_polling();
        }
    }

    /// Look up a registered polling query.
    #[must_use]
    pub fn get(&self, id: QueryId) -> Option<Arc<Query>> {
        self.queries.get(&id).map(|entry| Arc::clone(entry.value()))
    }

    /// Tear down one query: remove it from the registry, stop its timer,
    /// and cancel its body subscription. Returns `false` if the id was not
    /// registered.
    pub async fn remove(&self, id: QueryId) -> bool {
        match self.queries.remove(&id) {
            Some((_, query)) => {
                debug!(query = %id, "removed from registry");
                query.shutdown().await;
                true
            }
            None => false,
        }
    }

    /// Tear down every registered query.
    pub async fn shutdown(&self) {
        let ids: Vec<QueryId> = self.queries.iter().map(|entry| *entry.key()).collect();
        for id in ids {
            self.remove(id).await;
        }
    }

    /// Number of registered polling queries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.queries.len()
    }

    /// Returns `true` if no polling queries are registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.queries.is_empty()
    }
}
