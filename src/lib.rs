//! # repoll - Polling HTTP Query Layer
//!
//! repoll is a client-side query layer over a REST API: it issues HTTP
//! requests against a table of named endpoints, optionally repeats them on
//! a timer, reacts to changes in their request body, and suspends/resumes
//! all polling together when the host goes to the background.
//!
//! ## Architecture
//!
//! 1. **Endpoint table**: named `{method, URL template, interpolation flag}`
//!    descriptors - plain data supplied by the host
//! 2. **Executor**: one request/response cycle, status classified as
//!    200 -> JSON payload, 204 -> empty success, anything else -> error
//! 3. **Body source**: static value, producer closure, or reactive cell;
//!    reactive changes drive refetching
//! 4. **Query**: the unit of work - one endpoint binding, its body, its
//!    timer, and an observable loading/error/response snapshot
//! 5. **Registry**: explicit context tracking every polling query for bulk
//!    suspend/resume and teardown
//! 6. **Visibility monitor**: foreground/background state machine flipping
//!    registry-wide polling from a boolean `hidden` cell
//!
//! Per-request failures are captured into query state and logged, never
//! thrown: a failed tick does not stop the timer from re-arming. Only
//! configuration errors (unknown endpoint, invalid interval) surface as
//! `Err` at construction time.
//!
//! ## Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use std::time::Duration;
//!
//! use repoll::prelude::*;
//! use repoll::visibility::visibility_cell;
//! use reqwest::Method;
//! use serde_json::json;
//!
//! # async fn run() -> Result<(), repoll::query::ConfigError> {
//! let table = EndpointTable::new()
//!     .define("list-jobs", Endpoint::new(Method::POST, "/jobs/search/"))
//!     .define("job-detail", Endpoint::interpolated(Method::GET, "/jobs/{id}/"));
//!
//! let registry = Arc::new(Registry::new(
//!     table,
//!     Executor::new("https://api.example.com".parse().unwrap()),
//! ));
//!
//! // Poll the job list every ten seconds.
//! let jobs = registry.query(
//!     "list-jobs",
//!     QueryOptions::new()
//!         .poll_every(Duration::from_secs(10))
//!         .body(json!({"status": "running"})),
//! )?;
//!
//! // One-shot lookup with a path parameter pulled from the body.
//! let _detail = registry.query(
//!     "job-detail",
//!     QueryOptions::new().body(json!({"id": "42"})),
//! )?;
//!
//! // Wire polling to the host's visibility signal.
//! let (hidden_tx, hidden_rx) = visibility_cell(false);
//! let monitor = VisibilityMonitor::spawn(Arc::clone(&registry), hidden_rx);
//!
//! let mut updates = jobs.subscribe();
//! while updates.changed().await.is_ok() {
//!     if let Some(payload) = updates.borrow().response_json() {
//!         println!("jobs: {payload}");
//!     }
//! }
//!
//! monitor.shutdown().await;
//! registry.shutdown().await;
//! # Ok(())
//! # }
//! ```

pub mod body;
pub mod endpoint;
pub mod handle;
pub mod http;
pub mod prelude;
pub mod query;
pub mod registry;
pub mod visibility;
