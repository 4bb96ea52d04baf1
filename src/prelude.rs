//! Prelude module for convenient imports.
//!
//! ```
//! use repoll::prelude::*;
//! ```
//!
//! # What's included
//!
//! - [`Endpoint`] / [`EndpointTable`] - named HTTP operation descriptors
//! - [`Executor`] - one-shot HTTP execution against a base URL
//! - [`BodySpec`] - static, producer, or reactive request bodies
//! - [`Query`] and friends - the query lifecycle
//! - [`Registry`] - bulk control and teardown of polling queries
//! - [`VisibilityMonitor`] - foreground/background suspension

pub use crate::body::BodySpec;
pub use crate::endpoint::{Endpoint, EndpointTable};
pub use crate::http::{Executor, FetchError, Payload};
pub use crate::query::{ConfigError, Query, QueryId, QueryOptions, QuerySnapshot};
pub use crate::registry::Registry;
pub use crate::visibility::VisibilityMonitor;
