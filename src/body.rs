//! Request body sources.
//!
//! A query's body can come from three places: a plain value, a zero-argument
//! producer invoked fresh on every read, or a reactive cell whose changes
//! trigger refetching. [`BodySpec`] makes the three cases an explicit tagged
//! variant so each is handled exhaustively rather than sniffed at runtime.

use std::fmt;
use std::sync::Arc;

use serde_json::{Map, Value};
use tokio::sync::watch;

/// The source of a query's request payload.
#[derive(Clone)]
pub enum BodySpec {
    /// A fixed value, used as-is on every fetch.
    Static(Value),
    /// A producer invoked on every body read; never memoized, so each fetch
    /// sees the latest computed value.
    Producer(Arc<dyn Fn() -> Value + Send + Sync>),
    /// A reactive cell. The current value is read on demand; change
    /// notifications make the owning query refetch.
    Reactive(watch::Receiver<Value>),
}

impl BodySpec {
    /// A producer body from a closure.
    pub fn producer<F>(f: F) -> Self
    where
        F: Fn() -> Value + Send + Sync + 'static,
    {
        Self::Producer(Arc::new(f))
    }

    /// Resolve the current body value.
    #[must_use]
    pub fn resolve(&self) -> Value {
        match self {
            Self::Static(value) => value.clone(),
            Self::Producer(f) => f(),
            Self::Reactive(rx) => rx.borrow().clone(),
        }
    }

    /// The change receiver, for reactive bodies only.
    #[must_use]
    pub fn watch(&self) -> Option<watch::Receiver<Value>> {
        match self {
            Self::Reactive(rx) => Some(rx.clone()),
            _ => None,
        }
    }
}

impl Default for BodySpec {
    /// An empty JSON object.
    fn default() -> Self {
        Self::Static(Value::Object(Map::new()))
    }
}

impl fmt::Debug for BodySpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Static(value) => f.debug_tuple("Static").field(value).finish(),
            Self::Producer(_) => f.write_str("Producer(..)"),
            Self::Reactive(_) => f.write_str("Reactive(..)"),
        }
    }
}

impl From<Value> for BodySpec {
    fn from(value: Value) -> Self {
        Self::Static(value)
    }
}

impl From<watch::Receiver<Value>> for BodySpec {
    fn from(rx: watch::Receiver<Value>) -> Self {
        Self::Reactive(rx)
    }
}
