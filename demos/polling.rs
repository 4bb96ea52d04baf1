//! Polling demo against the JSONPlaceholder API.
//!
//! This example shows:
//! - An endpoint table with a plain and an interpolated route
//! - A polling query with a reactive body cycling through todo ids
//! - Registry-wide suspension driven by a simulated visibility signal
//!
//! This uses `JSONPlaceholder` API (<https://jsonplaceholder.typicode.com/>) as a mock backend.
//!
//! Run with: `cargo run --example polling`

use std::sync::Arc;
use std::time::Duration;

use reqwest::Method;
use serde_json::json;
use tokio::sync::watch;
use tokio::time::sleep;

use repoll::endpoint::{Endpoint, EndpointTable};
use repoll::http::Executor;
use repoll::query::QueryOptions;
use repoll::registry::Registry;
use repoll::visibility::{visibility_cell, VisibilityMonitor};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "repoll=debug".into()),
        )
        .init();

    let table = EndpointTable::new()
        .define("todos", Endpoint::new(Method::GET, "/todos"))
        .define("todo", Endpoint::interpolated(Method::GET, "/todos/{id}"));

    let registry = Arc::new(Registry::new(
        table,
        Executor::new("https://jsonplaceholder.typicode.com".parse()?),
    ));

    // Reactive body: every change refetches with the new todo id.
    let (id_tx, id_rx) = watch::channel(json!({"id": 1}));
    let todo = registry.query(
        "todo",
        QueryOptions::new()
            .poll_every(Duration::from_secs(5))
            .body(id_rx),
    )?;

    let (hidden_tx, hidden_rx) = visibility_cell(false);
    let monitor = VisibilityMonitor::spawn(Arc::clone(&registry), hidden_rx);

    let mut updates = todo.subscribe();
    tokio::spawn(async move {
        while updates.changed().await.is_ok() {
            let snapshot = updates.borrow().clone();
            if let Some(payload) = snapshot.response_json() {
                println!("todo: {payload}");
            }
            if let Some(error) = snapshot.error {
                println!("fetch failed: {error}");
            }
        }
    });

    sleep(Duration::from_secs(6)).await;

    println!("-- switching to todo 2 --");
    id_tx.send(json!({"id": 2}))?;
    sleep(Duration::from_secs(6)).await;

    println!("-- going to background for 5s --");
    hidden_tx.send(true)?;
    sleep(Duration::from_secs(5)).await;

    println!("-- back to foreground --");
    hidden_tx.send(false)?;
    sleep(Duration::from_secs(6)).await;

    monitor.shutdown().await;
    registry.shutdown().await;
    Ok(())
}
