//! Collaborative Text Editing Example
//!
//! This example demonstrates how several users edit one shared text
//! document through sessions bound to a single operation log.
//!
//! Run with: cargo run --example collaborative_text

use std::sync::Arc;
use weft_core::{Change, Value};
use weft_ops::{
    sync, MemoryStore, OpsError, Session, SessionConfigBuilder, SyncConfigBuilder, TransformCache,
    ulid_factory,
};
use weft_stream::Stream;

fn text(value: &Value) -> &str {
    value.as_text().unwrap_or("")
}

#[tokio::main]
async fn main() -> Result<(), OpsError> {
    println!("=== Collaborative Text Editing Example ===\n");

    let store = Arc::new(MemoryStore::new());
    let cache = TransformCache::new();
    let config = SyncConfigBuilder::new().auto_sync(false).build();
    let start = Value::text("# Team Meeting Notes\n");

    // One sync task per user, all reading the same log
    let users = ["Alice", "Bob", "Charlie"];
    let handles: Vec<_> = users
        .iter()
        .map(|_| {
            let session = Session::new(
                Arc::clone(&store),
                Stream::new(),
                ulid_factory(),
                SessionConfigBuilder::new()
                    .auto_transform(cache.clone())
                    .build(),
            );
            sync::spawn(session, start.clone(), config.clone())
        })
        .collect();
    println!("Created {} sessions on one log\n", handles.len());

    // Everyone edits before anyone syncs
    let end = start.count()?;
    println!("Alice adds the agenda heading...");
    handles[0]
        .edit(Change::insert(end, Value::text("## Agenda\n")))
        .await?;
    println!("Bob adds an item...");
    handles[1]
        .edit(Change::insert(end, Value::text("- Review Q4 goals\n")))
        .await?;
    println!("Charlie fixes the title...");
    handles[2]
        .edit(Change::remove(2, Value::text("Team ")))
        .await?;

    println!("\n=== Local Views Before Sync ===\n");
    for (user, handle) in users.iter().zip(&handles) {
        println!("--- {}'s view ---", user);
        println!("{}", text(&handle.snapshot().await?));
    }

    // Two rounds: the first publishes, the second picks up what others sent
    for _ in 0..2 {
        for handle in &handles {
            handle.sync().await?;
        }
    }

    println!("=== Views After Sync ===\n");
    for (user, handle) in users.iter().zip(&handles) {
        println!("--- {}'s view ---", user);
        println!("{}", text(&handle.snapshot().await?));
    }

    println!("Operations in log: {}", store.len());
    println!("Transformed entries cached: {}", cache.len());

    for handle in handles {
        handle.close().await;
    }
    println!("\n=== Demo Complete ===");
    Ok(())
}
