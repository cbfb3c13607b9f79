//! Offline Sync Example
//!
//! This example demonstrates editing while disconnected: local changes
//! stay pending in the session, survive a restart through the saved
//! session state, and are rebased when the client reconnects.
//!
//! Run with: cargo run --example offline_sync

use async_trait::async_trait;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use weft_core::{Change, Value};
use weft_ops::{
    MemoryStore, OpCodec, Operation, OpsError, Session, SessionConfigBuilder, Store, StoreError,
    TransformCache, Transformer, ulid_factory,
};
use weft_stream::Stream;

/// A link to the shared log that can be cut.
struct Link {
    log: Arc<MemoryStore>,
    online: Arc<AtomicBool>,
}

impl Link {
    fn check(&self) -> Result<(), StoreError> {
        if self.online.load(Ordering::SeqCst) {
            Ok(())
        } else {
            Err(StoreError::Unavailable("no network".to_string()))
        }
    }
}

#[async_trait]
impl Store for Link {
    async fn append(&self, ops: Vec<Operation>) -> Result<(), StoreError> {
        self.check()?;
        self.log.append(ops).await
    }

    async fn get_since(&self, version: i64, limit: usize) -> Result<Vec<Operation>, StoreError> {
        self.check()?;
        self.log.get_since(version, limit).await
    }

    async fn poll(&self, version: i64) -> Result<(), StoreError> {
        self.check()?;
        self.log.poll(version).await
    }

    async fn close(&self) {}
}

fn fold(start: &Value, stream: &Stream) -> Result<Value, OpsError> {
    let mut value = start.clone();
    for (change, _) in stream.edges() {
        value = value.apply_opt(change.as_ref())?;
    }
    Ok(value)
}

#[tokio::main]
async fn main() -> Result<(), OpsError> {
    println!("=== Offline Sync Example ===\n");

    let log = Arc::new(MemoryStore::new());
    let online = Arc::new(AtomicBool::new(true));
    let start = Value::text("Shopping List\n");
    let config = || {
        SessionConfigBuilder::new()
            .auto_transform(TransformCache::new())
            .build()
    };

    let desktop_root = Stream::new();
    let mobile_root = Stream::new();
    let mut desktop = Session::new(Arc::clone(&log), desktop_root.clone(), ulid_factory(), config());
    let link = Link {
        log: Arc::clone(&log),
        online: Arc::clone(&online),
    };
    let mut mobile = Session::new(link, mobile_root.clone(), ulid_factory(), config());

    // === Phase 1: Mobile goes offline ===
    println!("=== Phase 1: Mobile Goes Offline ===\n");
    online.store(false, Ordering::SeqCst);

    let mut tail = mobile_root.clone();
    for item in ["[ ] Eggs\n", "[ ] Bread\n", "[ ] Milk\n"] {
        let at = start.count()?;
        tail = tail.append(Change::insert(at, Value::text(item)))?;
    }
    println!("Mobile adds items (offline):");
    println!("{}", fold(&start, &mobile_root)?.as_text().unwrap_or(""));

    match mobile.push().await {
        Ok(()) => println!("Mobile push went through"),
        Err(e) => println!("Mobile push failed: {} (retryable: {})", e, e.is_retryable()),
    }

    // Meanwhile, Desktop edits and syncs
    desktop_root.append(Change::insert(0, Value::text("# ")))?;
    desktop.push().await?;
    println!("Desktop renames the list and syncs ({} op in log)\n", log.len());

    // Mobile restarts: the saved state carries the unsent operations
    let saved = mobile.state();
    let cursor = mobile.stream().clone();
    drop(mobile);
    println!("Mobile restarts with {} pending operations", saved.pending.len());

    // === Phase 2: Reconnect ===
    println!("\n=== Phase 2: Mobile Reconnects ===\n");
    online.store(true, Ordering::SeqCst);
    let link = Link {
        log: Arc::clone(&log),
        online: Arc::clone(&online),
    };
    let resumed = SessionConfigBuilder::new()
        .resume(saved)
        .auto_transform(TransformCache::new())
        .build();
    let mut mobile = Session::new(link, cursor, ulid_factory(), resumed);
    mobile.sync(100).await?;
    desktop.fetch(100).await?;

    let desktop_view = fold(&start, &desktop_root)?;
    let mobile_view = fold(&start, &mobile_root)?;
    println!("--- Desktop ---\n{}", desktop_view.as_text().unwrap_or(""));
    println!("--- Mobile ---\n{}", mobile_view.as_text().unwrap_or(""));
    println!("Converged: {}", desktop_view == mobile_view);
    println!("Mobile pending after sync: {}", mobile.pending().len());

    // === Phase 3: The log on the wire ===
    println!("\n=== Phase 3: Transformed Log ===\n");
    let codec = OpCodec::default();
    let ops = Transformer::new(Arc::clone(&log))
        .get_since(0, usize::MAX)
        .await?;
    for op in &ops {
        println!("{}", codec.encode(op)?);
    }

    println!("\n=== Demo Complete ===");
    Ok(())
}
