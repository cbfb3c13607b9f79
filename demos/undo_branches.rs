//! Undo and Branches Example
//!
//! This example demonstrates collaborative undo on a shared stream and
//! private branches that push and pull against it.
//!
//! Run with: cargo run --example undo_branches

use weft_core::{Change, Result, Value};
use weft_stream::{Stream, UndoManager};

fn view(start: &Value, stream: &Stream) -> Result<String> {
    let mut value = start.clone();
    for (change, _) in stream.edges() {
        value = value.apply_opt(change.as_ref())?;
    }
    Ok(value.as_text().unwrap_or("").to_string())
}

fn main() -> Result<()> {
    println!("=== Undo and Branches Example ===\n");

    let start = Value::text("draft");
    let master = Stream::new();

    // Two writers fork private branches off the shared log
    let mut alice = master.branch();
    let mut bob = master.branch();

    println!("Alice edits on her branch...");
    alice
        .local()
        .append(Change::insert(5, Value::text(" one")))?;
    println!("Bob edits on his branch...");
    bob.local().append(Change::insert(0, Value::text("final ")))?;

    alice.merge()?;
    bob.merge()?;
    alice.pull()?;
    println!("  Master: {:?}", view(&start, &master)?);

    // Undo on master, with Bob's edit arriving after Alice's
    println!("\n=== Collaborative Undo ===\n");
    let mut undo = UndoManager::new(master.latest());
    undo.record(Change::insert(0, Value::text("[x] ")))?;
    println!("Checkbox added:   {:?}", view(&start, &master)?);

    bob.local().latest().append(Change::remove(0, Value::text("final ")))?;
    bob.merge()?;
    println!("Bob drops a word: {:?}", view(&start, &master)?);

    if let Some(change) = undo.undo()? {
        println!("Undo appends {:?}", change);
    }
    println!("After undo:       {:?}", view(&start, &master)?);

    undo.redo()?;
    println!("After redo:       {:?}", view(&start, &master)?);
    println!(
        "Undo stack: {} | Redo stack: {}",
        undo.undo_stack_size(),
        undo.redo_stack_size()
    );

    println!("\n=== Demo Complete ===");
    Ok(())
}
