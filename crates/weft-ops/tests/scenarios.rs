//! Worked multi-party scenarios over the log, transformer and sessions.

use std::sync::Arc;
use weft_core::{Change, Value};
use weft_ops::{
    MemoryStore, OpId, Operation, Session, SessionConfigBuilder, Store, TransformCache,
    Transformer, ulid_factory,
};
use weft_stream::Stream;

fn ins(offset: usize, text: &str) -> Change {
    Change::insert(offset, Value::text(text))
}

fn op(id: &str, parent: Option<&str>, basis: i64, change: Change) -> Operation {
    Operation::new(
        OpId::from_string(id),
        parent.map(OpId::from_string),
        basis,
        Some(change),
    )
}

fn fold(start: Value, ops: &[Operation]) -> Value {
    ops.iter()
        .fold(start, |v, o| v.apply_opt(o.change.as_ref()).unwrap())
}

fn fold_stream(start: Value, stream: &Stream) -> Value {
    stream
        .edges()
        .filter_map(|(c, _)| c)
        .fold(start, |v, c| v.apply(&c).unwrap())
}

fn transformed_session(store: &Arc<MemoryStore>, local: &Stream) -> Session {
    let config = SessionConfigBuilder::new()
        .auto_transform(TransformCache::new())
        .build();
    Session::new(Arc::clone(store), local.clone(), ulid_factory(), config)
}

fn branched_log() -> Vec<Operation> {
    vec![
        op("first", None, -1, Change::replace(Value::Empty, Value::text("Hello World"))),
        op("c1_1", None, 0, ins(0, "A ")),
        op("c1_2", Some("c1_1"), 0, ins(2, "B ")),
        op("c2_1", None, 0, ins(0, "X ")),
        op("c2_2", Some("c2_1"), 0, ins(2, "Y ")),
        op("c1_3", None, 3, ins(6, "C ")),
        op("c2_3", Some("c2_2"), 1, ins(6, "Z ")),
    ]
}

#[tokio::test]
async fn test_branched_log_linearises() {
    let store = MemoryStore::new();
    for o in branched_log() {
        store.append(vec![o]).await.unwrap();
    }

    let transformer = Transformer::new(store);
    let ops = transformer.get_since(0, 100).await.unwrap();
    assert_eq!(ops.len(), 7);
    assert_eq!(
        fold(Value::Empty, &ops),
        Value::text("A B X Y C Z Hello World")
    );
    assert_eq!(transformer.cache().len(), 7);

    assert_eq!(ops[3].change, Some(ins(4, "X ")));
    assert_eq!(ops[4].change, Some(ins(6, "Y ")));
    assert_eq!(ops[6].change, Some(ins(10, "Z ")));
}

#[tokio::test]
async fn test_branched_log_tail_read_matches_full_read() {
    let store = Arc::new(MemoryStore::new());
    store.append(branched_log()).await.unwrap();

    let full = Transformer::new(Arc::clone(&store))
        .get_since(0, 100)
        .await
        .unwrap();
    // A cold transformer reading only the tail recurses into the head.
    let tail = Transformer::new(Arc::clone(&store))
        .get_since(5, 100)
        .await
        .unwrap();
    assert_eq!(&full[5..], &tail[..]);
}

#[tokio::test]
async fn test_counter_sessions_converge() {
    let store = Arc::new(MemoryStore::new());
    let start = Value::Counter(20);

    let root1 = Stream::new();
    let root2 = Stream::new();
    let mut s1 = transformed_session(&store, &root1);
    let mut s2 = transformed_session(&store, &root2);

    let local1 = root1.append(Change::increment(5)).unwrap();
    let local2 = root2.append(Change::increment(9)).unwrap();

    s1.push().await.unwrap();
    s2.push().await.unwrap();
    s1.fetch(10).await.unwrap();
    s2.fetch(10).await.unwrap();

    assert_eq!(fold_stream(start.clone(), &root1), Value::Counter(34));
    assert_eq!(fold_stream(start.clone(), &root2), Value::Counter(34));

    // Both sides see the other's edit as a plain increment.
    assert_eq!(local1.next().unwrap().0, Some(Change::increment(9)));
    assert_eq!(local2.next().unwrap().0, Some(Change::increment(5)));

    let log = Transformer::new(Arc::clone(&store))
        .get_since(0, 10)
        .await
        .unwrap();
    assert_eq!(log[0].change, Some(Change::increment(5)));
    assert_eq!(log[1].change, Some(Change::increment(9)));
}

#[tokio::test]
async fn test_session_round_trip() {
    let store = Arc::new(MemoryStore::new());
    let root1 = Stream::new();
    let root2 = Stream::new();
    let mut s1 = transformed_session(&store, &root1);
    let mut s2 = transformed_session(&store, &root2);

    let local1 = root1.append(ins(0, "Hello ")).unwrap();
    s1.push().await.unwrap();
    let local2 = root2.append(ins(0, "World")).unwrap();
    s2.push().await.unwrap();

    s1.fetch(10).await.unwrap();
    s2.fetch(10).await.unwrap();

    assert_eq!(local1.next().unwrap().0, Some(ins(6, "World")));
    assert_eq!(local2.next().unwrap().0, Some(ins(0, "Hello ")));

    let expected = Value::text("Hello World");
    assert_eq!(fold_stream(Value::text(""), &root1), expected);
    assert_eq!(fold_stream(Value::text(""), &root2), expected);
    assert!(s1.pending().is_empty());
    assert!(s2.pending().is_empty());
}

#[tokio::test]
async fn test_move_against_nested_replace() {
    // "abcdef" as a list of one-letter strings; one side moves "bc" past
    // "d", the other rewrites the "a" element.
    let letters = |s: &str| Value::list(s.chars().map(|c| Value::text(c.to_string())));
    let start = letters("abcdef");

    let store = Arc::new(MemoryStore::new());
    let root1 = Stream::new();
    let root2 = Stream::new();
    let mut s1 = transformed_session(&store, &root1);
    let mut s2 = transformed_session(&store, &root2);

    root1.append(Change::moving(1, 2, 1)).unwrap();
    root2
        .append(Change::at(
            [0usize],
            Change::replace(Value::text("a"), Value::text("boo")),
        ))
        .unwrap();

    s1.push().await.unwrap();
    s2.push().await.unwrap();
    s1.fetch(10).await.unwrap();
    s2.fetch(10).await.unwrap();

    let mut expected = letters("adbcef");
    if let Value::List(items) = &mut expected {
        items[0] = Value::text("boo");
    }
    assert_eq!(fold_stream(start.clone(), &root1), expected);
    assert_eq!(fold_stream(start, &root2), expected);
}
