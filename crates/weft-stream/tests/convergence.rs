//! Branch convergence tests
//!
//! Several branches edit a shared log in arbitrary interleavings of local
//! edits, pushes and pulls. After a final round of merges every branch and
//! the master log must fold to the same value.

use proptest::prelude::*;
use weft_core::{Change, Splice, Value};
use weft_stream::{Branch, Stream, UndoManager};

#[derive(Debug, Clone)]
enum Action {
    Edit { branch: usize, at: usize, len: usize, text: String },
    Move { branch: usize, at: usize, count: usize, shift: usize },
    Push(usize),
    Pull(usize),
}

fn action_strategy(branches: usize) -> impl Strategy<Value = Action> {
    prop_oneof![
        4 => (0..branches, any::<usize>(), 0usize..3, "[a-z]{0,3}")
            .prop_map(|(branch, at, len, text)| Action::Edit { branch, at, len, text }),
        1 => (0..branches, any::<usize>(), any::<usize>(), any::<usize>())
            .prop_map(|(branch, at, count, shift)| Action::Move { branch, at, count, shift }),
        2 => (0..branches).prop_map(Action::Push),
        2 => (0..branches).prop_map(Action::Pull),
    ]
}

fn fold(start: &Value, stream: &Stream) -> Value {
    stream
        .edges()
        .filter_map(|(c, _)| c)
        .fold(start.clone(), |v, c| v.apply(&c).unwrap())
}

struct Peer {
    branch: Branch,
    origin: Stream,
}

impl Peer {
    fn value(&self, base: &Value) -> Value {
        fold(base, &self.origin)
    }
}

fn edit_for(value: &Value, action: &Action) -> Option<Change> {
    let len = value.count().unwrap();
    match action {
        Action::Edit { at, len: n, text, .. } => {
            let offset = at % (len + 1);
            let count = (*n).min(len - offset);
            Some(Change::Splice(Splice::new(
                offset,
                value.slice(offset, count).unwrap(),
                Value::text(text.clone()),
            )))
        }
        Action::Move { at, count, shift, .. } => {
            let offset = at % (len + 1);
            let count = count % (len - offset + 1);
            let span = offset + (len - offset - count) + 1;
            let distance = (shift % span) as isize - offset as isize;
            Some(Change::moving(offset, count, distance))
        }
        _ => None,
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(128))]

    #[test]
    fn branches_converge(
        base in "[a-z]{0,8}",
        actions in prop::collection::vec(action_strategy(3), 0..40)
    ) {
        let base = Value::text(base);
        let master = Stream::new();
        let mut peers: Vec<Peer> = (0..3)
            .map(|_| {
                let branch = master.branch();
                let origin = branch.local().clone();
                Peer { branch, origin }
            })
            .collect();

        for action in &actions {
            match action {
                Action::Edit { branch, .. } | Action::Move { branch, .. } => {
                    let peer = &peers[*branch];
                    let value = peer.value(&base);
                    if let Some(change) = edit_for(&value, action) {
                        peer.origin.latest().append(change).unwrap();
                    }
                }
                Action::Push(i) => {
                    peers[*i].branch.push().unwrap();
                }
                Action::Pull(i) => {
                    peers[*i].branch.pull().unwrap();
                }
            }
        }

        for peer in peers.iter_mut() {
            peer.branch.merge().unwrap();
        }
        for peer in peers.iter_mut() {
            peer.branch.pull().unwrap();
        }

        let expected = fold(&base, &master);
        for peer in &peers {
            prop_assert_eq!(peer.value(&base), expected.clone());
        }
    }
}

#[test]
fn test_undo_across_branches() {
    let base = Value::text("Hello");
    let master = Stream::new();
    let mut alice = master.branch();
    let mut bob = master.branch();
    let alice_origin = alice.local().clone();
    let bob_origin = bob.local().clone();

    let mut undo = UndoManager::new(alice.local().clone());
    undo.record(Change::insert(5, Value::text(" World"))).unwrap();
    alice.merge().unwrap();

    bob.local()
        .latest()
        .append(Change::insert(0, Value::text(">> ")))
        .unwrap();
    bob.merge().unwrap();
    alice.merge().unwrap();

    let inverse = undo.undo().unwrap();
    assert_eq!(inverse, Some(Change::remove(8, Value::text(" World"))));
    alice.merge().unwrap();
    bob.merge().unwrap();

    let expected = Value::text(">> Hello");
    assert_eq!(fold(&base, &master), expected);
    assert_eq!(fold(&base, &alice_origin), expected);
    assert_eq!(fold(&base, &bob_origin), expected);
}
