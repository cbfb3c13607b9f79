//! The change algebra.
//!
//! A [`Change`] describes an edit to a [`Value`]. Nil (the identity change) is
//! represented as `None` wherever an `Option<Change>` appears.
//!
//! The central operation is [`Change::merge`]: given two changes `a` and `b`
//! made concurrently against the same value, `a.merge(b)` returns
//! `(b', a')` such that applying `a` then `b'` yields the same value as
//! applying `b` then `a'`. The receiver is always treated as the earlier of
//! the two, so a conflict between two whole-value replaces resolves to the
//! argument's value on both peers.

mod custom;
mod meta;
mod moves;
mod path;
mod replace;
mod set;
mod splice;

pub use custom::{Custom, CustomChange};
pub use meta::Meta;
pub use moves::Move;
pub use path::PathChange;
pub use replace::Replace;
pub use set::ChangeSet;
pub use splice::Splice;

use crate::error::Result;
use crate::value::{Key, Value};
use serde_json::Value as Json;

/// Result of a merge: `(other', self')`. `None` is the nil change.
pub type Merged = (Option<Change>, Option<Change>);

#[derive(Clone, Debug, PartialEq)]
pub enum Change {
    Replace(Replace),
    Splice(Splice),
    Move(Move),
    Path(PathChange),
    Set(ChangeSet),
    Meta(Meta),
    Custom(Custom),
}

impl Change {
    /// Replace `before` with `after`.
    pub fn replace(before: Value, after: Value) -> Change {
        Change::Replace(Replace::new(before, after))
    }

    /// Insert a sequence at `offset`. `items` must be a text or list value.
    pub fn insert(offset: usize, items: Value) -> Change {
        let before = items.empty_like().unwrap_or_default();
        Change::Splice(Splice::new(offset, before, items))
    }

    /// Remove the sequence `items` found at `offset`.
    pub fn remove(offset: usize, items: Value) -> Change {
        let after = items.empty_like().unwrap_or_default();
        Change::Splice(Splice::new(offset, items, after))
    }

    /// Add `by` to a counter.
    pub fn increment(by: i64) -> Change {
        Change::Splice(Splice::new(0, Value::Counter(0), Value::Counter(by)))
    }

    /// Move `count` elements at `offset` by `distance` positions.
    pub fn moving(offset: usize, count: usize, distance: isize) -> Change {
        Change::Move(Move::new(offset, count, distance))
    }

    /// Apply `change` at the descendant addressed by `path`.
    pub fn at<K: Into<Key>>(path: impl IntoIterator<Item = K>, change: Change) -> Change {
        Change::Path(PathChange::new(path.into_iter().map(Into::into).collect(), change))
    }

    /// Apply `changes` in order.
    pub fn set(changes: impl IntoIterator<Item = Change>) -> Change {
        Change::Set(ChangeSet::new(changes))
    }

    /// Tag `change` with opaque data visible to custom changes on apply.
    pub fn with_meta(data: Json, change: Change) -> Change {
        Change::Meta(Meta::new(data, change))
    }

    pub fn custom(change: impl CustomChange) -> Change {
        Change::Custom(Custom::new(change))
    }

    /// Transform two concurrent changes against each other.
    ///
    /// Returns `(other', self')`: `other'` is to be applied after `self`,
    /// `self'` after `other`.
    pub fn merge(&self, other: &Change) -> Result<Merged> {
        match (self, other) {
            (Change::Path(p), _) if p.path.is_empty() => p.change.merge(other),
            (_, Change::Path(q)) if q.path.is_empty() => self.merge(&q.change),
            (Change::Custom(c), _) => c.merge(other),
            (_, Change::Custom(c)) => c.reverse_merge(self).map(swap),
            (Change::Set(set), _) => set.merge(other),
            (_, Change::Set(set)) => set.reverse_merge(self),
            (Change::Meta(meta), _) => meta.merge(other),
            (_, Change::Meta(meta)) => meta.reverse_merge(self),
            (Change::Move(m), _) if m.is_noop() => Ok((Some(other.clone()), None)),
            (_, Change::Move(m)) if m.is_noop() => Ok((None, Some(self.clone()))),
            (Change::Path(p), Change::Path(q)) => path::merge_paths(p, q),
            (_, Change::Path(q)) => path::descend(self, q),
            (Change::Path(p), _) => path::descend(other, p).map(swap),
            (Change::Replace(s), Change::Replace(o)) => Ok(s.merge_replace(o)),
            (Change::Replace(s), _) => Ok((None, Some(s.absorb(other)?.into()))),
            (_, Change::Replace(o)) => Ok((Some(o.absorb(self)?.into()), None)),
            (Change::Splice(s), Change::Splice(o)) => s.merge_splice(o),
            (Change::Move(m), Change::Splice(s)) => m.merge_splice(s),
            (Change::Splice(s), Change::Move(m)) => m.merge_splice(s).map(swap),
            (Change::Move(s), Change::Move(o)) => Ok(s.merge_move(o)),
        }
    }

    /// The inverse change: `v.apply(c).apply(c.revert()) == v`.
    pub fn revert(&self) -> Change {
        match self {
            Change::Replace(r) => r.revert().into(),
            Change::Splice(s) => s.revert().into(),
            Change::Move(m) => m.revert().into(),
            Change::Path(pc) => pc.revert().into(),
            Change::Set(set) => set.revert().into(),
            Change::Meta(meta) => meta.revert().into(),
            Change::Custom(c) => c.revert(),
        }
    }

    /// Structural normalization. Returns `None` when the change is nil.
    pub fn simplify(self) -> Option<Change> {
        match self {
            Change::Set(set) => set.simplify(),
            Change::Path(pc) => pc.simplify(),
            Change::Meta(meta) => meta.simplify(),
            Change::Move(m) if m.is_noop() => None,
            other => Some(other),
        }
    }

    /// Where the descendant at `path` lives after this change, or `None` if
    /// the change destroys it.
    pub fn map_path(&self, path: &[Key]) -> Result<Option<Vec<Key>>> {
        match self {
            Change::Replace(_) if path.is_empty() => Ok(Some(Vec::new())),
            Change::Replace(_) => Ok(None),
            Change::Splice(s) => s.map_path(path),
            Change::Move(m) => Ok(Some(m.map_path(path))),
            Change::Path(pc) => pc.map_path(path),
            Change::Set(set) => set.map_path(path),
            Change::Meta(meta) => meta.change.map_path(path),
            Change::Custom(c) => c.map_path(path),
        }
    }
}

/// Merge two possibly-nil changes. Nil merged with anything passes the other
/// side through unchanged.
pub fn merge(left: Option<&Change>, right: Option<&Change>) -> Result<Merged> {
    match (left, right) {
        (Some(l), Some(r)) => l.merge(r),
        (l, r) => Ok((r.cloned(), l.cloned())),
    }
}

/// Revert a possibly-nil change.
pub fn revert(change: Option<&Change>) -> Option<Change> {
    change.map(Change::revert)
}

pub(crate) fn swap((a, b): Merged) -> Merged {
    (b, a)
}

impl From<Replace> for Change {
    fn from(r: Replace) -> Self {
        Change::Replace(r)
    }
}

impl From<Splice> for Change {
    fn from(s: Splice) -> Self {
        Change::Splice(s)
    }
}

impl From<Move> for Change {
    fn from(m: Move) -> Self {
        Change::Move(m)
    }
}

impl From<PathChange> for Change {
    fn from(pc: PathChange) -> Self {
        Change::Path(pc)
    }
}

impl From<ChangeSet> for Change {
    fn from(set: ChangeSet) -> Self {
        Change::Set(set)
    }
}

impl From<Meta> for Change {
    fn from(meta: Meta) -> Self {
        Change::Meta(meta)
    }
}

impl From<Custom> for Change {
    fn from(c: Custom) -> Self {
        Change::Custom(c)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn converges(initial: &Value, a: &Change, b: &Change) -> Value {
        let (b2, a2) = a.merge(b).unwrap();
        let left = initial.apply(a).unwrap().apply_opt(b2.as_ref()).unwrap();
        let right = initial.apply(b).unwrap().apply_opt(a2.as_ref()).unwrap();
        assert_eq!(left, right, "diverged merging {:?} with {:?}", a, b);
        left
    }

    #[test]
    fn test_nil_merge_passes_through() {
        let c = Change::insert(0, Value::text("x"));
        assert_eq!(merge(None, Some(&c)).unwrap(), (Some(c.clone()), None));
        assert_eq!(merge(Some(&c), None).unwrap(), (None, Some(c.clone())));
        assert_eq!(merge(None, None).unwrap(), (None, None));
    }

    #[test]
    fn test_text_merge_example() {
        let initial = Value::text("Hello World");
        let a = Change::set([
            Change::remove(0, Value::text("Hello ")),
            Change::insert(5, Value::text("!")),
        ]);
        let b = Change::insert(0, Value::text("OK "));
        assert_eq!(converges(&initial, &a, &b), Value::text("OK World!"));
    }

    #[test]
    fn test_replace_beats_descendant_edit() {
        let initial = Value::map([("a", Value::text("xy"))]);
        let replace = Change::replace(initial.clone(), Value::text("gone"));
        let edit = Change::at(["a"], Change::insert(1, Value::text("!")));

        let (edit2, replace2) = replace.merge(&edit).unwrap();
        assert_eq!(edit2, None);
        let out = converges(&initial, &replace, &edit);
        assert_eq!(out, Value::text("gone"));
        match replace2 {
            Some(Change::Replace(r)) => assert_eq!(r.before, Value::map([("a", Value::text("x!y"))])),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_concurrent_deletes_cancel() {
        let initial = Value::text("x");
        let a = Change::replace(initial.clone(), Value::Empty);
        let b = a.clone();
        assert_eq!(a.merge(&b).unwrap(), (None, None));
    }

    #[test]
    fn test_later_replace_wins_conflict() {
        let initial = Value::text("x");
        let a = Change::replace(initial.clone(), Value::text("a"));
        let b = Change::replace(initial.clone(), Value::text("b"));
        assert_eq!(converges(&initial, &a, &b), Value::text("b"));
        assert_eq!(converges(&initial, &b, &a), Value::text("a"));

        let (b2, a2) = a.merge(&b).unwrap();
        assert_eq!(b2, Some(Change::replace(Value::text("a"), Value::text("b"))));
        assert_eq!(a2, None);
    }

    #[test]
    fn test_path_vs_path_diverging_and_nested() {
        let initial = Value::map([
            ("a", Value::list(vec![Value::text("one"), Value::text("two")])),
            ("b", Value::text("bee")),
        ]);
        let on_a = Change::at(["a"], Change::insert(0, Value::list(vec![Value::text("zero")])));
        let on_a1 = Change::at(vec![Key::from("a"), Key::from(1usize)], Change::insert(3, Value::text("!")));
        let on_b = Change::at(["b"], Change::insert(0, Value::text("a ")));

        converges(&initial, &on_a, &on_b);
        let out = converges(&initial, &on_a, &on_a1);
        assert_eq!(
            out.at(&[Key::from("a"), Key::from(2usize)]),
            Some(&Value::text("two!"))
        );
    }

    #[test]
    fn test_splice_absorbs_descendant_edit() {
        let initial = Value::list(vec![Value::text("a"), Value::text("b"), Value::text("c")]);
        let remove = Change::remove(1, Value::list(vec![Value::text("b")]));
        let edit = Change::at([1usize], Change::insert(1, Value::text("!")));
        let out = converges(&initial, &remove, &edit);
        assert_eq!(out, Value::list(vec![Value::text("a"), Value::text("c")]));
        let out = converges(&initial, &edit, &remove);
        assert_eq!(out, Value::list(vec![Value::text("a"), Value::text("c")]));
    }

    #[test]
    fn test_move_remaps_descendant_edit() {
        let initial = Value::list(vec![Value::text("a"), Value::text("b"), Value::text("c")]);
        let mv = Change::moving(0, 1, 2);
        let edit = Change::at([0usize], Change::insert(1, Value::text("!")));
        let out = converges(&initial, &mv, &edit);
        assert_eq!(
            out,
            Value::list(vec![Value::text("b"), Value::text("c"), Value::text("a!")])
        );
    }

    #[test]
    fn test_revert_round_trips() {
        let initial = Value::map([("t", Value::text("hello"))]);
        let change = Change::set([
            Change::at(["t"], Change::insert(5, Value::text(" there"))),
            Change::at(["t"], Change::moving(0, 5, 6)),
            Change::at(["n"], Change::replace(Value::Empty, Value::Counter(1))),
        ]);
        let edited = initial.apply(&change).unwrap();
        assert_eq!(edited.apply(&change.revert()).unwrap(), initial);
    }

    #[test]
    fn test_simplify_rules() {
        assert_eq!(Change::set([]).simplify(), None);
        assert_eq!(Change::moving(3, 0, 2).simplify(), None);

        let inner = Change::insert(0, Value::text("x"));
        assert_eq!(Change::set([inner.clone()]).simplify(), Some(inner.clone()));
        assert_eq!(
            Change::at(Vec::<Key>::new(), inner.clone()).simplify(),
            Some(inner.clone())
        );
        let nested = Change::at(["a"], Change::at(["b"], inner.clone()));
        assert_eq!(nested.simplify(), Some(Change::at(["a", "b"], inner.clone())));

        // no-op replaces survive: they still assert the value
        let same = Change::replace(Value::text("x"), Value::text("x"));
        assert_eq!(same.clone().simplify(), Some(same));
    }
}
