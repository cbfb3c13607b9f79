//! Document values.
//!
//! Every value is immutable: [`Value::apply`] returns a fresh value and never
//! touches the receiver. Sequences (`Text`, `List`, `Counter`) expose
//! [`Value::count`] and [`Value::slice`]; a slice is always of the same
//! variant as the sequence it was taken from.

use crate::change::{Change, Move, Replace, Splice};
use crate::context::Context;
use crate::error::{ChangeError, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value as Json;
use std::collections::BTreeMap;
use std::fmt;

static EMPTY: Value = Value::Empty;

/// A path segment: an index into a sequence or a key into a mapping.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Key {
    Index(usize),
    Name(String),
}

impl From<usize> for Key {
    fn from(index: usize) -> Self {
        Key::Index(index)
    }
}

impl From<&str> for Key {
    fn from(name: &str) -> Self {
        Key::Name(name.to_string())
    }
}

impl From<String> for Key {
    fn from(name: String) -> Self {
        Key::Name(name)
    }
}

impl fmt::Display for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Key::Index(i) => write!(f, "{}", i),
            Key::Name(n) => write!(f, "{:?}", n),
        }
    }
}

/// A document value.
#[derive(Clone, Debug, PartialEq, Default, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum Value {
    /// No value. Only an inserting [`Replace`] may act on it.
    #[default]
    Empty,
    /// Opaque leaf; only [`Replace`] can act on it.
    Atomic(Json),
    /// A sequence of chars. Offsets and counts are in chars, not bytes.
    Text(String),
    /// A sequence of values.
    List(Vec<Value>),
    /// An unordered set of named values. Absent keys read as `Empty`.
    Map(BTreeMap<String, Value>),
    /// A zero-width sequence whose splices add `after - before`.
    Counter(i64),
}

impl Value {
    pub fn text(text: impl Into<String>) -> Self {
        Value::Text(text.into())
    }

    pub fn list(items: impl IntoIterator<Item = Value>) -> Self {
        Value::List(items.into_iter().collect())
    }

    pub fn atomic(payload: impl Into<Json>) -> Self {
        Value::Atomic(payload.into())
    }

    pub fn map<K: Into<String>>(entries: impl IntoIterator<Item = (K, Value)>) -> Self {
        Value::Map(entries.into_iter().map(|(k, v)| (k.into(), v)).collect())
    }

    /// True for [`Value::Empty`] only; an empty text or list is not `Empty`.
    pub fn is_empty(&self) -> bool {
        matches!(self, Value::Empty)
    }

    /// Short name of the variant, used in error messages.
    pub fn kind(&self) -> &'static str {
        match self {
            Value::Empty => "empty",
            Value::Atomic(_) => "atomic",
            Value::Text(_) => "text",
            Value::List(_) => "list",
            Value::Map(_) => "map",
            Value::Counter(_) => "counter",
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Value::Text(t) => Some(t),
            _ => None,
        }
    }

    pub fn as_counter(&self) -> Option<i64> {
        match self {
            Value::Counter(n) => Some(*n),
            _ => None,
        }
    }

    /// A zero-length sequence of the same variant, for building insertions
    /// and deletions.
    pub fn empty_like(&self) -> Result<Value> {
        match self {
            Value::Text(_) => Ok(Value::Text(String::new())),
            Value::List(_) => Ok(Value::List(Vec::new())),
            Value::Counter(_) => Ok(Value::Counter(0)),
            other => Err(not_a_sequence(other)),
        }
    }

    /// Number of elements in a sequence.
    pub fn count(&self) -> Result<usize> {
        match self {
            Value::Text(t) => Ok(t.chars().count()),
            Value::List(items) => Ok(items.len()),
            Value::Counter(_) => Ok(0),
            other => Err(not_a_sequence(other)),
        }
    }

    /// The sub-sequence `[offset, offset + count)`.
    pub fn slice(&self, offset: usize, count: usize) -> Result<Value> {
        let out_of_bounds = || {
            ChangeError::illegal(format!(
                "slice [{}, {}) out of bounds for {}",
                offset,
                offset.saturating_add(count),
                self.kind()
            ))
        };
        match self {
            Value::Text(t) => {
                let (start, end) = char_span(t, offset, count).ok_or_else(out_of_bounds)?;
                Ok(Value::Text(t[start..end].to_string()))
            }
            Value::List(items) => {
                let end = offset.checked_add(count).ok_or_else(out_of_bounds)?;
                items
                    .get(offset..end)
                    .map(|s| Value::List(s.to_vec()))
                    .ok_or_else(out_of_bounds)
            }
            Value::Counter(_) if offset == 0 && count == 0 => Ok(Value::Counter(0)),
            Value::Counter(_) => Err(out_of_bounds()),
            other => Err(not_a_sequence(other)),
        }
    }

    /// The direct child at `key`. Absent map keys read as `Empty`.
    pub fn get(&self, key: &Key) -> Option<&Value> {
        match (self, key) {
            (Value::List(items), Key::Index(i)) => items.get(*i),
            (Value::Map(entries), Key::Name(k)) => Some(entries.get(k).unwrap_or(&EMPTY)),
            _ => None,
        }
    }

    /// The descendant at `path`.
    pub fn at(&self, path: &[Key]) -> Option<&Value> {
        path.iter().try_fold(self, |value, key| value.get(key))
    }

    /// Apply a change with an empty context.
    pub fn apply(&self, change: &Change) -> Result<Value> {
        self.apply_with(&Context::root(), change)
    }

    /// Apply a possibly-nil change; nil is the identity.
    pub fn apply_opt(&self, change: Option<&Change>) -> Result<Value> {
        match change {
            Some(c) => self.apply(c),
            None => Ok(self.clone()),
        }
    }

    /// Left-fold a sequence of changes.
    pub fn apply_all<'c>(&self, changes: impl IntoIterator<Item = &'c Change>) -> Result<Value> {
        changes
            .into_iter()
            .try_fold(self.clone(), |value, change| value.apply(change))
    }

    /// Apply a change, exposing meta scopes to custom changes through `ctx`.
    pub fn apply_with(&self, ctx: &Context<'_>, change: &Change) -> Result<Value> {
        match change {
            Change::Replace(r) => self.apply_replace(r),
            Change::Splice(s) => self.splice(s),
            Change::Move(m) => self.rotate(m),
            Change::Path(pc) => self.apply_path(ctx, &pc.path, &pc.change),
            Change::Set(set) => set
                .changes()
                .iter()
                .try_fold(self.clone(), |value, c| value.apply_with(ctx, c)),
            Change::Meta(meta) => self.apply_with(&ctx.with(&meta.data), &meta.change),
            Change::Custom(custom) => custom.apply_to(ctx, self),
        }
    }

    /// Apply a sequence-level change (splice or move). Used to absorb one
    /// change into the `before` of another during merges.
    pub fn apply_collection(&self, change: &Change) -> Result<Value> {
        match change {
            Change::Splice(s) => self.splice(s),
            Change::Move(m) => self.rotate(m),
            other => self.apply(other),
        }
    }

    fn apply_replace(&self, replace: &Replace) -> Result<Value> {
        match self {
            Value::Empty if replace.is_insert() && !replace.is_delete() => {
                Ok(replace.after.clone())
            }
            Value::Empty => Err(ChangeError::illegal(
                "only an inserting replace may act on an empty value",
            )),
            _ if replace.is_insert() => Err(ChangeError::illegal(format!(
                "inserting replace applied to existing {}",
                self.kind()
            ))),
            _ => Ok(replace.after.clone()),
        }
    }

    /// Replace the region `[offset, offset + count(before))` with `after`.
    pub fn splice(&self, splice: &Splice) -> Result<Value> {
        match (self, &splice.before, &splice.after) {
            (Value::Text(text), Value::Text(before), Value::Text(after)) => {
                let removed = before.chars().count();
                let (start, end) = char_span(text, splice.offset, removed)
                    .ok_or_else(|| splice_out_of_bounds(splice, self))?;
                let mut out = String::with_capacity(text.len() - (end - start) + after.len());
                out.push_str(&text[..start]);
                out.push_str(after);
                out.push_str(&text[end..]);
                Ok(Value::Text(out))
            }
            (Value::List(items), Value::List(before), Value::List(after)) => {
                let end = splice
                    .offset
                    .checked_add(before.len())
                    .filter(|&end| end <= items.len())
                    .ok_or_else(|| splice_out_of_bounds(splice, self))?;
                let mut out = Vec::with_capacity(items.len() - before.len() + after.len());
                out.extend_from_slice(&items[..splice.offset]);
                out.extend_from_slice(after);
                out.extend_from_slice(&items[end..]);
                Ok(Value::List(out))
            }
            (Value::Counter(n), Value::Counter(before), Value::Counter(after)) => {
                Ok(Value::Counter(n.wrapping_sub(*before).wrapping_add(*after)))
            }
            _ => Err(ChangeError::illegal(format!(
                "cannot splice {} -> {} into {}",
                splice.before.kind(),
                splice.after.kind(),
                self.kind()
            ))),
        }
    }

    /// Shift a window of the sequence as described by `m`.
    pub fn rotate(&self, m: &Move) -> Result<Value> {
        let len = self.count()?;
        if m.is_noop() {
            return Ok(self.clone());
        }
        let (a, mid, b) = m
            .span()
            .filter(|&(_, _, b)| b <= len)
            .ok_or_else(|| ChangeError::illegal(format!("{:?} out of bounds for length {}", m, len)))?;
        match self {
            Value::Text(text) => {
                let chars: Vec<char> = text.chars().collect();
                Ok(Value::Text(swap_blocks(&chars, a, mid, b).into_iter().collect()))
            }
            Value::List(items) => Ok(Value::List(swap_blocks(items, a, mid, b))),
            other => Err(ChangeError::illegal(format!("cannot move within {}", other.kind()))),
        }
    }

    fn apply_path(&self, ctx: &Context<'_>, path: &[Key], inner: &Change) -> Result<Value> {
        let Some((key, rest)) = path.split_first() else {
            return self.apply_with(ctx, inner);
        };
        match (self, key) {
            (Value::List(items), Key::Index(i)) => {
                let item = items.get(*i).ok_or_else(|| {
                    ChangeError::illegal(format!("index {} out of bounds for list of {}", i, items.len()))
                })?;
                let updated = item.apply_path(ctx, rest, inner)?;
                let mut items = items.clone();
                items[*i] = updated;
                Ok(Value::List(items))
            }
            (Value::Map(entries), Key::Name(k)) => {
                let current = entries.get(k).unwrap_or(&EMPTY);
                let updated = current.apply_path(ctx, rest, inner)?;
                let mut entries = entries.clone();
                if updated.is_empty() {
                    entries.remove(k);
                } else {
                    entries.insert(k.clone(), updated);
                }
                Ok(Value::Map(entries))
            }
            _ => Err(ChangeError::illegal(format!(
                "cannot descend into {} with key {}",
                self.kind(),
                key
            ))),
        }
    }
}

impl From<&str> for Value {
    fn from(text: &str) -> Self {
        Value::Text(text.to_string())
    }
}

impl From<String> for Value {
    fn from(text: String) -> Self {
        Value::Text(text)
    }
}

impl From<Vec<Value>> for Value {
    fn from(items: Vec<Value>) -> Self {
        Value::List(items)
    }
}

/// Byte range of the chars `[offset, offset + count)` in `text`.
fn char_span(text: &str, offset: usize, count: usize) -> Option<(usize, usize)> {
    let mut bounds = text
        .char_indices()
        .map(|(i, _)| i)
        .chain(std::iter::once(text.len()));
    let start = bounds.nth(offset)?;
    let end = if count == 0 { start } else { bounds.nth(count - 1)? };
    Some((start, end))
}

fn swap_blocks<T: Clone>(items: &[T], a: usize, mid: usize, b: usize) -> Vec<T> {
    let mut out = Vec::with_capacity(items.len());
    out.extend_from_slice(&items[..a]);
    out.extend_from_slice(&items[mid..b]);
    out.extend_from_slice(&items[a..mid]);
    out.extend_from_slice(&items[b..]);
    out
}

fn not_a_sequence(value: &Value) -> ChangeError {
    ChangeError::illegal(format!("{} is not a sequence", value.kind()))
}

fn splice_out_of_bounds(splice: &Splice, value: &Value) -> ChangeError {
    ChangeError::illegal(format!(
        "splice at {} out of bounds for {} of length {}",
        splice.offset,
        value.kind(),
        value.count().unwrap_or(0)
    ))
}
