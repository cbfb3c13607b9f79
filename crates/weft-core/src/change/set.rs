use super::{Change, Merged};
use crate::error::Result;
use crate::value::Key;

/// A sequence of changes applied in order.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ChangeSet(Vec<Change>);

impl ChangeSet {
    pub fn new(changes: impl IntoIterator<Item = Change>) -> Self {
        Self(changes.into_iter().collect())
    }

    pub fn changes(&self) -> &[Change] {
        &self.0
    }

    pub fn into_changes(self) -> Vec<Change> {
        self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn revert(&self) -> ChangeSet {
        ChangeSet(self.0.iter().rev().map(Change::revert).collect())
    }

    /// Flatten nested sets and drop nil elements. An empty set is nil and a
    /// singleton collapses to its element.
    pub fn simplify(self) -> Option<Change> {
        let mut flat = Vec::with_capacity(self.0.len());
        for change in self.0 {
            match change.simplify() {
                Some(Change::Set(nested)) => flat.extend(nested.0),
                Some(other) => flat.push(other),
                None => {}
            }
        }
        match flat.len() {
            0 => None,
            1 => flat.pop(),
            _ => Some(Change::Set(ChangeSet(flat))),
        }
    }

    /// Merge with the set as receiver: each element transforms the carried
    /// `other` in turn. Returns `(other', set')`.
    pub fn merge(&self, other: &Change) -> Result<Merged> {
        let mut carried = Some(other.clone());
        let mut merged = Vec::with_capacity(self.0.len());
        for change in &self.0 {
            match carried.take() {
                Some(o) => {
                    let (o2, c2) = change.merge(&o)?;
                    carried = o2;
                    merged.extend(c2);
                }
                None => merged.push(change.clone()),
            }
        }
        Ok((carried, ChangeSet(merged).simplify()))
    }

    /// Merge with `receiver` as the earlier change. Returns `(set', receiver')`.
    pub fn reverse_merge(&self, receiver: &Change) -> Result<Merged> {
        let mut carried = Some(receiver.clone());
        let mut merged = Vec::with_capacity(self.0.len());
        for change in &self.0 {
            match carried.take() {
                Some(r) => {
                    let (c2, r2) = r.merge(change)?;
                    carried = r2;
                    merged.extend(c2);
                }
                None => merged.push(change.clone()),
            }
        }
        Ok((ChangeSet(merged).simplify(), carried))
    }

    pub(crate) fn map_path(&self, path: &[Key]) -> Result<Option<Vec<Key>>> {
        let mut current = path.to_vec();
        for change in &self.0 {
            match change.map_path(&current)? {
                Some(mapped) => current = mapped,
                None => return Ok(None),
            }
        }
        Ok(Some(current))
    }
}

impl FromIterator<Change> for ChangeSet {
    fn from_iter<I: IntoIterator<Item = Change>>(iter: I) -> Self {
        ChangeSet::new(iter)
    }
}
