use super::{Change, Merged};
use crate::error::Result;
use crate::value::Value;

/// Replace a whole value. `before == Empty` inserts, `after == Empty` deletes.
#[derive(Clone, Debug, PartialEq)]
pub struct Replace {
    pub before: Value,
    pub after: Value,
}

impl Replace {
    pub fn new(before: Value, after: Value) -> Self {
        Self { before, after }
    }

    pub fn is_insert(&self) -> bool {
        self.before.is_empty()
    }

    pub fn is_delete(&self) -> bool {
        self.after.is_empty()
    }

    pub fn revert(&self) -> Replace {
        Replace::new(self.after.clone(), self.before.clone())
    }

    /// Two concurrent replaces: the argument's value wins unless both delete.
    pub(crate) fn merge_replace(&self, other: &Replace) -> Merged {
        if self.is_delete() && other.is_delete() {
            return (None, None);
        }
        let other = Replace::new(self.after.clone(), other.after.clone());
        (Some(other.into()), None)
    }

    /// Fold a concurrent edit of the replaced value into `before`.
    pub(crate) fn absorb(&self, other: &Change) -> Result<Replace> {
        Ok(Replace::new(self.before.apply(other)?, self.after.clone()))
    }
}
