use super::{Change, Merged};
use crate::error::Result;
use serde_json::Value as Json;

/// Tags a change with opaque data. Transparent to merge; on apply the data
/// is bound into the [`Context`](crate::context::Context).
#[derive(Clone, Debug, PartialEq)]
pub struct Meta {
    pub data: Json,
    pub change: Box<Change>,
}

impl Meta {
    pub fn new(data: Json, change: Change) -> Self {
        Self {
            data,
            change: Box::new(change),
        }
    }

    pub fn revert(&self) -> Meta {
        Meta::new(self.data.clone(), self.change.revert())
    }

    pub fn simplify(self) -> Option<Change> {
        let inner = (*self.change).simplify()?;
        Some(Meta::new(self.data, inner).into())
    }

    fn wrap(&self, change: Change) -> Change {
        Meta::new(self.data.clone(), change).into()
    }

    pub fn merge(&self, other: &Change) -> Result<Merged> {
        let (other2, inner) = self.change.merge(other)?;
        Ok((other2, inner.map(|c| self.wrap(c))))
    }

    pub fn reverse_merge(&self, receiver: &Change) -> Result<Merged> {
        let (inner, receiver2) = receiver.merge(&self.change)?;
        Ok((inner.map(|c| self.wrap(c)), receiver2))
    }
}
