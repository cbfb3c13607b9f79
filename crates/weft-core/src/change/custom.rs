//! Host-defined change kinds.
//!
//! Built-in changes never inspect a custom change. When a built-in meets a
//! custom change in a merge it calls [`CustomChange::reverse_merge`] and
//! swaps the result, so every tie-break involving a custom kind is decided
//! by the custom implementation alone.

use super::{Change, Merged};
use crate::context::Context;
use crate::error::Result;
use crate::value::{Key, Value};
use serde_json::Value as Json;
use std::any::Any;
use std::fmt;
use std::ops::Deref;
use std::sync::Arc;

/// Capability interface for change kinds the core does not know about.
pub trait CustomChange: fmt::Debug + Send + Sync + 'static {
    /// Stable kind name, used as the wire tag.
    fn name(&self) -> &str;

    /// Merge with `self` as the receiver. Returns `(other', self')`.
    fn merge(&self, other: &Change) -> Result<Merged>;

    /// Merge with `receiver` as the earlier change. Returns
    /// `(receiver', self')`, the swap of what `receiver.merge(self)` yields.
    fn reverse_merge(&self, receiver: &Change) -> Result<Merged>;

    fn apply_to(&self, ctx: &Context<'_>, value: &Value) -> Result<Value>;

    fn revert(&self) -> Change;

    /// Where the descendant at `path` lives afterwards. The default assumes
    /// the change leaves descendants in place.
    fn map_path(&self, path: &[Key]) -> Result<Option<Vec<Key>>> {
        Ok(Some(path.to_vec()))
    }

    /// Payload carried on the wire next to [`name`](Self::name).
    fn encode(&self) -> Json;

    fn as_any(&self) -> &dyn Any;

    fn dyn_eq(&self, other: &dyn CustomChange) -> bool;
}

/// Shared handle to a custom change.
#[derive(Clone)]
pub struct Custom(Arc<dyn CustomChange>);

impl Custom {
    pub fn new(change: impl CustomChange) -> Self {
        Self(Arc::new(change))
    }

    pub fn from_arc(change: Arc<dyn CustomChange>) -> Self {
        Self(change)
    }

    pub fn downcast_ref<T: CustomChange>(&self) -> Option<&T> {
        self.0.as_any().downcast_ref::<T>()
    }
}

impl Deref for Custom {
    type Target = dyn CustomChange;

    fn deref(&self) -> &Self::Target {
        &*self.0
    }
}

impl fmt::Debug for Custom {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl PartialEq for Custom {
    fn eq(&self, other: &Self) -> bool {
        self.0.dyn_eq(&*other.0)
    }
}
