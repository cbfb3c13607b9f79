//! Operation records: a change plus the metadata the log needs to place it.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use ulid::Ulid;
use weft_core::Change;

/// Unique identifier for an operation.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OpId(pub String);

impl OpId {
    /// A fresh, time-ordered id.
    pub fn new() -> Self {
        Self(Ulid::new().to_string())
    }

    pub fn from_string(s: impl Into<String>) -> Self {
        Self(s.into())
    }
}

impl Default for OpId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for OpId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Source of ids for newly minted operations. Ids must be collision-free and,
/// for sessions that get resumed, stable across restarts.
pub type IdFactory = Arc<dyn Fn() -> OpId + Send + Sync>;

/// The default id factory: ULIDs.
pub fn ulid_factory() -> IdFactory {
    Arc::new(OpId::new)
}

/// A change together with its position in the log.
#[derive(Clone, Debug, PartialEq)]
pub struct Operation {
    pub id: OpId,
    /// Index in the log, or -1 until the store assigns one.
    pub version: i64,
    /// The previous operation from the same session, if any.
    pub parent: Option<OpId>,
    /// Highest log version the author had seen.
    pub basis: i64,
    pub change: Option<Change>,
}

impl Operation {
    /// A not-yet-stored operation.
    pub fn new(id: OpId, parent: Option<OpId>, basis: i64, change: Option<Change>) -> Self {
        Self {
            id,
            version: -1,
            parent,
            basis,
            change,
        }
    }

    pub fn with_version(&self, version: i64) -> Self {
        Self {
            version,
            ..self.clone()
        }
    }

    pub fn with_changes(&self, change: Option<Change>) -> Self {
        Self {
            change,
            ..self.clone()
        }
    }

    pub fn is_stored(&self) -> bool {
        self.version >= 0
    }
}
