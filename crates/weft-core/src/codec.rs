//! Portable JSON encoding of changes.
//!
//! Every change is written as an object tagged by `kind`. Custom changes
//! are written as `{"kind": "custom", "name": .., "data": ..}` and decoded
//! through a per-codec registry; there is no process-wide table.

use crate::change::{Change, ChangeSet, Custom, Meta, Move, PathChange, Replace, Splice};
use crate::error::{ChangeError, Result};
use crate::value::{Key, Value};
use serde::{Deserialize, Serialize};
use serde_json::Value as Json;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

#[derive(Debug, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
enum WireChange {
    Replace {
        before: Value,
        after: Value,
    },
    Splice {
        offset: usize,
        before: Value,
        after: Value,
    },
    Move {
        offset: usize,
        count: usize,
        distance: isize,
    },
    Path {
        path: Vec<Key>,
        change: Box<WireChange>,
    },
    Set {
        changes: Vec<WireChange>,
    },
    Meta {
        data: Json,
        change: Box<WireChange>,
    },
    Custom {
        name: String,
        data: Json,
    },
}

/// Decoder for one custom kind.
pub type CustomDecoder = Arc<dyn Fn(&Json) -> Result<Custom> + Send + Sync>;

/// Encodes and decodes changes, resolving custom kinds through its own
/// registry.
#[derive(Clone, Default)]
pub struct Codec {
    decoders: HashMap<String, CustomDecoder>,
}

impl Codec {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a decoder for the custom kind `name`. A later registration
    /// under the same name replaces the earlier one.
    pub fn register<F>(mut self, name: impl Into<String>, decoder: F) -> Self
    where
        F: Fn(&Json) -> Result<Custom> + Send + Sync + 'static,
    {
        self.decoders.insert(name.into(), Arc::new(decoder));
        self
    }

    pub fn is_registered(&self, name: &str) -> bool {
        self.decoders.contains_key(name)
    }

    pub fn encode(&self, change: &Change) -> Result<Json> {
        Ok(serde_json::to_value(to_wire(change))?)
    }

    pub fn decode(&self, json: &Json) -> Result<Change> {
        let wire: WireChange = serde_json::from_value(json.clone())?;
        self.from_wire(wire)
    }

    pub fn encode_to_vec(&self, change: &Change) -> Result<Vec<u8>> {
        Ok(serde_json::to_vec(&to_wire(change))?)
    }

    pub fn decode_from_slice(&self, bytes: &[u8]) -> Result<Change> {
        let wire: WireChange = serde_json::from_slice(bytes)?;
        self.from_wire(wire)
    }

    fn from_wire(&self, wire: WireChange) -> Result<Change> {
        Ok(match wire {
            WireChange::Replace { before, after } => Replace::new(before, after).into(),
            WireChange::Splice {
                offset,
                before,
                after,
            } => Splice::new(offset, before, after).into(),
            WireChange::Move {
                offset,
                count,
                distance,
            } => Move::new(offset, count, distance).into(),
            WireChange::Path { path, change } => {
                PathChange::new(path, self.from_wire(*change)?).into()
            }
            WireChange::Set { changes } => changes
                .into_iter()
                .map(|c| self.from_wire(c))
                .collect::<Result<ChangeSet>>()?
                .into(),
            WireChange::Meta { data, change } => Meta::new(data, self.from_wire(*change)?).into(),
            WireChange::Custom { name, data } => {
                let decoder = self
                    .decoders
                    .get(&name)
                    .ok_or(ChangeError::UnknownCustom(name))?;
                decoder(&data)?.into()
            }
        })
    }
}

impl fmt::Debug for Codec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut names: Vec<_> = self.decoders.keys().collect();
        names.sort();
        f.debug_struct("Codec").field("custom_kinds", &names).finish()
    }
}

fn to_wire(change: &Change) -> WireChange {
    match change {
        Change::Replace(r) => WireChange::Replace {
            before: r.before.clone(),
            after: r.after.clone(),
        },
        Change::Splice(s) => WireChange::Splice {
            offset: s.offset,
            before: s.before.clone(),
            after: s.after.clone(),
        },
        Change::Move(m) => WireChange::Move {
            offset: m.offset,
            count: m.count,
            distance: m.distance,
        },
        Change::Path(pc) => WireChange::Path {
            path: pc.path.clone(),
            change: Box::new(to_wire(&pc.change)),
        },
        Change::Set(set) => WireChange::Set {
            changes: set.changes().iter().map(to_wire).collect(),
        },
        Change::Meta(meta) => WireChange::Meta {
            data: meta.data.clone(),
            change: Box::new(to_wire(&meta.change)),
        },
        Change::Custom(c) => WireChange::Custom {
            name: c.name().to_string(),
            data: c.encode(),
        },
    }
}
