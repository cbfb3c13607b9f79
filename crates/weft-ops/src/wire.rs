//! JSON encoding of operations.
//!
//! An operation travels as `{id, version, parent?, basis, change}`, with the
//! change encoded by a [`Codec`] so custom kinds resolve through the host's
//! own registry.

use crate::error::{OpsError, Result};
use crate::operation::{OpId, Operation};
use serde::{Deserialize, Serialize};
use serde_json::Value as Json;
use weft_core::{ChangeError, Codec};

#[derive(Serialize, Deserialize)]
struct WireOp {
    id: OpId,
    version: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    parent: Option<OpId>,
    basis: i64,
    #[serde(default)]
    change: Option<Json>,
}

/// Operation codec bound to a change registry.
#[derive(Clone, Default)]
pub struct OpCodec {
    changes: Codec,
}

impl OpCodec {
    pub fn new(changes: Codec) -> Self {
        Self { changes }
    }

    pub fn changes(&self) -> &Codec {
        &self.changes
    }

    pub fn encode(&self, op: &Operation) -> Result<Json> {
        let change = match &op.change {
            Some(c) => Some(self.changes.encode(c)?),
            None => None,
        };
        let wire = WireOp {
            id: op.id.clone(),
            version: op.version,
            parent: op.parent.clone(),
            basis: op.basis,
            change,
        };
        Ok(serde_json::to_value(wire)?)
    }

    pub fn decode(&self, json: &Json) -> Result<Operation> {
        let wire: WireOp = serde_json::from_value(json.clone())?;
        let change = match &wire.change {
            Some(c) => Some(self.changes.decode(c).map_err(decode_error)?),
            None => None,
        };
        Ok(Operation {
            id: wire.id,
            version: wire.version,
            parent: wire.parent,
            basis: wire.basis,
            change,
        })
    }

    /// Encode a batch as a JSON array.
    pub fn encode_batch(&self, ops: &[Operation]) -> Result<Vec<u8>> {
        let values = ops
            .iter()
            .map(|op| self.encode(op))
            .collect::<Result<Vec<_>>>()?;
        Ok(serde_json::to_vec(&values)?)
    }

    pub fn decode_batch(&self, bytes: &[u8]) -> Result<Vec<Operation>> {
        let values: Vec<Json> = serde_json::from_slice(bytes)?;
        values.iter().map(|v| self.decode(v)).collect()
    }
}

fn decode_error(err: ChangeError) -> OpsError {
    OpsError::Decode(err.to_string())
}
