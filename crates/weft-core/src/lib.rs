//! # weft-core
//!
//! The pure half of weft: immutable document [`Value`]s and the [`Change`]
//! algebra that edits them.
//!
//! Every change can be applied, reverted and merged against a concurrent
//! change. Merging obeys the convergence law: for `(b', a') = a.merge(&b)`,
//! `v.apply(a).apply(b') == v.apply(b).apply(a')`.
//!
//! ```
//! use weft_core::{Change, Value};
//!
//! let doc = Value::text("Hello World");
//! let ours = Change::insert(0, Value::text("OK "));
//! let theirs = Change::insert(11, Value::text("!"));
//!
//! let (theirs2, ours2) = ours.merge(&theirs).unwrap();
//! let a = doc.apply(&ours).unwrap().apply_opt(theirs2.as_ref()).unwrap();
//! let b = doc.apply(&theirs).unwrap().apply_opt(ours2.as_ref()).unwrap();
//! assert_eq!(a, b);
//! assert_eq!(a, Value::text("OK Hello World!"));
//! ```

pub mod change;
pub mod codec;
pub mod context;
pub mod error;
pub mod value;

pub use change::{
    merge, revert, Change, ChangeSet, Custom, CustomChange, Merged, Meta, Move, PathChange,
    Replace, Splice,
};
pub use codec::Codec;
pub use context::Context;
pub use error::{ChangeError, Result};
pub use value::{Key, Value};
