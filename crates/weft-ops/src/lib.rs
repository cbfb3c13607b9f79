//! # weft-ops
//!
//! Operation log synchronisation for weft documents.
//!
//! ## Layers
//!
//! - [`Operation`]: a change plus `id`, `version`, `parent` and `basis`
//! - [`Store`]: the append-only log ([`MemoryStore`] in process)
//! - [`ReliableStore`]: retries transient store failures with backoff
//! - [`Transformer`]: rewrites each logged operation relative to its
//!   predecessor, memoised in a [`TransformCache`]
//! - [`NonBlocking`]: serves reads from a background-refreshed window
//! - [`Session`]: binds a local [`Stream`](weft_stream::Stream) to a store
//! - [`sync::spawn`]: runs a session as a single-owner task
//!
//! ## Quick start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use weft_core::{Change, Value};
//! use weft_ops::{MemoryStore, Session, SessionConfigBuilder, TransformCache, ulid_factory};
//! use weft_stream::Stream;
//!
//! # async fn demo() -> weft_ops::Result<()> {
//! let store = Arc::new(MemoryStore::new());
//! let local = Stream::new();
//! let config = SessionConfigBuilder::new()
//!     .auto_transform(TransformCache::new())
//!     .build();
//! let mut session = Session::new(store, local.clone(), ulid_factory(), config);
//!
//! local.append(Change::insert(0, Value::text("Hello")))?;
//! session.push().await?;
//! session.fetch(100).await?;
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod error;
pub mod nonblocking;
pub mod operation;
pub mod reliable;
pub mod session;
pub mod store;
pub mod sync;
pub mod transformer;
pub mod wire;

pub use config::{BackoffConfig, SessionConfig, SessionConfigBuilder, SyncConfig, SyncConfigBuilder};
pub use error::{OpsError, Result, StoreError};
pub use nonblocking::NonBlocking;
pub use operation::{ulid_factory, IdFactory, OpId, Operation};
pub use reliable::ReliableStore;
pub use session::{Observer, Session, SessionState};
pub use store::{MemoryStore, Store};
pub use sync::SyncHandle;
pub use transformer::{TransformCache, Transformed, Transformer};
pub use wire::OpCodec;
