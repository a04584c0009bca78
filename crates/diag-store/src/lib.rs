//! Diagnostic capture for the guard.
//!
//! Entries go to a bounded in-memory ring, are mirrored to `tracing`, and are periodically
//! written to the page's key-value storage. The store also owns the init/heartbeat markers
//! and backs the read-only debug surface exposed on the page.

pub mod config;
pub mod errors;
pub mod model;
pub mod ring;
pub mod store;

pub use config::DiagCfg;
pub use errors::DiagError;
pub use model::{DiagEntry, Marker, MarkerKind};
pub use ring::DiagRing;
pub use store::DiagStore;
