//! Host page abstraction consumed by the playguard engine.
//!
//! The engine never talks to a browser directly. Everything it reads or mutates on the page
//! goes through the traits in this crate: the document tree, the media element, the player
//! container, the network surface, the page configuration object and key-value storage.
//! [`memory`] provides an in-process implementation used by tests and the scenario simulator.

pub mod config_object;
pub mod dom;
pub mod error;
pub mod media;
pub mod memory;
pub mod network;
pub mod page;
pub mod player;
pub mod selector;
pub mod storage;

pub use config_object::{ConfigSetFn, ConfigWrite, HostConfig};
pub use dom::{closest, Document, DomNode, MutationCallback, MutationRecord, NodeRef};
pub use error::HostError;
pub use media::{MediaElement, MediaErrorCode, MediaEvent, MediaListener, NetworkState, ReadyState};
pub use network::{
    FetchError, FetchFn, FetchFuture, FetchRequest, FetchResponse, NetworkSurface,
    ResourceCallback, ResourceEntry, ResponseType, XhrCompletion, XhrOutcome, XhrRequest,
    XhrSendFn,
};
pub use page::{ActivityCallback, ActivityProvider, DebugSurface, PageHost, PageLocation};
pub use player::{DispatchFn, PauseFn, Player, PlayerState};
pub use selector::{Selector, SelectorError};
pub use storage::KvStorage;
