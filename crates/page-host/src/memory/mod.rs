//! In-process host used by tests and the scenario simulator.
//!
//! Every object records what the guard did to it (clicks, removals, play/seek requests,
//! pointer events) so callers can assert on the effects.

mod media;
mod node;
mod page;
mod player;

pub use media::{MediaState, MemoryMedia};
pub use node::{ClickHandler, MemoryNode, NodeBuilder};
pub use page::{FrameContext, MemoryDocument, MemoryPage, MemoryPageBuilder, MemoryStorage};
pub use player::MemoryPlayer;
