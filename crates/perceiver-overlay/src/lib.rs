//! DOM scanner: finds overlay candidates, the media element and the player container.
//!
//! Nothing here mutates the page.

pub mod model;
pub mod scanner;

pub use model::{CandidateOverlay, OverlayReport};
pub use scanner::OverlayScanner;
