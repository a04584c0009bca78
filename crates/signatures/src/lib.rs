//! Interruption signatures and the pure matching rules built on them.
//!
//! Everything site-specific about *what* an interruption looks like lives here, so the tables
//! can change without touching detection or recovery.

pub mod matcher;
pub mod signature;

pub use matcher::{payload_text, Classification, PatternMatcher};
pub use signature::{
    load_signature_from_path, load_signature_from_reader, parse_signature_str,
    InterruptionSignature, SignatureError,
};
