#![allow(dead_code)]

pub mod clock;
pub mod slot;

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

use thiserror::Error;

pub use clock::{Clock, ManualClock, SharedClock, SystemClock};
pub use slot::{CapabilitySlot, SlotId};

/// Shared message error for the guard crates.
#[derive(Debug, Error, Clone)]
pub enum GuardError {
    #[error("{message}")]
    Message { message: String },
}

impl GuardError {
    pub fn new(message: impl Into<String>) -> Self {
        Self::Message {
            message: message.into(),
        }
    }
}

static NEXT_NODE_ID: AtomicU64 = AtomicU64::new(1);

/// Identity of a host node (element, media element, player container).
#[cfg_attr(feature = "serde-full", derive(serde::Serialize, serde::Deserialize))]
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub u64);

impl NodeId {
    pub fn new() -> Self {
        Self(NEXT_NODE_ID.fetch_add(1, Ordering::Relaxed))
    }
}

impl Default for NodeId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "node#{}", self.0)
    }
}

/// Truncate `value` to `max` characters, appending `...` when something was cut.
pub fn short_text(value: &str, max: usize) -> String {
    if value.chars().count() > max {
        let mut out: String = value.chars().take(max).collect();
        out.push_str("...");
        out
    } else {
        value.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn node_ids_are_unique() {
        let a = NodeId::new();
        let b = NodeId::new();
        assert_ne!(a, b);
        assert!(b.0 > a.0);
    }

    #[test]
    fn short_text_marks_truncation() {
        assert_eq!(short_text("abc", 5), "abc");
        assert_eq!(short_text("abcdef", 3), "abc...");
        assert_eq!(short_text("再生が中断されています", 4), "再生が中...");
    }
}
