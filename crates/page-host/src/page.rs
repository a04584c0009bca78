//! Top-level page contract.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use url::Url;

use crate::config_object::HostConfig;
use crate::dom::Document;
use crate::error::HostError;
use crate::network::{NetworkSurface, ResourceCallback};
use crate::storage::KvStorage;

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageLocation {
    pub href: String,
    pub hostname: String,
    pub pathname: String,
}

impl PageLocation {
    /// Parse an absolute URL; unparsable input keeps the raw href with empty parts.
    pub fn parse(href: &str) -> Self {
        match Url::parse(href) {
            Ok(url) => Self {
                href: href.to_string(),
                hostname: url.host_str().unwrap_or_default().to_string(),
                pathname: url.path().to_string(),
            },
            Err(_) => Self {
                href: href.to_string(),
                ..Default::default()
            },
        }
    }
}

/// Returns the value the page should see as "last user activity", in epoch milliseconds.
pub type ActivityProvider = Arc<dyn Fn() -> i64 + Send + Sync>;
pub type ActivityCallback = Arc<dyn Fn() + Send + Sync>;

/// Read-only inspection surface published on the page's global object.
pub trait DebugSurface: Send + Sync {
    fn snapshot(&self) -> Vec<Value>;
    fn dump(&self) -> Vec<Value>;
    fn enabled(&self) -> bool;
}

pub trait PageHost: Send + Sync {
    fn location(&self) -> PageLocation;
    /// `Err` when the check itself is blocked (cross-origin parent).
    fn is_top_level(&self) -> Result<bool, HostError>;
    fn document(&self) -> Arc<dyn Document>;
    fn network(&self) -> Option<Arc<NetworkSurface>>;
    fn config_object(&self) -> Option<Arc<HostConfig>>;
    fn storage(&self) -> Result<Arc<dyn KvStorage>, HostError>;
    fn user_agent(&self) -> String;
    /// Replace the page's last-activity signal with a live provider.
    fn pin_last_activity(&self, provider: ActivityProvider) -> Result<(), HostError>;
    fn activity_callback(&self) -> Option<ActivityCallback>;
    fn observe_resources(&self, callback: ResourceCallback) -> Result<(), HostError>;
    fn expose_debug_surface(&self, surface: Arc<dyn DebugSurface>) -> Result<(), HostError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_watch_location() {
        let loc = PageLocation::parse("https://www.youtube.com/watch?v=abc");
        assert_eq!(loc.hostname, "www.youtube.com");
        assert_eq!(loc.pathname, "/watch");
        let bad = PageLocation::parse("not a url");
        assert!(bad.hostname.is_empty());
    }
}
