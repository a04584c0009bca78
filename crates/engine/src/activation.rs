//! Context checks deciding whether the guard runs at all.

use std::fmt;

use serde::Serialize;

use page_host::{PageHost, PageLocation};

use crate::config::EngineConfig;

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case", tag = "state", content = "detail")]
pub enum Activation {
    Active,
    Embedded,
    /// The frame check itself was blocked, which only happens inside a foreign parent.
    CrossOrigin,
    ForeignHost(String),
}

impl Activation {
    pub fn is_active(&self) -> bool {
        matches!(self, Self::Active)
    }
}

impl fmt::Display for Activation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Active => f.write_str("active"),
            Self::Embedded => f.write_str("embedded frame"),
            Self::CrossOrigin => f.write_str("cross-origin frame"),
            Self::ForeignHost(host) => write!(f, "foreign host `{host}`"),
        }
    }
}

/// Top-level frame on the configured host. Evaluated once, at start-up.
pub fn check_activation(page: &dyn PageHost, config: &EngineConfig) -> Activation {
    match page.is_top_level() {
        Ok(true) => {}
        Ok(false) => return Activation::Embedded,
        Err(err) => {
            tracing::debug!(error = %err, "frame check blocked");
            return Activation::CrossOrigin;
        }
    }
    let location = page.location();
    if location.hostname != config.site_host {
        return Activation::ForeignHost(location.hostname);
    }
    Activation::Active
}

/// Playback pages are re-checked on every trigger because navigation is in-page.
pub fn on_watch_page(location: &PageLocation, config: &EngineConfig) -> bool {
    location.pathname.starts_with(&config.watch_path_prefix)
}
