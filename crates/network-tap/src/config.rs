//! Configuration types for the network tap.

use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TapConfig {
    /// Lower-case URL fragments that mark a request as worth logging.
    #[serde(default = "TapConfig::default_interesting_tokens")]
    pub interesting_tokens: Vec<String>,
    #[serde(default = "TapConfig::default_url_max")]
    pub url_max: usize,
    #[serde(default = "TapConfig::default_error_max")]
    pub error_max: usize,
    /// No in-flight requests and no activity for this long counts as quiet.
    #[serde(default = "TapConfig::default_quiet_window_ms")]
    pub quiet_window_ms: u64,
}

impl TapConfig {
    fn default_interesting_tokens() -> Vec<String> {
        [
            "videoplayback",
            "initplayback",
            "/youtubei/v1/player",
            "googlevideo.com",
            "3037019",
            "check_ad_blockers",
        ]
        .into_iter()
        .map(String::from)
        .collect()
    }

    fn default_url_max() -> usize {
        260
    }

    fn default_error_max() -> usize {
        220
    }

    fn default_quiet_window_ms() -> u64 {
        1000
    }
}

impl Default for TapConfig {
    fn default() -> Self {
        Self {
            interesting_tokens: Self::default_interesting_tokens(),
            url_max: Self::default_url_max(),
            error_max: Self::default_error_max(),
            quiet_window_ms: Self::default_quiet_window_ms(),
        }
    }
}
