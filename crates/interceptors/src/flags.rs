//! Experiment-flag suppression on the page's config object.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};

use diag_store::DiagStore;
use page_host::{ConfigSetFn, ConfigWrite, HostConfig};

use crate::decorator::{install_once, InstallOutcome};
use crate::errors::InterceptError;
use crate::marks::{PatchMarks, PatchSurface};

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct FlagPolicy {
    /// Keys forced to `false` wherever they appear.
    #[serde(default = "FlagPolicy::default_disabled")]
    pub disabled: Vec<String>,
    /// Data-map keys holding flag mappings.
    #[serde(default = "FlagPolicy::default_containers")]
    pub containers: Vec<String>,
}

impl FlagPolicy {
    fn default_disabled() -> Vec<String> {
        [
            "check_user_lact_at_prompt_shown_time_on_web",
            "enable_time_out_messages",
            "kevlar_autonav_popup_filtering",
        ]
        .into_iter()
        .map(String::from)
        .collect()
    }

    fn default_containers() -> Vec<String> {
        ["EXPERIMENT_FLAGS", "EXPERIMENTS_FORCED_FLAGS"]
            .into_iter()
            .map(String::from)
            .collect()
    }

    /// Force listed keys already present in `flags` to `false`.
    ///
    /// Returns the keys whose value was not `false` before. Non-object values are left alone.
    pub fn disable_in(&self, flags: &mut Value) -> Vec<String> {
        let Value::Object(map) = flags else {
            return Vec::new();
        };
        let mut changed = Vec::new();
        for key in &self.disabled {
            if let Some(value) = map.get_mut(key) {
                if *value != Value::Bool(false) {
                    changed.push(key.clone());
                }
                *value = Value::Bool(false);
            }
        }
        changed
    }

    /// Apply [`disable_in`](Self::disable_in) to every container found in `data`.
    pub fn disable_containers(&self, data: &mut Map<String, Value>) -> Vec<String> {
        let mut changed = Vec::new();
        for container in &self.containers {
            if let Some(flags) = data.get_mut(container) {
                changed.extend(self.disable_in(flags));
            }
        }
        changed
    }

    fn scrub_write(&self, write: &mut ConfigWrite) -> Vec<String> {
        match write {
            ConfigWrite::Object(values) => self.disable_containers(values),
            ConfigWrite::Entry { key, value } if self.containers.contains(key) => {
                self.disable_in(value)
            }
            ConfigWrite::Entry { .. } => Vec::new(),
        }
    }
}

impl Default for FlagPolicy {
    fn default() -> Self {
        Self {
            disabled: Self::default_disabled(),
            containers: Self::default_containers(),
        }
    }
}

fn report(diag: &DiagStore, changed: Vec<String>) {
    if !changed.is_empty() {
        diag.record("flags_disabled", json!({ "keys": changed }));
    }
}

/// Scrub the current data snapshot, then decorate `set` once.
///
/// The snapshot pass runs on every call so flags injected outside `set` are caught too.
pub fn install_config_patch(
    marks: &PatchMarks,
    policy: &Arc<FlagPolicy>,
    diag: &Arc<DiagStore>,
    config: &HostConfig,
) -> Result<InstallOutcome, InterceptError> {
    if let Some(changed) = config.with_data_mut(|data| policy.disable_containers(data)) {
        report(diag, changed);
    }

    install_once(marks, PatchSurface::ConfigSet, config.setter(), |original| {
        let policy = Arc::clone(policy);
        let diag = Arc::clone(diag);
        Arc::new(move |mut write: ConfigWrite| {
            report(&diag, policy.scrub_write(&mut write));
            original(write)
        }) as ConfigSetFn
    })
}
