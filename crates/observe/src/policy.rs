use once_cell::sync::OnceCell;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ObsPolicyView {
    #[serde(default = "ObsPolicyView::default_true")]
    pub enable_metrics: bool,
    #[serde(default = "ObsPolicyView::default_true")]
    pub enable_tracing: bool,
    /// Filter used when neither `RUST_LOG` nor an explicit level is given.
    #[serde(default = "ObsPolicyView::default_filter")]
    pub default_filter: String,
    #[serde(default)]
    pub ansi: bool,
    /// Maximum number of labels kept per series.
    #[serde(default = "ObsPolicyView::default_label_limit")]
    pub label_limit: usize,
    #[serde(default = "ObsPolicyView::default_label_value_max")]
    pub label_value_max: usize,
}

impl ObsPolicyView {
    fn default_true() -> bool {
        true
    }

    fn default_filter() -> String {
        "warn".into()
    }

    fn default_label_limit() -> usize {
        8
    }

    fn default_label_value_max() -> usize {
        64
    }
}

impl Default for ObsPolicyView {
    fn default() -> Self {
        Self {
            enable_metrics: true,
            enable_tracing: true,
            default_filter: Self::default_filter(),
            ansi: false,
            label_limit: Self::default_label_limit(),
            label_value_max: Self::default_label_value_max(),
        }
    }
}

static GLOBAL_POLICY: OnceCell<Arc<RwLock<ObsPolicyView>>> = OnceCell::new();

#[derive(Clone)]
pub struct PolicyHandle {
    inner: Arc<RwLock<ObsPolicyView>>,
}

impl PolicyHandle {
    pub fn get() -> Self {
        let cell = GLOBAL_POLICY.get_or_init(|| Arc::new(RwLock::new(ObsPolicyView::default())));
        Self {
            inner: Arc::clone(cell),
        }
    }

    pub fn snapshot(&self) -> ObsPolicyView {
        self.inner.read().clone()
    }

    pub fn update(&self, view: ObsPolicyView) {
        *self.inner.write() = view;
    }
}

pub fn set_policy(view: ObsPolicyView) {
    PolicyHandle::get().update(view);
}

pub fn current_policy() -> ObsPolicyView {
    PolicyHandle::get().snapshot()
}
