pub mod labels;
pub mod metrics;
pub mod policy;
pub mod tracing;

pub use labels::LabelMap;
pub use policy::{ObsPolicyView, PolicyHandle};
