use std::env;

use anyhow::{Context, Result};
use tracing::Level;

use playguard_observe::policy::set_policy;
use playguard_observe::tracing::init_tracing;
use playguard_observe::ObsPolicyView;

/// Publishes the observability policy and installs the subscriber on stderr, so structured
/// output on stdout stays parseable. `RUST_LOG` takes precedence over `level`.
pub fn init_logging(level: &str, policy: &ObsPolicyView) -> Result<()> {
    let level: Level = level.parse().context("Invalid log level")?;
    set_policy(policy.clone());
    let explicit = env::var_os("RUST_LOG")
        .is_none()
        .then(|| level.to_string().to_lowercase());
    init_tracing(explicit.as_deref());
    Ok(())
}
