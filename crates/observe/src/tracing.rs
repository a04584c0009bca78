use crate::policy::current_policy;
use once_cell::sync::OnceCell;
use tracing::{span, Level, Span};
use tracing_subscriber::{fmt, layer::SubscriberExt, EnvFilter, Registry};

static INIT: OnceCell<()> = OnceCell::new();

/// Install the global subscriber once. `level` wins over `RUST_LOG`, which wins over policy.
pub fn init_tracing(level: Option<&str>) {
    INIT.get_or_init(|| {
        let policy = current_policy();
        if !policy.enable_tracing {
            return;
        }
        let filter = match level {
            Some(level) => EnvFilter::try_new(level).ok(),
            None => EnvFilter::try_from_default_env().ok(),
        }
        .unwrap_or_else(|| EnvFilter::new(&policy.default_filter));
        let fmt_layer = fmt::layer()
            .with_ansi(policy.ansi)
            .with_target(true)
            .with_writer(std::io::stderr);
        let subscriber = Registry::default().with(filter).with(fmt_layer);
        let _ = tracing::subscriber::set_global_default(subscriber);
    });
}

pub fn tick_span(trigger: &str) -> Span {
    span!(Level::DEBUG, "tick", trigger = %trigger, latency_us = tracing::field::Empty)
}

pub fn observe_latency(span: &Span, latency_us: u64) {
    span.record("latency_us", latency_us);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn init_is_idempotent() {
        init_tracing(Some("debug"));
        init_tracing(None);
        let span = tick_span("timer");
        observe_latency(&span, 42);
        span.in_scope(|| tracing::debug!("within span"));
    }
}
