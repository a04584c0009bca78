//! Network tap for playback-related traffic.
//!
//! The tap produces decorators for the page's fetch and request-object entry points plus a
//! resource-timing callback. Interesting requests are logged to the diagnostic store and
//! counted; every request, interesting or not, passes through with its result untouched.

pub mod config;

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use futures::FutureExt;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use serde_json::json;

use diag_store::DiagStore;
use page_host::{
    FetchFn, FetchRequest, ResourceCallback, ResourceEntry, XhrCompletion, XhrOutcome,
    XhrRequest, XhrSendFn,
};
use playguard_core_types::{short_text, SharedClock};

use crate::config::TapConfig;

/// Cumulative counters for interesting requests.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NetworkSnapshot {
    pub req: u64,
    pub res2xx: u64,
    pub res4xx: u64,
    pub res5xx: u64,
    pub failed: u64,
    pub inflight: u64,
    pub quiet: bool,
    pub since_last_activity_ms: u64,
}

#[derive(Clone, Debug)]
pub enum TapEvent {
    RequestWillBeSent,
    ResponseReceived { status: u16 },
    LoadingFinished,
    LoadingFailed,
}

#[derive(Debug)]
struct Counters {
    requests: u64,
    res2xx: u64,
    res4xx: u64,
    res5xx: u64,
    failed: u64,
    inflight: u64,
    last_activity_ms: i64,
}

impl Counters {
    fn new(now_ms: i64) -> Self {
        Self {
            requests: 0,
            res2xx: 0,
            res4xx: 0,
            res5xx: 0,
            failed: 0,
            inflight: 0,
            last_activity_ms: now_ms,
        }
    }

    fn register(&mut self, event: &TapEvent, now_ms: i64) {
        match event {
            TapEvent::RequestWillBeSent => {
                self.requests += 1;
                self.inflight += 1;
            }
            TapEvent::ResponseReceived { status } => match *status {
                200..=299 => self.res2xx += 1,
                400..=499 => self.res4xx += 1,
                500..=599 => self.res5xx += 1,
                _ => {}
            },
            TapEvent::LoadingFinished => {
                self.inflight = self.inflight.saturating_sub(1);
            }
            TapEvent::LoadingFailed => {
                self.failed += 1;
                self.inflight = self.inflight.saturating_sub(1);
            }
        }
        self.last_activity_ms = now_ms;
    }

    fn snapshot(&self, now_ms: i64, config: &TapConfig) -> NetworkSnapshot {
        let since_last = now_ms.saturating_sub(self.last_activity_ms).max(0) as u64;
        NetworkSnapshot {
            req: self.requests,
            res2xx: self.res2xx,
            res4xx: self.res4xx,
            res5xx: self.res5xx,
            failed: self.failed,
            inflight: self.inflight,
            quiet: self.inflight == 0 && since_last >= config.quiet_window_ms,
            since_last_activity_ms: since_last,
        }
    }
}

pub struct NetworkTap {
    config: TapConfig,
    counters: Mutex<Counters>,
    diag: Arc<DiagStore>,
    clock: SharedClock,
}

impl NetworkTap {
    pub fn new(config: TapConfig, diag: Arc<DiagStore>, clock: SharedClock) -> Arc<Self> {
        let now = clock.now_ms();
        Arc::new(Self {
            config,
            counters: Mutex::new(Counters::new(now)),
            diag,
            clock,
        })
    }

    pub fn config(&self) -> &TapConfig {
        &self.config
    }

    pub fn is_interesting(&self, url: &str) -> bool {
        let text = url.to_lowercase();
        self.config
            .interesting_tokens
            .iter()
            .any(|token| text.contains(token.as_str()))
    }

    pub fn ingest(&self, event: TapEvent) {
        let now = self.clock.now_ms();
        self.counters.lock().register(&event, now);
    }

    pub fn snapshot(&self) -> NetworkSnapshot {
        let now = self.clock.now_ms();
        self.counters.lock().snapshot(now, &self.config)
    }

    fn short_url(&self, url: &str) -> String {
        short_text(url, self.config.url_max)
    }

    /// Wraps a fetch entry point. The returned future resolves or rejects exactly like the
    /// original one.
    pub fn wrap_fetch(self: &Arc<Self>, original: FetchFn) -> FetchFn {
        let tap = Arc::clone(self);
        Arc::new(move |request: FetchRequest| {
            let url = request.url.clone();
            let method = request.effective_method();
            let logged = tap.is_interesting(&url);
            if logged {
                tap.ingest(TapEvent::RequestWillBeSent);
                tap.diag.record(
                    "fetch_request",
                    json!({ "method": method, "url": tap.short_url(&url) }),
                );
            }

            let pending = original(request);
            let tap = Arc::clone(&tap);
            async move {
                let result = pending.await;
                if logged {
                    match &result {
                        Ok(response) => {
                            tap.ingest(TapEvent::ResponseReceived {
                                status: response.status,
                            });
                            tap.ingest(TapEvent::LoadingFinished);
                            tap.diag.record(
                                "fetch_response",
                                json!({
                                    "method": method,
                                    "url": tap.short_url(&url),
                                    "status": response.status,
                                    "ok": response.ok,
                                    "type": response.kind.as_str(),
                                }),
                            );
                        }
                        Err(err) => {
                            tracing::debug!(%method, error = %err.message, "intercepted fetch failed");
                            tap.ingest(TapEvent::LoadingFailed);
                            tap.diag.record(
                                "fetch_error",
                                json!({
                                    "method": method,
                                    "url": tap.short_url(&url),
                                    "error": short_text(&err.message, tap.config.error_max),
                                }),
                            );
                        }
                    }
                }
                result
            }
            .boxed()
        })
    }

    /// Wraps a request-object send. The caller's completion always runs after logging.
    pub fn wrap_xhr(self: &Arc<Self>, original: XhrSendFn) -> XhrSendFn {
        let tap = Arc::clone(self);
        Arc::new(move |request: XhrRequest, completion: XhrCompletion| {
            let logged = tap.is_interesting(&request.url);
            if !logged {
                return original(request, completion);
            }

            tap.ingest(TapEvent::RequestWillBeSent);
            tap.diag.record(
                "xhr_request",
                json!({ "method": request.method, "url": tap.short_url(&request.url) }),
            );

            let observer = Arc::clone(&tap);
            let method = request.method.clone();
            let url = observer.short_url(&request.url);
            let settled = Arc::new(AtomicBool::new(false));
            let completed = Arc::clone(&settled);
            let wrapped: XhrCompletion = Box::new(move |outcome: XhrOutcome| {
                completed.store(true, Ordering::SeqCst);
                if outcome.failed {
                    observer.ingest(TapEvent::LoadingFailed);
                    observer.diag.record(
                        "xhr_error",
                        json!({ "method": method, "url": url }),
                    );
                } else {
                    observer.ingest(TapEvent::ResponseReceived {
                        status: outcome.status,
                    });
                    observer.ingest(TapEvent::LoadingFinished);
                }
                observer.diag.record(
                    "xhr_response",
                    json!({ "method": method, "url": url, "status": outcome.status }),
                );
                completion(outcome);
            });
            let method = request.method.clone();
            let url = tap.short_url(&request.url);
            let result = original(request, wrapped);
            // A send that throws before completing still has to leave the in-flight count.
            if let Err(err) = &result {
                if !settled.load(Ordering::SeqCst) {
                    tap.ingest(TapEvent::LoadingFailed);
                    tap.diag.record(
                        "xhr_error",
                        json!({
                            "method": method,
                            "url": url,
                            "error": short_text(&err.to_string(), tap.config.error_max),
                        }),
                    );
                }
            }
            result
        })
    }

    /// Resource-timing callback logging interesting entries.
    pub fn resource_callback(self: &Arc<Self>) -> ResourceCallback {
        let tap = Arc::clone(self);
        Arc::new(move |entries: &[ResourceEntry]| {
            for entry in entries {
                if !tap.is_interesting(&entry.name) {
                    continue;
                }
                tap.diag.record(
                    "resource",
                    json!({
                        "name": tap.short_url(&entry.name),
                        "initiatorType": entry.initiator_type,
                        "duration": entry.duration_ms.round() as i64,
                        "transferSize": entry.transfer_size,
                        "encodedBodySize": entry.encoded_body_size,
                    }),
                );
            }
        })
    }
}

impl std::fmt::Debug for NetworkTap {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NetworkTap")
            .field("config", &self.config)
            .field("counters", &*self.counters.lock())
            .finish()
    }
}
