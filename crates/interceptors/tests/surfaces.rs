use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use futures::FutureExt;
use serde_json::{json, Map, Value};

use diag_store::{DiagCfg, DiagStore};
use interrupt_signatures::PatternMatcher;
use network_tap::{config::TapConfig, NetworkTap};
use page_host::memory::{MemoryMedia, MemoryNode, MemoryPage, MemoryPlayer, MemoryStorage};
use page_host::{
    ConfigWrite, Document, FetchError, FetchFn, FetchRequest, FetchResponse, HostConfig,
    HostError, KvStorage, MediaElement, MediaErrorCode, MediaEvent, MediaListener, NetworkState,
    NetworkSurface, PageHost, ReadyState,
};
use page_interceptors::{
    bind_media_listeners, FlagPolicy, InstallOutcome, Interceptors, PatchMarks, PatchSurface,
};
use perceiver_overlay::OverlayScanner;
use playguard_core_types::{ManualClock, NodeId};

const WATCH: &str = "https://www.youtube.com/watch?v=abc";

struct Rig {
    interceptors: Interceptors,
    diag: Arc<DiagStore>,
}

fn rig() -> Rig {
    let clock = Arc::new(ManualClock::default());
    let diag = Arc::new(DiagStore::open(
        DiagCfg::default(),
        Ok(MemoryStorage::new() as Arc<dyn KvStorage>),
        clock.clone(),
    ));
    let tap = NetworkTap::new(TapConfig::default(), diag.clone(), clock);
    let scanner = OverlayScanner::new(Arc::new(PatternMatcher::default()));
    let interceptors = Interceptors::new(
        Arc::new(PatchMarks::new()),
        diag.clone(),
        scanner,
        tap,
        FlagPolicy::default(),
    );
    Rig { interceptors, diag }
}

fn mount_player(page: &MemoryPage, player: Arc<MemoryPlayer>, media: Arc<MemoryMedia>) {
    page.memory_document().append_to_body(
        MemoryNode::element("div")
            .attr("id", "movie_player")
            .player(player)
            .child(MemoryNode::element("video").media(media))
            .build(),
    );
}

#[test]
fn flag_disable_leaves_unrelated_flags() {
    let rig = rig();
    let mut data = Map::new();
    data.insert(
        "EXPERIMENT_FLAGS".into(),
        json!({
            "check_user_lact_at_prompt_shown_time_on_web": true,
            "unrelated_flag": true,
        }),
    );
    let page = MemoryPage::builder(WATCH)
        .config(HostConfig::new(Some(data)))
        .build();

    rig.interceptors.patch_config(page.as_ref());

    let config = page.config_object().expect("config");
    let snapshot = config.snapshot().expect("data");
    assert_eq!(
        snapshot["EXPERIMENT_FLAGS"]["check_user_lact_at_prompt_shown_time_on_web"],
        false
    );
    assert_eq!(snapshot["EXPERIMENT_FLAGS"]["unrelated_flag"], true);
    assert_eq!(rig.diag.count_of_kind("flags_disabled"), 1);

    // Later writes through `set` are scrubbed before reaching the page.
    let mut forced = Map::new();
    forced.insert(
        "EXPERIMENTS_FORCED_FLAGS".into(),
        json!({ "enable_time_out_messages": true, "other": 1 }),
    );
    config.set(ConfigWrite::Object(forced)).expect("set");
    let snapshot = config.snapshot().expect("data");
    assert_eq!(
        snapshot["EXPERIMENTS_FORCED_FLAGS"]["enable_time_out_messages"],
        false
    );
    assert_eq!(snapshot["EXPERIMENTS_FORCED_FLAGS"]["other"], 1);
    assert_eq!(rig.diag.count_of_kind("flags_disabled"), 2);
}

#[test]
fn config_set_return_value_is_preserved() {
    let rig = rig();
    let setter: page_host::ConfigSetFn = Arc::new(|_write: ConfigWrite| json!("stored"));
    let page = MemoryPage::builder(WATCH)
        .config(HostConfig::with_setter(None, Some(setter)))
        .build();
    for _ in 0..3 {
        rig.interceptors.patch_config(page.as_ref());
    }
    let config = page.config_object().expect("config");
    let result = config
        .set(ConfigWrite::Entry {
            key: "EXPERIMENT_FLAGS".into(),
            value: json!({ "kevlar_autonav_popup_filtering": true }),
        })
        .expect("set");
    assert_eq!(result, json!("stored"));
    assert_eq!(rig.interceptors.marks().count(PatchSurface::ConfigSet), 1);
    assert_eq!(rig.diag.count_of_kind("flags_disabled"), 1);
}

#[test]
fn dispatcher_swallows_interruption_events_in_one_layer() {
    let rig = rig();
    let page = MemoryPage::builder(WATCH).build();
    let media = MemoryMedia::playing(1.0);
    let player = MemoryPlayer::new(Some(media.clone()));
    mount_player(&page, player.clone(), media);

    let document: Arc<dyn Document> = page.document();
    for _ in 0..4 {
        rig.interceptors.patch_player(&document);
    }

    assert_eq!(player.dispatch("onSnackbarMessage", json!(1)), Value::Null);
    assert_eq!(
        player.dispatch(
            "innertubeCommand",
            json!({ "popup": { "text": "Playback interrupted" } })
        ),
        Value::Null
    );
    assert_eq!(player.dispatch("onStateChange", json!(1)), json!(true));
    assert_eq!(player.dispatch("onSnackbarMessage", json!(7)), json!(true));

    let delivered = player.delivered_events();
    assert_eq!(delivered.len(), 2);
    assert_eq!(delivered[0].0, "onStateChange");
    assert_eq!(rig.diag.count_of_kind("player_event_blocked"), 2);
}

#[test]
fn pause_is_blocked_only_while_overlay_present() {
    let rig = rig();
    let page = MemoryPage::builder(WATCH).build();
    let media = MemoryMedia::playing(5.0);
    let player = MemoryPlayer::new(Some(media.clone()));
    mount_player(&page, player.clone(), media.clone());
    let document: Arc<dyn Document> = page.document();
    rig.interceptors.patch_player(&document);

    let overlay = MemoryNode::element("tp-yt-paper-toast")
        .text("Experiencing interruptions?")
        .build();
    page.memory_document().append_to_body(overlay.clone());
    player.request_pause().expect("pause");
    assert_eq!(player.pause_calls(), 0);
    assert!(!media.paused());
    assert_eq!(rig.diag.count_of_kind("pause_blocked"), 1);

    page_host::DomNode::remove(overlay.as_ref()).expect("remove");
    player.request_pause().expect("pause");
    assert_eq!(player.pause_calls(), 1);
    assert!(media.paused());
}

#[test]
fn player_without_entry_points_is_skipped_quietly() {
    let rig = rig();
    let page = MemoryPage::builder(WATCH).build();
    let media = MemoryMedia::playing(0.0);
    mount_player(&page, MemoryPlayer::bare(Some(media.clone())), media);
    let document: Arc<dyn Document> = page.document();
    rig.interceptors.patch_player(&document);
    assert!(rig.interceptors.marks().is_empty());
    assert_eq!(rig.diag.count_of_kind("patch_error"), 0);
}

#[tokio::test]
async fn network_patch_passes_results_through() {
    let rig = rig();
    let fetch: FetchFn = Arc::new(|req: FetchRequest| {
        async move {
            if req.url.contains("fail") {
                Err(FetchError::new("TypeError: Failed to fetch"))
            } else {
                Ok(FetchResponse::new(req.url, 200))
            }
        }
        .boxed()
    });
    let page = MemoryPage::builder(WATCH)
        .network(NetworkSurface::new(Some(fetch), None))
        .build();
    rig.interceptors.patch_network(page.as_ref());
    rig.interceptors.patch_network(page.as_ref());

    let surface = page.network().expect("network");
    let ok = surface
        .fetch(FetchRequest::get("https://r4.googlevideo.com/videoplayback?itag=18"))
        .await
        .expect("ok");
    assert_eq!(ok.status, 200);
    let err = surface
        .fetch(FetchRequest::get("https://r4.googlevideo.com/videoplayback?fail=1"))
        .await
        .unwrap_err();
    assert_eq!(err.message, "TypeError: Failed to fetch");

    assert_eq!(rig.diag.count_of_kind("fetch_request"), 2);
    assert_eq!(rig.diag.count_of_kind("fetch_response"), 1);
    assert_eq!(rig.diag.count_of_kind("fetch_error"), 1);
    assert_eq!(rig.interceptors.marks().count(PatchSurface::Fetch), 1);
    assert_eq!(rig.interceptors.marks().count(PatchSurface::XhrSend), 0);
}

#[test]
fn media_listeners_log_snapshots_once_per_element() {
    let rig = rig();
    let media = MemoryMedia::playing(12.0);
    let element: Arc<dyn MediaElement> = media.clone();
    rig.interceptors.bind_media(&element);
    rig.interceptors.bind_media(&element);
    assert_eq!(media.listener_count(), MediaEvent::ALL.len());

    media.emit(MediaEvent::Waiting);
    media.emit(MediaEvent::Progress);
    let waiting = rig.diag.entries_of_kind("video_waiting");
    assert_eq!(waiting.len(), 1);
    assert_eq!(waiting[0].payload["currentTime"], "12.000");
    assert_eq!(waiting[0].payload["readyState"], "HAVE_ENOUGH_DATA");
    assert_eq!(waiting[0].payload["error"], Value::Null);
    assert_eq!(rig.diag.count_of_kind("video_progress"), 0);
}

/// Delegates to a memory element but rejects one `add_listener` call.
struct FlakyMedia {
    inner: Arc<MemoryMedia>,
    calls: AtomicUsize,
    fail_on: usize,
}

impl MediaElement for FlakyMedia {
    fn media_id(&self) -> NodeId {
        self.inner.media_id()
    }
    fn current_time(&self) -> f64 {
        self.inner.current_time()
    }
    fn set_current_time(&self, seconds: f64) -> Result<(), HostError> {
        self.inner.set_current_time(seconds)
    }
    fn paused(&self) -> bool {
        self.inner.paused()
    }
    fn ended(&self) -> bool {
        self.inner.ended()
    }
    fn ready_state(&self) -> ReadyState {
        self.inner.ready_state()
    }
    fn network_state(&self) -> NetworkState {
        self.inner.network_state()
    }
    fn current_src(&self) -> String {
        self.inner.current_src()
    }
    fn error(&self) -> Option<MediaErrorCode> {
        self.inner.error()
    }
    fn play(&self) -> Result<(), HostError> {
        self.inner.play()
    }
    fn add_listener(&self, event: MediaEvent, listener: MediaListener) -> Result<(), HostError> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
        if call == self.fail_on {
            return Err(HostError::rejected("listener refused"));
        }
        self.inner.add_listener(event, listener)
    }
}

#[test]
fn interrupted_listener_bind_resumes_without_doubling() {
    let rig = rig();
    let marks = PatchMarks::new();
    let inner = MemoryMedia::playing(3.0);
    let flaky: Arc<dyn MediaElement> = Arc::new(FlakyMedia {
        inner: inner.clone(),
        calls: AtomicUsize::new(0),
        fail_on: 4,
    });

    assert!(bind_media_listeners(&marks, &rig.diag, &flaky).is_err());
    assert_eq!(inner.listener_count(), 3);
    let outcome = bind_media_listeners(&marks, &rig.diag, &flaky).expect("second bind");
    assert_eq!(outcome, InstallOutcome::Installed);
    assert_eq!(inner.listener_count(), MediaEvent::ALL.len());
    assert_eq!(
        bind_media_listeners(&marks, &rig.diag, &flaky).expect("third bind"),
        InstallOutcome::AlreadyInstalled
    );

    inner.emit(MediaEvent::LoadStart);
    assert_eq!(rig.diag.count_of_kind("video_loadstart"), 1);
}

#[test]
fn resource_observer_needs_support_and_diagnostics() {
    let rig = rig();
    let unsupported = MemoryPage::builder(WATCH).resource_timing(false).build();
    rig.interceptors.install_resource_observer(unsupported.as_ref());
    assert!(!rig
        .interceptors
        .marks()
        .is_marked(PatchSurface::ResourceObserver, page_interceptors::PatchKey::Page));

    let page = MemoryPage::builder(WATCH).build();
    rig.interceptors.install_resource_observer(page.as_ref());
    rig.interceptors.install_resource_observer(page.as_ref());
    page.emit_resources(&[page_host::ResourceEntry {
        name: "https://www.youtube.com/youtubei/v1/player".into(),
        initiator_type: "fetch".into(),
        duration_ms: 40.2,
        transfer_size: 0,
        encoded_body_size: 0,
    }]);
    assert_eq!(rig.diag.count_of_kind("resource"), 1);
}
