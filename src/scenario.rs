//! Scripted page replay behind the `simulate` command.
//!
//! A [`Scenario`] describes an initial page and a list of [`Step`]s. [`Simulation`] builds
//! the page on the in-memory host, drives a [`Guard`] with a manual clock and routes the
//! mutation, navigation and timer triggers through the same coalescing queue the tokio
//! scheduler uses, one trigger at a time.

use std::collections::{BTreeMap, VecDeque};
use std::sync::Arc;

use futures::FutureExt;
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc::UnboundedReceiver;
use tracing::{debug, info, warn};

use diag_store::DiagEntry;
use network_tap::NetworkSnapshot;
use page_host::memory::{
    FrameContext, MediaState, MemoryMedia, MemoryNode, MemoryPage, MemoryPlayer,
};
use page_host::{
    DomNode, FetchError, FetchFn, FetchRequest, FetchResponse, NetworkSurface, PageHost,
    PlayerState, ReadyState,
};
use playguard_core_types::{Clock, ManualClock};
use playguard_engine::{
    drain_coalesced, trigger_channel, Activation, DialogSweep, EngineError, Guard,
    GuardSettings, NavigationEvent, RecoveryReport, TickReport, Trigger, TriggerSender,
};
use playguard_observe::metrics;

use crate::errors::ScenarioError;

pub const DEFAULT_HREF: &str = "https://www.youtube.com/watch?v=playguard";

/// Upper bound on triggers handled after a single step.
const MAX_TRIGGERS_PER_STEP: usize = 256;

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Scenario {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub page: PageSpec,
    #[serde(default)]
    pub steps: Vec<Step>,
}

impl Scenario {
    pub fn from_yaml_str(raw: &str) -> Result<Self, ScenarioError> {
        serde_yaml::from_str(raw).map_err(|err| ScenarioError::Parse(err.to_string()))
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FrameSpec {
    #[default]
    TopLevel,
    Embedded,
    CrossOrigin,
}

impl From<FrameSpec> for FrameContext {
    fn from(frame: FrameSpec) -> Self {
        match frame {
            FrameSpec::TopLevel => FrameContext::TopLevel,
            FrameSpec::Embedded => FrameContext::Embedded,
            FrameSpec::CrossOrigin => FrameContext::CrossOrigin,
        }
    }
}

/// Which player entry points the page exposes.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlayerSpec {
    #[default]
    Full,
    Bare,
    Absent,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PageSpec {
    #[serde(default = "PageSpec::default_href")]
    pub href: String,
    #[serde(default)]
    pub frame: FrameSpec,
    /// `null` mounts no media element at all.
    #[serde(default = "PageSpec::default_media")]
    pub media: Option<MediaSpec>,
    #[serde(default)]
    pub player: PlayerSpec,
    #[serde(default)]
    pub overlays: Vec<OverlaySpec>,
    #[serde(default)]
    pub network: NetworkSpec,
    /// `false` makes key-value storage unreachable.
    #[serde(default = "PageSpec::default_storage")]
    pub storage: bool,
}

impl PageSpec {
    fn default_href() -> String {
        DEFAULT_HREF.to_string()
    }

    fn default_media() -> Option<MediaSpec> {
        Some(MediaSpec::default())
    }

    fn default_storage() -> bool {
        true
    }
}

impl Default for PageSpec {
    fn default() -> Self {
        Self {
            href: Self::default_href(),
            frame: FrameSpec::default(),
            media: Self::default_media(),
            player: PlayerSpec::default(),
            overlays: Vec::new(),
            network: NetworkSpec::default(),
            storage: Self::default_storage(),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct MediaSpec {
    #[serde(default)]
    pub position: f64,
    #[serde(default)]
    pub paused: bool,
    #[serde(default)]
    pub ended: bool,
    #[serde(default = "MediaSpec::default_ready_state")]
    pub ready_state: ReadyState,
    /// Every `play()` call is rejected.
    #[serde(default)]
    pub reject_play: bool,
}

impl MediaSpec {
    fn default_ready_state() -> ReadyState {
        ReadyState::HaveEnoughData
    }

    fn build(&self) -> Arc<MemoryMedia> {
        let media = MemoryMedia::new(MediaState {
            current_time: self.position,
            paused: self.paused,
            ended: self.ended,
            ready_state: self.ready_state,
            ..MediaState::default()
        });
        media.set_reject_play(self.reject_play);
        media
    }
}

impl Default for MediaSpec {
    fn default() -> Self {
        Self {
            position: 0.0,
            paused: false,
            ended: false,
            ready_state: Self::default_ready_state(),
            reject_play: false,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct OverlaySpec {
    pub id: String,
    #[serde(default = "OverlaySpec::default_tag")]
    pub tag: String,
    #[serde(default)]
    pub text: String,
    #[serde(default)]
    pub attrs: BTreeMap<String, String>,
    #[serde(default)]
    pub buttons: Vec<ButtonSpec>,
    /// Adds an anchor with this href.
    #[serde(default)]
    pub support_link: Option<String>,
}

impl OverlaySpec {
    fn default_tag() -> String {
        "tp-yt-paper-toast".to_string()
    }

    fn build(&self) -> OverlayHandle {
        let buttons: Vec<Arc<MemoryNode>> = self.buttons.iter().map(ButtonSpec::build).collect();
        let mut builder = MemoryNode::element(&self.tag)
            .attr("data-scenario-id", &self.id)
            .text(&self.text);
        for (name, value) in &self.attrs {
            builder = builder.attr(name, value);
        }
        for button in &buttons {
            builder = builder.child_node(button.clone());
        }
        if let Some(href) = &self.support_link {
            builder = builder.child(MemoryNode::element("a").attr("href", href).text("Learn more"));
        }
        OverlayHandle {
            node: builder.build(),
            buttons,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ButtonSpec {
    pub label: String,
    #[serde(default = "ButtonSpec::default_tag")]
    pub tag: String,
    /// Clicking removes the enclosing overlay.
    #[serde(default)]
    pub dismisses: bool,
}

impl ButtonSpec {
    fn default_tag() -> String {
        "button".to_string()
    }

    fn build(&self) -> Arc<MemoryNode> {
        let builder = MemoryNode::element(&self.tag).text(&self.label);
        let builder = if self.dismisses {
            builder.on_click(|button| {
                if let Some(host) = button.parent() {
                    if let Err(err) = host.remove() {
                        debug!(?err, "overlay already detached");
                    }
                }
            })
        } else {
            builder
        };
        builder.build()
    }
}

/// What the page's own fetch entry point answers.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct NetworkSpec {
    #[serde(default = "NetworkSpec::default_status")]
    pub status: u16,
    #[serde(default)]
    pub body: String,
    /// Reject every call with this message instead of answering.
    #[serde(default)]
    pub fail_with: Option<String>,
}

impl NetworkSpec {
    fn default_status() -> u16 {
        200
    }

    fn fetch_fn(&self) -> FetchFn {
        let spec = self.clone();
        Arc::new(move |request: FetchRequest| {
            let spec = spec.clone();
            async move {
                match spec.fail_with {
                    Some(message) => Err(FetchError::new(message)),
                    None => {
                        let mut response = FetchResponse::new(request.url, spec.status);
                        response.body = spec.body.into_bytes();
                        Ok(response)
                    }
                }
            }
            .boxed()
        })
    }
}

impl Default for NetworkSpec {
    fn default() -> Self {
        Self {
            status: Self::default_status(),
            body: String::new(),
            fail_with: None,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "step", rename_all = "snake_case")]
pub enum Step {
    /// Moves the clock without handling any trigger.
    AdvanceMs { ms: i64 },
    SetPosition { seconds: f64 },
    AdvancePosition { seconds: f64 },
    SetPaused { paused: bool },
    SetReadyState { ready_state: ReadyState },
    SetPlayerState { state: PlayerState },
    AddOverlay(OverlaySpec),
    RemoveOverlay { id: String },
    Navigate {
        href: String,
        #[serde(default)]
        event: Option<NavigationEvent>,
    },
    /// Signals a subtree change without touching the document.
    Mutation,
    /// `repeat` timer ticks, `every_ms` apart. `position_step` seconds are added to the
    /// media position before each one.
    Tick {
        #[serde(default = "Step::default_every_ms")]
        every_ms: i64,
        #[serde(default = "Step::default_repeat")]
        repeat: u32,
        #[serde(default)]
        position_step: f64,
    },
    Fetch {
        url: String,
        #[serde(default)]
        method: Option<String>,
    },
}

impl Step {
    fn default_every_ms() -> i64 {
        1000
    }

    fn default_repeat() -> u32 {
        1
    }
}

struct OverlayHandle {
    node: Arc<MemoryNode>,
    buttons: Vec<Arc<MemoryNode>>,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct SimulateOptions {
    /// Include the diagnostic ring in the report.
    pub dump: bool,
    /// Include the Prometheus rendering of the metrics registry.
    pub metrics: bool,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct OverlayOutcome {
    pub id: String,
    pub clicks: usize,
    pub connected: bool,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct MediaOutcome {
    pub position: f64,
    pub paused: bool,
    pub play_calls: usize,
    pub time_writes: Vec<f64>,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct PlayerOutcome {
    pub play_calls: usize,
    pub seek_calls: Vec<(f64, bool)>,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct FetchOutcome {
    pub url: String,
    pub method: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub response: Option<FetchResponse>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct SimulationReport {
    pub name: Option<String>,
    pub activation: Activation,
    pub started_at_ms: i64,
    pub elapsed_ms: i64,
    pub steps: usize,
    /// Handled triggers per kind, including those that found nothing to do.
    pub triggers: BTreeMap<&'static str, usize>,
    pub recoveries: Vec<RecoveryReport>,
    pub dialogs: DialogSweep,
    pub overlays: Vec<OverlayOutcome>,
    pub media: Option<MediaOutcome>,
    pub player: Option<PlayerOutcome>,
    pub activity_signals: usize,
    pub fetches: Vec<FetchOutcome>,
    pub network: NetworkSnapshot,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub diagnostics: Option<Vec<DiagEntry>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metrics: Option<String>,
    #[serde(skip)]
    pub reports: Vec<TickReport>,
}

impl SimulationReport {
    pub fn overlay(&self, id: &str) -> Option<&OverlayOutcome> {
        self.overlays.iter().find(|overlay| overlay.id == id)
    }
}

pub struct Simulation {
    name: Option<String>,
    page: Arc<MemoryPage>,
    clock: Arc<ManualClock>,
    started_at: i64,
    media: Option<Arc<MemoryMedia>>,
    player: Option<Arc<MemoryPlayer>>,
    guard: Arc<Guard>,
    overlays: Vec<(String, OverlayHandle)>,
    sender: TriggerSender,
    rx: UnboundedReceiver<Trigger>,
    pending: VecDeque<Trigger>,
    reports: Vec<TickReport>,
    fetches: Vec<FetchOutcome>,
    steps: usize,
}

impl Simulation {
    pub fn new(
        scenario: &Scenario,
        settings: GuardSettings,
        clock: Arc<ManualClock>,
    ) -> Result<Self, ScenarioError> {
        let spec = &scenario.page;
        url::Url::parse(&spec.href).map_err(|source| ScenarioError::InvalidHref {
            href: spec.href.clone(),
            source,
        })?;

        let mut builder = MemoryPage::builder(&spec.href)
            .frame(spec.frame.into())
            .network(NetworkSurface::new(Some(spec.network.fetch_fn()), None));
        if !spec.storage {
            builder = builder.without_storage();
        }
        let page = builder.build();

        let media = spec.media.as_ref().map(MediaSpec::build);
        let player = match spec.player {
            PlayerSpec::Full => Some(MemoryPlayer::new(media.clone())),
            PlayerSpec::Bare => Some(MemoryPlayer::bare(media.clone())),
            PlayerSpec::Absent => None,
        };
        if media.is_some() || player.is_some() {
            let mut container = MemoryNode::element("div").attr("id", "movie_player");
            if let Some(player) = &player {
                container = container.player(player.clone());
            }
            if let Some(media) = &media {
                container = container.child(MemoryNode::element("video").media(media.clone()));
            }
            page.memory_document().append_to_body(container.build());
        }

        let mut overlays: Vec<(String, OverlayHandle)> = Vec::new();
        for overlay in &spec.overlays {
            if overlays.iter().any(|(id, _)| *id == overlay.id) {
                return Err(ScenarioError::DuplicateOverlay(overlay.id.clone()));
            }
            let handle = overlay.build();
            page.memory_document().append_to_body(handle.node.clone());
            overlays.push((overlay.id.clone(), handle));
        }

        let guard = Guard::new(page.clone(), settings, clock.clone())?;
        let (sender, rx) = trigger_channel();
        match guard.start() {
            Ok(()) => {
                if let Err(err) = guard.attach_mutation_observer(sender.clone()) {
                    warn!(?err, "mutation observer unavailable");
                }
            }
            Err(EngineError::Inactive(activation)) => {
                info!(%activation, "guard stays inactive on this page");
            }
            Err(err) => return Err(err.into()),
        }

        Ok(Self {
            name: scenario.name.clone(),
            started_at: clock.now_ms(),
            page,
            clock,
            media,
            player,
            guard,
            overlays,
            sender,
            rx,
            pending: VecDeque::new(),
            reports: Vec::new(),
            fetches: Vec::new(),
            steps: 0,
        })
    }

    pub fn guard(&self) -> &Arc<Guard> {
        &self.guard
    }

    pub fn page(&self) -> &Arc<MemoryPage> {
        &self.page
    }

    pub fn reports(&self) -> &[TickReport] {
        &self.reports
    }

    pub async fn run(
        mut self,
        steps: &[Step],
        options: SimulateOptions,
    ) -> Result<SimulationReport, ScenarioError> {
        for (index, step) in steps.iter().enumerate() {
            self.apply(index, step).await?;
        }
        Ok(self.finish(options))
    }

    pub async fn apply(&mut self, index: usize, step: &Step) -> Result<(), ScenarioError> {
        debug!(index, ?step, "scenario step");
        match step {
            Step::AdvanceMs { ms } => {
                self.clock.advance(*ms);
            }
            Step::SetPosition { seconds } => self.media_for(index)?.set_position(*seconds),
            Step::AdvancePosition { seconds } => {
                self.media_for(index)?.advance(*seconds);
            }
            Step::SetPaused { paused } => self.media_for(index)?.set_paused(*paused),
            Step::SetReadyState { ready_state } => {
                self.media_for(index)?.set_ready_state(*ready_state)
            }
            Step::SetPlayerState { state } => {
                let player = self.player.as_ref().ok_or(ScenarioError::NoPlayer { index })?;
                player.set_state(*state);
            }
            Step::AddOverlay(overlay) => {
                if self.overlays.iter().any(|(id, _)| *id == overlay.id) {
                    return Err(ScenarioError::DuplicateOverlay(overlay.id.clone()));
                }
                let handle = overlay.build();
                self.page.memory_document().append_to_body(handle.node.clone());
                self.overlays.push((overlay.id.clone(), handle));
            }
            Step::RemoveOverlay { id } => {
                let handle = self
                    .overlays
                    .iter()
                    .find(|(candidate, _)| candidate == id)
                    .map(|(_, handle)| handle)
                    .ok_or_else(|| ScenarioError::UnknownOverlay(id.clone()))?;
                if let Err(err) = handle.node.remove() {
                    debug!(%id, ?err, "overlay was already gone");
                }
            }
            Step::Navigate { href, event } => {
                self.page.navigate(href);
                self.sender.notify(Trigger::Navigation(
                    event.unwrap_or(NavigationEvent::NavigateFinish),
                ));
            }
            Step::Mutation => {
                self.sender.notify(Trigger::Mutation);
            }
            Step::Tick {
                every_ms,
                repeat,
                position_step,
            } => {
                for _ in 0..*repeat {
                    self.clock.advance(*every_ms);
                    if *position_step != 0.0 {
                        self.media_for(index)?.advance(*position_step);
                    }
                    self.sender.notify(Trigger::Timer);
                    self.drain();
                }
            }
            Step::Fetch { url, method } => self.fetch(url, method.as_deref()).await,
        }
        self.drain();
        self.steps += 1;
        Ok(())
    }

    fn media_for(&self, index: usize) -> Result<&Arc<MemoryMedia>, ScenarioError> {
        self.media.as_ref().ok_or(ScenarioError::NoMedia { index })
    }

    /// Handles everything queued so far, including triggers raised while handling.
    fn drain(&mut self) {
        let mut handled = 0usize;
        loop {
            drain_coalesced(&mut self.rx, &mut self.pending);
            let Some(trigger) = self.pending.pop_front() else {
                break;
            };
            if handled == MAX_TRIGGERS_PER_STEP {
                warn!(
                    dropped = self.pending.len() + 1,
                    "trigger budget exhausted for this step"
                );
                self.pending.clear();
                break;
            }
            handled += 1;
            let report = self.guard.handle(trigger);
            if let Some(recovery) = &report.recovery {
                info!(
                    at_ms = recovery.at_ms,
                    position = recovery.position,
                    "recovery attempted"
                );
            }
            self.reports.push(report);
        }
    }

    async fn fetch(&mut self, url: &str, method: Option<&str>) {
        let mut request = FetchRequest::get(url);
        if let Some(method) = method {
            request = request.with_init_method(method);
        }
        let method = request.effective_method();
        let outcome = match self.page.network() {
            Some(network) => match network.fetch(request).await {
                Ok(response) => FetchOutcome {
                    url: url.to_string(),
                    method,
                    response: Some(response),
                    error: None,
                },
                Err(err) => FetchOutcome {
                    url: url.to_string(),
                    method,
                    response: None,
                    error: Some(err.message),
                },
            },
            None => FetchOutcome {
                url: url.to_string(),
                method,
                response: None,
                error: Some("fetch is not available".to_string()),
            },
        };
        self.fetches.push(outcome);
    }

    pub fn finish(self, options: SimulateOptions) -> SimulationReport {
        let mut triggers: BTreeMap<&'static str, usize> = BTreeMap::new();
        let mut dialogs = DialogSweep::default();
        let mut recoveries = Vec::new();
        for report in &self.reports {
            if let Some(trigger) = &report.trigger {
                *triggers.entry(trigger.label()).or_default() += 1;
            }
            dialogs.clicked += report.dialogs.clicked;
            dialogs.removed += report.dialogs.removed;
            dialogs.removed_by_link += report.dialogs.removed_by_link;
            dialogs.handled |= report.dialogs.handled;
            if let Some(recovery) = &report.recovery {
                recoveries.push(recovery.clone());
            }
        }

        let overlays = self
            .overlays
            .iter()
            .map(|(id, handle)| OverlayOutcome {
                id: id.clone(),
                clicks: handle.node.click_count()
                    + handle.buttons.iter().map(|b| b.click_count()).sum::<usize>(),
                connected: handle.node.is_connected(),
            })
            .collect();

        let media = self.media.as_ref().map(|media| {
            let state = media.state();
            MediaOutcome {
                position: state.current_time,
                paused: state.paused,
                play_calls: media.play_calls(),
                time_writes: media.time_writes(),
            }
        });
        let player = self.player.as_ref().map(|player| PlayerOutcome {
            play_calls: player.play_calls(),
            seek_calls: player.seek_calls(),
        });

        SimulationReport {
            name: self.name,
            activation: self.guard.activation().clone(),
            started_at_ms: self.started_at,
            elapsed_ms: self.clock.now_ms() - self.started_at,
            steps: self.steps,
            triggers,
            recoveries,
            dialogs,
            overlays,
            media,
            player,
            activity_signals: self.page.activity_calls(),
            fetches: self.fetches,
            network: self.guard.context().tap().snapshot(),
            diagnostics: options.dump.then(|| self.guard.diag().entries()),
            metrics: options.metrics.then(metrics::render_prometheus),
            reports: self.reports,
        }
    }
}

/// Builds the page, replays every step and summarizes the run.
pub async fn run_scenario(
    scenario: &Scenario,
    settings: GuardSettings,
    options: SimulateOptions,
) -> Result<SimulationReport, ScenarioError> {
    let clock = Arc::new(ManualClock::default());
    let simulation = Simulation::new(scenario, settings, clock)?;
    simulation.run(&scenario.steps, options).await
}
