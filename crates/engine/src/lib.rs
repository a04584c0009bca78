//! Detection and recovery engine for injected playback-interruption overlays.
//!
//! [`Guard`] is the single consumer of three trigger sources (timer, DOM mutation, in-page
//! navigation). A full tick re-applies the API patches, clears interruption overlays and runs
//! the [`HealthMonitor`]; when the monitor flags a stall the [`RecoveryOrchestrator`] runs its
//! bounded step sequence. [`scheduler::spawn_guard`] drives a guard on tokio.

pub mod activation;
pub mod config;
pub mod context;
pub mod errors;
pub mod guard;
pub mod health;
pub mod recovery;
pub mod scheduler;
pub mod trigger;

pub use activation::{check_activation, on_watch_page, Activation};
pub use config::{EngineConfig, GuardSettings};
pub use context::GuardContext;
pub use errors::EngineError;
pub use guard::{Guard, TickReport, VERSION_ATTRIBUTE};
pub use health::{BlockSignals, HealthCheck, HealthMonitor, HealthVerdict, PlaybackHealthState};
pub use recovery::{DialogSweep, RecoveryOrchestrator, RecoveryReport, RecoveryStep, StepOutcome};
pub use scheduler::{spawn_guard, ReportSink, SchedulerHandle};
pub use trigger::{
    drain_coalesced, push_coalesced, trigger_channel, NavigationEvent, Trigger, TriggerSender,
};
