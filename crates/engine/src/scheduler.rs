//! Trigger scheduler: a periodic timer plus queued mutation/navigation signals, consumed by a
//! single task so only one trigger is ever being handled.

use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc::UnboundedReceiver;
use tokio::task::JoinHandle;
use tokio::time::{interval, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

use crate::errors::EngineError;
use crate::guard::{Guard, TickReport};
use crate::trigger::{drain_coalesced, push_coalesced, trigger_channel, Trigger, TriggerSender};

/// Callback receiving every report the consumer produces.
pub type ReportSink = Arc<dyn Fn(&TickReport) + Send + Sync>;

/// Handle returned by [`spawn_guard`] for lifecycle control.
pub struct SchedulerHandle {
    cancel: CancellationToken,
    sender: TriggerSender,
    task: Option<JoinHandle<()>>,
}

impl SchedulerHandle {
    /// Queue for navigation signals (and manual triggers).
    pub fn sender(&self) -> TriggerSender {
        self.sender.clone()
    }

    pub fn notify(&self, trigger: Trigger) -> bool {
        self.sender.notify(trigger)
    }

    /// Stop the consumer and wait for the trigger in progress to finish.
    pub async fn shutdown(mut self) -> Result<(), EngineError> {
        self.cancel.cancel();
        if let Some(task) = self.task.take() {
            match task.await {
                Ok(()) => Ok(()),
                Err(err) if err.is_cancelled() => Ok(()),
                Err(err) => Err(err.into()),
            }
        } else {
            Ok(())
        }
    }
}

impl Drop for SchedulerHandle {
    fn drop(&mut self) {
        self.cancel.cancel();
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}

/// Start the guard and drive it from the timer and the trigger queue.
///
/// The first timer tick fires immediately. Fails when the page is not an eligible context.
pub fn spawn_guard(guard: Arc<Guard>, sink: Option<ReportSink>) -> Result<SchedulerHandle, EngineError> {
    guard.start()?;
    let (sender, rx) = trigger_channel();
    if let Err(err) = guard.attach_mutation_observer(sender.clone()) {
        tracing::warn!(error = %err, "mutation observer unavailable; relying on the timer");
    }

    let cancel = CancellationToken::new();
    let loop_token = cancel.clone();
    let period = Duration::from_millis(guard.context().config.tick_interval_ms.max(1));
    let task = tokio::spawn(consume(guard, rx, period, loop_token, sink));

    Ok(SchedulerHandle {
        cancel,
        sender,
        task: Some(task),
    })
}

async fn consume(
    guard: Arc<Guard>,
    mut rx: UnboundedReceiver<Trigger>,
    period: Duration,
    cancel: CancellationToken,
    sink: Option<ReportSink>,
) {
    let mut ticker = interval(period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
    let mut pending: VecDeque<Trigger> = VecDeque::new();

    loop {
        if pending.is_empty() {
            tokio::select! {
                biased;
                _ = cancel.cancelled() => break,
                _ = ticker.tick() => pending.push_back(Trigger::Timer),
                received = rx.recv() => match received {
                    Some(trigger) => push_coalesced(&mut pending, trigger),
                    None => break,
                },
            }
        }
        drain_coalesced(&mut rx, &mut pending);

        if let Some(trigger) = pending.pop_front() {
            let report = guard.handle(trigger);
            if let Some(sink) = &sink {
                sink(&report);
            }
        }
        tokio::task::yield_now().await;
    }
    tracing::debug!("guard scheduler stopped");
}
