//! The three event sources feeding the guard, and the queue between them and the consumer.

use std::collections::VecDeque;

use serde::{Deserialize, Serialize};
use tokio::sync::mpsc::{self, error::TryRecvError, UnboundedReceiver, UnboundedSender};

/// In-page navigation notifications published by the site.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
pub enum NavigationEvent {
    #[serde(rename = "yt-navigate-finish")]
    NavigateFinish,
    #[serde(rename = "yt-page-data-updated")]
    PageDataUpdated,
}

impl NavigationEvent {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::NavigateFinish => "yt-navigate-finish",
            Self::PageDataUpdated => "yt-page-data-updated",
        }
    }
}

#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "kind", content = "event")]
pub enum Trigger {
    /// Periodic full tick.
    Timer,
    /// Subtree change; runs overlay handling only.
    Mutation,
    Navigation(NavigationEvent),
}

impl Trigger {
    pub fn label(&self) -> &'static str {
        match self {
            Self::Timer => "timer",
            Self::Mutation => "mutation",
            Self::Navigation(_) => "navigation",
        }
    }
}

#[derive(Clone, Debug)]
pub struct TriggerSender {
    tx: UnboundedSender<Trigger>,
}

impl TriggerSender {
    /// Returns `false` once the consumer is gone.
    pub fn notify(&self, trigger: Trigger) -> bool {
        self.tx.send(trigger).is_ok()
    }
}

pub fn trigger_channel() -> (TriggerSender, UnboundedReceiver<Trigger>) {
    let (tx, rx) = mpsc::unbounded_channel();
    (TriggerSender { tx }, rx)
}

/// Append everything currently queued to `batch`, keeping a single pending mutation.
///
/// A mutation is dropped when an unprocessed mutation is already waiting in `batch`; other
/// triggers keep their order.
pub fn drain_coalesced(rx: &mut UnboundedReceiver<Trigger>, batch: &mut VecDeque<Trigger>) {
    loop {
        match rx.try_recv() {
            Ok(trigger) => push_coalesced(batch, trigger),
            Err(TryRecvError::Empty) | Err(TryRecvError::Disconnected) => break,
        }
    }
}

pub fn push_coalesced(batch: &mut VecDeque<Trigger>, trigger: Trigger) {
    if trigger == Trigger::Mutation && batch.contains(&Trigger::Mutation) {
        return;
    }
    batch.push_back(trigger);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mutation_bursts_collapse_to_one() {
        let (tx, mut rx) = trigger_channel();
        for _ in 0..5 {
            tx.notify(Trigger::Mutation);
        }
        tx.notify(Trigger::Navigation(NavigationEvent::NavigateFinish));
        tx.notify(Trigger::Mutation);
        tx.notify(Trigger::Timer);

        let mut batch = VecDeque::new();
        drain_coalesced(&mut rx, &mut batch);
        assert_eq!(
            batch.into_iter().collect::<Vec<_>>(),
            vec![
                Trigger::Mutation,
                Trigger::Navigation(NavigationEvent::NavigateFinish),
                Trigger::Timer,
            ]
        );
    }

    #[test]
    fn notify_reports_a_closed_queue() {
        let (tx, rx) = trigger_channel();
        drop(rx);
        assert!(!tx.notify(Trigger::Timer));
    }
}
