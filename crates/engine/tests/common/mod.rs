#![allow(dead_code)]

use std::sync::Arc;

use page_host::memory::{MediaState, MemoryMedia, MemoryNode, MemoryPage, MemoryPlayer};
use playguard_core_types::ManualClock;
use playguard_engine::{Guard, GuardSettings};

pub const WATCH: &str = "https://www.youtube.com/watch?v=abc";

pub struct Rig {
    pub page: Arc<MemoryPage>,
    pub clock: Arc<ManualClock>,
    pub media: Arc<MemoryMedia>,
    pub player: Arc<MemoryPlayer>,
    pub guard: Arc<Guard>,
}

impl Rig {
    pub fn tick_after(&self, delta_ms: i64) -> playguard_engine::TickReport {
        self.clock.advance(delta_ms);
        self.guard.handle(playguard_engine::Trigger::Timer)
    }

    pub fn add_overlay(&self, overlay: Arc<MemoryNode>) {
        self.page.memory_document().append_to_body(overlay);
    }
}

pub fn build_rig(page: Arc<MemoryPage>, media: Arc<MemoryMedia>, player: Arc<MemoryPlayer>) -> Rig {
    page.memory_document().append_to_body(
        MemoryNode::element("div")
            .attr("id", "movie_player")
            .player(player.clone())
            .child(MemoryNode::element("video").media(media.clone()))
            .build(),
    );
    let clock = Arc::new(ManualClock::default());
    let guard = Guard::new(page.clone(), GuardSettings::default(), clock.clone()).expect("guard");
    Rig {
        page,
        clock,
        media,
        player,
        guard,
    }
}

pub fn watch_rig(media: Arc<MemoryMedia>) -> Rig {
    let player = MemoryPlayer::new(Some(media.clone()));
    build_rig(MemoryPage::builder(WATCH).build(), media, player)
}

pub fn paused_media(position: f64) -> Arc<MemoryMedia> {
    MemoryMedia::new(MediaState {
        current_time: position,
        ..MediaState::default()
    })
}

/// Toast claiming playback was interrupted, with a "Continue" button that does nothing.
pub fn interruption_toast() -> (Arc<MemoryNode>, Arc<MemoryNode>) {
    let button = MemoryNode::element("button").text("Continue").build();
    let toast = MemoryNode::element("tp-yt-paper-toast")
        .text("Experiencing interruptions?")
        .child_node(button.clone())
        .build();
    (toast, button)
}

/// Dialog carrying only the support link.
pub fn support_link_dialog() -> Arc<MemoryNode> {
    MemoryNode::element("tp-yt-paper-dialog")
        .attr("role", "dialog")
        .text("Something went wrong")
        .child(
            MemoryNode::element("a")
                .attr("href", "https://support.google.com/youtube/answer/3037019")
                .text("Learn more"),
        )
        .build()
}
