//! Log-backed renderer for headless runs

use crate::domain::game::{format_survival, GameSummary};
use crate::domain::models::{Coordinate, StatusMessage};
use crate::presentation::RenderSink;
use tracing::{debug, info};

pub struct ConsoleRenderer {
    label: String,
    frames: u64,
    /// Log one frame out of this many
    frame_stride: u64,
}

impl ConsoleRenderer {
    pub fn new(label: impl Into<String>, frame_stride: u64) -> Self {
        Self {
            label: label.into(),
            frames: 0,
            frame_stride: frame_stride.max(1),
        }
    }
}

impl RenderSink for ConsoleRenderer {
    fn render(&mut self, local: Coordinate, remote: Coordinate, reachable: bool) {
        if self.frames % self.frame_stride == 0 {
            debug!(
                "[{}] me {} peer {}{}",
                self.label,
                local,
                remote,
                if reachable { "" } else { " (stale)" }
            );
        }
        self.frames += 1;
    }

    fn render_status(&mut self, status: &StatusMessage) {
        info!("[{}] {:?}: {}", self.label, status.background, status.message);
    }

    fn render_game_over(&mut self, summary: &GameSummary) {
        info!(
            "[{}] GAME OVER - survived {} (me {}, peer {}, distance {:.1})",
            self.label,
            format_survival(summary.survived),
            summary.local,
            summary.remote,
            summary.distance
        );
    }
}
