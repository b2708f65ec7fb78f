pub mod app;
pub mod console;

use crate::domain::game::GameSummary;
use crate::domain::models::{Coordinate, StatusMessage};

/// Where frames end up. Drawing itself lives outside this crate.
pub trait RenderSink: Send {
    /// One game frame: both dots
    fn render(&mut self, local: Coordinate, remote: Coordinate, reachable: bool);

    /// Full-screen status text, shown when the session changes state
    fn render_status(&mut self, status: &StatusMessage);

    fn render_game_over(&mut self, summary: &GameSummary);
}
