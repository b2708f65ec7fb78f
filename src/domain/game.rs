//! Proximity Game
//!
//! Single-round game: each player steers a dot and the round ends as soon as
//! the two dots come within the proximity threshold.

use crate::domain::controller::{Acceleration, StickConfig, StickProcessor};
use crate::domain::models::{Bounds, Coordinate, GamePhase, InputSample};
use rand::Rng;
use std::time::{Duration, Instant};
use tracing::{debug, info};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GameConfig {
    pub bounds: Bounds,
    pub stick: StickConfig,
    pub proximity_threshold: f64,
    pub button_holdoff: Duration,
}

/// Result of applying one input sample
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MoveOutcome {
    pub local: Coordinate,
    pub warped: bool,
    pub speed_changed: bool,
}

/// Shown on the game-over screen
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GameSummary {
    pub survived: Duration,
    pub local: Coordinate,
    pub remote: Coordinate,
    pub distance: f64,
}

pub struct GameState {
    config: GameConfig,
    stick: StickProcessor,
    phase: GamePhase,
    local: Coordinate,
    acceleration: Acceleration,
    started_at: Option<Instant>,
    summary: Option<GameSummary>,
}

impl GameState {
    pub fn new(config: GameConfig, start: Coordinate) -> Self {
        Self {
            stick: StickProcessor::new(config.stick, config.button_holdoff),
            config,
            phase: GamePhase::Playing,
            local: config.bounds.clamp(start),
            acceleration: Acceleration::default(),
            started_at: None,
            summary: None,
        }
    }

    pub fn phase(&self) -> GamePhase {
        self.phase
    }

    pub fn local(&self) -> Coordinate {
        self.local
    }

    pub fn acceleration(&self) -> Acceleration {
        self.acceleration
    }

    pub fn summary(&self) -> Option<GameSummary> {
        self.summary
    }

    /// Move the local dot from one input sample. Does nothing once the round ended.
    pub fn advance<R: Rng>(
        &mut self,
        sample: &InputSample,
        now: Instant,
        rng: &mut R,
    ) -> MoveOutcome {
        if self.phase == GamePhase::Ended {
            return MoveOutcome {
                local: self.local,
                warped: false,
                speed_changed: false,
            };
        }

        let step = self.stick.displacement(sample, self.acceleration);
        let moved = Coordinate::new(
            self.local.x.saturating_add(step.x),
            self.local.y.saturating_add(step.y),
        );
        self.local = self.config.bounds.clamp(moved);

        let actions = self.stick.buttons(sample, now);
        if actions.cycle_speed {
            self.acceleration = self.acceleration.next();
            debug!("Acceleration now {}", self.acceleration.get());
        }
        if actions.warp {
            self.local = random_point(&self.config.bounds, rng);
            debug!("Warped to {}", self.local);
        }

        MoveOutcome {
            local: self.local,
            warped: actions.warp,
            speed_changed: actions.cycle_speed,
        }
    }

    /// Check the termination predicate. Returns true on the tick the round ends.
    ///
    /// The distance only counts while the peer is reachable; the survival
    /// clock starts on the first reachable tick.
    pub fn evaluate(&mut self, remote: Coordinate, reachable: bool, now: Instant) -> bool {
        if self.phase == GamePhase::Ended || !reachable {
            return false;
        }
        let started_at = *self.started_at.get_or_insert(now);

        let distance = self.local.distance_to(&remote);
        if distance > self.config.proximity_threshold {
            return false;
        }

        let summary = GameSummary {
            survived: now.saturating_duration_since(started_at),
            local: self.local,
            remote,
            distance,
        };
        info!(
            "Dots collided at distance {:.1} after {}",
            distance,
            format_survival(summary.survived)
        );
        self.summary = Some(summary);
        self.phase = GamePhase::Ended;
        true
    }
}

/// Uniformly random point inside the bounds
pub fn random_point<R: Rng>(bounds: &Bounds, rng: &mut R) -> Coordinate {
    Coordinate::new(
        rng.gen_range(bounds.min_x..=bounds.max_x),
        rng.gen_range(bounds.min_y..=bounds.max_y),
    )
}

/// `SS.hhs` with seconds and hundredths, e.g. `07.25s`
pub fn format_survival(elapsed: Duration) -> String {
    let millis = elapsed.as_millis();
    format!("{:02}.{:02}s", millis / 1000, (millis % 1000) / 10)
}
