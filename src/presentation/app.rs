use crate::domain::game::{format_survival, GameConfig, GameState, GameSummary};
use crate::domain::models::{
    Coordinate, GamePhase, Role, SessionState, StatusBackground, StatusMessage,
};
use crate::domain::settings::Settings;
use crate::infrastructure::bluetooth::PeerLink;
use crate::infrastructure::input::InputSource;
use crate::presentation::RenderSink;
use rand::Rng;
use std::time::{Duration, Instant};
use tokio::sync::watch;
use tokio::time::MissedTickBehavior;
use tracing::info;

/// Full-screen text for each session state
pub fn status_for(role: Role, state: SessionState) -> StatusMessage {
    let (message, background) = match (state, role) {
        (SessionState::Idle, _) => ("Initializing BLE...", StatusBackground::Cyan),
        (SessionState::Scanning, Role::Subscriber) => {
            ("Scanning for peer...", StatusBackground::Blue)
        }
        (SessionState::Scanning, Role::Publisher) => ("Broadcasting...", StatusBackground::Blue),
        (SessionState::Connecting, _) => ("Connecting...", StatusBackground::Magenta),
        (SessionState::Connected, _) => ("Connected!", StatusBackground::Green),
        (SessionState::Disconnected, _) => {
            ("Disconnected....re-scanning", StatusBackground::Orange)
        }
    };
    StatusMessage {
        message: message.to_string(),
        background,
    }
}

pub fn game_over_status(summary: &GameSummary) -> StatusMessage {
    StatusMessage {
        message: format!("GAME OVER {}", format_survival(summary.survived)),
        background: StatusBackground::Red,
    }
}

/// What one tick did
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TickReport {
    pub local: Coordinate,
    pub remote: Coordinate,
    pub reachable: bool,
    pub phase: GamePhase,
    pub warped: bool,
    pub acceleration: i32,
}

/// Fixed-cadence game loop for one device
pub struct ProximityApp<S, I, R, G> {
    role: Role,
    tick_interval: Duration,
    game_over_hold: Duration,
    game: GameState,
    session: S,
    input: I,
    renderer: R,
    rng: G,
    last_state: Option<SessionState>,
    position: watch::Sender<Coordinate>,
}

impl<S, I, R, G> ProximityApp<S, I, R, G>
where
    S: PeerLink,
    I: InputSource,
    R: RenderSink,
    G: Rng + Send,
{
    pub fn new(settings: &Settings, session: S, input: I, renderer: R, rng: G) -> Self {
        let config = GameConfig {
            bounds: settings.bounds(),
            stick: settings.stick_config(),
            proximity_threshold: settings.proximity_threshold,
            button_holdoff: Duration::from_millis(settings.button_holdoff_ms),
        };
        let start = settings.start_position();

        Self {
            role: settings.role,
            tick_interval: settings.tick_interval(),
            game_over_hold: Duration::from_millis(settings.game_over_hold_ms),
            game: GameState::new(config, start),
            session,
            input,
            renderer,
            rng,
            last_state: None,
            position: watch::channel(start).0,
        }
    }

    /// Publish the local dot on `position` once per tick
    pub fn with_position_channel(mut self, position: watch::Sender<Coordinate>) -> Self {
        position.send_replace(self.game.local());
        self.position = position;
        self
    }

    pub fn tick(&mut self, now: Instant) -> TickReport {
        let state = self.session.state();
        if self.last_state != Some(state) {
            self.renderer.render_status(&status_for(self.role, state));
            self.last_state = Some(state);
        }

        let sample = self.input.sample();
        let outcome = self.game.advance(&sample, now, &mut self.rng);
        self.session.send_local_update(outcome.local);

        let remote = self.session.remote_coordinate();
        let reachable = self.session.is_reachable();
        self.game.evaluate(remote, reachable, now);

        self.renderer.render(outcome.local, remote, reachable);
        self.position.send_replace(outcome.local);

        TickReport {
            local: outcome.local,
            remote,
            reachable,
            phase: self.game.phase(),
            warped: outcome.warped,
            acceleration: self.game.acceleration().get(),
        }
    }

    /// Play one round. Returns once the game-over screen has been held.
    ///
    /// The loop keeps ticking through the hold so the peer keeps receiving
    /// the frozen position.
    pub async fn run(mut self) -> anyhow::Result<GameSummary> {
        self.input.begin()?;
        info!("Game loop running every {:?}", self.tick_interval);

        let mut interval = tokio::time::interval(self.tick_interval);
        interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
        let mut ended_at: Option<Instant> = None;

        loop {
            interval.tick().await;
            let now = Instant::now();
            self.tick(now);

            let Some(summary) = self.game.summary() else {
                continue;
            };
            match ended_at {
                None => {
                    self.renderer.render_status(&game_over_status(&summary));
                    self.renderer.render_game_over(&summary);
                    ended_at = Some(now);
                }
                Some(at) if now.saturating_duration_since(at) >= self.game_over_hold => {
                    return Ok(summary);
                }
                Some(_) => {}
            }
        }
    }
}
