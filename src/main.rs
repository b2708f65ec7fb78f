mod domain;
mod infrastructure;
mod presentation;

use crate::domain::error::SyncError;
use crate::domain::game::format_survival;
use crate::domain::models::Role;
use crate::domain::settings::SettingsService;
use crate::infrastructure::bluetooth::{LoopbackRadio, SessionService};
use crate::infrastructure::input::ChaseStick;
use crate::presentation::app::ProximityApp;
use crate::presentation::console::ConsoleRenderer;
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::sync::Arc;
use tokio::sync::watch;
use tokio::task::JoinError;
use tracing::{error, info};

fn session_stopped(role: Role, stopped: Result<Result<(), SyncError>, JoinError>) -> anyhow::Error {
    match stopped {
        Ok(Ok(())) => anyhow::anyhow!("{:?} session exited", role),
        Ok(Err(e)) => anyhow::anyhow!("{:?} session stopped: {}", role, e),
        Err(e) => anyhow::anyhow!("{:?} session panicked: {}", role, e),
    }
}

/// Both devices of one round, wired over the loopback radio
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let settings_service = SettingsService::new()?;
    let settings = settings_service.get().clone();

    let _logging_guard = infrastructure::logging::init_logger(&settings.log_settings)
        .map_err(|e| eprintln!("Failed to initialize logging: {}", e))
        .ok();

    info!(
        "Starting Proximity Sync ({:?} layout, settings at {})",
        settings.layout,
        settings_service.path().display()
    );

    let radio = LoopbackRadio::new();
    let publisher_settings = settings.for_role(Role::Publisher);
    let subscriber_settings = settings.for_role(Role::Subscriber);

    let (publisher_session, publisher_link) =
        SessionService::new(Arc::new(radio.endpoint()?), &publisher_settings);
    let (subscriber_session, subscriber_link) =
        SessionService::new(Arc::new(radio.endpoint()?), &subscriber_settings);

    let (publisher_tx, publisher_rx) = watch::channel(publisher_settings.start_position());
    let publisher_app = ProximityApp::new(
        &publisher_settings,
        publisher_link.clone(),
        ChaseStick::new(publisher_settings.stick_config(), publisher_link, publisher_rx),
        ConsoleRenderer::new(publisher_settings.device_name(), 30),
        StdRng::from_entropy(),
    )
    .with_position_channel(publisher_tx);

    let (subscriber_tx, subscriber_rx) = watch::channel(subscriber_settings.start_position());
    let subscriber_app = ProximityApp::new(
        &subscriber_settings,
        subscriber_link.clone(),
        ChaseStick::new(subscriber_settings.stick_config(), subscriber_link, subscriber_rx),
        ConsoleRenderer::new(subscriber_settings.device_name(), 30),
        StdRng::from_entropy(),
    )
    .with_position_channel(subscriber_tx);

    let mut publisher_task = tokio::spawn(publisher_session.run());
    let mut subscriber_task = tokio::spawn(subscriber_session.run());
    let games = async { tokio::try_join!(publisher_app.run(), subscriber_app.run()) };

    let outcome = tokio::select! {
        played = games => played,
        stopped = &mut publisher_task => Err(session_stopped(Role::Publisher, stopped)),
        stopped = &mut subscriber_task => Err(session_stopped(Role::Subscriber, stopped)),
    };
    publisher_task.abort();
    subscriber_task.abort();

    match outcome {
        Ok((publisher, subscriber)) => {
            info!(
                "Round over: publisher survived {}, subscriber survived {}",
                format_survival(publisher.survived),
                format_survival(subscriber.survived)
            );
            Ok(())
        }
        Err(e) => {
            error!("{}", e);
            Err(e)
        }
    }
}
