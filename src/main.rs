use clap::Parser;
use hazard_guard::actuator::SimulatedCoil;
use hazard_guard::intake::ReplaySource;
use hazard_guard::presentation::TracingPresenter;
use hazard_guard::{AppError, CoordinatorBuilder, Settings};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{Level, info, warn};
use tracing_subscriber::EnvFilter;
use tracing_subscriber::filter::LevelFilter;

#[derive(Parser, Debug)]
#[command(name = "hazard-guard")]
#[command(version = "0.1")]
#[command(about = "Replays detections through the hazard monitor and drives the safety coil")]
struct Cli {
    /// Settings file, extension optional (default: hazard_guard)
    #[arg(value_name = "FILE")]
    settings: Option<String>,

    /// Replay this detections file instead of the configured one
    #[arg(long, value_name = "FILE")]
    replay: Option<PathBuf>,
}

// RUST_LOG wins over the configured level when set.
fn init_logging(level: Level) {
    let filter = EnvFilter::builder()
        .with_default_directive(LevelFilter::from_level(level).into())
        .from_env_lossy();
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

#[tokio::main]
async fn main() -> Result<(), AppError> {
    let cli = Cli::parse();
    let mut settings = Settings::load(cli.settings.as_deref())?;
    if let Some(replay) = cli.replay {
        settings.replay.path = replay;
    }
    init_logging(settings.log_level.into());

    let source = ReplaySource::open(&settings.replay.path, settings.replay.frame_interval()).await?;
    let coordinator = CoordinatorBuilder::new(settings)
        .coil_writer(Arc::new(SimulatedCoil::new()))
        .presenter(Box::new(TracingPresenter))
        .start(source)
        .await?;

    let cancel_token = coordinator.cancel_token();
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => info!("Interrupted, shutting down"),
            Err(e) => warn!("Failed to listen for interrupt: {}", e),
        }
        cancel_token.cancel();
    });

    let diagnostics = coordinator.join().await?;
    info!(
        rejected = diagnostics.frames_rejected,
        dropped = diagnostics.frames_dropped,
        actuator_failures = diagnostics.actuator_failures,
        audit_failures = diagnostics.audit_failures,
        "Done"
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn parses_settings_and_replay_override() {
        let cli = Cli::try_parse_from(["hazard-guard", "site", "--replay", "shift.jsonl"]).unwrap();
        assert_eq!(cli.settings.as_deref(), Some("site"));
        assert_eq!(cli.replay, Some(PathBuf::from("shift.jsonl")));

        let cli = Cli::try_parse_from(["hazard-guard"]).unwrap();
        assert!(cli.settings.is_none());
        assert!(cli.replay.is_none());
    }
}
