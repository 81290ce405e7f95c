pub mod buffer;
pub mod ingest;
pub mod live;
pub mod models;
pub mod report;
pub mod session;
pub mod settings;
pub mod storage;
pub mod transport;

use std::path::{Path, PathBuf};

use anyhow::{bail, Result};
use clap::{Parser, Subcommand, ValueHint};
use log::{info, warn};
use tokio_util::sync::CancellationToken;

use live::{redraw_loop, LiveRenderer, LogRenderer};
use models::{ReportOutcome, SessionSummary};
use report::ReportGenerator;
use session::SessionController;
use settings::Settings;
use transport::{MqttTransport, Transport};

#[derive(Parser, Debug)]
#[command(
    version,
    about = "Capture MQTT position telemetry into session logs and render a final map"
)]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug, PartialEq)]
enum Command {
    /// Run one live session over MQTT until Ctrl+C (the default)
    Collect,
    /// Regenerate the final map from an existing session log
    Report {
        /// Session log CSV to read
        #[arg(value_hint = ValueHint::FilePath)]
        log: PathBuf,
    },
    /// Write the default settings as JSON
    InitConfig {
        /// Destination settings file
        #[arg(value_hint = ValueHint::FilePath)]
        path: PathBuf,
    },
}

impl Cli {
    fn into_command(self) -> Command {
        self.command.unwrap_or(Command::Collect)
    }
}

/// Starts a session on `controller`, redraws the live window through
/// `renderer` until `shutdown` fires, then closes the session.
pub async fn run_session<T, R>(
    controller: &mut SessionController<T>,
    renderer: R,
    settings: &Settings,
    shutdown: CancellationToken,
) -> Result<SessionSummary>
where
    T: Transport,
    R: LiveRenderer,
{
    let session = controller.start().await?;
    println!("Collecting data... Logging to {}", session.log_path.display());

    let redraw_cancel = CancellationToken::new();
    let redraw = tokio::spawn(redraw_loop(
        session.buffer.clone(),
        renderer,
        settings.live.redraw_interval(),
        redraw_cancel.clone(),
    ));

    let result = controller.run_until(shutdown).await;

    redraw_cancel.cancel();
    if let Err(err) = redraw.await {
        warn!("redraw task failed to join: {err}");
    }

    result
}

fn print_summary(outcome: &ReportOutcome) {
    match outcome {
        ReportOutcome::Generated(report) => println!(
            "SUCCESS: Saved {} points to {}",
            report.point_count,
            report.image_path.display()
        ),
        ReportOutcome::NoData => println!("No data was collected."),
    }
}

async fn collect(settings: Settings) -> Result<()> {
    let mut controller =
        SessionController::new(MqttTransport::new(settings.broker.clone()), &settings)?;

    let shutdown = CancellationToken::new();
    tokio::spawn({
        let shutdown = shutdown.clone();
        async move {
            match tokio::signal::ctrl_c().await {
                Ok(()) => shutdown.cancel(),
                Err(err) => warn!("failed to listen for Ctrl+C: {err}"),
            }
        }
    });
    println!("Press Ctrl+C to end the session and generate the final map.");

    let renderer = LogRenderer::new(settings.live.log_every_frames);
    let summary = run_session(&mut controller, renderer, &settings, shutdown).await?;

    println!("Session ended with {} points.", summary.accepted);
    print_summary(&summary.outcome);
    Ok(())
}

fn regenerate_report(settings: &Settings, log_path: &Path) -> Result<()> {
    if !log_path.exists() {
        bail!("session log {} does not exist", log_path.display());
    }
    let generator = ReportGenerator::new(settings.results_dir.clone(), settings.report.clone());
    print_summary(&generator.generate(log_path)?);
    Ok(())
}

pub fn run() -> Result<()> {
    // Initialize logging (reads RUST_LOG env var)
    env_logger::Builder::new()
        .filter_level(log::LevelFilter::Info)
        .parse_default_env()
        .init();

    let command = Cli::parse().into_command();
    let settings = Settings::from_env()?;

    match command {
        Command::Collect => {
            info!("sensor-map starting up...");
            let runtime = tokio::runtime::Builder::new_multi_thread()
                .enable_all()
                .build()?;
            runtime.block_on(collect(settings))
        }
        Command::Report { log } => regenerate_report(&settings, &log),
        Command::InitConfig { path } => {
            Settings::default().persist(&path)?;
            println!("Wrote default settings to {}", path.display());
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use clap::{error::ErrorKind, CommandFactory};

    use super::*;

    fn parse(args: &[&str]) -> Result<Command, clap::Error> {
        Cli::try_parse_from(std::iter::once("sensor-map").chain(args.iter().copied()))
            .map(Cli::into_command)
    }

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn collect_is_the_default() {
        assert_eq!(parse(&[]).unwrap(), Command::Collect);
        assert_eq!(parse(&["collect"]).unwrap(), Command::Collect);
    }

    #[test]
    fn subcommands_take_a_path() {
        assert_eq!(
            parse(&["report", "s.csv"]).unwrap(),
            Command::Report {
                log: PathBuf::from("s.csv")
            }
        );
        assert_eq!(
            parse(&["init-config", "settings.json"]).unwrap(),
            Command::InitConfig {
                path: PathBuf::from("settings.json")
            }
        );
    }

    #[test]
    fn help_is_available() {
        let err = parse(&["--help"]).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::DisplayHelp);
    }

    #[test]
    fn bad_invocations_are_rejected() {
        assert_eq!(
            parse(&["report"]).unwrap_err().kind(),
            ErrorKind::MissingRequiredArgument
        );
        assert!(parse(&["plot"]).is_err());
        assert!(parse(&["collect", "--config", "x"]).is_err());
        assert!(parse(&["report", "a.csv", "b.csv"]).is_err());
    }
}
