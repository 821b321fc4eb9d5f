use std::process::ExitCode;

use clap::CommandFactory;
use dvbdd::cli::Cli;
use dvbdd::pipeline::{CaptureSummary, CapturePipeline, StopReason};
use dvbdd::{CaptureError, Result};
use log::{error, info, warn};
use tracing_subscriber::EnvFilter;

const EXIT_FAILURE: u8 = 1;
const EXIT_USAGE: u8 = 2;
const EXIT_INTERRUPTED: u8 = 130;

fn init_logging(verbose: bool) {
    let default = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

/// Completes on Ctrl-C. Never completes if the handler cannot be installed.
async fn interrupted() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!("Cannot listen for Ctrl-C: {}", e);
        std::future::pending::<()>().await;
    }
}

async fn run(cli: &Cli) -> Result<CaptureSummary> {
    let pids = cli.pid_set()?;
    let source_spec = cli.source_spec()?;
    let sink = cli.sink_spec().open().await?;
    let source = source_spec.open(pids).await?;

    let mut pipeline = CapturePipeline::new(source, sink, cli.packet_count());
    let result = pipeline.run_until(interrupted()).await;

    let (mut source, _sink) = pipeline.into_parts();
    if let Err(e) = source.release() {
        warn!("{}", e);
    }
    result
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = match Cli::try_parse_normalized(std::env::args()) {
        Ok(cli) => cli,
        Err(e) => {
            let _ = e.print();
            return ExitCode::from(e.exit_code() as u8);
        }
    };
    init_logging(cli.verbose);

    match run(&cli).await {
        Ok(summary) => match summary.stop {
            StopReason::CountReached => ExitCode::SUCCESS,
            StopReason::Interrupted => {
                info!("Interrupted after {} packets", summary.packets);
                ExitCode::from(EXIT_INTERRUPTED)
            }
            StopReason::EndOfStream => {
                error!("End of stream after {} packets", summary.packets);
                ExitCode::from(EXIT_FAILURE)
            }
        },
        Err(CaptureError::Usage(msg)) => {
            error!("{}", msg);
            eprintln!("{}", Cli::command().render_usage());
            ExitCode::from(EXIT_USAGE)
        }
        Err(e) => {
            error!("{}", e);
            ExitCode::from(EXIT_FAILURE)
        }
    }
}
