//! `fhircast`: listen to and publish on a FHIRcast hub.
//!
//! # Usage
//!
//! ```text
//! fhircast listen --topic test
//! fhircast --url http://localhost:8103/fhircast/STU2 publish diagnostic-report-open --accession-number ABCD
//! fhircast --config fhircast.toml -v listen
//! ```

mod listen;
mod publish;
mod samples;
mod settings;

use std::path::PathBuf;

use anyhow::{Context as _, Result};
use clap::{Parser, Subcommand};
use fhircast_client::HubClient;
use settings::Settings;
use tracing::{debug, level_filters::LevelFilter};
use tracing_subscriber::EnvFilter;

// ─── CLI args ─────────────────────────────────────────────────────────────────

#[derive(Parser, Debug)]
#[command(name = "fhircast", version, about = "FHIRcast hub listener and publisher")]
struct Cli {
  /// Path to a TOML config file (url, topic, timeouts).
  #[arg(short, long, global = true, value_name = "FILE")]
  config: Option<PathBuf>,

  /// Base URL of the FHIRcast hub.
  #[arg(long, global = true)]
  url: Option<String>,

  /// Topic to subscribe or publish to.
  #[arg(long, global = true)]
  topic: Option<String>,

  /// Log progress and print the raw payload of invalid messages.
  #[arg(short, long, global = true)]
  verbose: bool,

  #[command(subcommand)]
  command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
  /// Subscribe to a topic and validate every event the hub sends.
  Listen,
  /// Publish a sample event.
  Publish {
    #[command(subcommand)]
    event: PublishEvent,
  },
}

#[derive(Subcommand, Debug)]
pub enum PublishEvent {
  /// A report opened with its imaging study.
  DiagnosticReportOpen {
    #[arg(long, alias = "accessionNumber", default_value = "ABCD")]
    accession_number: String,
  },
  /// Acknowledgement that a report was opened.
  DiagnosticReportOpened,
  /// A report status change.
  DiagnosticReportUpdate {
    #[arg(long, default_value = "partial")]
    status: String,
  },
}

// ─── Entry point ──────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> Result<()> {
  let cli = Cli::parse();

  let level = if cli.verbose { LevelFilter::INFO } else { LevelFilter::WARN };
  tracing_subscriber::fmt()
    .with_env_filter(
      EnvFilter::builder()
        .with_default_directive(level.into())
        .from_env_lossy(),
    )
    .with_writer(std::io::stderr)
    .init();

  let mut settings = Settings::load(cli.config.as_deref())?;
  if let Some(url) = cli.url {
    settings.url = url;
  }
  if let Some(topic) = cli.topic {
    settings.topic = topic;
  }
  debug!(?settings, "settings loaded");

  let client = HubClient::new(settings.hub_config()).context("building HTTP client")?;

  match &cli.command {
    Command::Listen => listen::run(&client, &settings.topic, cli.verbose).await,
    Command::Publish { event } => publish::run(&client, &settings.topic, event).await,
  }
}
