//! `fhircast publish`: send a sample event to a topic.

use anyhow::{Context as _, Result};
use colored::Colorize;
use fhircast_client::HubClient;

use crate::{PublishEvent, samples};

pub async fn run(client: &HubClient, topic: &str, event: &PublishEvent) -> Result<()> {
  let message = match event {
    PublishEvent::DiagnosticReportOpen { accession_number } => {
      samples::diagnostic_report_open(topic, accession_number)
    }
    PublishEvent::DiagnosticReportOpened => samples::diagnostic_report_opened(topic),
    PublishEvent::DiagnosticReportUpdate { status } => {
      samples::diagnostic_report_update(topic, status)
    }
  };

  client
    .publish(topic, &message)
    .await
    .with_context(|| format!("publishing {} to '{topic}'", message.scope()))?;

  println!(
    "{}",
    format!("Published {} to topic '{topic}'.", message.scope()).green()
  );
  Ok(())
}
