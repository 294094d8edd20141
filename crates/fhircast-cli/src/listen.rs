//! `fhircast listen`: subscribe to a topic and report every inbound message.

use anyhow::Result;
use colored::Colorize;
use fhircast_client::{ConnectError, HubClient, Inbound, SessionEvent};
use serde_json::Value;
use tracing::warn;

/// Where a rendered line goes.
#[derive(Debug, PartialEq, Eq)]
pub enum Line {
  Out(String),
  Err(String),
}

/// Render one session notification for the console.
pub fn render(event: &SessionEvent, topic: &str, verbose: bool) -> Vec<Line> {
  match event {
    SessionEvent::Connected { .. } => {
      vec![Line::Out("Connected to the FHIRcast Hub.".blue().to_string())]
    }
    SessionEvent::Message(Inbound::Confirmation { .. }) => {
      vec![Line::Out(format!("Subscribed to topic '{topic}'.").blue().to_string())]
    }
    SessionEvent::Message(Inbound::Valid { message, .. }) => {
      vec![Line::Out(
        format!("✅ Valid message: {}.", message.scope()).green().to_string(),
      )]
    }
    SessionEvent::Message(Inbound::Invalid { failures, raw }) => {
      let mut lines = vec![
        Line::Out("❌ Invalid message.".red().to_string()),
        Line::Err(pretty(failures).red().to_string()),
      ];
      if verbose {
        let raw = serde_json::from_str::<Value>(raw)
          .map(|v| pretty(&v))
          .unwrap_or_else(|_| raw.clone());
        lines.push(Line::Out("👀 Raw message...".bright_white().to_string()));
        lines.push(Line::Err(raw.white().to_string()));
      }
      lines
    }
    SessionEvent::Closed { error: None } => {
      vec![Line::Out("Connection closed by the hub.".yellow().to_string())]
    }
    SessionEvent::Closed { error: Some(e) } => {
      vec![Line::Err(format!("Connection dropped: {e}").red().to_string())]
    }
  }
}

fn pretty<T: serde::Serialize>(value: &T) -> String {
  serde_json::to_string_pretty(value).unwrap_or_default()
}

fn emit(lines: Vec<Line>) {
  for line in lines {
    match line {
      Line::Out(s) => println!("{s}"),
      Line::Err(s) => eprintln!("{s}"),
    }
  }
}

pub async fn run(client: &HubClient, topic: &str, verbose: bool) -> Result<()> {
  let mut session = match client.connect(topic).await {
    Ok(session) => session,
    Err(err) => {
      match &err {
        ConnectError::Handshake(_) => {
          eprintln!("{}", "The FHIRcast Hub rejected the subscription or is unreachable.".red());
        }
        ConnectError::Transport(_) => {
          eprintln!("{}", "Unable to open WebSocket connection.".red());
        }
      }
      eprintln!(
        "{}",
        "Please ensure that your `url` is correct and your FHIRcast Hub is online.".red()
      );
      return Err(err.into());
    }
  };

  println!("{}", "Press CTRL + C to quit".yellow());

  let ctrl_c = tokio::signal::ctrl_c();
  tokio::pin!(ctrl_c);

  let interrupted = loop {
    tokio::select! {
      event = session.next_event() => match event {
        Some(event) => emit(render(&event, topic, verbose)),
        None => break false,
      },
      _ = &mut ctrl_c => break true,
    }
  };

  session.close().await;
  if interrupted {
    if let Err(e) = client.unsubscribe(topic).await {
      warn!(error = %e, "unsubscribe failed");
    }
  }
  Ok(())
}
