//! Layered CLI settings: defaults, then an optional TOML file, then
//! `FHIRCAST_*` environment variables. Command-line flags are applied last by
//! the caller.

use std::{path::Path, time::Duration};

use anyhow::Context as _;
use fhircast_client::{DEFAULT_HUB_URL, HubConfig};
use serde::Deserialize;

pub const DEFAULT_TOPIC: &str = "test";

#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
  pub url:                  String,
  pub topic:                String,
  pub open_timeout_secs:    u64,
  pub request_timeout_secs: u64,
}

impl Settings {
  pub fn load(file: Option<&Path>) -> anyhow::Result<Self> {
    let mut builder = config::Config::builder()
      .set_default("url", DEFAULT_HUB_URL)?
      .set_default("topic", DEFAULT_TOPIC)?
      .set_default("open_timeout_secs", 5)?
      .set_default("request_timeout_secs", 30)?;
    if let Some(path) = file {
      builder = builder.add_source(config::File::from(path.to_path_buf()).required(true));
    }
    builder
      .add_source(config::Environment::with_prefix("FHIRCAST"))
      .build()
      .context("failed to read configuration")?
      .try_deserialize()
      .context("failed to deserialise settings")
  }

  pub fn hub_config(&self) -> HubConfig {
    HubConfig {
      hub_url:         self.url.clone(),
      request_timeout: Duration::from_secs(self.request_timeout_secs),
      open_timeout:    Duration::from_secs(self.open_timeout_secs),
    }
  }
}
