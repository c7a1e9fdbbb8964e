//! Microsoft Graph and Azure Event Grid adapters for lapse.
//!
//! - [`GraphSource`] implements [`lapse_core::source::CredentialSource`] over
//!   the Graph `applications` listing.
//! - [`EventGridSink`] implements [`lapse_core::sink::EventSink`] over an Event
//!   Grid topic.

pub mod auth;
pub mod error;
pub mod event_grid;
pub mod source;

use std::time::Duration;

use serde::Deserialize;

pub use auth::{ClientCredentials, TokenProvider};
pub use error::{Error, Result};
pub use event_grid::{EventGridSink, EventGridTopic};
pub use source::GraphSource;

// ─── Configuration ────────────────────────────────────────────────────────────

/// Connection settings for Microsoft Graph.
#[derive(Debug, Clone, Deserialize)]
pub struct GraphConfig {
  pub tenant_id:     String,
  pub client_id:     String,
  pub client_secret: String,
  #[serde(default = "default_graph_base_url")]
  pub base_url:      String,
  #[serde(default = "default_authority")]
  pub authority:     String,
}

/// Connection settings for the Event Grid topic.
#[derive(Debug, Clone, Deserialize)]
pub struct EventGridConfig {
  pub topic_endpoint:         String,
  pub topic_key:              String,
  #[serde(default = "default_secret_event_type")]
  pub secret_event_type:      String,
  #[serde(default = "default_certificate_event_type")]
  pub certificate_event_type: String,
}

fn default_graph_base_url() -> String { "https://graph.microsoft.com".to_owned() }

fn default_authority() -> String { "https://login.microsoftonline.com".to_owned() }

fn default_secret_event_type() -> String { "ExpiringSecret".to_owned() }

fn default_certificate_event_type() -> String { "ExpiringCertificate".to_owned() }

// ─── Construction ─────────────────────────────────────────────────────────────

/// The shared HTTP client. Clones share one connection pool.
pub fn http_client() -> Result<reqwest::Client> {
  Ok(
    reqwest::Client::builder()
      .timeout(Duration::from_secs(30))
      .build()?,
  )
}

impl GraphSource {
  pub fn from_config(client: reqwest::Client, config: &GraphConfig) -> Self {
    let tokens = TokenProvider::new(client.clone(), ClientCredentials {
      authority:     config.authority.clone(),
      tenant_id:     config.tenant_id.clone(),
      client_id:     config.client_id.clone(),
      client_secret: config.client_secret.clone(),
    });
    Self::new(client, config.base_url.clone(), tokens)
  }
}

impl EventGridSink {
  pub fn from_config(client: reqwest::Client, config: &EventGridConfig) -> Self {
    Self::new(client, EventGridTopic {
      endpoint:               config.topic_endpoint.clone(),
      key:                    config.topic_key.clone(),
      secret_event_type:      config.secret_event_type.clone(),
      certificate_event_type: config.certificate_event_type.clone(),
    })
  }
}

#[cfg(test)]
mod tests;
