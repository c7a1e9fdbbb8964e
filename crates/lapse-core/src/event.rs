//! Notification events, as published for a new or re-notified subject.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::subject::{Application, CredentialKind};

/// Version of the `data` payload layout.
pub const SCHEMA_VERSION: &str = "1.0";

/// The event type, one per credential kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EventType {
  ExpiringSecret,
  ExpiringCertificate,
}

impl From<CredentialKind> for EventType {
  fn from(kind: CredentialKind) -> Self {
    match kind {
      CredentialKind::Secret => Self::ExpiringSecret,
      CredentialKind::Certificate => Self::ExpiringCertificate,
    }
  }
}

/// Payload for an expiring client secret.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExpiringSecret {
  pub app_registration: Application,
  pub start_date_time:  Option<DateTime<Utc>>,
  pub end_date_time:    Option<DateTime<Utc>>,
  pub days_left:        i64,
  /// The secret's display name.
  pub description:      Option<String>,
  /// The first characters of the secret value, as exposed by the directory.
  pub value_hint:       Option<String>,
}

/// Payload for an expiring certificate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExpiringCertificate {
  pub app_registration: Application,
  pub days_left:        i64,
  pub display_name:     Option<String>,
  pub start_date_time:  Option<DateTime<Utc>>,
  pub end_date_time:    Option<DateTime<Utc>>,
  pub thumbprint:       Option<String>,
}

/// Kind-specific event payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum EventData {
  Secret(ExpiringSecret),
  Certificate(ExpiringCertificate),
}

/// A structured event handed to an [`EventSink`](crate::sink::EventSink).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NotificationEvent {
  /// Freshly generated for every event.
  pub id:              Uuid,
  /// `{tenant_id}/{app_id}`.
  pub subject_address: String,
  pub event_type:      EventType,
  pub schema_version:  String,
  pub timestamp:       DateTime<Utc>,
  pub data:            EventData,
}
