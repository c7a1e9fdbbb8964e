//! [`GraphSource`]: application credentials read from Microsoft Graph.
//!
//! Lists every application registration, page by page, and keeps the secrets
//! and certificates that fall inside the expiry window. A failure on any page
//! fails the whole fetch.

use chrono::{DateTime, Utc};
use lapse_core::{
  source::CredentialSource,
  subject::{Application, CredentialKind, Subject, ThresholdDays},
};
use serde::Deserialize;
use tracing::debug;

use crate::{Result, auth::TokenProvider, error::check};

const SELECT: &str = "appId,displayName,createdDateTime,passwordCredentials,keyCredentials";

// ─── Wire types ──────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
struct ApplicationPage {
  value:     Vec<GraphApplication>,
  #[serde(rename = "@odata.nextLink")]
  next_link: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GraphApplication {
  app_id:               String,
  display_name:         Option<String>,
  created_date_time:    Option<DateTime<Utc>>,
  password_credentials: Option<Vec<PasswordCredential>>,
  key_credentials:      Option<Vec<KeyCredential>>,
}

/// A client secret.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PasswordCredential {
  key_id:          Option<String>,
  display_name:    Option<String>,
  start_date_time: Option<DateTime<Utc>>,
  end_date_time:   Option<DateTime<Utc>>,
  hint:            Option<String>,
}

/// A certificate. `custom_key_identifier` arrives base64-encoded.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct KeyCredential {
  key_id:                Option<String>,
  display_name:          Option<String>,
  start_date_time:       Option<DateTime<Utc>>,
  end_date_time:         Option<DateTime<Utc>>,
  custom_key_identifier: Option<String>,
}

impl GraphApplication {
  /// Every credential of this application expiring within `threshold`.
  fn into_expiring(self, threshold: ThresholdDays, now: DateTime<Utc>) -> Vec<Subject> {
    let application = Application {
      display_name:      self.display_name,
      app_id:            self.app_id,
      created_date_time: self.created_date_time,
    };

    let secrets = self
      .password_credentials
      .unwrap_or_default()
      .into_iter()
      .filter_map(|c| {
        Some(Subject {
          id:              c.key_id?,
          display_name:    c.display_name,
          start_date_time: c.start_date_time,
          end_date_time:   c.end_date_time,
          kind:            CredentialKind::Secret,
          context:         c.hint,
          application:     application.clone(),
        })
      });

    let certificates = self
      .key_credentials
      .unwrap_or_default()
      .into_iter()
      .filter_map(|c| {
        Some(Subject {
          id:              c.key_id?,
          display_name:    c.display_name,
          start_date_time: c.start_date_time,
          end_date_time:   c.end_date_time,
          kind:            CredentialKind::Certificate,
          context:         c.custom_key_identifier,
          application:     application.clone(),
        })
      });

    secrets
      .chain(certificates)
      .filter(|s| s.is_expiring(threshold, now))
      .collect()
  }
}

// ─── Source ──────────────────────────────────────────────────────────────────

/// Reads application credentials from Microsoft Graph.
pub struct GraphSource {
  client:   reqwest::Client,
  base_url: String,
  tokens:   TokenProvider,
}

impl GraphSource {
  /// `base_url` is the Graph root, e.g. `https://graph.microsoft.com`.
  pub fn new(client: reqwest::Client, base_url: impl Into<String>, tokens: TokenProvider) -> Self {
    Self { client, base_url: base_url.into(), tokens }
  }

  fn first_page_url(&self) -> String {
    format!(
      "{}/v1.0/applications?$select={SELECT}",
      self.base_url.trim_end_matches('/'),
    )
  }

  async fn fetch_page(&self, url: &str) -> Result<ApplicationPage> {
    let token = self.tokens.bearer().await?;
    let resp = self.client.get(url).bearer_auth(token).send().await?;
    Ok(check("graph applications", resp).await?.json().await?)
  }
}

impl CredentialSource for GraphSource {
  type Error = crate::Error;

  async fn fetch_expiring(
    &self,
    threshold: ThresholdDays,
    now: DateTime<Utc>,
  ) -> Result<Vec<Subject>> {
    let mut subjects = Vec::new();
    let mut next = Some(self.first_page_url());
    let mut pages = 0usize;
    let mut applications = 0usize;

    while let Some(url) = next {
      let page = self.fetch_page(&url).await?;
      pages += 1;
      applications += page.value.len();
      for app in page.value {
        subjects.extend(app.into_expiring(threshold, now));
      }
      next = page.next_link;
    }

    debug!(pages, applications, expiring = subjects.len(), "listed graph applications");
    Ok(subjects)
  }
}

#[cfg(test)]
mod tests {
  use chrono::{Duration, TimeZone};
  use serde_json::json;

  use super::*;

  fn now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 9, 1, 0, 0, 0).unwrap()
  }

  fn app(value: serde_json::Value) -> GraphApplication {
    serde_json::from_value(value).unwrap()
  }

  #[test]
  fn maps_secrets_and_certificates() {
    let soon = (now() + Duration::days(5)).to_rfc3339();
    let a = app(json!({
      "appId": "a-1",
      "displayName": "billing",
      "createdDateTime": "2020-01-01T00:00:00Z",
      "passwordCredentials": [
        { "keyId": "p-1", "displayName": "ci", "endDateTime": soon, "hint": "Zq~" }
      ],
      "keyCredentials": [
        { "keyId": "c-1", "displayName": "CN=billing", "endDateTime": soon,
          "customKeyIdentifier": "QUJDRA==" }
      ]
    }));

    let subjects = a.into_expiring(ThresholdDays::new(30).unwrap(), now());

    assert_eq!(subjects.len(), 2);
    assert_eq!(subjects[0].id, "p-1");
    assert_eq!(subjects[0].kind, CredentialKind::Secret);
    assert_eq!(subjects[0].context.as_deref(), Some("Zq~"));
    assert_eq!(subjects[1].id, "c-1");
    assert_eq!(subjects[1].kind, CredentialKind::Certificate);
    assert_eq!(subjects[1].context.as_deref(), Some("QUJDRA=="));
    assert_eq!(subjects[1].application.display_name.as_deref(), Some("billing"));
  }

  #[test]
  fn drops_credentials_outside_window_or_without_expiry() {
    let a = app(json!({
      "appId": "a-1",
      "passwordCredentials": [
        { "keyId": "late", "endDateTime": (now() + Duration::days(31)).to_rfc3339() },
        { "keyId": "undated" },
        { "endDateTime": now().to_rfc3339() },
        { "keyId": "expired", "endDateTime": (now() - Duration::days(2)).to_rfc3339() }
      ],
      "keyCredentials": null
    }));

    let subjects = a.into_expiring(ThresholdDays::new(30).unwrap(), now());

    let ids: Vec<_> = subjects.iter().map(|s| s.id.as_str()).collect();
    assert_eq!(ids, vec!["expired"]);
  }
}
