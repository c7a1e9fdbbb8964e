//! OAuth2 client-credentials tokens for Microsoft Graph, cached until shortly
//! before they expire.

use std::time::{Duration, Instant};

use serde::Deserialize;
use tokio::sync::Mutex;
use tracing::debug;

use crate::{Result, error::check};

/// Scope requesting the application permissions granted to the client.
pub const GRAPH_SCOPE: &str = "https://graph.microsoft.com/.default";

/// Tokens are refreshed this long before their stated expiry.
const EXPIRY_MARGIN: Duration = Duration::from_secs(60);

/// Identity of the registered client used to read the directory.
#[derive(Debug, Clone)]
pub struct ClientCredentials {
  /// e.g. `https://login.microsoftonline.com`
  pub authority:     String,
  pub tenant_id:     String,
  pub client_id:     String,
  pub client_secret: String,
}

#[derive(Deserialize)]
struct TokenResponse {
  access_token: String,
  expires_in:   u64,
}

struct CachedToken {
  value:      String,
  refresh_at: Instant,
}

/// Hands out bearer tokens, fetching a new one only when the cached one is
/// about to expire.
pub struct TokenProvider {
  client:      reqwest::Client,
  credentials: ClientCredentials,
  cached:      Mutex<Option<CachedToken>>,
}

impl TokenProvider {
  pub fn new(client: reqwest::Client, credentials: ClientCredentials) -> Self {
    Self { client, credentials, cached: Mutex::new(None) }
  }

  fn token_url(&self) -> String {
    format!(
      "{}/{}/oauth2/v2.0/token",
      self.credentials.authority.trim_end_matches('/'),
      self.credentials.tenant_id,
    )
  }

  /// A valid access token.
  pub async fn bearer(&self) -> Result<String> {
    let mut cached = self.cached.lock().await;
    if let Some(token) = cached.as_ref()
      && Instant::now() < token.refresh_at
    {
      return Ok(token.value.clone());
    }

    let resp = self
      .client
      .post(self.token_url())
      .form(&[
        ("grant_type", "client_credentials"),
        ("client_id", self.credentials.client_id.as_str()),
        ("client_secret", self.credentials.client_secret.as_str()),
        ("scope", GRAPH_SCOPE),
      ])
      .send()
      .await?;
    let token: TokenResponse = check("token endpoint", resp).await?.json().await?;

    let lifetime = Duration::from_secs(token.expires_in).saturating_sub(EXPIRY_MARGIN);
    debug!(expires_in = token.expires_in, "acquired graph access token");

    let value = token.access_token.clone();
    *cached = Some(CachedToken {
      value:      token.access_token,
      refresh_at: Instant::now() + lifetime,
    });
    Ok(value)
  }
}
