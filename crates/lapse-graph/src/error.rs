//! Error type for `lapse-graph`.

use reqwest::StatusCode;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  #[error("http error: {0}")]
  Http(#[from] reqwest::Error),

  /// The remote answered with a non-success status.
  #[error("{context} returned {status}: {body}")]
  Status {
    context: &'static str,
    status:  StatusCode,
    body:    String,
  },
}

pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Turn a non-success response into [`Error::Status`].
pub(crate) async fn check(
  context: &'static str,
  resp: reqwest::Response,
) -> Result<reqwest::Response> {
  let status = resp.status();
  if status.is_success() {
    return Ok(resp);
  }
  let body = resp.text().await.unwrap_or_default();
  Err(Error::Status { context, status, body })
}
