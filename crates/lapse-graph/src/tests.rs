//! Adapter tests against a throwaway local HTTP server standing in for Graph,
//! the token endpoint, and an Event Grid topic.

use std::{
  collections::HashMap,
  sync::{
    Arc, Mutex,
    atomic::{AtomicBool, AtomicUsize, Ordering},
  },
};

use axum::{
  Form, Json, Router,
  extract::{Query, State},
  http::{HeaderMap, StatusCode},
  response::{IntoResponse, Response},
  routing::{get, post},
};
use chrono::{DateTime, Duration, TimeZone, Utc};
use lapse_core::{
  event::{EventData, EventType, ExpiringSecret, NotificationEvent},
  sink::EventSink,
  source::CredentialSource,
  subject::{Application, ThresholdDays},
};
use serde_json::{Value, json};
use tokio::net::TcpListener;
use uuid::Uuid;

use crate::{
  Error, EventGridConfig, EventGridSink, GraphConfig, GraphSource, http_client,
};

// ─── Fake upstream ───────────────────────────────────────────────────────────

#[derive(Clone, Default)]
struct Upstream {
  base:          String,
  token_calls:   Arc<AtomicUsize>,
  fail_page_two: Arc<AtomicBool>,
  published:     Arc<Mutex<Vec<Value>>>,
}

fn now() -> DateTime<Utc> {
  Utc.with_ymd_and_hms(2024, 11, 5, 6, 0, 0).unwrap()
}

async fn token(
  State(up): State<Upstream>,
  Form(form): Form<HashMap<String, String>>,
) -> Response {
  if form.get("grant_type").map(String::as_str) != Some("client_credentials")
    || form.get("client_secret").map(String::as_str) != Some("s3cret")
  {
    return StatusCode::BAD_REQUEST.into_response();
  }
  up.token_calls.fetch_add(1, Ordering::SeqCst);
  Json(json!({ "access_token": "tok-1", "expires_in": 3600, "token_type": "Bearer" }))
    .into_response()
}

async fn applications(
  State(up): State<Upstream>,
  headers: HeaderMap,
  Query(query): Query<HashMap<String, String>>,
) -> Response {
  let authorised = headers
    .get("authorization")
    .and_then(|v| v.to_str().ok())
    == Some("Bearer tok-1");
  if !authorised {
    return StatusCode::UNAUTHORIZED.into_response();
  }

  let soon = (now() + Duration::days(3)).to_rfc3339();
  if query.get("page").map(String::as_str) == Some("2") {
    if up.fail_page_two.load(Ordering::SeqCst) {
      return (StatusCode::TOO_MANY_REQUESTS, "throttled").into_response();
    }
    return Json(json!({
      "value": [{
        "appId": "app-2",
        "displayName": "second",
        "passwordCredentials": [],
        "keyCredentials": [{ "keyId": "cert-2", "endDateTime": soon, "customKeyIdentifier": "AAE=" }]
      }]
    }))
    .into_response();
  }

  Json(json!({
    "@odata.nextLink": format!("{}/v1.0/applications?page=2", up.base),
    "value": [
      {
        "appId": "app-1",
        "displayName": "first",
        "passwordCredentials": [{ "keyId": "secret-1", "endDateTime": soon, "hint": "x1" }],
        "keyCredentials": []
      },
      {
        "appId": "app-quiet",
        "passwordCredentials": [
          { "keyId": "far", "endDateTime": (now() + Duration::days(400)).to_rfc3339() }
        ]
      }
    ]
  }))
  .into_response()
}

async fn topic(State(up): State<Upstream>, headers: HeaderMap, Json(body): Json<Value>) -> Response {
  if headers.get("aeg-sas-key").and_then(|v| v.to_str().ok()) != Some("topic-key") {
    return StatusCode::UNAUTHORIZED.into_response();
  }
  up.published.lock().unwrap().push(body);
  StatusCode::OK.into_response()
}

async fn upstream() -> Upstream {
  let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
  let up = Upstream {
    base: format!("http://{}", listener.local_addr().unwrap()),
    ..Upstream::default()
  };

  let app = Router::new()
    .route("/tenant-1/oauth2/v2.0/token", post(token))
    .route("/v1.0/applications", get(applications))
    .route("/api/events", post(topic))
    .with_state(up.clone());
  tokio::spawn(async move { axum::serve(listener, app).await.unwrap() });
  up
}

fn graph(up: &Upstream) -> GraphSource {
  GraphSource::from_config(http_client().unwrap(), &GraphConfig {
    tenant_id:     "tenant-1".into(),
    client_id:     "client-1".into(),
    client_secret: "s3cret".into(),
    base_url:      up.base.clone(),
    authority:     up.base.clone(),
  })
}

fn sink(up: &Upstream, key: &str) -> EventGridSink {
  EventGridSink::from_config(http_client().unwrap(), &EventGridConfig {
    topic_endpoint:         format!("{}/api/events", up.base),
    topic_key:              key.into(),
    secret_event_type:      "Contoso.ExpiringSecret".into(),
    certificate_event_type: "Contoso.ExpiringCertificate".into(),
  })
}

fn secret_event() -> NotificationEvent {
  NotificationEvent {
    id:              Uuid::new_v4(),
    subject_address: "tenant-1/app-1".into(),
    event_type:      EventType::ExpiringSecret,
    schema_version:  "1.0".into(),
    timestamp:       now(),
    data:            EventData::Secret(ExpiringSecret {
      app_registration: Application {
        display_name:      Some("first".into()),
        app_id:            "app-1".into(),
        created_date_time: None,
      },
      start_date_time:  None,
      end_date_time:    Some(now() + Duration::days(3)),
      days_left:        3,
      description:      Some("ci".into()),
      value_hint:       Some("x1".into()),
    }),
  }
}

// ─── Graph source ────────────────────────────────────────────────────────────

#[tokio::test]
async fn fetch_drains_every_page() {
  let up = upstream().await;

  let subjects = graph(&up)
    .fetch_expiring(ThresholdDays::new(30).unwrap(), now())
    .await
    .unwrap();

  let ids: Vec<_> = subjects.iter().map(|s| s.id.as_str()).collect();
  assert_eq!(ids, vec!["secret-1", "cert-2"]);
  assert_eq!(subjects[1].application.app_id, "app-2");
}

#[tokio::test]
async fn failed_page_fails_the_whole_fetch() {
  let up = upstream().await;
  up.fail_page_two.store(true, Ordering::SeqCst);

  let err = graph(&up)
    .fetch_expiring(ThresholdDays::new(30).unwrap(), now())
    .await
    .unwrap_err();

  assert!(matches!(err, Error::Status { status, .. } if status == StatusCode::TOO_MANY_REQUESTS));
}

#[tokio::test]
async fn token_is_reused_across_fetches() {
  let up = upstream().await;
  let source = graph(&up);

  for _ in 0..2 {
    source
      .fetch_expiring(ThresholdDays::new(30).unwrap(), now())
      .await
      .unwrap();
  }

  assert_eq!(up.token_calls.load(Ordering::SeqCst), 1);
}

// ─── Event Grid sink ─────────────────────────────────────────────────────────

#[tokio::test]
async fn publish_uses_event_grid_schema() {
  let up = upstream().await;
  let event = secret_event();

  sink(&up, "topic-key").publish(&event).await.unwrap();

  let published = up.published.lock().unwrap().clone();
  assert_eq!(published.len(), 1);
  let grid = &published[0][0];
  assert_eq!(grid["id"], event.id.to_string());
  assert_eq!(grid["subject"], "tenant-1/app-1");
  assert_eq!(grid["eventType"], "Contoso.ExpiringSecret");
  assert_eq!(grid["dataVersion"], "1.0");
  assert_eq!(grid["data"]["valueHint"], "x1");
  assert_eq!(grid["data"]["daysLeft"], 3);
}

#[tokio::test]
async fn rejected_publish_is_an_error() {
  let up = upstream().await;

  let err = sink(&up, "wrong-key").publish(&secret_event()).await.unwrap_err();

  assert!(matches!(err, Error::Status { status, .. } if status == StatusCode::UNAUTHORIZED));
  assert!(up.published.lock().unwrap().is_empty());
}
