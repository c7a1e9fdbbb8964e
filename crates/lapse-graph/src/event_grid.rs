//! [`EventGridSink`] publishes notification events to an Azure Event Grid
//! topic using the Event Grid event schema.

use chrono::{DateTime, Utc};
use lapse_core::{
  event::{EventData, EventType, NotificationEvent},
  sink::EventSink,
};
use serde::Serialize;
use uuid::Uuid;

use crate::{Result, error::check};

/// Header carrying the topic access key.
pub const SAS_KEY_HEADER: &str = "aeg-sas-key";

/// Topic endpoint, key, and the event type names to publish under.
#[derive(Debug, Clone)]
pub struct EventGridTopic {
  pub endpoint:               String,
  pub key:                    String,
  pub secret_event_type:      String,
  pub certificate_event_type: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GridEvent<'a> {
  id:           Uuid,
  subject:      &'a str,
  event_type:   &'a str,
  data_version: &'a str,
  event_time:   DateTime<Utc>,
  data:         &'a EventData,
}

/// Publishes each event as a single-element batch.
pub struct EventGridSink {
  client: reqwest::Client,
  topic:  EventGridTopic,
}

impl EventGridSink {
  pub fn new(client: reqwest::Client, topic: EventGridTopic) -> Self { Self { client, topic } }

  fn event_type_name(&self, event_type: EventType) -> &str {
    match event_type {
      EventType::ExpiringSecret => &self.topic.secret_event_type,
      EventType::ExpiringCertificate => &self.topic.certificate_event_type,
    }
  }
}

impl EventSink for EventGridSink {
  type Error = crate::Error;

  async fn publish(&self, event: &NotificationEvent) -> Result<()> {
    let batch = [GridEvent {
      id:           event.id,
      subject:      &event.subject_address,
      event_type:   self.event_type_name(event.event_type),
      data_version: &event.schema_version,
      event_time:   event.timestamp,
      data:         &event.data,
    }];

    let resp = self
      .client
      .post(&self.topic.endpoint)
      .header(SAS_KEY_HEADER, &self.topic.key)
      .json(&batch)
      .send()
      .await?;
    check("event grid topic", resp).await?;
    Ok(())
  }
}
