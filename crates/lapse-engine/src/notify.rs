//! [`Notifier`] turns a subject into a [`NotificationEvent`] and publishes it.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use lapse_core::{
  event::{
    EventData, EventType, ExpiringCertificate, ExpiringSecret, NotificationEvent,
    SCHEMA_VERSION,
  },
  sink::EventSink,
  subject::{CredentialKind, Subject},
};
use uuid::Uuid;

/// Builds and publishes one event per notified subject.
pub struct Notifier<E> {
  sink:      Arc<E>,
  tenant_id: String,
}

impl<E> Notifier<E> {
  pub fn new(sink: Arc<E>, tenant_id: impl Into<String>) -> Self {
    Self { sink, tenant_id: tenant_id.into() }
  }

  /// Build the event for `subject`, with `days_left` evaluated at `now`.
  pub fn build_event(&self, subject: &Subject, now: DateTime<Utc>) -> NotificationEvent {
    let app = subject.application.clone();
    let days_left = subject.days_left(now);

    let data = match subject.kind {
      CredentialKind::Secret => EventData::Secret(ExpiringSecret {
        app_registration: app,
        start_date_time:  subject.start_date_time,
        end_date_time:    subject.end_date_time,
        days_left,
        description:      subject.display_name.clone(),
        value_hint:       subject.context.clone(),
      }),
      CredentialKind::Certificate => EventData::Certificate(ExpiringCertificate {
        app_registration: app,
        days_left,
        display_name:     subject.display_name.clone(),
        start_date_time:  subject.start_date_time,
        end_date_time:    subject.end_date_time,
        thumbprint:       subject.context.clone(),
      }),
    };

    NotificationEvent {
      id: Uuid::new_v4(),
      subject_address: format!("{}/{}", self.tenant_id, subject.application.app_id),
      event_type: EventType::from(subject.kind),
      schema_version: SCHEMA_VERSION.to_owned(),
      timestamp: now,
      data,
    }
  }
}

impl<E: EventSink> Notifier<E> {
  /// Publish the event for `subject`. Sink errors are returned as-is.
  pub async fn notify(
    &self,
    subject: &Subject,
    now: DateTime<Utc>,
  ) -> Result<NotificationEvent, E::Error> {
    let event = self.build_event(subject, now);
    self.sink.publish(&event).await?;
    Ok(event)
  }
}
