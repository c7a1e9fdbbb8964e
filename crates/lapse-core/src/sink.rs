//! The `EventSink` trait: where notification events go.

use std::future::Future;

use crate::event::NotificationEvent;

/// Publishes notification events. A returned `Ok` means the event was
/// accepted by the transport.
pub trait EventSink: Send + Sync {
  type Error: std::error::Error + Send + Sync + 'static;

  fn publish<'a>(
    &'a self,
    event: &'a NotificationEvent,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + 'a;
}
