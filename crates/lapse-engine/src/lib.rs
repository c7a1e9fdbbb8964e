//! Reconciliation engine for lapse.
//!
//! Compares the credentials currently expiring upstream with the subjects
//! already in the store, publishes one event per new or re-notified subject,
//! and purges subjects that are no longer expiring.

pub mod decision;
pub mod error;
pub mod notify;
pub mod reconcile;
pub mod report;
pub mod reset;

pub use error::{Error, Result};
pub use notify::Notifier;
pub use reconcile::{Reconciler, Settings};
pub use report::CycleReport;
pub use reset::reset;
