//! Core types and trait definitions for lapse, the credential expiry notifier.
//!
//! This crate is deliberately free of HTTP and database dependencies.
//! All other crates depend on it; it depends on nothing proprietary.

pub mod error;
pub mod event;
pub mod memory;
pub mod sink;
pub mod source;
pub mod store;
pub mod subject;

pub use error::{Error, Result};
