//! Core domain + application logic for the Telegram broadcast dispatcher.
//!
//! This crate is intentionally framework-agnostic. The Telegram Bot API and
//! the HTTP surface live behind ports (traits) implemented in adapter crates.

pub mod config;
pub mod dispatcher;
pub mod domain;
pub mod errors;
pub mod locks;
pub mod logging;
pub mod messaging;
pub mod progress;
pub mod store;

pub use errors::{Error, Result};
