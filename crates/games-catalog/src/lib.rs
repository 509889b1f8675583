//! Games service: catalog bounded context.
//!
//! Owns the game aggregate and its events, the command handlers of the
//! event-sourced write path, and the idempotent projection that keeps the
//! read store in step with the event log.

pub mod application;
pub mod domain;
