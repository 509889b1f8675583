//! Games service: projection consumer.
//!
//! Pulls game events from the bus and applies them to the read store,
//! acknowledging each message only once it has been handled.

pub mod config;
pub mod error;
pub mod worker;
