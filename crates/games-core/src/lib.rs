//! Games Core: shared event-sourcing abstractions.
//!
//! This crate defines the traits and types the games service is built on:
//! the event store contract, the message bus contract, aggregates, commands,
//! and the error model. It contains no infrastructure code.

pub mod aggregate;
pub mod cancellation;
pub mod clock;
pub mod command;
pub mod error;
pub mod event;
pub mod message;
pub mod publisher;
pub mod repository;
pub mod version;
