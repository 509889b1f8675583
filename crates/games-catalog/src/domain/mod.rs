//! Domain model for the catalog context.

pub mod aggregates;
pub mod attributes;
pub mod commands;
pub mod events;
pub mod genre;
