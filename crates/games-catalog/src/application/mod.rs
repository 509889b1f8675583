//! Application services for the catalog context.

pub mod command_handlers;
pub mod projection;
pub mod query_handlers;
pub mod read_store;
pub mod replay;
