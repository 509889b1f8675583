//! Command contract.

use uuid::Uuid;

/// A request to change one aggregate.
pub trait Command: Send + Sync + std::fmt::Debug {
    /// Stable name for logging, e.g. `catalog.create_game`.
    fn command_type(&self) -> &'static str;

    /// The aggregate the command targets.
    fn aggregate_id(&self) -> Uuid;

    /// Caller-supplied id carried by every event the command produces.
    fn correlation_id(&self) -> Uuid;
}
