//! Cancellation signal for command handling.
//!
//! Command handlers poll the signal before appending to the event store.
//! Once an append has succeeded the signal is no longer consulted, so an
//! accepted event is always handed to the publisher.

/// A cooperative cancellation signal.
pub trait CancellationSignal: Send + Sync {
    /// Returns `true` once the caller has asked for the operation to stop.
    fn is_cancelled(&self) -> bool;
}

/// A signal that never fires.
#[derive(Debug, Clone, Copy, Default)]
pub struct NeverCancelled;

impl CancellationSignal for NeverCancelled {
    fn is_cancelled(&self) -> bool {
        false
    }
}
