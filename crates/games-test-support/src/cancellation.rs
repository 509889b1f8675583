//! Test cancellation signals.

use games_core::cancellation::CancellationSignal;

/// A signal that has already fired.
#[derive(Debug, Clone, Copy)]
pub struct AlreadyCancelled;

impl CancellationSignal for AlreadyCancelled {
    fn is_cancelled(&self) -> bool {
        true
    }
}
