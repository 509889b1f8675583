//! Shared application state.

use std::sync::Arc;

use games_catalog::application::command_handlers::CommandContext;
use games_catalog::application::read_store::GameReadStore;
use games_core::clock::Clock;
use games_core::publisher::EventPublisher;
use games_core::repository::EventRepository;

use crate::shutdown::ShutdownSignal;

/// Application state shared across all request handlers.
#[derive(Clone)]
pub struct AppState {
    /// Clock for deterministic time.
    pub clock: Arc<dyn Clock>,
    /// Event store.
    pub event_repository: Arc<dyn EventRepository>,
    /// Bus publisher.
    pub publisher: Arc<dyn EventPublisher>,
    /// Read model.
    pub read_store: Arc<dyn GameReadStore>,
    /// Fires on process shutdown; doubles as the command cancellation signal.
    pub shutdown: ShutdownSignal,
}

impl AppState {
    /// Create new application state.
    #[must_use]
    pub fn new(
        clock: Arc<dyn Clock>,
        event_repository: Arc<dyn EventRepository>,
        publisher: Arc<dyn EventPublisher>,
        read_store: Arc<dyn GameReadStore>,
        shutdown: ShutdownSignal,
    ) -> Self {
        Self {
            clock,
            event_repository,
            publisher,
            read_store,
            shutdown,
        }
    }

    /// Borrows the collaborators a command handler needs.
    #[must_use]
    pub fn command_context(&self) -> CommandContext<'_> {
        CommandContext {
            clock: self.clock.as_ref(),
            events: self.event_repository.as_ref(),
            publisher: self.publisher.as_ref(),
            read_store: self.read_store.as_ref(),
            cancellation: &self.shutdown,
        }
    }
}
