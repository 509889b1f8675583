//! Commands for the catalog context.

use games_core::command::Command;
use uuid::Uuid;

use super::attributes::{GameAttributes, GameChanges};

/// Command to register a new game.
#[derive(Debug, Clone)]
pub struct CreateGame {
    /// The correlation ID for tracing.
    pub correlation_id: Uuid,
    /// The identifier to assign to the new game.
    pub game_id: Uuid,
    /// Initial attributes.
    pub attributes: GameAttributes,
}

/// Command to change some of a game's attributes.
#[derive(Debug, Clone)]
pub struct UpdateGame {
    /// The correlation ID for tracing.
    pub correlation_id: Uuid,
    /// The game identifier.
    pub game_id: Uuid,
    /// Attributes to change.
    pub changes: GameChanges,
}

/// Command to remove a game.
#[derive(Debug, Clone)]
pub struct DeleteGame {
    /// The correlation ID for tracing.
    pub correlation_id: Uuid,
    /// The game identifier.
    pub game_id: Uuid,
}

/// Command to publish every stored event of a game again, in version order.
#[derive(Debug, Clone)]
pub struct RepublishGame {
    /// The correlation ID for tracing.
    pub correlation_id: Uuid,
    /// The game identifier.
    pub game_id: Uuid,
}

impl Command for CreateGame {
    fn command_type(&self) -> &'static str {
        "catalog.create_game"
    }

    fn aggregate_id(&self) -> Uuid {
        self.game_id
    }

    fn correlation_id(&self) -> Uuid {
        self.correlation_id
    }
}

impl Command for UpdateGame {
    fn command_type(&self) -> &'static str {
        "catalog.update_game"
    }

    fn aggregate_id(&self) -> Uuid {
        self.game_id
    }

    fn correlation_id(&self) -> Uuid {
        self.correlation_id
    }
}

impl Command for DeleteGame {
    fn command_type(&self) -> &'static str {
        "catalog.delete_game"
    }

    fn aggregate_id(&self) -> Uuid {
        self.game_id
    }

    fn correlation_id(&self) -> Uuid {
        self.correlation_id
    }
}

impl Command for RepublishGame {
    fn command_type(&self) -> &'static str {
        "catalog.republish_game"
    }

    fn aggregate_id(&self) -> Uuid {
        self.game_id
    }

    fn correlation_id(&self) -> Uuid {
        self.correlation_id
    }
}
