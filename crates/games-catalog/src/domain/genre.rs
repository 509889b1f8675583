//! The closed set of game genres.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// A game genre.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Genre {
    /// Action.
    Action,
    /// Adventure.
    Adventure,
    /// Role-playing game.
    #[serde(rename = "RPG")]
    Rpg,
    /// Strategy.
    Strategy,
    /// Simulation.
    Simulation,
    /// Sports.
    Sports,
    /// Racing.
    Racing,
    /// Puzzle.
    Puzzle,
    /// Shooter.
    Shooter,
    /// Fighting.
    Fighting,
    /// Platformer.
    Platformer,
    /// Horror.
    Horror,
}

/// Returned when a string names no known genre.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown genre: {0}")]
pub struct UnknownGenre(pub String);

impl Genre {
    /// Every genre, in declaration order.
    pub const ALL: [Self; 12] = [
        Self::Action,
        Self::Adventure,
        Self::Rpg,
        Self::Strategy,
        Self::Simulation,
        Self::Sports,
        Self::Racing,
        Self::Puzzle,
        Self::Shooter,
        Self::Fighting,
        Self::Platformer,
        Self::Horror,
    ];

    /// The canonical wire/storage name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Action => "Action",
            Self::Adventure => "Adventure",
            Self::Rpg => "RPG",
            Self::Strategy => "Strategy",
            Self::Simulation => "Simulation",
            Self::Sports => "Sports",
            Self::Racing => "Racing",
            Self::Puzzle => "Puzzle",
            Self::Shooter => "Shooter",
            Self::Fighting => "Fighting",
            Self::Platformer => "Platformer",
            Self::Horror => "Horror",
        }
    }
}

impl fmt::Display for Genre {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Genre {
    type Err = UnknownGenre;

    /// Case-insensitive.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|genre| genre.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| UnknownGenre(s.to_owned()))
    }
}
