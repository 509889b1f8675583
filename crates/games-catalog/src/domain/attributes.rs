//! Public attributes of a game and the rules they must satisfy.

use games_core::error::DomainError;
use serde::{Deserialize, Serialize};

use super::genre::Genre;

/// Maximum title length, in characters.
pub const MAX_TITLE_LEN: usize = 200;
/// Maximum developer name length, in characters.
pub const MAX_DEVELOPER_LEN: usize = 100;
/// Earliest accepted launch year.
pub const MIN_LAUNCH_YEAR: i32 = 1950;
/// How many years past the current one a launch may be announced.
pub const MAX_YEARS_AHEAD: i32 = 2;

/// The mutable attributes of a game.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GameAttributes {
    /// Display title.
    pub title: String,
    /// Price in the store currency.
    pub price: f64,
    /// Year the game was (or will be) released.
    pub launch_year: i32,
    /// Studio that made the game.
    pub developer: String,
    /// Genre.
    pub genre: Genre,
}

/// The natural duplicate key: no two live games may share all three parts.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct NaturalKey {
    /// Title.
    pub title: String,
    /// Developer.
    pub developer: String,
    /// Launch year.
    pub launch_year: i32,
}

impl std::fmt::Display for NaturalKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "'{}' by '{}' ({})",
            self.title, self.developer, self.launch_year
        )
    }
}

impl GameAttributes {
    /// Returns a copy with surrounding whitespace removed from text fields.
    #[must_use]
    pub fn normalized(&self) -> Self {
        Self {
            title: self.title.trim().to_owned(),
            developer: self.developer.trim().to_owned(),
            ..self.clone()
        }
    }

    /// The natural duplicate key of these attributes.
    #[must_use]
    pub fn natural_key(&self) -> NaturalKey {
        NaturalKey {
            title: self.title.clone(),
            developer: self.developer.clone(),
            launch_year: self.launch_year,
        }
    }

    /// Checks every rule and reports all violations at once.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::Validation` with the violations joined by `"; "`.
    pub fn validate(&self, current_year: i32) -> Result<(), DomainError> {
        let mut violations = Vec::new();

        let title_len = self.title.trim().chars().count();
        if title_len == 0 {
            violations.push("title must not be empty".to_owned());
        } else if title_len > MAX_TITLE_LEN {
            violations.push(format!("title must be at most {MAX_TITLE_LEN} characters"));
        }

        let developer_len = self.developer.trim().chars().count();
        if developer_len == 0 {
            violations.push("developer must not be empty".to_owned());
        } else if developer_len > MAX_DEVELOPER_LEN {
            violations.push(format!(
                "developer must be at most {MAX_DEVELOPER_LEN} characters"
            ));
        }

        if !self.price.is_finite() || self.price < 0.0 {
            violations.push("price must be a non-negative amount".to_owned());
        }

        let latest_year = current_year + MAX_YEARS_AHEAD;
        if !(MIN_LAUNCH_YEAR..=latest_year).contains(&self.launch_year) {
            violations.push(format!(
                "launch year must be between {MIN_LAUNCH_YEAR} and {latest_year}"
            ));
        }

        if violations.is_empty() {
            Ok(())
        } else {
            Err(DomainError::Validation(violations.join("; ")))
        }
    }
}

/// A partial change to a game's attributes; `None` keeps the current value.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GameChanges {
    /// New title.
    pub title: Option<String>,
    /// New price.
    pub price: Option<f64>,
    /// New launch year.
    pub launch_year: Option<i32>,
    /// New developer.
    pub developer: Option<String>,
    /// New genre.
    pub genre: Option<Genre>,
}

impl GameChanges {
    /// Returns `true` when no attribute is set.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.title.is_none()
            && self.price.is_none()
            && self.launch_year.is_none()
            && self.developer.is_none()
            && self.genre.is_none()
    }

    /// Overlays these changes on `current`.
    #[must_use]
    pub fn apply_to(&self, current: &GameAttributes) -> GameAttributes {
        GameAttributes {
            title: self.title.clone().unwrap_or_else(|| current.title.clone()),
            price: self.price.unwrap_or(current.price),
            launch_year: self.launch_year.unwrap_or(current.launch_year),
            developer: self
                .developer
                .clone()
                .unwrap_or_else(|| current.developer.clone()),
            genre: self.genre.unwrap_or(current.genre),
        }
    }
}
