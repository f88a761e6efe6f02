//! Domain library for the preference store.
//!
//! This crate holds the domain types, ports (traits), and error definitions.
//! It depends on `serde` only. Keep adapters and IO concerns out of this crate.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::error::Error;
use std::fmt::{Display, Formatter};

pub mod adapters;
pub mod key;

pub use key::PreferenceKey;

/// Category a preference belongs to. Identifiers are unique within a category.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PreferenceCategory {
    Books,
    Movies,
    Music,
    Television,
    VideoGames,
}

impl PreferenceCategory {
    pub const ALL: [PreferenceCategory; 5] = [
        PreferenceCategory::Books,
        PreferenceCategory::Movies,
        PreferenceCategory::Music,
        PreferenceCategory::Television,
        PreferenceCategory::VideoGames,
    ];

    /// Stable tag used in composite keys. Part of the stored format.
    pub fn as_str(&self) -> &'static str {
        match self {
            PreferenceCategory::Books => "BOOKS",
            PreferenceCategory::Movies => "MOVIES",
            PreferenceCategory::Music => "MUSIC",
            PreferenceCategory::Television => "TELEVISION",
            PreferenceCategory::VideoGames => "VIDEO_GAMES",
        }
    }

    /// Exact, case-sensitive match on the stored tag.
    pub fn parse(s: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|c| c.as_str() == s)
    }
}

impl Display for PreferenceCategory {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A directed, weighted association from one preference to another.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct PreferenceCorrelation {
    /// Composite key (`id#CATEGORY`) of the target preference.
    pub to_preference_id: String,
    pub weight: i32,
}

impl PreferenceCorrelation {
    pub fn new<S: Into<String>>(to_preference_id: S, weight: i32) -> Self {
        Self {
            to_preference_id: to_preference_id.into(),
            weight,
        }
    }

    /// Correlation to the preference identified by `key`.
    pub fn for_key(key: &PreferenceKey, weight: i32) -> Self {
        Self::new(key.encode(), weight)
    }
}

/// An item a user can favor, with a popularity score and weighted
/// correlations to other preferences.
///
/// Fields are only reachable through accessors so every value has passed
/// `Preference::new`. Equality compares correlations as a set.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(try_from = "PreferenceFields")]
pub struct Preference {
    id: String,
    category: PreferenceCategory,
    popularity: u32,
    correlations: Vec<PreferenceCorrelation>,
}

/// Unvalidated wire shape; deserialization goes through `Preference::new`.
#[derive(Deserialize)]
struct PreferenceFields {
    id: String,
    category: PreferenceCategory,
    popularity: u32,
    correlations: Vec<PreferenceCorrelation>,
}

impl TryFrom<PreferenceFields> for Preference {
    type Error = CoreError;

    fn try_from(f: PreferenceFields) -> Result<Self, Self::Error> {
        Preference::new(f.id, f.category, f.popularity, f.correlations)
    }
}

impl Preference {
    /// Build a preference, rejecting empty ids and duplicate correlation targets.
    pub fn new<S: Into<String>>(
        id: S,
        category: PreferenceCategory,
        popularity: u32,
        correlations: Vec<PreferenceCorrelation>,
    ) -> Result<Self, CoreError> {
        let id = id.into();
        if id.is_empty() {
            return Err(CoreError::InvalidPreferenceId("empty".into()));
        }
        let mut seen = HashSet::with_capacity(correlations.len());
        for c in &correlations {
            if !seen.insert(c.to_preference_id.as_str()) {
                return Err(CoreError::DuplicateCorrelation(c.to_preference_id.clone()));
            }
        }
        Ok(Self {
            id,
            category,
            popularity,
            correlations,
        })
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn category(&self) -> PreferenceCategory {
        self.category
    }

    pub fn popularity(&self) -> u32 {
        self.popularity
    }

    /// Correlations in no particular order.
    pub fn correlations(&self) -> &[PreferenceCorrelation] {
        &self.correlations
    }

    /// Composite key identifying this preference in storage.
    pub fn key(&self) -> PreferenceKey {
        PreferenceKey::from_parts(self.id.clone(), self.category)
    }

    /// Weight of the correlation to `to_preference_id`, if any.
    pub fn correlation_weight(&self, to_preference_id: &str) -> Option<i32> {
        self.correlations
            .iter()
            .find(|c| c.to_preference_id == to_preference_id)
            .map(|c| c.weight)
    }

    /// Correlations sorted by target id.
    pub fn sorted_correlations(&self) -> Vec<PreferenceCorrelation> {
        let mut v = self.correlations.clone();
        v.sort();
        v
    }
}

impl PartialEq for Preference {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
            && self.category == other.category
            && self.popularity == other.popularity
            && self.correlations.len() == other.correlations.len()
            && self.sorted_correlations() == other.sorted_correlations()
    }
}

impl Eq for Preference {}

/// Repository port for persisting and loading preferences.
pub trait PreferenceRepository: Send + Sync {
    fn get(&self, key: &PreferenceKey) -> Result<Option<Preference>, CoreError>;
    /// Store a preference, replacing any previous version under the same key.
    fn put(&self, preference: Preference) -> Result<(), CoreError>;
}

/// Core domain errors (no external error crates to keep deps light).
#[derive(Debug)]
pub enum CoreError {
    InvalidPreferenceId(String),
    InvalidKey(String),
    DuplicateCorrelation(String),
    Repository(String),
}

impl Display for CoreError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            CoreError::InvalidPreferenceId(msg) => write!(f, "invalid preference id: {}", msg),
            CoreError::InvalidKey(msg) => write!(f, "invalid preference key: {}", msg),
            CoreError::DuplicateCorrelation(target) => {
                write!(f, "duplicate correlation target: {}", target)
            }
            CoreError::Repository(msg) => write!(f, "repository error: {}", msg),
        }
    }
}

impl Error for CoreError {}
