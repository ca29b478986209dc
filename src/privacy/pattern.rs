use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Largest identifier length accepted when creating a pattern.
pub const MAX_PATTERN_LENGTH: usize = 20;

/// Description stored for patterns created without one ("no description").
pub const NO_DESCRIPTION: &str = "بدون وصف";

/// Errors raised while creating, persisting or loading masking patterns.
#[derive(Debug, Error)]
pub enum PatternError {
    #[error("Pattern prefix cannot be empty")]
    EmptyPrefix,

    #[error("Pattern prefix must contain digits only: {0:?}")]
    NonDigitPrefix(String),

    #[error("Pattern length must be between 1 and {}, got {0}", MAX_PATTERN_LENGTH)]
    LengthOutOfRange(usize),

    #[error("Pattern length {length} is shorter than its prefix {prefix:?}")]
    LengthShorterThanPrefix { prefix: String, length: usize },

    #[error("A pattern starting with {prefix:?} and {length} digits long already exists")]
    Duplicate { prefix: String, length: usize },

    #[error("No pattern at position {index} ({count} patterns defined)")]
    IndexOutOfRange { index: usize, count: usize },

    #[error("Failed to read privacy settings {}: {source}", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to write privacy settings {}: {source}", .path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Malformed privacy settings {}: {source}", .path.display())]
    Malformed {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

/// A numeric identifier to mask: `total_length` digits starting with `prefix`.
///
/// Serialized with the field names of the settings document
/// (`start_with`, `length`, `description`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IdentifierPattern {
    #[serde(rename = "start_with")]
    prefix: String,
    #[serde(rename = "length")]
    total_length: usize,
    #[serde(default)]
    description: String,
}

impl IdentifierPattern {
    /// Creates a validated pattern.
    ///
    /// The prefix is trimmed and must be non-empty ASCII digits; `total_length`
    /// must be in `1..=MAX_PATTERN_LENGTH` and not shorter than the prefix.
    /// A blank description becomes [`NO_DESCRIPTION`].
    ///
    /// # Errors
    ///
    /// Returns the `PatternError` variant naming the violated rule.
    pub fn new(
        prefix: &str,
        total_length: usize,
        description: &str,
    ) -> Result<Self, PatternError> {
        let prefix = prefix.trim();
        let description = description.trim();
        let pattern = Self {
            prefix: prefix.to_string(),
            total_length,
            description: if description.is_empty() {
                NO_DESCRIPTION.to_string()
            } else {
                description.to_string()
            },
        };
        pattern.validate()?;
        Ok(pattern)
    }

    /// Checks the creation invariants on an already constructed pattern.
    ///
    /// Patterns read from disk skip [`IdentifierPattern::new`], so the
    /// redactor calls this before compiling them.
    pub fn validate(&self) -> Result<(), PatternError> {
        if self.prefix.is_empty() {
            return Err(PatternError::EmptyPrefix);
        }
        if !self.prefix.chars().all(|c| c.is_ascii_digit()) {
            return Err(PatternError::NonDigitPrefix(self.prefix.clone()));
        }
        if self.total_length == 0 || self.total_length > MAX_PATTERN_LENGTH {
            return Err(PatternError::LengthOutOfRange(self.total_length));
        }
        if self.total_length < self.prefix.len() {
            return Err(PatternError::LengthShorterThanPrefix {
                prefix: self.prefix.clone(),
                length: self.total_length,
            });
        }
        Ok(())
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    pub fn total_length(&self) -> usize {
        self.total_length
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    /// Number of digits that must follow the prefix.
    ///
    /// `None` when the pattern is shorter than its own prefix.
    pub fn remaining_digits(&self) -> Option<usize> {
        self.total_length.checked_sub(self.prefix.len())
    }
}

/// The persisted settings document: `{"id_patterns": [...]}`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PrivacySettings {
    #[serde(default)]
    pub id_patterns: Vec<IdentifierPattern>,
}

impl PrivacySettings {
    pub fn is_empty(&self) -> bool {
        self.id_patterns.is_empty()
    }

    pub fn len(&self) -> usize {
        self.id_patterns.len()
    }
}

/// Returns true if `settings` already holds a pattern with this prefix and length.
///
/// ```
/// use musannif::privacy::{is_duplicate, IdentifierPattern, PrivacySettings};
///
/// let settings = PrivacySettings {
///     id_patterns: vec![IdentifierPattern::new("2", 5, "").unwrap()],
/// };
/// assert!(is_duplicate(&settings, "2", 5));
/// assert!(!is_duplicate(&settings, "3", 5));
/// ```
pub fn is_duplicate(settings: &PrivacySettings, prefix: &str, length: usize) -> bool {
    settings
        .id_patterns
        .iter()
        .any(|p| p.prefix == prefix && p.total_length == length)
}
