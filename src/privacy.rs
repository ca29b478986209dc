//! Identifier masking applied before any text leaves the process.
//!
//! Patterns are user-defined numeric identifiers (a digit prefix plus a total
//! length, e.g. national IDs starting with `2` and 10 digits long). They are
//! persisted as a JSON settings document by [`PatternStore`], compiled into
//! word-bounded matchers by [`Redactor`], and replaced by a run of `X`
//! characters of the same length.
//!
//! ```
//! use musannif::privacy::{IdentifierPattern, Redactor};
//!
//! let pattern = IdentifierPattern::new("2", 5, "student id").unwrap();
//! let redactor = Redactor::new(&[pattern]);
//!
//! let outcome = redactor.mask(&["id 20001 here".to_string()]);
//! assert_eq!(outcome.masked, vec!["id XXXXX here"]);
//! assert!(outcome.any_changed);
//! ```

mod pattern;
mod redactor;
mod store;

pub use pattern::{
    is_duplicate, IdentifierPattern, PatternError, PrivacySettings, MAX_PATTERN_LENGTH,
    NO_DESCRIPTION,
};
pub use redactor::{CompiledMatcher, MaskOutcome, Redactor, MASK_CHAR};
pub use store::PatternStore;
