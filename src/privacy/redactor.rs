use std::borrow::Cow;

use regex::Regex;

use super::pattern::IdentifierPattern;

/// Character repeated to replace a masked identifier.
pub const MASK_CHAR: char = 'X';

/// A word-bounded matcher derived from one [`IdentifierPattern`].
///
/// Recognizes exactly `total_length` digits starting with the prefix, so it
/// never fires inside a longer digit run. A pattern that fails validation
/// compiles to a matcher without a regex, which never matches.
#[derive(Debug, Clone)]
pub struct CompiledMatcher {
    pattern: IdentifierPattern,
    regex: Option<Regex>,
    replacement: String,
}

impl CompiledMatcher {
    /// Compiles a pattern into a matcher.
    pub fn compile(pattern: &IdentifierPattern) -> Self {
        let regex = match pattern.validate() {
            Ok(()) => build_regex(pattern),
            Err(e) => {
                tracing::warn!(
                    prefix = pattern.prefix(),
                    length = pattern.total_length(),
                    error = %e,
                    "ignoring invalid masking pattern"
                );
                None
            }
        };

        Self {
            pattern: pattern.clone(),
            regex,
            replacement: MASK_CHAR.to_string().repeat(pattern.total_length()),
        }
    }

    pub fn pattern(&self) -> &IdentifierPattern {
        &self.pattern
    }

    /// Returns false for matchers built from invalid patterns.
    pub fn is_active(&self) -> bool {
        self.regex.is_some()
    }

    /// Replaces every non-overlapping match in `text`.
    pub fn apply<'a>(&self, text: &'a str) -> Cow<'a, str> {
        match &self.regex {
            Some(regex) => regex.replace_all(text, regex::NoExpand(&self.replacement)),
            None => Cow::Borrowed(text),
        }
    }
}

fn build_regex(pattern: &IdentifierPattern) -> Option<Regex> {
    let remaining = pattern.remaining_digits()?;
    let source = format!(r"\b{}\d{{{}}}\b", regex::escape(pattern.prefix()), remaining);
    Regex::new(&source)
        .map_err(|e| {
            tracing::warn!(prefix = pattern.prefix(), error = %e, "pattern failed to compile");
        })
        .ok()
}

/// Result of masking a sequence of texts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MaskOutcome {
    /// Masked texts, same length and order as the input.
    pub masked: Vec<String>,
    /// True iff at least one text differs from its input.
    pub any_changed: bool,
}

/// Applies a set of compiled identifier matchers to texts.
///
/// Matchers run one after another over the whole text, longest prefix first
/// (then longer total length, then prefix order, then definition order).
/// Replaced positions hold `X` characters and can no longer match a digit
/// pattern.
#[derive(Debug, Clone, Default)]
pub struct Redactor {
    matchers: Vec<CompiledMatcher>,
}

impl Redactor {
    /// Compiles `patterns` into a redactor.
    pub fn new(patterns: &[IdentifierPattern]) -> Self {
        let mut matchers: Vec<CompiledMatcher> =
            patterns.iter().map(CompiledMatcher::compile).collect();
        // stable sort keeps definition order among equal keys
        matchers.sort_by(|a, b| {
            b.pattern
                .prefix()
                .len()
                .cmp(&a.pattern.prefix().len())
                .then_with(|| b.pattern.total_length().cmp(&a.pattern.total_length()))
                .then_with(|| a.pattern.prefix().cmp(b.pattern.prefix()))
        });
        Self { matchers }
    }

    pub fn matchers(&self) -> &[CompiledMatcher] {
        &self.matchers
    }

    /// Returns true if no matcher can ever fire.
    pub fn is_empty(&self) -> bool {
        !self.matchers.iter().any(CompiledMatcher::is_active)
    }

    /// Masks a single text.
    pub fn mask_text(&self, text: &str) -> String {
        let mut current = text.to_string();
        for matcher in &self.matchers {
            let replaced = match matcher.apply(&current) {
                Cow::Owned(replaced) => Some(replaced),
                Cow::Borrowed(_) => None,
            };
            if let Some(replaced) = replaced {
                current = replaced;
            }
        }
        current
    }

    /// Masks every text and reports whether any of them changed.
    pub fn mask(&self, texts: &[String]) -> MaskOutcome {
        if self.is_empty() {
            return MaskOutcome {
                masked: texts.to_vec(),
                any_changed: false,
            };
        }

        let masked: Vec<String> = texts.iter().map(|t| self.mask_text(t)).collect();
        let changed = masked
            .iter()
            .zip(texts)
            .filter(|(after, before)| after != before)
            .count();
        if changed > 0 {
            tracing::debug!(changed, total = texts.len(), "masked identifiers");
        }

        MaskOutcome {
            masked,
            any_changed: changed > 0,
        }
    }
}
