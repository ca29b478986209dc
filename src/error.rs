use thiserror::Error;

use crate::gemini::GeminiError;
use crate::input::InputError;
use crate::privacy::PatternError;

/// Errors that abort a classification run.
///
/// Callers branch on the category: configuration problems are fixed by the
/// user, alignment problems mean the model answered in an unexpected shape,
/// capability problems come from the remote service.
#[derive(Debug, Error)]
pub enum ClassifyError {
    /// Invalid patterns, categories or batch settings.
    #[error("Configuration error: {0}")]
    Config(String),

    /// The pattern store could not be read.
    #[error("Configuration error: {0}")]
    Patterns(#[from] PatternError),

    /// The model response for a batch does not line up with the batch texts.
    #[error(
        "Batch {batch}: expected {expected} labels, received {received}: {reason}"
    )]
    Alignment {
        batch: usize,
        expected: usize,
        received: usize,
        reason: String,
    },

    /// The external classification call failed.
    #[error("Gemini batch classification failed for batch {batch}: {source}")]
    Capability {
        batch: usize,
        #[source]
        source: GeminiError,
    },

    /// The input dataset could not be read.
    #[error(transparent)]
    Input(#[from] InputError),
}

impl ClassifyError {
    /// True for errors the user can fix by changing input or settings.
    pub fn is_user_error(&self) -> bool {
        !matches!(self, ClassifyError::Capability { .. })
    }
}
