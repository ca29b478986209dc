//! Batch classification of texts into a closed category set.
//!
//! Texts are split into fixed-size batches. Each batch is sent to the model as
//! a 1-based numbered listing and the answer must come back as one
//! `"<number>. <label>"` line per text, in order. Any deviation fails the
//! whole run: a label that cannot be tied to its text is never guessed.
//!
//! ```
//! use std::sync::Arc;
//! use musannif::classifier::{BatchClassifierBuilder, NoopObserver};
//! use musannif::gemini::{GeminiError, GenerationConfig, GenerativeModel};
//!
//! struct Positive;
//!
//! impl GenerativeModel for Positive {
//!     fn generate(&self, _prompt: &str, _config: &GenerationConfig) -> Result<String, GeminiError> {
//!         Ok("1. إيجابي\n2. إيجابي".to_string())
//!     }
//! }
//!
//! let classifier = BatchClassifierBuilder::new()
//!     .client(Arc::new(Positive))
//!     .batch_size(2)
//!     .build()
//!     .unwrap();
//!
//! let texts = vec!["ممتاز".to_string(), "رائع".to_string()];
//! let categories = vec!["إيجابي".to_string(), "سلبي".to_string()];
//! let labels = classifier.classify(&texts, &categories, &NoopObserver).unwrap();
//! assert_eq!(labels, vec!["إيجابي", "إيجابي"]);
//! ```

mod batch;
mod progress;
mod response;

pub use batch::{build_prompt, BatchClassifier, BatchClassifierBuilder};
pub use progress::{BatchProgress, NoopObserver, ProgressObserver};
pub use response::{parse_numbered_labels, ResponseError};
