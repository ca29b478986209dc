pub mod classifier;
pub mod config;
pub mod doctor;
pub mod error;
pub mod experience;
pub mod gemini;
pub mod input;
pub mod output;
pub mod pipeline;
pub mod privacy;
pub mod report;
pub mod session;
pub mod utils;

pub use classifier::{BatchClassifier, BatchClassifierBuilder, BatchProgress, ProgressObserver};
pub use error::ClassifyError;
pub use gemini::{GeminiClient, GeminiClientBuilder, GeminiError, GenerativeModel};
pub use output::{OutputRow, OutputTable};
pub use pipeline::ClassificationPipeline;
pub use privacy::{IdentifierPattern, PatternStore, PrivacySettings, Redactor};
pub use session::Session;
