/// Gemini HTTP client module.
///
/// This module provides a blocking HTTP client for the Gemini `generateContent` API,
/// the `GenerativeModel` seam used by the classifier and analyzer, and timeout
/// configuration.
mod client;

pub use client::{
    GeminiClient, GeminiClientBuilder, GeminiError, GenerationConfig, GenerativeModel,
    DEFAULT_BASE_URL, DEFAULT_MODEL,
};
