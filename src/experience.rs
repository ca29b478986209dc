//! Free-form analysis of a single student-experience text.
//!
//! Unlike batch classification, the model chooses the categories itself and
//! returns each with a percentage weight and an explanation. Identifiers are
//! masked before the text is sent.
//!
//! # Examples
//!
//! ```no_run
//! use std::sync::Arc;
//! use musannif::experience::ExperienceAnalyzerBuilder;
//! use musannif::gemini::GeminiClientBuilder;
//!
//! # fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let client = GeminiClientBuilder::new().build()?;
//! let analyzer = ExperienceAnalyzerBuilder::new()
//!     .client(Arc::new(client))
//!     .build();
//!
//! let analysis = analyzer.analyze("المحاضرات مفيدة لكن الخدمات الطلابية بطيئة")?;
//! for share in &analysis.categories {
//!     println!("{} {}%", share.name, share.percentage);
//! }
//! # Ok(())
//! # }
//! ```

mod analyzer;

pub use analyzer::{
    AnalysisError, CategoryShare, ExperienceAnalysis, ExperienceAnalyzer, ExperienceAnalyzerBuilder,
    PercentageTolerance, DEFAULT_TIME_LIMIT,
};
