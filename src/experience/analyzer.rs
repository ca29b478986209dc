//! Single-text analysis returning weighted categories with explanations.

use std::sync::Arc;
use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::gemini::{GeminiError, GenerationConfig, GenerativeModel};
use crate::privacy::Redactor;

/// Prompt template for experience analysis. `{text}` is replaced by the
/// (masked) input.
const PROMPT_TEMPLATE: &str = r#"قم بتحليل نص تجربة الطالب التالي وتقديم النتائج بتنسيق JSON محدد.
يجب أن يكون التنسيق بالضبط كما يلي:
{
    "categories": [
        {
            "name": "اسم الفئة",
            "percentage": النسبة_المئوية,
            "explanation": "شرح تفصيلي للفئة"
        }
    ]
}

ملاحظات مهمة:
- النسبة_المئوية يجب أن تكون رقماً فقط بدون علامة %
- يجب أن يكون مجموع النسب المئوية 100
- الشرح يجب أن يكون موجزاً وواضحاً
- يجب أن تكون جميع النصوص باللغة العربية

النص للتحليل:
{text}
"#;

/// Responses shorter than this are rejected outright.
const MIN_RESPONSE_LEN: usize = 10;

/// Default limit on the time an analysis may take.
pub const DEFAULT_TIME_LIMIT: Duration = Duration::from_secs(30);

/// Errors raised by [`ExperienceAnalyzer::analyze`].
#[derive(Debug, Error)]
pub enum AnalysisError {
    #[error("Nothing to analyze: input text is empty")]
    EmptyInput,

    #[error("Gemini analysis failed: {0}")]
    Model(#[from] GeminiError),

    #[error("Invalid model response: {0}")]
    InvalidResponse(String),

    #[error("No Arabic text found in the model response")]
    MissingArabic,

    #[error("Failed to parse model response as analysis JSON: {0}")]
    Schema(#[source] serde_json::Error),

    #[error("Category percentages sum to {sum}, expected between {min} and {max}")]
    PercentageSum { sum: f64, min: f64, max: f64 },

    #[error("Analysis took {:.1}s, exceeding the {}s limit", .elapsed.as_secs_f64(), .limit.as_secs())]
    TimedOut { elapsed: Duration, limit: Duration },
}

/// Accepted range for the sum of category percentages.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PercentageTolerance {
    pub min: f64,
    pub max: f64,
}

impl PercentageTolerance {
    pub fn new(min: f64, max: f64) -> Self {
        Self { min, max }
    }

    pub fn contains(&self, sum: f64) -> bool {
        sum >= self.min && sum <= self.max
    }
}

impl Default for PercentageTolerance {
    fn default() -> Self {
        Self::new(95.0, 105.0)
    }
}

/// One weighted category of an analysis.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategoryShare {
    pub name: String,
    pub percentage: f64,
    pub explanation: String,
}

/// Result of analyzing one text.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExperienceAnalysis {
    /// Sorted by percentage, highest first.
    pub categories: Vec<CategoryShare>,
    /// Seconds taken, rounded to two decimals.
    pub analysis_time: f64,
}

#[derive(Deserialize)]
struct RawAnalysis {
    categories: Vec<CategoryShare>,
}

/// Builder for constructing `ExperienceAnalyzer` instances.
#[derive(Default)]
pub struct ExperienceAnalyzerBuilder {
    client: Option<Arc<dyn GenerativeModel>>,
    redactor: Option<Arc<Redactor>>,
    tolerance: Option<PercentageTolerance>,
    time_limit: Option<Duration>,
    require_arabic: Option<bool>,
}

impl ExperienceAnalyzerBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn client(mut self, client: Arc<dyn GenerativeModel>) -> Self {
        self.client = Some(client);
        self
    }

    /// Masks identifiers in the input before it is sent.
    pub fn redactor(mut self, redactor: Arc<Redactor>) -> Self {
        self.redactor = Some(redactor);
        self
    }

    pub fn tolerance(mut self, tolerance: PercentageTolerance) -> Self {
        self.tolerance = Some(tolerance);
        self
    }

    pub fn time_limit(mut self, limit: Duration) -> Self {
        self.time_limit = Some(limit);
        self
    }

    /// Whether a response without Arabic text is rejected. Defaults to true.
    pub fn require_arabic(mut self, required: bool) -> Self {
        self.require_arabic = Some(required);
        self
    }

    /// Builds the analyzer.
    ///
    /// # Panics
    ///
    /// Panics if no client was set.
    #[must_use]
    pub fn build(self) -> ExperienceAnalyzer {
        ExperienceAnalyzer {
            client: self.client.expect("client is required"),
            redactor: self.redactor,
            tolerance: self.tolerance.unwrap_or_default(),
            time_limit: self.time_limit.unwrap_or(DEFAULT_TIME_LIMIT),
            require_arabic: self.require_arabic.unwrap_or(true),
        }
    }
}

/// Asks the model to break one text down into weighted categories.
pub struct ExperienceAnalyzer {
    client: Arc<dyn GenerativeModel>,
    redactor: Option<Arc<Redactor>>,
    tolerance: PercentageTolerance,
    time_limit: Duration,
    require_arabic: bool,
}

impl ExperienceAnalyzer {
    /// Generation settings used for analysis requests.
    pub fn generation_config() -> GenerationConfig {
        GenerationConfig {
            temperature: Some(0.7),
            top_p: Some(0.95),
            top_k: Some(40),
            max_output_tokens: Some(8192),
            response_mime_type: Some("application/json".to_string()),
        }
    }

    pub fn tolerance(&self) -> PercentageTolerance {
        self.tolerance
    }

    /// Analyzes `text`.
    ///
    /// # Errors
    ///
    /// Returns an error if the model call fails, the response cannot be
    /// validated, or the analysis exceeds the time limit.
    pub fn analyze(&self, text: &str) -> Result<ExperienceAnalysis, AnalysisError> {
        let text = text.trim();
        if text.is_empty() {
            return Err(AnalysisError::EmptyInput);
        }

        let masked = match &self.redactor {
            Some(redactor) => redactor.mask_text(text),
            None => text.to_string(),
        };

        let started = Instant::now();
        let prompt = PROMPT_TEMPLATE.replace("{text}", &masked);
        let response = self.client.generate(&prompt, &Self::generation_config())?;

        let elapsed = started.elapsed();
        if elapsed > self.time_limit {
            return Err(AnalysisError::TimedOut {
                elapsed,
                limit: self.time_limit,
            });
        }

        let mut categories = self.parse_response(&response)?;
        categories.sort_by(|a, b| b.percentage.total_cmp(&a.percentage));

        let analysis_time = (started.elapsed().as_secs_f64() * 100.0).round() / 100.0;
        tracing::info!(categories = categories.len(), analysis_time, "experience analysis complete");

        Ok(ExperienceAnalysis {
            categories,
            analysis_time,
        })
    }

    fn parse_response(&self, response: &str) -> Result<Vec<CategoryShare>, AnalysisError> {
        let response = response.trim();
        if response.chars().count() < MIN_RESPONSE_LEN {
            return Err(AnalysisError::InvalidResponse(format!(
                "response is shorter than {} characters",
                MIN_RESPONSE_LEN
            )));
        }

        let json = extract_json(response).ok_or_else(|| {
            AnalysisError::InvalidResponse("response contains no JSON object".to_string())
        })?;

        if self.require_arabic && !contains_arabic(json) {
            return Err(AnalysisError::MissingArabic);
        }

        let raw: RawAnalysis = serde_json::from_str(json).map_err(AnalysisError::Schema)?;
        if raw.categories.is_empty() {
            return Err(AnalysisError::InvalidResponse(
                "analysis contains no categories".to_string(),
            ));
        }

        let sum: f64 = raw.categories.iter().map(|c| c.percentage).sum();
        if !self.tolerance.contains(sum) {
            return Err(AnalysisError::PercentageSum {
                sum,
                min: self.tolerance.min,
                max: self.tolerance.max,
            });
        }

        Ok(raw
            .categories
            .into_iter()
            .map(|c| CategoryShare {
                name: strip_emphasis(&c.name),
                percentage: c.percentage,
                explanation: strip_emphasis(&c.explanation),
            })
            .collect())
    }
}

/// Returns the outermost `{...}` span, dropping code fences and prose.
fn extract_json(response: &str) -> Option<&str> {
    let start = response.find('{')?;
    let end = response.rfind('}')?;
    (start < end).then(|| &response[start..=end])
}

fn contains_arabic(text: &str) -> bool {
    text.chars().any(|c| ('\u{0600}'..='\u{06FF}').contains(&c))
}

fn strip_emphasis(text: &str) -> String {
    text.replace("**", "").trim().to_string()
}
