//! Chunked dispatch of texts to the classification model.

use std::sync::Arc;
use std::time::Instant;

use crate::error::ClassifyError;
use crate::gemini::{GenerationConfig, GenerativeModel};

use super::progress::{BatchProgress, ProgressObserver};
use super::response::{parse_numbered_labels, received_lines, ResponseError};

/// Prompt template for batch classification.
///
/// `{categories}` is replaced by the comma-separated category list and
/// `{texts}` by the numbered listing of the batch.
const PROMPT_TEMPLATE: &str = r#"Classify each of the following numbered texts into exactly one of these categories: {categories}

Texts to classify:
{texts}

For your response:
1. Return ONLY a numbered list matching the input numbers
2. Each line should contain ONLY the number and category
3. Format: "1. Category"
4. No explanations or additional text"#;

/// Builds the classification prompt for one batch.
///
/// Texts are numbered from 1. Line breaks inside a text are flattened so
/// that each text occupies exactly one line of the listing.
pub fn build_prompt(texts: &[String], categories: &[String]) -> String {
    let numbered = texts
        .iter()
        .enumerate()
        .map(|(i, text)| format!("{}. {}", i + 1, text.replace(['\r', '\n'], " ")))
        .collect::<Vec<_>>()
        .join("\n");

    PROMPT_TEMPLATE
        .replace("{categories}", &categories.join(", "))
        .replace("{texts}", &numbered)
}

/// Builder for constructing `BatchClassifier` instances.
///
/// Follows the same pattern as `GeminiClientBuilder`.
#[derive(Default)]
pub struct BatchClassifierBuilder {
    client: Option<Arc<dyn GenerativeModel>>,
    batch_size: Option<usize>,
    validate_labels: bool,
}

impl BatchClassifierBuilder {
    /// Creates a new `BatchClassifierBuilder` with default configuration.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the model used to classify each batch.
    pub fn client(mut self, client: Arc<dyn GenerativeModel>) -> Self {
        self.client = Some(client);
        self
    }

    /// Sets how many texts are sent per request. Defaults to
    /// [`DEFAULT_BATCH_SIZE`](crate::config::DEFAULT_BATCH_SIZE).
    pub fn batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = Some(batch_size);
        self
    }

    /// When enabled, a label outside the category set fails the run.
    pub fn validate_labels(mut self, enabled: bool) -> Self {
        self.validate_labels = enabled;
        self
    }

    /// Builds the `BatchClassifier`.
    ///
    /// # Errors
    ///
    /// Returns `ClassifyError::Config` if no client was set or the batch size is zero.
    pub fn build(self) -> Result<BatchClassifier, ClassifyError> {
        let client = self
            .client
            .ok_or_else(|| ClassifyError::Config("a model client is required".to_string()))?;
        let batch_size = self.batch_size.unwrap_or(crate::config::DEFAULT_BATCH_SIZE);
        if batch_size == 0 {
            return Err(ClassifyError::Config(
                "batch size must be at least 1".to_string(),
            ));
        }

        Ok(BatchClassifier {
            client,
            batch_size,
            validate_labels: self.validate_labels,
        })
    }
}

/// Classifies texts in fixed-size batches and reassembles labels in input order.
///
/// Batches are sent strictly one after another. The returned labels always
/// have the same length and order as the input texts; anything else is an
/// error and no partial result is returned.
pub struct BatchClassifier {
    client: Arc<dyn GenerativeModel>,
    batch_size: usize,
    validate_labels: bool,
}

impl BatchClassifier {
    pub fn batch_size(&self) -> usize {
        self.batch_size
    }

    /// Classifies `texts` into `categories`.
    ///
    /// # Errors
    ///
    /// - `ClassifyError::Config` if `categories` is empty.
    /// - `ClassifyError::Capability` if a model call fails. Nothing is retried.
    /// - `ClassifyError::Alignment` if a response does not parse into exactly
    ///   one numbered label per text of its batch.
    pub fn classify(
        &self,
        texts: &[String],
        categories: &[String],
        observer: &dyn ProgressObserver,
    ) -> Result<Vec<String>, ClassifyError> {
        if categories.is_empty() {
            return Err(ClassifyError::Config(
                "at least one category is required".to_string(),
            ));
        }
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        let total = texts.len();
        let total_batches = total.div_ceil(self.batch_size);
        let config = GenerationConfig::default();
        let started = Instant::now();
        let mut labels = Vec::with_capacity(total);

        tracing::info!(total, total_batches, batch_size = self.batch_size, "starting classification");

        for (idx, chunk) in texts.chunks(self.batch_size).enumerate() {
            let batch = idx + 1;
            let prompt = build_prompt(chunk, categories);

            let response = self
                .client
                .generate(&prompt, &config)
                .map_err(|source| ClassifyError::Capability { batch, source })?;

            let chunk_labels = parse_numbered_labels(&response, chunk.len())
                .map_err(|e| alignment_error(batch, chunk.len(), &response, e))?;

            if self.validate_labels
                && let Some(unknown) = chunk_labels.iter().find(|l| !categories.contains(l))
            {
                return Err(ClassifyError::Alignment {
                    batch,
                    expected: chunk.len(),
                    received: chunk_labels.len(),
                    reason: format!("label {:?} is not one of the categories", unknown),
                });
            }

            labels.extend(chunk_labels);

            let progress = BatchProgress {
                batch,
                total_batches,
                processed: labels.len(),
                total,
                elapsed: started.elapsed(),
            };
            tracing::debug!(
                batch,
                total_batches,
                processed = progress.processed,
                eta_secs = progress.eta().as_secs_f64(),
                "batch classified"
            );
            observer.batch_completed(&progress);
        }

        debug_assert_eq!(labels.len(), total);
        Ok(labels)
    }
}

fn alignment_error(
    batch: usize,
    expected: usize,
    response: &str,
    error: ResponseError,
) -> ClassifyError {
    let received = match &error {
        ResponseError::WrongCount { received, .. } => *received,
        _ => received_lines(response),
    };
    tracing::warn!(batch, expected, received, error = %error, "model response does not align with batch");
    ClassifyError::Alignment {
        batch,
        expected,
        received,
        reason: error.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classifier::NoopObserver;
    use crate::gemini::GeminiError;
    use std::cell::RefCell;
    use std::collections::VecDeque;
    use std::sync::Mutex;

    /// Returns queued responses in order and records every prompt.
    struct ScriptedModel {
        responses: Mutex<VecDeque<Result<String, GeminiError>>>,
        prompts: Mutex<Vec<String>>,
    }

    impl ScriptedModel {
        fn new(responses: Vec<Result<String, GeminiError>>) -> Arc<Self> {
            Arc::new(Self {
                responses: Mutex::new(responses.into()),
                prompts: Mutex::new(Vec::new()),
            })
        }

        fn calls(&self) -> usize {
            self.prompts.lock().unwrap().len()
        }
    }

    impl GenerativeModel for ScriptedModel {
        fn generate(&self, prompt: &str, _config: &GenerationConfig) -> Result<String, GeminiError> {
            self.prompts.lock().unwrap().push(prompt.to_string());
            self.responses
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(|| Err(GeminiError::Api {
                    message: "no scripted response left".to_string(),
                }))
        }
    }

    /// Labels each text by a keyword it contains, independent of batching.
    struct KeywordModel;

    impl GenerativeModel for KeywordModel {
        fn generate(&self, prompt: &str, _config: &GenerationConfig) -> Result<String, GeminiError> {
            let listing = prompt
                .split("Texts to classify:\n")
                .nth(1)
                .and_then(|rest| rest.split("\n\nFor your response:").next())
                .unwrap_or_default();
            let lines: Vec<String> = listing
                .lines()
                .enumerate()
                .map(|(i, line)| {
                    let label = if line.contains("bad") { "سلبي" } else { "إيجابي" };
                    format!("{}. {}", i + 1, label)
                })
                .collect();
            Ok(lines.join("\n"))
        }
    }

    #[derive(Default)]
    struct RecordingObserver {
        events: RefCell<Vec<BatchProgress>>,
    }

    impl ProgressObserver for RecordingObserver {
        fn batch_completed(&self, progress: &BatchProgress) {
            self.events.borrow_mut().push(*progress);
        }
    }

    fn strings(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    fn sentiment() -> Vec<String> {
        strings(&["إيجابي", "سلبي", "محايد"])
    }

    fn classifier(model: Arc<dyn GenerativeModel>, batch_size: usize) -> BatchClassifier {
        BatchClassifierBuilder::new()
            .client(model)
            .batch_size(batch_size)
            .build()
            .unwrap()
    }

    #[test]
    fn prompt_lists_categories_and_numbered_texts() {
        let prompt = build_prompt(&strings(&["first", "second\nline"]), &sentiment());

        assert!(prompt.contains("categories: إيجابي, سلبي, محايد"));
        assert!(prompt.contains("1. first\n2. second line"));
        assert!(prompt.contains("Format: \"1. Category\""));
    }

    #[test]
    fn empty_input_makes_no_calls() {
        let model = ScriptedModel::new(vec![]);
        let labels = classifier(model.clone(), 3)
            .classify(&[], &sentiment(), &NoopObserver)
            .unwrap();

        assert!(labels.is_empty());
        assert_eq!(model.calls(), 0);
    }

    #[test]
    fn batches_are_reassembled_in_order() {
        let texts = strings(&["مرحبا", "للاسف النتيجة سيئة", "عادي"]);
        let model = ScriptedModel::new(vec![
            Ok("1. إيجابي\n2. سلبي".to_string()),
            Ok("1. محايد".to_string()),
        ]);

        let labels = classifier(model.clone(), 2)
            .classify(&texts, &sentiment(), &NoopObserver)
            .unwrap();

        assert_eq!(labels, vec!["إيجابي", "سلبي", "محايد"]);
        assert_eq!(model.calls(), 2);
    }

    #[test]
    fn batch_size_larger_than_input_uses_single_batch() {
        let model = ScriptedModel::new(vec![Ok("1. a\n2. b".to_string())]);
        let labels = classifier(model.clone(), 100)
            .classify(&strings(&["x", "y"]), &strings(&["a", "b"]), &NoopObserver)
            .unwrap();

        assert_eq!(labels, vec!["a", "b"]);
        assert_eq!(model.calls(), 1);
    }

    #[test]
    fn each_batch_prompt_is_numbered_from_one() {
        let model = ScriptedModel::new(vec![
            Ok("1. a\n2. a".to_string()),
            Ok("1. a".to_string()),
        ]);
        classifier(model.clone(), 2)
            .classify(&strings(&["x", "y", "z"]), &strings(&["a"]), &NoopObserver)
            .unwrap();

        let prompts = model.prompts.lock().unwrap();
        assert!(prompts[0].contains("1. x\n2. y"));
        assert!(prompts[1].contains("1. z"));
        assert!(!prompts[1].contains("3. z"));
    }

    #[test]
    fn chunking_does_not_change_per_item_labels() {
        let texts = strings(&["good", "bad", "fine", "bad again", "great", "bad", "ok"]);
        let categories = strings(&["إيجابي", "سلبي"]);

        let whole = classifier(Arc::new(KeywordModel), texts.len())
            .classify(&texts, &categories, &NoopObserver)
            .unwrap();

        for batch_size in 1..=texts.len() + 1 {
            let chunked = classifier(Arc::new(KeywordModel), batch_size)
                .classify(&texts, &categories, &NoopObserver)
                .unwrap();
            assert_eq!(chunked.len(), texts.len());
            assert_eq!(chunked, whole, "batch size {}", batch_size);
        }
    }

    #[test]
    fn short_response_is_an_alignment_error() {
        let model = ScriptedModel::new(vec![Ok("1. a\n2. b\n3. c".to_string())]);
        let err = classifier(model, 5)
            .classify(&strings(&["1", "2", "3", "4", "5"]), &strings(&["a", "b", "c"]), &NoopObserver)
            .unwrap_err();

        assert!(matches!(
            err,
            ClassifyError::Alignment {
                batch: 1,
                expected: 5,
                received: 3,
                ..
            }
        ));
    }

    #[test]
    fn failure_in_later_batch_returns_no_partial_labels() {
        let model = ScriptedModel::new(vec![
            Ok("1. a\n2. a".to_string()),
            Ok("Sorry, I cannot help with that.".to_string()),
        ]);
        let result = classifier(model, 2).classify(
            &strings(&["1", "2", "3", "4"]),
            &strings(&["a"]),
            &NoopObserver,
        );

        match result {
            Err(ClassifyError::Alignment { batch, .. }) => assert_eq!(batch, 2),
            other => panic!("expected alignment error, got {:?}", other),
        }
    }

    #[test]
    fn capability_failure_names_batch_and_is_not_retried() {
        let model = ScriptedModel::new(vec![
            Ok("1. a".to_string()),
            Err(GeminiError::Http {
                status: 503,
                message: "unavailable".to_string(),
            }),
            Ok("1. a".to_string()),
        ]);
        let err = classifier(model.clone(), 1)
            .classify(&strings(&["1", "2", "3"]), &strings(&["a"]), &NoopObserver)
            .unwrap_err();

        assert!(matches!(
            err,
            ClassifyError::Capability {
                batch: 2,
                source: GeminiError::Http { status: 503, .. }
            }
        ));
        assert_eq!(model.calls(), 2);
    }

    #[test]
    fn unknown_labels_pass_unless_validation_enabled() {
        let texts = strings(&["x"]);
        let categories = strings(&["a", "b"]);

        let lenient = classifier(ScriptedModel::new(vec![Ok("1. c".to_string())]), 1);
        assert_eq!(
            lenient.classify(&texts, &categories, &NoopObserver).unwrap(),
            vec!["c"]
        );

        let strict = BatchClassifierBuilder::new()
            .client(ScriptedModel::new(vec![Ok("1. c".to_string())]))
            .batch_size(1)
            .validate_labels(true)
            .build()
            .unwrap();
        let err = strict.classify(&texts, &categories, &NoopObserver).unwrap_err();
        assert!(err.to_string().contains("not one of the categories"));
    }

    #[test]
    fn empty_categories_are_rejected() {
        let model = ScriptedModel::new(vec![]);
        let err = classifier(model.clone(), 1)
            .classify(&strings(&["x"]), &[], &NoopObserver)
            .unwrap_err();

        assert!(matches!(err, ClassifyError::Config(_)));
        assert_eq!(model.calls(), 0);
    }

    #[test]
    fn progress_is_reported_after_every_batch() {
        let model = ScriptedModel::new(vec![
            Ok("1. a\n2. a".to_string()),
            Ok("1. a\n2. a".to_string()),
            Ok("1. a".to_string()),
        ]);
        let observer = RecordingObserver::default();
        classifier(model, 2)
            .classify(&strings(&["1", "2", "3", "4", "5"]), &strings(&["a"]), &observer)
            .unwrap();

        let events = observer.events.borrow();
        let processed: Vec<usize> = events.iter().map(|e| e.processed).collect();
        assert_eq!(processed, vec![2, 4, 5]);
        assert!(events.iter().all(|e| e.total == 5 && e.total_batches == 3));
        assert_eq!(events.iter().map(|e| e.batch).collect::<Vec<_>>(), vec![1, 2, 3]);
        assert!(events[2].is_complete());
    }

    #[test]
    fn builder_rejects_zero_batch_size_and_missing_client() {
        let err = BatchClassifierBuilder::new()
            .client(Arc::new(KeywordModel))
            .batch_size(0)
            .build()
            .err()
            .unwrap();
        assert!(matches!(err, ClassifyError::Config(_)));

        assert!(BatchClassifierBuilder::new().build().is_err());
    }

    #[test]
    fn builder_defaults_batch_size() {
        let classifier = BatchClassifierBuilder::new()
            .client(Arc::new(KeywordModel))
            .build()
            .unwrap();
        assert_eq!(classifier.batch_size(), crate::config::DEFAULT_BATCH_SIZE);
    }
}
