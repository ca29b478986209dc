//! Masking followed by batch classification over one dataset.

use std::sync::{Arc, Mutex, PoisonError};

use crate::classifier::{BatchClassifier, ProgressObserver};
use crate::error::ClassifyError;
use crate::output::OutputTable;
use crate::privacy::{PatternStore, Redactor};
use crate::session::Session;

/// Runs the mask-then-classify flow for whole datasets.
///
/// The compiled redactor is cached and rebuilt only when the store's
/// generation moves, so pattern edits take effect on the next run.
pub struct ClassificationPipeline {
    store: Arc<PatternStore>,
    classifier: BatchClassifier,
    redactor: Mutex<Option<(u64, Arc<Redactor>)>>,
}

impl ClassificationPipeline {
    pub fn new(store: Arc<PatternStore>, classifier: BatchClassifier) -> Self {
        Self {
            store,
            classifier,
            redactor: Mutex::new(None),
        }
    }

    pub fn store(&self) -> &PatternStore {
        &self.store
    }

    pub fn classifier(&self) -> &BatchClassifier {
        &self.classifier
    }

    /// Returns the redactor for the current pattern generation.
    ///
    /// # Errors
    ///
    /// Returns `ClassifyError::Patterns` if the settings file cannot be read.
    pub fn redactor(&self) -> Result<Arc<Redactor>, ClassifyError> {
        self.current_redactor().map(|(_, redactor)| redactor)
    }

    fn current_redactor(&self) -> Result<(u64, Arc<Redactor>), ClassifyError> {
        // Read the generation before loading so a concurrent invalidation
        // only ever causes an extra rebuild.
        let generation = self.store.generation();
        let mut cached = self.redactor.lock().unwrap_or_else(PoisonError::into_inner);

        if let Some((cached_generation, redactor)) = cached.as_ref()
            && *cached_generation == generation
        {
            return Ok((generation, Arc::clone(redactor)));
        }

        let settings = self.store.load()?;
        let redactor = Arc::new(Redactor::new(&settings.id_patterns));
        tracing::debug!(
            generation,
            patterns = settings.len(),
            "compiled identifier matchers"
        );
        *cached = Some((generation, Arc::clone(&redactor)));
        Ok((generation, redactor))
    }

    /// Masks and classifies `texts`, producing one row per text.
    ///
    /// The whole sequence is masked once before any batch is sent. When
    /// masking changes at least one text, every row carries the original
    /// text and the session's one-time notification is raised.
    ///
    /// # Errors
    ///
    /// - `ClassifyError::Config` if no non-blank category is given.
    /// - `ClassifyError::Patterns` if the pattern store cannot be read.
    /// - Any error from [`BatchClassifier::classify`]. No partial table is returned.
    pub fn run(
        &self,
        session: &mut Session,
        texts: &[String],
        categories: &[String],
        observer: &dyn ProgressObserver,
    ) -> Result<OutputTable, ClassifyError> {
        let categories: Vec<String> = categories
            .iter()
            .map(|c| c.trim())
            .filter(|c| !c.is_empty())
            .map(String::from)
            .collect();
        if categories.is_empty() {
            return Err(ClassifyError::Config(
                "at least one category is required".to_string(),
            ));
        }

        let (generation, redactor) = self.current_redactor()?;
        session.record_pattern_generation(generation);

        let outcome = redactor.mask(texts);
        if outcome.any_changed && session.mark_redaction_notified() {
            tracing::info!("identifiers were masked before classification");
            observer.identifiers_masked();
        }

        tracing::info!(
            texts = texts.len(),
            categories = categories.len(),
            masked = outcome.any_changed,
            "running classification"
        );
        let labels = self
            .classifier
            .classify(&outcome.masked, &categories, observer)?;

        let originals = outcome.any_changed.then(|| texts.to_vec());
        Ok(OutputTable::from_parts(originals, outcome.masked, labels))
    }
}
