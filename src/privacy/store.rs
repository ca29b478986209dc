use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::io::Write;
use std::sync::{Arc, Mutex, PoisonError, RwLock};

use tempfile::NamedTempFile;

use super::pattern::{is_duplicate, IdentifierPattern, PatternError, PrivacySettings};

/// Loads and caches the masking patterns persisted in a JSON settings file.
///
/// The first successful [`load`](PatternStore::load) is cached; later calls
/// return the cached value until [`invalidate`](PatternStore::invalidate) is
/// called. Every invalidation bumps [`generation`](PatternStore::generation),
/// which consumers compare to decide when to recompile their matchers.
///
/// Writes are serialized, replace the whole file through an atomic rename and
/// invalidate the cache.
///
/// # Examples
///
/// ```
/// use musannif::privacy::PatternStore;
///
/// let dir = tempfile::tempdir().unwrap();
/// let store = PatternStore::new(dir.path().join("privacy_settings.json"));
///
/// // A missing file is an empty pattern set
/// assert!(store.load().unwrap().is_empty());
///
/// store.add_pattern("2", 5, "student id").unwrap();
/// assert_eq!(store.load().unwrap().len(), 1);
/// ```
#[derive(Debug)]
pub struct PatternStore {
    path: PathBuf,
    cache: RwLock<Option<Arc<PrivacySettings>>>,
    generation: AtomicU64,
    write_lock: Mutex<()>,
}

impl PatternStore {
    /// Creates a store backed by the file at `path`. Nothing is read until `load`.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            cache: RwLock::new(None),
            generation: AtomicU64::new(0),
            write_lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Current cache generation. Changes on every invalidation.
    pub fn generation(&self) -> u64 {
        self.generation.load(Ordering::Acquire)
    }

    /// Returns the pattern set, reading the file on the first call after
    /// construction or invalidation.
    ///
    /// # Errors
    ///
    /// A missing file yields an empty set. An unreadable or malformed file is
    /// an error so that masking is never silently disabled.
    pub fn load(&self) -> Result<Arc<PrivacySettings>, PatternError> {
        if let Some(settings) = self
            .cache
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .as_ref()
        {
            return Ok(Arc::clone(settings));
        }

        let mut cache = self.cache.write().unwrap_or_else(PoisonError::into_inner);
        if let Some(settings) = cache.as_ref() {
            return Ok(Arc::clone(settings));
        }

        let settings = Arc::new(self.read_from_disk()?);
        tracing::debug!(
            path = %self.path.display(),
            patterns = settings.len(),
            "loaded privacy settings"
        );
        *cache = Some(Arc::clone(&settings));
        Ok(settings)
    }

    /// Drops the cached settings and bumps the generation.
    pub fn invalidate(&self) {
        let mut cache = self.cache.write().unwrap_or_else(PoisonError::into_inner);
        *cache = None;
        self.generation.fetch_add(1, Ordering::AcqRel);
    }

    /// Validates and appends a pattern, then rewrites the settings file.
    ///
    /// # Errors
    ///
    /// Returns a validation error, `PatternError::Duplicate` when the same
    /// prefix and length already exist, or an I/O error from the rewrite.
    pub fn add_pattern(
        &self,
        prefix: &str,
        length: usize,
        description: &str,
    ) -> Result<IdentifierPattern, PatternError> {
        let pattern = IdentifierPattern::new(prefix, length, description)?;
        let _guard = self.write_lock.lock().unwrap_or_else(PoisonError::into_inner);
        let current = self.load()?;

        if is_duplicate(&current, pattern.prefix(), pattern.total_length()) {
            return Err(PatternError::Duplicate {
                prefix: pattern.prefix().to_string(),
                length: pattern.total_length(),
            });
        }

        let mut updated = PrivacySettings::clone(&current);
        updated.id_patterns.push(pattern.clone());
        self.write_file(&updated)?;

        tracing::info!(prefix = pattern.prefix(), length = pattern.total_length(), "added masking pattern");
        Ok(pattern)
    }

    /// Removes the pattern at zero-based `index`, then rewrites the settings file.
    pub fn remove_pattern(&self, index: usize) -> Result<IdentifierPattern, PatternError> {
        let _guard = self.write_lock.lock().unwrap_or_else(PoisonError::into_inner);
        let current = self.load()?;
        if index >= current.len() {
            return Err(PatternError::IndexOutOfRange {
                index,
                count: current.len(),
            });
        }

        let mut updated = PrivacySettings::clone(&current);
        let removed = updated.id_patterns.remove(index);
        self.write_file(&updated)?;

        tracing::info!(prefix = removed.prefix(), length = removed.total_length(), "removed masking pattern");
        Ok(removed)
    }

    /// Writes `settings` as the whole file and invalidates the cache.
    pub fn save(&self, settings: &PrivacySettings) -> Result<(), PatternError> {
        let _guard = self.write_lock.lock().unwrap_or_else(PoisonError::into_inner);
        self.write_file(settings)
    }

    /// Caller holds `write_lock`. The document goes to a temporary file in the
    /// same directory which is then renamed over the settings file, so readers
    /// see either the old or the new document.
    fn write_file(&self, settings: &PrivacySettings) -> Result<(), PatternError> {
        let write_error = |source: std::io::Error| PatternError::Write {
            path: self.path.clone(),
            source,
        };

        let parent = match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };
        std::fs::create_dir_all(parent).map_err(write_error)?;

        let content = serde_json::to_string_pretty(settings).map_err(|source| {
            PatternError::Malformed {
                path: self.path.clone(),
                source,
            }
        })?;

        let mut file = NamedTempFile::new_in(parent).map_err(write_error)?;
        file.write_all(content.as_bytes()).map_err(write_error)?;
        file.as_file().sync_all().map_err(write_error)?;
        file.persist(&self.path).map_err(|err| write_error(err.error))?;

        self.invalidate();
        Ok(())
    }

    fn read_from_disk(&self) -> Result<PrivacySettings, PatternError> {
        if !self.path.exists() {
            return Ok(PrivacySettings::default());
        }

        let content = std::fs::read_to_string(&self.path).map_err(|source| PatternError::Read {
            path: self.path.clone(),
            source,
        })?;
        if content.trim().is_empty() {
            return Ok(PrivacySettings::default());
        }

        serde_json::from_str(&content).map_err(|source| PatternError::Malformed {
            path: self.path.clone(),
            source,
        })
    }
}
