//! Architecture Validation Integration Tests
//!
//! Confirms that the classification pipeline and every library type can be
//! used without the CLI (clap, dirs, environment lookup), so other front-ends
//! can reuse the core.
//!
//! **Critical Architecture Invariant:**
//! This file must NOT import anything from main.rs.
//! It must only use types exported from the `musannif::` crate.
//!
//! **CLI types that should NOT be exported from crate root:**
//! - Cli (clap command parser)
//! - Commands (clap subcommands enum)
//! - ClassifyCommand / PatternsCommand / AnalyzeCommand

use std::sync::Arc;

use musannif::classifier::NoopObserver;
use musannif::gemini::GenerationConfig;
use musannif::{
    BatchClassifierBuilder, ClassificationPipeline, ClassifyError, GeminiError, GenerativeModel,
    IdentifierPattern, OutputTable, PatternStore, PrivacySettings, Redactor, Session,
};

/// Always answers "1. ok" for single-text batches.
struct SingleOk;

impl GenerativeModel for SingleOk {
    fn generate(&self, _prompt: &str, _config: &GenerationConfig) -> Result<String, GeminiError> {
        Ok("1. ok".to_string())
    }
}

fn create_test_pipeline(dir: &tempfile::TempDir) -> ClassificationPipeline {
    let store = Arc::new(PatternStore::new(dir.path().join("settings.json")));
    let classifier = BatchClassifierBuilder::new()
        .client(Arc::new(SingleOk))
        .batch_size(1)
        .build()
        .expect("valid classifier configuration");
    ClassificationPipeline::new(store, classifier)
}

#[test]
fn test_pipeline_runs_without_cli_context() {
    let dir = tempfile::tempdir().unwrap();
    let pipeline = create_test_pipeline(&dir);

    let table: OutputTable = pipeline
        .run(
            &mut Session::new(),
            &["one".to_string(), "two".to_string()],
            &["ok".to_string()],
            &NoopObserver,
        )
        .expect("pipeline run");

    assert_eq!(table.len(), 2);
    assert!(table.rows().iter().all(|r| r.classification == "ok"));
}

#[test]
fn test_redactor_usable_standalone() {
    let patterns = vec![
        IdentifierPattern::new("2", 5, "student").unwrap(),
        IdentifierPattern::new("05", 10, "phone").unwrap(),
    ];
    let redactor = Redactor::new(&patterns);

    let outcome = redactor.mask(&["اتصل 0512345678 رقم 20001".to_string()]);
    assert!(outcome.any_changed);
    assert_eq!(outcome.masked[0], "اتصل XXXXXXXXXX رقم XXXXX");
}

#[test]
fn test_settings_types_serialize_with_on_disk_names() {
    let settings = PrivacySettings {
        id_patterns: vec![IdentifierPattern::new("4", 9, "").unwrap()],
    };
    let json = serde_json::to_value(&settings).unwrap();

    assert_eq!(json["id_patterns"][0]["start_with"], "4");
    assert_eq!(json["id_patterns"][0]["length"], 9);
    assert_eq!(json["id_patterns"][0]["description"], "بدون وصف");
}

#[test]
fn test_error_categories_are_distinguishable() {
    let config = ClassifyError::Config("no categories".to_string());
    let capability = ClassifyError::Capability {
        batch: 3,
        source: GeminiError::Api {
            message: "model overloaded".to_string(),
        },
    };

    assert!(config.is_user_error());
    assert!(!capability.is_user_error());
}
