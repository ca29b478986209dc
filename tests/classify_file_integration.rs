//! Reads input files, classifies them with a keyword model and checks the CSV export.

use std::io::Write;
use std::sync::Arc;

use musannif::classifier::NoopObserver;
use musannif::gemini::GenerationConfig;
use musannif::input::{load_dataset, load_texts, InputError, InputSource, Separator};
use musannif::report::Summary;
use musannif::{
    BatchClassifierBuilder, ClassificationPipeline, GeminiError, GenerativeModel, OutputTable,
    PatternStore, Session,
};

/// Labels a text "سلبي" when it contains "سيء", otherwise "إيجابي".
struct KeywordModel;

impl GenerativeModel for KeywordModel {
    fn generate(&self, prompt: &str, _config: &GenerationConfig) -> Result<String, GeminiError> {
        let listing = prompt
            .split("Texts to classify:\n")
            .nth(1)
            .and_then(|rest| rest.split("\n\nFor your response:").next())
            .unwrap_or_default();
        Ok(listing
            .lines()
            .enumerate()
            .map(|(i, line)| {
                let label = if line.contains("سيء") { "سلبي" } else { "إيجابي" };
                format!("{}. {}", i + 1, label)
            })
            .collect::<Vec<_>>()
            .join("\n"))
    }
}

fn classify(dir: &tempfile::TempDir, texts: &[String]) -> OutputTable {
    let store = Arc::new(PatternStore::new(dir.path().join("privacy_settings.json")));
    store.add_pattern("2", 5, "student id").unwrap();
    let classifier = BatchClassifierBuilder::new()
        .client(Arc::new(KeywordModel))
        .batch_size(2)
        .build()
        .unwrap();
    let categories = vec!["إيجابي".to_string(), "سلبي".to_string()];

    ClassificationPipeline::new(store, classifier)
        .run(&mut Session::new(), texts, &categories, &NoopObserver)
        .unwrap()
}

#[test]
fn csv_column_to_csv_export() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("feedback.csv");
    std::fs::write(
        &input,
        "id,comment\n1,المكتبة ممتازة\n2,\"الطعام سيء, جدا\"\n3,رقمي 20001\n",
    )
    .unwrap();

    let texts = load_texts(
        &input,
        &InputSource::Csv {
            column: "comment".to_string(),
        },
    )
    .unwrap();
    let table = classify(&dir, &texts);

    let output = dir.path().join("out").join("results.csv");
    std::fs::create_dir_all(output.parent().unwrap()).unwrap();
    table.save_csv(&output).unwrap();

    let bytes = std::fs::read(&output).unwrap();
    assert_eq!(&bytes[..3], &[0xEF, 0xBB, 0xBF]);

    let content = String::from_utf8(bytes[3..].to_vec()).unwrap();
    let lines: Vec<&str> = content.lines().collect();
    assert_eq!(lines[0], "\"original_text\",\"text\",\"classification\"");
    assert_eq!(lines[1], "\"المكتبة ممتازة\",\"المكتبة ممتازة\",\"إيجابي\"");
    assert_eq!(lines[2], "\"الطعام سيء, جدا\",\"الطعام سيء, جدا\",\"سلبي\"");
    assert_eq!(lines[3], "\"رقمي 20001\",\"رقمي XXXXX\",\"إيجابي\"");
}

#[test]
fn text_file_with_custom_separator() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("feedback.txt");
    let mut file = std::fs::File::create(&input).unwrap();
    write!(file, "خدمة رائعة || تنظيم سيء ||  || شكرا").unwrap();

    let texts = load_texts(
        &input,
        &InputSource::Text {
            separator: "||".parse::<Separator>().unwrap(),
        },
    )
    .unwrap();
    assert_eq!(texts, vec!["خدمة رائعة", "تنظيم سيء", "شكرا"]);

    let table = classify(&dir, &texts);
    assert!(!table.has_original());

    let summary = Summary::from_table(&table);
    assert_eq!(summary.total, 3);
    assert_eq!(summary.categories[0].name, "إيجابي");
    assert_eq!(summary.categories[0].count, 2);
    assert_eq!(summary.categories[1].name, "سلبي");
}

#[test]
fn missing_column_is_an_input_error() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("feedback.csv");
    std::fs::write(&input, "id,comment\n1,x\n").unwrap();

    let err = load_texts(
        &input,
        &InputSource::Csv {
            column: "text".to_string(),
        },
    )
    .unwrap_err();

    assert!(matches!(err, InputError::MissingColumn { .. }));
}

#[test]
fn csv_export_keeps_source_columns_for_joining_back() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("feedback.csv");
    std::fs::write(&input, "id,comment,term\n17,رقمي 20001,خريف\n18,جيد\n").unwrap();

    let dataset = load_dataset(
        &input,
        &InputSource::Csv {
            column: "comment".to_string(),
        },
    )
    .unwrap();
    let table = classify(&dir, &dataset.texts)
        .with_source_columns(dataset.extra_columns, dataset.extra_values);

    let mut buf = Vec::new();
    table.write_csv(&mut buf).unwrap();
    let content = String::from_utf8(buf).unwrap();
    let lines: Vec<&str> = content.trim_start_matches('\u{feff}').lines().collect();

    assert_eq!(
        lines[0],
        "\"id\",\"term\",\"original_text\",\"text\",\"classification\""
    );
    assert_eq!(lines[1], "\"17\",\"خريف\",\"رقمي 20001\",\"رقمي XXXXX\",\"إيجابي\"");
    assert_eq!(lines[2], "\"18\",\"\",\"جيد\",\"جيد\",\"إيجابي\"");
}
